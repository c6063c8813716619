//! Alphabet classification: observed symbol set → codec category.

/// Codec category, decided purely by the size of the observed alphabet.
///
/// The names read `<symbols in>To<bytes out>`: e.g. `Pack7to1` packs 7
/// input symbols into one output byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    /// Alphabet of 0 or 1 symbols: one byte in, one byte out.
    Identity,
    /// 2 symbols.
    Pack7to1,
    /// 3 symbols.
    Pack5to1,
    /// 4 to 6 symbols.
    Pack3to1,
    /// 7 to 15 symbols.
    Pack2to1,
    /// 16 to 39 symbols.
    Pack3to2,
    /// More than 39 symbols: the last 39 plus an escape character.
    Pack3to2Large,
}

/// Cap on the directly-representable alphabet; beyond it the large
/// variant funnels everything else through the escape character.
pub const MAX_DIRECT_ALPHABET: usize = 39;

impl Category {
    /// Classify an observed alphabet by its size.
    pub fn classify(size: usize) -> Category {
        match size {
            0 | 1 => Category::Identity,
            2 => Category::Pack7to1,
            3 => Category::Pack5to1,
            4..=6 => Category::Pack3to1,
            7..=15 => Category::Pack2to1,
            16..=39 => Category::Pack3to2,
            _ => Category::Pack3to2Large,
        }
    }

    /// Symbols per code group (the key length K).
    pub fn key_len(self) -> usize {
        match self {
            Category::Identity => 1,
            Category::Pack7to1 => 7,
            Category::Pack5to1 => 5,
            Category::Pack3to1 => 3,
            Category::Pack2to1 => 2,
            Category::Pack3to2 | Category::Pack3to2Large => 3,
        }
    }

    /// Bytes per code group (M).
    pub fn group_bytes(self) -> usize {
        match self {
            Category::Pack3to2 | Category::Pack3to2Large => 2,
            _ => 1,
        }
    }
}

/// Marker for "byte is not in the effective alphabet" in the digit map.
const ABSENT: u8 = 0xFF;

/// A concrete packing alphabet: the effective sorted symbol list, the
/// classification, and both directions of the symbol ↔ digit mapping.
///
/// Built once per run from the scanner's observed set and immutable
/// thereafter.
#[derive(Clone, Debug)]
pub struct Alphabet {
    symbols: Vec<u8>,
    category: Category,
    digit_of: [u8; 256],
    escape: Option<u8>,
}

impl Alphabet {
    /// Build from the full observed set (sorted ascending, distinct).
    ///
    /// For more than [`MAX_DIRECT_ALPHABET`] symbols only the
    /// lexicographic suffix of length 39 is kept; the escape character
    /// (one past the largest kept symbol) becomes the final digit.
    pub fn from_observed(observed: &[u8]) -> Alphabet {
        debug_assert!(observed.windows(2).all(|w| w[0] < w[1]), "observed set must be sorted");
        let category = Category::classify(observed.len());

        let (symbols, escape) = if category == Category::Pack3to2Large {
            let kept = &observed[observed.len() - MAX_DIRECT_ALPHABET..];
            let escape = kept[kept.len() - 1] + 1;
            let mut symbols = kept.to_vec();
            symbols.push(escape);
            (symbols, Some(escape))
        } else {
            (observed.to_vec(), None)
        };

        let mut digit_of = [ABSENT; 256];
        for (d, &s) in symbols.iter().enumerate() {
            digit_of[s as usize] = d as u8;
        }

        Alphabet {
            symbols,
            category,
            digit_of,
            escape,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Effective alphabet size A (includes the escape for the large
    /// variant).
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[u8] {
        self.symbols.as_slice()
    }

    /// The escape character, present only for the large variant.
    pub fn escape(&self) -> Option<u8> {
        self.escape
    }

    /// Digit of a symbol, or `None` if it is outside the effective
    /// alphabet.
    pub fn digit(&self, symbol: u8) -> Option<u8> {
        match self.digit_of[symbol as usize] {
            ABSENT => None,
            d => Some(d),
        }
    }

    /// The digit the large variant uses for out-of-alphabet symbols.
    pub fn escape_digit(&self) -> Option<u8> {
        self.escape.map(|e| self.digit_of[e as usize])
    }

    pub fn symbol(&self, digit: u8) -> u8 {
        self.symbols[digit as usize]
    }

    /// Flat unpack table: `A^K` entries of K symbols each, enumerated in
    /// lexicographic digit order (most significant digit first).
    pub fn unpack_table(&self) -> Vec<u8> {
        let a = self.symbols.len();
        let k = self.category.key_len();
        if a == 0 {
            return Vec::new();
        }
        let entries = a.pow(k as u32);
        let mut table = vec![0u8; entries * k];
        for v in 0..entries {
            let mut rem = v;
            for i in (0..k).rev() {
                table[v * k + i] = self.symbols[rem % a];
                rem /= a;
            }
        }
        table
    }
}
