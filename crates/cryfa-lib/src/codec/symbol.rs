//! Category pack/unpack for header and quality lines.
//!
//! One generic routine covers every category: K symbols become a group
//! value `v = Σ dᵢ·A^(K−1−i)`, written big-endian in M bytes. The large
//! variant adds an escape digit whose literal byte follows the group.
//! A trailing partial group rides behind the penalty marker as
//! `255, count, raw bytes` so no pad symbol ever enters the code space.

use crate::codec::alphabet::{Alphabet, Category};
use crate::error::{CryfaError, Result};
use crate::frame::{LINE_END, PENALTY};

/// Packs and unpacks one field (headers or quality scores) of the whole
/// file. The unpack table is `A^K` entries of K symbols, flat.
///
/// ```
/// use cryfa_lib::codec::SymbolCodec;
///
/// // Two symbols pack seven-to-one; "I!I!I!I" is the bit pattern 1010101.
/// let codec = SymbolCodec::new(b"!I");
/// let mut packed = Vec::new();
/// codec.pack_line(b"I!I!I!I", &mut packed).unwrap();
/// assert_eq!(packed, [0b1010101]);
/// ```
#[derive(Clone, Debug)]
pub struct SymbolCodec {
    alphabet: Alphabet,
    table: Vec<u8>,
}

impl SymbolCodec {
    /// Build the codec for an observed symbol set (sorted, distinct).
    pub fn new(observed: &[u8]) -> SymbolCodec {
        let alphabet = Alphabet::from_observed(observed);
        let table = alphabet.unpack_table();
        SymbolCodec { alphabet, table }
    }

    pub fn category(&self) -> Category {
        self.alphabet.category()
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Pack one line. The caller writes the line terminator.
    pub fn pack_line(&self, line: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let k = self.category().key_len();
        let m = self.category().group_bytes();
        let a = self.alphabet.len() as u32;
        let escape_digit = self.alphabet.escape_digit();

        let full = line.len() / k * k;
        let mut literals: Vec<u8> = Vec::new();
        for group in line[..full].chunks_exact(k) {
            let mut v: u32 = 0;
            literals.clear();
            for &s in group {
                let d = match self.alphabet.digit(s) {
                    Some(d) => d,
                    None => {
                        let esc = escape_digit.ok_or_else(|| {
                            CryfaError::CorruptStream(format!(
                                "symbol {s} outside the packing alphabet"
                            ))
                        })?;
                        literals.push(s);
                        esc
                    }
                };
                v = v * a + u32::from(d);
            }
            match m {
                1 => out.push(v as u8),
                _ => out.extend_from_slice(&[(v >> 8) as u8, v as u8]),
            }
            out.extend_from_slice(&literals);
        }

        let rest = &line[full..];
        if !rest.is_empty() {
            out.push(PENALTY);
            out.push(rest.len() as u8);
            out.extend_from_slice(rest);
        }
        Ok(())
    }

    /// Unpack one line from `data` starting at `pos`, consuming the
    /// terminating `LINE_END`.
    pub fn unpack_line(&self, data: &[u8], pos: &mut usize, out: &mut Vec<u8>) -> Result<()> {
        let k = self.category().key_len();
        let m = self.category().group_bytes();
        let entries = self.table.len() / k.max(1);
        let escape = self.alphabet.escape();

        loop {
            let b = *data
                .get(*pos)
                .ok_or_else(|| CryfaError::CorruptStream("unterminated packed line".into()))?;
            if b == LINE_END {
                *pos += 1;
                return Ok(());
            }
            if b == PENALTY {
                *pos += 1;
                take_trailing(data, pos, k, out)?;
                continue;
            }

            let v = match m {
                1 => {
                    *pos += 1;
                    usize::from(b)
                }
                _ => {
                    let lo = *data
                        .get(*pos + 1)
                        .ok_or_else(|| CryfaError::CorruptStream("truncated code group".into()))?;
                    *pos += 2;
                    usize::from(b) << 8 | usize::from(lo)
                }
            };
            if v >= entries {
                return Err(CryfaError::CorruptStream(format!(
                    "code group {v} outside table of {entries}"
                )));
            }
            for &sym in &self.table[v * k..v * k + k] {
                if Some(sym) == escape {
                    let lit = *data.get(*pos).ok_or_else(|| {
                        CryfaError::CorruptStream("missing escape literal".into())
                    })?;
                    *pos += 1;
                    out.push(lit);
                } else {
                    out.push(sym);
                }
            }
        }
    }
}

/// Read a `255, count, raw bytes` trailing group.
pub(crate) fn take_trailing(
    data: &[u8],
    pos: &mut usize,
    key_len: usize,
    out: &mut Vec<u8>,
) -> Result<()> {
    let count = *data
        .get(*pos)
        .ok_or_else(|| CryfaError::CorruptStream("missing trailing count".into()))?
        as usize;
    *pos += 1;
    if count == 0 || count >= key_len {
        return Err(CryfaError::CorruptStream(format!(
            "trailing count {count} invalid for key length {key_len}"
        )));
    }
    let raw = data
        .get(*pos..*pos + count)
        .ok_or_else(|| CryfaError::CorruptStream("truncated trailing group".into()))?;
    out.extend_from_slice(raw);
    *pos += count;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::LINE_END;

    fn roundtrip(observed: &[u8], line: &[u8]) -> Vec<u8> {
        let codec = SymbolCodec::new(observed);
        let mut packed = Vec::new();
        codec.pack_line(line, &mut packed).unwrap();
        packed.push(LINE_END);
        let mut pos = 0;
        let mut out = Vec::new();
        codec.unpack_line(&packed, &mut pos, &mut out).unwrap();
        assert_eq!(pos, packed.len(), "line not fully consumed");
        assert_eq!(out, line);
        packed
    }

    #[test]
    fn test_identity_roundtrip() {
        let packed = roundtrip(b"F", b"FFFFF");
        assert_eq!(&packed[..5], &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_7to1_roundtrip() {
        roundtrip(b"01", b"0110100");
        roundtrip(b"01", b"01101001100110"); // two full groups
        roundtrip(b"01", b"0");
        roundtrip(b"01", b"011010");         // trailing 6
        roundtrip(b"01", b"");
    }

    #[test]
    fn test_5to1_and_3to1_roundtrip() {
        roundtrip(b"abc", b"cabba");
        roundtrip(b"abc", b"cabbacab");
        roundtrip(b"abcdef", b"fedcba");
        roundtrip(b"abcdef", b"fe");
    }

    #[test]
    fn test_2to1_roundtrip() {
        let observed: Vec<u8> = (b'a'..b'a' + 12).collect();
        roundtrip(&observed, b"aalbjkc");
    }

    #[test]
    fn test_3to2_roundtrip() {
        let observed: Vec<u8> = (b'!'..b'!' + 30).collect();
        roundtrip(&observed, b"!#%/-)+!");
        roundtrip(&observed, b"!");
    }

    #[test]
    fn test_large_variant_escapes() {
        // 50 observed symbols: only the last 39 are direct.
        let observed: Vec<u8> = (33..83).collect();
        let codec = SymbolCodec::new(&observed);
        assert_eq!(codec.category(), Category::Pack3to2Large);

        // 33 is funneled through the escape; 80 is direct.
        let line = [33u8, 80, 33, 80, 80, 33];
        let mut packed = Vec::new();
        codec.pack_line(&line, &mut packed).unwrap();
        packed.push(LINE_END);

        let mut pos = 0;
        let mut out = Vec::new();
        codec.unpack_line(&packed, &mut pos, &mut out).unwrap();
        assert_eq!(out, line);
    }

    #[test]
    fn test_large_variant_full_byte_range() {
        let observed: Vec<u8> = (33..83).collect();
        let codec = SymbolCodec::new(&observed);
        // Bytes far outside the observed set, including reserved values,
        // ride as escape literals.
        let line = [0u8, 255, 254, 10, 200, 82, 44, 1];
        let mut packed = Vec::new();
        codec.pack_line(&line, &mut packed).unwrap();
        packed.push(LINE_END);
        let mut pos = 0;
        let mut out = Vec::new();
        codec.unpack_line(&packed, &mut pos, &mut out).unwrap();
        assert_eq!(out, line);
    }

    #[test]
    fn test_out_of_alphabet_rejected_outside_large() {
        let codec = SymbolCodec::new(b"abc");
        let mut packed = Vec::new();
        assert!(codec.pack_line(b"abxba", &mut packed).is_err());
    }

    #[test]
    fn test_group_leading_bytes_stay_below_markers() {
        // Exhaustive over the worst one-byte category (5→1, A=3: codes
        // up to 242) and spot-check the two-byte high bytes.
        let codec = SymbolCodec::new(b"xyz");
        let mut packed = Vec::new();
        codec.pack_line(b"zzzzz", &mut packed).unwrap();
        assert!(packed.iter().all(|&b| b < 252));

        let observed: Vec<u8> = (33..83).collect();
        let codec = SymbolCodec::new(&observed);
        let mut packed = Vec::new();
        codec.pack_line(&[82, 82, 82], &mut packed).unwrap();
        assert!(packed[0] < 252);
    }

    #[test]
    fn test_all_small_alphabet_sizes_roundtrip() {
        // Property: for every alphabet size 1..=39, strings over the
        // alphabet round-trip, including awkward trailing lengths.
        for size in 1..=39usize {
            let observed: Vec<u8> = (33..33 + size as u8).collect();
            let codec = SymbolCodec::new(&observed);
            for len in [0usize, 1, 2, 3, 6, 7, 8, 13, 29] {
                let line: Vec<u8> = (0..len).map(|i| observed[i * 7 % size]).collect();
                let mut packed = Vec::new();
                codec.pack_line(&line, &mut packed).unwrap();
                packed.push(LINE_END);
                let mut pos = 0;
                let mut out = Vec::new();
                codec.unpack_line(&packed, &mut pos, &mut out).unwrap();
                assert_eq!(out, line, "alphabet size {size}, line length {len}");
            }
        }
    }
}
