//! Base triplet packer for sequence lines.
//!
//! Triplets over `{A, C, N, G, T}` collapse into one byte. A sixth digit
//! stands in for anything outside that set; its literal byte follows the
//! packed code, so arbitrary line content still round-trips exactly.

use crate::error::{CryfaError, Result};
use crate::frame::{LINE_END, PENALTY};

/// Base ordering is part of the byte contract: A C N G T.
const BASES: [u8; 5] = [b'A', b'C', b'N', b'G', b'T'];
/// Escape digit for out-of-alphabet symbols (and the `X` in the table).
const ESCAPE_DIGIT: u8 = 5;
const ESCAPE_SYM: u8 = b'X';
/// 6 digits per position, 3 positions.
const TABLE_ENTRIES: usize = 6 * 6 * 6;

/// Sequence-line codec. The 216-entry table gives constant-time unpack;
/// codes span 0..=215, inside the payload range.
///
/// ```
/// use cryfa_lib::codec::DnaCodec;
///
/// let codec = DnaCodec::new();
/// let mut packed = Vec::new();
/// codec.pack_line(b"ACGTAC", &mut packed);
/// // ACG -> 36*0 + 6*1 + 3, TAC -> 36*4 + 6*0 + 1
/// assert_eq!(packed, [9, 145]);
/// ```
#[derive(Clone, Debug)]
pub struct DnaCodec {
    digit_of: [u8; 256],
    table: [[u8; 3]; TABLE_ENTRIES],
}

impl Default for DnaCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl DnaCodec {
    pub fn new() -> DnaCodec {
        let mut digit_of = [ESCAPE_DIGIT; 256];
        for (d, &b) in BASES.iter().enumerate() {
            digit_of[b as usize] = d as u8;
        }
        let mut table = [[0u8; 3]; TABLE_ENTRIES];
        for (v, entry) in table.iter_mut().enumerate() {
            let digits = [v / 36, v / 6 % 6, v % 6];
            for (slot, d) in entry.iter_mut().zip(digits) {
                *slot = if d == usize::from(ESCAPE_DIGIT) {
                    ESCAPE_SYM
                } else {
                    BASES[d]
                };
            }
        }
        DnaCodec { digit_of, table }
    }

    /// Pack one sequence line. The caller writes the line terminator.
    pub fn pack_line(&self, line: &[u8], out: &mut Vec<u8>) {
        let full = line.len() / 3 * 3;
        for triplet in line[..full].chunks_exact(3) {
            let d = [
                self.digit_of[triplet[0] as usize],
                self.digit_of[triplet[1] as usize],
                self.digit_of[triplet[2] as usize],
            ];
            let v = 36 * d[0] as usize + 6 * d[1] as usize + d[2] as usize;
            out.push(v as u8);
            for (i, &di) in d.iter().enumerate() {
                if di == ESCAPE_DIGIT {
                    out.push(triplet[i]);
                }
            }
        }
        let rest = &line[full..];
        if !rest.is_empty() {
            out.push(PENALTY);
            out.push(rest.len() as u8);
            out.extend_from_slice(rest);
        }
    }

    /// Unpack one sequence line from `data` starting at `pos`, consuming
    /// the terminating `LINE_END`.
    pub fn unpack_line(&self, data: &[u8], pos: &mut usize, out: &mut Vec<u8>) -> Result<()> {
        loop {
            let b = *data
                .get(*pos)
                .ok_or_else(|| CryfaError::CorruptStream("unterminated sequence line".into()))?;
            if b == LINE_END {
                *pos += 1;
                return Ok(());
            }
            if b == PENALTY {
                *pos += 1;
                super::symbol::take_trailing(data, pos, 3, out)?;
                continue;
            }
            *pos += 1;
            let entry = self.table.get(b as usize).ok_or_else(|| {
                CryfaError::CorruptStream(format!("sequence code {b} outside table"))
            })?;
            for &sym in entry {
                if sym == ESCAPE_SYM {
                    let lit = *data.get(*pos).ok_or_else(|| {
                        CryfaError::CorruptStream("missing sequence escape literal".into())
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
