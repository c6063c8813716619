//! Compaction and reconstruction drivers.
//!
//! Both directions share the same shape: a run context is built once
//! (scan report, codec tables, shuffle seed), worker threads process
//! every N-th block or chunk, and the driver reassembles their output
//! in deterministic order after the join.

mod compress;
mod decompress;

pub use compress::compress;
pub use decompress::decompress;

use crate::codec::SymbolCodec;
use crate::frame::StreamHeader;

/// Codec tables shared by every worker of a run. Built once, immutable.
pub(crate) struct RunCodecs {
    pub hdr: SymbolCodec,
    pub qs: SymbolCodec,
    pub dna: crate::codec::DnaCodec,
}

impl RunCodecs {
    pub(crate) fn new(hdr_alphabet: &[u8], qs_alphabet: &[u8]) -> RunCodecs {
        RunCodecs {
            hdr: SymbolCodec::new(hdr_alphabet),
            qs: SymbolCodec::new(qs_alphabet),
            dna: crate::codec::DnaCodec::new(),
        }
    }

    pub(crate) fn for_header(header: &StreamHeader) -> RunCodecs {
        RunCodecs::new(&header.hdr_alphabet, &header.qs_alphabet)
    }
}
