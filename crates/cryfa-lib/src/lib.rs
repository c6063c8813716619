//! cryfa: FASTA/FASTQ compaction plus encryption.
//!
//! The packed format exploits the small alphabets of sequence data:
//! bases collapse three-to-one, headers and quality scores pack through
//! an alphabet-sized code, and the resulting stream is chunked across
//! threads, optionally shuffled, and sealed in a password-derived
//! AES-CBC envelope behind a `#cryfa` watermark.
//!
//! Reconstruction is exact: for any FASTA or FASTQ input and any
//! password of at least 8 bytes, decrypt-then-decompress reproduces the
//! original file byte for byte, whatever thread count either direction
//! used.

pub mod cli;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod frame;
pub mod io;
pub mod pipeline;
pub mod shuffle;

pub use error::{CryfaError, Result};
pub use pipeline::{compress, decompress};
