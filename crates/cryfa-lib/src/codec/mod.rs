//! Alphabet-parameterised packing codecs.
//!
//! Two families share the per-line packed grammar (groups, escape
//! literals, trailing penalty, line terminator):
//!
//! - [`symbol::SymbolCodec`] packs header and quality lines using a code
//!   sized to the observed alphabet (categories 7→1 down to 3→2).
//! - [`dna::DnaCodec`] packs sequence lines as base triplets over
//!   `{A, C, N, G, T}` with a sixth escape digit.

pub mod alphabet;
pub mod dna;
pub mod symbol;

pub use alphabet::{Alphabet, Category};
pub use dna::DnaCodec;
pub use symbol::SymbolCodec;
