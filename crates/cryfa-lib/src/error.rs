use std::path::PathBuf;
use thiserror::Error;

/// Error kinds surfaced by the library. Every variant is terminal to the
/// run; the CLI maps any of them to a non-zero exit status.
///
/// Messages never carry password bytes or derived key material.
#[derive(Error, Debug)]
pub enum CryfaError {
    #[error("failed to open input file {path:?}: {source}")]
    InputOpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("input is neither FASTA nor FASTQ")]
    BadFileType,

    #[error("invalid sequence at line {line}: whitespace not allowed")]
    InvalidSequence { line: usize },

    #[error("password must be at least 8 bytes")]
    PasswordTooShort,

    #[error("password file {0:?} is empty")]
    PasswordFileEmpty(PathBuf),

    #[error("not a cryfa file: watermark missing")]
    InvalidCiphertext,

    #[error("cipher failure: {0}")]
    CipherFailure(String),

    #[error("corrupt packed stream: {0}")]
    CorruptStream(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CryfaError>;
