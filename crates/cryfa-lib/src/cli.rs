use std::path::{Path, PathBuf};

use crate::error::{CryfaError, Result};

/// Compaction run configuration.
#[derive(Clone, Debug)]
pub struct CompressConfig {
    /// Input FASTA/FASTQ file.
    pub input: PathBuf,
    /// Output envelope file; `-` writes to stdout.
    pub output: PathBuf,
    /// Password file; its entire contents form the password.
    pub key_file: PathBuf,
    /// Number of packing threads (0 is treated as 1).
    pub threads: usize,
    /// Skip the per-chunk byte shuffle.
    pub disable_shuffle: bool,
    /// Log cipher and stream sizes.
    pub verbose: bool,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::from("-"),
            key_file: PathBuf::new(),
            threads: 1,
            disable_shuffle: false,
            verbose: false,
        }
    }
}

/// Reconstruction run configuration.
#[derive(Clone, Debug)]
pub struct DecompressConfig {
    /// Input envelope file.
    pub input: PathBuf,
    /// Output file; `-` writes to stdout.
    pub output: PathBuf,
    /// Password file; its entire contents form the password.
    pub key_file: PathBuf,
    /// Number of decoding threads (0 is treated as 1).
    pub threads: usize,
    /// Log discovered alphabets and sizes.
    pub verbose: bool,
}

impl Default for DecompressConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::from("-"),
            key_file: PathBuf::new(),
            threads: 1,
            verbose: false,
        }
    }
}

/// `-` as a path selects the standard stream.
pub fn is_stdio_path(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Read and validate the password file: it must exist, be non-empty and
/// hold at least 8 bytes. A trailing newline is part of the password.
pub fn read_password(key_file: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(key_file).map_err(|source| CryfaError::InputOpenFailed {
        path: key_file.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(CryfaError::PasswordFileEmpty(key_file.to_path_buf()));
    }
    if bytes.len() < 8 {
        return Err(CryfaError::PasswordTooShort);
    }
    Ok(bytes)
}
