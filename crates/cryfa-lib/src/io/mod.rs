//! Input sniffing and the single-pass alphabet scan.
//!
//! The scanner runs once before any packing thread starts; its report
//! (alphabets, line widths, block size) is immutable for the rest of
//! the run and every worker packs against it.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{CryfaError, Result};
use crate::frame::FileKind;

/// Target uncompressed size of one block, in payload bytes.
pub const BLOCK_SIZE: usize = 64 * 1024;

const READ_BUFFER: usize = 4 * 1024 * 1024;

/// Byte-oriented line reader. Lines are split on `\n` only; a carriage
/// return stays part of the line so that reconstruction is byte-exact
/// for CRLF inputs.
pub struct LineReader<R: BufRead> {
    inner: R,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> LineReader<R> {
        LineReader { inner }
    }

    /// Read the next line into `buf` (without the `\n`). Returns `false`
    /// at end of file.
    pub fn next_line(&mut self, buf: &mut Vec<u8>) -> std::io::Result<bool> {
        buf.clear();
        let n = self.inner.read_until(b'\n', buf)?;
        if n == 0 {
            return Ok(false);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        Ok(true)
    }

    /// Skip `n` lines. Returns `false` if end of file arrived first.
    pub fn skip_lines(&mut self, n: usize) -> std::io::Result<bool> {
        let mut scratch = Vec::new();
        for _ in 0..n {
            scratch.clear();
            if self.inner.read_until(b'\n', &mut scratch)? == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Open the input file for reading.
pub fn open_input(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|source| CryfaError::InputOpenFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::with_capacity(READ_BUFFER, file))
}

/// Decide FASTA vs FASTQ from the first non-empty line.
pub fn sniff(path: &Path) -> Result<FileKind> {
    let mut reader = LineReader::new(open_input(path)?);
    let mut line = Vec::new();
    while reader.next_line(&mut line)? {
        match line.first() {
            None => continue,
            Some(b'>') => return Ok(FileKind::Fasta),
            Some(b'@') => return Ok(FileKind::Fastq),
            Some(_) => return Err(CryfaError::BadFileType),
        }
    }
    Err(CryfaError::BadFileType)
}

/// Everything one scan pass learns about the input.
#[derive(Clone, Debug)]
pub struct ScanReport {
    pub kind: FileKind,
    /// Sorted distinct header bytes, excluding the record sentinel.
    pub hdr_alphabet: Vec<u8>,
    /// Sorted distinct quality bytes; empty for FASTA.
    pub qs_alphabet: Vec<u8>,
    /// FASTQ: the `+` line is bare (third line of the file has length 1).
    pub just_plus: bool,
    /// The final byte of the file is a newline.
    pub ends_with_newline: bool,
    /// Lines per block; a multiple of 4 for FASTQ.
    pub block_line: usize,
}

/// Scan the whole input once: collect the field alphabets, measure line
/// widths, and derive the block size in lines.
pub fn scan(path: &Path, kind: FileKind) -> Result<ScanReport> {
    let mut reader = open_input(path)?;
    let ends_with_newline = file_ends_with_newline(reader.get_mut())?;
    let mut reader = LineReader::new(reader);

    let mut hdr_seen = [false; 256];
    let mut qs_seen = [false; 256];
    let mut max_hdr_len = 0usize;
    let mut max_qs_len = 0usize;
    let mut max_seq_len = 0usize;
    let mut just_plus = true;

    let mut line = Vec::new();
    let mut line_no = 0usize;
    while reader.next_line(&mut line)? {
        match kind {
            FileKind::Fasta => {
                if line.first() == Some(&b'>') {
                    for &b in &line[1..] {
                        hdr_seen[b as usize] = true;
                    }
                    max_hdr_len = max_hdr_len.max(line.len() - 1);
                } else {
                    max_seq_len = max_seq_len.max(line.len());
                }
            }
            FileKind::Fastq => {
                match line_no % 4 {
                    0 => {
                        let body = line.strip_prefix(b"@").unwrap_or(&line);
                        for &b in body {
                            hdr_seen[b as usize] = true;
                        }
                        max_hdr_len = max_hdr_len.max(body.len());
                    }
                    1 => max_seq_len = max_seq_len.max(line.len()),
                    2 => {
                        if line_no == 2 && line.len() > 1 {
                            just_plus = false;
                        }
                    }
                    _ => {
                        for &b in &line {
                            qs_seen[b as usize] = true;
                        }
                        max_qs_len = max_qs_len.max(line.len());
                    }
                }
            }
        }
        line_no += 1;
    }

    let collect = |seen: [bool; 256]| -> Vec<u8> {
        (0u16..256)
            .filter(|&b| seen[b as usize])
            .map(|b| b as u8)
            .collect()
    };

    let block_line = match kind {
        FileKind::Fasta => (BLOCK_SIZE / max_seq_len.max(1)).max(2),
        FileKind::Fastq => {
            let record_width = (max_hdr_len + 2 * max_qs_len).max(1);
            (4 * BLOCK_SIZE / record_width / 4 * 4).max(4)
        }
    };

    Ok(ScanReport {
        kind,
        hdr_alphabet: collect(hdr_seen),
        qs_alphabet: collect(qs_seen),
        just_plus,
        ends_with_newline,
        block_line,
    })
}

fn file_ends_with_newline(file: &mut File) -> Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    file.seek(SeekFrom::Start(0))?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_with(content: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn test_sniff_fasta_fastq_and_garbage() {
        let fa = temp_with(b">h\nACGT\n");
        assert_eq!(sniff(fa.path()).unwrap(), FileKind::Fasta);

        let fq = temp_with(b"@r\nACGT\n+\nIIII\n");
        assert_eq!(sniff(fq.path()).unwrap(), FileKind::Fastq);

        let bad = temp_with(b"hello world\n");
        assert!(matches!(sniff(bad.path()), Err(CryfaError::BadFileType)));

        let empty = temp_with(b"");
        assert!(matches!(sniff(empty.path()), Err(CryfaError::BadFileType)));
    }

    #[test]
    fn test_sniff_skips_leading_blank_lines() {
        let fa = temp_with(b"\n\n>h\nACGT\n");
        assert_eq!(sniff(fa.path()).unwrap(), FileKind::Fasta);
    }

    #[test]
    fn test_scan_fastq_alphabets() {
        let fq = temp_with(b"@r1\nACGN\n+\n!!I!\n@r2\nACGT\n+\nJJJJ\n");
        let report = scan(fq.path(), FileKind::Fastq).unwrap();
        assert_eq!(report.hdr_alphabet, vec![b'1', b'2', b'r']);
        assert_eq!(report.qs_alphabet, vec![b'!', b'I', b'J']);
        assert!(report.just_plus);
        assert!(report.ends_with_newline);
        assert_eq!(report.block_line % 4, 0);
    }

    #[test]
    fn test_scan_detects_plus_with_header() {
        let fq = temp_with(b"@r1\nACGT\n+r1\nIIII\n");
        let report = scan(fq.path(), FileKind::Fastq).unwrap();
        assert!(!report.just_plus);
    }

    #[test]
    fn test_scan_fasta_excludes_sentinel() {
        let fa = temp_with(b">chr1 x\nACGT\nAC\n>chr2 x\nGGTT\n");
        let report = scan(fa.path(), FileKind::Fasta).unwrap();
        assert_eq!(report.hdr_alphabet, vec![b' ', b'1', b'2', b'c', b'h', b'r', b'x']);
        assert!(report.qs_alphabet.is_empty());
        assert!(report.block_line >= 2);
    }

    #[test]
    fn test_scan_no_trailing_newline() {
        let fa = temp_with(b">h\nACGT");
        let report = scan(fa.path(), FileKind::Fasta).unwrap();
        assert!(!report.ends_with_newline);
    }

    #[test]
    fn test_block_line_floor() {
        // A single enormous line forces the FASTA floor of 2.
        let long = vec![b'A'; BLOCK_SIZE * 2];
        let mut content = b">h\n".to_vec();
        content.extend_from_slice(&long);
        content.push(b'\n');
        let fa = temp_with(&content);
        let report = scan(fa.path(), FileKind::Fasta).unwrap();
        assert_eq!(report.block_line, 2);
    }
}
