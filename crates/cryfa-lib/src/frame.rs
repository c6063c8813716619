//! Chunk framing and the stream header/trailer.
//!
//! This module is the single home of the reserved out-of-band bytes.
//! The packed payload produced by the codecs only ever *starts* a code
//! group with a byte below 252, so the markers below are unambiguous
//! wherever a scanner inspects the stream.

use std::io::{BufRead, Write};

use crate::error::{CryfaError, Result};

/// Introduces a trailing partial group: `255, count, count raw bytes`.
pub const PENALTY: u8 = 255;
/// Terminates a logical line; also terminates the header alphabet in the
/// stream header.
pub const LINE_END: u8 = 254;
/// FASTA header marker inside chunk payloads; leading byte of every chunk
/// length frame; "plus line repeats the header" flag in FASTQ headers.
pub const HDR_MARK: u8 = 253;
/// Blank line inside FASTA payloads; end of the chunk stream.
pub const STREAM_END: u8 = 252;
/// First stream byte of a FASTA file.
pub const FASTA_TAG: u8 = 127;
/// Shuffle flag byte values.
pub const SHUFFLE_ON: u8 = 128;
pub const SHUFFLE_OFF: u8 = 129;

/// Line written after each chunk payload, followed by the thread id.
const THR_ID_HDR: &[u8] = b"THR=";

/// Which record grammar the packed stream carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Fasta,
    Fastq,
}

/// Everything the decompressor needs before it can touch a chunk:
/// file kind, shuffle flag, the global alphabets and the `+`-line rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamHeader {
    pub kind: FileKind,
    pub shuffle: bool,
    /// Sorted distinct header bytes (full observed set, pre-truncation).
    pub hdr_alphabet: Vec<u8>,
    /// Sorted distinct quality bytes; empty for FASTA.
    pub qs_alphabet: Vec<u8>,
    /// FASTQ only: the `+` line carries nothing but `+`.
    pub just_plus: bool,
}

/// One framed chunk as read back from a worker temp file or from the
/// assembled stream.
#[derive(Debug)]
pub struct ChunkFrame {
    pub payload: Vec<u8>,
    pub thread_id: usize,
}

/// Write the stream header.
///
/// FASTA: `127, 128|129, <hdr alphabet>, 254`
/// FASTQ: `128|129, <hdr alphabet>, 254, <qs alphabet>, 253|'\n'`
pub fn write_stream_header<W: Write>(out: &mut W, hdr: &StreamHeader) -> Result<()> {
    let shuffle_byte = if hdr.shuffle { SHUFFLE_ON } else { SHUFFLE_OFF };
    match hdr.kind {
        FileKind::Fasta => {
            out.write_all(&[FASTA_TAG, shuffle_byte])?;
            out.write_all(&hdr.hdr_alphabet)?;
            out.write_all(&[LINE_END])?;
        }
        FileKind::Fastq => {
            out.write_all(&[shuffle_byte])?;
            out.write_all(&hdr.hdr_alphabet)?;
            out.write_all(&[LINE_END])?;
            out.write_all(&hdr.qs_alphabet)?;
            // 253: the plus line repeats the header; '\n': it is bare.
            out.write_all(&[if hdr.just_plus { b'\n' } else { HDR_MARK }])?;
        }
    }
    Ok(())
}

/// Parse the stream header from the front of the decrypted packed stream,
/// advancing `pos` past it.
pub fn read_stream_header(data: &[u8], pos: &mut usize) -> Result<StreamHeader> {
    let kind = match data.first() {
        Some(&FASTA_TAG) => FileKind::Fasta,
        Some(_) => FileKind::Fastq,
        None => return Err(CryfaError::CorruptStream("empty stream".into())),
    };
    if kind == FileKind::Fasta {
        *pos += 1;
    }

    let shuffle = match data.get(*pos) {
        Some(&SHUFFLE_ON) => true,
        Some(&SHUFFLE_OFF) => false,
        _ => return Err(CryfaError::CorruptStream("bad shuffle flag byte".into())),
    };
    *pos += 1;

    let mut hdr_alphabet = Vec::new();
    loop {
        match data.get(*pos) {
            Some(&LINE_END) => {
                *pos += 1;
                break;
            }
            Some(&b) => {
                hdr_alphabet.push(b);
                *pos += 1;
            }
            None => return Err(CryfaError::CorruptStream("unterminated header alphabet".into())),
        }
    }

    let mut qs_alphabet = Vec::new();
    let mut just_plus = false;
    if kind == FileKind::Fastq {
        loop {
            match data.get(*pos) {
                Some(&b'\n') => {
                    just_plus = true;
                    *pos += 1;
                    break;
                }
                Some(&HDR_MARK) => {
                    just_plus = false;
                    *pos += 1;
                    break;
                }
                Some(&b) => {
                    qs_alphabet.push(b);
                    *pos += 1;
                }
                None => {
                    return Err(CryfaError::CorruptStream(
                        "unterminated quality alphabet".into(),
                    ))
                }
            }
        }
    }

    Ok(StreamHeader {
        kind,
        shuffle,
        hdr_alphabet,
        qs_alphabet,
        just_plus,
    })
}

/// Write one framed chunk:
/// `253, <ascii decimal payload length>, 254, <payload>, '\n', "THR=", <t>, '\n'`
pub fn write_chunk<W: Write>(out: &mut W, payload: &[u8], thread_id: usize) -> Result<()> {
    out.write_all(&[HDR_MARK])?;
    out.write_all(payload.len().to_string().as_bytes())?;
    out.write_all(&[LINE_END])?;
    out.write_all(payload)?;
    out.write_all(b"\n")?;
    out.write_all(THR_ID_HDR)?;
    out.write_all(thread_id.to_string().as_bytes())?;
    out.write_all(b"\n")?;
    Ok(())
}

/// Read the next framed chunk from a worker temp file. Returns `None` at
/// end of file.
pub fn read_chunk<R: BufRead>(reader: &mut R) -> Result<Option<ChunkFrame>> {
    let mut lead = [0u8; 1];
    if !read_exact_or_eof(reader, &mut lead)? {
        return Ok(None);
    }
    if lead[0] != HDR_MARK {
        return Err(CryfaError::CorruptStream(format!(
            "expected chunk frame, found byte {}",
            lead[0]
        )));
    }
    let len = read_ascii_length(reader)?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    let thread_id = read_thread_terminator(reader)?;
    Ok(Some(ChunkFrame { payload, thread_id }))
}

/// Parse the next framed chunk from an in-memory stream, advancing `pos`.
/// Returns `None` when the leading byte is the stream-end marker (which is
/// left unconsumed for the trailer reader).
pub fn next_chunk(data: &[u8], pos: &mut usize) -> Result<Option<ChunkFrame>> {
    match data.get(*pos) {
        None => Err(CryfaError::CorruptStream("missing stream trailer".into())),
        Some(&STREAM_END) => Ok(None),
        Some(&HDR_MARK) => {
            *pos += 1;
            let start = *pos;
            while data.get(*pos).is_some_and(|&b| b.is_ascii_digit()) {
                *pos += 1;
            }
            if *pos == start || data.get(*pos) != Some(&LINE_END) {
                return Err(CryfaError::CorruptStream("bad chunk length prefix".into()));
            }
            let len: usize = std::str::from_utf8(&data[start..*pos])
                .expect("digits are ASCII")
                .parse()
                .map_err(|_| CryfaError::CorruptStream("chunk length overflow".into()))?;
            *pos += 1; // LINE_END
            let end = pos
                .checked_add(len)
                .ok_or_else(|| CryfaError::CorruptStream("chunk length overflow".into()))?;
            let payload = data
                .get(*pos..end)
                .ok_or_else(|| CryfaError::CorruptStream("truncated chunk payload".into()))?
                .to_vec();
            *pos = end;
            let thread_id = parse_thread_terminator(data, pos)?;
            Ok(Some(ChunkFrame { payload, thread_id }))
        }
        Some(&b) => Err(CryfaError::CorruptStream(format!(
            "expected chunk frame, found byte {b}"
        ))),
    }
}

/// Write the stream trailer: the end marker plus the final-newline flag.
pub fn write_stream_trailer<W: Write>(out: &mut W, ends_with_newline: bool) -> Result<()> {
    out.write_all(&[STREAM_END, ends_with_newline as u8])?;
    Ok(())
}

/// Read the stream trailer, returning the final-newline flag.
pub fn read_stream_trailer(data: &[u8], pos: &mut usize) -> Result<bool> {
    if data.get(*pos) != Some(&STREAM_END) {
        return Err(CryfaError::CorruptStream("missing stream end marker".into()));
    }
    *pos += 1;
    let flag = data
        .get(*pos)
        .ok_or_else(|| CryfaError::CorruptStream("missing newline flag".into()))?;
    *pos += 1;
    Ok(*flag != 0)
}

fn read_exact_or_eof<R: BufRead>(reader: &mut R, buf: &mut [u8; 1]) -> Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn read_ascii_length<R: BufRead>(reader: &mut R) -> Result<usize> {
    let mut digits = Vec::new();
    loop {
        let mut b = [0u8; 1];
        reader.read_exact(&mut b)?;
        match b[0] {
            LINE_END => break,
            d if d.is_ascii_digit() => digits.push(d),
            other => {
                return Err(CryfaError::CorruptStream(format!(
                    "bad byte {other} in chunk length prefix"
                )))
            }
        }
    }
    if digits.is_empty() {
        return Err(CryfaError::CorruptStream("empty chunk length prefix".into()));
    }
    std::str::from_utf8(&digits)
        .expect("digits are ASCII")
        .parse()
        .map_err(|_| CryfaError::CorruptStream("chunk length overflow".into()))
}

fn read_thread_terminator<R: BufRead>(reader: &mut R) -> Result<usize> {
    let mut nl = [0u8; 1];
    reader.read_exact(&mut nl)?;
    if nl[0] != b'\n' {
        return Err(CryfaError::CorruptStream("missing chunk terminator".into()));
    }
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    parse_thr_line(&line)
}

fn parse_thread_terminator(data: &[u8], pos: &mut usize) -> Result<usize> {
    if data.get(*pos) != Some(&b'\n') {
        return Err(CryfaError::CorruptStream("missing chunk terminator".into()));
    }
    *pos += 1;
    let start = *pos;
    while data.get(*pos).is_some_and(|&b| b != b'\n') {
        *pos += 1;
    }
    if data.get(*pos) != Some(&b'\n') {
        return Err(CryfaError::CorruptStream("unterminated THR line".into()));
    }
    let id = parse_thr_line(&data[start..*pos + 1])?;
    *pos += 1;
    Ok(id)
}

fn parse_thr_line(line: &[u8]) -> Result<usize> {
    let body = line.strip_suffix(b"\n").unwrap_or(line);
    let digits = body
        .strip_prefix(THR_ID_HDR)
        .ok_or_else(|| CryfaError::CorruptStream("missing THR= terminator".into()))?;
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| CryfaError::CorruptStream("bad thread id in THR= terminator".into()))
}
