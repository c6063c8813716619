//! Reconstruction direction: decrypt, parse frames, parallel decode.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, info};

use super::RunCodecs;
use crate::cli::{is_stdio_path, read_password, DecompressConfig};
use crate::error::{CryfaError, Result};
use crate::frame::{self, FileKind, StreamHeader, HDR_MARK, STREAM_END};
use crate::{crypto, shuffle};

/// Decrypt and reconstruct `cfg.input` to `cfg.output`, byte-for-byte.
pub fn decompress(cfg: &DecompressConfig) -> Result<()> {
    let password = read_password(&cfg.key_file)?;
    let envelope = std::fs::read(&cfg.input).map_err(|source| CryfaError::InputOpenFailed {
        path: cfg.input.clone(),
        source,
    })?;
    info!("decompressing {:?}", cfg.input);

    let packed = crypto::decrypt(&envelope, &password)?;

    let mut pos = 0usize;
    let header = frame::read_stream_header(&packed, &mut pos)?;
    if cfg.verbose {
        info!(
            "{} stream, {} header symbols, {} quality symbols, shuffle {}",
            match header.kind {
                FileKind::Fasta => "FASTA",
                FileKind::Fastq => "FASTQ",
            },
            header.hdr_alphabet.len(),
            header.qs_alphabet.len(),
            if header.shuffle { "on" } else { "off" }
        );
    }

    let mut chunks: Vec<Vec<u8>> = Vec::new();
    while let Some(chunk) = frame::next_chunk(&packed, &mut pos)? {
        chunks.push(chunk.payload);
    }
    let ends_with_newline = frame::read_stream_trailer(&packed, &mut pos)?;
    debug!("{} chunks to decode", chunks.len());

    let codecs = RunCodecs::for_header(&header);
    let seed = header
        .shuffle
        .then(|| shuffle::seed_from_password(&password));

    let n_threads = cfg.threads.max(1);
    let mut decoded: Vec<Vec<u8>> = vec![Vec::new(); chunks.len()];

    std::thread::scope(|scope| -> Result<()> {
        let chunks = &chunks;
        let header = &header;
        let codecs = &codecs;
        let handles: Vec<_> = (0..n_threads)
            .map(|w| {
                scope.spawn(move || -> Result<Vec<(usize, Vec<u8>)>> {
                    let mut outs = Vec::new();
                    for idx in (w..chunks.len()).step_by(n_threads) {
                        let mut payload = chunks[idx].clone();
                        if let Some(seed) = seed {
                            shuffle::unshuffle(&mut payload, seed);
                        }
                        outs.push((idx, decode_chunk(header, codecs, &payload)?));
                    }
                    Ok(outs)
                })
            })
            .collect();
        for handle in handles {
            let outs = match handle.join() {
                Ok(result) => result?,
                Err(panic) => std::panic::resume_unwind(panic),
            };
            for (idx, text) in outs {
                decoded[idx] = text;
            }
        }
        Ok(())
    })?;

    let mut output: Vec<u8> = Vec::with_capacity(decoded.iter().map(Vec::len).sum());
    for text in decoded {
        output.extend_from_slice(&text);
    }
    if !ends_with_newline && output.last() == Some(&b'\n') {
        output.pop();
    }

    write_output(&cfg.output, &output)?;
    info!("reconstructed {} bytes", output.len());
    Ok(())
}

/// Decode one unshuffled chunk payload back to input text.
fn decode_chunk(header: &StreamHeader, codecs: &RunCodecs, payload: &[u8]) -> Result<Vec<u8>> {
    match header.kind {
        FileKind::Fasta => decode_fasta_chunk(codecs, payload),
        FileKind::Fastq => decode_fastq_chunk(codecs, header.just_plus, payload),
    }
}

pub(super) fn decode_fasta_chunk(codecs: &RunCodecs, payload: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(payload.len() * 3);
    let mut pos = 0usize;
    while pos < payload.len() {
        match payload[pos] {
            HDR_MARK => {
                pos += 1;
                out.push(b'>');
                codecs.hdr.unpack_line(payload, &mut pos, &mut out)?;
                out.push(b'\n');
            }
            STREAM_END => {
                // blank input line
                pos += 1;
                out.push(b'\n');
            }
            _ => {
                codecs.dna.unpack_line(payload, &mut pos, &mut out)?;
                out.push(b'\n');
            }
        }
    }
    Ok(out)
}

pub(super) fn decode_fastq_chunk(
    codecs: &RunCodecs,
    just_plus: bool,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(payload.len() * 3);
    let mut pos = 0usize;
    while pos < payload.len() {
        out.push(b'@');
        let hdr_start = out.len();
        codecs.hdr.unpack_line(payload, &mut pos, &mut out)?;
        let hdr_end = out.len();
        out.push(b'\n');

        codecs.dna.unpack_line(payload, &mut pos, &mut out)?;
        out.push(b'\n');

        out.push(b'+');
        if !just_plus {
            out.extend_from_within(hdr_start..hdr_end);
        }
        out.push(b'\n');

        codecs.qs.unpack_line(payload, &mut pos, &mut out)?;
        out.push(b'\n');
    }
    Ok(out)
}

fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    if is_stdio_path(path) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        lock.write_all(data)?;
        lock.flush()?;
    } else {
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(data)?;
        out.flush()?;
    }
    Ok(())
}
