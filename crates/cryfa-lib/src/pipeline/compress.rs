//! Compaction direction: scan, parallel pack, reassemble, encrypt.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Instant;

use tracing::{debug, info};

use super::RunCodecs;
use crate::cli::{is_stdio_path, read_password, CompressConfig};
use crate::error::{CryfaError, Result};
use crate::frame::{self, FileKind, StreamHeader, HDR_MARK, LINE_END, STREAM_END};
use crate::io::{open_input, scan, sniff, LineReader, ScanReport};
use crate::{crypto, shuffle};

/// Immutable per-run state shared by every packing worker.
struct PackContext {
    input: PathBuf,
    report: ScanReport,
    codecs: RunCodecs,
    shuffle_seed: Option<u32>,
    n_threads: usize,
    shuffle_notice: Once,
}

/// Compact and encrypt `cfg.input` into the envelope at `cfg.output`.
pub fn compress(cfg: &CompressConfig) -> Result<()> {
    let start_time = Instant::now();
    let password = read_password(&cfg.key_file)?;
    let kind = sniff(&cfg.input)?;
    info!(
        "compacting {:?} as {}",
        cfg.input,
        match kind {
            FileKind::Fasta => "FASTA",
            FileKind::Fastq => "FASTQ",
        }
    );

    let report = scan(&cfg.input, kind)?;
    debug!(
        "scan: {} header symbols, {} quality symbols, block of {} lines",
        report.hdr_alphabet.len(),
        report.qs_alphabet.len(),
        report.block_line
    );

    let n_threads = cfg.threads.max(1);
    let ctx = PackContext {
        input: cfg.input.clone(),
        codecs: RunCodecs::new(&report.hdr_alphabet, &report.qs_alphabet),
        shuffle_seed: (!cfg.disable_shuffle).then(|| shuffle::seed_from_password(&password)),
        n_threads,
        shuffle_notice: Once::new(),
        report,
    };

    // One private, append-only temp file per worker; the directory is
    // removed on drop regardless of how the run ends.
    let tmp_dir = tempfile::tempdir()?;
    let part_path = |t: usize| tmp_dir.path().join(format!("part{t}"));

    std::thread::scope(|scope| -> Result<()> {
        let handles: Vec<_> = (0..n_threads)
            .map(|t| {
                let ctx = &ctx;
                let path = part_path(t);
                scope.spawn(move || pack_worker(ctx, t, &path))
            })
            .collect();
        for handle in handles {
            match handle.join() {
                Ok(result) => result?,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        Ok(())
    })?;

    let packed = assemble(&ctx, &part_path)?;
    let envelope = crypto::encrypt(&packed, &password)?;
    if cfg.verbose {
        info!(
            "packed stream: {} bytes, envelope: {} bytes, cipher block: 16 bytes",
            packed.len(),
            envelope.len()
        );
    }

    write_output(&cfg.output, &envelope)?;

    let original_size = std::fs::metadata(&cfg.input).map(|m| m.len() as usize).unwrap_or(0);
    log_compaction_stats(original_size, packed.len(), envelope.len(), start_time.elapsed());
    Ok(())
}

/// Format bytes as a human-readable string (e.g. "1.23 GiB").
fn humanize_bytes(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let b = bytes as f64;
    if b >= GIB {
        format!("{:.2} GiB", b / GIB)
    } else if b >= MIB {
        format!("{:.1} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.0} KiB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn log_compaction_stats(
    original_size: usize,
    packed_size: usize,
    envelope_size: usize,
    elapsed: std::time::Duration,
) {
    info!("compaction completed in {:.2}s", elapsed.as_secs_f64());
    info!(
        "original: {}, packed: {}, envelope: {}",
        humanize_bytes(original_size),
        humanize_bytes(packed_size),
        humanize_bytes(envelope_size)
    );
    if envelope_size > 0 && original_size > 0 {
        info!(
            "compaction ratio: {:.2}x",
            original_size as f64 / envelope_size as f64
        );
    }
}

/// Pack every N-th block of the input into a private temp file.
fn pack_worker(ctx: &PackContext, thread_id: usize, out_path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(out_path)?);
    let mut reader = LineReader::new(open_input(&ctx.input)?);

    let block_line = ctx.report.block_line;
    if !reader.skip_lines(thread_id * block_line)? {
        return Ok(());
    }
    let mut file_line = thread_id * block_line;

    let mut lines: Vec<Vec<u8>> = Vec::with_capacity(block_line);
    let mut buf = Vec::new();
    loop {
        lines.clear();
        while lines.len() < block_line && reader.next_line(&mut buf)? {
            lines.push(std::mem::take(&mut buf));
        }
        if lines.is_empty() {
            break;
        }

        let mut payload = pack_block(ctx, &lines, file_line)?;
        if let Some(seed) = ctx.shuffle_seed {
            ctx.shuffle_notice.call_once(|| info!("shuffling chunk payloads"));
            shuffle::shuffle(&mut payload, seed);
        }
        frame::write_chunk(&mut out, &payload, thread_id)?;

        if lines.len() < block_line {
            break;
        }
        file_line += ctx.n_threads * block_line;
        if !reader.skip_lines((ctx.n_threads - 1) * block_line)? {
            break;
        }
    }
    out.flush()?;
    Ok(())
}

/// Pack one block of input lines into chunk payload bytes.
fn pack_block(ctx: &PackContext, lines: &[Vec<u8>], first_line: usize) -> Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(lines.iter().map(|l| l.len() / 2 + 2).sum());
    match ctx.report.kind {
        FileKind::Fasta => pack_fasta_lines(&ctx.codecs, lines, first_line, &mut payload)?,
        FileKind::Fastq => pack_fastq_records(&ctx.codecs, lines, &mut payload)?,
    }
    Ok(payload)
}

pub(super) fn pack_fasta_lines(
    codecs: &RunCodecs,
    lines: &[Vec<u8>],
    first_line: usize,
    payload: &mut Vec<u8>,
) -> Result<()> {
    for (i, line) in lines.iter().enumerate() {
        if line.first() == Some(&b'>') {
            payload.push(HDR_MARK);
            codecs.hdr.pack_line(&line[1..], payload)?;
            payload.push(LINE_END);
        } else if line.is_empty() {
            payload.push(STREAM_END);
        } else {
            if line.iter().any(|b| b.is_ascii_whitespace()) {
                return Err(CryfaError::InvalidSequence {
                    line: first_line + i + 1,
                });
            }
            codecs.dna.pack_line(line, payload);
            payload.push(LINE_END);
        }
    }
    Ok(())
}

pub(super) fn pack_fastq_records(
    codecs: &RunCodecs,
    lines: &[Vec<u8>],
    payload: &mut Vec<u8>,
) -> Result<()> {
    for record in lines.chunks(4) {
        if record.len() < 4 {
            return Err(CryfaError::CorruptStream(
                "truncated FASTQ record at end of input".into(),
            ));
        }
        let header = record[0]
            .strip_prefix(b"@")
            .ok_or_else(|| CryfaError::CorruptStream("FASTQ header does not start with @".into()))?;
        codecs.hdr.pack_line(header, payload)?;
        payload.push(LINE_END);
        codecs.dna.pack_line(&record[1], payload);
        payload.push(LINE_END);
        // The plus line is not stored; it is re-derived from the stream
        // header on reconstruction.
        if record[2].first() != Some(&b'+') {
            return Err(CryfaError::CorruptStream(
                "FASTQ separator line does not start with +".into(),
            ));
        }
        codecs.qs.pack_line(&record[3], payload)?;
        payload.push(LINE_END);
    }
    Ok(())
}

/// Stitch the per-thread temp files back into one packed stream, in
/// round-robin thread order, and close it with the trailer.
fn assemble(ctx: &PackContext, part_path: &dyn Fn(usize) -> PathBuf) -> Result<Vec<u8>> {
    let mut packed = Vec::new();
    frame::write_stream_header(
        &mut packed,
        &StreamHeader {
            kind: ctx.report.kind,
            shuffle: ctx.shuffle_seed.is_some(),
            hdr_alphabet: ctx.report.hdr_alphabet.clone(),
            qs_alphabet: ctx.report.qs_alphabet.clone(),
            just_plus: ctx.report.just_plus,
        },
    )?;

    let mut readers = Vec::with_capacity(ctx.n_threads);
    for t in 0..ctx.n_threads {
        readers.push(BufReader::new(File::open(part_path(t))?));
    }

    let mut done = vec![false; ctx.n_threads];
    let mut chunks = 0usize;
    while !done.iter().all(|&d| d) {
        for (t, reader) in readers.iter_mut().enumerate() {
            if done[t] {
                continue;
            }
            match frame::read_chunk(reader)? {
                Some(chunk) => {
                    frame::write_chunk(&mut packed, &chunk.payload, chunk.thread_id)?;
                    chunks += 1;
                }
                None => done[t] = true,
            }
        }
    }
    debug!("assembled {chunks} chunks from {} threads", ctx.n_threads);

    frame::write_stream_trailer(&mut packed, ctx.report.ends_with_newline)?;
    Ok(packed)
}

fn write_output(path: &Path, envelope: &[u8]) -> Result<()> {
    if is_stdio_path(path) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        lock.write_all(envelope)?;
        lock.flush()?;
    } else {
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(envelope)?;
        out.flush()?;
    }
    Ok(())
}
