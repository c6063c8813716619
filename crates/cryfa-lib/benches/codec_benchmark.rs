//! Throughput benchmarks for the packing codecs and the shuffler.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cryfa_lib::codec::{DnaCodec, SymbolCodec};
use cryfa_lib::frame::LINE_END;
use cryfa_lib::shuffle;

/// Synthetic sequence data over the five-letter alphabet.
fn sequence_data(len: usize) -> Vec<u8> {
    (0..len).map(|i| b"ACGTN"[i % 5]).collect()
}

/// Synthetic quality data over a 40-symbol alphabet (Illumina-like).
fn quality_data(len: usize) -> Vec<u8> {
    (0..len).map(|i| b'!' + (i % 40) as u8).collect()
}

fn benchmark_dna_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("dna_codec");
    group.measurement_time(Duration::from_secs(10));

    let codec = DnaCodec::new();
    for (name, len) in [("1k", 1024), ("100k", 100 * 1024), ("1m", 1024 * 1024)] {
        let line = sequence_data(len);
        group.bench_function(format!("pack_{name}"), |b| {
            b.iter(|| {
                let mut out = Vec::with_capacity(len / 3 + 1);
                codec.pack_line(black_box(&line), &mut out);
                out
            });
        });

        let mut packed = Vec::new();
        codec.pack_line(&line, &mut packed);
        packed.push(LINE_END);
        group.bench_function(format!("unpack_{name}"), |b| {
            b.iter(|| {
                let mut pos = 0;
                let mut out = Vec::with_capacity(len);
                codec
                    .unpack_line(black_box(&packed), &mut pos, &mut out)
                    .unwrap();
                out
            });
        });
    }
    group.finish();
}

fn benchmark_symbol_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("symbol_codec");
    group.measurement_time(Duration::from_secs(10));

    let alphabet: Vec<u8> = (b'!'..b'!' + 40).collect();
    let codec = SymbolCodec::new(&alphabet);
    let line = quality_data(100 * 1024);

    group.bench_function("pack_large_100k", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(line.len());
            codec.pack_line(black_box(&line), &mut out).unwrap();
            out
        });
    });

    let small_alphabet: Vec<u8> = (b'!'..b'!' + 8).collect();
    let small_codec = SymbolCodec::new(&small_alphabet);
    let small_line: Vec<u8> = (0..100 * 1024).map(|i| b'!' + (i % 8) as u8).collect();
    group.bench_function("pack_2to1_100k", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(small_line.len());
            small_codec.pack_line(black_box(&small_line), &mut out).unwrap();
            out
        });
    });

    group.finish();
}

fn benchmark_shuffle(c: &mut Criterion) {
    let mut group = c.benchmark_group("shuffle");
    group.measurement_time(Duration::from_secs(10));

    let seed = shuffle::seed_from_password(b"benchmark-password");
    let chunk = quality_data(64 * 1024);

    group.bench_function("shuffle_64k", |b| {
        b.iter(|| {
            let mut data = chunk.clone();
            shuffle::shuffle(black_box(&mut data), seed);
            data
        });
    });
    group.bench_function("unshuffle_64k", |b| {
        b.iter(|| {
            let mut data = chunk.clone();
            shuffle::unshuffle(black_box(&mut data), seed);
            data
        });
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().warm_up_time(Duration::from_secs(3));
    targets = benchmark_dna_codec, benchmark_symbol_codec, benchmark_shuffle
}

criterion_main!(benches);
