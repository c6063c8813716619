use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cryfa_lib::cli::{CompressConfig, DecompressConfig};

#[derive(Parser)]
#[command(name = "cryfa")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "FASTA/FASTQ compaction plus encryption", long_about = None)]
struct Cli {
    /// Print information about the tool and exit
    #[arg(short = 'a', long)]
    about: bool,

    /// Verbose mode: log stream and cipher sizes
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Do not shuffle chunk payloads
    #[arg(short = 's', long = "disable_shuffle")]
    disable_shuffle: bool,

    /// Decrypt and reconstruct instead of compacting
    #[arg(short = 'd', long)]
    decrypt: bool,

    /// Password file; its entire contents form the password
    #[arg(short = 'k', long = "key", value_name = "passfile", required_unless_present = "about")]
    key: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short = 't', long = "thread", value_name = "N", default_value_t = 1)]
    threads: usize,

    /// Output file (defaults to stdout)
    #[arg(short = 'o', long, value_name = "FILE", default_value = "-")]
    output: PathBuf,

    /// Input FASTA/FASTQ file, or an encrypted file with --decrypt
    #[arg(value_name = "input", required_unless_present = "about")]
    input: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(if cli.verbose { "debug" } else { "info" })
            }),
        )
        .init();

    if cli.about {
        println!(
            "cryfa v{} - FASTA/FASTQ compaction plus encryption",
            env!("CARGO_PKG_VERSION")
        );
        println!("Packs sequence data by its observed alphabets and seals it with AES-CBC.");
        return Ok(());
    }

    // clap guarantees these are present unless --about was given
    let input = cli.input.expect("input is required");
    let key_file = cli.key.expect("key file is required");

    if cli.decrypt {
        info!("Decompressing...");
        let config = DecompressConfig {
            input,
            output: cli.output,
            key_file,
            threads: cli.threads,
            verbose: cli.verbose,
        };
        cryfa_lib::decompress(&config)?;
    } else {
        info!("Compacting...");
        let config = CompressConfig {
            input,
            output: cli.output,
            key_file,
            threads: cli.threads,
            disable_shuffle: cli.disable_shuffle,
            verbose: cli.verbose,
        };
        cryfa_lib::compress(&config)?;
    }

    Ok(())
}
