//! OxiFlate CLI - gzip, zlib and raw DEFLATE from the command line.
//!
//! A Pure Rust front end for the OxiFlate streaming codec.

mod commands;
mod utils;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use commands::{
    Algorithm, CompressOptions, DecompressOptions, cmd_checksum, cmd_compress, cmd_decompress,
    cmd_info, cmd_test,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use utils::{Format, StrategyArg};

#[derive(Parser)]
#[command(name = "oxiflate")]
#[command(author, version, about = "Pure Rust gzip, zlib and raw DEFLATE utility")]
#[command(long_about = "
OxiFlate compresses and decompresses gzip (RFC 1952), zlib (RFC 1950) and
raw DEFLATE (RFC 1951) streams.

Without FILES, compress and decompress read stdin and write stdout.

Examples:
  oxiflate compress notes.txt
  oxiflate compress -l 9 --format zlib data.bin
  oxiflate compress -c report.csv > report.csv.gz
  oxiflate decompress notes.txt.gz
  oxiflate test archive.gz
  oxiflate info --json notes.txt.gz
  oxiflate checksum --algorithm adler32 data.bin
  oxiflate completions bash
")]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress files
    #[command(alias = "c")]
    Compress {
        /// Files to compress (stdin if empty)
        files: Vec<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "gzip")]
        format: Format,

        /// Compression level (0 = store, 9 = best)
        #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(0..=9))]
        level: u8,

        /// Matching strategy
        #[arg(long, value_enum, default_value = "default")]
        strategy: StrategyArg,

        /// Keep input files
        #[arg(short, long)]
        keep: bool,

        /// Write to stdout
        #[arg(short = 'c', long)]
        stdout: bool,

        /// Overwrite existing output files
        #[arg(short, long)]
        force: bool,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Decompress files
    #[command(alias = "d")]
    Decompress {
        /// Files to decompress (stdin if empty)
        files: Vec<PathBuf>,

        /// Input format (detected from the data if not given)
        #[arg(long, value_enum)]
        format: Option<Format>,

        /// Keep input files
        #[arg(short, long)]
        keep: bool,

        /// Write to stdout
        #[arg(short = 'c', long)]
        stdout: bool,

        /// Overwrite existing output files
        #[arg(short, long)]
        force: bool,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Test compressed file integrity
    #[command(alias = "t")]
    Test {
        /// Files to test
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Input format (detected from the data if not given)
        #[arg(long, value_enum)]
        format: Option<Format>,
    },

    /// Show information about compressed files
    #[command(alias = "i")]
    Info {
        /// Files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },

    /// Print CRC-32 or Adler-32 checksums
    Checksum {
        /// Files to checksum (stdin if empty)
        files: Vec<PathBuf>,

        /// Checksum algorithm
        #[arg(short, long, value_enum, default_value = "crc32")]
        algorithm: Algorithm,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` is honored unless `-v` asks for a specific level.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Compress {
            files,
            format,
            level,
            strategy,
            keep,
            stdout,
            force,
            progress,
        } => cmd_compress(
            &files,
            &CompressOptions {
                format,
                level,
                strategy: strategy.into(),
                keep,
                stdout,
                force,
                progress,
            },
        ),
        Commands::Decompress {
            files,
            format,
            keep,
            stdout,
            force,
            progress,
        } => cmd_decompress(
            &files,
            &DecompressOptions {
                format,
                keep,
                stdout,
                force,
                progress,
            },
        ),
        Commands::Test { files, format } => cmd_test(&files, format),
        Commands::Info { files, json } => cmd_info(&files, json),
        Commands::Checksum { files, algorithm } => cmd_checksum(&files, algorithm),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "oxiflate", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
