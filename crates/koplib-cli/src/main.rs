//! `koplib` — build and reduce kernel-operation metadata libraries.
//!
//! `koplib build` folds one architecture's metadata documents into the
//! shared library file (or a per-architecture intermediate); `koplib reduce`
//! merges all intermediates into the final library. Both exit non-zero on
//! any unrecoverable load, merge, or publish failure and succeed only after
//! the destination is durably and atomically updated.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use koplib_core::{
    build_library, reduce_intermediates, BuildRequest, DocumentFormat, LibraryFormat, MergePolicy,
    ReduceRequest,
};

#[derive(Debug, Parser)]
#[command(name = "koplib", version, about = "Kernel-operation metadata library builder")]
struct Cli {
    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse op metadata documents and build the library for one architecture
    Build {
        /// Directory containing op metadata documents
        #[arg(long)]
        src: PathBuf,

        /// Path to the code-object file (its basename is embedded in records)
        #[arg(long)]
        co: PathBuf,

        /// GPU architecture, e.g. gfx90a
        #[arg(long)]
        arch: String,

        /// Input metadata document format
        #[arg(long = "input-format", default_value = "yaml")]
        input_format: DocumentFormat,

        /// Library output format
        #[arg(long = "format", default_value = "dat")]
        format: LibraryFormat,

        /// Output directory
        #[arg(long, default_value = ".")]
        output: PathBuf,

        /// Write a per-architecture intermediate file instead of merging
        /// into the final library
        #[arg(long)]
        intermediate: bool,
    },

    /// Merge per-architecture intermediate libraries into the final library
    Reduce {
        /// Output directory holding the intermediates and the final library
        #[arg(long, default_value = ".")]
        output: PathBuf,

        /// Library format
        #[arg(long = "format", default_value = "dat")]
        format: LibraryFormat,

        /// Merge policy across fragments
        #[arg(long = "merge-policy", default_value = "deep")]
        merge_policy: MergePolicy,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("koplib={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let published = match cli.command {
        Command::Build {
            src,
            co,
            arch,
            input_format,
            format,
            output,
            intermediate,
        } => build_library(&BuildRequest {
            src_dir: src,
            co_path: co,
            arch,
            input_format,
            output_format: format,
            output_dir: output,
            intermediate,
        })?,
        Command::Reduce {
            output,
            format,
            merge_policy,
        } => reduce_intermediates(&ReduceRequest {
            output_dir: output,
            output_format: format,
            policy: merge_policy,
        })?,
    };

    tracing::info!("Done: {}", published.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_build_defaults() {
        let cli = Cli::parse_from([
            "koplib", "build", "--src", "meta", "--co", "kernels.co", "--arch", "gfx90a",
        ]);
        match cli.command {
            Command::Build {
                input_format,
                format,
                output,
                intermediate,
                ..
            } => {
                assert_eq!(input_format, DocumentFormat::Yaml);
                assert_eq!(format, LibraryFormat::Dat);
                assert_eq!(output, PathBuf::from("."));
                assert!(!intermediate);
            }
            _ => panic!("expected build subcommand"),
        }
    }

    #[test]
    fn test_cli_parses_reduce_policy() {
        let cli = Cli::parse_from(["koplib", "reduce", "--merge-policy", "shallow"]);
        match cli.command {
            Command::Reduce { merge_policy, .. } => {
                assert_eq!(merge_policy, MergePolicy::Shallow)
            }
            _ => panic!("expected reduce subcommand"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from([
            "koplib", "build", "--src", "meta", "--co", "k.co", "--arch", "gfx90a", "--format",
            "msgpack",
        ])
        .is_err());
    }
}
