//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum that represents the available subcommands and their
//! options.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use facefind::commands::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! match cli.command {
//!     Commands::Build { input_dir, .. } => println!("building from {}", input_dir.display()),
//!     _ => {}
//! }
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// Path to the YAML config file. Defaults to the per-platform config directory.
    #[arg(long, global = true, env = "FACEFIND_CONFIG")]
    pub config: Option<PathBuf>,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Build an index from a directory of precomputed embedding files (*.json, *.f32).
    #[clap(name = "build", alias = "b")]
    Build {
        /// Directory holding one embedding file per face.
        input_dir: PathBuf,

        /// Where to write the index file (overrides the config).
        #[arg(long)]
        index: Option<PathBuf>,

        /// Where to write the identifier list (overrides the config).
        #[arg(long)]
        identifiers: Option<PathBuf>,

        /// Reject embeddings whose length differs from this.
        #[arg(long, short = 'd', value_parser = positive)]
        dimension: Option<usize>,
    },

    /// Find the indexed faces closest to the embedding stored in a file.
    #[clap(name = "query", alias = "q")]
    Query {
        /// Embedding file (*.json or *.f32). `null` / empty means no face.
        embedding: PathBuf,

        /// Number of matches to print. Defaults to the config's `default_k`.
        #[arg(short = 'k', value_parser = positive)]
        k: Option<usize>,

        /// Also print the squared L2 distance of each match.
        #[arg(long)]
        distances: bool,
    },

    /// Print index statistics, or one stored record.
    #[clap(name = "inspect")]
    Inspect {
        /// Slot to print.
        #[arg(long)]
        slot: Option<usize>,
    },

    /// Write a default config file into the config directory.
    Init,
}

/// Parses a strictly positive count.
fn positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be greater than zero".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
