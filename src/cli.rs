//! Command-line interface definition using clap.
//!
//! This module defines:
//! - [`Args`] - top-level argument structure
//! - [`Command`] - the `detect`, `parse` and `formats` subcommands

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_BATCH_SIZE;

/// Detect and stream-decode chat exports into normalized events.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatimport")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    chatimport detect export.json
    chatimport parse export.json > events.jsonl
    chatimport parse export.json --batch-size 1000 --summary
    chatimport parse dump.json --format wechat-json
    chatimport formats

Set RUST_LOG=debug for diagnostic output on stderr.")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the format of an export file
    Detect {
        /// Path to the export file
        input: PathBuf,
    },

    /// Parse an export and write its events as JSON lines to stdout
    Parse {
        /// Path to the export file
        input: PathBuf,

        /// Skip detection and use this format id
        #[arg(short, long, value_name = "ID")]
        format: Option<String>,

        /// Messages per batch
        #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Print only a one-line summary instead of the events
        #[arg(short, long)]
        summary: bool,
    },

    /// List the registered formats
    Formats,
}
