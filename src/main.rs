//! # chatimport CLI
//!
//! Command-line interface for the chatimport library.

use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use chatimport::cli::{Args, Command};
use chatimport::config::ParseOptions;
use chatimport::event::ParseEvent;
use chatimport::parser::FormatParser;
use chatimport::progress::{Progress, Stage};
use chatimport::registry::{FormatRegistry, default_registry};
use chatimport::{ImportError, Result};

/// Exit code for a file no plugin recognizes.
const EXIT_UNRECOGNIZED: i32 = 2;

fn main() {
    init_tracing();

    let args = <Args as ClapParser>::parse();
    match run(args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(if e.is_unrecognized() {
                EXIT_UNRECOGNIZED
            } else {
                1
            });
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (e.g. under a test harness) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(args: Args) -> Result<i32> {
    let registry = default_registry()?;

    match args.command {
        Command::Detect { input } => detect(&registry, &input),
        Command::Parse {
            input,
            format,
            batch_size,
            summary,
        } => {
            let parser = select(&registry, &input, format.as_deref())?;
            parse(parser, &input, batch_size, summary)
        }
        Command::Formats => {
            for feature in registry.features() {
                println!(
                    "{:<16} {:<16} {:<10} priority {}",
                    feature.id(),
                    feature.name(),
                    feature.platform(),
                    feature.priority()
                );
            }
            Ok(0)
        }
    }
}

fn detect(registry: &FormatRegistry, input: &Path) -> Result<i32> {
    match registry.detect(input)? {
        Some(parser) => {
            let feature = parser.feature();
            println!("{}\t{}\t{}", feature.id(), feature.name(), feature.platform());
            Ok(0)
        }
        None => {
            eprintln!("format not recognized: {}", input.display());
            Ok(EXIT_UNRECOGNIZED)
        }
    }
}

fn select<'r>(
    registry: &'r FormatRegistry,
    input: &Path,
    format: Option<&str>,
) -> Result<&'r dyn FormatParser> {
    match format {
        Some(id) => registry.get(id).ok_or_else(|| {
            let known: Vec<&str> = registry.features().map(|f| f.id()).collect();
            ImportError::invalid_options(format!(
                "unknown format '{id}'. Expected one of: {}",
                known.join(", ")
            ))
        }),
        None => registry.require(input),
    }
}

fn parse(parser: &dyn FormatParser, input: &Path, batch_size: usize, summary: bool) -> Result<i32> {
    let start = Instant::now();
    let options = ParseOptions::new(input)
        .with_batch_size(batch_size)
        .with_progress(Arc::new(report_progress));

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut name = String::new();
    let mut exit = 0;

    let mut stream = parser.parse(options);
    while let Some(event) = stream.next() {
        match &event {
            ParseEvent::Meta(meta) => name.clone_from(&meta.name),
            ParseEvent::Done {
                message_count,
                member_count,
            } if summary => {
                writeln!(
                    out,
                    "{name}: {message_count} messages, {member_count} members, {} dropped ({:.2}s)",
                    stream.records_dropped(),
                    start.elapsed().as_secs_f64()
                )?;
            }
            ParseEvent::Error { .. } => exit = 1,
            _ => {}
        }

        if !summary {
            serde_json::to_writer(&mut out, &event)?;
            writeln!(out)?;
        }
    }

    out.flush()?;
    Ok(exit)
}

fn report_progress(progress: &Progress) {
    match (progress.stage, progress.percentage()) {
        (Stage::Error, _) => eprintln!("[error] {}", progress.message),
        (_, Some(pct)) => eprintln!("[{pct:>5.1}%] {}", progress.message),
        (_, None) => eprintln!("[  ...] {}", progress.message),
    }
}
