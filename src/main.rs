//! Cirsim - per-tick electrical network solver
//!
//! Runs a board for a fixed number of ticks and prints a CSV trace.
//!
//! # Usage
//!
//! ```bash
//! cirsim divider.cir --delta 0.001 --ticks 1000 --every 10 > trace.csv
//! cirsim board.json --json --ticks 1 --export saved.json
//! ```

use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{info, LevelFilter, Log, Metadata, Record};

use cirsim_core::{
    circuit::{validate_network, ElementRecord},
    dsl,
    error::{CirsimError, Result},
    trace::TraceWriter,
    Network, Simulator,
};

/// Per-tick electrical network solver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the board description (.cir) or element records (.json)
    #[arg(value_name = "BOARD")]
    board: PathBuf,

    /// Time step in seconds
    #[arg(short, long, default_value_t = 1e-3)]
    delta: f64,

    /// Number of ticks to run
    #[arg(short = 'n', long, default_value_t = 1000)]
    ticks: usize,

    /// Write a trace row every K ticks
    #[arg(short, long, default_value_t = 1)]
    every: usize,

    /// Read the board as JSON element records regardless of extension
    #[arg(long)]
    json: bool,

    /// Write the network's element records as JSON after the run
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// More log output (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

/// Minimal logger writing to stderr; the level comes from `log::max_level`.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logger(args: &Args) {
    let level = match (args.quiet, args.verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, 2) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    // Only fails if a logger is already installed
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn load_network(path: &Path, json: bool) -> Result<(Network, Vec<String>)> {
    let is_json = json || path.extension().map_or(false, |ext| ext == "json");
    if is_json {
        let content = std::fs::read_to_string(path).map_err(|e| CirsimError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        let records: Vec<ElementRecord> = serde_json::from_str(&content)?;
        Ok((Network::from_records(&records)?, Vec::new()))
    } else {
        let ast = dsl::parse_file(path)?;
        let network = Network::from_ast(&ast)?;
        Ok((network, ast.probes))
    }
}

fn export_records(network: &Network, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&network.records())?;
    std::fs::write(path, json).map_err(|e| CirsimError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args);

    // Load and validate the board
    let (network, probes) = load_network(&args.board, args.json)?;
    validate_network(&network)?;
    info!("loaded {} elements from {}", network.element_count(), args.board.display());

    let mut simulator = Simulator::new(network);
    let stdout = io::stdout();
    let mut trace = TraceWriter::new(stdout.lock(), simulator.network(), &probes)?;

    let every = args.every.max(1);
    for tick in 1..=args.ticks {
        let report = simulator.advance(args.delta)?;
        if tick % every == 0 {
            trace.write_row(simulator.time(), report.shorted, simulator.network())?;
        }
    }
    trace.flush()?;

    if let Some(path) = &args.export {
        export_records(simulator.network(), path)?;
        info!("exported records to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_installs_with_requested_level() {
        let args = Args::parse_from(["cirsim", "-vv", "board.cir"]);
        init_logger(&args);
        assert_eq!(log::max_level(), LevelFilter::Debug);
        assert!(LOGGER.enabled(&Metadata::builder().level(log::Level::Debug).build()));
        assert!(!LOGGER.enabled(&Metadata::builder().level(log::Level::Trace).build()));
    }
}
