//! Offline result-log processor binary.
//!
//! Usage:
//!   crund-stats -p crund.toml results1.log results2.log
//!
//! Recomputes per-operation mean/stdev/relative-stdev for every block of
//! each input log and flags high-variance entries. At least one input log is
//! required; a malformed log aborts that file with a line-annotated error
//! and the process exits nonzero.

use clap::Parser;
use crund_bench::config::BenchConfig;
use crund_bench::process;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "crund-stats", about = "CRUND result-log statistics processor")]
struct Cli {
    /// Configuration property file(s); `nWarmupRuns` trims leading rows.
    #[arg(short = 'p', value_name = "FILE")]
    properties: Vec<PathBuf>,

    /// Input result-log file(s).
    #[arg(value_name = "LOG", required = true)]
    logs: Vec<PathBuf>,
}

fn main() {
    env_logger::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(2);
        }
    };
    match run(&cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("crund-stats: fatal: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Returns whether every input file processed cleanly.
fn run(cli: &Cli) -> anyhow::Result<bool> {
    let cfg = BenchConfig::load(&cli.properties)?;
    let mut clean = true;
    for path in &cli.logs {
        match process::process_file(path, cfg.n_warmup_runs) {
            Ok(reports) => process::print_report(&path.display().to_string(), &reports),
            Err(e) => {
                eprintln!("crund-stats: {e}");
                clean = false;
            }
        }
    }
    Ok(clean)
}
