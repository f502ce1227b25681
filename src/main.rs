//! Benchmark runner binary.
//!
//! Usage:
//!   crund-bench -p base.toml -p override.toml -l results.log
//!
//! Repeated `-p` property files are merged last-wins; `-l` names the output
//! log (default `crund.log`). Help and unknown flags print usage and exit
//! nonzero. Verification errors are reported but do not fail the process;
//! configuration and adapter errors do.

use anyhow::Context;
use clap::Parser;
use crund_bench::adapters::build_adapter;
use crund_bench::config::BenchConfig;
use crund_bench::driver::BenchDriver;
use crund_bench::resultlog::ResultLog;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(
    name = "crund-bench",
    about = "CRUND datastore access-path microbenchmark"
)]
struct Cli {
    /// Configuration property file(s); later files override earlier ones.
    #[arg(short = 'p', value_name = "FILE")]
    properties: Vec<PathBuf>,

    /// Output result-log path.
    #[arg(short = 'l', value_name = "FILE", default_value = "crund.log")]
    log: PathBuf,
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
    if let Err(e) = run(&cli) {
        eprintln!("crund-bench: fatal: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let cfg = BenchConfig::load(&cli.properties).context("loading configuration")?;
    println!("crund-bench");
    println!("  {}", cfg.describe());
    println!("  log file: {}", cli.log.display());

    let adapter = build_adapter(&cfg)?;
    let preamble = vec![
        "crund-bench result log".to_string(),
        cfg.describe(),
        format!("started={}s-since-epoch", epoch_secs()),
    ];
    let log = ResultLog::create(&cli.log, &preamble)
        .with_context(|| format!("creating log file {}", cli.log.display()))?;

    let totals = BenchDriver::new(cfg, adapter, log).run()?;

    println!(
        "done: {} sweep point(s), {} sequence(s), {} op(s) executed, {} skipped",
        totals.points, totals.sequences, totals.ops_executed, totals.ops_skipped
    );
    if totals.verification_errors > 0 {
        eprintln!(
            "crund-bench: {} verification error(s), see report above",
            totals.verification_errors
        );
    }
    Ok(())
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
