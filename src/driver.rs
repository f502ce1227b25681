//! The benchmark session: sweep loop, warmup/hot phases, resource renewal,
//! and result-log emission.
//!
//! One driver owns one session — config, adapter, operation registry, and
//! log buffers — constructed fresh per run and consumed by it, so no state
//! leaks across measured phases. The engine is composed over the adapter
//! trait; backends never subclass anything.

use crate::adapters::LoadAdapter;
use crate::config::BenchConfig;
use crate::error::BenchResult;
use crate::ops::OpRegistry;
use crate::resultlog::{Block, ResultLog};
use crate::runner::{RunRecord, TxRunner};
use crate::stats::StatSet;
use crate::sweep::{self, SweepPoint};
use crate::verify::Verifier;
use std::io::Write;

/// Counters summarizing one complete run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunTotals {
    pub points: usize,
    pub sequences: usize,
    pub ops_executed: u64,
    pub ops_skipped: u64,
    pub verification_errors: usize,
}

pub struct BenchDriver {
    cfg: BenchConfig,
    adapter: Box<dyn LoadAdapter>,
    runner: TxRunner,
    registry: OpRegistry,
    log: ResultLog,
}

impl BenchDriver {
    pub fn new(cfg: BenchConfig, adapter: Box<dyn LoadAdapter>, log: ResultLog) -> Self {
        let runner = TxRunner::new(&cfg);
        Self {
            cfg,
            adapter,
            runner,
            registry: OpRegistry::new(),
            log,
        }
    }

    /// Execute the full sweep. Consumes the session; adapter errors abort
    /// with the in-flight sweep point's log buffers discarded.
    pub fn run(mut self) -> BenchResult<RunTotals> {
        let mut totals = RunTotals::default();

        step(&format!("initializing {} connection", self.adapter.name()));
        self.adapter.init_connection(&self.cfg)?;
        self.registry = self.adapter.init_operations(&self.cfg.xmodes);
        step_ok();
        log::debug!("{} operation(s) registered", self.registry.len());

        let points = sweep::points(&self.cfg.a_axis, self.cfg.b_axis.as_ref());
        if points.is_empty() {
            log::warn!("sweep produced no points; nothing to measure");
        }
        for point in points {
            self.run_point(point, &mut totals)?;
            totals.points += 1;
        }

        step("closing connection");
        self.adapter.close_operations()?;
        self.registry.clear();
        self.adapter.close_connection()?;
        step_ok();

        self.log.finish()?;
        Ok(totals)
    }

    fn run_point(&mut self, point: SweepPoint, totals: &mut RunTotals) -> BenchResult<()> {
        let label = point.label(self.cfg.dual_axis());
        let reps = self.cfg.warmup_runs + self.cfg.hot_runs;
        let mut time_block: Option<Block> = None;
        let mut mem_block: Option<Block> = None;
        let mut point_stats = StatSet::new();

        for rep in 0..reps {
            let warmup = rep < self.cfg.warmup_runs;

            if self.cfg.renew_connection {
                self.adapter.close_operations()?;
                self.adapter.close_connection()?;
                self.adapter.init_connection(&self.cfg)?;
                self.registry = self.adapter.init_operations(&self.cfg.xmodes);
            } else if self.cfg.renew_operations {
                self.adapter.close_operations()?;
                self.registry = self.adapter.init_operations(&self.cfg.xmodes);
            }
            // Every repetition starts from identical, empty data.
            self.adapter.clear_data()?;

            let mut verifier = Verifier::new(self.cfg.fail_fast);
            let mut record = RunRecord::new();
            for op in self.registry.iter() {
                let executed = self.runner.run_op(
                    self.adapter.as_mut(),
                    op,
                    point,
                    &mut verifier,
                    &mut record,
                )?;
                if executed {
                    totals.ops_executed += 1;
                } else {
                    totals.ops_skipped += 1;
                }
            }
            totals.sequences += 1;

            let errors = verifier.take_errors();
            if !errors.is_empty() {
                totals.verification_errors += errors.len();
                eprintln!(
                    "  [verify] {} error(s) at nTxOps={label} run {}:",
                    errors.len(),
                    rep + 1
                );
                for e in &errors {
                    eprintln!("    {e}");
                }
            }

            if warmup || record.measures.is_empty() {
                continue;
            }
            if self.cfg.log_real_time {
                let block = time_block.get_or_insert_with(|| {
                    Block::new("rtime[ms]", &label, record.op_names(), self.cfg.log_sum_of_ops)
                });
                block.push_row(
                    record
                        .measures
                        .iter()
                        .map(|m| m.rtime_ms.unwrap_or(0))
                        .collect(),
                );
                for m in &record.measures {
                    if let Some(t) = m.rtime_ms {
                        point_stats.observe(&m.name, t as f64);
                    }
                }
            }
            if self.cfg.log_mem_usage {
                let block = mem_block.get_or_insert_with(|| {
                    Block::new(
                        "memusage[KiB]",
                        &label,
                        record.op_names(),
                        self.cfg.log_sum_of_ops,
                    )
                });
                block.push_row(
                    record
                        .measures
                        .iter()
                        .map(|m| m.mem_kib.unwrap_or(0))
                        .collect(),
                );
            }
        }

        // The measured phase completed; flush its blocks as one unit each.
        if let Some(block) = time_block {
            self.log.write_block(&block)?;
        }
        if let Some(block) = mem_block {
            self.log.write_block(&block)?;
        }

        if self.cfg.log_real_time && !point_stats.is_empty() {
            let mean_total: f64 = point_stats.iter().map(|(_, s)| s.mean()).sum();
            println!(
                "  nTxOps={label}: {} warmup + {} hot run(s), mean sequence time {mean_total:.1} ms",
                self.cfg.warmup_runs, self.cfg.hot_runs
            );
        } else {
            println!(
                "  nTxOps={label}: {} warmup + {} hot run(s)",
                self.cfg.warmup_runs, self.cfg.hot_runs
            );
        }
        Ok(())
    }
}

fn step(msg: &str) {
    print!("{msg} ...");
    let _ = std::io::stdout().flush();
}

fn step_ok() {
    println!(" [ok]");
}
