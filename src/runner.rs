//! Per-operation transaction wrapper and measurement.
//!
//! One `run_op` call covers the full measured region for one operation:
//! filter check, cache clearing, pre-measurement quiesce, timing and memory
//! snapshots around the adapter's begin/run/commit, and the append into the
//! current run record. Errors propagate untouched — the adapter is assumed
//! to leave its transaction aborted, and the sweep driver drops the
//! in-flight log buffers.

use crate::adapters::LoadAdapter;
use crate::config::BenchConfig;
use crate::error::BenchResult;
use crate::mem;
use crate::ops::{BenchOp, OpFilter, XMode};
use crate::sweep::SweepPoint;
use crate::verify::Verifier;
use std::time::Instant;

/// Measurements for one executed operation in one repetition.
#[derive(Debug, Clone)]
pub struct OpMeasure {
    pub name: String,
    /// Elapsed wall-clock milliseconds; `None` when timing is disabled.
    pub rtime_ms: Option<i64>,
    /// Used-memory delta in KiB; `None` when memory logging is disabled or
    /// the platform exposes no probe.
    pub mem_kib: Option<i64>,
}

/// One repetition's measurements, in execution order.
#[derive(Debug, Clone, Default)]
pub struct RunRecord {
    pub measures: Vec<OpMeasure>,
}

impl RunRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn op_names(&self) -> Vec<String> {
        self.measures.iter().map(|m| m.name.clone()).collect()
    }
}

pub struct TxRunner {
    filter: OpFilter,
    log_real_time: bool,
    log_mem_usage: bool,
    include_full_gc: bool,
    allow_extended_pc: bool,
}

impl TxRunner {
    pub fn new(cfg: &BenchConfig) -> Self {
        Self {
            filter: cfg.filter.clone(),
            log_real_time: cfg.log_real_time,
            log_mem_usage: cfg.log_mem_usage,
            include_full_gc: cfg.include_full_gc,
            allow_extended_pc: cfg.allow_extended_pc,
        }
    }

    /// Run one operation inside its transaction boundary. Returns whether
    /// the operation was executed (false = filtered out, no side effects).
    pub fn run_op(
        &self,
        adapter: &mut dyn LoadAdapter,
        op: &BenchOp,
        point: SweepPoint,
        verifier: &mut Verifier,
        record: &mut RunRecord,
    ) -> BenchResult<bool> {
        if !self.filter.allows(&op.name) {
            log::debug!("skipping {} (filtered)", op.name);
            return Ok(false);
        }

        // Each measured transaction starts from a cold adapter cache unless
        // the operator opted into extended caching.
        if !self.allow_extended_pc {
            adapter.clear_persistence_context()?;
        }

        let measuring = self.log_real_time || self.log_mem_usage;
        if measuring {
            mem::quiesce(mem::QUIESCE_MAX_PASSES);
        }
        let mem_before = if self.log_mem_usage {
            mem::used_kib()
        } else {
            None
        };
        let started = self.log_real_time.then(Instant::now);

        // Indy mode has no explicit boundary: every row operation inside the
        // adapter is its own implicit transaction.
        let explicit_tx = op.mode != XMode::Indy;
        if explicit_tx {
            adapter.begin()?;
        }
        adapter.run_op(op, point, verifier)?;
        if explicit_tx {
            adapter.commit()?;
        }

        let rtime_ms = started.map(|t| t.elapsed().as_millis() as i64);
        if self.log_mem_usage && self.include_full_gc {
            mem::quiesce(mem::QUIESCE_MAX_PASSES);
        }
        let mem_after = if self.log_mem_usage {
            mem::used_kib()
        } else {
            None
        };
        let mem_kib = match (mem_before, mem_after) {
            (Some(before), Some(after)) => Some(after - before),
            _ => None,
        };

        record.measures.push(OpMeasure {
            name: op.name.clone(),
            rtime_ms,
            mem_kib,
        });
        Ok(true)
    }
}
