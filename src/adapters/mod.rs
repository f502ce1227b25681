//! Datastore access paths behind a single capability trait.
//!
//! The engine only speaks [`LoadAdapter`]; concrete backends (the plain-SQL
//! path, the embedded store, or out-of-tree ORM/native bindings) plug into
//! the explicit [`AdapterKind`] factory. All operations share one workload
//! model: two tables `a` and `b` where `b.a_id` references `a.id`, row
//! attributes derived from the row id so reads can be verified without
//! consulting the store.

pub mod memstore;
pub mod sqlite;

use crate::config::BenchConfig;
use crate::error::{BenchError, BenchResult};
use crate::ops::{BenchOp, OpRegistry, XMode};
use crate::sweep::SweepPoint;
use crate::verify::Verifier;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::str::FromStr;

/// Capability set every datastore backend implements. Failures surface as
/// propagated errors; the engine never retries adapter calls.
pub trait LoadAdapter {
    fn name(&self) -> &'static str;

    // ── session lifecycle ───────────────────────────────────────────
    fn init_connection(&mut self, cfg: &BenchConfig) -> BenchResult<()>;
    fn close_connection(&mut self) -> BenchResult<()>;

    /// Reset the dataset to known-empty.
    fn clear_data(&mut self) -> BenchResult<()>;

    /// Drop any adapter-side result/object cache so the next operation hits
    /// the datastore.
    fn clear_persistence_context(&mut self) -> BenchResult<()>;

    // ── operation set ───────────────────────────────────────────────
    fn init_operations(&mut self, modes: &[XMode]) -> OpRegistry;
    fn close_operations(&mut self) -> BenchResult<()>;

    // ── transaction boundary ────────────────────────────────────────
    fn begin(&mut self) -> BenchResult<()>;
    fn commit(&mut self) -> BenchResult<()>;

    /// Apply one operation at the given sweep point, verifying observed
    /// results through `verifier`.
    fn run_op(
        &mut self,
        op: &BenchOp,
        point: SweepPoint,
        verifier: &mut Verifier,
    ) -> BenchResult<()>;
}

/// The closed set of built-in access paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Sqlite,
    Memstore,
}

impl FromStr for AdapterKind {
    type Err = BenchError;

    fn from_str(s: &str) -> BenchResult<Self> {
        match s {
            "sqlite" => Ok(AdapterKind::Sqlite),
            "memstore" => Ok(AdapterKind::Memstore),
            other => Err(BenchError::Config(format!(
                "adapter: unknown access path '{other}' (expected sqlite, memstore)"
            ))),
        }
    }
}

/// Build the configured access path.
pub fn build_adapter(cfg: &BenchConfig) -> BenchResult<Box<dyn LoadAdapter>> {
    Ok(match cfg.adapter.parse::<AdapterKind>()? {
        AdapterKind::Sqlite => Box::new(sqlite::SqliteAdapter::new(&cfg.database)),
        AdapterKind::Memstore => Box::new(memstore::MemStoreAdapter::new()),
    })
}

// ── Workload model ──────────────────────────────────────────────────
//
// Row ids run 1..=n. Attribute values are pure functions of the id so every
// read verifies against a recomputed expectation.

/// Length of the generated `cvarchar` payload on B rows.
pub(crate) const VARCHAR_LEN: usize = 100;

const PAYLOAD_SEED: u64 = 0xC0FF_EE11_D00D_2026;

/// Attribute tuple `(cint, clong, cfloat, cdouble)` as inserted.
pub(crate) fn attr_initial(id: u64) -> (i64, i64, f64, f64) {
    (id as i64, id as i64 * 2, id as f64, id as f64 * 0.5)
}

/// Attribute tuple after the update pass (negation of the initial values).
pub(crate) fn attr_updated(id: u64) -> (i64, i64, f64, f64) {
    let (cint, clong, cfloat, cdouble) = attr_initial(id);
    (-cint, -clong, -cfloat, -cdouble)
}

/// Deterministic text payload for B row `id`.
pub(crate) fn payload(id: u64) -> String {
    let mut rng = StdRng::seed_from_u64(PAYLOAD_SEED ^ id);
    (0..VARCHAR_LEN)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect()
}

/// Parent A row for B row `b_id` once the FK edge is set.
pub(crate) fn parent_of(b_id: u64, count_a: u64) -> u64 {
    ((b_id - 1) % count_a) + 1
}

/// Number of B rows pointing at A row `a_id`.
pub(crate) fn children_of(a_id: u64, count_a: u64, count_b: u64) -> u64 {
    let full = count_b / count_a;
    let rem = count_b % count_a;
    full + u64::from(a_id - 1 < rem)
}
