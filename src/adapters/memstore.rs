//! Embedded in-process access path.
//!
//! Keyed maps standing in for a native storage-engine binding: no I/O, no
//! SQL, the same operation semantics. Transactions are a boundary check only
//! (the store applies writes immediately), which also makes this the
//! deterministic backend for engine tests. `with_read_skew` perturbs read
//! results so verification reporting can be exercised end to end.

use super::{attr_initial, attr_updated, children_of, parent_of, payload, LoadAdapter};
use crate::config::BenchConfig;
use crate::error::{BenchError, BenchResult};
use crate::ops::{BenchOp, OpKind, OpRegistry, XMode};
use crate::sweep::SweepPoint;
use crate::verify::Verifier;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
struct Row {
    cint: i64,
    clong: i64,
    cfloat: f64,
    cdouble: f64,
    cvarchar: Option<String>,
    a_id: Option<u64>,
}

impl Row {
    fn new(id: u64, cvarchar: Option<String>) -> Self {
        let (cint, clong, cfloat, cdouble) = attr_initial(id);
        Self {
            cint,
            clong,
            cfloat,
            cdouble,
            cvarchar,
            a_id: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemStoreAdapter {
    a: BTreeMap<u64, Row>,
    b: BTreeMap<u64, Row>,
    connected: bool,
    in_tx: bool,
    /// Offset added to cint on reads; nonzero values force verification
    /// mismatches.
    read_skew: i64,
}

impl MemStoreAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose reads are skewed by `skew`, for exercising the
    /// verification error paths.
    pub fn with_read_skew(skew: i64) -> Self {
        Self {
            read_skew: skew,
            ..Self::default()
        }
    }

    fn check_connected(&self) -> BenchResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(BenchError::adapter("memstore: connection not initialized"))
        }
    }

    fn ins(&mut self, kind: OpKind, n: u64) {
        for id in 1..=n {
            match kind {
                OpKind::InsA => {
                    self.a.insert(id, Row::new(id, None));
                }
                _ => {
                    self.b.insert(id, Row::new(id, Some(payload(id))));
                }
            }
        }
    }

    fn set(&mut self, table_a: bool, n: u64, v: &mut Verifier) -> BenchResult<()> {
        let table = if table_a { &mut self.a } else { &mut self.b };
        let mut updated = 0u64;
        for id in 1..=n {
            if let Some(row) = table.get_mut(&id) {
                let (cint, clong, cfloat, cdouble) = attr_updated(id);
                row.cint = cint;
                row.clong = clong;
                row.cfloat = cfloat;
                row.cdouble = cdouble;
                updated += 1;
            }
        }
        let what = if table_a { "set_a" } else { "set_b" };
        v.expect_eq(&format!("{what} rows updated"), n, updated)
    }

    fn get(&self, table_a: bool, n: u64, v: &mut Verifier) -> BenchResult<()> {
        let (table, what) = if table_a {
            (&self.a, "get_a")
        } else {
            (&self.b, "get_b")
        };
        let mut seen = 0u64;
        for id in 1..=n {
            let Some(row) = table.get(&id) else { continue };
            seen += 1;
            let (cint, clong, cfloat, cdouble) = attr_updated(id);
            v.expect_eq(&format!("{what}({id}) cint"), cint, row.cint + self.read_skew)?;
            v.expect_eq(&format!("{what}({id}) clong"), clong, row.clong)?;
            v.expect_eq(&format!("{what}({id}) cfloat"), cfloat, row.cfloat)?;
            v.expect_eq(&format!("{what}({id}) cdouble"), cdouble, row.cdouble)?;
            if !table_a {
                let expected = payload(id);
                let actual = row.cvarchar.clone().unwrap_or_default();
                v.expect_eq(&format!("{what}({id}) cvarchar"), expected, actual)?;
            }
        }
        v.expect_eq(&format!("{what} rows read"), n, seen)
    }

    fn set_b_fk(&mut self, point: SweepPoint, v: &mut Verifier) -> BenchResult<()> {
        let mut updated = 0u64;
        for id in 1..=point.count_b {
            if let Some(row) = self.b.get_mut(&id) {
                row.a_id = Some(parent_of(id, point.count_a));
                updated += 1;
            }
        }
        v.expect_eq("set_b_fk rows updated", point.count_b, updated)
    }

    fn nav_b_to_a(&self, point: SweepPoint, v: &mut Verifier) -> BenchResult<()> {
        for (id, row) in self.b.range(1..=point.count_b) {
            let parent = row
                .a_id
                .and_then(|a_id| self.a.get(&a_id).map(|a| (a_id, a)));
            match parent {
                Some((a_id, a_row)) => {
                    let expected = parent_of(*id, point.count_a);
                    v.expect_eq(&format!("nav_b_a({id}) parent"), expected, a_id)?;
                    v.expect_eq(
                        &format!("nav_b_a({id}) cint"),
                        attr_updated(expected).0,
                        a_row.cint + self.read_skew,
                    )?;
                }
                None => {
                    v.expect_eq(&format!("nav_b_a({id}) resolved"), 1u64, 0u64)?;
                }
            }
        }
        Ok(())
    }

    fn nav_a_to_b(&self, point: SweepPoint, v: &mut Verifier) -> BenchResult<()> {
        for a_id in 1..=point.count_a {
            let count = self
                .b
                .values()
                .filter(|row| row.a_id == Some(a_id))
                .count() as u64;
            let expected = children_of(a_id, point.count_a, point.count_b);
            v.expect_eq(&format!("nav_a_b({a_id}) children"), expected, count)?;
        }
        Ok(())
    }

    fn null_b_fk(&mut self, n: u64, v: &mut Verifier) -> BenchResult<()> {
        let mut updated = 0u64;
        for id in 1..=n {
            if let Some(row) = self.b.get_mut(&id) {
                row.a_id = None;
                updated += 1;
            }
        }
        v.expect_eq("null_b_fk rows updated", n, updated)
    }

    fn del(&mut self, table_a: bool, n: u64, v: &mut Verifier) -> BenchResult<()> {
        let table = if table_a { &mut self.a } else { &mut self.b };
        let mut deleted = 0u64;
        for id in 1..=n {
            if table.remove(&id).is_some() {
                deleted += 1;
            }
        }
        let what = if table_a { "del_a" } else { "del_b" };
        v.expect_eq(&format!("{what} rows deleted"), n, deleted)
    }
}

impl LoadAdapter for MemStoreAdapter {
    fn name(&self) -> &'static str {
        "memstore"
    }

    fn init_connection(&mut self, _cfg: &BenchConfig) -> BenchResult<()> {
        self.connected = true;
        self.in_tx = false;
        Ok(())
    }

    fn close_connection(&mut self) -> BenchResult<()> {
        self.a.clear();
        self.b.clear();
        self.connected = false;
        self.in_tx = false;
        Ok(())
    }

    fn clear_data(&mut self) -> BenchResult<()> {
        self.check_connected()?;
        self.a.clear();
        self.b.clear();
        Ok(())
    }

    fn clear_persistence_context(&mut self) -> BenchResult<()> {
        // No cache between the caller and the maps.
        Ok(())
    }

    fn init_operations(&mut self, modes: &[XMode]) -> OpRegistry {
        OpRegistry::standard(modes)
    }

    fn close_operations(&mut self) -> BenchResult<()> {
        Ok(())
    }

    fn begin(&mut self) -> BenchResult<()> {
        self.check_connected()?;
        if self.in_tx {
            return Err(BenchError::adapter("memstore: nested transaction"));
        }
        self.in_tx = true;
        Ok(())
    }

    fn commit(&mut self) -> BenchResult<()> {
        if !self.in_tx {
            return Err(BenchError::adapter("memstore: commit outside transaction"));
        }
        self.in_tx = false;
        Ok(())
    }

    fn run_op(
        &mut self,
        op: &BenchOp,
        point: SweepPoint,
        verifier: &mut Verifier,
    ) -> BenchResult<()> {
        self.check_connected()?;
        let (n_a, n_b) = (point.count_a, point.count_b);
        match op.kind {
            OpKind::InsA => {
                self.ins(OpKind::InsA, n_a);
                Ok(())
            }
            OpKind::InsB => {
                self.ins(OpKind::InsB, n_b);
                Ok(())
            }
            OpKind::SetA => self.set(true, n_a, verifier),
            OpKind::SetB => self.set(false, n_b, verifier),
            OpKind::GetA => self.get(true, n_a, verifier),
            OpKind::GetB => self.get(false, n_b, verifier),
            OpKind::SetBFk => self.set_b_fk(point, verifier),
            OpKind::NavBToA => self.nav_b_to_a(point, verifier),
            OpKind::NavAToB => self.nav_a_to_b(point, verifier),
            OpKind::NullBFk => self.null_b_fk(n_b, verifier),
            OpKind::DelB => self.del(false, n_b, verifier),
            OpKind::DelA => self.del(true, n_a, verifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BenchConfig, PartialConfig};

    fn open_adapter(skew: i64) -> MemStoreAdapter {
        let cfg = BenchConfig::resolve(PartialConfig::default()).unwrap();
        let mut adapter = MemStoreAdapter::with_read_skew(skew);
        adapter.init_connection(&cfg).unwrap();
        adapter
    }

    fn run_sequence(adapter: &mut MemStoreAdapter, point: SweepPoint) -> Verifier {
        let registry = adapter.init_operations(&[XMode::Each]);
        let mut verifier = Verifier::new(false);
        for op in registry.iter() {
            adapter.begin().unwrap();
            adapter.run_op(op, point, &mut verifier).unwrap();
            adapter.commit().unwrap();
        }
        verifier
    }

    #[test]
    fn sequence_verifies_cleanly() {
        let mut adapter = open_adapter(0);
        let point = SweepPoint {
            count_a: 4,
            count_b: 10,
        };
        let mut verifier = run_sequence(&mut adapter, point);
        assert_eq!(verifier.take_errors(), Vec::<String>::new());
        assert!(adapter.a.is_empty() && adapter.b.is_empty());
    }

    #[test]
    fn read_skew_surfaces_verification_errors() {
        let mut adapter = open_adapter(2);
        let point = SweepPoint {
            count_a: 3,
            count_b: 3,
        };
        let mut verifier = run_sequence(&mut adapter, point);
        let errors = verifier.take_errors();
        assert!(!errors.is_empty());
        assert!(errors[0].contains("expected") && errors[0].contains("actual"));
    }

    #[test]
    fn transaction_boundary_is_checked() {
        let mut adapter = open_adapter(0);
        adapter.begin().unwrap();
        assert!(adapter.begin().is_err());
        adapter.commit().unwrap();
        assert!(adapter.commit().is_err());
    }

    #[test]
    fn ops_require_connection() {
        let mut adapter = MemStoreAdapter::new();
        let point = SweepPoint {
            count_a: 1,
            count_b: 1,
        };
        let op = BenchOp::new(OpKind::InsA, XMode::Each);
        let mut v = Verifier::new(false);
        assert!(adapter.run_op(&op, point, &mut v).is_err());
        assert!(adapter.clear_data().is_err());
    }
}
