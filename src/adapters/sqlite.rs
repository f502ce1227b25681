//! Plain-SQL access path over SQLite.
//!
//! Every operation goes through cached prepared statements; the statement
//! cache is the adapter-side "persistence context" and is flushed between
//! transactions unless extended caching is allowed. Batching modes map to:
//! `indy` — autocommit, one implicit transaction per row statement; `each` —
//! the engine's explicit transaction with per-row statements; `bulk` — the
//! engine's explicit transaction with multi-row inserts and ranged
//! update/delete statements.

use super::{
    attr_initial, attr_updated, children_of, parent_of, payload, LoadAdapter, VARCHAR_LEN,
};
use crate::config::BenchConfig;
use crate::error::{BenchError, BenchResult};
use crate::ops::{BenchOp, OpKind, OpRegistry, XMode};
use crate::sweep::SweepPoint;
use crate::verify::Verifier;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

/// Rows per multi-row INSERT in bulk mode. Keeps the bind count of the
/// widest statement (7 columns) under SQLite's default parameter limit.
const BULK_CHUNK: usize = 128;

pub struct SqliteAdapter {
    database: String,
    conn: Option<Connection>,
}

impl SqliteAdapter {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            conn: None,
        }
    }

    fn conn(&self) -> BenchResult<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| BenchError::adapter("sqlite: connection not initialized"))
    }

    fn create_schema(conn: &Connection) -> BenchResult<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS a (
                 id      INTEGER PRIMARY KEY,
                 cint    INTEGER NOT NULL,
                 clong   INTEGER NOT NULL,
                 cfloat  REAL NOT NULL,
                 cdouble REAL NOT NULL
             );
             CREATE TABLE IF NOT EXISTS b (
                 id       INTEGER PRIMARY KEY,
                 cint     INTEGER NOT NULL,
                 clong    INTEGER NOT NULL,
                 cfloat   REAL NOT NULL,
                 cdouble  REAL NOT NULL,
                 cvarchar TEXT NOT NULL,
                 a_id     INTEGER REFERENCES a(id)
             );
             CREATE INDEX IF NOT EXISTS idx_b_a_id ON b(a_id);",
        )?;
        Ok(())
    }

    // ── inserts ─────────────────────────────────────────────────────

    fn ins_a_rows(&self, n: u64) -> BenchResult<()> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "INSERT INTO a (id, cint, clong, cfloat, cdouble) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for id in 1..=n {
            let (cint, clong, cfloat, cdouble) = attr_initial(id);
            stmt.execute(params![id as i64, cint, clong, cfloat, cdouble])?;
        }
        Ok(())
    }

    fn ins_a_bulk(&self, n: u64) -> BenchResult<()> {
        let conn = self.conn()?;
        let mut id = 1u64;
        while id <= n {
            let rows = ((n - id + 1) as usize).min(BULK_CHUNK);
            let sql = multi_insert_sql("a", &["id", "cint", "clong", "cfloat", "cdouble"], rows);
            let mut stmt = conn.prepare_cached(&sql)?;
            let mut values: Vec<Value> = Vec::with_capacity(rows * 5);
            for offset in 0..rows {
                let row_id = id + offset as u64;
                let (cint, clong, cfloat, cdouble) = attr_initial(row_id);
                values.push(Value::Integer(row_id as i64));
                values.push(Value::Integer(cint));
                values.push(Value::Integer(clong));
                values.push(Value::Real(cfloat));
                values.push(Value::Real(cdouble));
            }
            stmt.execute(params_from_iter(values))?;
            id += rows as u64;
        }
        Ok(())
    }

    fn ins_b_rows(&self, n: u64) -> BenchResult<()> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "INSERT INTO b (id, cint, clong, cfloat, cdouble, cvarchar, a_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)",
        )?;
        for id in 1..=n {
            let (cint, clong, cfloat, cdouble) = attr_initial(id);
            stmt.execute(params![id as i64, cint, clong, cfloat, cdouble, payload(id)])?;
        }
        Ok(())
    }

    fn ins_b_bulk(&self, n: u64) -> BenchResult<()> {
        let conn = self.conn()?;
        let mut id = 1u64;
        while id <= n {
            let rows = ((n - id + 1) as usize).min(BULK_CHUNK);
            let sql = multi_insert_sql(
                "b",
                &["id", "cint", "clong", "cfloat", "cdouble", "cvarchar", "a_id"],
                rows,
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let mut values: Vec<Value> = Vec::with_capacity(rows * 7);
            for offset in 0..rows {
                let row_id = id + offset as u64;
                let (cint, clong, cfloat, cdouble) = attr_initial(row_id);
                values.push(Value::Integer(row_id as i64));
                values.push(Value::Integer(cint));
                values.push(Value::Integer(clong));
                values.push(Value::Real(cfloat));
                values.push(Value::Real(cdouble));
                values.push(Value::Text(payload(row_id)));
                values.push(Value::Null);
            }
            stmt.execute(params_from_iter(values))?;
            id += rows as u64;
        }
        Ok(())
    }

    // ── attribute updates ───────────────────────────────────────────

    fn set_rows(&self, table: &str, n: u64, v: &mut Verifier) -> BenchResult<()> {
        let conn = self.conn()?;
        let sql = format!(
            "UPDATE {table} SET cint = ?2, clong = ?3, cfloat = ?4, cdouble = ?5 WHERE id = ?1"
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let mut updated = 0u64;
        for id in 1..=n {
            let (cint, clong, cfloat, cdouble) = attr_updated(id);
            updated += stmt.execute(params![id as i64, cint, clong, cfloat, cdouble])? as u64;
        }
        v.expect_eq(&format!("set_{table} rows updated"), n, updated)
    }

    fn set_bulk(&self, table: &str, n: u64, v: &mut Verifier) -> BenchResult<()> {
        let conn = self.conn()?;
        let sql = format!(
            "UPDATE {table} SET cint = -cint, clong = -clong,
                                cfloat = -cfloat, cdouble = -cdouble WHERE id <= ?1"
        );
        let updated = conn.execute(&sql, params![n as i64])? as u64;
        v.expect_eq(&format!("set_{table} rows updated"), n, updated)
    }

    // ── verified reads ──────────────────────────────────────────────

    fn get_a_rows(&self, n: u64, v: &mut Verifier) -> BenchResult<()> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached("SELECT cint, clong, cfloat, cdouble FROM a WHERE id = ?1")?;
        for id in 1..=n {
            let (cint, clong, cfloat, cdouble) = stmt.query_row(params![id as i64], |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, f64>(2)?,
                    r.get::<_, f64>(3)?,
                ))
            })?;
            verify_attrs(v, "get_a", id, cint, clong, cfloat, cdouble)?;
        }
        Ok(())
    }

    fn get_a_bulk(&self, n: u64, v: &mut Verifier) -> BenchResult<()> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, cint, clong, cfloat, cdouble FROM a WHERE id <= ?1 ORDER BY id",
        )?;
        let mut rows = stmt.query(params![n as i64])?;
        let mut seen = 0u64;
        while let Some(row) = rows.next()? {
            let id = row.get::<_, i64>(0)? as u64;
            let cint = row.get::<_, i64>(1)?;
            let clong = row.get::<_, i64>(2)?;
            let cfloat = row.get::<_, f64>(3)?;
            let cdouble = row.get::<_, f64>(4)?;
            verify_attrs(v, "get_a", id, cint, clong, cfloat, cdouble)?;
            seen += 1;
        }
        v.expect_eq("get_a rows read", n, seen)
    }

    fn get_b_rows(&self, n: u64, v: &mut Verifier) -> BenchResult<()> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT cint, clong, cfloat, cdouble, cvarchar FROM b WHERE id = ?1",
        )?;
        for id in 1..=n {
            let (cint, clong, cfloat, cdouble, cvarchar) =
                stmt.query_row(params![id as i64], |r| {
                    Ok((
                        r.get::<_, i64>(0)?,
                        r.get::<_, i64>(1)?,
                        r.get::<_, f64>(2)?,
                        r.get::<_, f64>(3)?,
                        r.get::<_, String>(4)?,
                    ))
                })?;
            verify_attrs(v, "get_b", id, cint, clong, cfloat, cdouble)?;
            v.expect_eq(&format!("get_b({id}) cvarchar"), payload(id), cvarchar)?;
        }
        Ok(())
    }

    fn get_b_bulk(&self, n: u64, v: &mut Verifier) -> BenchResult<()> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, cint, clong, cfloat, cdouble, length(cvarchar)
             FROM b WHERE id <= ?1 ORDER BY id",
        )?;
        let mut rows = stmt.query(params![n as i64])?;
        let mut seen = 0u64;
        while let Some(row) = rows.next()? {
            let id = row.get::<_, i64>(0)? as u64;
            let cint = row.get::<_, i64>(1)?;
            let clong = row.get::<_, i64>(2)?;
            let cfloat = row.get::<_, f64>(3)?;
            let cdouble = row.get::<_, f64>(4)?;
            let varchar_len = row.get::<_, i64>(5)? as usize;
            verify_attrs(v, "get_b", id, cint, clong, cfloat, cdouble)?;
            v.expect_eq(&format!("get_b({id}) cvarchar length"), VARCHAR_LEN, varchar_len)?;
            seen += 1;
        }
        v.expect_eq("get_b rows read", n, seen)
    }

    // ── relationship edge ───────────────────────────────────────────

    fn set_b_fk_rows(&self, point: SweepPoint, v: &mut Verifier) -> BenchResult<()> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached("UPDATE b SET a_id = ?2 WHERE id = ?1")?;
        let mut updated = 0u64;
        for id in 1..=point.count_b {
            let parent = parent_of(id, point.count_a);
            updated += stmt.execute(params![id as i64, parent as i64])? as u64;
        }
        v.expect_eq("set_b_fk rows updated", point.count_b, updated)
    }

    fn set_b_fk_bulk(&self, point: SweepPoint, v: &mut Verifier) -> BenchResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE b SET a_id = ((id - 1) % ?1) + 1 WHERE id <= ?2",
            params![point.count_a as i64, point.count_b as i64],
        )? as u64;
        v.expect_eq("set_b_fk rows updated", point.count_b, updated)
    }

    fn nav_b_to_a_rows(&self, point: SweepPoint, v: &mut Verifier) -> BenchResult<()> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT a.id, a.cint FROM a JOIN b ON a.id = b.a_id WHERE b.id = ?1",
        )?;
        for id in 1..=point.count_b {
            let (a_id, cint) = stmt.query_row(params![id as i64], |r| {
                Ok((r.get::<_, i64>(0)? as u64, r.get::<_, i64>(1)?))
            })?;
            let parent = parent_of(id, point.count_a);
            v.expect_eq(&format!("nav_b_a({id}) parent"), parent, a_id)?;
            v.expect_eq(&format!("nav_b_a({id}) cint"), attr_updated(parent).0, cint)?;
        }
        Ok(())
    }

    fn nav_b_to_a_bulk(&self, point: SweepPoint, v: &mut Verifier) -> BenchResult<()> {
        let conn = self.conn()?;
        let resolved: i64 = conn.query_row(
            "SELECT COUNT(*) FROM b JOIN a ON a.id = b.a_id
             WHERE a.id = ((b.id - 1) % ?1) + 1",
            params![point.count_a as i64],
            |r| r.get(0),
        )?;
        v.expect_eq("nav_b_a rows resolved", point.count_b, resolved as u64)
    }

    fn nav_a_to_b_rows(&self, point: SweepPoint, v: &mut Verifier) -> BenchResult<()> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached("SELECT COUNT(*) FROM b WHERE a_id = ?1")?;
        for id in 1..=point.count_a {
            let count: i64 = stmt.query_row(params![id as i64], |r| r.get(0))?;
            let expected = children_of(id, point.count_a, point.count_b);
            v.expect_eq(&format!("nav_a_b({id}) children"), expected, count as u64)?;
        }
        Ok(())
    }

    fn nav_a_to_b_bulk(&self, point: SweepPoint, v: &mut Verifier) -> BenchResult<()> {
        let conn = self.conn()?;
        let linked: i64 =
            conn.query_row("SELECT COUNT(*) FROM b WHERE a_id IS NOT NULL", [], |r| r.get(0))?;
        v.expect_eq("nav_a_b linked rows", point.count_b, linked as u64)
    }

    fn null_b_fk_rows(&self, n: u64, v: &mut Verifier) -> BenchResult<()> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached("UPDATE b SET a_id = NULL WHERE id = ?1")?;
        let mut updated = 0u64;
        for id in 1..=n {
            updated += stmt.execute(params![id as i64])? as u64;
        }
        v.expect_eq("null_b_fk rows updated", n, updated)
    }

    fn null_b_fk_bulk(&self, n: u64, v: &mut Verifier) -> BenchResult<()> {
        let conn = self.conn()?;
        let updated =
            conn.execute("UPDATE b SET a_id = NULL WHERE id <= ?1", params![n as i64])? as u64;
        v.expect_eq("null_b_fk rows updated", n, updated)
    }

    // ── deletes ─────────────────────────────────────────────────────

    fn del_rows(&self, table: &str, n: u64, v: &mut Verifier) -> BenchResult<()> {
        let conn = self.conn()?;
        let sql = format!("DELETE FROM {table} WHERE id = ?1");
        let mut stmt = conn.prepare_cached(&sql)?;
        let mut deleted = 0u64;
        for id in 1..=n {
            deleted += stmt.execute(params![id as i64])? as u64;
        }
        v.expect_eq(&format!("del_{table} rows deleted"), n, deleted)
    }

    fn del_bulk(&self, table: &str, n: u64, v: &mut Verifier) -> BenchResult<()> {
        let conn = self.conn()?;
        let sql = format!("DELETE FROM {table} WHERE id <= ?1");
        let deleted = conn.execute(&sql, params![n as i64])? as u64;
        v.expect_eq(&format!("del_{table} rows deleted"), n, deleted)
    }
}

impl LoadAdapter for SqliteAdapter {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn init_connection(&mut self, cfg: &BenchConfig) -> BenchResult<()> {
        let conn = if self.database == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(&self.database)?
        };
        configure_connection(&conn)?;
        Self::create_schema(&conn)?;
        // SQLite transactions are serializable; the configured level is only
        // a hint and anything at or below that is satisfied.
        log::debug!(
            "sqlite: isolation hint '{}' satisfied by serializable transactions",
            cfg.isolation_level
        );
        self.conn = Some(conn);
        Ok(())
    }

    fn close_connection(&mut self) -> BenchResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| BenchError::from(e))?;
        }
        Ok(())
    }

    fn clear_data(&mut self) -> BenchResult<()> {
        self.conn()?.execute_batch("DELETE FROM b; DELETE FROM a;")?;
        Ok(())
    }

    fn clear_persistence_context(&mut self) -> BenchResult<()> {
        self.conn()?.flush_prepared_statement_cache();
        Ok(())
    }

    fn init_operations(&mut self, modes: &[XMode]) -> OpRegistry {
        OpRegistry::standard(modes)
    }

    fn close_operations(&mut self) -> BenchResult<()> {
        if let Some(conn) = self.conn.as_ref() {
            conn.flush_prepared_statement_cache();
        }
        Ok(())
    }

    fn begin(&mut self) -> BenchResult<()> {
        self.conn()?.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> BenchResult<()> {
        self.conn()?.execute_batch("COMMIT")?;
        Ok(())
    }

    fn run_op(
        &mut self,
        op: &BenchOp,
        point: SweepPoint,
        verifier: &mut Verifier,
    ) -> BenchResult<()> {
        let bulk = op.mode == XMode::Bulk;
        let (n_a, n_b) = (point.count_a, point.count_b);
        match op.kind {
            OpKind::InsA if bulk => self.ins_a_bulk(n_a),
            OpKind::InsA => self.ins_a_rows(n_a),
            OpKind::InsB if bulk => self.ins_b_bulk(n_b),
            OpKind::InsB => self.ins_b_rows(n_b),
            OpKind::SetA if bulk => self.set_bulk("a", n_a, verifier),
            OpKind::SetA => self.set_rows("a", n_a, verifier),
            OpKind::SetB if bulk => self.set_bulk("b", n_b, verifier),
            OpKind::SetB => self.set_rows("b", n_b, verifier),
            OpKind::GetA if bulk => self.get_a_bulk(n_a, verifier),
            OpKind::GetA => self.get_a_rows(n_a, verifier),
            OpKind::GetB if bulk => self.get_b_bulk(n_b, verifier),
            OpKind::GetB => self.get_b_rows(n_b, verifier),
            OpKind::SetBFk if bulk => self.set_b_fk_bulk(point, verifier),
            OpKind::SetBFk => self.set_b_fk_rows(point, verifier),
            OpKind::NavBToA if bulk => self.nav_b_to_a_bulk(point, verifier),
            OpKind::NavBToA => self.nav_b_to_a_rows(point, verifier),
            OpKind::NavAToB if bulk => self.nav_a_to_b_bulk(point, verifier),
            OpKind::NavAToB => self.nav_a_to_b_rows(point, verifier),
            OpKind::NullBFk if bulk => self.null_b_fk_bulk(n_b, verifier),
            OpKind::NullBFk => self.null_b_fk_rows(n_b, verifier),
            OpKind::DelB if bulk => self.del_bulk("b", n_b, verifier),
            OpKind::DelB => self.del_rows("b", n_b, verifier),
            OpKind::DelA if bulk => self.del_bulk("a", n_a, verifier),
            OpKind::DelA => self.del_rows("a", n_a, verifier),
        }
    }
}

fn verify_attrs(
    v: &mut Verifier,
    what: &str,
    id: u64,
    cint: i64,
    clong: i64,
    cfloat: f64,
    cdouble: f64,
) -> BenchResult<()> {
    let (eint, elong, efloat, edouble) = attr_updated(id);
    v.expect_eq(&format!("{what}({id}) cint"), eint, cint)?;
    v.expect_eq(&format!("{what}({id}) clong"), elong, clong)?;
    v.expect_eq(&format!("{what}({id}) cfloat"), efloat, cfloat)?;
    v.expect_eq(&format!("{what}({id}) cdouble"), edouble, cdouble)
}

/// Configure a connection for low-latency benchmarking.
fn configure_connection(conn: &Connection) -> BenchResult<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = OFF;
         PRAGMA cache_size = -65536;
         PRAGMA temp_store = MEMORY;",
    )?;
    Ok(())
}

fn multi_insert_sql(table: &str, columns: &[&str], rows: usize) -> String {
    let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    let tuples = vec![placeholders; rows].join(", ");
    format!(
        "INSERT INTO {table} ({}) VALUES {tuples}",
        columns.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BenchConfig, PartialConfig};

    fn open_adapter() -> SqliteAdapter {
        let cfg = BenchConfig::resolve(PartialConfig::default()).unwrap();
        let mut adapter = SqliteAdapter::new(":memory:");
        adapter.init_connection(&cfg).unwrap();
        adapter
    }

    fn run_sequence(adapter: &mut SqliteAdapter, mode: XMode, point: SweepPoint) -> Verifier {
        let registry = adapter.init_operations(&[mode]);
        let mut verifier = Verifier::new(false);
        for op in registry.iter() {
            if op.mode != XMode::Indy {
                adapter.begin().unwrap();
            }
            adapter.run_op(op, point, &mut verifier).unwrap();
            if op.mode != XMode::Indy {
                adapter.commit().unwrap();
            }
        }
        verifier
    }

    #[test]
    fn multi_insert_sql_shape() {
        let sql = multi_insert_sql("a", &["id", "cint"], 2);
        assert_eq!(sql, "INSERT INTO a (id, cint) VALUES (?, ?), (?, ?)");
    }

    #[test]
    fn each_mode_sequence_verifies_cleanly() {
        let mut adapter = open_adapter();
        let point = SweepPoint {
            count_a: 4,
            count_b: 10,
        };
        let mut verifier = run_sequence(&mut adapter, XMode::Each, point);
        assert_eq!(verifier.take_errors(), Vec::<String>::new());
    }

    #[test]
    fn bulk_mode_sequence_verifies_cleanly() {
        let mut adapter = open_adapter();
        // Spans multiple bulk chunks.
        let point = SweepPoint {
            count_a: 300,
            count_b: 300,
        };
        let mut verifier = run_sequence(&mut adapter, XMode::Bulk, point);
        assert_eq!(verifier.take_errors(), Vec::<String>::new());
    }

    #[test]
    fn indy_mode_sequence_verifies_cleanly() {
        let mut adapter = open_adapter();
        let point = SweepPoint {
            count_a: 3,
            count_b: 3,
        };
        let mut verifier = run_sequence(&mut adapter, XMode::Indy, point);
        assert_eq!(verifier.take_errors(), Vec::<String>::new());
    }

    #[test]
    fn sequence_leaves_dataset_empty() {
        let mut adapter = open_adapter();
        let point = SweepPoint {
            count_a: 5,
            count_b: 5,
        };
        run_sequence(&mut adapter, XMode::Each, point);
        let conn = adapter.conn().unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM a", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 0);
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM b", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn clear_data_resets_tables() {
        let mut adapter = open_adapter();
        adapter.ins_a_rows(8).unwrap();
        adapter.clear_data().unwrap();
        let rows: i64 = adapter
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM a", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn ops_fail_without_connection() {
        let mut adapter = SqliteAdapter::new(":memory:");
        assert!(adapter.clear_data().is_err());
    }
}
