//! Layered benchmark configuration.
//!
//! Properties live in TOML files passed as repeated `-p` options; later files
//! override earlier ones. Keys keep their camelCase property names
//! (`nOpsStart`, `xMode`, ...). Resolution applies documented defaults and
//! validates: a sweep scale that cannot advance is clamped with a warning,
//! while a malformed batching mode, adapter name, pattern, or run count
//! aborts startup naming the key and value.

use crate::error::{BenchError, BenchResult};
use crate::ops::{OpFilter, XMode};
use crate::sweep::{Progression, SweepAxis};
use serde::Deserialize;
use std::path::Path;

/// One property file's worth of settings; every field optional so files can
/// be merged last-wins.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PartialConfig {
    pub adapter: Option<String>,
    pub database: Option<String>,
    pub n_ops_start: Option<u64>,
    pub n_ops_end: Option<u64>,
    pub n_ops_scale: Option<u64>,
    pub n_ops_step: Option<u64>,
    pub dual_axis: Option<bool>,
    pub a_start: Option<u64>,
    pub a_end: Option<u64>,
    pub a_scale: Option<u64>,
    pub b_start: Option<u64>,
    pub b_end: Option<u64>,
    pub b_scale: Option<u64>,
    pub warmup_runs: Option<u32>,
    pub hot_runs: Option<u32>,
    pub log_real_time: Option<bool>,
    pub log_mem_usage: Option<bool>,
    #[serde(rename = "includeFullGC")]
    pub include_full_gc: Option<bool>,
    pub renew_connection: Option<bool>,
    pub renew_operations: Option<bool>,
    #[serde(rename = "allowExtendedPC")]
    pub allow_extended_pc: Option<bool>,
    pub exclude: Option<String>,
    pub include: Option<String>,
    pub x_mode: Option<String>,
    pub log_sum_of_ops: Option<bool>,
    pub fail_fast: Option<bool>,
    pub isolation_level: Option<String>,
    pub n_warmup_runs: Option<usize>,
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> BenchResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BenchError::Config(format!("cannot read property file {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| BenchError::Config(format!("{}: {e}", path.display())))
    }

    /// Overlay `other` on top of this config; set fields in `other` win.
    pub fn merge(&mut self, other: PartialConfig) {
        macro_rules! overlay {
            ($($field:ident),+ $(,)?) => {
                $( if other.$field.is_some() { self.$field = other.$field; } )+
            };
        }
        overlay!(
            adapter,
            database,
            n_ops_start,
            n_ops_end,
            n_ops_scale,
            n_ops_step,
            dual_axis,
            a_start,
            a_end,
            a_scale,
            b_start,
            b_end,
            b_scale,
            warmup_runs,
            hot_runs,
            log_real_time,
            log_mem_usage,
            include_full_gc,
            renew_connection,
            renew_operations,
            allow_extended_pc,
            exclude,
            include,
            x_mode,
            log_sum_of_ops,
            fail_fast,
            isolation_level,
            n_warmup_runs,
        );
    }
}

/// Fully resolved benchmark settings.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub adapter: String,
    pub database: String,
    pub a_axis: SweepAxis,
    pub b_axis: Option<SweepAxis>,
    pub warmup_runs: u32,
    pub hot_runs: u32,
    pub log_real_time: bool,
    pub log_mem_usage: bool,
    pub include_full_gc: bool,
    pub renew_connection: bool,
    pub renew_operations: bool,
    pub allow_extended_pc: bool,
    pub filter: OpFilter,
    pub xmodes: Vec<XMode>,
    pub log_sum_of_ops: bool,
    pub fail_fast: bool,
    pub isolation_level: String,
    /// ResultProcessor only: extra data rows trimmed per block.
    pub n_warmup_runs: usize,
}

impl BenchConfig {
    /// Load and merge the given property files, then resolve defaults.
    pub fn load(paths: &[impl AsRef<Path>]) -> BenchResult<Self> {
        let mut merged = PartialConfig::default();
        for path in paths {
            merged.merge(PartialConfig::from_file(path.as_ref())?);
        }
        Self::resolve(merged)
    }

    pub fn resolve(p: PartialConfig) -> BenchResult<Self> {
        let n_start = p.n_ops_start.unwrap_or(256);
        let n_end = p.n_ops_end.unwrap_or(1024);
        // An additive step overrides the multiplicative scale when given.
        let progression = |scale: Option<u64>| match p.n_ops_step {
            Some(step) if scale.is_none() => Progression::Add(step),
            _ => Progression::Mul(scale.or(p.n_ops_scale).unwrap_or(2)),
        };

        let dual = p.dual_axis.unwrap_or(false);
        let a_axis = if dual {
            SweepAxis::new(
                p.a_start.unwrap_or(n_start),
                p.a_end.unwrap_or(n_end),
                progression(p.a_scale),
            )
        } else {
            SweepAxis::new(n_start, n_end, progression(None))
        };
        let b_axis = dual.then(|| {
            SweepAxis::new(
                p.b_start.unwrap_or(n_start),
                p.b_end.unwrap_or(n_end),
                progression(p.b_scale),
            )
        });

        let hot_runs = p.hot_runs.unwrap_or(3);
        if hot_runs < 1 {
            return Err(BenchError::Config("hotRuns: must be at least 1".into()));
        }

        let xmodes = XMode::parse_list(p.x_mode.as_deref().unwrap_or("indy,each,bulk"))?;
        let filter = OpFilter::compile(
            &split_patterns(p.exclude.as_deref()),
            &split_patterns(p.include.as_deref()),
        )?;

        let adapter = p.adapter.unwrap_or_else(|| "sqlite".into());
        if adapter.trim().is_empty() {
            return Err(BenchError::Config("adapter: must not be empty".into()));
        }

        Ok(Self {
            adapter,
            database: p.database.unwrap_or_else(|| ":memory:".into()),
            a_axis,
            b_axis,
            warmup_runs: p.warmup_runs.unwrap_or(1),
            hot_runs,
            log_real_time: p.log_real_time.unwrap_or(true),
            log_mem_usage: p.log_mem_usage.unwrap_or(false),
            include_full_gc: p.include_full_gc.unwrap_or(false),
            renew_connection: p.renew_connection.unwrap_or(false),
            renew_operations: p.renew_operations.unwrap_or(false),
            allow_extended_pc: p.allow_extended_pc.unwrap_or(false),
            filter,
            xmodes,
            log_sum_of_ops: p.log_sum_of_ops.unwrap_or(true),
            fail_fast: p.fail_fast.unwrap_or(false),
            isolation_level: p.isolation_level.unwrap_or_else(|| "read-committed".into()),
            n_warmup_runs: p.n_warmup_runs.unwrap_or(0),
        })
    }

    pub fn dual_axis(&self) -> bool {
        self.b_axis.is_some()
    }

    /// One-line settings summary for the startup banner and log preamble.
    pub fn describe(&self) -> String {
        let modes: Vec<&str> = self.xmodes.iter().map(|m| m.as_str()).collect();
        format!(
            "adapter={} database={} sweep={}..{} warmupRuns={} hotRuns={} xMode={}",
            self.adapter,
            self.database,
            self.a_axis.start,
            self.a_axis.end,
            self.warmup_runs,
            self.hot_runs,
            modes.join(",")
        )
    }
}

fn split_patterns(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn resolve_toml(toml: &str) -> BenchResult<BenchConfig> {
        let partial: PartialConfig = toml::from_str(toml).unwrap();
        BenchConfig::resolve(partial)
    }

    #[test]
    fn defaults_resolve() {
        let cfg = BenchConfig::resolve(PartialConfig::default()).unwrap();
        assert_eq!(cfg.adapter, "sqlite");
        assert_eq!(cfg.database, ":memory:");
        assert_eq!(cfg.a_axis.start, 256);
        assert_eq!(cfg.a_axis.end, 1024);
        assert_eq!(cfg.a_axis.progression, Progression::Mul(2));
        assert!(cfg.b_axis.is_none());
        assert_eq!(cfg.warmup_runs, 1);
        assert_eq!(cfg.hot_runs, 3);
        assert!(cfg.log_real_time);
        assert!(!cfg.log_mem_usage);
        assert_eq!(cfg.xmodes, [XMode::Indy, XMode::Each, XMode::Bulk]);
        assert!(cfg.log_sum_of_ops);
        assert!(!cfg.fail_fast);
    }

    #[test]
    fn camel_case_keys_parse() {
        let cfg = resolve_toml(
            r#"
            nOpsStart = 10
            nOpsEnd = 100
            nOpsScale = 3
            warmupRuns = 0
            hotRuns = 5
            logMemUsage = true
            includeFullGC = true
            allowExtendedPC = true
            xMode = "bulk"
            exclude = "del_"
            failFast = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.a_axis.start, 10);
        assert_eq!(cfg.a_axis.progression, Progression::Mul(3));
        assert_eq!(cfg.warmup_runs, 0);
        assert_eq!(cfg.hot_runs, 5);
        assert!(cfg.log_mem_usage && cfg.include_full_gc && cfg.allow_extended_pc);
        assert_eq!(cfg.xmodes, [XMode::Bulk]);
        assert!(!cfg.filter.allows("del_a_bulk"));
        assert!(cfg.fail_fast);
    }

    #[test]
    fn step_gives_additive_progression() {
        let cfg = resolve_toml("nOpsStart = 10\nnOpsEnd = 40\nnOpsStep = 10").unwrap();
        assert_eq!(cfg.a_axis.progression, Progression::Add(10));
    }

    #[test]
    fn degenerate_scale_is_clamped_not_fatal() {
        let cfg = resolve_toml("nOpsScale = 1").unwrap();
        assert_eq!(cfg.a_axis.progression, Progression::Mul(2));
    }

    #[test]
    fn dual_axis_defaults_from_n_ops() {
        let cfg = resolve_toml("dualAxis = true\nnOpsStart = 4\nnOpsEnd = 64\nbEnd = 256").unwrap();
        assert!(cfg.dual_axis());
        let b = cfg.b_axis.unwrap();
        assert_eq!(b.start, 4);
        assert_eq!(b.end, 256);
    }

    #[test]
    fn bad_mode_and_zero_hot_runs_abort() {
        assert!(matches!(
            resolve_toml("xMode = \"indy,nope\"").unwrap_err(),
            BenchError::Config(_)
        ));
        let err = resolve_toml("hotRuns = 0").unwrap_err();
        assert!(err.to_string().contains("hotRuns"));
    }

    #[test]
    fn unknown_key_is_config_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "nOpsStrat = 10").unwrap();
        let err = BenchConfig::load(&[f.path()]).unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
    }

    #[test]
    fn later_files_override_earlier() {
        let mut f1 = tempfile::NamedTempFile::new().unwrap();
        writeln!(f1, "nOpsStart = 8\nhotRuns = 2").unwrap();
        let mut f2 = tempfile::NamedTempFile::new().unwrap();
        writeln!(f2, "nOpsStart = 32").unwrap();
        let cfg = BenchConfig::load(&[f1.path(), f2.path()]).unwrap();
        assert_eq!(cfg.a_axis.start, 32);
        assert_eq!(cfg.hot_runs, 2);
    }
}
