//! The operation model: batching modes, the closed operation set, and the
//! ordered registry the sweep executes.
//!
//! Operations are plain data records — the batching mode is a field on the
//! record, and the adapter interprets the (kind, mode) pair. Registration
//! order is execution and reporting order; the delete operations close each
//! mode group so every group leaves the dataset empty.

use crate::error::{BenchError, BenchResult};
use regex::Regex;
use std::fmt;

/// Commit policy for applying N logical row operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XMode {
    /// Each row operation is its own committed transaction.
    Indy,
    /// One transaction, rows applied one at a time.
    Each,
    /// One transaction, rows applied as a single bulk batch.
    Bulk,
}

impl XMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            XMode::Indy => "indy",
            XMode::Each => "each",
            XMode::Bulk => "bulk",
        }
    }

    /// Parse the comma-separated `xMode` property. A malformed mode name is
    /// a configuration error naming the offending value; there is no safe
    /// default for a typo.
    pub fn parse_list(value: &str) -> BenchResult<Vec<XMode>> {
        let mut modes = Vec::new();
        for part in value.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let mode = match part {
                "indy" => XMode::Indy,
                "each" => XMode::Each,
                "bulk" => XMode::Bulk,
                other => {
                    return Err(BenchError::Config(format!(
                        "xMode: unknown batching mode '{other}' (expected indy, each, bulk)"
                    )))
                }
            };
            if !modes.contains(&mode) {
                modes.push(mode);
            }
        }
        if modes.is_empty() {
            return Err(BenchError::Config(format!(
                "xMode: no batching modes in '{value}'"
            )));
        }
        Ok(modes)
    }
}

impl fmt::Display for XMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of logical operations over the two-table A/B data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    InsA,
    InsB,
    SetA,
    SetB,
    GetA,
    GetB,
    SetBFk,
    NavBToA,
    NavAToB,
    NullBFk,
    DelB,
    DelA,
}

impl OpKind {
    /// Canonical execution order within one mode group. Inserts precede
    /// reads, navigation needs the FK edge set, deletes close the group.
    pub const SEQUENCE: [OpKind; 12] = [
        OpKind::InsA,
        OpKind::InsB,
        OpKind::SetA,
        OpKind::SetB,
        OpKind::GetA,
        OpKind::GetB,
        OpKind::SetBFk,
        OpKind::NavBToA,
        OpKind::NavAToB,
        OpKind::NullBFk,
        OpKind::DelB,
        OpKind::DelA,
    ];

    pub fn base_name(&self) -> &'static str {
        match self {
            OpKind::InsA => "ins_a",
            OpKind::InsB => "ins_b",
            OpKind::SetA => "set_a",
            OpKind::SetB => "set_b",
            OpKind::GetA => "get_a",
            OpKind::GetB => "get_b",
            OpKind::SetBFk => "set_b_fk",
            OpKind::NavBToA => "nav_b_a",
            OpKind::NavAToB => "nav_a_b",
            OpKind::NullBFk => "null_b_fk",
            OpKind::DelB => "del_b",
            OpKind::DelA => "del_a",
        }
    }
}

/// One registered benchmark operation.
#[derive(Debug, Clone)]
pub struct BenchOp {
    pub name: String,
    pub kind: OpKind,
    pub mode: XMode,
}

impl BenchOp {
    pub fn new(kind: OpKind, mode: XMode) -> Self {
        Self {
            name: format!("{}_{}", kind.base_name(), mode),
            kind,
            mode,
        }
    }
}

/// Ordered operation sequence for one benchmark session.
#[derive(Debug, Clone, Default)]
pub struct OpRegistry {
    ops: Vec<BenchOp>,
}

impl OpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full CRUD/navigate sequence, one group per batching mode.
    pub fn standard(modes: &[XMode]) -> Self {
        let mut registry = Self::new();
        for &mode in modes {
            for kind in OpKind::SEQUENCE {
                registry.register(BenchOp::new(kind, mode));
            }
        }
        registry
    }

    pub fn register(&mut self, op: BenchOp) {
        self.ops.push(op);
    }

    pub fn iter(&self) -> impl Iterator<Item = &BenchOp> {
        self.ops.iter()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Exclude/include name filtering.
///
/// Exclude wins over include; an empty include set means "run everything not
/// excluded", a non-empty include set means "run only what matches".
#[derive(Debug, Clone, Default)]
pub struct OpFilter {
    exclude: Vec<Regex>,
    include: Vec<Regex>,
}

impl OpFilter {
    pub fn compile(exclude: &[String], include: &[String]) -> BenchResult<Self> {
        Ok(Self {
            exclude: compile_patterns("exclude", exclude)?,
            include: compile_patterns("include", include)?,
        })
    }

    pub fn allows(&self, name: &str) -> bool {
        if self.exclude.iter().any(|re| re.is_match(name)) {
            return false;
        }
        if !self.include.is_empty() && !self.include.iter().any(|re| re.is_match(name)) {
            return false;
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.exclude.is_empty() && self.include.is_empty()
    }
}

fn compile_patterns(key: &str, patterns: &[String]) -> BenchResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p)
                .map_err(|e| BenchError::Config(format!("{key}: bad pattern '{p}': {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(exclude: &[&str], include: &[&str]) -> OpFilter {
        let ex: Vec<String> = exclude.iter().map(|s| s.to_string()).collect();
        let inc: Vec<String> = include.iter().map(|s| s.to_string()).collect();
        OpFilter::compile(&ex, &inc).unwrap()
    }

    #[test]
    fn xmode_list_parses() {
        assert_eq!(
            XMode::parse_list("indy,each,bulk").unwrap(),
            [XMode::Indy, XMode::Each, XMode::Bulk]
        );
        assert_eq!(XMode::parse_list(" bulk ").unwrap(), [XMode::Bulk]);
    }

    #[test]
    fn xmode_rejects_unknown_mode() {
        let err = XMode::parse_list("indy,batchy").unwrap_err();
        assert!(err.to_string().contains("batchy"));
    }

    #[test]
    fn xmode_rejects_empty_list() {
        assert!(XMode::parse_list("").is_err());
        assert!(XMode::parse_list(" , ").is_err());
    }

    #[test]
    fn standard_registry_orders_mode_groups() {
        let registry = OpRegistry::standard(&[XMode::Indy, XMode::Bulk]);
        assert_eq!(registry.len(), 24);
        let names: Vec<&str> = registry.iter().map(|op| op.name.as_str()).collect();
        assert_eq!(names[0], "ins_a_indy");
        assert_eq!(names[11], "del_a_indy");
        assert_eq!(names[12], "ins_a_bulk");
        assert_eq!(names[23], "del_a_bulk");
    }

    #[test]
    fn registry_clear_is_idempotent() {
        let mut registry = OpRegistry::standard(&[XMode::Each]);
        registry.clear();
        assert!(registry.is_empty());
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn exclude_list_mode() {
        let f = filter(&["foo"], &[]);
        assert!(!f.allows("foo"));
        assert!(f.allows("bar"));
    }

    #[test]
    fn allow_list_mode() {
        let f = filter(&[], &["bar"]);
        assert!(f.allows("bar"));
        assert!(!f.allows("foo"));
    }

    #[test]
    fn exclude_wins_over_include() {
        let f = filter(&["ins_a_bulk"], &["ins_a"]);
        assert!(f.allows("ins_a_indy"));
        assert!(!f.allows("ins_a_bulk"));
    }

    #[test]
    fn empty_filter_allows_everything() {
        let f = filter(&[], &[]);
        assert!(f.is_empty());
        assert!(f.allows("anything"));
    }

    #[test]
    fn patterns_are_regexes() {
        let f = filter(&["_bulk$"], &[]);
        assert!(!f.allows("ins_a_bulk"));
        assert!(f.allows("ins_a_each"));
    }

    #[test]
    fn bad_pattern_is_config_error() {
        let err = OpFilter::compile(&["(".to_string()], &[]).unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
    }
}
