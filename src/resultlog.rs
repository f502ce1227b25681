//! Tab-separated result log, one block per (sweep point, metric kind).
//!
//! Block shape: a `#` comment line naming the metric and point, a header line
//! (`nTxOps` plus the operation names, plus `total` when row sums are
//! enabled), one data line per hot repetition, and a `#`-prefixed streaming
//! mean row. Blocks are separated by two blank lines so the offline
//! processor can detect boundaries. A block is written as one unit — an
//! in-flight sweep point that fails is dropped, never partially flushed.

use crate::error::BenchResult;
use crate::stats::StatSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// In-memory block for one sweep point and metric kind.
#[derive(Debug, Clone)]
pub struct Block {
    /// Metric description for the leading comment, e.g. `rtime[ms]`.
    pub metric: String,
    /// Compound sweep label repeated in every row's first column.
    pub label: String,
    pub op_names: Vec<String>,
    /// One row per hot repetition, values in `op_names` order.
    pub rows: Vec<Vec<i64>>,
    /// Append a trailing column summing each row.
    pub sum_of_ops: bool,
}

impl Block {
    pub fn new(metric: &str, label: &str, op_names: Vec<String>, sum_of_ops: bool) -> Self {
        Self {
            metric: metric.to_string(),
            label: label.to_string(),
            op_names,
            rows: Vec::new(),
            sum_of_ops,
        }
    }

    pub fn push_row(&mut self, values: Vec<i64>) {
        debug_assert_eq!(values.len(), self.op_names.len());
        self.rows.push(values);
    }

    /// Per-column means (plus the total column), streamed through the
    /// accumulator rather than re-walking raw history.
    fn mean_columns(&self) -> Vec<f64> {
        let mut stats = StatSet::new();
        for row in &self.rows {
            let mut sum = 0i64;
            for (name, value) in self.op_names.iter().zip(row) {
                stats.observe(name, *value as f64);
                sum += value;
            }
            if self.sum_of_ops {
                stats.observe("total", sum as f64);
            }
        }
        stats.iter().map(|(_, s)| s.mean()).collect()
    }
}

/// Append-only writer for the persistent result log.
#[derive(Debug)]
pub struct ResultLog {
    path: PathBuf,
    out: BufWriter<File>,
}

impl ResultLog {
    /// Create (truncate) the log and write `#`-prefixed preamble lines.
    pub fn create(path: &Path, preamble: &[String]) -> BenchResult<Self> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        for line in preamble {
            writeln!(out, "# {line}")?;
        }
        writeln!(out)?;
        writeln!(out)?;
        Ok(Self {
            path: path.to_path_buf(),
            out,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_block(&mut self, block: &Block) -> BenchResult<()> {
        if block.rows.is_empty() {
            log::warn!("skipping empty {} block for point {}", block.metric, block.label);
            return Ok(());
        }
        writeln!(
            self.out,
            "# {} nTxOps={} runs={}",
            block.metric,
            block.label,
            block.rows.len()
        )?;

        let mut header = vec!["nTxOps".to_string()];
        header.extend(block.op_names.iter().cloned());
        if block.sum_of_ops {
            header.push("total".to_string());
        }
        writeln!(self.out, "{}", header.join("\t"))?;

        for row in &block.rows {
            let mut fields = vec![block.label.clone()];
            fields.extend(row.iter().map(|v| v.to_string()));
            if block.sum_of_ops {
                fields.push(row.iter().sum::<i64>().to_string());
            }
            writeln!(self.out, "{}", fields.join("\t"))?;
        }

        let means: Vec<String> = block
            .mean_columns()
            .iter()
            .map(|m| format!("{m:.1}"))
            .collect();
        writeln!(self.out, "# mean\t{}", means.join("\t"))?;
        writeln!(self.out)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }

    /// Flush and close the log.
    pub fn finish(mut self) -> BenchResult<()> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(block: &Block) -> String {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let mut log = ResultLog::create(&path, &["test log".to_string()]).unwrap();
        log.write_block(block).unwrap();
        log.finish().unwrap();
        std::fs::read_to_string(&path).unwrap()
    }

    #[test]
    fn block_layout_is_tab_separated_with_totals() {
        let mut block = Block::new(
            "rtime[ms]",
            "100",
            vec!["insert".into(), "lookup".into()],
            true,
        );
        block.push_row(vec![10, 20]);
        block.push_row(vec![12, 18]);
        let text = written(&block);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# test log");
        // Preamble is followed by two blank lines, then the block comment.
        assert!(lines[3].starts_with("# rtime[ms] nTxOps=100"));
        assert_eq!(lines[4], "nTxOps\tinsert\tlookup\ttotal");
        assert_eq!(lines[5], "100\t10\t20\t30");
        assert_eq!(lines[6], "100\t12\t18\t30");
        assert_eq!(lines[7], "# mean\t11.0\t19.0\t30.0");
        // Two blank lines close the block.
        assert_eq!(lines[8], "");
        assert!(lines.get(9).map_or(true, |l| l.is_empty()));
    }

    #[test]
    fn sum_column_can_be_disabled() {
        let mut block = Block::new("rtime[ms]", "8", vec!["ins_a_each".into()], false);
        block.push_row(vec![5]);
        let text = written(&block);
        assert!(text.contains("nTxOps\tins_a_each\n"));
        assert!(text.contains("8\t5\n"));
        assert!(!text.contains("total"));
    }

    #[test]
    fn empty_block_writes_nothing() {
        let block = Block::new("rtime[ms]", "8", vec!["ins_a_each".into()], true);
        let text = written(&block);
        assert!(!text.contains("rtime"));
    }
}
