//! Offline result-log processor.
//!
//! Re-parses the tab-separated log written by [`crate::resultlog`],
//! recomputes per-operation mean/stdev/relative-stdev with the same online
//! accumulator the engine uses, and flags noisy entries. Parsing is strict:
//! wrong column counts, non-numeric values, and an inconsistent leading
//! `nTxOps` label within a block all abort the file with a line-annotated
//! error.

use crate::error::{BenchError, BenchResult};
use crate::stats::{SeriesStats, Summary};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Relative-standard-deviation threshold above which an entry is flagged.
pub const RSDEV_THRESHOLD_PCT: f64 = 10.0;

/// Report entry for one operation column.
#[derive(Debug, Clone)]
pub struct OpReport {
    pub name: String,
    pub summary: Summary,
    pub high_variance: bool,
}

/// Report for one log block.
#[derive(Debug, Clone)]
pub struct BlockReport {
    /// The repeated `nTxOps` value, reported unchanged.
    pub n_tx_ops: String,
    /// Data rows folded into the statistics (after the warmup trim).
    pub rows: usize,
    pub entries: Vec<OpReport>,
}

/// Process one log file, trimming the first `n_warmup_runs` data rows of
/// every block from the statistics.
pub fn process_file(path: &Path, n_warmup_runs: usize) -> BenchResult<Vec<BlockReport>> {
    let file = File::open(path)?;
    process_reader(BufReader::new(file), &path.display().to_string(), n_warmup_runs)
}

/// Process a log from any buffered reader; `path` only labels errors.
pub fn process_reader<R: BufRead>(
    reader: R,
    path: &str,
    n_warmup_runs: usize,
) -> BenchResult<Vec<BlockReport>> {
    let mut reports = Vec::new();
    let mut block: Option<BlockState> = None;

    for (idx, line) in reader.lines().enumerate() {
        let lineno = idx + 1;
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);

        if line.trim().is_empty() {
            // Blank line ends the current block and triggers its report.
            if let Some(state) = block.take() {
                reports.push(state.finish(n_warmup_runs));
            }
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        match block.as_mut() {
            // First non-blank line of a new block is the header.
            None => block = Some(BlockState::new(fields)),
            Some(state) => state.add_row(&fields, path, lineno)?,
        }
    }
    if let Some(state) = block.take() {
        reports.push(state.finish(n_warmup_runs));
    }
    Ok(reports)
}

struct BlockState {
    header: Vec<String>,
    /// Operation names, resolved against the first data row's width.
    ops: Option<Vec<String>>,
    n_tx_ops: Option<String>,
    rows: Vec<Vec<f64>>,
}

impl BlockState {
    fn new(header: Vec<&str>) -> Self {
        Self {
            header: header.into_iter().map(str::to_string).collect(),
            ops: None,
            n_tx_ops: None,
            rows: Vec::new(),
        }
    }

    fn add_row(&mut self, fields: &[&str], path: &str, lineno: usize) -> BenchResult<()> {
        let parse_err = |msg: String| BenchError::Parse {
            path: path.to_string(),
            line: lineno,
            msg,
        };

        if self.ops.is_none() {
            // The header may or may not carry a label for the leading
            // nTxOps column; the first data row disambiguates.
            let ops = if self.header.len() == fields.len() {
                self.header[1..].to_vec()
            } else if self.header.len() + 1 == fields.len() {
                self.header.clone()
            } else {
                return Err(parse_err(format!(
                    "row has {} fields but header has {} columns",
                    fields.len(),
                    self.header.len()
                )));
            };
            self.ops = Some(ops);
        }
        let ops = self.ops.as_ref().map(Vec::len).unwrap_or(0);
        if fields.len() != ops + 1 {
            return Err(parse_err(format!(
                "row has {} fields, expected {}",
                fields.len(),
                ops + 1
            )));
        }

        match &self.n_tx_ops {
            None => self.n_tx_ops = Some(fields[0].to_string()),
            Some(label) if label != fields[0] => {
                return Err(parse_err(format!(
                    "inconsistent nTxOps: block started with {label}, row has {}",
                    fields[0]
                )))
            }
            Some(_) => {}
        }

        let mut values = Vec::with_capacity(ops);
        for field in &fields[1..] {
            let v: f64 = field
                .parse()
                .map_err(|_| parse_err(format!("non-numeric value '{field}'")))?;
            values.push(v);
        }
        self.rows.push(values);
        Ok(())
    }

    fn finish(self, n_warmup_runs: usize) -> BlockReport {
        let ops = self.ops.unwrap_or_else(|| {
            // Header-only block: assume a labeled leading column.
            if self.header.first().map(String::as_str) == Some("nTxOps") {
                self.header[1..].to_vec()
            } else {
                self.header.clone()
            }
        });
        let mut stats = vec![SeriesStats::new(); ops.len()];
        let kept = self.rows.iter().skip(n_warmup_runs);
        let mut rows = 0;
        for row in kept {
            for (s, v) in stats.iter_mut().zip(row) {
                s.observe(*v);
            }
            rows += 1;
        }
        let entries = ops
            .into_iter()
            .zip(stats)
            .map(|(name, s)| {
                let summary = s.summary();
                let high_variance = summary
                    .rsdev_pct
                    .map(|r| r > RSDEV_THRESHOLD_PCT)
                    .unwrap_or(false);
                OpReport {
                    name,
                    summary,
                    high_variance,
                }
            })
            .collect();
        BlockReport {
            n_tx_ops: self.n_tx_ops.unwrap_or_default(),
            rows,
            entries,
        }
    }
}

/// Print the per-block summary tables for one processed file.
pub fn print_report(path: &str, reports: &[BlockReport]) {
    println!("\n{}", "=".repeat(72));
    println!("  result log: {path}");
    println!("{}", "=".repeat(72));

    for report in reports {
        println!("\n  nTxOps = {} ({} runs)", report.n_tx_ops, report.rows);
        println!(
            "  {:<20} {:>12} {:>12} {:>10}",
            "op", "avg", "stdev", "rsdev"
        );
        println!("  {}", "-".repeat(58));
        for entry in &report.entries {
            let rsdev = match entry.summary.rsdev_pct {
                Some(r) => format!("{r:.1}%"),
                None => "n/a".to_string(),
            };
            let flag = if entry.high_variance { "  !" } else { "" };
            println!(
                "  {:<20} {:>12.1} {:>12.2} {:>10}{}",
                entry.name, entry.summary.mean, entry.summary.stdev, rsdev, flag
            );
        }
        let noisy = report.entries.iter().filter(|e| e.high_variance).count();
        if noisy > 0 {
            println!(
                "  {noisy} op(s) above {RSDEV_THRESHOLD_PCT:.0}% relative standard deviation"
            );
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn process(text: &str) -> BenchResult<Vec<BlockReport>> {
        process_reader(Cursor::new(text.as_bytes()), "test.log", 0)
    }

    #[test]
    fn round_trip_block() {
        let text = "insert\tlookup\n100\t10\t20\n100\t12\t18\n";
        let reports = process(text).unwrap();
        assert_eq!(reports.len(), 1);
        let r = &reports[0];
        assert_eq!(r.n_tx_ops, "100");
        assert_eq!(r.rows, 2);
        assert_eq!(r.entries[0].name, "insert");
        assert!((r.entries[0].summary.mean - 11.0).abs() < 1e-9);
        assert_eq!(r.entries[1].name, "lookup");
        assert!((r.entries[1].summary.mean - 19.0).abs() < 1e-9);
    }

    #[test]
    fn labeled_header_is_recognized() {
        let text = "nTxOps\tinsert\tlookup\n100\t10\t20\n100\t12\t18\n";
        let reports = process(text).unwrap();
        assert_eq!(reports[0].entries.len(), 2);
        assert_eq!(reports[0].entries[0].name, "insert");
    }

    #[test]
    fn n_tx_ops_mismatch_is_parse_error() {
        let text = "insert\tlookup\n100\t10\t20\n100\t12\t18\n200\t11\t19\n";
        let err = process(text).unwrap_err();
        match err {
            BenchError::Parse { line, ref msg, .. } => {
                assert_eq!(line, 4);
                assert!(msg.contains("nTxOps"));
            }
            other => panic!("expected parse error, got {other}"),
        }
    }

    #[test]
    fn non_numeric_value_is_parse_error() {
        let text = "insert\n100\tok\n";
        let err = process(text).unwrap_err();
        assert!(matches!(err, BenchError::Parse { line: 2, .. }));
    }

    #[test]
    fn column_count_mismatch_is_parse_error() {
        let text = "insert\tlookup\n100\t10\t20\n100\t12\n";
        let err = process(text).unwrap_err();
        assert!(matches!(err, BenchError::Parse { line: 3, .. }));
    }

    #[test]
    fn comments_and_blank_lines_delimit_blocks() {
        let text = "# preamble\n\n\n# rtime[ms] nTxOps=4 runs=2\nnTxOps\tins\n4\t10\n4\t12\n# mean\t11.0\n\n\n# rtime[ms] nTxOps=8 runs=1\nnTxOps\tins\n8\t30\n";
        let reports = process(text).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].n_tx_ops, "4");
        assert_eq!(reports[1].n_tx_ops, "8");
        assert!((reports[1].entries[0].summary.mean - 30.0).abs() < 1e-9);
    }

    #[test]
    fn warmup_rows_are_trimmed() {
        let text = "ins\n4\t1000\n4\t10\n4\t12\n";
        let reports = process_reader(Cursor::new(text.as_bytes()), "test.log", 1).unwrap();
        let r = &reports[0];
        assert_eq!(r.rows, 2);
        assert!((r.entries[0].summary.mean - 11.0).abs() < 1e-9);
    }

    #[test]
    fn high_variance_is_flagged() {
        // mean 100, stdev 50 → rsdev 50%.
        let noisy = "ins\n4\t50\n4\t150\n";
        let reports = process(noisy).unwrap();
        assert!(reports[0].entries[0].high_variance);

        let steady = "ins\n4\t100\n4\t101\n";
        let reports = process(steady).unwrap();
        assert!(!reports[0].entries[0].high_variance);
    }
}
