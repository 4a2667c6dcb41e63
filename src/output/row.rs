//! Row assembly for the timing and metrics CSV streams.
//!
//! One logical benchmark execution (all repeats of one target with one pair
//! of argument sets) becomes exactly one line in each stream:
//!
//! timing:  name, extra..., elapsed_0, exit_0, elapsed_1, exit_1, ...
//! metrics: name, extra..., columns_0..., columns_1..., ...
//!
//! The label is written by the first repeat, the record is terminated by the
//! last one.

use crate::Result;

use anyhow::Context;
use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Where one physical run sits within its logical execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPosition {
    pub first: bool,
    pub last: bool,
}

impl RunPosition {
    pub fn of(index: usize, repeats: usize) -> Self {
        Self {
            first: index == 0,
            last: index + 1 == repeats,
        }
    }
}

/// Identifying columns of a logical execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLabel {
    pub name: String,
    pub extra: Vec<String>,
}

/// Owns both output streams of one sweep; single writer for each.
pub struct RowAssembler<W: Write> {
    timing: Writer<W>,
    metrics: Writer<W>,
}

impl RowAssembler<File> {
    /// Create (truncate) both files.
    pub fn create(timing: &Path, metrics: &Path) -> Result<Self> {
        let timing_file = File::create(timing)
            .with_context(|| format!("create timing file {}", timing.display()))?;
        let metrics_file = File::create(metrics)
            .with_context(|| format!("create metrics file {}", metrics.display()))?;
        Ok(Self::from_writers(timing_file, metrics_file))
    }
}

impl<W: Write> RowAssembler<W> {
    pub fn from_writers(timing: W, metrics: W) -> Self {
        Self {
            timing: csv_writer(timing),
            metrics: csv_writer(metrics),
        }
    }

    /// Append this run's elapsed time and exit code to the timing line.
    pub fn write_timing(
        &mut self,
        label: &RowLabel,
        position: RunPosition,
        elapsed: f64,
        exit_code: i32,
    ) -> Result<()> {
        if position.first {
            write_label(&mut self.timing, label)?;
        }
        self.timing.write_field(format!("{:?}", elapsed))?;
        self.timing.write_field(exit_code.to_string())?;
        end_run(&mut self.timing, position)
    }

    /// Append this run's extracted columns to the metrics line.
    pub fn write_metrics(
        &mut self,
        label: &RowLabel,
        position: RunPosition,
        columns: &[String],
    ) -> Result<()> {
        if position.first {
            write_label(&mut self.metrics, label)?;
        }
        for column in columns {
            self.metrics.write_field(column)?;
        }
        end_run(&mut self.metrics, position)
    }

    /// Flush and close both streams, handing back the underlying writers.
    pub fn finish(self) -> Result<(W, W)> {
        let timing = self
            .timing
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flush timing stream: {}", e.error()))?;
        let metrics = self
            .metrics
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flush metrics stream: {}", e.error()))?;
        Ok((timing, metrics))
    }
}

fn csv_writer<W: Write>(inner: W) -> Writer<W> {
    // Lines differ in width between targets, so records are flexible.
    WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(inner)
}

fn write_label<W: Write>(writer: &mut Writer<W>, label: &RowLabel) -> Result<()> {
    writer.write_field(&label.name)?;
    for extra in &label.extra {
        writer.write_field(extra)?;
    }
    Ok(())
}

/// Terminate the record on the last run; flush so completed runs are on disk
/// even if a later run aborts the sweep.
fn end_run<W: Write>(writer: &mut Writer<W>, position: RunPosition) -> Result<()> {
    if position.last {
        writer.write_record(None::<&[u8]>)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn label() -> RowLabel {
        RowLabel {
            name: "llvm/CHStone/adpcm O1-O2".to_string(),
            extra: vec![
                "front-end None:".to_string(),
                "back-end O1-O2:-opt=x".to_string(),
            ],
        }
    }

    fn assemble(repeats: usize, columns: &[&str]) -> (String, String) {
        let mut rows = RowAssembler::from_writers(Vec::new(), Vec::new());
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        for i in 0..repeats {
            let position = RunPosition::of(i, repeats);
            rows.write_timing(&label(), position, 0.5 + i as f64, 0).unwrap();
            rows.write_metrics(&label(), position, &columns).unwrap();
        }
        let (timing, metrics) = rows.finish().unwrap();
        (
            String::from_utf8(timing).unwrap(),
            String::from_utf8(metrics).unwrap(),
        )
    }

    #[test]
    fn positions() {
        assert_eq!(RunPosition::of(0, 1), RunPosition { first: true, last: true });
        assert_eq!(RunPosition::of(0, 3), RunPosition { first: true, last: false });
        assert_eq!(RunPosition::of(1, 3), RunPosition { first: false, last: false });
        assert_eq!(RunPosition::of(2, 3), RunPosition { first: false, last: true });
    }

    #[test]
    fn timing_line_has_one_label_and_a_pair_per_repeat() {
        let (timing, _) = assemble(5, &[]);
        assert_eq!(timing.matches('\n').count(), 1);
        assert!(timing.ends_with('\n'));

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(timing.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(record.len(), 3 + 5 * 2);
        assert_eq!(&record[0], "llvm/CHStone/adpcm O1-O2");
        assert_eq!(&record[3], "0.5");
        assert_eq!(&record[4], "0");
        assert_eq!(&record[11], "4.5");
    }

    #[test]
    fn every_field_is_quoted() {
        let (timing, metrics) = assemble(2, &["score: 42.0"]);
        assert_eq!(
            timing,
            "\"llvm/CHStone/adpcm O1-O2\",\"front-end None:\",\"back-end O1-O2:-opt=x\",\
             \"0.5\",\"0\",\"1.5\",\"0\"\n"
        );
        assert_eq!(
            metrics,
            "\"llvm/CHStone/adpcm O1-O2\",\"front-end None:\",\"back-end O1-O2:-opt=x\",\
             \"score: 42.0\",\"score: 42.0\"\n"
        );
    }

    #[test]
    fn embedded_quotes_are_escaped() {
        let mut rows = RowAssembler::from_writers(Vec::new(), Vec::new());
        let label = RowLabel {
            name: "say \"hi\", twice".to_string(),
            extra: vec![],
        };
        rows.write_metrics(&label, RunPosition::of(0, 1), &[]).unwrap();
        let (_, metrics) = rows.finish().unwrap();
        assert_eq!(String::from_utf8(metrics).unwrap(), "\"say \"\"hi\"\", twice\"\n");
    }

    #[test]
    fn consecutive_executions_get_separate_lines() {
        let mut rows = RowAssembler::from_writers(Vec::new(), Vec::new());
        for name in ["a", "b"] {
            let label = RowLabel {
                name: name.to_string(),
                extra: vec![],
            };
            for i in 0..2 {
                rows.write_timing(&label, RunPosition::of(i, 2), 1.0, i as i32).unwrap();
            }
        }
        let (timing, _) = rows.finish().unwrap();
        assert_eq!(
            String::from_utf8(timing).unwrap(),
            "\"a\",\"1.0\",\"0\",\"1.0\",\"1\"\n\"b\",\"1.0\",\"0\",\"1.0\",\"1\"\n"
        );
    }

    #[test]
    fn metrics_without_columns_still_close_the_line() {
        let mut rows = RowAssembler::from_writers(Vec::new(), Vec::new());
        let label = RowLabel {
            name: "llvm/MachSuite/aes".to_string(),
            extra: vec![],
        };
        for i in 0..3 {
            rows.write_metrics(&label, RunPosition::of(i, 3), &[]).unwrap();
        }
        let (_, metrics) = rows.finish().unwrap();
        assert_eq!(String::from_utf8(metrics).unwrap(), "\"llvm/MachSuite/aes\"\n");
    }
}
