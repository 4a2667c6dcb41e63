//! Benchmark suites and the per-suite hooks the sweep driver calls.
//!
//! Every suite shares the same on-disk layout:
//!
//! <suite>/reference/<target>/a.out   reference binary (built with -O3)
//! <suite>/jit/<target>/**/*.ll       IR handed to the JIT with `-i`
//!
//! and they only differ in the extra arguments a target needs at run time.

use crate::Result;
use crate::data::{self, ExtractError, Origin};
use crate::process::RunOutcome;

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use walkdir::WalkDir;

/// Columns always reserved for whole-JIT measurements.
pub const WHOLE_COLUMNS: usize = 2;

/// Name of the reference executable inside a target directory.
pub const REFERENCE_BINARY: &str = "a.out";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Suite {
    #[serde(rename = "chstone")]
    ChStone,
    #[serde(rename = "machsuite")]
    MachSuite,
    #[serde(rename = "tacle-bench")]
    TacleBench,
    #[serde(rename = "polybench")]
    PolyBench,
}

impl Suite {
    /// Name used in row labels and for `--suite`.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::ChStone => "CHStone",
            Self::MachSuite => "MachSuite",
            Self::TacleBench => "tacle-bench",
            Self::PolyBench => "polybench",
        }
    }
}

/// What the sweep driver needs to know about a suite.
///
/// `columns` arguments are the padded widths configured for the front-end
/// and back-end in use.
pub trait SuiteHooks {
    /// Argument vector prefix that runs the reference build of `target`.
    fn reference_command(&self, target: &Path) -> Vec<String> {
        vec![target.join(REFERENCE_BINARY).display().to_string()]
    }

    /// Input files for the JIT's `-i` flag, sorted.
    fn jit_files(&self, target: &Path) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(target) {
            let entry = entry.with_context(|| format!("list IR files in {}", target.display()))?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "ll")
            {
                files.push(entry.path().display().to_string());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Arguments the benchmark program itself expects.
    fn extra_arguments(&self, _target: &Path) -> Vec<String> {
        Vec::new()
    }

    fn extract_front_end(
        &self,
        run: &RunOutcome,
        columns: usize,
    ) -> std::result::Result<Vec<String>, ExtractError> {
        data::extract(&run.stdout, Origin::FrontEnd, columns)
    }

    fn extract_whole(&self, run: &RunOutcome) -> std::result::Result<Vec<String>, ExtractError> {
        data::extract(&run.stdout, Origin::Whole, WHOLE_COLUMNS)
    }

    fn extract_back_end(
        &self,
        run: &RunOutcome,
        columns: usize,
    ) -> std::result::Result<Vec<String>, ExtractError> {
        data::extract(&run.stdout, Origin::BackEnd, columns)
    }

    /// Reference binaries are not instrumented.
    fn extract_reference(&self, _run: &RunOutcome) -> std::result::Result<Vec<String>, ExtractError> {
        Ok(Vec::new())
    }

    /// Metrics row payload for a JIT run: front-end, whole, then back-end.
    fn extract_jit(
        &self,
        run: &RunOutcome,
        front_end_columns: usize,
        back_end_columns: usize,
    ) -> std::result::Result<Vec<String>, ExtractError> {
        let mut out = self.extract_front_end(run, front_end_columns)?;
        out.extend(self.extract_whole(run)?);
        out.extend(self.extract_back_end(run, back_end_columns)?);
        Ok(out)
    }
}

impl SuiteHooks for Suite {
    fn extra_arguments(&self, target: &Path) -> Vec<String> {
        match self {
            Self::MachSuite => vec![
                target.join("input.data").display().to_string(),
                target.join("check.data").display().to_string(),
            ],
            Self::ChStone | Self::TacleBench | Self::PolyBench => Vec::new(),
        }
    }
}
