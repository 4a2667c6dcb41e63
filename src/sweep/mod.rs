//! Sweep driver: runs every target of one suite, `repeats` times per
//! argument-set combination, and feeds each run to the row assembler.
//!
//! Per suite: INIT -> (reference sweep)? -> (JIT sweep)? -> done.
//! Runs are strictly sequential; wall-clock comparisons are only meaningful
//! with one measurement at a time.

use crate::Result;
use crate::config::{ArgSet, SuiteHooks};
use crate::data::ExtractError;
use crate::output::{DataFiles, RowAssembler, RowLabel, RunPosition, remove_data_files};
use crate::process::{self, RunOutcome, Timer};

use anyhow::{Context, bail};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Subdirectory of a suite holding one directory per reference target.
pub const REFERENCE_DIR: &str = "reference";
/// Subdirectory of a suite holding one directory per JIT target.
pub const JIT_DIR: &str = "jit";

/// Which implementations a run measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Both,
    Jit,
    Reference,
}

impl Component {
    /// `None` when neither side is selected.
    pub fn from_flags(jit: bool, reference: bool) -> Option<Self> {
        match (jit, reference) {
            (true, true) => Some(Self::Both),
            (true, false) => Some(Self::Jit),
            (false, true) => Some(Self::Reference),
            (false, false) => None,
        }
    }

    pub fn for_reference(self) -> bool {
        matches!(self, Self::Reference | Self::Both)
    }

    pub fn for_jit(self) -> bool {
        matches!(self, Self::Jit | Self::Both)
    }
}

/// JIT binary and the argument sets it is swept over.
#[derive(Debug, Clone)]
pub struct JitSweep<'a> {
    pub binary: &'a Path,
    pub front_end_args: &'a [ArgSet],
    pub back_end_args: &'a [ArgSet],
    pub front_end_columns: usize,
    pub back_end_columns: usize,
}

pub struct SweepDriver<'a, H: SuiteHooks> {
    pub hooks: &'a H,
    pub suite_dir: &'a Path,
    /// Row label prefix, e.g. `llvm/CHStone`.
    pub prefix: &'a str,
    pub repeats: usize,
    pub timer: &'a Timer,
    pub jit: Option<JitSweep<'a>>,
}

impl<H: SuiteHooks> SweepDriver<'_, H> {
    /// Run the selected sweeps for this suite. The suite's CSV files are
    /// recreated; a reduction error aborts with whatever was already written
    /// left on disk.
    pub fn run(&self, component: Component) -> Result<()> {
        remove_data_files(self.suite_dir)?;

        if component.for_reference() {
            self.reference_sweep()?;
        }
        if component.for_jit() {
            let Some(jit) = &self.jit else {
                bail!("JIT sweep selected without a JIT binary");
            };
            self.jit_sweep(jit)?;
        }
        Ok(())
    }

    fn reference_sweep(&self) -> Result<()> {
        let files = DataFiles::reference(self.suite_dir);
        let mut rows = RowAssembler::create(&files.timing, &files.metrics)?;

        for (target, dir) in list_targets(&self.suite_dir.join(REFERENCE_DIR))? {
            info!(target = %target, "started running reference");
            let mut argv = self.hooks.reference_command(&dir);
            argv.extend(self.hooks.extra_arguments(&dir));

            let label = RowLabel {
                name: self.display_name(&target),
                extra: Vec::new(),
            };
            self.run_repeats(&argv, &label, &mut rows, |run| {
                self.hooks.extract_reference(run)
            })?;
            info!(target = %target, "finished running reference");
        }
        rows.finish()?;
        Ok(())
    }

    fn jit_sweep(&self, jit: &JitSweep<'_>) -> Result<()> {
        let files = DataFiles::jit(self.suite_dir);
        let mut rows = RowAssembler::create(&files.timing, &files.metrics)?;

        for (target, dir) in list_targets(&self.suite_dir.join(JIT_DIR))? {
            info!(target = %target, "started running jit");
            let sources = self.hooks.jit_files(&dir)?;
            let mut app_args = vec![target.clone()];
            app_args.extend(self.hooks.extra_arguments(&dir));
            app_args.retain(|a| !a.is_empty());

            for f in jit.front_end_args {
                info!(front_end = %f.name, "started running front-end args");
                for b in jit.back_end_args {
                    info!(back_end = %b.name, "started running back-end args");
                    let argv = jit_command(jit.binary, &sources, &app_args, f, b);
                    let label = RowLabel {
                        name: format!("{} {}", self.display_name(&target), b.name),
                        extra: vec![
                            format!("front-end {}:{}", f.name, f.args),
                            format!("back-end {}:{}", b.name, b.args),
                        ],
                    };
                    self.run_repeats(&argv, &label, &mut rows, |run| {
                        self.hooks
                            .extract_jit(run, jit.front_end_columns, jit.back_end_columns)
                    })?;
                    info!(back_end = %b.name, "finished running back-end args");
                }
                info!(front_end = %f.name, "finished running front-end args");
            }
            info!(target = %target, "finished running jit");
        }
        rows.finish()?;
        Ok(())
    }

    /// One logical execution: `repeats` launches on one CSV line per stream.
    /// Timing is written before extraction so it survives a fatal reduction
    /// error.
    fn run_repeats<F>(
        &self,
        argv: &[String],
        label: &RowLabel,
        rows: &mut RowAssembler<File>,
        extract: F,
    ) -> Result<()>
    where
        F: Fn(&RunOutcome) -> std::result::Result<Vec<String>, ExtractError>,
    {
        for index in 0..self.repeats {
            let position = RunPosition::of(index, self.repeats);
            let run = process::run_timed(argv, self.timer);
            if run.exit_code != 0 {
                warn!(
                    name = %label.name,
                    run = index + 1,
                    exit_code = run.exit_code,
                    "benchmark exited with non-zero status"
                );
                debug!(name = %label.name, stderr = %run.stderr.trim_end(), "benchmark stderr");
            }

            rows.write_timing(label, position, run.elapsed, run.exit_code)?;
            let columns = extract(&run).with_context(|| {
                format!(
                    "extract data for {} (run {} of {})",
                    label.name,
                    index + 1,
                    self.repeats
                )
            })?;
            rows.write_metrics(label, position, &columns)?;
        }
        Ok(())
    }

    fn display_name(&self, target: &str) -> String {
        if self.prefix.ends_with('/') {
            format!("{}{}", self.prefix, target)
        } else {
            format!("{}/{}", self.prefix, target)
        }
    }
}

/// `jit -i <files> -a <app args> [-b <back-end>] [-r <front-end>]`
pub fn jit_command(
    binary: &Path,
    sources: &[String],
    app_args: &[String],
    front_end: &ArgSet,
    back_end: &ArgSet,
) -> Vec<String> {
    let mut argv = vec![
        binary.display().to_string(),
        "-i".to_string(),
        sources.join(","),
        "-a".to_string(),
        app_args.join(" "),
    ];
    if !back_end.args.is_empty() {
        argv.push("-b".to_string());
        argv.push(back_end.args.clone());
    }
    if !front_end.args.is_empty() {
        argv.push("-r".to_string());
        argv.push(front_end.args.clone());
    }
    argv
}

/// Target directories directly under `dir`, sorted by name.
fn list_targets(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut targets = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("list targets in {}", dir.display()))? {
        let entry = entry.with_context(|| format!("list targets in {}", dir.display()))?;
        if entry.file_type()?.is_dir() {
            targets.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    targets.sort();
    Ok(targets)
}
