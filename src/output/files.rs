//! CSV file layout and accumulation across suites.
//!
//! Each suite directory gets its own four files. After a suite finishes, its
//! files are appended to the same-named files in the benchmark root, and at
//! the end of a run the root files are persisted into `<root>/data/` under a
//! timestamped name.

use crate::Result;
use crate::sweep::Component;

use anyhow::Context;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

pub const TIME_DATA_REFERENCE: &str = "time_data_reference.csv";
pub const OTHER_DATA_REFERENCE: &str = "other_data_reference.csv";
pub const TIME_DATA_JIT: &str = "time_data_jit.csv";
pub const OTHER_DATA_JIT: &str = "other_data_jit.csv";

/// Directory (under the root) that persisted results land in.
pub const DATA_DIR: &str = "data";

/// Timing and metrics file of one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFiles {
    pub timing: PathBuf,
    pub metrics: PathBuf,
}

impl DataFiles {
    pub fn reference(dir: &Path) -> Self {
        Self {
            timing: dir.join(TIME_DATA_REFERENCE),
            metrics: dir.join(OTHER_DATA_REFERENCE),
        }
    }

    pub fn jit(dir: &Path) -> Self {
        Self {
            timing: dir.join(TIME_DATA_JIT),
            metrics: dir.join(OTHER_DATA_JIT),
        }
    }

    /// Files written by `component`, reference first.
    pub fn for_component(dir: &Path, component: Component) -> Vec<Self> {
        let mut out = Vec::new();
        if component.for_reference() {
            out.push(Self::reference(dir));
        }
        if component.for_jit() {
            out.push(Self::jit(dir));
        }
        out
    }

    fn paths(&self) -> [&Path; 2] {
        [self.timing.as_path(), self.metrics.as_path()]
    }
}

/// Remove all four data files in `dir`; missing files are fine.
pub fn remove_data_files(dir: &Path) -> Result<()> {
    for files in [DataFiles::reference(dir), DataFiles::jit(dir)] {
        for path in files.paths() {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(err).with_context(|| format!("remove {}", path.display()));
                }
            }
        }
    }
    Ok(())
}

/// Append the whole content of `source` to `target` (created if needed).
pub fn append_file(source: &Path, target: &Path) -> Result<()> {
    let mut input =
        File::open(source).with_context(|| format!("open {}", source.display()))?;
    let mut output = OpenOptions::new()
        .create(true)
        .append(true)
        .open(target)
        .with_context(|| format!("open {} for appending", target.display()))?;
    io::copy(&mut input, &mut output)
        .with_context(|| format!("append {} to {}", source.display(), target.display()))?;
    Ok(())
}

/// Root-level accumulation of suite results.
#[derive(Debug, Clone)]
pub struct Accumulator {
    root: PathBuf,
}

impl Accumulator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Drop whatever a previous run left in the root.
    pub fn reset(&self) -> Result<()> {
        remove_data_files(&self.root)
    }

    /// Append a finished suite's files to the root files.
    pub fn collect(&self, suite_dir: &Path, component: Component) -> Result<()> {
        let sources = DataFiles::for_component(suite_dir, component);
        let targets = DataFiles::for_component(&self.root, component);
        for (source, target) in sources.iter().zip(&targets) {
            for (from, to) in source.paths().into_iter().zip(target.paths()) {
                append_file(from, to)?;
            }
        }
        Ok(())
    }

    /// Move the root files into `data/` as
    /// `<stamp>.<front_end>[.<back_end>].<file name>`.
    pub fn persist(
        &self,
        component: Component,
        front_end: &str,
        back_end: Option<&str>,
        stamp: &str,
    ) -> Result<Vec<PathBuf>> {
        let data_dir = self.root.join(DATA_DIR);
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("create {}", data_dir.display()))?;

        let mut persisted = Vec::new();
        for files in DataFiles::for_component(&self.root, component) {
            for path in files.paths() {
                let Some(file_name) = path.file_name() else {
                    continue;
                };
                let mut name = format!("{}.{}", stamp, front_end);
                if let Some(back_end) = back_end {
                    name.push('.');
                    name.push_str(back_end);
                }
                name.push('.');
                name.push_str(&file_name.to_string_lossy());

                let target = data_dir.join(name);
                append_file(path, &target)?;
                fs::remove_file(path).with_context(|| format!("remove {}", path.display()))?;
                info!(file = %target.display(), "persisted");
                persisted.push(target);
            }
        }
        Ok(persisted)
    }
}
