//! Benchmark manifest (bench.json): suites per front-end, argument sets per
//! back-end, and run settings.
//!
//! JSON shape:
//! {
//!   "repeats": 5,
//!   "timer": "wall",                       // or "shell"
//!   "front_ends": [
//!     {
//!       "name": "llvm",
//!       "prefix": "llvm",                  // row label prefix, defaults to name
//!       "columns": 1,                      // padded front-end metric columns
//!       "args": [{ "name": "None", "args": "" }],
//!       "suites": [{ "suite": "chstone", "path": "llvm/CHStone" }]
//!     }
//!   ],
//!   "back_ends": [
//!     {
//!       "name": "recomp",
//!       "columns": 5,
//!       "args": [{ "name": "O1-O2", "args": "-opt=... -reopt=..." }]
//!     }
//!   ]
//! }
//!
//! Suite paths are relative to the benchmark root.

use crate::Result;
use crate::config::suite::Suite;
use crate::process::TimingMode;

use anyhow::{Context, bail};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_REPEATS: usize = 5;
const DEFAULT_FRONT_END_COLUMNS: usize = 1;
const DEFAULT_BACK_END_COLUMNS: usize = 5;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub repeats: Option<usize>,

    #[serde(default)]
    pub timer: TimingMode,

    #[serde(default)]
    pub front_ends: Vec<RawFrontEnd>,

    #[serde(default)]
    pub back_ends: Vec<RawBackEnd>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFrontEnd {
    pub name: String,

    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub columns: Option<usize>,

    #[serde(default)]
    pub args: Vec<ArgSet>,

    #[serde(default)]
    pub suites: Vec<RawSuite>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSuite {
    pub suite: Suite,

    /// Overrides the suite's display name (lets one suite appear twice).
    #[serde(default)]
    pub name: Option<String>,

    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawBackEnd {
    pub name: String,

    #[serde(default)]
    pub columns: Option<usize>,

    #[serde(default)]
    pub args: Vec<ArgSet>,
}

/// A named flag string for one compilation phase.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArgSet {
    pub name: String,

    #[serde(default)]
    pub args: String,
}

#[cfg(test)]
impl ArgSet {
    pub fn new(name: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: args.into(),
        }
    }
}

/// Validated suite entry.
#[derive(Debug, Clone)]
pub struct SuiteEntry {
    pub name: String,
    pub suite: Suite,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FrontEnd {
    pub name: String,
    pub prefix: String,
    pub columns: usize,
    pub args: Vec<ArgSet>,
    pub suites: Vec<SuiteEntry>,
}

#[derive(Debug, Clone)]
pub struct BackEnd {
    pub name: String,
    pub columns: usize,
    pub args: Vec<ArgSet>,
}

#[derive(Debug, Clone)]
pub struct ValidatedManifest {
    pub repeats: usize,
    pub timer: TimingMode,
    pub front_ends: BTreeMap<String, FrontEnd>,
    pub back_ends: BTreeMap<String, BackEnd>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read manifest {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse manifest {}", path.display()))
    }

    /// Check names, counts and paths, and fill in defaults.
    pub fn validate_and_build(&self) -> Result<ValidatedManifest> {
        let repeats = self.repeats.unwrap_or(DEFAULT_REPEATS);
        if repeats == 0 {
            bail!("repeats must be at least 1");
        }

        let mut front_ends = BTreeMap::new();
        for raw in &self.front_ends {
            if front_ends.contains_key(&raw.name) {
                bail!("duplicate front-end in manifest: {}", raw.name);
            }
            let front_end = build_front_end(raw)?;
            front_ends.insert(raw.name.clone(), front_end);
        }

        let mut back_ends = BTreeMap::new();
        for raw in &self.back_ends {
            if back_ends.contains_key(&raw.name) {
                bail!("duplicate back-end in manifest: {}", raw.name);
            }
            check_arg_sets("back-end", &raw.name, &raw.args)?;
            back_ends.insert(
                raw.name.clone(),
                BackEnd {
                    name: raw.name.clone(),
                    columns: raw.columns.unwrap_or(DEFAULT_BACK_END_COLUMNS),
                    args: raw.args.clone(),
                },
            );
        }

        if front_ends.is_empty() {
            bail!("manifest contained no front-ends");
        }

        Ok(ValidatedManifest {
            repeats,
            timer: self.timer,
            front_ends,
            back_ends,
        })
    }
}

fn build_front_end(raw: &RawFrontEnd) -> Result<FrontEnd> {
    let prefix = raw.prefix.clone().unwrap_or_else(|| raw.name.clone());
    if prefix.is_empty() {
        bail!("front-end {} has an empty prefix", raw.name);
    }
    check_arg_sets("front-end", &raw.name, &raw.args)?;

    let mut seen = BTreeSet::new();
    let mut suites = Vec::new();
    for s in &raw.suites {
        let name = s
            .name
            .clone()
            .unwrap_or_else(|| s.suite.display_name().to_string());
        if !seen.insert(name.clone()) {
            bail!("front-end {} lists suite {} twice", raw.name, name);
        }
        if s.path.is_absolute() {
            bail!(
                "suite {} path must be relative to the benchmark root: {}",
                name,
                s.path.display()
            );
        }
        suites.push(SuiteEntry {
            name,
            suite: s.suite,
            path: s.path.clone(),
        });
    }
    if suites.is_empty() {
        bail!("front-end {} has no suites", raw.name);
    }

    Ok(FrontEnd {
        name: raw.name.clone(),
        prefix,
        columns: raw.columns.unwrap_or(DEFAULT_FRONT_END_COLUMNS),
        args: raw.args.clone(),
        suites,
    })
}

fn check_arg_sets(what: &str, owner: &str, args: &[ArgSet]) -> Result<()> {
    if args.is_empty() {
        bail!("{} {} has no argument sets", what, owner);
    }
    let mut seen = BTreeSet::new();
    for a in args {
        if !seen.insert(a.name.as_str()) {
            bail!("{} {} defines argument set {} twice", what, owner, a.name);
        }
    }
    Ok(())
}
