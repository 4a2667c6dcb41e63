//! Configuration layer: manifest schema, suite registry, and the run plan
//! resolved from the command line.
//!
//! This module owns everything that is checked before the first benchmark is
//! launched; an invalid selection never starts a sweep.

pub mod manifest;
pub mod suite;

pub use manifest::{ArgSet, BackEnd, FrontEnd, Manifest, SuiteEntry, ValidatedManifest};
pub use suite::SuiteHooks;

use crate::Result;
use crate::sweep::Component;

use anyhow::bail;
use std::path::PathBuf;
use tracing::warn;

/// Command-line selection, before validation against the manifest.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub front_end: String,
    pub jit: Option<PathBuf>,
    pub back_end: Option<String>,
    pub reference: bool,
    pub suites: Vec<String>,
}

/// Everything a run needs, validated.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub component: Component,
    pub repeats: usize,
    pub front_end: FrontEnd,
    /// Set iff the JIT sweep runs.
    pub back_end: Option<BackEnd>,
    pub jit: Option<PathBuf>,
    pub suites: Vec<SuiteEntry>,
}

impl RunPlan {
    pub fn resolve(manifest: &ValidatedManifest, selection: &Selection) -> Result<Self> {
        let Some(front_end) = manifest.front_ends.get(&selection.front_end) else {
            bail!(
                "invalid front-end given: {} (known: {})",
                selection.front_end,
                known(manifest.front_ends.keys())
            );
        };

        let back_end = match (&selection.jit, &selection.back_end) {
            (Some(_), None) => bail!("a back-end (-b) is required when running the JIT"),
            (Some(_), Some(name)) => match manifest.back_ends.get(name) {
                Some(b) => Some(b.clone()),
                None => bail!(
                    "invalid back-end given: {} (known: {})",
                    name,
                    known(manifest.back_ends.keys())
                ),
            },
            (None, Some(name)) => {
                warn!(back_end = %name, "ignored the -b flag without -j");
                None
            }
            (None, None) => None,
        };

        let Some(component) = Component::from_flags(selection.jit.is_some(), selection.reference)
        else {
            bail!("nothing to run: pass -j <jit> and/or -e");
        };

        let suites = if selection.suites.is_empty() {
            front_end.suites.clone()
        } else {
            let mut picked = Vec::new();
            for name in &selection.suites {
                match front_end.suites.iter().find(|s| &s.name == name) {
                    Some(s) => picked.push(s.clone()),
                    None => bail!(
                        "front-end {} has no suite {} (known: {})",
                        front_end.name,
                        name,
                        known(front_end.suites.iter().map(|s| &s.name))
                    ),
                }
            }
            picked
        };

        Ok(RunPlan {
            component,
            repeats: manifest.repeats,
            front_end: front_end.clone(),
            back_end,
            jit: selection.jit.clone(),
            suites,
        })
    }
}

fn known<'a>(names: impl Iterator<Item = &'a String>) -> String {
    names.map(String::as_str).collect::<Vec<_>>().join(", ")
}
