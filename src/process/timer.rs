//! Wall-clock timing sources for benchmark launches.

use crate::Result;
use regex::Regex;
use serde::Deserialize;
use std::process::Command;
use std::time::Duration;

/// Elapsed value recorded when no time could be measured.
pub const ELAPSED_SENTINEL: f64 = -1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingMode {
    /// Measure around the child in-process.
    #[default]
    Wall,
    /// Run under bash's `time` keyword and read `real` from stderr.
    Shell,
}

/// Builds the command for one launch and turns its result into seconds.
#[derive(Debug, Clone)]
pub struct Timer {
    mode: TimingMode,
    real_re: Regex,
}

impl Timer {
    pub fn new(mode: TimingMode) -> Result<Self> {
        // bash prints e.g. "real\t0m1.204s"; some locales use a decimal comma.
        let real_re = Regex::new(r#"real\s*(\d+)m(\d+(?:[.,]\d+)?)s"#)?;
        Ok(Self { mode, real_re })
    }

    pub fn mode(&self) -> TimingMode {
        self.mode
    }

    /// Command for `argv`; `None` if `argv` is empty.
    pub fn command(&self, argv: &[String]) -> Option<Command> {
        let (program, args) = argv.split_first()?;
        let cmd = match self.mode {
            TimingMode::Wall => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
            TimingMode::Shell => {
                // Positional parameters avoid any quoting of the argv.
                let mut cmd = Command::new("bash");
                cmd.arg("-c").arg(r#"time "$@""#).arg("bash").args(argv);
                cmd
            }
        };
        Some(cmd)
    }

    /// Seconds for a finished launch, or [`ELAPSED_SENTINEL`] when the shell
    /// timer output cannot be parsed.
    pub fn elapsed(&self, measured: Duration, stderr: &str) -> f64 {
        match self.mode {
            TimingMode::Wall => measured.as_secs_f64(),
            TimingMode::Shell => self.parse_real(stderr).unwrap_or(ELAPSED_SENTINEL),
        }
    }

    /// Parse the last `realXmY.Zs` entry of a `time` report into seconds.
    pub fn parse_real(&self, stderr: &str) -> Option<f64> {
        let caps = self.real_re.captures_iter(stderr).last()?;
        let minutes: f64 = caps.get(1)?.as_str().parse().ok()?;
        let seconds: f64 = caps.get(2)?.as_str().replace(',', ".").parse().ok()?;
        Some(minutes * 60.0 + seconds)
    }
}
