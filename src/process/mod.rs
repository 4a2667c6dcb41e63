//! Timed, blocking execution of one benchmark subprocess.

pub mod timer;

pub use timer::{ELAPSED_SENTINEL, Timer, TimingMode};

use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use tracing::{debug, warn};

/// Exit code recorded when the child never produced one.
pub const NO_EXIT_CODE: i32 = -1;

/// Result of one physical launch.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Seconds, or [`ELAPSED_SENTINEL`].
    pub elapsed: f64,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutcome {
    fn failed_launch() -> Self {
        Self {
            elapsed: ELAPSED_SENTINEL,
            exit_code: NO_EXIT_CODE,
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Run `argv` to completion, capturing stdout/stderr.
///
/// Never fails: a launch error (missing binary, no permission) is recorded as
/// a run with exit code [`NO_EXIT_CODE`], and a non-zero exit is just data.
pub fn run_timed(argv: &[String], timer: &Timer) -> RunOutcome {
    let Some(mut cmd) = timer.command(argv) else {
        warn!("refusing to launch an empty command");
        return RunOutcome::failed_launch();
    };
    debug!(command = %argv.join(" "), mode = ?timer.mode(), "launching");

    let started = Instant::now();
    let output = match cmd.stdin(Stdio::null()).output() {
        Ok(output) => output,
        Err(err) => {
            warn!(program = %argv[0], error = %err, "launch failed");
            return RunOutcome::failed_launch();
        }
    };
    let measured = started.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let elapsed = timer.elapsed(measured, &stderr);
    if elapsed == ELAPSED_SENTINEL {
        warn!(program = %argv[0], "could not read elapsed time from timer output");
    }

    RunOutcome {
        elapsed,
        exit_code: exit_code(&output.status),
        stdout,
        stderr,
    }
}

/// Exit code, or the negated signal number for a child killed by a signal.
fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    NO_EXIT_CODE
}
