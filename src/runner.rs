//! External command invocation.
//!
//! Commands are spawned directly (no shell) with a fixed argument list,
//! stdin closed, and stdout/stderr captured. Whether a non-zero exit status
//! is acceptable is decided per call site through an [`ExitPolicy`].

use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::{CollectError, Result};

/// Maximum number of stderr characters carried into an error.
const STDERR_EXCERPT_CHARS: usize = 512;

/// An executable plus its hardcoded arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: &'static [&'static str],
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, args: &'static [&'static str]) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Which exit statuses count as a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Only status 0.
    Success,
    /// Status 0 or one of the listed codes (e.g. `yum check-update` uses 100
    /// to report that updates are available).
    AcceptCodes(&'static [i32]),
    /// Any status; the caller interprets the code itself.
    Any,
}

impl ExitPolicy {
    pub fn accepts(&self, code: Option<i32>) -> bool {
        match self {
            ExitPolicy::Success => code == Some(0),
            ExitPolicy::AcceptCodes(codes) => {
                code == Some(0) || code.is_some_and(|c| codes.contains(&c))
            }
            ExitPolicy::Any => true,
        }
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs one external command to completion.
///
/// Implementations must only fail on launch errors; exit status handling is
/// left to [`run_checked`].
pub trait CommandRunner: Send + Sync {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Spawns real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!("Running {}", spec);
        let output = Command::new(&spec.program)
            .args(spec.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| CollectError::Launch {
                command: spec.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        })
    }
}

/// Runs `spec` and turns statuses rejected by `policy` into
/// [`CollectError::UnexpectedExit`].
pub fn run_checked(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
    policy: ExitPolicy,
) -> Result<CommandOutput> {
    let output = runner.run(spec)?;
    debug!(
        "{} exited with {:?} ({} bytes of output)",
        spec,
        output.code,
        output.stdout.len()
    );

    if !policy.accepts(output.code) {
        return Err(CollectError::UnexpectedExit {
            command: spec.to_string(),
            code: output.code,
            stderr: output
                .stderr
                .trim()
                .chars()
                .take(STDERR_EXCERPT_CHARS)
                .collect(),
        });
    }
    Ok(output)
}
