//! Error kinds raised while collecting package state.
//!
//! Every variant aborts the current collection cycle only; the next scrape
//! starts from scratch.

use thiserror::Error;

/// Failure of one collection step.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The executable could not be started (missing binary, permission denied).
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran but exited with a status its call site does not accept.
    #[error("`{command}` exited with {status}: {stderr}", status = describe_code(.code))]
    UnexpectedExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// A line that should hold a package record does not.
    #[error("malformed line: {reason}: {line:?}")]
    Parse { line: String, reason: &'static str },

    /// Neither supported package manager could be run.
    #[error("neither apt nor yum package manager found: {0}")]
    NoPackageManager(String),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

pub type Result<T, E = CollectError> = std::result::Result<T, E>;
