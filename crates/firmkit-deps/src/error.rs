//! Dependency scanning error types.

use std::path::PathBuf;

/// Errors that can occur while scanning or resolving library dependencies.
#[derive(Debug, thiserror::Error)]
pub enum DepsError {
    /// The dependency-listing process exited unsuccessfully.
    #[error("dependency listing for {} failed with {}", dir.display(), exit_status(code))]
    ListingFailed {
        /// Directory whose sources were being listed.
        dir: PathBuf,
        /// Exit code, `None` if the process was killed by a signal.
        code: Option<i32>,
    },

    /// The listing tool could not be started.
    #[error("cannot run {}: {detail}", tool.display())]
    ToolNotFound { tool: PathBuf, detail: String },

    /// A directory that must be scanned does not exist.
    #[error("{} is not a directory", path.display())]
    MissingDir { path: PathBuf },

    /// Walking a directory tree failed part way.
    #[error("cannot walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// A library path could not be turned into a match pattern.
    #[error("invalid library pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Result type alias for dependency operations.
pub type Result<T> = std::result::Result<T, DepsError>;
