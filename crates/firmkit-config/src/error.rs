//! Error types for description parsing and recipe expansion.

use std::path::PathBuf;

/// Errors that can occur while reading configuration trees.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A non-comment line without a `=` separator.
    #[error("{}:{line}: malformed line, expected `key=value`: {content}", path.display())]
    Parse {
        /// The description file being parsed.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// The offending line, trimmed.
        content: String,
    },

    /// Description file not found.
    #[error("description file not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// I/O error reading a description file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A recipe placeholder resolved to a nested node instead of a string.
    #[error("placeholder `{{{path}}}` resolves to a nested node, not a string")]
    NonScalarPlaceholder {
        /// The dotted path inside the braces.
        path: String,
    },

    /// Recipe expansion recursed past the depth limit, usually a cycle.
    #[error("placeholder `{{{placeholder}}}` expands too deeply (cyclic reference?)")]
    ExpansionTooDeep {
        /// The placeholder being expanded when the limit was hit.
        placeholder: String,
    },

    /// The distribution version string could not be understood.
    #[error("could not parse distribution version: {0:?}")]
    InvalidVersion(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
