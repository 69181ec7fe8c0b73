//! Environment error types.

use std::path::PathBuf;

/// Errors that can occur while discovering or loading build state.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    /// A required file, tool or directory was not found anywhere.
    #[error("{what} not found. Searched in following places:{}", format_places(searched))]
    NotFound {
        /// Human-readable name of what was searched for.
        what: String,
        /// Every location that was probed.
        searched: Vec<PathBuf>,
    },

    /// The requested board model is not in the catalogue.
    #[error("{model} is not a valid board model. Supported board models are:\n{available}")]
    UnknownBoard { model: String, available: String },

    /// No platform definition exists for an architecture.
    #[error("no platform definition for architecture '{arch}'")]
    UnknownPlatform { arch: String },

    /// A board definition lacks a key the build needs.
    #[error("board '{model}' has no '{key}' setting")]
    MissingBoardKey { model: String, key: String },

    /// A discovery step that should have run first has not.
    #[error("'{key}' has not been discovered yet")]
    Undiscovered { key: String },

    /// Writing the snapshot failed.
    #[error("snapshot error at {}: {detail}", path.display())]
    Snapshot { path: PathBuf, detail: String },

    /// Description parsing or recipe expansion failed.
    #[error(transparent)]
    Config(#[from] firmkit_config::ConfigError),

    /// Dependency scanning failed.
    #[error(transparent)]
    Deps(#[from] firmkit_deps::DepsError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_places(places: &[PathBuf]) -> String {
    places
        .iter()
        .map(|p| format!("\n  - {}", p.display()))
        .collect()
}

/// Result type for environment operations.
pub type Result<T> = std::result::Result<T, EnvError>;
