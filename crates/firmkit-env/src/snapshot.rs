//! Persisting the environment between runs.
//!
//! The snapshot lives at `<build dir>/environment.json` and holds every
//! persisted field of [`Environment`]. Settings are never written; they come
//! from the command line each time.

use std::path::PathBuf;

use crate::environment::Environment;
use crate::error::{EnvError, Result};

/// File name of the snapshot inside the build directory.
pub const SNAPSHOT_FILE: &str = "environment.json";

impl Environment {
    pub fn snapshot_path(&self) -> Result<PathBuf> {
        Ok(self.build_dir()?.join(SNAPSHOT_FILE))
    }

    /// Write the snapshot. Does nothing and returns `false` when the output
    /// directory does not exist, so a bare `list-models` leaves no trace.
    pub fn dump(&self) -> Result<bool> {
        if !self.settings.output_dir.is_dir() {
            return Ok(false);
        }
        let path = self.snapshot_path()?;
        let snapshot_error = |detail: String| EnvError::Snapshot {
            path: path.clone(),
            detail,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| snapshot_error(format!("creating build dir: {e}")))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| snapshot_error(format!("writing snapshot: {e}")))?;
        log::debug!("environment saved to {}", path.display());
        Ok(true)
    }

    /// Replace the persisted state with the snapshot for the current build
    /// directory. Returns whether a snapshot was loaded.
    ///
    /// An unreadable or corrupt snapshot is ignored with a warning and the
    /// environment is left as it was.
    pub fn restore(&mut self) -> Result<bool> {
        let path = self.snapshot_path()?;
        if !path.is_file() {
            return Ok(false);
        }

        let loaded = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str::<Environment>(&s).map_err(|e| e.to_string()));
        match loaded {
            Ok(mut restored) => {
                restored.settings = std::mem::take(&mut self.settings);
                *self = restored;
                log::debug!("environment restored from {}", path.display());
                Ok(true)
            }
            Err(detail) => {
                log::warn!("ignoring snapshot {}: {detail}", path.display());
                Ok(false)
            }
        }
    }
}
