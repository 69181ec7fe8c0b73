//! `firmkit clean`: drop every per-board build directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub fn run(output_dir: &Path) -> Result<()> {
    if remove_output(output_dir)? {
        log::info!("deleted build output in {}", output_dir.display());
    } else {
        log::info!("no build output in {}", output_dir.display());
    }
    Ok(())
}

/// Delete `output_dir` with every build directory and snapshot below it.
/// Returns `false` when there was nothing to delete.
fn remove_output(output_dir: &Path) -> Result<bool> {
    if !output_dir.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(output_dir)
        .with_context(|| format!("deleting build output {}", output_dir.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_and_listings_are_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join(".build");
        let board = out.join("uno-67f83100");
        fs::create_dir_all(board.join("src")).unwrap();
        fs::write(board.join("environment.json"), b"{}").unwrap();
        fs::write(board.join("src/dependencies.d"), b"").unwrap();

        assert!(remove_output(&out).unwrap());
        assert!(!out.exists());
        assert!(dir.path().exists());
    }

    #[test]
    fn missing_output_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!remove_output(&dir.path().join(".build")).unwrap());
        run(&dir.path().join(".build")).unwrap();
    }
}
