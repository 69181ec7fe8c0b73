//! Library identifiers and include-path generation.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::{DirEntry, WalkDir};

use crate::error::{DepsError, Result};

/// Subdirectories never added to include paths.
const EXCLUDED_SUBDIRS: [&str; 1] = ["examples"];

/// How deep below a library directory include paths reach.
const INCLUDE_DEPTH: usize = 2;

/// A library, identified by its directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Library {
    path: PathBuf,
}

impl Library {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Library { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory name of the library (`Servo` for `.../libraries/Servo`).
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// The library directory plus its subdirectories, for `-I` flags.
    pub fn include_dirs(&self) -> Result<Vec<PathBuf>> {
        include_dirs(&self.path)
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl From<PathBuf> for Library {
    fn from(path: PathBuf) -> Self {
        Library::new(path)
    }
}

/// Immediate subdirectories of `dir`, sorted. A missing directory has none;
/// any other read failure is an error.
pub fn list_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut subdirs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            subdirs.push(path);
        }
    }
    subdirs.sort();
    Ok(subdirs)
}

/// `dir` followed by every directory up to two levels beneath it, skipping
/// `examples` trees.
pub fn include_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    require_dir(dir)?;
    let mut dirs = vec![dir.to_path_buf()];
    for entry in walk(dir).max_depth(INCLUDE_DEPTH).into_iter().filter_entry(not_excluded) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

/// `-I` flags covering every library and its subdirectories.
pub fn include_flags<'a>(libs: impl IntoIterator<Item = &'a Library>) -> Result<Vec<String>> {
    let mut flags = Vec::new();
    for lib in libs {
        flags.extend(lib.include_dirs()?.iter().map(|dir| format!("-I{}", dir.display())));
    }
    Ok(flags)
}

pub(crate) fn require_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(DepsError::MissingDir { path: dir.to_path_buf() })
    }
}

/// Sorted walk below `dir`, not including `dir` itself.
pub(crate) fn walk(dir: &Path) -> WalkDir {
    WalkDir::new(dir).min_depth(1).follow_links(true).sort_by_file_name()
}

/// Prunes `examples` trees anywhere below the walk root.
pub(crate) fn not_excluded(entry: &DirEntry) -> bool {
    entry.depth() == 0
        || !entry
            .file_name()
            .to_str()
            .is_some_and(|name| EXCLUDED_SUBDIRS.contains(&name))
}
