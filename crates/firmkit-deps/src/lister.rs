//! Dependency-listing collaborators.
//!
//! The `DependencyLister` trait abstracts over whatever produces the header
//! listing for a directory. `CompilerDependencyLister` asks the cross
//! compiler for make-style dependency rules (`-MM`).

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{DepsError, Result};
use crate::library::{not_excluded, require_dir, walk};

/// Source file extensions fed to the compiler.
const SOURCE_EXTENSIONS: [&str; 5] = ["c", "cpp", "cc", "ino", "pde"];

/// Produces a text listing of every header included by a directory's sources.
pub trait DependencyLister {
    /// Write the listing for `dir` to `output`, searching `include_flags`.
    ///
    /// Must fail if the underlying tool exits unsuccessfully.
    fn list(&self, dir: &Path, include_flags: &[String], output: &Path) -> Result<()>;
}

/// Runs `<compiler> -MM` on every source file of a directory.
#[derive(Debug, Clone)]
pub struct CompilerDependencyLister {
    compiler: PathBuf,
    flags: Vec<String>,
}

impl CompilerDependencyLister {
    /// `flags` go before the include flags on every invocation (`-mmcu=...`,
    /// `-DF_CPU=...`).
    pub fn new(compiler: impl Into<PathBuf>, flags: Vec<String>) -> Self {
        CompilerDependencyLister {
            compiler: compiler.into(),
            flags,
        }
    }

    fn command_for(&self, source: &Path, include_flags: &[String]) -> Command {
        let mut cmd = Command::new(&self.compiler);
        cmd.args(&self.flags).args(include_flags).arg("-MM");
        let is_sketch = matches!(
            source.extension().and_then(|e| e.to_str()),
            Some("ino") | Some("pde")
        );
        if is_sketch {
            cmd.args(["-x", "c++"]);
        }
        cmd.arg(source);
        cmd
    }
}

impl DependencyLister for CompilerDependencyLister {
    fn list(&self, dir: &Path, include_flags: &[String], output: &Path) -> Result<()> {
        let sources = source_files(dir)?;
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut listing = File::create(output)?;

        for source in sources {
            let result = self
                .command_for(&source, include_flags)
                .output()
                .map_err(|e| DepsError::ToolNotFound {
                    tool: self.compiler.clone(),
                    detail: e.to_string(),
                })?;
            if !result.status.success() {
                log::error!(
                    "{}",
                    String::from_utf8_lossy(&result.stderr).trim_end()
                );
                return Err(DepsError::ListingFailed {
                    dir: dir.to_path_buf(),
                    code: result.status.code(),
                });
            }
            listing.write_all(&result.stdout)?;
        }
        Ok(())
    }
}

/// Every source file under `dir`, recursively, skipping `examples`.
/// Fails if `dir` is missing or cannot be read.
pub fn source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    require_dir(dir)?;
    let mut files = Vec::new();
    for entry in walk(dir).into_iter().filter_entry(not_excluded) {
        let entry = entry?;
        let is_source = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e));
        if entry.file_type().is_file() && is_source {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
