//! `firmkit.toml` manifest parsing and project configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use firmkit_env::EnvironmentSettings;
use serde::{Deserialize, Serialize};

/// Manifest file name, looked up from the working directory upward.
pub const MANIFEST_FILE: &str = "firmkit.toml";

/// The top-level manifest structure for a firmkit project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirmkitManifest {
    pub project: ProjectConfig,
    #[serde(default)]
    pub board: Option<BoardConfig>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub search: Option<SearchConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Board model used when `-m` is not given.
    #[serde(default)]
    pub default: Option<String>,
}

/// Project layout. Relative paths are taken from the manifest's directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Distribution directory; probed from the usual places when unset.
    #[serde(default)]
    pub dist: Option<PathBuf>,
    #[serde(default)]
    pub src: Option<PathBuf>,
    #[serde(default)]
    pub lib: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Replaces the built-in distribution guesses.
    #[serde(default, rename = "dist-guesses")]
    pub dist_guesses: Vec<PathBuf>,
}

impl FirmkitManifest {
    /// Search upward from `start_dir` for a `firmkit.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: FirmkitManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                log::debug!("using manifest {}", candidate.display());
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing firmkit.toml")
    }

    pub fn default_board_model(&self) -> Option<&str> {
        self.board.as_ref().and_then(|b| b.default.as_deref())
    }
}

/// Settings for a project rooted at `project_dir`. `dist` from the command
/// line wins over the manifest.
pub fn environment_settings(
    project_dir: &Path,
    manifest: Option<&FirmkitManifest>,
    dist: Option<&Path>,
) -> EnvironmentSettings {
    let mut settings = EnvironmentSettings {
        output_dir: project_dir.join(".build"),
        src_dir: project_dir.join("src"),
        lib_dir: project_dir.join("lib"),
        ..Default::default()
    };

    if let Some(manifest) = manifest {
        let paths = &manifest.paths;
        if let Some(output) = &paths.output {
            settings.output_dir = project_dir.join(output);
        }
        if let Some(src) = &paths.src {
            settings.src_dir = project_dir.join(src);
        }
        if let Some(lib) = &paths.lib {
            settings.lib_dir = project_dir.join(lib);
        }
        settings.dist_dir = paths.dist.as_ref().map(|d| project_dir.join(d));
        if let Some(model) = manifest.default_board_model() {
            settings.default_board_model = model.to_string();
        }
        if let Some(search) = &manifest.search {
            settings.dist_guesses = search.dist_guesses.clone();
        }
    }

    if let Some(dist) = dist {
        settings.dist_dir = Some(dist.to_path_buf());
    }
    settings
}
