//! Description-file parsing.
//!
//! Distribution description files (`boards.txt`, `platform.txt`) hold one
//! `dotted.key=value` entry per line. Blank lines and lines starting with `#`
//! are skipped. Keys are split on `.` and folded into a [`ConfigNode`].

use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::node::ConfigNode;

/// Load and parse a description file.
pub fn parse_description(path: &Path) -> Result<ConfigNode> {
    let content = read_description(path)?;
    parse_description_str(&content, path)
}

/// Parse description text. `origin` is only used in error messages.
pub fn parse_description_str(content: &str, origin: &Path) -> Result<ConfigNode> {
    let mut tree = ConfigNode::new();
    for_each_entry(content, origin, |key, value| {
        tree.set_path(&key, value);
    })?;
    Ok(tree)
}

/// Read a description file into memory.
pub(crate) fn read_description(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Feed every `key=value` entry to `visit` as (key segments, raw value).
///
/// Stops at the first malformed line.
pub(crate) fn for_each_entry<F>(content: &str, origin: &Path, mut visit: F) -> Result<()>
where
    F: FnMut(Vec<&str>, &str),
{
    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::Parse {
                path: origin.to_path_buf(),
                line: index + 1,
                content: line.to_string(),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::Parse {
                path: origin.to_path_buf(),
                line: index + 1,
                content: line.to_string(),
            });
        }
        visit(key.split('.').collect(), value.trim());
    }
    Ok(())
}
