//! Distribution version detection.
//!
//! The distribution records its version in `lib/version.txt` in a handful of
//! shapes (`0022`, `0022ubuntu0.1`, `0022-macosx-20110822`, `1.0`, `1.5.8`).
//! Only the leading `major[.minor]` is significant.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// A `(major, minor)` distribution version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

fn leading_version() -> &'static Regex {
    static LEADING: OnceLock<Regex> = OnceLock::new();
    LEADING.get_or_init(|| Regex::new(r"^\d+(\.\d+)?").expect("version regex is valid"))
}

impl Version {
    pub fn new(major: u32, minor: u32) -> Self {
        Version { major, minor }
    }

    /// Parse the contents of `version.txt`.
    ///
    /// Pre-1.0 releases are zero-padded build numbers, so `0022` reads as
    /// `0.22`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || ConfigError::InvalidVersion(s.to_string());
        let matched = leading_version().find(s).ok_or_else(invalid)?.as_str();

        if matched.starts_with('0') && !matched.contains('.') {
            let minor = matched.parse().map_err(|_| invalid())?;
            return Ok(Version::new(0, minor));
        }
        let (major, minor) = matched.split_once('.').unwrap_or((matched, "0"));
        Ok(Version::new(
            major.parse().map_err(|_| invalid())?,
            minor.parse().map_err(|_| invalid())?,
        ))
    }

    /// Integer form passed to the compiler as `-DARDUINO=`.
    pub fn as_int(&self) -> u64 {
        u64::from(self.major) * 100 + u64::from(self.minor)
    }

    /// Whether the distribution uses per-architecture directories
    /// (`hardware/arduino/<arch>/...`), introduced with 1.5.
    pub fn uses_arch_dirs(&self) -> bool {
        *self >= Version::new(1, 5)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
