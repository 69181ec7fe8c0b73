//! Per-architecture platform definitions.
//!
//! A platform definition (`platform.txt`) carries toolchain recipes and build
//! defaults for one architecture. Definitions are parsed once and kept for
//! the lifetime of the process.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::node::ConfigNode;
use crate::parse::parse_description;

/// Architectures shipped by new-style (per-architecture) distributions.
pub const ARCHITECTURES: [&str; 2] = ["sam", "avr"];

/// Architecture used when nothing else is known.
pub const DEFAULT_ARCH: &str = "avr";

/// Platform definitions keyed by architecture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platforms {
    by_arch: BTreeMap<String, ConfigNode>,
}

impl Platforms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `path` as the platform definition for `arch`.
    pub fn parse(&mut self, arch: &str, path: &Path) -> Result<()> {
        let definition = parse_description(path)?;
        self.insert(arch, definition);
        Ok(())
    }

    pub fn insert(&mut self, arch: impl Into<String>, definition: ConfigNode) {
        self.by_arch.insert(arch.into(), definition);
    }

    pub fn get(&self, arch: &str) -> Option<&ConfigNode> {
        self.by_arch.get(arch)
    }

    pub fn archs(&self) -> impl Iterator<Item = &str> {
        self.by_arch.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_arch.is_empty()
    }
}

/// Cross-compiler binary prefix for an architecture.
pub fn toolchain_prefix(arch: &str) -> &'static str {
    if arch == "avr" {
        "avr-"
    } else {
        "arm-none-eabi-"
    }
}

/// Directory under `hardware/tools/` holding the architecture's compiler.
pub fn tools_dir(arch: &str) -> &'static str {
    if arch == "avr" {
        "avr"
    } else {
        "g++_arm_none_eabi"
    }
}

/// Extension of the flashable firmware image.
pub fn firmware_extension(arch: &str) -> &'static str {
    if arch == "sam" {
        "bin"
    } else {
        "hex"
    }
}
