//! Configuration model for firmkit.
//!
//! Turns the line-oriented `dotted.key=value` description files shipped with
//! a microcontroller distribution into hierarchical trees:
//!
//! - **[`ConfigNode`]:** the nested key/value tree every other layer works on
//! - **[`parse`]:** the description-file parser
//! - **[`BoardModels`]:** board catalogue with CPU variant expansion
//! - **[`Platforms`]:** per-architecture toolchain recipes and defaults
//! - **[`recipe`]:** `{dotted.path}` placeholder substitution
//! - **[`Version`]:** distribution version detection

pub mod boards;
pub mod error;
pub mod node;
pub mod parse;
pub mod platform;
pub mod recipe;
pub mod version;

pub use boards::{BoardModels, DEFAULT_BOARD_MODEL};
pub use error::{ConfigError, Result};
pub use node::{ConfigNode, ConfigValue};
pub use parse::{parse_description, parse_description_str};
pub use platform::Platforms;
pub use recipe::expand;
pub use version::Version;
