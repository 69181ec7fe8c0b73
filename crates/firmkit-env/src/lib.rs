//! Build environment state for firmkit.
//!
//! The [`Environment`] is the context object every build stage reads from
//! and writes to: discovered paths, parsed board and platform definitions,
//! compiler flags, expanded recipes and the resolved library order. It is
//! passed explicitly rather than living in a global, and can be persisted
//! to a per-build snapshot so a later command skips rediscovery.

pub mod discovery;
pub mod environment;
pub mod error;
pub mod libraries;
pub mod snapshot;

pub use environment::{EnvValue, Environment, EnvironmentSettings};
pub use error::{EnvError, Result};
