//! Library dependency discovery for firmkit.
//!
//! Works out which libraries a project actually uses and in which order they
//! must be handed to the linker:
//!
//! 1. Every candidate library directory is turned into include flags.
//! 2. A [`DependencyLister`] produces a header listing for a directory.
//! 3. The [`DependencyScanner`] matches candidate paths in that listing.
//! 4. [`resolve`] follows library-to-library references until closed and
//!    bumps every observed dependency behind its dependents.
//!
//! The ordering is a heuristic, not a topological sort. Libraries that
//! depend on each other end up in some order fixed by scan sequence, and
//! no position satisfies both directions of such a pair.

pub mod error;
pub mod library;
pub mod lister;
pub mod resolution;
pub mod scan;

pub use error::{DepsError, Result};
pub use library::{include_dirs, include_flags, list_subdirs, Library};
pub use lister::{CompilerDependencyLister, DependencyLister};
pub use resolution::{order_libraries, resolve};
pub use scan::DependencyScanner;
