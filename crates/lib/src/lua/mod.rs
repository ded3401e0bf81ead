//! Lua build definitions.
//!
//! Definition files are plain Lua. Every registered module type is a global
//! function taking a property table, and the `knit` table offers:
//!
//! - `knit.dir` - directory of the file being evaluated, relative to the root
//! - `knit.subdir(dir)` - evaluate `<dir>/knit.lua`
//!
//! # Submodules
//!
//! - [`loader`] - [`load_definitions`] and its results
//! - [`runtime`] - Lua VM setup and file evaluation

pub mod loader;
pub mod runtime;

pub use loader::{LoadError, LoadedDefinitions, load_definitions};
