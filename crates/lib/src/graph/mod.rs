//! The global module graph.
//!
//! [`ModuleGraph`] owns every registered module with its [`ModuleInfo`]
//! and the dependency edges between them. It is immutable while modules
//! generate: each pass borrows it through a
//! [`ModuleContext`](crate::context::ModuleContext).
//!
//! # Submodules
//!
//! - [`builder`] - Building a graph from loaded declarations
//! - [`dag`] - Registration, waves and depth-first walks
//! - [`generate`] - Running module passes and checking the namespace
//!
//! [`ModuleInfo`]: crate::module::ModuleInfo

pub mod builder;
pub mod dag;
pub mod generate;
mod types;

pub use builder::DEPS_PROPERTY;
pub use dag::ModuleGraph;
pub use generate::check_namespace;
pub use types::*;
