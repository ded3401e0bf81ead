//! Namespaces for variables, rules and pools.
//!
//! Names are owned by packages. A [`Package`] holds static declarations made
//! once for the whole graph; a [`LocalScope`] holds the declarations one
//! module pass makes, attributed to whichever package issued them.
//!
//! # Submodules
//!
//! - [`package`] - Package scopes and their builder
//! - [`local`] - Per-module local scopes with reparenting

pub mod local;
pub mod package;
mod types;

pub use local::LocalScope;
pub use package::{Package, PackageBuilder};
pub use types::*;
