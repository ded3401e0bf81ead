//! Build actions recorded by modules.
//!
//! A module pass produces an ordered [`BuildActions`] set: the local
//! variables and rules it declared and the build edges it recorded. Build
//! edges are requested as [`BuildParams`] and parsed against the module's
//! local scope into [`BuildDef`]s.
//!
//! # Submodules
//!
//! - [`parse`] - Build parameter validation and parsing

pub mod parse;
mod types;

pub use parse::parse_build_params;
pub use types::*;
