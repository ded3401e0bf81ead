//! Rendering generated build actions as a Ninja file.
//!
//! # Submodules
//!
//! - [`writer`] - The [`NinjaWriter`] and its options

pub mod writer;

pub use writer::{NinjaWriter, Regenerate, WriteError, WriterOptions};
