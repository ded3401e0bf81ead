//! Diagnostics and faults.
//!
//! Two severities flow out of a module pass:
//!
//! - [`Diagnostic`]: a problem in user-written build definitions. These are
//!   accumulated and never stop the pass.
//! - [`Fault`]: misuse of the API by module code (an unset property, an
//!   unregistered module, a declaration the scope rejects). Faults are
//!   returned as `Err` and propagated with `?`, aborting the module's pass.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actions::BuildParamsError;
use crate::module::ModuleId;
use crate::position::Position;
use crate::scope::ScopeError;

/// A user-facing error attributed to a source position.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{pos}: {message}")]
pub struct Diagnostic {
  pub message: String,
  pub pos: Position,
}

impl Diagnostic {
  pub fn new(pos: Position, message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      pos,
    }
  }
}

/// A programming error in module logic. Aborts the current module pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
  #[error("property {property:?} was not set for module {module:?}")]
  UnsetProperty { module: String, property: String },

  #[error("module {0} is not registered in the graph")]
  UnknownModule(ModuleId),

  #[error("scope error: {0}")]
  Scope(#[from] ScopeError),

  #[error("build params error: {0}")]
  BuildParams(#[from] BuildParamsError),

  #[error("{0}")]
  Invariant(String),
}

/// Renders a list of diagnostics one per line.
pub struct DisplayDiagnostics<'a>(pub &'a [Diagnostic]);

impl fmt::Display for DisplayDiagnostics<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for diagnostic in self.0 {
      writeln!(f, "{}", diagnostic)?;
    }
    Ok(())
  }
}
