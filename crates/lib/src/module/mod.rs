//! Modules and their metadata.
//!
//! A [`Module`] is a unit of build logic: given a [`ModuleContext`] it
//! declares variables and rules and records build edges. Modules are
//! referred to by [`ModuleId`], handed out by the graph they are registered
//! in; two modules are the same module only if their ids are equal.
//!
//! # Submodules
//!
//! - [`func`] - Closure-backed modules
//! - [`properties`] - Property values and their source positions
//! - [`registry`] - Module types and the declarations they are created from

pub mod func;
pub mod properties;
pub mod registry;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::context::ModuleContext;
use crate::diag::Fault;
use crate::position::Position;
use crate::scope::Package;

pub use func::FnModule;
pub use properties::{Properties, PropertyValue};
pub use registry::{ModuleDecl, ModuleFactory, ModuleTypes};

/// Identity of a module within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleId(usize);

impl ModuleId {
  pub(crate) fn new(index: usize) -> Self {
    Self(index)
  }

  pub fn index(self) -> usize {
    self.0
  }
}

impl fmt::Display for ModuleId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Build logic for one module.
///
/// `C` is the configuration type shared by every module in a run; the core
/// passes it through without looking at it.
pub trait Module<C>: Send + Sync {
  /// The package this module's own declarations belong to.
  fn package(&self) -> &Arc<Package>;

  /// Declare and record this module's build actions.
  ///
  /// Problems in the module's definition are reported through the context
  /// and do not stop the pass. Returning a [`Fault`] aborts the pass and
  /// discards whatever was recorded.
  fn generate_build_actions(&self, ctx: &mut ModuleContext<'_, C>) -> Result<(), Fault>;
}

/// Metadata recorded for every registered module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleInfo {
  pub name: String,
  pub module_type: String,
  /// Where the module was declared.
  pub pos: Position,
  /// Definition file, relative to the root of the source tree.
  pub rel_definition_file: PathBuf,
  pub property_positions: BTreeMap<String, Position>,
}

impl ModuleInfo {
  /// Create info for a module declared at `pos`. The definition file is
  /// taken from the position.
  pub fn new(name: &str, module_type: &str, pos: Position) -> Self {
    Self {
      name: name.to_string(),
      module_type: module_type.to_string(),
      rel_definition_file: PathBuf::from(&pos.file),
      pos,
      property_positions: BTreeMap::new(),
    }
  }

  pub fn with_definition_file(mut self, path: impl Into<PathBuf>) -> Self {
    self.rel_definition_file = path.into();
    self
  }

  pub fn with_property_position(mut self, property: &str, pos: Position) -> Self {
    self.property_positions.insert(property.to_string(), pos);
    self
  }

  pub fn property_position(&self, property: &str) -> Option<&Position> {
    self.property_positions.get(property)
  }

  pub(crate) fn from_decl(decl: &ModuleDecl) -> Self {
    Self {
      property_positions: decl.properties.positions().clone(),
      ..Self::new(&decl.name, &decl.module_type, decl.pos.clone())
    }
  }
}
