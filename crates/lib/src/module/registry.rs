//! Module types: named factories turning declarations into modules.

use std::collections::BTreeMap;

use crate::diag::Diagnostic;
use crate::module::{Module, Properties};
use crate::position::Position;

/// One module as declared in a definition file, before it is turned into a
/// [`Module`] by its type's factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDecl {
  pub module_type: String,
  pub name: String,
  pub pos: Position,
  pub properties: Properties,
}

/// Creates a module from its declaration. A factory reports definition
/// problems as a [`Diagnostic`].
pub type ModuleFactory<C> = Box<dyn Fn(&ModuleDecl) -> Result<Box<dyn Module<C>>, Diagnostic> + Send + Sync>;

/// The module types known to a run, by name.
pub struct ModuleTypes<C> {
  factories: BTreeMap<String, ModuleFactory<C>>,
}

impl<C> Default for ModuleTypes<C> {
  fn default() -> Self {
    Self {
      factories: BTreeMap::new(),
    }
  }
}

impl<C> ModuleTypes<C> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a module type. A later registration under the same name
  /// replaces the earlier one.
  pub fn register<F>(&mut self, name: &str, factory: F) -> &mut Self
  where
    F: Fn(&ModuleDecl) -> Result<Box<dyn Module<C>>, Diagnostic> + Send + Sync + 'static,
  {
    self.factories.insert(name.to_string(), Box::new(factory));
    self
  }

  pub fn contains(&self, name: &str) -> bool {
    self.factories.contains_key(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.factories.keys().map(|k| k.as_str())
  }

  /// Run the factory for `decl`'s type. Returns `None` for unknown types.
  pub fn create(&self, decl: &ModuleDecl) -> Option<Result<Box<dyn Module<C>>, Diagnostic>> {
    self.factories.get(&decl.module_type).map(|factory| factory(decl))
  }
}
