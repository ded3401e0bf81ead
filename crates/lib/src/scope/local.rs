//! Per-module local scopes.
//!
//! Every module pass gets its own [`LocalScope`]. Declarations made through
//! it are owned by whichever package is current, and that package is the
//! scope's parent for lookups. Callers reparent the scope to their own
//! package before each declaration, so a helper library invoked by many
//! modules declares its names under its own package instead of under each
//! caller's.
//!
//! Local names are emitted as `m.<module>.<package>.<name>`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::package::Package;
use super::types::{Declaration, Pool, Rule, RuleDef, RuleParams, ScopeError, Variable, parse_arg_names, validate_name};
use crate::ninja_string::{NinjaString, VariableResolver};

#[derive(Debug)]
pub struct LocalScope {
  module: String,
  package: Arc<Package>,
  /// Keyed by (owning package, short name).
  declarations: HashMap<(String, String), Declaration>,
  /// Every package this scope has been parented to, first use first.
  packages: Vec<Arc<Package>>,
}

impl LocalScope {
  pub fn new(module: &str, package: Arc<Package>) -> Self {
    Self {
      module: module.to_string(),
      packages: vec![Arc::clone(&package)],
      package,
      declarations: HashMap::new(),
    }
  }

  /// The package that currently owns new declarations.
  pub fn package(&self) -> &Arc<Package> {
    &self.package
  }

  pub fn packages(&self) -> &[Arc<Package>] {
    &self.packages
  }

  pub fn into_packages(self) -> Vec<Arc<Package>> {
    self.packages
  }

  /// Rebind subsequent declarations to `package`.
  pub fn reparent(&mut self, package: &Arc<Package>) {
    if Arc::ptr_eq(&self.package, package) {
      return;
    }

    debug!(
      module = %self.module,
      from = %self.package.name(),
      to = %package.name(),
      "reparenting local scope"
    );
    self.package = Arc::clone(package);
    if !self.packages.iter().any(|p| Arc::ptr_eq(p, package)) {
      self.packages.push(Arc::clone(package));
    }
  }

  pub fn add_local_variable(&mut self, name: &str, value: &str) -> Result<Arc<Variable>, ScopeError> {
    self.check_free(name)?;
    let value = NinjaString::parse(value, &*self).map_err(|source| ScopeError::Value {
      name: name.to_string(),
      source,
    })?;

    let variable = Arc::new(Variable::new(name, self.qualify(name), self.package.name(), value));
    self.insert(name, Declaration::Variable(Arc::clone(&variable)));
    Ok(variable)
  }

  pub fn add_local_rule(&mut self, name: &str, params: &RuleParams, arg_names: &[&str]) -> Result<Arc<Rule>, ScopeError> {
    self.check_free(name)?;
    let args = parse_arg_names(name, arg_names)?;
    let pool = params
      .pool
      .as_deref()
      .map(|p| self.lookup_pool(p).map(|p| p.qualified_name().to_string()))
      .transpose()?;
    let def = RuleDef::parse(name, params, &args, pool, &*self)?;

    let rule = Arc::new(Rule::new(name, self.qualify(name), self.package.name(), args, def));
    self.insert(name, Declaration::Rule(Arc::clone(&rule)));
    Ok(rule)
  }

  /// Qualified name of the variable `reference` resolves to from here.
  pub fn lookup_variable(&self, reference: &str) -> Option<String> {
    self.resolve_variable(reference)
  }

  /// Pools are only declared statically, so lookups go to the package.
  pub fn lookup_pool(&self, reference: &str) -> Result<Arc<Pool>, ScopeError> {
    self.package.lookup_pool(reference)
  }

  /// A rule may be used by a build edge if it is builtin, was declared in
  /// this scope, or is visible from the current package.
  pub fn is_rule_visible(&self, rule: &Arc<Rule>) -> bool {
    rule.is_builtin()
      || self
        .declarations
        .values()
        .any(|d| matches!(d, Declaration::Rule(r) if Arc::ptr_eq(r, rule)))
      || self.package.is_rule_visible(rule)
  }

  fn qualify(&self, name: &str) -> String {
    format!("m.{}.{}.{}", self.module, self.package.name(), name)
  }

  fn check_free(&self, name: &str) -> Result<(), ScopeError> {
    validate_name(name)?;
    let owner = self.package.name();
    let existing = self
      .declarations
      .get(&(owner.to_string(), name.to_string()))
      .or_else(|| self.package.lookup(name));

    match existing {
      Some(existing) => Err(ScopeError::AlreadyDefined {
        name: name.to_string(),
        kind: existing.kind(),
        package: owner.to_string(),
      }),
      None => Ok(()),
    }
  }

  fn insert(&mut self, name: &str, declaration: Declaration) {
    debug!(
      module = %self.module,
      package = %self.package.name(),
      kind = declaration.kind(),
      name = %name,
      "local declaration"
    );
    self
      .declarations
      .insert((self.package.name().to_string(), name.to_string()), declaration);
  }
}

impl VariableResolver for LocalScope {
  fn resolve_variable(&self, reference: &str) -> Option<String> {
    if !reference.contains('.')
      && let Some(Declaration::Variable(v)) = self
        .declarations
        .get(&(self.package.name().to_string(), reference.to_string()))
    {
      return Some(v.qualified_name().to_string());
    }
    self.package.resolve_variable(reference)
  }
}
