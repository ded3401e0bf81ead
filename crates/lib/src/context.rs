//! The per-module context handed to module logic.
//!
//! A [`ModuleContext`] is bound to exactly one module for the duration of
//! its pass. Through it the module reads its own metadata and that of other
//! modules, reports diagnostics, declares variables and rules in its local
//! scope, records build edges and walks its dependencies. When the pass is
//! over the graph calls [`ModuleContext::finish`] to collect the results.
//!
//! Declarations take the declaring package explicitly. Helper code shared
//! between module types passes its own package so its names never collide
//! with the calling module's.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::actions::{BuildActions, BuildParams, parse_build_params};
use crate::diag::{Diagnostic, Fault};
use crate::graph::ModuleGraph;
use crate::module::{ModuleId, ModuleInfo};
use crate::position::Position;
use crate::scope::{LocalScope, Package, Rule, RuleParams, Variable};

/// Everything one module pass produced.
#[derive(Debug, Clone)]
pub struct ModuleOutput {
  pub module: ModuleId,
  pub diagnostics: Vec<Diagnostic>,
  pub actions: BuildActions,
  pub ninja_file_deps: Vec<String>,
  /// Every package the module's local scope was parented to.
  pub packages: Vec<Arc<Package>>,
  /// First fault any context operation returned, whether or not the module
  /// passed it on.
  pub fault: Option<Fault>,
}

impl ModuleOutput {
  pub fn failed(&self) -> bool {
    !self.diagnostics.is_empty()
  }
}

pub struct ModuleContext<'g, C> {
  graph: &'g ModuleGraph<C>,
  config: &'g C,
  module: ModuleId,
  info: &'g ModuleInfo,
  scope: LocalScope,
  actions: BuildActions,
  errors: Vec<Diagnostic>,
  ninja_file_deps: Vec<String>,
  fault: Option<Fault>,
}

impl<'g, C> ModuleContext<'g, C> {
  /// Bind a context to `module`. Its local scope starts out parented to the
  /// module's own package.
  pub fn new(graph: &'g ModuleGraph<C>, config: &'g C, module: ModuleId) -> Result<Self, Fault> {
    let info = graph.info(module).ok_or(Fault::UnknownModule(module))?;
    let package = graph.module(module).ok_or(Fault::UnknownModule(module))?.package();

    Ok(Self {
      graph,
      config,
      module,
      info,
      scope: LocalScope::new(&info.name, Arc::clone(package)),
      actions: BuildActions::new(),
      errors: Vec::new(),
      ninja_file_deps: Vec::new(),
      fault: None,
    })
  }

  pub fn module_id(&self) -> ModuleId {
    self.module
  }

  pub fn module_name(&self) -> &str {
    &self.info.name
  }

  pub fn info(&self) -> &ModuleInfo {
    self.info
  }

  pub fn other_module_name(&self, module: ModuleId) -> Result<&'g str, Fault> {
    Ok(&self.other_module_info(module)?.name)
  }

  pub fn other_module_info(&self, module: ModuleId) -> Result<&'g ModuleInfo, Fault> {
    self.graph.info(module).ok_or(Fault::UnknownModule(module))
  }

  /// Directory of the file that declared this module, `.` at the root.
  pub fn module_dir(&self) -> String {
    match self.info.rel_definition_file.parent() {
      Some(dir) if dir != Path::new("") => dir.to_string_lossy().into_owned(),
      _ => ".".to_string(),
    }
  }

  pub fn config(&self) -> &'g C {
    self.config
  }

  pub fn scope(&self) -> &LocalScope {
    &self.scope
  }

  pub fn actions(&self) -> &BuildActions {
    &self.actions
  }

  pub fn errors(&self) -> &[Diagnostic] {
    &self.errors
  }

  /// Record a diagnostic at `pos`.
  pub fn error(&mut self, pos: Position, message: impl Into<String>) {
    self.errors.push(Diagnostic::new(pos, message));
  }

  /// Record a diagnostic at this module's declaration.
  pub fn module_error(&mut self, message: impl Into<String>) {
    let pos = self.info.pos.clone();
    self.error(pos, message);
  }

  /// Record a diagnostic at the position `property` was set at.
  ///
  /// A property that was never set has no position to blame, which is a
  /// bug in the module type, not in the definitions.
  pub fn property_error(&mut self, property: &str, message: impl Into<String>) -> Result<(), Fault> {
    let pos = self.info.property_position(property).cloned().ok_or_else(|| Fault::UnsetProperty {
      module: self.info.name.clone(),
      property: property.to_string(),
    });
    let pos = self.record(pos)?;
    self.error(pos, message);
    Ok(())
  }

  /// Record a diagnostic at another module's declaration.
  pub fn other_module_error(&mut self, module: ModuleId, message: impl Into<String>) -> Result<(), Fault> {
    let pos = self.other_module_info(module).map(|info| info.pos.clone());
    let pos = self.record(pos)?;
    self.error(pos, message);
    Ok(())
  }

  /// True once any diagnostic has been recorded. Faults do not count.
  pub fn failed(&self) -> bool {
    !self.errors.is_empty()
  }

  /// Declare a module-local variable owned by `package`.
  pub fn variable(&mut self, package: &Arc<Package>, name: &str, value: &str) -> Result<Arc<Variable>, Fault> {
    self.scope.reparent(package);
    let variable = self.scope.add_local_variable(name, value).map_err(Fault::from);
    let variable = self.record(variable)?;
    self.actions.variables.push(Arc::clone(&variable));
    Ok(variable)
  }

  /// Declare a module-local rule owned by `package`.
  pub fn rule(
    &mut self,
    package: &Arc<Package>,
    name: &str,
    params: &RuleParams,
    arg_names: &[&str],
  ) -> Result<Arc<Rule>, Fault> {
    self.scope.reparent(package);
    let rule = self.scope.add_local_rule(name, params, arg_names).map_err(Fault::from);
    let rule = self.record(rule)?;
    self.actions.rules.push(Arc::clone(&rule));
    Ok(rule)
  }

  /// Record a build edge, resolving its strings as seen from `package`.
  pub fn build(&mut self, package: &Arc<Package>, params: BuildParams) -> Result<(), Fault> {
    self.scope.reparent(package);
    let def = parse_build_params(&self.scope, params).map_err(Fault::from);
    let def = self.record(def)?;
    debug!(
      module = %self.info.name,
      rule = %def.rule.qualified_name(),
      outputs = def.outputs.len(),
      "build edge"
    );
    self.actions.builds.push(def);
    Ok(())
  }

  /// Visit every dependency reachable from this module, dependencies first,
  /// each once.
  pub fn visit_deps_depth_first<V>(&mut self, visit: V) -> Result<(), Fault>
  where
    V: FnMut(&mut Self, ModuleId) -> Result<(), Fault>,
  {
    self.visit_deps_depth_first_if(|_, _| true, visit)
  }

  /// Like [`visit_deps_depth_first`](Self::visit_deps_depth_first), but a
  /// dependency rejected by `pred` is neither visited nor walked through.
  /// A fault returned by `visit` stops the walk.
  pub fn visit_deps_depth_first_if<P, V>(&mut self, mut pred: P, mut visit: V) -> Result<(), Fault>
  where
    P: FnMut(&Self, ModuleId) -> bool,
    V: FnMut(&mut Self, ModuleId) -> Result<(), Fault>,
  {
    let graph = self.graph;
    let order = graph
      .deps_depth_first_if(self.module, |dep| pred(&*self, dep))
      .map_err(|_| Fault::UnknownModule(self.module));
    let order = self.record(order)?;

    for dep in order {
      let visited = visit(self, dep);
      self.record(visited)?;
    }
    Ok(())
  }

  /// Extra files the generated Ninja file depends on.
  pub fn add_ninja_file_deps<S: AsRef<str>>(&mut self, paths: &[S]) {
    self
      .ninja_file_deps
      .extend(paths.iter().map(|p| p.as_ref().to_string()));
  }

  pub fn finish(self) -> ModuleOutput {
    ModuleOutput {
      module: self.module,
      diagnostics: self.errors,
      actions: self.actions,
      ninja_file_deps: self.ninja_file_deps,
      packages: self.scope.into_packages(),
      fault: self.fault,
    }
  }

  /// The first fault this context handed out, if any.
  pub fn fault(&self) -> Option<&Fault> {
    self.fault.as_ref()
  }

  /// Remember the first fault so the pass is aborted even if the module
  /// drops the `Err`.
  fn record<T>(&mut self, result: Result<T, Fault>) -> Result<T, Fault> {
    if let Err(fault) = &result
      && self.fault.is_none()
    {
      self.fault = Some(fault.clone());
    }
    result
  }
}
