//! Types for graph construction and build-action generation.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use thiserror::Error;

use crate::context::ModuleOutput;
use crate::diag::{Diagnostic, Fault};
use crate::module::ModuleId;
use crate::scope::Package;

/// Errors that can occur while building or walking the module graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("invalid module name {0:?}")]
  InvalidName(String),

  #[error("module {0:?} is already defined")]
  DuplicateName(String),

  #[error("module {0} is not registered")]
  UnknownModule(ModuleId),

  #[error("module {0:?} depends on itself")]
  SelfDependency(String),

  /// Names of every module on or behind a dependency cycle.
  #[error("dependency cycle between modules: {}", .0.join(", "))]
  Cycle(Vec<String>),

  #[error("failed to start worker pool: {0}")]
  ThreadPool(String),
}

/// Two declarations that would end up with the same Ninja name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
  #[error("two different packages are named {0:?}")]
  PackageCollision(String),

  #[error("{name:?} is declared by both {first} and {second}")]
  NameCollision { name: String, first: String, second: String },
}

/// Configuration for [`ModuleGraph::generate`](super::ModuleGraph::generate).
#[derive(Debug, Clone)]
pub struct GenerateOptions {
  /// Maximum number of modules generating at once.
  pub parallelism: usize,
}

impl Default for GenerateOptions {
  fn default() -> Self {
    Self {
      parallelism: std::thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(4),
    }
  }
}

impl GenerateOptions {
  pub fn with_parallelism(mut self, parallelism: usize) -> Self {
    self.parallelism = parallelism.max(1);
    self
  }
}

/// Outcome of one module's pass.
#[derive(Debug, Clone)]
pub struct ModuleResult {
  pub name: String,
  /// The pass's output. When the pass faulted its build actions have been
  /// dropped; its diagnostics are kept.
  pub output: ModuleOutput,
  pub fault: Option<Fault>,
}

impl ModuleResult {
  pub fn module(&self) -> ModuleId {
    self.output.module
  }

  pub fn failed(&self) -> bool {
    self.fault.is_some() || self.output.failed()
  }
}

/// Outcome of a whole generation run, in wave order then id order.
#[derive(Debug, Clone, Default)]
pub struct GenerateResult {
  pub modules: Vec<ModuleResult>,
}

impl GenerateResult {
  /// True if any module reported a diagnostic or faulted.
  pub fn failed(&self) -> bool {
    self.modules.iter().any(ModuleResult::failed)
  }

  pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
    self.modules.iter().flat_map(|m| m.output.diagnostics.iter())
  }

  pub fn faults(&self) -> impl Iterator<Item = (&str, &Fault)> {
    self
      .modules
      .iter()
      .filter_map(|m| m.fault.as_ref().map(|f| (m.name.as_str(), f)))
  }

  /// Extra Ninja file dependencies of every module, deduplicated.
  pub fn ninja_file_deps(&self) -> Vec<&str> {
    let mut seen = HashSet::new();
    self
      .modules
      .iter()
      .flat_map(|m| m.output.ninja_file_deps.iter())
      .map(String::as_str)
      .filter(|dep| seen.insert(*dep))
      .collect()
  }

  /// Every package any module touched, plus everything those packages
  /// import, each object once in first-seen order. Imports come before the
  /// packages importing them.
  pub fn packages(&self) -> Vec<Arc<Package>> {
    let mut packages: Vec<Arc<Package>> = Vec::new();
    for module in &self.modules {
      for package in &module.output.packages {
        collect_package(package, &mut packages);
      }
    }
    packages
  }
}

fn collect_package(package: &Arc<Package>, out: &mut Vec<Arc<Package>>) {
  if out.iter().any(|p| Arc::ptr_eq(p, package)) {
    return;
  }
  for import in package.imports() {
    collect_package(import, out);
  }
  if !out.iter().any(|p| Arc::ptr_eq(p, package)) {
    out.push(Arc::clone(package));
  }
}
