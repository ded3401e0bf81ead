//! Running module passes and checking the combined namespace.
//!
//! Modules run wave by wave: every module of a wave runs concurrently on a
//! rayon pool once all earlier waves are done. Results are kept in wave
//! order then id order, so the output does not depend on scheduling.

use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, warn};

use super::dag::ModuleGraph;
use super::types::{GenerateOptions, GenerateResult, GraphError, ModuleResult, NamespaceError};
use crate::actions::BuildActions;
use crate::context::{ModuleContext, ModuleOutput};
use crate::diag::Fault;
use crate::module::ModuleId;
use crate::scope::Package;

impl<C: Sync> ModuleGraph<C> {
  /// Run every module's pass.
  ///
  /// A module that faults has its build actions discarded; other modules
  /// are unaffected.
  pub fn generate(&self, config: &C, options: &GenerateOptions) -> Result<GenerateResult, GraphError> {
    let waves = self.waves()?;
    info!(modules = self.len(), wave_count = waves.len(), "computed generation waves");

    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(options.parallelism.max(1))
      .build()
      .map_err(|e| GraphError::ThreadPool(e.to_string()))?;

    let mut result = GenerateResult::default();
    for (index, wave) in waves.iter().enumerate() {
      info!(wave = index, modules = wave.len(), "generating wave");
      let outcomes: Vec<ModuleResult> =
        pool.install(|| wave.par_iter().map(|&id| self.run_module(config, id)).collect());
      result.modules.extend(outcomes);
    }

    let failed = result.modules.iter().filter(|m| m.failed()).count();
    info!(modules = result.modules.len(), failed, "generation finished");
    Ok(result)
  }

  fn run_module(&self, config: &C, id: ModuleId) -> ModuleResult {
    let name = self.info(id).map(|i| i.name.clone()).unwrap_or_default();

    let (mut output, outcome) = match ModuleContext::new(self, config, id) {
      Ok(mut ctx) => {
        let outcome = match self.module(id) {
          Some(module) => module.generate_build_actions(&mut ctx),
          None => Err(Fault::UnknownModule(id)),
        };
        (ctx.finish(), outcome)
      }
      Err(fault) => (
        ModuleOutput {
          module: id,
          diagnostics: Vec::new(),
          actions: BuildActions::new(),
          ninja_file_deps: Vec::new(),
          packages: Vec::new(),
          fault: None,
        },
        Err(fault),
      ),
    };

    // A fault the module swallowed still aborts the pass.
    let fault = output.fault.clone().or(outcome.err());
    if let Some(fault) = &fault {
      warn!(module = %name, error = %fault, "module faulted, discarding its build actions");
      output.actions = BuildActions::new();
    }

    ModuleResult { name, output, fault }
  }
}

/// Check that everything a run would emit has a distinct Ninja name: one
/// package object per package name and one declaration per qualified name.
pub fn check_namespace(result: &GenerateResult) -> Result<(), NamespaceError> {
  let packages = result.packages();

  let mut by_name: HashMap<&str, &Arc<Package>> = HashMap::new();
  for package in &packages {
    if let Some(existing) = by_name.insert(package.name(), package)
      && !Arc::ptr_eq(existing, package)
    {
      return Err(NamespaceError::PackageCollision(package.name().to_string()));
    }
  }

  let mut owners: HashMap<&str, String> = HashMap::new();
  for package in &packages {
    for decl in package.declarations() {
      claim(&mut owners, decl.qualified_name(), format!("package {:?}", package.name()))?;
    }
  }
  for module in &result.modules {
    for name in module.output.actions.qualified_names() {
      claim(&mut owners, name, format!("module {:?}", module.name))?;
    }
  }

  Ok(())
}

fn claim<'a>(owners: &mut HashMap<&'a str, String>, name: &'a str, owner: String) -> Result<(), NamespaceError> {
  if let Some(first) = owners.get(name) {
    return Err(NamespaceError::NameCollision {
      name: name.to_string(),
      first: first.clone(),
      second: owner,
    });
  }
  owners.insert(name, owner);
  Ok(())
}
