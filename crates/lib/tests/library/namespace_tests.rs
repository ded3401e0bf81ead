//! Property tests for package attribution and namespace uniqueness.

use std::collections::HashSet;
use std::sync::Arc;

use knit_lib::diag::Fault;
use knit_lib::graph::{ModuleGraph, NamespaceError, check_namespace};
use knit_lib::scope::{Package, ScopeError};
use proptest::prelude::*;

use super::common::{add_module, generate, info, package};

const PACKAGES: &[&str] = &["app", "cc", "java"];
const NAMES: &[&str] = &["flags", "cc", "out_dir", "tool"];

/// Per module, the (package, name) pairs it declares, in order.
fn declarations_strategy() -> impl Strategy<Value = Vec<Vec<(usize, usize)>>> {
  prop::collection::vec(
    prop::collection::vec((0..PACKAGES.len(), 0..NAMES.len()), 0..8),
    1..6,
  )
}

fn build_graph(modules: &[Vec<(usize, usize)>], packages: &[Arc<Package>]) -> ModuleGraph<()> {
  let mut graph = ModuleGraph::new();
  for (index, decls) in modules.iter().enumerate() {
    let decls = decls.clone();
    let packages = packages.to_vec();
    let owner = Arc::clone(&packages[0]);
    add_module(&mut graph, info(&format!("mod{}", index), index + 1), &owner, move |ctx| {
      // Duplicates are reported and skipped, which must not save the module.
      for &(pkg, name) in &decls {
        if ctx.variable(&packages[pkg], NAMES[name], "x").is_err() {
          ctx.module_error("duplicate");
        }
      }
      Ok(())
    });
  }
  graph
}

proptest! {
  #[test]
  fn declarations_are_attributed_and_unique(modules in declarations_strategy()) {
    let packages: Vec<Arc<Package>> = PACKAGES.iter().map(|name| package(name)).collect();
    let graph = build_graph(&modules, &packages);

    let result = generate(&graph);

    prop_assert!(check_namespace(&result).is_ok());
    let mut all_names = HashSet::new();
    for (index, decls) in modules.iter().enumerate() {
      let module = &result.modules[index];
      let distinct: Vec<(usize, usize)> = {
        let mut seen = HashSet::new();
        decls.iter().copied().filter(|d| seen.insert(*d)).collect()
      };
      prop_assert_eq!(module.output.diagnostics.len(), decls.len() - distinct.len());

      if distinct.len() < decls.len() {
        prop_assert!(
          matches!(&module.fault, Some(Fault::Scope(ScopeError::AlreadyDefined { .. }))),
          "fault: {:?}",
          module.fault
        );
        prop_assert!(module.output.actions.is_empty());
        continue;
      }
      prop_assert!(module.fault.is_none());

      let variables = &module.output.actions.variables;
      prop_assert_eq!(variables.len(), distinct.len());
      for (variable, (pkg, name)) in variables.iter().zip(&distinct) {
        prop_assert_eq!(variable.owner(), PACKAGES[*pkg]);
        prop_assert_eq!(
          variable.qualified_name(),
          format!("m.mod{}.{}.{}", index, PACKAGES[*pkg], NAMES[*name])
        );
        prop_assert!(all_names.insert(variable.qualified_name().to_string()));
      }
    }
  }

  #[test]
  fn distinct_packages_sharing_a_name_collide(name in "[a-z][a-z0-9_]{0,8}") {
    let first = package(&name);
    let second = package(&name);
    let mut graph = ModuleGraph::new();
    add_module(&mut graph, info("liba", 1), &first, |_| Ok(()));
    add_module(&mut graph, info("libb", 2), &second, |_| Ok(()));

    let result = generate(&graph);

    prop_assert_eq!(check_namespace(&result), Err(NamespaceError::PackageCollision(name)));
  }
}
