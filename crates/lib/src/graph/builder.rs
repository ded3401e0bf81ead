//! Building a module graph from loaded declarations.

use tracing::info;

use super::dag::ModuleGraph;
use super::types::GraphError;
use crate::diag::Diagnostic;
use crate::module::{ModuleDecl, ModuleId, ModuleInfo, ModuleTypes};

/// Property naming a module's dependencies.
pub const DEPS_PROPERTY: &str = "deps";

impl<C> ModuleGraph<C> {
  /// Register every declaration with its module type and wire up `deps`.
  ///
  /// Problems in the declarations (unknown types, duplicate names, unknown
  /// dependencies, rejected properties) are returned as diagnostics; the
  /// offending module or edge is left out and the rest of the graph is
  /// still built.
  pub fn from_decls(decls: &[ModuleDecl], types: &ModuleTypes<C>) -> (Self, Vec<Diagnostic>) {
    let mut graph = Self::new();
    let mut diagnostics = Vec::new();
    let mut registered: Vec<(&ModuleDecl, ModuleId)> = Vec::new();

    for decl in decls {
      let module = match types.create(decl) {
        None => {
          diagnostics.push(Diagnostic::new(
            decl.pos.clone(),
            format!("unknown module type {:?}", decl.module_type),
          ));
          continue;
        }
        Some(Err(diagnostic)) => {
          diagnostics.push(diagnostic);
          continue;
        }
        Some(Ok(module)) => module,
      };

      match graph.add_module(ModuleInfo::from_decl(decl), module) {
        Ok(id) => registered.push((decl, id)),
        Err(GraphError::DuplicateName(name)) => {
          let first = graph.lookup(&name).and_then(|id| graph.info(id)).map(|info| info.pos.clone());
          let message = match first {
            Some(first) => format!("module {:?} is already defined at {}", name, first),
            None => format!("module {:?} is already defined", name),
          };
          diagnostics.push(Diagnostic::new(decl.pos.clone(), message));
        }
        Err(err) => diagnostics.push(Diagnostic::new(decl.pos.clone(), err.to_string())),
      }
    }

    for (decl, id) in registered {
      let deps = match decl.properties.get_list(DEPS_PROPERTY) {
        Ok(deps) => deps,
        Err(diagnostic) => {
          diagnostics.push(diagnostic);
          continue;
        }
      };
      let deps_pos = decl
        .properties
        .position(DEPS_PROPERTY)
        .cloned()
        .unwrap_or_else(|| decl.pos.clone());

      for dep in deps {
        let Some(dep_id) = graph.lookup(&dep) else {
          diagnostics.push(Diagnostic::new(
            deps_pos.clone(),
            format!("{:?} depends on unknown module {:?}", decl.name, dep),
          ));
          continue;
        };
        if let Err(err) = graph.add_dependency(id, dep_id) {
          diagnostics.push(Diagnostic::new(deps_pos.clone(), err.to_string()));
        }
      }
    }

    info!(
      modules = graph.len(),
      diagnostics = diagnostics.len(),
      "built module graph"
    );
    (graph, diagnostics)
  }
}
