//! The module dependency graph.
//!
//! Edges run from a dependency to its dependent, so a topological order
//! lists dependencies first. Each entry also keeps its dependencies in the
//! order they were declared; depth-first walks follow that order.

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use super::types::GraphError;
use crate::module::{Module, ModuleId, ModuleInfo};
use crate::scope::validate_name;

struct Entry<C> {
  info: ModuleInfo,
  module: Box<dyn Module<C>>,
  node: NodeIndex,
  deps: Vec<ModuleId>,
}

/// Registered modules, their metadata and dependency edges.
pub struct ModuleGraph<C> {
  graph: DiGraph<ModuleId, ()>,
  entries: Vec<Entry<C>>,
  by_name: HashMap<String, ModuleId>,
}

impl<C> Default for ModuleGraph<C> {
  fn default() -> Self {
    Self {
      graph: DiGraph::new(),
      entries: Vec::new(),
      by_name: HashMap::new(),
    }
  }
}

impl<C> ModuleGraph<C> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a module. Names must be unique and usable inside a qualified
  /// Ninja name.
  pub fn add_module(&mut self, info: ModuleInfo, module: Box<dyn Module<C>>) -> Result<ModuleId, GraphError> {
    validate_name(&info.name).map_err(|_| GraphError::InvalidName(info.name.clone()))?;
    if self.by_name.contains_key(&info.name) {
      return Err(GraphError::DuplicateName(info.name));
    }

    let id = ModuleId::new(self.entries.len());
    let node = self.graph.add_node(id);
    self.by_name.insert(info.name.clone(), id);
    self.entries.push(Entry {
      info,
      module,
      node,
      deps: Vec::new(),
    });
    Ok(id)
  }

  /// Make `module` depend on `dependency`. Repeated edges are ignored.
  pub fn add_dependency(&mut self, module: ModuleId, dependency: ModuleId) -> Result<(), GraphError> {
    let to = self.entry(module)?.node;
    let from = self.entry(dependency)?.node;
    if module == dependency {
      return Err(GraphError::SelfDependency(self.entries[module.index()].info.name.clone()));
    }

    let entry = &mut self.entries[module.index()];
    if entry.deps.contains(&dependency) {
      return Ok(());
    }
    entry.deps.push(dependency);
    self.graph.add_edge(from, to, ());
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// All module ids in registration order.
  pub fn ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
    (0..self.entries.len()).map(ModuleId::new)
  }

  pub fn lookup(&self, name: &str) -> Option<ModuleId> {
    self.by_name.get(name).copied()
  }

  pub fn info(&self, module: ModuleId) -> Option<&ModuleInfo> {
    self.entries.get(module.index()).map(|e| &e.info)
  }

  pub fn module(&self, module: ModuleId) -> Option<&dyn Module<C>> {
    self.entries.get(module.index()).map(|e| e.module.as_ref())
  }

  /// Direct dependencies in declaration order.
  pub fn dependencies(&self, module: ModuleId) -> &[ModuleId] {
    self
      .entries
      .get(module.index())
      .map(|e| e.deps.as_slice())
      .unwrap_or_default()
  }

  /// Modules that directly depend on `module`, in id order.
  pub fn dependents(&self, module: ModuleId) -> Vec<ModuleId> {
    let Some(entry) = self.entries.get(module.index()) else {
      return Vec::new();
    };

    let mut dependents: Vec<ModuleId> = self
      .graph
      .neighbors_directed(entry.node, Direction::Outgoing)
      .map(|idx| self.graph[idx])
      .collect();
    dependents.sort();
    dependents
  }

  /// Group modules into waves: every module's dependencies are in earlier
  /// waves. Ids within a wave are sorted.
  pub fn waves(&self) -> Result<Vec<Vec<ModuleId>>, GraphError> {
    let mut in_degree: HashMap<NodeIndex, usize> = self
      .graph
      .node_indices()
      .map(|idx| (idx, self.graph.neighbors_directed(idx, Direction::Incoming).count()))
      .collect();
    let mut remaining: HashSet<NodeIndex> = self.graph.node_indices().collect();
    let mut waves = Vec::new();

    while !remaining.is_empty() {
      let mut ready: Vec<NodeIndex> = remaining.iter().filter(|idx| in_degree[idx] == 0).copied().collect();
      if ready.is_empty() {
        let mut stuck: Vec<ModuleId> = remaining.iter().map(|&idx| self.graph[idx]).collect();
        stuck.sort();
        return Err(GraphError::Cycle(
          stuck.into_iter().map(|id| self.entries[id.index()].info.name.clone()).collect(),
        ));
      }

      for idx in &ready {
        remaining.remove(idx);
        for dependent in self.graph.neighbors_directed(*idx, Direction::Outgoing) {
          if let Some(deg) = in_degree.get_mut(&dependent) {
            *deg = deg.saturating_sub(1);
          }
        }
      }

      ready.sort_by_key(|&idx| self.graph[idx]);
      waves.push(ready.into_iter().map(|idx| self.graph[idx]).collect());
    }

    Ok(waves)
  }

  /// Every dependency reachable from `root` in post-order, each once.
  pub fn visit_deps_depth_first(&self, root: ModuleId, mut visit: impl FnMut(ModuleId)) -> Result<(), GraphError> {
    for dep in self.deps_depth_first_if(root, |_| true)? {
      visit(dep);
    }
    Ok(())
  }

  /// Post-order walk over the dependencies of `root`. A dependency rejected
  /// by `pred` is skipped along with everything only reachable through it.
  /// `root` itself is never included.
  pub fn deps_depth_first_if(
    &self,
    root: ModuleId,
    mut pred: impl FnMut(ModuleId) -> bool,
  ) -> Result<Vec<ModuleId>, GraphError> {
    self.entry(root)?;

    let mut order = Vec::new();
    let mut seen: HashSet<ModuleId> = HashSet::from([root]);
    let mut stack: Vec<(ModuleId, usize)> = vec![(root, 0)];

    while let Some((module, next)) = stack.pop() {
      let deps = &self.entries[module.index()].deps;
      if let Some(&dep) = deps.get(next) {
        stack.push((module, next + 1));
        if seen.insert(dep) && pred(dep) {
          stack.push((dep, 0));
        }
      } else if module != root {
        order.push(module);
      }
    }

    Ok(order)
  }

  fn entry(&self, module: ModuleId) -> Result<&Entry<C>, GraphError> {
    self.entries.get(module.index()).ok_or(GraphError::UnknownModule(module))
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::module::FnModule;
  use crate::position::Position;
  use crate::scope::{Package, PackageBuilder};

  fn pkg() -> Arc<Package> {
    PackageBuilder::new("app").unwrap().build()
  }

  fn add(graph: &mut ModuleGraph<()>, name: &str) -> ModuleId {
    graph
      .add_module(ModuleInfo::new(name, "test", Position::default()), Box::new(FnModule::empty(&pkg())))
      .unwrap()
  }

  fn names(graph: &ModuleGraph<()>, ids: &[ModuleId]) -> Vec<String> {
    ids.iter().map(|&id| graph.info(id).unwrap().name.clone()).collect()
  }

  mod registration {
    use super::*;

    #[test]
    fn duplicate_names_are_rejected() {
      let mut graph = ModuleGraph::new();
      add(&mut graph, "libfoo");

      let err = graph
        .add_module(ModuleInfo::new("libfoo", "test", Position::default()), Box::new(FnModule::empty(&pkg())))
        .unwrap_err();

      assert_eq!(err, GraphError::DuplicateName("libfoo".to_string()));
    }

    #[test]
    fn names_must_be_ninja_safe() {
      let mut graph = ModuleGraph::<()>::new();

      let err = graph
        .add_module(ModuleInfo::new("lib foo", "test", Position::default()), Box::new(FnModule::empty(&pkg())))
        .unwrap_err();

      assert_eq!(err, GraphError::InvalidName("lib foo".to_string()));
    }

    #[test]
    fn self_dependency_is_rejected() {
      let mut graph = ModuleGraph::new();
      let a = add(&mut graph, "a");

      assert_eq!(graph.add_dependency(a, a), Err(GraphError::SelfDependency("a".to_string())));
    }

    #[test]
    fn unknown_ids_are_rejected() {
      let mut graph = ModuleGraph::new();
      let a = add(&mut graph, "a");
      let ghost = ModuleId::new(7);

      assert_eq!(graph.add_dependency(a, ghost), Err(GraphError::UnknownModule(ghost)));
      assert!(graph.info(ghost).is_none());
    }

    #[test]
    fn repeated_edges_are_kept_once() {
      let mut graph = ModuleGraph::new();
      let a = add(&mut graph, "a");
      let b = add(&mut graph, "b");

      graph.add_dependency(a, b).unwrap();
      graph.add_dependency(a, b).unwrap();

      assert_eq!(graph.dependencies(a), [b]);
      assert_eq!(graph.dependents(b), vec![a]);
    }
  }

  mod waves {
    use super::*;

    #[test]
    fn dependencies_come_first() {
      let mut graph = ModuleGraph::new();
      let app = add(&mut graph, "app");
      let libfoo = add(&mut graph, "libfoo");
      let libbar = add(&mut graph, "libbar");
      let tool = add(&mut graph, "tool");
      graph.add_dependency(app, libfoo).unwrap();
      graph.add_dependency(app, tool).unwrap();
      graph.add_dependency(libfoo, libbar).unwrap();

      let waves = graph.waves().unwrap();

      assert_eq!(waves, vec![vec![libbar, tool], vec![libfoo], vec![app]]);
    }

    #[test]
    fn empty_graph_has_no_waves() {
      assert!(ModuleGraph::<()>::new().waves().unwrap().is_empty());
    }

    #[test]
    fn cycles_are_reported() {
      let mut graph = ModuleGraph::new();
      let a = add(&mut graph, "a");
      let b = add(&mut graph, "b");
      let c = add(&mut graph, "c");
      let leaf = add(&mut graph, "leaf");
      graph.add_dependency(a, b).unwrap();
      graph.add_dependency(b, c).unwrap();
      graph.add_dependency(c, a).unwrap();
      graph.add_dependency(a, leaf).unwrap();

      let err = graph.waves().unwrap_err();

      assert_eq!(
        err,
        GraphError::Cycle(vec!["a".to_string(), "b".to_string(), "c".to_string()])
      );
    }
  }

  mod traversal {
    use super::*;

    #[test]
    fn diamond_visits_shared_dependency_once() {
      let mut graph = ModuleGraph::new();
      let app = add(&mut graph, "app");
      let left = add(&mut graph, "left");
      let right = add(&mut graph, "right");
      let base = add(&mut graph, "base");
      graph.add_dependency(app, left).unwrap();
      graph.add_dependency(app, right).unwrap();
      graph.add_dependency(left, base).unwrap();
      graph.add_dependency(right, base).unwrap();

      let mut order = Vec::new();
      graph.visit_deps_depth_first(app, |id| order.push(id)).unwrap();

      assert_eq!(names(&graph, &order), vec!["base", "left", "right"]);
    }

    #[test]
    fn predicate_prunes_subtrees() {
      let mut graph = ModuleGraph::new();
      let app = add(&mut graph, "app");
      let left = add(&mut graph, "left");
      let right = add(&mut graph, "right");
      let base = add(&mut graph, "base");
      let hidden = add(&mut graph, "hidden");
      graph.add_dependency(app, left).unwrap();
      graph.add_dependency(app, right).unwrap();
      graph.add_dependency(left, hidden).unwrap();
      graph.add_dependency(right, base).unwrap();

      let order = graph.deps_depth_first_if(app, |id| id != left).unwrap();

      assert_eq!(names(&graph, &order), vec!["base", "right"]);
    }

    #[test]
    fn leaf_has_no_dependencies() {
      let mut graph = ModuleGraph::new();
      let leaf = add(&mut graph, "leaf");

      assert!(graph.deps_depth_first_if(leaf, |_| true).unwrap().is_empty());
    }

    #[test]
    fn unknown_root_is_an_error() {
      let graph = ModuleGraph::<()>::new();
      let ghost = ModuleId::new(0);

      assert_eq!(
        graph.deps_depth_first_if(ghost, |_| true),
        Err(GraphError::UnknownModule(ghost))
      );
    }
  }
}
