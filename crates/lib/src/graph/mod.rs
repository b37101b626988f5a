//! The module graph.
//!
//! One node per module variant, typed dependency edges between them, and the
//! registry that maps external names to the module currently holding them.
//! Modules are never removed; losing variants are flagged hidden instead.

mod dag;
mod edge;
mod names;

use std::collections::HashMap;

use thiserror::Error;

use crate::module::{Module, ModuleId, ModuleRole, Variant};

pub use dag::TraversalDag;
pub use edge::{DependencyEdge, DependencyTag, EdgeId};
pub use names::{NameRegistry, Rename};

/// Structural errors in the module graph. All of them are pipeline-fatal.
#[derive(Debug, Error)]
pub enum GraphError {
  /// Two modules claim the same name in the same variant.
  #[error("module name {name} is already registered for variant {variant}")]
  NameCollision { name: String, variant: Variant },

  /// A rename batch moves a module onto a name vacated by the same batch.
  #[error("rename cycle through {name} in variant {variant}")]
  RenameCycle { name: String, variant: Variant },

  /// A rename names a module that does not hold the source name.
  #[error("module {module} does not hold name {name}")]
  NameNotHeld { name: String, module: ModuleId },

  /// Dependency edges form a cycle.
  #[error("dependency cycle detected")]
  CycleDetected,

  /// A split produced no variants.
  #[error("module {0} split into no variants")]
  EmptySplit(ModuleId),
}

#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
  modules: Vec<Module>,
  edges: Vec<DependencyEdge>,
  outgoing: Vec<Vec<EdgeId>>,
  incoming: Vec<Vec<EdgeId>>,
  names: NameRegistry,
  declared: HashMap<String, Vec<ModuleId>>,
  families: HashMap<String, Vec<ModuleId>>,
}

impl ModuleGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a module and register its name for its variant.
  pub fn add_module(&mut self, module: Module) -> Result<ModuleId, GraphError> {
    let id = ModuleId(self.modules.len());
    self.names.register(&module.name, &module.variant, id)?;
    self.declared.entry(module.declared_name.clone()).or_default().push(id);
    self.families.entry(module.base_name.clone()).or_default().push(id);
    self.modules.push(module);
    self.outgoing.push(Vec::new());
    self.incoming.push(Vec::new());
    Ok(id)
  }

  /// The module behind `id`.
  ///
  /// Ids are only handed out by this graph, so an unknown id is a bug in the
  /// caller and panics.
  pub fn module(&self, id: ModuleId) -> &Module {
    &self.modules[id.0]
  }

  pub(crate) fn module_mut(&mut self, id: ModuleId) -> &mut Module {
    &mut self.modules[id.0]
  }

  pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
    self.modules.iter().enumerate().map(|(i, m)| (ModuleId(i), m))
  }

  pub fn module_ids(&self) -> impl Iterator<Item = ModuleId> + use<> {
    (0..self.modules.len()).map(ModuleId)
  }

  pub fn len(&self) -> usize {
    self.modules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.modules.is_empty()
  }

  /// Add an edge: `from` depends on `to`.
  pub fn add_dependency(&mut self, from: ModuleId, to: ModuleId, tag: DependencyTag) -> EdgeId {
    let id = EdgeId(self.edges.len());
    self.edges.push(DependencyEdge { id, from, to, tag });
    self.outgoing[from.0].push(id);
    self.incoming[to.0].push(id);
    id
  }

  /// True if any edge from `from` to `to` exists.
  pub fn has_dependency(&self, from: ModuleId, to: ModuleId) -> bool {
    self.direct_deps(from).any(|e| e.to == to)
  }

  pub fn edge(&self, id: EdgeId) -> &DependencyEdge {
    &self.edges[id.0]
  }

  pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
    self.edges.iter()
  }

  pub fn edge_count(&self) -> usize {
    self.edges.len()
  }

  /// Outbound edges of `id`, in insertion order.
  pub fn direct_deps(&self, id: ModuleId) -> impl Iterator<Item = &DependencyEdge> {
    self.outgoing[id.0].iter().map(|e| &self.edges[e.0])
  }

  /// Inbound edges of `id`, in insertion order.
  pub fn dependents(&self, id: ModuleId) -> impl Iterator<Item = &DependencyEdge> {
    self.incoming[id.0].iter().map(|e| &self.edges[e.0])
  }

  /// Point an existing edge at a new target. The edge keeps its id and tag.
  pub fn redirect_edge(&mut self, edge: EdgeId, new_to: ModuleId) {
    let old_to = self.edges[edge.0].to;
    if old_to == new_to {
      return;
    }
    self.incoming[old_to.0].retain(|e| *e != edge);
    self.incoming[new_to.0].push(edge);
    self.edges[edge.0].to = new_to;
  }

  pub fn names(&self) -> &NameRegistry {
    &self.names
  }

  /// The module registered as `name` in `variant`.
  pub fn lookup(&self, name: &str, variant: &Variant) -> Option<ModuleId> {
    self.names.lookup(name, variant)
  }

  /// True if `name` is registered in any variant.
  pub fn lookup_any(&self, name: &str) -> bool {
    self.names.lookup_any(name)
  }

  /// Modules declared under `declared_name`, across all variants.
  pub fn modules_declared_as(&self, declared_name: &str) -> &[ModuleId] {
    self.declared.get(declared_name).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Every regular module sharing `base_name`, across all variants.
  pub fn family_members(&self, base_name: &str) -> Vec<ModuleId> {
    self
      .families
      .get(base_name)
      .map(|ids| {
        ids
          .iter()
          .copied()
          .filter(|id| self.modules[id.0].role == ModuleRole::Regular)
          .collect()
      })
      .unwrap_or_default()
  }

  /// The selection manifest module, if the graph has one.
  pub fn selection_manifest(&self) -> Option<ModuleId> {
    self
      .modules()
      .find(|(_, m)| m.role == ModuleRole::SelectionManifest)
      .map(|(id, _)| id)
  }

  /// Modules that reach the downstream output: enabled, exported, not hidden.
  pub fn output_modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
    self
      .modules()
      .filter(|(_, m)| m.enabled && m.exported_to_output && !m.hidden_from_output)
  }

  /// Apply a batch of renames to the registry and the modules.
  pub fn apply_renames(&mut self, batch: &[Rename]) -> Result<(), GraphError> {
    if batch.is_empty() {
      return Ok(());
    }
    self.names.rename_batch(batch)?;
    for rename in batch {
      self.modules[rename.module.0].name = rename.to.clone();
    }
    Ok(())
  }

  /// Replace `id` with one module per variant.
  ///
  /// The first variant takes over `id` and its edges; the others are new
  /// modules that copy its outbound edges. Returns the ids of all variants.
  pub fn split_module(&mut self, id: ModuleId, variants: Vec<Module>) -> Result<Vec<ModuleId>, GraphError> {
    let mut variants = variants.into_iter();
    let first = variants.next().ok_or(GraphError::EmptySplit(id))?;

    let old = &self.modules[id.0];
    let old_name = old.name.clone();
    let old_variant = old.variant.clone();
    self.names.unregister(&old_name, &old_variant);
    if let Err(e) = self.names.register(&first.name, &first.variant, id) {
      self.names.register(&old_name, &old_variant, id)?;
      return Err(e);
    }
    self.modules[id.0] = first;

    let outbound: Vec<(ModuleId, DependencyTag)> = self.direct_deps(id).map(|e| (e.to, e.tag)).collect();
    let mut ids = vec![id];
    for module in variants {
      let new_id = self.add_module(module)?;
      for (to, tag) in &outbound {
        self.add_dependency(new_id, *to, *tag);
      }
      ids.push(new_id);
    }
    Ok(ids)
  }
}
