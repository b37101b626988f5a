//! Per-visit handle given to a pass.
//!
//! A visit sees the graph and provider store as they were when the pass (or,
//! for bottom-up passes, the current wave) started. Everything it changes is
//! queued here and applied by the pipeline after the barrier.

use std::sync::Arc;

use crate::config::ProductConfig;
use crate::diagnostics::ModuleError;
use crate::graph::{DependencyTag, ModuleGraph};
use crate::module::{Module, ModuleId};
use crate::provider::{ProviderKey, ProviderStore, ProviderWrite};

use super::types::VisitError;

/// A graph change requested by a visit.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
  /// Add `from -> to` unless an identical edge already exists.
  AddDependency {
    from: ModuleId,
    to: ModuleId,
    tag: DependencyTag,
  },
  /// Point every replaceable inbound edge of `from` at `to`.
  RedirectInbound { from: ModuleId, to: ModuleId },
  /// Register `module` under a new name in its variant.
  Rename { module: ModuleId, to: String },
  /// Replace `module` with one module per variant.
  Split { module: ModuleId, variants: Vec<Module> },
  SetHidden { module: ModuleId, hidden: bool },
  SetReplacedByPrebuilt { module: ModuleId, replaced: bool },
}

/// Everything a finished visit produced.
#[derive(Debug)]
pub(crate) struct VisitOutcome {
  pub module: ModuleId,
  pub result: Result<(), VisitError>,
  pub writes: Vec<ProviderWrite>,
  pub mutations: Vec<Mutation>,
  pub reported: Vec<ModuleError>,
}

pub struct VisitContext<'a> {
  id: ModuleId,
  pass: &'static str,
  graph: &'a ModuleGraph,
  providers: &'a ProviderStore,
  config: &'a ProductConfig,
  writes: Vec<ProviderWrite>,
  mutations: Vec<Mutation>,
  reported: Vec<ModuleError>,
}

impl<'a> VisitContext<'a> {
  pub(crate) fn new(
    id: ModuleId,
    pass: &'static str,
    graph: &'a ModuleGraph,
    providers: &'a ProviderStore,
    config: &'a ProductConfig,
  ) -> Self {
    Self {
      id,
      pass,
      graph,
      providers,
      config,
      writes: Vec::new(),
      mutations: Vec::new(),
      reported: Vec::new(),
    }
  }

  pub(crate) fn finish(self, result: Result<(), VisitError>) -> VisitOutcome {
    VisitOutcome {
      module: self.id,
      result,
      writes: self.writes,
      mutations: self.mutations,
      reported: self.reported,
    }
  }

  pub fn id(&self) -> ModuleId {
    self.id
  }

  pub fn module(&self) -> &'a Module {
    self.graph.module(self.id)
  }

  /// The pass-local snapshot of the graph.
  pub fn graph(&self) -> &'a ModuleGraph {
    self.graph
  }

  pub fn config(&self) -> &'a ProductConfig {
    self.config
  }

  pub fn pass(&self) -> &'static str {
    self.pass
  }

  /// A record on the visited module, committed before this visit started.
  pub fn provider<T: Send + Sync + 'static>(&self, key: ProviderKey<T>) -> Option<Arc<T>> {
    self.providers.get(self.id, key)
  }

  /// A record on a direct dependency. Modules that are not direct
  /// dependencies read as absent.
  pub fn dep_provider<T: Send + Sync + 'static>(&self, dep: ModuleId, key: ProviderKey<T>) -> Option<Arc<T>> {
    if !self.graph.has_dependency(self.id, dep) {
      return None;
    }
    self.providers.get(dep, key)
  }

  /// Publish a record on the visited module.
  pub fn set_provider<T: Send + Sync + 'static>(&mut self, key: ProviderKey<T>, value: T) {
    self.writes.push(ProviderWrite::new(self.id, key, value));
  }

  /// Publish a record that another module already holds, sharing its
  /// allocation.
  pub fn share_provider<T: Send + Sync + 'static>(&mut self, key: ProviderKey<T>, value: Arc<T>) {
    self.writes.push(ProviderWrite::shared(self.id, key, value));
  }

  /// Depend on `to`.
  pub fn add_dependency(&mut self, to: ModuleId, tag: DependencyTag) {
    self.mutations.push(Mutation::AddDependency { from: self.id, to, tag });
  }

  /// Make `from` depend on the visited module.
  pub fn add_reverse_dependency(&mut self, from: ModuleId, tag: DependencyTag) {
    self.mutations.push(Mutation::AddDependency { from, to: self.id, tag });
  }

  /// Move every inbound edge of the visited module to `to`, except edges
  /// excluded from replacement.
  pub fn redirect_inbound(&mut self, to: ModuleId) {
    self.mutations.push(Mutation::RedirectInbound { from: self.id, to });
  }

  pub fn rename(&mut self, to: &str) {
    self.mutations.push(Mutation::Rename {
      module: self.id,
      to: to.to_string(),
    });
  }

  /// Replace the visited module with one module per variant.
  pub fn split_variants(&mut self, variants: Vec<Module>) {
    self.mutations.push(Mutation::Split {
      module: self.id,
      variants,
    });
  }

  pub fn set_hidden(&mut self, module: ModuleId, hidden: bool) {
    self.mutations.push(Mutation::SetHidden { module, hidden });
  }

  pub fn set_replaced_by_prebuilt(&mut self, replaced: bool) {
    self.mutations.push(Mutation::SetReplacedByPrebuilt {
      module: self.id,
      replaced,
    });
  }

  /// Record an error on the visited module without discarding the visit's
  /// other effects.
  pub fn report_error(&mut self, error: ModuleError) {
    self.reported.push(error);
  }
}
