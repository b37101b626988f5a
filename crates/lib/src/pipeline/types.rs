//! Types for pass registration and pipeline execution.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::diagnostics::{Diagnostics, ModuleError};
use crate::graph::{GraphError, ModuleGraph};
use crate::module::ModuleId;
use crate::provider::ProviderStore;

use super::context::VisitContext;

/// Fixed-order stages of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  PreVariant,
  PreDependency,
  PostDependency,
  Final,
}

impl Phase {
  /// Every phase, in run order.
  pub const ALL: [Phase; 4] = [
    Phase::PreVariant,
    Phase::PreDependency,
    Phase::PostDependency,
    Phase::Final,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Phase::PreVariant => "pre_variant",
      Phase::PreDependency => "pre_dependency",
      Phase::PostDependency => "post_dependency",
      Phase::Final => "final",
    }
  }
}

impl std::fmt::Display for Phase {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// How a pass walks the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Traversal {
  /// All visits run concurrently behind one barrier.
  Parallel,
  /// Dependencies are visited, and their provider records committed, before
  /// their dependents.
  BottomUp,
}

impl std::fmt::Display for Traversal {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Traversal::Parallel => f.write_str("parallel"),
      Traversal::BottomUp => f.write_str("bottom_up"),
    }
  }
}

/// Outcome of a failed visit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VisitError {
  /// Recorded against the visited module; sibling visits continue.
  #[error(transparent)]
  Module(#[from] ModuleError),

  /// Aborts the run.
  #[error("{0}")]
  Fatal(String),
}

/// A pass body, invoked once per module.
pub type VisitFn = Arc<dyn Fn(&mut VisitContext<'_>) -> Result<(), VisitError> + Send + Sync>;

/// Errors while building a pipeline.
#[derive(Debug, Error)]
pub enum RegistrationError {
  /// A pass name is registered twice in one phase.
  #[error("pass {name} is already registered in phase {phase}")]
  DuplicatePass { phase: Phase, name: &'static str },
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// A structural graph invariant was violated.
  #[error("graph error in pass {pass}: {source}")]
  Graph {
    pass: &'static str,
    #[source]
    source: GraphError,
  },

  /// A provider record was written twice in one pass.
  #[error("provider {key} on module {module} written twice in pass {pass}")]
  ProviderRewritten {
    pass: &'static str,
    module: ModuleId,
    key: &'static str,
  },

  /// A visit reported a pipeline-fatal error.
  #[error("fatal error in pass {pass} on module {module}: {message}")]
  Fatal {
    pass: &'static str,
    module: String,
    message: String,
  },

  /// A worker task failed to run to completion.
  #[error("worker failed in pass {pass}: {message}")]
  Worker { pass: &'static str, message: String },
}

/// Description of one registered pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassInfo {
  pub phase: Phase,
  pub name: &'static str,
  pub traversal: Traversal,
}

/// The outcome of a run: the transformed graph, its provider records, and
/// every module-scoped diagnostic.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
  pub graph: ModuleGraph,
  pub providers: ProviderStore,
  pub diagnostics: Diagnostics,
}

impl Resolution {
  pub fn new(graph: ModuleGraph) -> Self {
    Self {
      graph,
      providers: ProviderStore::new(),
      diagnostics: Diagnostics::new(),
    }
  }

  /// Returns true if no module-scoped or conflict error was recorded.
  pub fn is_usable(&self) -> bool {
    self.diagnostics.is_empty()
  }
}
