//! Phase scheduler.
//!
//! Runs registered passes phase by phase over the module graph:
//! - Parallel passes dispatch every visit into a bounded worker pool and wait
//!   at a single barrier
//! - Bottom-up passes walk the traversal DAG wave by wave, committing provider
//!   records after each wave so dependents see what their dependencies wrote
//! - Graph mutations are queued and applied once the whole pass has finished
//!
//! Module-scoped errors are collected; the module is skipped by every later
//! pass. A fatal error cancels the pool and aborts the run.

mod apply;
mod builder;
mod context;
mod types;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, ProductConfig};
use crate::diagnostics::{Diagnostic, Diagnostics, ModuleError};
use crate::graph::{ModuleGraph, TraversalDag};
use crate::module::ModuleId;
use crate::provider::{ProviderStore, ProviderWrite};

use builder::RegisteredPass;
use context::VisitOutcome;

pub use builder::PipelineBuilder;
pub use context::{Mutation, VisitContext};
pub use types::{PassInfo, Phase, PipelineError, RegistrationError, Resolution, Traversal, VisitError, VisitFn};

/// A frozen, ordered set of passes.
pub struct Pipeline {
  passes: Vec<RegisteredPass>,
  config: EngineConfig,
}

/// Shared state handed to the workers of one pass.
struct PassState {
  graph: Arc<ModuleGraph>,
  providers: Arc<ProviderStore>,
  product: Arc<ProductConfig>,
}

impl Pipeline {
  pub(crate) fn new(passes: Vec<RegisteredPass>, config: EngineConfig) -> Self {
    Self { passes, config }
  }

  pub fn builder() -> PipelineBuilder {
    PipelineBuilder::new()
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Registered passes in run order.
  pub fn passes(&self) -> Vec<PassInfo> {
    self
      .passes
      .iter()
      .map(|p| PassInfo {
        phase: p.phase,
        name: p.name,
        traversal: p.traversal,
      })
      .collect()
  }

  /// Run every phase over a freshly populated graph.
  pub async fn run(&self, graph: ModuleGraph, product: &ProductConfig) -> Result<Resolution, PipelineError> {
    self.resume(Resolution::new(graph), product).await
  }

  /// Run every phase again over the output of an earlier run.
  pub async fn resume(&self, resolution: Resolution, product: &ProductConfig) -> Result<Resolution, PipelineError> {
    let Resolution {
      graph,
      providers,
      mut diagnostics,
    } = resolution;

    info!(
      modules = graph.len(),
      passes = self.passes.len(),
      parallelism = self.config.parallelism,
      "starting pipeline"
    );

    let mut state = PassState {
      graph: Arc::new(graph),
      providers: Arc::new(providers),
      product: Arc::new(product.clone()),
    };
    let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));

    for phase in Phase::ALL {
      let passes: Vec<&RegisteredPass> = self.passes.iter().filter(|p| p.phase == phase).collect();
      if passes.is_empty() {
        continue;
      }
      info!(phase = %phase, passes = passes.len(), "starting phase");

      for pass in passes {
        self.run_pass(pass, &mut state, &mut diagnostics, &semaphore).await?;
      }
    }

    info!(
      modules = state.graph.len(),
      diagnostics = diagnostics.len(),
      "pipeline complete"
    );

    Ok(Resolution {
      graph: Arc::unwrap_or_clone(state.graph),
      providers: Arc::unwrap_or_clone(state.providers),
      diagnostics,
    })
  }

  async fn run_pass(
    &self,
    pass: &RegisteredPass,
    state: &mut PassState,
    diagnostics: &mut Diagnostics,
    semaphore: &Arc<Semaphore>,
  ) -> Result<(), PipelineError> {
    let waves = match pass.traversal {
      Traversal::Parallel => vec![state.graph.module_ids().collect::<Vec<_>>()],
      Traversal::BottomUp => TraversalDag::from_graph(&state.graph)
        .and_then(|dag| dag.waves())
        .map_err(|source| PipelineError::Graph {
          pass: pass.name,
          source,
        })?,
    };

    info!(
      pass = pass.name,
      traversal = %pass.traversal,
      waves = waves.len(),
      "running pass"
    );

    let mut written: HashSet<(ModuleId, &'static str)> = HashSet::new();
    let mut mutations = Vec::new();

    for (wave_idx, wave) in waves.into_iter().enumerate() {
      let targets: Vec<ModuleId> = wave.into_iter().filter(|id| !diagnostics.is_errored(*id)).collect();
      if targets.is_empty() {
        continue;
      }
      debug!(pass = pass.name, wave = wave_idx, modules = targets.len(), "visiting wave");

      let outcomes = visit_wave(pass, &targets, state, semaphore).await?;

      let mut writes = Vec::new();
      for outcome in outcomes {
        record_outcome(pass.name, outcome, &state.graph, diagnostics, &mut writes, &mut mutations);
      }
      commit_writes(pass.name, writes, &mut written, &mut state.providers)?;
    }

    let graph = Arc::make_mut(&mut state.graph);
    apply::apply_mutations(graph, mutations).map_err(|source| PipelineError::Graph {
      pass: pass.name,
      source,
    })?;

    Ok(())
  }
}

/// Visit every target on the worker pool and wait for all of them.
async fn visit_wave(
  pass: &RegisteredPass,
  targets: &[ModuleId],
  state: &PassState,
  semaphore: &Arc<Semaphore>,
) -> Result<Vec<VisitOutcome>, PipelineError> {
  let mut join_set = JoinSet::new();

  for &id in targets {
    let graph = Arc::clone(&state.graph);
    let providers = Arc::clone(&state.providers);
    let product = Arc::clone(&state.product);
    let visit = Arc::clone(&pass.visit);
    let semaphore = Arc::clone(semaphore);
    let name = pass.name;

    join_set.spawn(async move {
      let _permit = semaphore.acquire_owned().await.map_err(|e| PipelineError::Worker {
        pass: name,
        message: e.to_string(),
      })?;
      let mut ctx = VisitContext::new(id, name, &graph, &providers, &product);
      let result = (*visit)(&mut ctx);
      Ok::<_, PipelineError>(ctx.finish(result))
    });
  }

  let mut outcomes = Vec::with_capacity(targets.len());
  while let Some(joined) = join_set.join_next().await {
    let outcome = match joined {
      Ok(Ok(outcome)) => outcome,
      Ok(Err(e)) => {
        join_set.abort_all();
        return Err(e);
      }
      Err(e) => {
        join_set.abort_all();
        return Err(PipelineError::Worker {
          pass: pass.name,
          message: e.to_string(),
        });
      }
    };

    if let Err(VisitError::Fatal(message)) = &outcome.result {
      join_set.abort_all();
      return Err(PipelineError::Fatal {
        pass: pass.name,
        module: state.graph.module(outcome.module).to_string(),
        message: message.clone(),
      });
    }
    outcomes.push(outcome);
  }

  outcomes.sort_by_key(|o| o.module);
  Ok(outcomes)
}

/// Keep a visit's effects, or drop them if the visit failed.
fn record_outcome(
  pass: &'static str,
  outcome: VisitOutcome,
  graph: &ModuleGraph,
  diagnostics: &mut Diagnostics,
  writes: &mut Vec<ProviderWrite>,
  mutations: &mut Vec<Mutation>,
) {
  let module = graph.module(outcome.module);
  let mut record = |error: ModuleError| {
    warn!(module = %module, pass, error = %error, "module error");
    diagnostics.push(Diagnostic {
      module: outcome.module,
      name: module.name.clone(),
      variant: module.variant.clone(),
      pass: pass.to_string(),
      error,
    });
  };

  for error in outcome.reported {
    record(error);
  }

  match outcome.result {
    Ok(()) => {
      writes.extend(outcome.writes);
      mutations.extend(outcome.mutations);
    }
    Err(VisitError::Module(error)) => record(error),
    // Fatal outcomes never reach here.
    Err(VisitError::Fatal(_)) => {}
  }
}

fn commit_writes(
  pass: &'static str,
  writes: Vec<ProviderWrite>,
  written: &mut HashSet<(ModuleId, &'static str)>,
  providers: &mut Arc<ProviderStore>,
) -> Result<(), PipelineError> {
  if writes.is_empty() {
    return Ok(());
  }
  let store = Arc::make_mut(providers);
  for write in writes {
    if !written.insert((write.module, write.key)) {
      return Err(PipelineError::ProviderRewritten {
        pass,
        module: write.module,
        key: write.key,
      });
    }
    store.apply(write);
  }
  Ok(())
}
