//! Pass registration.

use std::sync::Arc;

use crate::config::EngineConfig;

use super::Pipeline;
use super::context::VisitContext;
use super::types::{Phase, RegistrationError, Traversal, VisitError, VisitFn};

pub(crate) struct RegisteredPass {
  pub phase: Phase,
  pub name: &'static str,
  pub traversal: Traversal,
  pub visit: VisitFn,
}

/// Collects passes before a run.
///
/// The builder is consumed by [`PipelineBuilder::build`], so nothing can be
/// registered once a pipeline exists.
#[derive(Default)]
pub struct PipelineBuilder {
  passes: Vec<RegisteredPass>,
  config: EngineConfig,
}

impl PipelineBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_config(mut self, config: EngineConfig) -> Self {
    self.config = config;
    self
  }

  /// Register a pass at the end of `phase`.
  pub fn register_pass<F>(
    &mut self,
    phase: Phase,
    name: &'static str,
    traversal: Traversal,
    visit: F,
  ) -> Result<&mut Self, RegistrationError>
  where
    F: Fn(&mut VisitContext<'_>) -> Result<(), VisitError> + Send + Sync + 'static,
  {
    if self.passes.iter().any(|p| p.phase == phase && p.name == name) {
      return Err(RegistrationError::DuplicatePass { phase, name });
    }
    self.passes.push(RegisteredPass {
      phase,
      name,
      traversal,
      visit: Arc::new(visit),
    });
    Ok(self)
  }

  /// Freeze the registered passes, ordered by phase and then by registration.
  pub fn build(mut self) -> Pipeline {
    self.passes.sort_by_key(|p| p.phase);
    Pipeline::new(self.passes, self.config)
  }
}
