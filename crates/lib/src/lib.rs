//! modgraph-lib: module graph resolution for prebuilt/source selection
//!
//! This crate provides the engine that turns a declared module graph into one
//! where every family has exactly one member reaching the output:
//! - `ModuleGraph`: modules, tagged dependency edges and the name registry
//! - `Pipeline`: phased passes over the graph, with provider records and
//!   deferred mutations
//! - `prebuilt`: the rename, link, select and rewire passes
//! - `Resolution`: the graph, providers and diagnostics a run produces

pub mod config;
pub mod consts;
pub mod deps;
pub mod diagnostics;
pub mod graph;
pub mod load;
pub mod module;
pub mod output;
pub mod pipeline;
pub mod prebuilt;
pub mod provider;
pub mod selection;
pub mod variants;
pub mod visibility;

use config::EngineConfig;
use pipeline::{Pipeline, PipelineBuilder, RegistrationError};

/// Register every built-in pass on `builder`.
pub fn register_builtin_passes(builder: &mut PipelineBuilder) -> Result<(), RegistrationError> {
  variants::register_variant_passes(builder)?;
  deps::register_dependency_passes(builder)?;
  prebuilt::register_prebuilt_passes(builder)?;
  visibility::register_visibility_passes(builder)?;
  Ok(())
}

/// The pipeline a build runs: every built-in pass, in phase order.
pub fn default_pipeline(config: EngineConfig) -> Result<Pipeline, RegistrationError> {
  let mut builder = PipelineBuilder::new().with_config(config);
  register_builtin_passes(&mut builder)?;
  Ok(builder.build())
}
