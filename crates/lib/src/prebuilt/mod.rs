//! Source/prebuilt resolution.
//!
//! Decides, for every family with both a source module and prebuilts, which
//! member survives into the output, and rewires dependents accordingly. Five
//! passes in the post-dependency phase:
//!
//! | pass | traversal | effect |
//! |------|-----------|--------|
//! | `prebuilt_rename` | parallel | unopposed prebuilts take their base name |
//! | `prebuilt_source_link` | parallel | source -> prebuilt and prebuilt -> manifest edges |
//! | `prebuilt_select` | bottom-up | selection table, per-source decision |
//! | `prebuilt_select_sweep` | parallel | hide members the manifest did not choose |
//! | `prebuilt_rewire` | parallel | redirect dependents, hide the loser |

mod link;
mod rename;
mod rewire;
mod select;
mod types;

use crate::graph::ModuleGraph;
use crate::module::ModuleId;
use crate::pipeline::{Phase, PipelineBuilder, RegistrationError, Traversal};

pub use select::use_prebuilt;
pub use types::*;

pub const RENAME_PASS: &str = "prebuilt_rename";
pub const LINK_PASS: &str = "prebuilt_source_link";
pub const SELECT_PASS: &str = "prebuilt_select";
pub const SWEEP_PASS: &str = "prebuilt_select_sweep";
pub const REWIRE_PASS: &str = "prebuilt_rewire";

/// Register the resolution passes at the end of the post-dependency phase.
pub fn register_prebuilt_passes(builder: &mut PipelineBuilder) -> Result<(), RegistrationError> {
  builder
    .register_pass(Phase::PostDependency, RENAME_PASS, Traversal::Parallel, rename::visit)?
    .register_pass(Phase::PostDependency, LINK_PASS, Traversal::Parallel, link::visit)?
    .register_pass(Phase::PostDependency, SELECT_PASS, Traversal::BottomUp, select::visit)?
    .register_pass(Phase::PostDependency, SWEEP_PASS, Traversal::Parallel, select::sweep)?
    .register_pass(Phase::PostDependency, REWIRE_PASS, Traversal::Parallel, rewire::visit)?;
  Ok(())
}

/// Prebuilts linked to the source module `source`, in edge order.
pub fn linked_prebuilts(graph: &ModuleGraph, source: ModuleId) -> Vec<ModuleId> {
  graph
    .direct_deps(source)
    .filter(|e| e.tag.prebuilt_link)
    .map(|e| e.to)
    .collect()
}
