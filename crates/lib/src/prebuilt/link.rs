//! `prebuilt_source_link`: connect prebuilts to their source and to the
//! selection manifest.

use tracing::trace;

use crate::diagnostics::{Candidate, ConflictKind, ModuleError};
use crate::graph::{DependencyTag, ModuleGraph};
use crate::module::{Module, ModuleId};
use crate::pipeline::{VisitContext, VisitError};

use super::types::{DecisionSource, LegacyReason, SOURCE_EXISTS, SourceExists};

pub fn visit(ctx: &mut VisitContext<'_>) -> Result<(), VisitError> {
  let module = ctx.module();
  if !module.is_prebuilt() || !module.enabled {
    return Ok(());
  }
  let graph = ctx.graph();
  let id = ctx.id();

  if let Some(manifest) = graph.selection_manifest()
    && !graph.has_dependency(id, manifest)
  {
    ctx.add_dependency(manifest, DependencyTag::SELECTION_MANIFEST);
  }

  if module.is_renamed() {
    return Ok(());
  }

  let Some(source) = family_source(graph, id, module)? else {
    return Ok(());
  };

  trace!(prebuilt = %module, source = %graph.module(source), "linking prebuilt to source");
  if !graph.has_dependency(source, id) {
    ctx.add_reverse_dependency(source, DependencyTag::PREBUILT);
  }
  ctx.set_provider(SOURCE_EXISTS, SourceExists { source });
  Ok(())
}

/// The source module `prebuilt` competes with, if any.
///
/// Only a source in the same variant links. A source in the common variant
/// next to an arch-specific prebuilt (or the reverse) would reach the output
/// alongside it, so that pairing is a conflict rather than "no source".
fn family_source(graph: &ModuleGraph, id: ModuleId, prebuilt: &Module) -> Result<Option<ModuleId>, ModuleError> {
  if let Some(source) = graph
    .lookup(&prebuilt.base_name, &prebuilt.variant)
    .filter(|s| graph.module(*s).is_source())
  {
    return Ok(Some(source));
  }

  let overlapping = graph
    .family_members(&prebuilt.base_name)
    .into_iter()
    .filter(|other| *other != id)
    .map(|other| graph.module(other))
    .find(|m| m.is_source() && (m.variant.is_common() || prebuilt.variant.is_common()));

  match overlapping {
    Some(source) => Err(ModuleError::Conflict {
      family: prebuilt.base_name.clone(),
      conflict: ConflictKind::VariantMismatch {
        source: source.variant.to_string(),
        prebuilt: prebuilt.variant.to_string(),
      },
      candidates: vec![Candidate {
        name: prebuilt.declared_name.clone(),
        source: DecisionSource::Legacy(LegacyReason::SourceUnavailable),
      }],
    }),
    None => Ok(None),
  }
}
