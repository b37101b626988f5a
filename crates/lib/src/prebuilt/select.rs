//! `prebuilt_select` and `prebuilt_select_sweep`.
//!
//! Select runs bottom-up: the manifest module builds the selection table
//! first, prebuilts that depend on it re-publish the table, and sources read
//! it from their linked prebuilts. Each source then decides which family
//! member survives for its variant.
//!
//! # Precedence
//!
//! For a source with linked prebuilts:
//! 1. The manifest names the source: source
//! 2. The manifest names a prebuilt with artifacts: that prebuilt
//! 3. Otherwise, per prebuilt, the legacy chain: no artifacts, not exported
//!    under namespace gating, source disabled, `use_source_config_var`, then
//!    `prefer`
//!
//! More than one surviving prebuilt is a conflict; nothing is chosen.

use std::sync::Arc;

use tracing::trace;

use crate::config::ProductConfig;
use crate::diagnostics::{Candidate, ConflictKind, ModuleError};
use crate::module::{Module, ModuleId, ModuleRole};
use crate::pipeline::{VisitContext, VisitError};
use crate::selection::{SelectionTable, build_table, claim_candidate};

use super::linked_prebuilts;
use super::types::{
  Decision, DecisionSource, LegacyReason, PREBUILT_USABLE, PrebuiltUsable, SELECTION, SELECTION_TABLE, SOURCE_EXISTS,
  Selection,
};

/// Whether a prebuilt should stand in for `source`, and why.
///
/// `source` is `None` for a prebuilt without a source counterpart.
pub fn use_prebuilt(
  prebuilt: &Module,
  source: Option<&Module>,
  table: Option<&SelectionTable>,
  config: &ProductConfig,
) -> Result<(bool, DecisionSource), ModuleError> {
  if let Some(entry) = table.and_then(|t| t.selected(&prebuilt.base_name)) {
    let manifest = DecisionSource::Manifest {
      contributions: vec![entry.contributions.clone()],
    };
    if entry.selected != prebuilt.declared_name {
      return Ok((false, manifest));
    }
    if prebuilt.has_artifacts() && prebuilt.enabled {
      return Ok((true, manifest));
    }
  }

  if !prebuilt.enabled {
    return Ok((false, DecisionSource::Legacy(LegacyReason::Disabled)));
  }
  if !prebuilt.has_artifacts() {
    return Ok((false, DecisionSource::Legacy(LegacyReason::NoArtifacts)));
  }
  if config.namespace_gating && !prebuilt.exported_to_output {
    return Ok((false, DecisionSource::Legacy(LegacyReason::NotExported)));
  }
  if source.is_none_or(|s| !s.enabled) {
    return Ok((true, DecisionSource::Legacy(LegacyReason::SourceUnavailable)));
  }

  let props = prebuilt.prebuilt.as_ref();
  if let Some(var) = props.and_then(|p| p.use_source_config_var.as_ref()) {
    let reason = DecisionSource::Legacy(LegacyReason::ConfigVariable);
    return match config.vendor_var(var) {
      None | Some("false") => Ok((true, reason)),
      Some("true") => Ok((false, reason)),
      Some(value) => Err(ModuleError::MalformedConfigVariable {
        var: var.to_string(),
        value: value.to_string(),
      }),
    };
  }

  let prefer = props.is_some_and(|p| p.prefer);
  Ok((prefer, DecisionSource::Legacy(LegacyReason::PreferFlag)))
}

/// The selection table visible to the visited module, if any.
///
/// Read from the module's own record first, then across its manifest link
/// (prebuilts) or its prebuilt links (sources). Other dependencies never
/// carry the table.
pub(crate) fn visible_table(ctx: &VisitContext<'_>) -> Option<Arc<SelectionTable>> {
  if let Some(table) = ctx.provider(SELECTION_TABLE) {
    return Some(table);
  }
  ctx
    .graph()
    .direct_deps(ctx.id())
    .filter(|e| e.tag.selection_manifest_link || e.tag.prebuilt_link)
    .find_map(|e| ctx.dep_provider(e.to, SELECTION_TABLE))
}

pub fn visit(ctx: &mut VisitContext<'_>) -> Result<(), VisitError> {
  let module = ctx.module();
  match module.role {
    ModuleRole::SelectionManifest => select_manifest(ctx),
    ModuleRole::Contributions => Ok(()),
    ModuleRole::Regular if module.is_prebuilt() => select_prebuilt(ctx),
    ModuleRole::Regular => select_source(ctx),
  }
}

fn select_manifest(ctx: &mut VisitContext<'_>) -> Result<(), VisitError> {
  let (table, errors) = build_table(ctx.graph(), ctx.id(), ctx.config().allow_missing_dependencies);
  trace!(families = table.len(), errors = errors.len(), "built selection table");
  for error in errors {
    ctx.report_error(error);
  }
  ctx.set_provider(SELECTION_TABLE, table);
  Ok(())
}

fn conflict_from_claims(family: &str, table: &SelectionTable) -> ModuleError {
  ModuleError::Conflict {
    family: family.to_string(),
    conflict: ConflictKind::MultipleSelected,
    candidates: table.claims(family).iter().map(claim_candidate).collect(),
  }
}

fn select_prebuilt(ctx: &mut VisitContext<'_>) -> Result<(), VisitError> {
  let module = ctx.module();
  let table = visible_table(ctx);
  if let Some(table) = &table {
    ctx.share_provider(SELECTION_TABLE, Arc::clone(table));
  }

  // Decided by the source's visit.
  if ctx.provider(SOURCE_EXISTS).is_some() {
    return Ok(());
  }

  if let Some(t) = &table
    && t.is_conflicted(&module.base_name)
  {
    return Err(conflict_from_claims(&module.base_name, t).into());
  }

  let graph = ctx.graph();
  let config = ctx.config();
  let (usable, source) = use_prebuilt(module, None, table.as_deref(), config)?;

  // Sibling prebuilts of a source-less family compete for the same slot.
  if usable {
    let mut candidates = vec![Candidate {
      name: module.declared_name.clone(),
      source: source.clone(),
    }];
    for sibling in graph.family_members(&module.base_name) {
      let other = graph.module(sibling);
      if sibling == ctx.id() || !other.is_prebuilt() || other.variant != module.variant {
        continue;
      }
      if let Ok((true, why)) = use_prebuilt(other, None, table.as_deref(), config) {
        candidates.push(Candidate {
          name: other.declared_name.clone(),
          source: why,
        });
      }
    }
    if candidates.len() > 1 {
      candidates.sort_by(|a, b| a.name.cmp(&b.name));
      return Err(
        ModuleError::Conflict {
          family: module.base_name.clone(),
          conflict: ConflictKind::MultipleSelected,
          candidates,
        }
        .into(),
      );
    }
  }

  trace!(prebuilt = %module, usable, source = %source, "source-less prebuilt decided");
  if !usable {
    let id = ctx.id();
    ctx.set_hidden(id, true);
  }
  ctx.set_provider(PREBUILT_USABLE, PrebuiltUsable { usable, source });
  Ok(())
}

fn select_source(ctx: &mut VisitContext<'_>) -> Result<(), VisitError> {
  let module = ctx.module();
  let graph = ctx.graph();
  let prebuilts = linked_prebuilts(graph, ctx.id());
  if prebuilts.is_empty() {
    return Ok(());
  }

  let table = visible_table(ctx);
  let family = &module.base_name;

  if let Some(t) = &table {
    if t.is_conflicted(family) {
      return Err(conflict_from_claims(family, t).into());
    }
    if let Some(entry) = t.selected(family)
      && entry.selected == module.declared_name
    {
      let source = DecisionSource::Manifest {
        contributions: vec![entry.contributions.clone()],
      };
      return record(ctx, &prebuilts, Decision::UseSource, source);
    }
  }

  let mut chosen: Vec<(ModuleId, DecisionSource)> = Vec::new();
  let mut first_reason = None;
  for &id in &prebuilts {
    let (usable, why) = use_prebuilt(graph.module(id), Some(module), table.as_deref(), ctx.config())?;
    trace!(source = %module, prebuilt = %graph.module(id), usable, why = %why, "evaluated prebuilt");
    if usable {
      chosen.push((id, why));
    } else if first_reason.is_none() {
      first_reason = Some(why);
    }
  }

  match chosen.as_slice() {
    [] => {
      let source = first_reason.unwrap_or(DecisionSource::Legacy(LegacyReason::PreferFlag));
      record(ctx, &prebuilts, Decision::UseSource, source)
    }
    [(winner, why)] => {
      let prebuilt = graph.module(*winner);
      if prebuilt.partition != module.partition {
        return Err(
          ModuleError::Conflict {
            family: family.clone(),
            conflict: ConflictKind::PartitionMismatch {
              source: module.partition.clone(),
              prebuilt: prebuilt.partition.clone(),
            },
            candidates: vec![Candidate {
              name: prebuilt.declared_name.clone(),
              source: why.clone(),
            }],
          }
          .into(),
        );
      }
      record(ctx, &prebuilts, Decision::UsePrebuilt(*winner), why.clone())
    }
    many => Err(
      ModuleError::Conflict {
        family: family.clone(),
        conflict: ConflictKind::MultipleSelected,
        candidates: many
          .iter()
          .map(|(id, why)| Candidate {
            name: graph.module(*id).declared_name.clone(),
            source: why.clone(),
          })
          .collect(),
      }
      .into(),
    ),
  }
}

/// Publish the decision and hide the prebuilts that lost.
fn record(
  ctx: &mut VisitContext<'_>,
  prebuilts: &[ModuleId],
  decision: Decision,
  source: DecisionSource,
) -> Result<(), VisitError> {
  for &id in prebuilts {
    if decision != Decision::UsePrebuilt(id) {
      ctx.set_hidden(id, true);
    }
  }
  trace!(source_module = %ctx.module(), decision = ?decision, why = %source, "selected");
  ctx.set_provider(SELECTION, Selection { decision, source });
  Ok(())
}

/// `prebuilt_select_sweep`: hide every family member the manifest did not
/// choose, once the manifest has chosen a viable member for this variant.
pub fn sweep(ctx: &mut VisitContext<'_>) -> Result<(), VisitError> {
  let module = ctx.module();
  if module.role != ModuleRole::Regular || module.hidden_from_output {
    return Ok(());
  }
  let Some(table) = visible_table(ctx) else {
    return Ok(());
  };
  if table.is_selected(&module.base_name, &module.declared_name) {
    return Ok(());
  }
  let Some(entry) = table.selected(&module.base_name) else {
    return Ok(());
  };

  let graph = ctx.graph();
  let viable = graph
    .modules_declared_as(&entry.selected)
    .iter()
    .map(|id| graph.module(*id))
    .any(|m| m.variant == module.variant && m.enabled && (m.is_source() || m.has_artifacts()));
  if viable {
    trace!(module = %module, selected = %entry.selected, "hidden by manifest selection");
    let id = ctx.id();
    ctx.set_hidden(id, true);
  }
  Ok(())
}
