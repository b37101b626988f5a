//! `prebuilt_rename`: give an unopposed prebuilt its family's name.

use tracing::trace;

use crate::module::ModuleKind;
use crate::pipeline::{VisitContext, VisitError};

/// Rename a prebuilt to its base name when nothing else holds that name.
///
/// Two prebuilts claiming the same base name in one variant both keep their
/// prefixed names, so no name is ever shared.
pub fn visit(ctx: &mut VisitContext<'_>) -> Result<(), VisitError> {
  let module = ctx.module();
  if module.kind != ModuleKind::Prebuilt || module.is_renamed() {
    return Ok(());
  }

  let graph = ctx.graph();
  if graph.lookup_any(&module.base_name) {
    return Ok(());
  }

  let rivals = graph
    .family_members(&module.base_name)
    .into_iter()
    .filter(|id| *id != ctx.id())
    .map(|id| graph.module(id))
    .any(|m| m.is_prebuilt() && m.variant == module.variant);
  if rivals {
    trace!(module = %module, "family has several prebuilts, keeping prefixed name");
    return Ok(());
  }

  trace!(module = %module, to = %module.base_name, "renaming prebuilt");
  ctx.rename(&module.base_name);
  Ok(())
}
