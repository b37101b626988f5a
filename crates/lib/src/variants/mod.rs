//! Architecture variant expansion.
//!
//! Runs in the pre-variant phase. A module that declares per-architecture
//! overrides is split into one module per architecture; every other module
//! stays in the common variant.

use tracing::trace;

use crate::module::Module;
use crate::pipeline::{Phase, PipelineBuilder, RegistrationError, Traversal, VisitContext, VisitError};

pub const ARCH_VARIANTS_PASS: &str = "arch_variants";

pub fn register_variant_passes(builder: &mut PipelineBuilder) -> Result<(), RegistrationError> {
  builder.register_pass(Phase::PreVariant, ARCH_VARIANTS_PASS, Traversal::Parallel, visit)?;
  Ok(())
}

/// The per-architecture variants of `module`, in architecture name order.
pub fn expand(module: &Module) -> Vec<Module> {
  module
    .arch
    .iter()
    .map(|(arch, overrides)| module.for_arch(arch, overrides))
    .collect()
}

fn visit(ctx: &mut VisitContext<'_>) -> Result<(), VisitError> {
  let module = ctx.module();
  if module.arch.is_empty() || !module.variant.is_common() {
    return Ok(());
  }
  let variants = expand(module);
  trace!(module = %module, variants = variants.len(), "splitting into arch variants");
  ctx.split_variants(variants);
  Ok(())
}
