//! Dependency resolution.
//!
//! Runs in the pre-dependency phase and turns declared dependency names into
//! edges:
//! - same variant first, then the only variant of the target
//! - a name with no module falls back to its `prebuilt_` spelling, since that
//!   prebuilt takes over the name at rename
//! - `exclude_from_replacement` dependencies get a pinned edge

use crate::diagnostics::ModuleError;
use crate::graph::{DependencyTag, ModuleGraph};
use crate::module::{ModuleId, Variant, prebuilt_name};
use crate::pipeline::{Phase, PipelineBuilder, RegistrationError, Traversal, VisitContext, VisitError};
use crate::provider::ProviderKey;
use crate::selection;

pub const DEPS_PASS: &str = "deps";
pub const SELECTION_MANIFEST_DEPS_PASS: &str = "selection_manifest_deps";

/// Written once a module's declared dependencies have edges, so that a
/// resumed run does not add them again.
pub const DEPS_RESOLVED: ProviderKey<usize> = ProviderKey::new("deps.resolved");

pub fn register_dependency_passes(builder: &mut PipelineBuilder) -> Result<(), RegistrationError> {
  builder
    .register_pass(Phase::PreDependency, DEPS_PASS, Traversal::Parallel, visit)?
    .register_pass(
      Phase::PreDependency,
      SELECTION_MANIFEST_DEPS_PASS,
      Traversal::Parallel,
      selection::manifest_deps_visit,
    )?;
  Ok(())
}

/// Resolve `name` as seen from a module in `variant`.
pub fn resolve(graph: &ModuleGraph, name: &str, variant: &Variant) -> Result<ModuleId, ModuleError> {
  match resolve_exact(graph, name, variant) {
    Err(ModuleError::MissingDependency { .. }) => {
      resolve_exact(graph, &prebuilt_name(name), variant).map_err(|e| match e {
        ModuleError::MissingDependency { .. } => ModuleError::MissingDependency { dep: name.to_string() },
        other => other,
      })
    }
    other => other,
  }
}

fn resolve_exact(graph: &ModuleGraph, name: &str, variant: &Variant) -> Result<ModuleId, ModuleError> {
  if let Some(id) = graph.lookup(name, variant) {
    return Ok(id);
  }
  match graph.names().variants(name).as_slice() {
    [] => Err(ModuleError::MissingDependency { dep: name.to_string() }),
    [(_, id)] => Ok(*id),
    _ => Err(ModuleError::MissingVariant {
      dep: name.to_string(),
      variant: variant.clone(),
    }),
  }
}

fn visit(ctx: &mut VisitContext<'_>) -> Result<(), VisitError> {
  let module = ctx.module();
  if module.declared_deps.is_empty() || ctx.provider(DEPS_RESOLVED).is_some() {
    return Ok(());
  }

  let graph = ctx.graph();
  let allow_missing = ctx.config().allow_missing_dependencies;
  let mut edges = Vec::with_capacity(module.declared_deps.len());
  for dep in &module.declared_deps {
    match resolve(graph, &dep.name, &module.variant) {
      Ok(id) if id == ctx.id() => {}
      Ok(id) => {
        let tag = if dep.exclude_from_replacement {
          DependencyTag::NO_REPLACE
        } else {
          DependencyTag::DEPENDENCY
        };
        edges.push((id, tag));
      }
      Err(ModuleError::MissingDependency { .. }) if allow_missing => {}
      Err(e) => return Err(e.into()),
    }
  }

  let count = edges.len();
  for (id, tag) in edges {
    ctx.add_dependency(id, tag);
  }
  ctx.set_provider(DEPS_RESOLVED, count);
  Ok(())
}
