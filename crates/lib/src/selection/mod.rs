//! Selection manifest collaborator.
//!
//! Contributions modules list the explicit source or prebuilt choice for the
//! families of one API domain. The selection manifest module depends on the
//! contributions the product enables and folds their contents into a
//! [`SelectionTable`], which the prebuilt passes consume read-only.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::trace;

use crate::diagnostics::{Candidate, ConflictKind, ModuleError};
use crate::graph::{DependencyTag, ModuleGraph};
use crate::module::{ModuleId, ModuleRole, strip_prebuilt_prefix};
use crate::pipeline::{VisitContext, VisitError};
use crate::prebuilt::DecisionSource;

/// One explicit choice for a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionEntry {
  /// The chosen module, as declared: `libc` or `prebuilt_libc`.
  pub selected: String,
  /// The contributions module that listed it.
  pub contributions: String,
  pub api_domain: String,
}

/// Family name to explicit choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionTable {
  entries: BTreeMap<String, SelectionEntry>,
  /// Families claimed more than once, with every claim.
  conflicted: BTreeMap<String, Vec<SelectionEntry>>,
}

impl SelectionTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a claim. Returns the earlier claim if the family was already taken;
  /// the family is then conflicted and has no selection.
  pub fn add(&mut self, family: &str, entry: SelectionEntry) -> Option<SelectionEntry> {
    if let Some(claims) = self.conflicted.get_mut(family) {
      let first = claims.first().cloned();
      claims.push(entry);
      return first;
    }
    match self.entries.remove(family) {
      Some(previous) => {
        self
          .conflicted
          .insert(family.to_string(), vec![previous.clone(), entry]);
        Some(previous)
      }
      None => {
        self.entries.insert(family.to_string(), entry);
        None
      }
    }
  }

  /// The explicit choice for `family`, unless it is conflicted.
  pub fn selected(&self, family: &str) -> Option<&SelectionEntry> {
    self.entries.get(family)
  }

  /// True if `name` is the explicit choice for `family`.
  pub fn is_selected(&self, family: &str, name: &str) -> bool {
    self.selected(family).is_some_and(|e| e.selected == name)
  }

  pub fn is_conflicted(&self, family: &str) -> bool {
    self.conflicted.contains_key(family)
  }

  /// Every claim on a conflicted family.
  pub fn claims(&self, family: &str) -> &[SelectionEntry] {
    self.conflicted.get(family).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty() && self.conflicted.is_empty()
  }
}

/// Resolve the family a listed content belongs to.
///
/// Names resolve through the declared-name index so that prebuilts with a
/// `source_module_name` land in the right family.
fn family_of(graph: &ModuleGraph, content: &str) -> Option<String> {
  graph
    .modules_declared_as(content)
    .first()
    .map(|id| graph.module(*id).base_name.clone())
}

/// Build the table for the manifest module `manifest`.
///
/// Errors do not stop the build: the table is always complete, with duplicate
/// families marked conflicted.
pub fn build_table(graph: &ModuleGraph, manifest: ModuleId, allow_missing: bool) -> (SelectionTable, Vec<ModuleError>) {
  let mut table = SelectionTable::new();
  let mut errors = Vec::new();

  for edge in graph.direct_deps(manifest) {
    let child = graph.module(edge.to);
    let Some(props) = child.contributions.as_ref().filter(|_| child.role == ModuleRole::Contributions) else {
      errors.push(ModuleError::NotContributions {
        name: child.name.clone(),
      });
      continue;
    };

    for content in &props.contents {
      let family = match family_of(graph, content) {
        Some(family) => family,
        None => {
          if !allow_missing {
            errors.push(ModuleError::UnknownContent {
              name: content.clone(),
              contributions: child.name.clone(),
            });
          }
          strip_prebuilt_prefix(content).to_string()
        }
      };

      let entry = SelectionEntry {
        selected: content.clone(),
        contributions: child.name.clone(),
        api_domain: props.api_domain.clone(),
      };
      trace!(family = %family, selected = %content, contributions = %child.name, "selection entry");

      if let Some(previous) = table.add(&family, entry.clone()) {
        errors.push(ModuleError::Conflict {
          family: family.clone(),
          conflict: ConflictKind::DuplicateManifestEntry,
          candidates: vec![claim_candidate(&previous), claim_candidate(&entry)],
        });
      }
    }
  }

  (table, errors)
}

/// A manifest claim as a conflict candidate.
pub fn claim_candidate(entry: &SelectionEntry) -> Candidate {
  Candidate {
    name: entry.selected.clone(),
    source: DecisionSource::Manifest {
      contributions: vec![entry.contributions.clone()],
    },
  }
}

/// `selection_manifest_deps`: connect the manifest module to the
/// contributions the product enables.
pub fn manifest_deps_visit(ctx: &mut VisitContext<'_>) -> Result<(), VisitError> {
  let module = ctx.module();
  if module.role != ModuleRole::SelectionManifest {
    return Ok(());
  }

  let graph = ctx.graph();
  let mut targets = Vec::new();
  for name in &ctx.config().selected_contributions {
    let target = graph.lookup(name, &module.variant).or_else(|| {
      let variants = graph.names().variants(name);
      match variants.as_slice() {
        [(_, id)] => Some(*id),
        _ => None,
      }
    });
    match target {
      Some(id) if graph.has_dependency(ctx.id(), id) => {}
      Some(id) => targets.push(id),
      None if ctx.config().allow_missing_dependencies => {}
      None => return Err(ModuleError::MissingDependency { dep: name.clone() }.into()),
    }
  }

  for id in targets {
    ctx.add_dependency(id, DependencyTag::CONTRIBUTION);
  }
  Ok(())
}
