//! Module-scoped errors and their collection.
//!
//! Module-scoped and conflict errors are collected over the whole run rather
//! than stopping at the first one. A module with a recorded error is skipped by
//! every later pass, and a run with any diagnostic must not be used for output.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use crate::module::{ModuleId, Variant};
use crate::prebuilt::DecisionSource;

/// A family member competing in a conflict, with the origin of its claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
  pub name: String,
  pub source: DecisionSource,
}

impl std::fmt::Display for Candidate {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} ({})", self.name, self.source)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictKind {
  /// More than one prebuilt selected for one source.
  MultipleSelected,
  /// Two contributions modules name the same family.
  DuplicateManifestEntry,
  /// The selected prebuilt installs to a different partition than its source.
  PartitionMismatch { source: String, prebuilt: String },
  /// The source exists only in a variant that overlaps the prebuilt's, so
  /// neither could stand in for the other.
  VariantMismatch { source: String, prebuilt: String },
}

impl std::fmt::Display for ConflictKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ConflictKind::MultipleSelected => f.write_str("multiple prebuilts selected"),
      ConflictKind::DuplicateManifestEntry => f.write_str("family listed by more than one contributions module"),
      ConflictKind::PartitionMismatch { source, prebuilt } => {
        write!(f, "partition is different: source {source}, prebuilt {prebuilt}")
      }
      ConflictKind::VariantMismatch { source, prebuilt } => {
        write!(f, "variant is different: source {source}, prebuilt {prebuilt}")
      }
    }
  }
}

/// An error attached to a single module.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleError {
  /// A declared dependency names no module.
  #[error("depends on undefined module {dep}")]
  MissingDependency { dep: String },

  /// A declared dependency exists, but not in a variant this module can use.
  #[error("dependency {dep} has no variant {variant}")]
  MissingVariant { dep: String, variant: Variant },

  /// A `use_source_config_var` value is not a boolean.
  #[error("{var} must be either \"true\" or \"false\", found {value:?}")]
  MalformedConfigVariable { var: String, value: String },

  /// Family members disagree about who is selected.
  #[error("{conflict} in family {family}: {}", join_candidates(.candidates))]
  Conflict {
    family: String,
    conflict: ConflictKind,
    candidates: Vec<Candidate>,
  },

  /// A contributions module lists a name that is not a module.
  #[error("{contributions} lists {name}, which is not a module")]
  UnknownContent { name: String, contributions: String },

  /// The selection manifest depends on something other than contributions.
  #[error("{name} is not a contributions module")]
  NotContributions { name: String },

  /// A dependency does not admit this module's package.
  #[error("depends on {dep} which is not visible to this module")]
  NotVisible { dep: String },

  /// A visibility rule cannot be parsed or is combined illegally.
  #[error("invalid visibility rule {rule:?}: {reason}")]
  InvalidVisibilityRule { rule: String, reason: String },
}

fn join_candidates(candidates: &[Candidate]) -> String {
  candidates.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// A module error with the place it was raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
  pub module: ModuleId,
  pub name: String,
  pub variant: Variant,
  pub pass: String,
  pub error: ModuleError,
}

impl std::fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if self.variant.is_common() {
      write!(f, "{} ({}): {}", self.name, self.pass, self.error)
    } else {
      write!(f, "{}[{}] ({}): {}", self.name, self.variant, self.pass, self.error)
    }
  }
}

/// Diagnostics collected over a run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
  entries: Vec<Diagnostic>,
  errored: HashSet<ModuleId>,
}

impl Diagnostics {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, diagnostic: Diagnostic) {
    self.errored.insert(diagnostic.module);
    self.entries.push(diagnostic);
  }

  /// True if `module` has a recorded error.
  pub fn is_errored(&self, module: ModuleId) -> bool {
    self.errored.contains(&module)
  }

  pub fn for_module(&self, module: ModuleId) -> impl Iterator<Item = &Diagnostic> {
    self.entries.iter().filter(move |d| d.module == module)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
