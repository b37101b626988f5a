//! Decisions and provider keys of source/prebuilt resolution.

use serde::Serialize;

use crate::module::ModuleId;
use crate::provider::ProviderKey;
use crate::selection::SelectionTable;

/// Why the legacy precedence chain decided the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyReason {
  /// The prebuilt has no backing artifacts on this variant.
  NoArtifacts,
  /// The prebuilt is not exported and namespace gating is on.
  NotExported,
  /// The source is disabled or absent.
  SourceUnavailable,
  /// A `use_source_config_var` value decided.
  ConfigVariable,
  /// The prebuilt's `prefer` flag decided.
  PreferFlag,
  /// The prebuilt is disabled on this variant.
  Disabled,
}

impl std::fmt::Display for LegacyReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      LegacyReason::NoArtifacts => "no artifacts",
      LegacyReason::NotExported => "not exported",
      LegacyReason::SourceUnavailable => "source unavailable",
      LegacyReason::ConfigVariable => "config variable",
      LegacyReason::PreferFlag => "prefer flag",
      LegacyReason::Disabled => "disabled",
    };
    f.write_str(s)
  }
}

/// Where a selection decision came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum DecisionSource {
  /// An explicit entry of the selection manifest, with the contributions
  /// modules that listed it.
  Manifest { contributions: Vec<String> },
  /// The legacy precedence chain.
  Legacy(LegacyReason),
}

impl DecisionSource {
  pub fn is_manifest(&self) -> bool {
    matches!(self, DecisionSource::Manifest { .. })
  }
}

impl std::fmt::Display for DecisionSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      DecisionSource::Manifest { contributions } => write!(f, "manifest {}", contributions.join(", ")),
      DecisionSource::Legacy(reason) => write!(f, "{}", reason),
    }
  }
}

/// Which family member a source module resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "use", content = "module", rename_all = "snake_case")]
pub enum Decision {
  UseSource,
  UsePrebuilt(ModuleId),
}

/// A recorded decision with its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
  pub decision: Decision,
  pub source: DecisionSource,
}

/// Written by link on a prebuilt whose source exists in the same variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceExists {
  pub source: ModuleId,
}

/// Written by select on a prebuilt without a source counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrebuiltUsable {
  pub usable: bool,
  pub source: DecisionSource,
}

pub const SOURCE_EXISTS: ProviderKey<SourceExists> = ProviderKey::new("prebuilt.source_exists");

pub const SELECTION_TABLE: ProviderKey<SelectionTable> = ProviderKey::new("prebuilt.selection_table");

pub const SELECTION: ProviderKey<Selection> = ProviderKey::new("prebuilt.selection");

pub const PREBUILT_USABLE: ProviderKey<PrebuiltUsable> = ProviderKey::new("prebuilt.usable");
