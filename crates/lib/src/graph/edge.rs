//! Dependency edges and their capability tags.

use serde::Serialize;

use crate::module::ModuleId;

/// Index of an edge inside a [`ModuleGraph`](super::ModuleGraph).
///
/// Edge ids are stable: redirecting an edge changes its target, never its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EdgeId(pub usize);

/// Capability flags attached to a dependency edge.
///
/// Tags are plain values; behavior is decided by inspecting the flags, never
/// by the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DependencyTag {
  pub label: &'static str,

  /// Rewire must leave this edge pointing at its original target.
  pub excluded_from_replacement: bool,

  /// Visibility rules are not checked across this edge.
  pub excluded_from_visibility_enforcement: bool,

  /// The target does not count as content of the depending module.
  pub excluded_from_content_membership: bool,

  /// The edge carries the selection table from the manifest module.
  pub selection_manifest_link: bool,

  /// The edge links a source module to a prebuilt of its family.
  pub prebuilt_link: bool,
}

impl DependencyTag {
  const fn plain(label: &'static str) -> Self {
    Self {
      label,
      excluded_from_replacement: false,
      excluded_from_visibility_enforcement: false,
      excluded_from_content_membership: false,
      selection_manifest_link: false,
      prebuilt_link: false,
    }
  }

  /// An ordinary declared dependency.
  pub const DEPENDENCY: Self = Self::plain("dep");

  /// A declared dependency pinned to its target.
  pub const NO_REPLACE: Self = Self {
    excluded_from_replacement: true,
    ..Self::plain("dep_no_replace")
  };

  /// Source to prebuilt link added by the link pass.
  pub const PREBUILT: Self = Self {
    excluded_from_replacement: true,
    excluded_from_visibility_enforcement: true,
    excluded_from_content_membership: true,
    prebuilt_link: true,
    ..Self::plain("prebuilt")
  };

  /// Prebuilt to selection manifest link.
  pub const SELECTION_MANIFEST: Self = Self {
    excluded_from_replacement: true,
    excluded_from_visibility_enforcement: true,
    excluded_from_content_membership: true,
    selection_manifest_link: true,
    ..Self::plain("selection_manifest")
  };

  /// Selection manifest to contributions module.
  pub const CONTRIBUTION: Self = Self {
    excluded_from_replacement: true,
    excluded_from_visibility_enforcement: true,
    excluded_from_content_membership: true,
    ..Self::plain("contribution")
  };
}

impl std::fmt::Display for DependencyTag {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.label)
  }
}

/// A directed dependency: `from` depends on `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
  pub id: EdgeId,
  pub from: ModuleId,
  pub to: ModuleId,
  pub tag: DependencyTag,
}
