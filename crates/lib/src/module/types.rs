//! Module node types.
//!
//! A [`Module`] is one variant of a declared build unit. Modules are created
//! once while the graph is populated, mutated in place by passes, and never
//! deleted: a module that loses source/prebuilt selection stays in the graph
//! with [`Module::hidden_from_output`] set.
//!
//! # Naming
//!
//! Every module carries three names:
//! - `declared_name`: as written in the description, e.g. `prebuilt_libfoo`
//! - `base_name`: the family name, e.g. `libfoo`
//! - `name`: the currently registered name, which changes when a prebuilt is
//!   renamed to its base name

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::{COMMON_VARIANT, DEFAULT_PARTITION, PREBUILT_PREFIX};

/// Dense index of a module inside a [`ModuleGraph`](crate::graph::ModuleGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub usize);

impl std::fmt::Display for ModuleId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Whether a module is built from source or substitutes a precompiled artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
  Source,
  Prebuilt,
}

impl ModuleKind {
  pub fn as_str(self) -> &'static str {
    match self {
      ModuleKind::Source => "source",
      ModuleKind::Prebuilt => "prebuilt",
    }
  }
}

impl std::fmt::Display for ModuleKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Role a module plays for the resolution engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleRole {
  /// An ordinary build unit.
  #[default]
  Regular,
  /// Lists the explicit source or prebuilt choices for one API domain.
  Contributions,
  /// Aggregates the active contributions into the selection table.
  SelectionManifest,
}

/// The variant dimension of a module (its architecture).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variant(pub String);

impl Variant {
  /// The variant every module starts with before architecture expansion.
  pub fn common() -> Self {
    Variant(COMMON_VARIANT.to_string())
  }

  pub fn arch(name: &str) -> Self {
    Variant(name.to_string())
  }

  pub fn is_common(&self) -> bool {
    self.0 == COMMON_VARIANT
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl Default for Variant {
  fn default() -> Self {
    Self::common()
  }
}

impl std::fmt::Display for Variant {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// Reference to a product configuration variable, `namespace.var`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigVarRef {
  pub namespace: String,
  pub var: String,
}

impl std::fmt::Display for ConfigVarRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}.{}", self.namespace, self.var)
  }
}

/// Properties only prebuilt modules carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrebuiltProps {
  /// Backing artifacts for this variant. Empty means the prebuilt cannot
  /// substitute its source on this variant.
  pub srcs: Vec<String>,

  /// Legacy preference for the prebuilt over its source.
  pub prefer: bool,

  /// When set, the variable's value (inverted) replaces `prefer`.
  pub use_source_config_var: Option<ConfigVarRef>,

  /// Family name override, for prebuilts whose declared name does not
  /// derive from the source module's name.
  pub source_module_name: Option<String>,
}

/// Properties of a contributions module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContributionProps {
  /// The mainline component these contributions belong to.
  pub api_domain: String,

  /// Explicit module names (`foo` or `prebuilt_foo`) chosen for the domain.
  pub contents: Vec<String>,
}

/// Per-architecture overrides applied during variant expansion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchOverrides {
  pub enabled: Option<bool>,
  pub srcs: Option<Vec<String>>,
  pub prefer: Option<bool>,
}

/// A dependency as declared, before it is resolved into an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredDep {
  pub name: String,

  /// The edge must keep pointing at this exact module even if a prebuilt
  /// replaces it.
  #[serde(default)]
  pub exclude_from_replacement: bool,
}

impl DeclaredDep {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      exclude_from_replacement: false,
    }
  }
}

/// One variant of a declared build unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Module {
  pub name: String,
  pub declared_name: String,
  pub base_name: String,
  pub module_type: String,
  pub kind: ModuleKind,
  pub role: ModuleRole,
  pub variant: Variant,
  pub enabled: bool,
  pub exported_to_output: bool,
  pub hidden_from_output: bool,
  pub replaced_by_prebuilt: bool,
  pub package: String,
  pub partition: String,
  pub visibility: Vec<String>,
  pub declared_deps: Vec<DeclaredDep>,
  pub arch: BTreeMap<String, ArchOverrides>,
  pub prebuilt: Option<PrebuiltProps>,
  pub contributions: Option<ContributionProps>,
}

impl Module {
  fn new(name: &str, base_name: &str, module_type: &str, kind: ModuleKind) -> Self {
    Self {
      name: name.to_string(),
      declared_name: name.to_string(),
      base_name: base_name.to_string(),
      module_type: module_type.to_string(),
      kind,
      role: ModuleRole::Regular,
      variant: Variant::common(),
      enabled: true,
      exported_to_output: true,
      hidden_from_output: false,
      replaced_by_prebuilt: false,
      package: String::new(),
      partition: DEFAULT_PARTITION.to_string(),
      visibility: Vec::new(),
      declared_deps: Vec::new(),
      arch: BTreeMap::new(),
      prebuilt: None,
      contributions: None,
    }
  }

  /// Create a source module.
  pub fn source(name: &str) -> Self {
    Self::new(name, name, "source", ModuleKind::Source)
  }

  /// Create a prebuilt module with the given backing artifacts.
  ///
  /// The declared name always carries [`PREBUILT_PREFIX`]; a bare name is
  /// prefixed.
  pub fn prebuilt(name: &str, srcs: &[&str]) -> Self {
    let declared = prebuilt_name(strip_prebuilt_prefix(name));
    let base = strip_prebuilt_prefix(&declared).to_string();
    let mut module = Self::new(&declared, &base, "prebuilt", ModuleKind::Prebuilt);
    module.prebuilt = Some(PrebuiltProps {
      srcs: srcs.iter().map(|s| s.to_string()).collect(),
      ..Default::default()
    });
    module
  }

  /// Create a contributions module for an API domain.
  pub fn contributions(name: &str, api_domain: &str, contents: &[&str]) -> Self {
    let mut module = Self::new(name, name, crate::consts::CONTRIBUTIONS_MODULE_TYPE, ModuleKind::Source);
    module.role = ModuleRole::Contributions;
    module.exported_to_output = false;
    module.contributions = Some(ContributionProps {
      api_domain: api_domain.to_string(),
      contents: contents.iter().map(|s| s.to_string()).collect(),
    });
    module
  }

  /// Create the selection manifest module.
  pub fn selection_manifest(name: &str) -> Self {
    let mut module = Self::new(
      name,
      name,
      crate::consts::SELECTION_MANIFEST_MODULE_TYPE,
      ModuleKind::Source,
    );
    module.role = ModuleRole::SelectionManifest;
    module.exported_to_output = false;
    module
  }

  pub fn with_type(mut self, module_type: &str) -> Self {
    self.module_type = module_type.to_string();
    self
  }

  pub fn with_variant(mut self, variant: Variant) -> Self {
    self.variant = variant;
    self
  }

  pub fn with_enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }

  pub fn with_exported(mut self, exported: bool) -> Self {
    self.exported_to_output = exported;
    self
  }

  pub fn with_package(mut self, package: &str) -> Self {
    self.package = package.to_string();
    self
  }

  pub fn with_partition(mut self, partition: &str) -> Self {
    self.partition = partition.to_string();
    self
  }

  pub fn with_visibility(mut self, rules: &[&str]) -> Self {
    self.visibility = rules.iter().map(|r| r.to_string()).collect();
    self
  }

  pub fn with_dep(mut self, name: &str) -> Self {
    self.declared_deps.push(DeclaredDep::new(name));
    self
  }

  /// Declare a dependency that a prebuilt must never take over.
  pub fn with_pinned_dep(mut self, name: &str) -> Self {
    self.declared_deps.push(DeclaredDep {
      name: name.to_string(),
      exclude_from_replacement: true,
    });
    self
  }

  pub fn with_arch(mut self, arch: &str, overrides: ArchOverrides) -> Self {
    self.arch.insert(arch.to_string(), overrides);
    self
  }

  /// Set the legacy `prefer` flag. No-op on source modules.
  pub fn with_prefer(mut self, prefer: bool) -> Self {
    if let Some(props) = self.prebuilt.as_mut() {
      props.prefer = prefer;
    }
    self
  }

  /// Tie the prebuilt to a product variable that overrides `prefer`.
  pub fn with_use_source_config_var(mut self, namespace: &str, var: &str) -> Self {
    if let Some(props) = self.prebuilt.as_mut() {
      props.use_source_config_var = Some(ConfigVarRef {
        namespace: namespace.to_string(),
        var: var.to_string(),
      });
    }
    self
  }

  /// Override the family a prebuilt belongs to.
  pub fn with_source_module_name(mut self, base: &str) -> Self {
    if let Some(props) = self.prebuilt.as_mut() {
      props.source_module_name = Some(base.to_string());
      self.base_name = base.to_string();
    }
    self
  }

  pub fn is_prebuilt(&self) -> bool {
    self.kind == ModuleKind::Prebuilt
  }

  pub fn is_source(&self) -> bool {
    self.kind == ModuleKind::Source && self.role == ModuleRole::Regular
  }

  /// True once a prebuilt holds its base name instead of its prefixed name.
  pub fn is_renamed(&self) -> bool {
    self.name != self.declared_name
  }

  /// Backing artifacts of a prebuilt on this variant.
  pub fn artifacts(&self) -> &[String] {
    self.prebuilt.as_ref().map(|p| p.srcs.as_slice()).unwrap_or(&[])
  }

  pub fn has_artifacts(&self) -> bool {
    !self.artifacts().is_empty()
  }

  /// Derive the variant for `arch`, applying its overrides.
  pub fn for_arch(&self, arch: &str, overrides: &ArchOverrides) -> Module {
    let mut module = self.clone();
    module.variant = Variant::arch(arch);
    module.arch.clear();
    if let Some(enabled) = overrides.enabled {
      module.enabled = enabled;
    }
    if let Some(props) = module.prebuilt.as_mut() {
      if let Some(srcs) = &overrides.srcs {
        props.srcs = srcs.clone();
      }
      if let Some(prefer) = overrides.prefer {
        props.prefer = prefer;
      }
    }
    module
  }
}

impl std::fmt::Display for Module {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if self.variant.is_common() {
      write!(f, "{}", self.name)
    } else {
      write!(f, "{}[{}]", self.name, self.variant)
    }
  }
}

/// Strip [`PREBUILT_PREFIX`] from a name, if present.
pub fn strip_prebuilt_prefix(name: &str) -> &str {
  name.strip_prefix(PREBUILT_PREFIX).unwrap_or(name)
}

/// Spell the prebuilt name for a family.
pub fn prebuilt_name(base: &str) -> String {
  format!("{}{}", PREBUILT_PREFIX, base)
}
