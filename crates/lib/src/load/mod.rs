//! Graph population from a JSON description.
//!
//! The description is what a build-description loader hands the engine: one
//! record per declared module, before variant expansion or dependency
//! resolution.
//!
//! ```json
//! {
//!   "modules": [
//!     { "name": "libfoo", "type": "cc_library", "package": "libfoo", "deps": ["libc"] },
//!     { "name": "prebuilt_libfoo", "type": "cc_prebuilt_library",
//!       "prebuilt": { "srcs": ["libfoo.so"], "prefer": true } }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::consts::{CONTRIBUTIONS_MODULE_TYPE, DEFAULT_PARTITION, PREBUILT_PREFIX, SELECTION_MANIFEST_MODULE_TYPE};
use crate::graph::{GraphError, ModuleGraph};
use crate::module::{ArchOverrides, ContributionProps, DeclaredDep, Module, ModuleKind, ModuleRole, PrebuiltProps};

#[derive(Debug, Error)]
pub enum LoadError {
  /// The description file could not be read.
  #[error("failed to read graph description {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: io::Error,
  },

  /// The description is not valid JSON for a graph description.
  #[error("failed to parse graph description: {0}")]
  Parse(#[from] serde_json::Error),

  /// Two modules collide in the graph.
  #[error(transparent)]
  Graph(#[from] GraphError),

  /// More than one selection manifest module is declared.
  #[error("more than one selection manifest: {first} and {second}")]
  DuplicateSelectionManifest { first: String, second: String },

  /// A module record is inconsistent.
  #[error("invalid module {name}: {reason}")]
  InvalidModule { name: String, reason: String },
}

/// A declared dependency: a bare name or a full record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DepDescription {
  Name(String),
  Full(DeclaredDep),
}

impl From<DepDescription> for DeclaredDep {
  fn from(dep: DepDescription) -> Self {
    match dep {
      DepDescription::Name(name) => DeclaredDep::new(&name),
      DepDescription::Full(dep) => dep,
    }
  }
}

/// One declared module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleDescription {
  pub name: String,
  #[serde(rename = "type")]
  pub module_type: String,
  /// Inferred from `prebuilt` or the name prefix when absent.
  pub kind: Option<ModuleKind>,
  pub enabled: Option<bool>,
  pub exported: Option<bool>,
  pub package: String,
  pub partition: Option<String>,
  pub visibility: Vec<String>,
  pub deps: Vec<DepDescription>,
  pub arch: BTreeMap<String, ArchOverrides>,
  pub prebuilt: Option<PrebuiltProps>,
  pub api_domain: Option<String>,
  pub contents: Vec<String>,
}

impl ModuleDescription {
  fn invalid(&self, reason: &str) -> LoadError {
    LoadError::InvalidModule {
      name: self.name.clone(),
      reason: reason.to_string(),
    }
  }

  fn role(&self) -> ModuleRole {
    match self.module_type.as_str() {
      CONTRIBUTIONS_MODULE_TYPE => ModuleRole::Contributions,
      SELECTION_MANIFEST_MODULE_TYPE => ModuleRole::SelectionManifest,
      _ => ModuleRole::Regular,
    }
  }

  fn kind(&self) -> ModuleKind {
    self.kind.unwrap_or(if self.prebuilt.is_some() || self.name.starts_with(PREBUILT_PREFIX) {
      ModuleKind::Prebuilt
    } else {
      ModuleKind::Source
    })
  }

  /// Build the module this record declares.
  pub fn into_module(self) -> Result<Module, LoadError> {
    if self.name.is_empty() {
      return Err(self.invalid("name is empty"));
    }
    let role = self.role();
    let kind = self.kind();
    if kind == ModuleKind::Source && self.prebuilt.is_some() {
      return Err(self.invalid("source module carries prebuilt properties"));
    }
    if role != ModuleRole::Regular && kind == ModuleKind::Prebuilt {
      return Err(self.invalid("contributions and selection manifest modules cannot be prebuilts"));
    }
    if role != ModuleRole::Contributions && (self.api_domain.is_some() || !self.contents.is_empty()) {
      return Err(self.invalid("only contributions modules list contents"));
    }

    let mut module = match (role, kind) {
      (ModuleRole::Contributions, _) => Module::contributions(&self.name, self.api_domain.as_deref().unwrap_or(""), &[]),
      (ModuleRole::SelectionManifest, _) => Module::selection_manifest(&self.name),
      (ModuleRole::Regular, ModuleKind::Prebuilt) => {
        let mut module = Module::prebuilt(&self.name, &[]);
        let props = self.prebuilt.clone().unwrap_or_default();
        if let Some(base) = &props.source_module_name {
          module.base_name = base.clone();
        }
        module.prebuilt = Some(props);
        module
      }
      (ModuleRole::Regular, ModuleKind::Source) => Module::source(&self.name),
    };

    if !self.module_type.is_empty() {
      module.module_type = self.module_type;
    }
    if let Some(enabled) = self.enabled {
      module.enabled = enabled;
    }
    if let Some(exported) = self.exported {
      module.exported_to_output = exported;
    }
    module.package = self.package;
    module.partition = self.partition.unwrap_or_else(|| DEFAULT_PARTITION.to_string());
    module.visibility = self.visibility;
    module.declared_deps = self.deps.into_iter().map(DeclaredDep::from).collect();
    module.arch = self.arch;
    if let Some(contributions) = module.contributions.as_mut() {
      *contributions = ContributionProps {
        api_domain: self.api_domain.unwrap_or_default(),
        contents: self.contents,
      };
    }
    Ok(module)
  }
}

/// The description loader's output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDescription {
  pub modules: Vec<ModuleDescription>,
}

impl GraphDescription {
  pub fn from_json(json: &str) -> Result<Self, LoadError> {
    Ok(serde_json::from_str(json)?)
  }
}

impl ModuleGraph {
  /// Populate a graph from a description.
  pub fn from_description(description: GraphDescription) -> Result<Self, LoadError> {
    let mut graph = ModuleGraph::new();
    let mut manifest: Option<String> = None;

    for record in description.modules {
      let module = record.into_module()?;
      if module.role == ModuleRole::SelectionManifest {
        if let Some(first) = &manifest {
          return Err(LoadError::DuplicateSelectionManifest {
            first: first.clone(),
            second: module.name,
          });
        }
        manifest = Some(module.name.clone());
      }
      graph.add_module(module)?;
    }

    info!(modules = graph.len(), "loaded graph description");
    Ok(graph)
  }
}

/// Read and populate a graph from a JSON description file.
pub fn load_graph(path: &Path) -> Result<ModuleGraph, LoadError> {
  let content = fs::read_to_string(path).map_err(|source| LoadError::Read {
    path: path.display().to_string(),
    source,
  })?;
  ModuleGraph::from_description(GraphDescription::from_json(&content)?)
}
