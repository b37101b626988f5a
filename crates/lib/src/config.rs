//! Engine and product configuration.
//!
//! [`EngineConfig`] sizes the worker pool. [`ProductConfig`] carries the
//! product-level inputs the passes consult: which contributions feed the
//! selection manifest, vendor variables for `use_source_config_var`, and the
//! policy switches.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::module::ConfigVarRef;

#[derive(Debug, Error)]
pub enum ConfigError {
  /// The product file could not be read.
  #[error("failed to read product config {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: io::Error,
  },

  /// The product file is not valid JSON for a product config.
  #[error("failed to parse product config {path}: {source}")]
  Parse {
    path: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Configuration for running the pipeline.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Maximum number of module visits running at once.
  pub parallelism: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
    }
  }
}

impl EngineConfig {
  pub fn with_parallelism(parallelism: usize) -> Self {
    Self {
      parallelism: parallelism.max(1),
    }
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

/// Product-level inputs to resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductConfig {
  /// Contributions modules the selection manifest aggregates.
  pub selected_contributions: Vec<String>,

  /// Vendor variables by namespace, then variable name.
  pub vendor_vars: BTreeMap<String, BTreeMap<String, String>>,

  /// Prebuilts not exported to the active namespace never replace a source.
  pub namespace_gating: bool,

  /// Report unresolvable dependency names as nothing instead of an error.
  pub allow_missing_dependencies: bool,
}

impl ProductConfig {
  /// Load a product config from a JSON file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.display().to_string(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.display().to_string(),
      source,
    })
  }

  /// Value of a vendor variable, if the product sets it.
  pub fn vendor_var(&self, var: &ConfigVarRef) -> Option<&str> {
    self
      .vendor_vars
      .get(&var.namespace)
      .and_then(|vars| vars.get(&var.var))
      .map(String::as_str)
  }

  pub fn with_selected_contributions(mut self, names: &[&str]) -> Self {
    self.selected_contributions = names.iter().map(|n| n.to_string()).collect();
    self
  }

  pub fn with_vendor_var(mut self, namespace: &str, var: &str, value: &str) -> Self {
    self
      .vendor_vars
      .entry(namespace.to_string())
      .or_default()
      .insert(var.to_string(), value.to_string());
    self
  }

  pub fn with_namespace_gating(mut self, enabled: bool) -> Self {
    self.namespace_gating = enabled;
    self
  }

  pub fn with_allow_missing_dependencies(mut self, allow: bool) -> Self {
    self.allow_missing_dependencies = allow;
    self
  }
}
