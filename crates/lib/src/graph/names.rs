//! Naming/variant registry.
//!
//! Maps an externally visible `(name, variant)` pair to the module currently
//! holding it. Renames are applied in batches so that a pass never observes a
//! half-renamed graph.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::module::{ModuleId, Variant};

use super::GraphError;

#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
  entries: HashMap<String, BTreeMap<Variant, ModuleId>>,
}

/// One requested rename inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
  pub module: ModuleId,
  pub variant: Variant,
  pub from: String,
  pub to: String,
}

impl NameRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `(name, variant)` for `id`.
  pub fn register(&mut self, name: &str, variant: &Variant, id: ModuleId) -> Result<(), GraphError> {
    let variants = self.entries.entry(name.to_string()).or_default();
    if variants.contains_key(variant) {
      return Err(GraphError::NameCollision {
        name: name.to_string(),
        variant: variant.clone(),
      });
    }
    variants.insert(variant.clone(), id);
    Ok(())
  }

  pub fn unregister(&mut self, name: &str, variant: &Variant) -> Option<ModuleId> {
    let variants = self.entries.get_mut(name)?;
    let removed = variants.remove(variant);
    if variants.is_empty() {
      self.entries.remove(name);
    }
    removed
  }

  pub fn lookup(&self, name: &str, variant: &Variant) -> Option<ModuleId> {
    self.entries.get(name).and_then(|v| v.get(variant)).copied()
  }

  /// True if `name` is registered in any variant.
  pub fn lookup_any(&self, name: &str) -> bool {
    self.entries.contains_key(name)
  }

  /// Every variant registered under `name`, ordered by variant.
  pub fn variants(&self, name: &str) -> Vec<(Variant, ModuleId)> {
    self
      .entries
      .get(name)
      .map(|v| v.iter().map(|(variant, id)| (variant.clone(), *id)).collect())
      .unwrap_or_default()
  }

  /// Apply a batch of renames atomically.
  ///
  /// Either every rename is applied or the registry is left untouched. A
  /// target that another module holds is a [`GraphError::NameCollision`]; a
  /// target that is vacated by the same batch is a [`GraphError::RenameCycle`].
  pub fn rename_batch(&mut self, batch: &[Rename]) -> Result<(), GraphError> {
    let vacated: HashSet<(&str, &Variant)> = batch.iter().map(|r| (r.from.as_str(), &r.variant)).collect();
    let mut claimed: HashSet<(&str, &Variant)> = HashSet::new();

    for rename in batch {
      if self.lookup(&rename.from, &rename.variant) != Some(rename.module) {
        return Err(GraphError::NameNotHeld {
          name: rename.from.clone(),
          module: rename.module,
        });
      }
      let target = (rename.to.as_str(), &rename.variant);
      if vacated.contains(&target) {
        return Err(GraphError::RenameCycle {
          name: rename.to.clone(),
          variant: rename.variant.clone(),
        });
      }
      if !claimed.insert(target) || self.lookup(&rename.to, &rename.variant).is_some() {
        return Err(GraphError::NameCollision {
          name: rename.to.clone(),
          variant: rename.variant.clone(),
        });
      }
    }

    for rename in batch {
      self.unregister(&rename.from, &rename.variant);
    }
    for rename in batch {
      self.register(&rename.to, &rename.variant, rename.module)?;
    }
    Ok(())
  }
}
