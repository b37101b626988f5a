//! Typed provider store.
//!
//! A provider record is an immutable fact a pass publishes on a module, read
//! later by the same module, by its dependents, or by later passes. Keys carry
//! their value type, so reads never need a caller-side type assertion.

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::module::ModuleId;

/// A typed key into the [`ProviderStore`].
pub struct ProviderKey<T> {
  name: &'static str,
  _marker: PhantomData<fn() -> T>,
}

impl<T> ProviderKey<T> {
  pub const fn new(name: &'static str) -> Self {
    Self {
      name,
      _marker: PhantomData,
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }
}

impl<T> Clone for ProviderKey<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for ProviderKey<T> {}

impl<T> std::fmt::Debug for ProviderKey<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "ProviderKey({})", self.name)
  }
}

type ProviderValue = Arc<dyn Any + Send + Sync>;

/// A provider write produced by a visit, applied by the pipeline at the next
/// barrier.
#[derive(Clone)]
pub struct ProviderWrite {
  pub module: ModuleId,
  pub key: &'static str,
  pub value: ProviderValue,
}

impl std::fmt::Debug for ProviderWrite {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ProviderWrite")
      .field("module", &self.module)
      .field("key", &self.key)
      .finish_non_exhaustive()
  }
}

impl ProviderWrite {
  pub fn new<T: Send + Sync + 'static>(module: ModuleId, key: ProviderKey<T>, value: T) -> Self {
    Self {
      module,
      key: key.name,
      value: Arc::new(value),
    }
  }

  /// Publish a value that is already behind an `Arc` without copying it.
  pub fn shared<T: Send + Sync + 'static>(module: ModuleId, key: ProviderKey<T>, value: Arc<T>) -> Self {
    Self {
      module,
      key: key.name,
      value,
    }
  }
}

/// Per-module provider records.
#[derive(Clone, Default)]
pub struct ProviderStore {
  records: HashMap<(ModuleId, &'static str), ProviderValue>,
}

impl std::fmt::Debug for ProviderStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ProviderStore")
      .field("records", &self.records.len())
      .finish()
  }
}

impl ProviderStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get<T: Send + Sync + 'static>(&self, module: ModuleId, key: ProviderKey<T>) -> Option<Arc<T>> {
    let value = self.records.get(&(module, key.name))?;
    Arc::clone(value).downcast::<T>().ok()
  }

  pub fn contains<T>(&self, module: ModuleId, key: ProviderKey<T>) -> bool {
    self.records.contains_key(&(module, key.name))
  }

  /// Store a record, replacing a value left by an earlier pass.
  pub fn insert<T: Send + Sync + 'static>(&mut self, module: ModuleId, key: ProviderKey<T>, value: T) {
    self.records.insert((module, key.name), Arc::new(value));
  }

  pub(crate) fn apply(&mut self, write: ProviderWrite) {
    self.records.insert((write.module, write.key), write.value);
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}
