//! The binding registry and its test-override layer.

use std::ops::Deref;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::binding::Binding;
use crate::container::Container;
use crate::core::BindingKey;
use crate::error::{Error, Result};

/// Registry behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RegistryConfig {
  /// Synthesize a transient binding for unregistered injectable keys.
  pub autobind: bool,
  /// Let `register` replace an existing binding instead of failing.
  pub allow_overrides: bool,
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      autobind: true,
      allow_overrides: false,
    }
  }
}

impl RegistryConfig {
  pub fn autobind(mut self, autobind: bool) -> Self {
    self.autobind = autobind;
    self
  }

  pub fn allow_overrides(mut self, allow_overrides: bool) -> Self {
    self.allow_overrides = allow_overrides;
    self
  }
}

struct RegistryInner {
  config: RegistryConfig,
  bindings: DashMap<BindingKey, Arc<Binding>>,
  override_layer: RwLock<Option<Registry>>,
}

/// Maps binding keys to bindings.
///
/// `Registry` is a cheap handle: clones share the same bindings, and every
/// container created from it sees registrations made later.
#[derive(Clone)]
pub struct Registry {
  inner: Arc<RegistryInner>,
}

impl Default for Registry {
  fn default() -> Self {
    Self::new()
  }
}

impl Registry {
  /// A registry that autobinds and rejects duplicate registrations.
  pub fn new() -> Self {
    Self::with_config(RegistryConfig::default())
  }

  pub fn with_config(config: RegistryConfig) -> Self {
    Self {
      inner: Arc::new(RegistryInner {
        config,
        bindings: DashMap::new(),
        override_layer: RwLock::new(None),
      }),
    }
  }

  pub fn config(&self) -> RegistryConfig {
    self.inner.config
  }

  pub fn autobind(&self) -> bool {
    self.inner.config.autobind
  }

  /// Whether `key` is bound, in the active override layer or here.
  pub fn contains(&self, key: &BindingKey) -> bool {
    self
      .override_layer()
      .is_some_and(|layer| layer.inner.bindings.contains_key(key))
      || self.inner.bindings.contains_key(key)
  }

  /// Number of bindings registered here, excluding any override layer.
  pub fn len(&self) -> usize {
    self.inner.bindings.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.bindings.is_empty()
  }

  /// Stores `binding` under its key.
  ///
  /// Fails with [`Error::DuplicateBinding`] if the key is taken and overrides
  /// are not allowed.
  pub fn register(&self, binding: Binding) -> Result<()> {
    let key = binding.key().clone();
    match self.inner.bindings.entry(key) {
      Entry::Occupied(mut entry) => {
        if !self.inner.config.allow_overrides {
          return Err(Error::DuplicateBinding {
            key: entry.key().clone(),
          });
        }
        info!(key = %entry.key(), lifetime = %binding.lifetime(), overwrite = true, "registered binding");
        entry.insert(Arc::new(binding));
      }
      Entry::Vacant(entry) => {
        info!(key = %entry.key(), lifetime = %binding.lifetime(), overwrite = false, "registered binding");
        entry.insert(Arc::new(binding));
      }
    }
    Ok(())
  }

  /// Finds the binding for `key`.
  ///
  /// The active override layer wins over this registry. On a miss an
  /// autobinding registry registers a transient binding for injectable keys;
  /// anything else fails with [`Error::BindingNotFound`].
  pub fn lookup(&self, key: &BindingKey) -> Result<Arc<Binding>> {
    if let Some(binding) = self.override_layer().and_then(|layer| layer.get(key)) {
      return Ok(binding);
    }
    if let Some(binding) = self.get(key) {
      return Ok(binding);
    }

    let autobinder = match key.autobinder() {
      Some(autobinder) if self.inner.config.autobind => autobinder,
      _ => return Err(Error::BindingNotFound { key: key.clone() }),
    };
    let entry = self.inner.bindings.entry(key.clone()).or_insert_with(|| {
      debug!(key = %key, "autobinding unregistered type");
      Arc::new(autobinder(key.clone()))
    });
    Ok(Arc::clone(&entry))
  }

  /// Installs a fresh override layer for the lifetime of the returned guard.
  ///
  /// Bindings registered through the guard shadow this registry's bindings on
  /// every lookup until the guard is dropped. The layer never autobinds. Only
  /// one layer may be active at a time; a second call fails with
  /// [`Error::OverrideActive`].
  pub fn with_override(&self) -> Result<OverrideGuard> {
    let mut slot = self.inner.override_layer.write();
    if slot.is_some() {
      return Err(Error::OverrideActive);
    }
    let layer = Registry::with_config(RegistryConfig::default().autobind(false));
    *slot = Some(layer.clone());
    debug!("override layer installed");
    Ok(OverrideGuard {
      owner: self.clone(),
      layer,
    })
  }

  /// Creates a root container resolving from this registry.
  pub fn create_container(&self) -> Container {
    Container::new(self.clone())
  }

  fn get(&self, key: &BindingKey) -> Option<Arc<Binding>> {
    self
      .inner
      .bindings
      .get(key)
      .map(|binding| Arc::clone(binding.value()))
  }

  fn override_layer(&self) -> Option<Registry> {
    self.inner.override_layer.read().clone()
  }
}

/// An active override layer. Dereferences to the layer's registry; dropping
/// the guard discards the layer and everything registered in it.
pub struct OverrideGuard {
  owner: Registry,
  layer: Registry,
}

impl Deref for OverrideGuard {
  type Target = Registry;

  fn deref(&self) -> &Registry {
    &self.layer
  }
}

impl Drop for OverrideGuard {
  fn drop(&mut self) {
    self.owner.inner.override_layer.write().take();
    debug!(discarded = self.layer.len(), "override layer removed");
  }
}
