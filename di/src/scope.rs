//! Child resolution contexts.

use std::sync::{Arc, Weak};

use tracing::debug;

use crate::container::{instantiate, Container, InstanceCache};
use crate::context::{Context, Resolver};
use crate::core::{BindingKey, Instance, Lifetime};
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::resource::ResourceStack;

pub(crate) struct ScopeInner {
  parent: Container,
  cache: InstanceCache,
  resources: ResourceStack,
}

/// A short-lived resolution context, typically one per request or unit of work.
///
/// A scope resolves singletons through its parent container and keeps its own
/// cache of scoped instances and its own resource stack. Transient and scoped
/// resources resolved here are released when the scope closes, or when the
/// last handle to it is dropped.
#[derive(Clone)]
pub struct Scope {
  inner: Arc<ScopeInner>,
}

impl Scope {
  pub(crate) fn new(parent: Container) -> Self {
    Self {
      inner: Arc::new(ScopeInner {
        parent,
        cache: InstanceCache::default(),
        resources: ResourceStack::new(),
      }),
    }
  }

  pub(crate) fn from_inner(inner: Arc<ScopeInner>) -> Self {
    Self { inner }
  }

  pub(crate) fn downgrade(&self) -> Weak<ScopeInner> {
    Arc::downgrade(&self.inner)
  }

  /// The container this scope was created from.
  pub fn parent(&self) -> &Container {
    &self.inner.parent
  }

  pub fn registry(&self) -> &Registry {
    self.inner.parent.registry()
  }

  /// Releases this scope's resources in reverse acquisition order and forgets
  /// its scoped instances. Singletons are untouched.
  ///
  /// The scope stays usable; scoped instances are rebuilt on next resolution.
  pub fn close(&self) {
    self.inner.resources.close();
    self.inner.cache.clear();
    debug!("scope closed");
  }

  /// Number of scoped instances currently cached.
  pub fn cached_instances(&self) -> usize {
    self.inner.cache.len()
  }

  /// Number of resources waiting to be released by this scope.
  pub fn pending_resources(&self) -> usize {
    self.inner.resources.len()
  }

  pub(crate) fn resolve_unwrapped(&self, key: &BindingKey) -> Result<Instance> {
    if key.is_context() {
      return Ok(Context::Scope(self.clone()).into_instance());
    }
    let binding = self.registry().lookup(key)?;
    match binding.lifetime() {
      Lifetime::Transient => instantiate(
        &binding,
        &Context::Scope(self.clone()),
        &self.inner.resources,
      ),
      Lifetime::Singleton => self.inner.parent.resolve_singleton(&binding),
      Lifetime::Scoped => self.inner.cache.get_or_try_init(key, || {
        instantiate(
          &binding,
          &Context::Scope(self.clone()),
          &self.inner.resources,
        )
      }),
    }
  }
}

impl Resolver for Scope {
  fn resolve_key(&self, key: &BindingKey) -> Result<Instance> {
    let instance = self
      .resolve_unwrapped(key)
      .map_err(|cause| Error::resolving(key, cause))?;
    debug!(key = %key, scoped = true, "resolved");
    Ok(instance)
  }
}
