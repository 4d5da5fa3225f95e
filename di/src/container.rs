//! The root `Container` and the instantiation logic shared with scopes.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::binding::{Binding, ProvidedKind};
use crate::context::{Context, Resolver};
use crate::core::{BindingKey, Instance, Lifetime};
use crate::dependency::Args;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::resource::ResourceStack;
use crate::scope::{Scope, ScopeInner};

thread_local! {
  // Cells this thread is currently initializing. Re-entering one of them
  // means the binding depends on itself.
  static INITIALIZING: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

/// Marks a cell as being initialized by the current thread until dropped.
struct InitGuard {
  cell: usize,
}

impl InitGuard {
  fn enter(cell: &Arc<OnceCell<Instance>>, key: &BindingKey) -> Result<Self> {
    let cell = Arc::as_ptr(cell) as usize;
    let fresh = INITIALIZING.with(|cells| cells.borrow_mut().insert(cell));
    if !fresh {
      return Err(Error::CircularDependency { key: key.clone() });
    }
    Ok(Self { cell })
  }
}

impl Drop for InitGuard {
  fn drop(&mut self) {
    INITIALIZING.with(|cells| {
      cells.borrow_mut().remove(&self.cell);
    });
  }
}

/// Per-key, initialize-once instance cache.
///
/// Each key owns a `OnceCell`, so a provider runs at most once per cache even
/// when several threads race for the same key. The map's shard lock is never
/// held while a provider runs, which keeps recursive resolution of other keys
/// free to use the same cache. A provider that reaches its own cell again on
/// the same thread fails with [`Error::CircularDependency`].
#[derive(Default)]
pub(crate) struct InstanceCache {
  cells: DashMap<BindingKey, Arc<OnceCell<Instance>>>,
}

impl InstanceCache {
  pub(crate) fn get_or_try_init(
    &self,
    key: &BindingKey,
    init: impl FnOnce() -> Result<Instance>,
  ) -> Result<Instance> {
    let cell = Arc::clone(&self.cells.entry(key.clone()).or_default());
    if let Some(instance) = cell.get() {
      return Ok(instance.clone());
    }
    let _guard = InitGuard::enter(&cell, key)?;
    cell.get_or_try_init(init).cloned()
  }

  pub(crate) fn len(&self) -> usize {
    self
      .cells
      .iter()
      .filter(|cell| cell.value().get().is_some())
      .count()
  }

  pub(crate) fn clear(&self) {
    self.cells.clear();
  }
}

struct ContainerInner {
  registry: Registry,
  singletons: InstanceCache,
  resources: ResourceStack,
  scopes: Mutex<Vec<Weak<ScopeInner>>>,
}

/// The root resolution context.
///
/// Owns the singleton cache and the resource stack for everything resolved
/// at root level, and hands out [`Scope`]s. `Container` is a cheap handle;
/// clones share the same state.
#[derive(Clone)]
pub struct Container {
  inner: Arc<ContainerInner>,
}

impl Container {
  pub(crate) fn new(registry: Registry) -> Self {
    Self {
      inner: Arc::new(ContainerInner {
        registry,
        singletons: InstanceCache::default(),
        resources: ResourceStack::new(),
        scopes: Mutex::new(Vec::new()),
      }),
    }
  }

  pub fn registry(&self) -> &Registry {
    &self.inner.registry
  }

  /// Creates a child scope sharing this container's singletons.
  pub fn create_scope(&self) -> Scope {
    let scope = Scope::new(self.clone());
    let mut scopes = self.inner.scopes.lock();
    scopes.retain(|scope| scope.strong_count() > 0);
    scopes.push(scope.downgrade());
    debug!(live_scopes = scopes.len(), "scope created");
    scope
  }

  /// Closes every live child scope, then releases this container's resources
  /// in reverse acquisition order and forgets its singletons.
  ///
  /// The container stays usable; singletons are rebuilt on next resolution.
  pub fn close(&self) {
    let live: Vec<_> = self
      .inner
      .scopes
      .lock()
      .iter()
      .filter_map(Weak::upgrade)
      .collect();
    for scope in live {
      Scope::from_inner(scope).close();
    }
    self.inner.resources.close();
    self.inner.singletons.clear();
    debug!("container closed");
  }

  /// Number of singletons currently cached.
  pub fn cached_singletons(&self) -> usize {
    self.inner.singletons.len()
  }

  /// Number of resources waiting to be released at root level.
  pub fn pending_resources(&self) -> usize {
    self.inner.resources.len()
  }

  pub(crate) fn resolve_unwrapped(&self, key: &BindingKey) -> Result<Instance> {
    if key.is_context() {
      return Ok(Context::Root(self.clone()).into_instance());
    }
    let binding = self.registry().lookup(key)?;
    match binding.lifetime() {
      Lifetime::Transient => instantiate(
        &binding,
        &Context::Root(self.clone()),
        &self.inner.resources,
      ),
      Lifetime::Singleton => self.resolve_singleton(&binding),
      Lifetime::Scoped => Err(Error::ScopedOutsideScope { key: key.clone() }),
    }
  }

  /// Singletons always live here, whichever context asked for them. Their
  /// dependencies are resolved at root level and their resources released
  /// when this container closes.
  pub(crate) fn resolve_singleton(&self, binding: &Binding) -> Result<Instance> {
    self.inner.singletons.get_or_try_init(binding.key(), || {
      instantiate(binding, &Context::Root(self.clone()), &self.inner.resources)
    })
  }
}

impl Resolver for Container {
  fn resolve_key(&self, key: &BindingKey) -> Result<Instance> {
    let instance = self
      .resolve_unwrapped(key)
      .map_err(|cause| Error::resolving(key, cause))?;
    debug!(key = %key, "resolved");
    Ok(instance)
  }
}

/// Builds a new instance for `binding`.
///
/// Dependencies are resolved in declaration order from `context`. Entered
/// resources are pushed onto `resources`. Nothing acquired before a failure
/// is rolled back.
pub(crate) fn instantiate(
  binding: &Binding,
  context: &Context,
  resources: &ResourceStack,
) -> Result<Instance> {
  let key = binding.key();
  let registry = context.registry();

  let mut args = Args::with_capacity(binding.dependencies().len());
  for dependency in binding.dependencies() {
    let value = match dependency.default() {
      Some(default) if !registry.autobind() && !registry.contains(dependency.key()) => {
        default.clone()
      }
      _ => context.resolve_unwrapped(dependency.key())?,
    };
    args.push(dependency, value);
  }

  let provided = binding.provide(&args).map_err(|source| Error::Provider {
    key: key.clone(),
    source,
  })?;

  let instance = match provided.into_kind() {
    ProvidedKind::Instance(instance) => instance,
    ProvidedKind::Resource(mut resource) if binding.enter_resource() => {
      let instance = resource.enter().map_err(|source| Error::ResourceEnter {
        key: key.clone(),
        source,
      })?;
      resources.push(move || resource.exit());
      instance
    }
    ProvidedKind::Resource(resource) => {
      if resource.resource_type_id() != key.type_id() {
        warn!(
          key = %key,
          resource = resource.resource_type_name(),
          "provider returned a resource that is not entered and does not match the requested type"
        );
      }
      return Ok(resource.into_instance());
    }
  };

  if instance.type_id() != key.type_id() {
    warn!(
      key = %key,
      found = instance.type_name(),
      "resolved instance does not match the requested type"
    );
  }
  Ok(instance)
}
