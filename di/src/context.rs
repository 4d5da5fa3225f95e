//! The resolution-context capability shared by containers and scopes.

use std::any::type_name;
use std::sync::Arc;

use crate::binding::Injectable;
use crate::container::Container;
use crate::core::{BindingKey, Instance};
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::scope::Scope;

/// Anything services can be resolved from.
pub trait Resolver {
  /// Resolves `key` to a type-erased instance.
  ///
  /// Any failure is reported as [`Error::Resolve`] keyed by `key`. A provider
  /// returning a value of another type than `key` names only logs a warning.
  fn resolve_key(&self, key: &BindingKey) -> Result<Instance>;

  /// Resolves the service registered for `T`.
  fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>>
  where
    Self: Sized,
  {
    self.resolve_as(BindingKey::of::<T>())
  }

  /// Resolves the service registered for `T` under `name`.
  fn resolve_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>>
  where
    Self: Sized,
  {
    self.resolve_as(BindingKey::named::<T>(name))
  }

  /// Resolves `T`, letting an autobinding registry build it when unregistered.
  fn resolve_injectable<T: Injectable>(&self) -> Result<Arc<T>>
  where
    Self: Sized,
  {
    self.resolve_as(BindingKey::injectable::<T>())
  }

  /// Resolves `key` and downcasts the result to `T`.
  fn resolve_as<T: ?Sized + Send + Sync + 'static>(&self, key: BindingKey) -> Result<Arc<T>>
  where
    Self: Sized,
  {
    let instance = self.resolve_key(&key)?;
    instance.downcast::<T>().ok_or_else(|| {
      Error::resolving(
        &key,
        Error::TypeMismatch {
          expected: type_name::<T>(),
          found: instance.type_name(),
        },
      )
    })
  }
}

/// The container or scope a resolution runs in.
///
/// Resolving [`BindingKey::context`] yields one of these, which lets a
/// provider resolve further services dynamically from where it was called.
#[derive(Clone)]
pub enum Context {
  Root(Container),
  Scope(Scope),
}

impl Context {
  pub fn registry(&self) -> &Registry {
    match self {
      Context::Root(container) => container.registry(),
      Context::Scope(scope) => scope.registry(),
    }
  }

  /// The root container, whichever context this is.
  pub fn container(&self) -> &Container {
    match self {
      Context::Root(container) => container,
      Context::Scope(scope) => scope.parent(),
    }
  }

  pub fn is_scope(&self) -> bool {
    matches!(self, Context::Scope(_))
  }

  pub(crate) fn resolve_unwrapped(&self, key: &BindingKey) -> Result<Instance> {
    match self {
      Context::Root(container) => container.resolve_unwrapped(key),
      Context::Scope(scope) => scope.resolve_unwrapped(key),
    }
  }

  pub(crate) fn into_instance(self) -> Instance {
    Instance::new(Arc::new(self))
  }
}

impl Resolver for Context {
  fn resolve_key(&self, key: &BindingKey) -> Result<Instance> {
    match self {
      Context::Root(container) => container.resolve_key(key),
      Context::Scope(scope) => scope.resolve_key(key),
    }
  }
}

impl From<Container> for Context {
  fn from(container: Container) -> Self {
    Context::Root(container)
  }
}

impl From<Scope> for Context {
  fn from(scope: Scope) -> Self {
    Context::Scope(scope)
  }
}
