//! Core value types shared by the registry and the resolution engine.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::binding::{Binder, Binding, Injectable};
use crate::context::Context;

/// Builds the default binding for an autobound key.
pub(crate) type Autobinder = fn(BindingKey) -> Binding;

/// Identifies a requested service: a type, optionally qualified by a name.
///
/// Two keys are equal when they describe the same type and carry the same
/// name. Keys created with [`BindingKey::injectable`] additionally know how to
/// build a default binding for themselves, which is what lets an autobinding
/// [`Registry`](crate::Registry) resolve types nobody registered.
#[derive(Clone)]
pub struct BindingKey {
  type_id: TypeId,
  type_name: &'static str,
  name: Option<Arc<str>>,
  autobinder: Option<Autobinder>,
}

impl BindingKey {
  /// The key of `T`.
  pub fn of<T: ?Sized + 'static>() -> Self {
    Self {
      type_id: TypeId::of::<T>(),
      type_name: type_name::<T>(),
      name: None,
      autobinder: None,
    }
  }

  /// The key of `T` qualified by `name`.
  pub fn named<T: ?Sized + 'static>(name: &str) -> Self {
    Self::of::<T>().with_name(name)
  }

  /// The key of an [`Injectable`] type. Equal to `BindingKey::of::<T>()`, but
  /// an autobinding registry can synthesize a binding for it on a miss.
  pub fn injectable<T: Injectable>() -> Self {
    Self {
      autobinder: Some(autobind::<T>),
      ..Self::of::<T>()
    }
  }

  /// The key denoting the resolution context performing the resolution.
  ///
  /// Resolving it yields a [`Context`] wrapping the calling container or scope.
  pub fn context() -> Self {
    Self::of::<Context>()
  }

  /// Returns this key qualified by `name`.
  pub fn with_name(mut self, name: &str) -> Self {
    self.name = Some(Arc::from(name));
    self
  }

  pub fn type_id(&self) -> TypeId {
    self.type_id
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  pub fn is_context(&self) -> bool {
    self.type_id == TypeId::of::<Context>() && self.name.is_none()
  }

  pub(crate) fn autobinder(&self) -> Option<Autobinder> {
    self.autobinder
  }
}

fn autobind<T: Injectable>(key: BindingKey) -> Binding {
  Binder::<T>::for_key(key).to_self(Lifetime::Transient)
}

impl PartialEq for BindingKey {
  fn eq(&self, other: &Self) -> bool {
    self.type_id == other.type_id && self.name == other.name
  }
}

impl Eq for BindingKey {}

impl Hash for BindingKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.type_id.hash(state);
    self.name.hash(state);
  }
}

impl fmt::Debug for BindingKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "Key({}, Name({}))", self.type_name, name),
      None => write!(f, "Key({})", self.type_name),
    }
  }
}

impl fmt::Display for BindingKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "{}[{}]", self.type_name, name),
      None => f.write_str(self.type_name),
    }
  }
}

/// A resolved service, type-erased.
///
/// Internally this is an `Arc<T>` stored behind `dyn Any`, the same way the
/// container has always stored trait objects: `T` may be unsized, so an
/// `Instance` can carry an `Arc<dyn Trait>` as well as an `Arc<Struct>`.
/// Cloning an `Instance` clones the handle, never the service.
#[derive(Clone)]
pub struct Instance {
  value: Arc<dyn Any + Send + Sync>,
  type_id: TypeId,
  type_name: &'static str,
}

impl Instance {
  pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
    Self {
      value: Arc::new(value),
      type_id: TypeId::of::<T>(),
      type_name: type_name::<T>(),
    }
  }

  /// Returns the shared service if this instance holds a `T`.
  pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
    self.value.downcast_ref::<Arc<T>>().cloned()
  }

  pub fn is<T: ?Sized + 'static>(&self) -> bool {
    self.type_id == TypeId::of::<T>()
  }

  /// The `TypeId` of the `T` this instance was created from.
  pub fn type_id(&self) -> TypeId {
    self.type_id
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  /// Whether both handles point at the same service.
  pub fn ptr_eq(a: &Instance, b: &Instance) -> bool {
    Arc::ptr_eq(&a.value, &b.value)
  }
}

impl fmt::Debug for Instance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Instance({})", self.type_name)
  }
}

/// Controls how long a resolved instance is reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Lifetime {
  /// A new instance on every resolution.
  #[default]
  Transient,
  /// One instance per root container, shared with all of its scopes.
  Singleton,
  /// One instance per scope. Cannot be resolved from the root container.
  Scoped,
}

impl fmt::Display for Lifetime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Lifetime::Transient => f.write_str("transient"),
      Lifetime::Singleton => f.write_str("singleton"),
      Lifetime::Scoped => f.write_str("scoped"),
    }
  }
}
