//! Resources: values with an explicit setup and teardown step.

use std::any::{type_name, TypeId};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::Instance;
use crate::error::BoxError;

/// A value that must be entered before use and exited once no longer needed.
///
/// Providers hand resources to the container with
/// [`Provided::resource`](crate::Provided::resource). When the binding asks for
/// it, the container calls [`enter`](Resource::enter), serves the returned
/// value, and schedules [`exit`](Resource::exit) on the resource stack of the
/// container or scope that owns the resolution.
pub trait Resource: Send + Sync + 'static {
  type Target: ?Sized + Send + Sync + 'static;

  fn enter(&mut self) -> Result<Arc<Self::Target>, BoxError>;

  fn exit(&mut self);
}

type Setup<T> = Box<dyn FnOnce() -> Result<Arc<T>, BoxError> + Send + Sync>;
type Teardown<T> = Box<dyn FnOnce(Arc<T>) + Send + Sync>;

/// A resource assembled from a setup and a teardown closure.
///
/// `setup` runs on enter and produces the served value; `teardown` runs on
/// exit and receives that same value. Teardown never runs if setup did not.
///
/// ```
/// use fibre_di::{Managed, Resource};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// struct Conn { open: AtomicBool }
///
/// let mut conn = Managed::new(
///   || Ok(Arc::new(Conn { open: AtomicBool::new(true) })),
///   |conn: Arc<Conn>| conn.open.store(false, Ordering::SeqCst),
/// );
/// let served = conn.enter().unwrap();
/// assert!(served.open.load(Ordering::SeqCst));
/// conn.exit();
/// assert!(!served.open.load(Ordering::SeqCst));
/// ```
pub struct Managed<T: ?Sized> {
  setup: Option<Setup<T>>,
  teardown: Option<Teardown<T>>,
  entered: Option<Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Managed<T> {
  pub fn new<S, D>(setup: S, teardown: D) -> Self
  where
    S: FnOnce() -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    D: FnOnce(Arc<T>) + Send + Sync + 'static,
  {
    Self {
      setup: Some(Box::new(setup)),
      teardown: Some(Box::new(teardown)),
      entered: None,
    }
  }

  /// Wraps an already-built value; only the teardown is deferred.
  pub fn from_value<D>(value: Arc<T>, teardown: D) -> Self
  where
    D: FnOnce(Arc<T>) + Send + Sync + 'static,
  {
    Self::new(move || Ok(value), teardown)
  }
}

impl<T: ?Sized + Send + Sync + 'static> Resource for Managed<T> {
  type Target = T;

  fn enter(&mut self) -> Result<Arc<T>, BoxError> {
    let setup = self.setup.take().ok_or("managed resource entered twice")?;
    let value = setup()?;
    self.entered = Some(Arc::clone(&value));
    Ok(value)
  }

  fn exit(&mut self) {
    if let Some(value) = self.entered.take() {
      if let Some(teardown) = self.teardown.take() {
        teardown(value);
      }
    }
  }
}

/// Object-safe view of a [`Resource`] used by the resolution engine.
pub(crate) trait ErasedResource: Send + Sync {
  fn enter(&mut self) -> Result<Instance, BoxError>;

  fn exit(&mut self);

  fn resource_type_id(&self) -> TypeId;

  fn resource_type_name(&self) -> &'static str;

  /// The resource itself as a served instance, for bindings that do not enter.
  fn into_instance(self: Box<Self>) -> Instance;
}

impl<R: Resource> ErasedResource for R {
  fn enter(&mut self) -> Result<Instance, BoxError> {
    Resource::enter(self).map(Instance::new)
  }

  fn exit(&mut self) {
    Resource::exit(self)
  }

  fn resource_type_id(&self) -> TypeId {
    TypeId::of::<R>()
  }

  fn resource_type_name(&self) -> &'static str {
    type_name::<R>()
  }

  fn into_instance(self: Box<Self>) -> Instance {
    Instance::new(Arc::<R>::from(self))
  }
}

type Release = Box<dyn FnOnce() + Send>;

/// A LIFO stack of release callbacks.
///
/// Closing runs every pending callback exactly once, most recent first.
/// Dropping the stack closes it.
#[derive(Default)]
pub struct ResourceStack {
  releases: Mutex<Vec<Release>>,
}

impl ResourceStack {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&self, release: impl FnOnce() + Send + 'static) {
    self.releases.lock().push(Box::new(release));
  }

  pub fn len(&self) -> usize {
    self.releases.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.releases.lock().is_empty()
  }

  /// Runs and forgets every pending callback.
  ///
  /// The lock is released before any callback runs, so a callback may push
  /// onto this stack; such entries wait for the next close.
  pub fn close(&self) {
    let releases = std::mem::take(&mut *self.releases.lock());
    for release in releases.into_iter().rev() {
      release();
    }
  }
}

impl Drop for ResourceStack {
  fn drop(&mut self) {
    self.close();
  }
}
