//! Bindings and the helpers that build them.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::Context;
use crate::core::{BindingKey, Instance, Lifetime};
use crate::dependency::{extract_dependencies, Args, DependencySpec, Parameter};
use crate::error::{BoxError, Result};
use crate::resource::{ErasedResource, Resource};

type ProviderFn = dyn Fn(&Args) -> Result<Provided, BoxError> + Send + Sync;

/// What a provider produced: a ready instance or a resource still to enter.
pub struct Provided(ProvidedKind);

pub(crate) enum ProvidedKind {
  Instance(Instance),
  Resource(Box<dyn ErasedResource>),
}

impl Provided {
  pub fn instance(instance: Instance) -> Self {
    Provided(ProvidedKind::Instance(instance))
  }

  pub fn value<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
    Self::instance(Instance::new(value))
  }

  pub fn resource<R: Resource>(resource: R) -> Self {
    Provided(ProvidedKind::Resource(Box::new(resource)))
  }

  pub fn is_resource(&self) -> bool {
    matches!(self.0, ProvidedKind::Resource(_))
  }

  pub(crate) fn into_kind(self) -> ProvidedKind {
    self.0
  }
}

impl From<Instance> for Provided {
  fn from(instance: Instance) -> Self {
    Self::instance(instance)
  }
}

/// How to produce the service registered under a key.
///
/// Bindings are immutable; registering a new binding for the same key
/// replaces the old one (when the registry allows it) rather than editing it.
#[derive(Clone)]
pub struct Binding {
  key: BindingKey,
  provider: Arc<ProviderFn>,
  lifetime: Lifetime,
  enter_resource: bool,
  dependencies: Vec<DependencySpec>,
}

impl Binding {
  pub fn new<P>(
    key: BindingKey,
    lifetime: Lifetime,
    enter_resource: bool,
    dependencies: Vec<DependencySpec>,
    provider: P,
  ) -> Self
  where
    P: Fn(&Args) -> Result<Provided, BoxError> + Send + Sync + 'static,
  {
    Self {
      key,
      provider: Arc::new(provider),
      lifetime,
      enter_resource,
      dependencies,
    }
  }

  pub fn key(&self) -> &BindingKey {
    &self.key
  }

  pub fn lifetime(&self) -> Lifetime {
    self.lifetime
  }

  /// Whether resources returned by the provider are entered by the container.
  pub fn enter_resource(&self) -> bool {
    self.enter_resource
  }

  pub fn dependencies(&self) -> &[DependencySpec] {
    &self.dependencies
  }

  pub(crate) fn provide(&self, args: &Args) -> Result<Provided, BoxError> {
    (self.provider)(args)
  }
}

impl PartialEq for Binding {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.provider, &other.provider)
      && self.lifetime == other.lifetime
      && self.enter_resource == other.enter_resource
      && self.dependencies == other.dependencies
  }
}

impl fmt::Debug for Binding {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Binding")
      .field("key", &self.key)
      .field("lifetime", &self.lifetime)
      .field("enter_resource", &self.enter_resource)
      .field("dependencies", &self.dependencies)
      .finish_non_exhaustive()
  }
}

type BuildFn<O> = dyn Fn(&Args) -> Result<O, BoxError> + Send + Sync;

/// A build function together with the dependencies it expects in its [`Args`].
///
/// Usually written with the [`factory!`](crate::factory) macro, which derives
/// the dependency list from the closure's typed parameters.
pub struct Factory<O> {
  dependencies: Vec<DependencySpec>,
  build: Box<BuildFn<O>>,
}

impl<O: 'static> Factory<O> {
  pub fn new<F>(dependencies: Vec<DependencySpec>, build: F) -> Self
  where
    F: Fn(&Args) -> Result<O, BoxError> + Send + Sync + 'static,
  {
    Self {
      dependencies,
      build: Box::new(build),
    }
  }

  /// A factory that needs nothing from the container.
  pub fn from_fn<F>(build: F) -> Self
  where
    F: Fn() -> Result<O, BoxError> + Send + Sync + 'static,
  {
    Self::new(Vec::new(), move |_| build())
  }

  /// A factory whose dependencies come from a described parameter list.
  ///
  /// Fails with [`Error::MissingTypeInfo`](crate::Error::MissingTypeInfo) if
  /// any non-variadic parameter has no key; nothing is built in that case.
  pub fn from_parameters<F>(
    provider: &str,
    parameters: impl IntoIterator<Item = Parameter>,
    build: F,
  ) -> Result<Self>
  where
    F: Fn(&Args) -> Result<O, BoxError> + Send + Sync + 'static,
  {
    let dependencies = extract_dependencies(provider, parameters)?;
    Ok(Self::new(dependencies, build))
  }

  pub fn dependencies(&self) -> &[DependencySpec] {
    &self.dependencies
  }

  fn into_parts(self) -> (Vec<DependencySpec>, Box<BuildFn<O>>) {
    (self.dependencies, self.build)
  }
}

/// A type that knows its own dependencies and how to build itself.
///
/// This is what [`Binder::to_self`] registers and what an autobinding
/// registry falls back to for keys made with [`BindingKey::injectable`].
pub trait Injectable: Send + Sync + Sized + 'static {
  fn dependencies() -> Vec<DependencySpec> {
    Vec::new()
  }

  fn inject(args: &Args) -> Result<Self, BoxError>;
}

/// Builds [`Binding`]s for the key of `T`.
pub struct Binder<T: ?Sized> {
  key: BindingKey,
  enter: Option<bool>,
  _marker: PhantomData<fn() -> Arc<T>>,
}

/// Starts a binding for `T`.
pub fn bind<T: ?Sized + Send + Sync + 'static>() -> Binder<T> {
  Binder::new()
}

impl<T: ?Sized + Send + Sync + 'static> Default for Binder<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: ?Sized + Send + Sync + 'static> Binder<T> {
  pub fn new() -> Self {
    Self::for_key(BindingKey::of::<T>())
  }

  pub fn named(name: &str) -> Self {
    Self::for_key(BindingKey::named::<T>(name))
  }

  pub(crate) fn for_key(key: BindingKey) -> Self {
    Self {
      key,
      enter: None,
      _marker: PhantomData,
    }
  }

  pub fn key(&self) -> &BindingKey {
    &self.key
  }

  /// Whether the container enters resources the provider returns.
  ///
  /// Defaults to `false` for [`to_value`](Self::to_value) and `true` for the
  /// factory-shaped helpers. A resource that is not entered is served as is.
  /// Ignored by [`to_provider`](Self::to_provider), [`alias`](Self::alias)
  /// and [`alias_with`](Self::alias_with).
  pub fn enter(mut self, enter: bool) -> Self {
    self.enter = Some(enter);
    self
  }

  pub fn to_provider<P>(
    self,
    lifetime: Lifetime,
    enter_resource: bool,
    dependencies: Vec<DependencySpec>,
    provider: P,
  ) -> Binding
  where
    P: Fn(&Args) -> Result<Provided, BoxError> + Send + Sync + 'static,
  {
    Binding::new(self.key, lifetime, enter_resource, dependencies, provider)
  }

  /// Always serves `value`. Singleton.
  pub fn to_value(self, value: impl Into<Arc<T>>) -> Binding {
    let instance = Instance::new(value.into());
    let enter = self.enter.unwrap_or(false);
    self.to_provider(Lifetime::Singleton, enter, Vec::new(), move |_| {
      Ok(Provided::instance(instance.clone()))
    })
  }

  /// Serves whatever `factory` builds, cached according to `lifetime`.
  pub fn to_factory<O>(self, lifetime: Lifetime, factory: Factory<O>) -> Binding
  where
    O: Into<Arc<T>> + 'static,
  {
    let (dependencies, build) = factory.into_parts();
    let enter = self.enter.unwrap_or(true);
    self.to_provider(lifetime, enter, dependencies, move |args| {
      build(args).map(|output| Provided::value::<T>(output.into()))
    })
  }

  /// Serves the value of the resource `factory` builds. The container enters
  /// the resource on creation and exits it when the owning stack closes.
  ///
  /// With [`enter(false)`](Self::enter) the resource itself is served instead.
  pub fn to_resource<R>(self, lifetime: Lifetime, factory: Factory<R>) -> Binding
  where
    R: Resource<Target = T>,
  {
    let (dependencies, build) = factory.into_parts();
    let enter = self.enter.unwrap_or(true);
    self.to_provider(lifetime, enter, dependencies, move |args| {
      build(args).map(Provided::resource)
    })
  }

  /// Like [`to_factory`](Self::to_factory), but the build function receives
  /// the resolving [`Context`] and resolves what it needs itself.
  pub fn to_lambda<O, F>(self, lifetime: Lifetime, build: F) -> Binding
  where
    O: Into<Arc<T>> + 'static,
    F: Fn(&Context) -> Result<O, BoxError> + Send + Sync + 'static,
  {
    let dependencies = vec![DependencySpec::positional("context", BindingKey::context())];
    self.to_factory(
      lifetime,
      Factory::new(dependencies, move |args| {
        let context = args.at::<Context>(0)?;
        build(&context)
      }),
    )
  }

  /// Resolves `target` and serves its instance unchanged. Never cached, so
  /// every resolution re-resolves the target.
  pub fn alias(self, target: BindingKey) -> Binding {
    let dependencies = vec![DependencySpec::positional("target", target)];
    self.to_provider(Lifetime::Transient, false, dependencies, |args| {
      let target = args.positional().next().cloned();
      target
        .map(Provided::instance)
        .ok_or_else(|| "alias target was not supplied".into())
    })
  }

  /// Resolves `U` and serves it converted, typically to a trait object.
  pub fn alias_with<U, C>(self, convert: C) -> Binding
  where
    U: ?Sized + Send + Sync + 'static,
    C: Fn(Arc<U>) -> Arc<T> + Send + Sync + 'static,
  {
    let dependencies = vec![DependencySpec::positional("target", BindingKey::of::<U>())];
    self.to_provider(Lifetime::Transient, false, dependencies, move |args| {
      let target = args.at::<U>(0)?;
      Ok(Provided::value::<T>(convert(target)))
    })
  }
}

impl<T: Injectable> Binder<T> {
  /// Uses `T`'s own [`Injectable`] implementation as the factory.
  pub fn to_self(self, lifetime: Lifetime) -> Binding {
    self.to_factory(lifetime, Factory::new(T::dependencies(), T::inject))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Clock;

  impl Injectable for Clock {
    fn inject(_: &Args) -> Result<Self, BoxError> {
      Ok(Clock)
    }
  }

  fn build(binding: &Binding, args: &Args) -> Instance {
    match binding.provide(args).unwrap().into_kind() {
      ProvidedKind::Instance(instance) => instance,
      ProvidedKind::Resource(_) => panic!("expected an instance"),
    }
  }

  #[test]
  fn value_binding_is_an_unentered_singleton() {
    let binding = bind::<u32>().to_value(9u32);
    assert_eq!(binding.lifetime(), Lifetime::Singleton);
    assert!(!binding.enter_resource());
    assert!(binding.dependencies().is_empty());

    let a = build(&binding, &Args::new());
    let b = build(&binding, &Args::new());
    assert!(Instance::ptr_eq(&a, &b));
  }

  #[test]
  fn alias_declares_its_target_as_only_dependency() {
    let binding = Binder::<u32>::named("port").alias(BindingKey::of::<u32>());
    assert_eq!(binding.key(), &BindingKey::named::<u32>("port"));
    assert_eq!(binding.lifetime(), Lifetime::Transient);
    assert!(!binding.enter_resource());
    assert_eq!(
      binding.dependencies(),
      &[DependencySpec::positional("target", BindingKey::of::<u32>())]
    );

    let target = Instance::new(Arc::new(80u32));
    let mut args = Args::new();
    args.push(&binding.dependencies()[0], target.clone());
    assert!(Instance::ptr_eq(&build(&binding, &args), &target));
  }

  #[test]
  fn resource_factory_produces_resources() {
    let binding = bind::<u8>().to_resource(
      Lifetime::Scoped,
      Factory::from_fn(|| Ok(crate::Managed::from_value(Arc::new(1u8), |_| {}))),
    );
    assert!(binding.enter_resource());
    assert!(binding.provide(&Args::new()).unwrap().is_resource());
  }

  #[test]
  fn enter_flag_overrides_helper_defaults() {
    let resource = bind::<u8>()
      .enter(false)
      .to_resource(
        Lifetime::Transient,
        Factory::from_fn(|| Ok(crate::Managed::from_value(Arc::new(1u8), |_| {}))),
      );
    assert!(!resource.enter_resource());

    let value = bind::<u8>().enter(true).to_value(1u8);
    assert!(value.enter_resource());

    let lambda = bind::<u8>()
      .enter(false)
      .to_lambda(Lifetime::Transient, |_: &Context| Ok(2u8));
    assert!(!lambda.enter_resource());
    assert!(bind::<u8>().to_lambda(Lifetime::Transient, |_: &Context| Ok(2u8)).enter_resource());
  }

  #[test]
  fn to_self_uses_injectable() {
    let binding = bind::<Clock>().to_self(Lifetime::Singleton);
    assert_eq!(binding.lifetime(), Lifetime::Singleton);
    assert!(build(&binding, &Args::new()).is::<Clock>());
  }

  #[test]
  fn clones_are_equal_rebuilt_bindings_are_not() {
    let binding = bind::<u32>().to_value(1u32);
    assert_eq!(binding.clone(), binding);
    assert_ne!(bind::<u32>().to_value(1u32), binding);
  }
}
