use fibre_di::{bind, factory, Binder, Error, Factory, Lifetime, Registry, Resolver};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::thread;

// --- Test Fixtures ---

#[derive(Debug)]
struct Counter {
  id: usize,
}

/// Registers `Counter` with `lifetime` and returns the factory's call count.
fn register_counter(registry: &Registry, lifetime: Lifetime) -> Arc<AtomicUsize> {
  let calls = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&calls);
  registry
    .register(bind::<Counter>().to_factory(
      lifetime,
      Factory::from_fn(move || {
        let id = counter.fetch_add(1, Ordering::SeqCst);
        Ok(Counter { id })
      }),
    ))
    .unwrap();
  calls
}

// --- Transient ---

#[test]
fn test_transient_returns_a_new_instance_each_time() {
  // Arrange
  let registry = Registry::new();
  let calls = register_counter(&registry, Lifetime::Transient);
  let container = registry.create_container();

  // Act
  let r1 = container.resolve::<Counter>().unwrap();
  let r2 = container.resolve::<Counter>().unwrap();

  // Assert
  assert!(!Arc::ptr_eq(&r1, &r2));
  assert_eq!((r1.id, r2.id), (0, 1));
  assert_eq!(calls.load(Ordering::SeqCst), 2);
  assert_eq!(container.cached_singletons(), 0);
}

#[test]
fn test_transient_in_scope_is_not_cached_either() {
  let registry = Registry::new();
  register_counter(&registry, Lifetime::Transient);
  let scope = registry.create_container().create_scope();

  let r1 = scope.resolve::<Counter>().unwrap();
  let r2 = scope.resolve::<Counter>().unwrap();

  assert!(!Arc::ptr_eq(&r1, &r2));
  assert_eq!(scope.cached_instances(), 0);
}

// --- Singleton ---

#[test]
fn test_singleton_is_shared_by_container_and_scopes() {
  // Arrange
  let registry = Registry::new();
  let calls = register_counter(&registry, Lifetime::Singleton);
  let container = registry.create_container();

  // Act
  let r1 = container.resolve::<Counter>().unwrap();
  let r2 = container.resolve::<Counter>().unwrap();
  let scope = container.create_scope();
  let r3 = scope.resolve::<Counter>().unwrap();
  let r4 = container.create_scope().resolve::<Counter>().unwrap();

  // Assert
  assert!(Arc::ptr_eq(&r1, &r2));
  assert!(Arc::ptr_eq(&r1, &r3));
  assert!(Arc::ptr_eq(&r1, &r4));
  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert_eq!(container.cached_singletons(), 1);
  assert_eq!(scope.cached_instances(), 0);
}

#[test]
fn test_singleton_resolved_first_from_scope_lives_in_container() {
  let registry = Registry::new();
  let calls = register_counter(&registry, Lifetime::Singleton);
  let container = registry.create_container();
  let scope = container.create_scope();

  let from_scope = scope.resolve::<Counter>().unwrap();
  scope.close();
  let from_root = container.resolve::<Counter>().unwrap();

  assert!(Arc::ptr_eq(&from_scope, &from_root));
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_closing_container_forgets_singletons() {
  let registry = Registry::new();
  let calls = register_counter(&registry, Lifetime::Singleton);
  let container = registry.create_container();

  let before = container.resolve::<Counter>().unwrap();
  container.close();
  let after = container.resolve::<Counter>().unwrap();

  assert!(!Arc::ptr_eq(&before, &after));
  assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_separate_containers_have_separate_singletons() {
  let registry = Registry::new();
  register_counter(&registry, Lifetime::Singleton);

  let a = registry.create_container().resolve::<Counter>().unwrap();
  let b = registry.create_container().resolve::<Counter>().unwrap();

  assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_singleton_factory_is_called_only_once_under_concurrency() {
  // A unique struct for this test.
  struct ConcurrentService;

  // Arrange
  let calls = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&calls);
  let registry = Registry::new();
  registry
    .register(bind::<ConcurrentService>().to_factory(
      Lifetime::Singleton,
      Factory::from_fn(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        // Widen the window for a race.
        thread::sleep(std::time::Duration::from_millis(50));
        Ok(ConcurrentService)
      }),
    ))
    .unwrap();
  let container = registry.create_container();

  // Act
  thread::scope(|s| {
    for i in 0..20 {
      let container = &container;
      s.spawn(move || {
        if i % 2 == 0 {
          container.resolve::<ConcurrentService>().unwrap();
        } else {
          container.create_scope().resolve::<ConcurrentService>().unwrap();
        }
      });
    }
  });

  // Assert
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// --- Scoped ---

#[test]
fn test_scoped_is_cached_per_scope() {
  // Arrange
  let registry = Registry::new();
  let calls = register_counter(&registry, Lifetime::Scoped);
  let container = registry.create_container();
  let scope1 = container.create_scope();
  let scope2 = container.create_scope();

  // Act
  let v1 = scope1.resolve::<Counter>().unwrap();
  let v2 = scope1.resolve::<Counter>().unwrap();
  let v3 = scope2.resolve::<Counter>().unwrap();
  let v4 = scope2.resolve::<Counter>().unwrap();

  // Assert
  assert!(Arc::ptr_eq(&v1, &v2));
  assert!(Arc::ptr_eq(&v3, &v4));
  assert!(!Arc::ptr_eq(&v1, &v3));
  assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_scoped_from_root_container_fails_without_calling_provider() {
  // Arrange
  let registry = Registry::new();
  let calls = register_counter(&registry, Lifetime::Scoped);
  let container = registry.create_container();

  // Act
  let err = container.resolve::<Counter>().unwrap_err();

  // Assert
  assert!(matches!(err, Error::Resolve { .. }));
  assert!(matches!(
    err.cause(),
    Some(Error::ScopedOutsideScope { .. })
  ));
  assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_closing_scope_forgets_scoped_instances() {
  let registry = Registry::new();
  register_counter(&registry, Lifetime::Scoped);
  let scope = registry.create_container().create_scope();

  let v1 = scope.resolve::<Counter>().unwrap();
  assert_eq!(scope.cached_instances(), 1);
  scope.close();
  assert_eq!(scope.cached_instances(), 0);
  let v2 = scope.resolve::<Counter>().unwrap();

  assert!(!Arc::ptr_eq(&v1, &v2));
}

#[test]
fn test_singleton_depending_on_scoped_fails_even_from_a_scope() {
  // Singletons are built at root level, where scoped bindings are unavailable.
  #[derive(Debug)]
  struct Session;
  #[derive(Debug)]
  struct Cache {
    _session: Arc<Session>,
  }

  let registry = Registry::new();
  registry
    .register(bind::<Session>().to_factory(Lifetime::Scoped, factory!(|| Session)))
    .unwrap();
  registry
    .register(bind::<Cache>().to_factory(
      Lifetime::Singleton,
      factory!(|session: Session| Cache { _session: session }),
    ))
    .unwrap();
  let scope = registry.create_container().create_scope();

  let err = scope.resolve::<Cache>().unwrap_err();

  assert!(matches!(
    err.root_cause(),
    Error::ScopedOutsideScope { .. }
  ));
}

#[test]
fn test_scoped_dependencies_resolve_within_the_same_scope() {
  struct Session;
  struct Handler {
    session: Arc<Session>,
  }

  let registry = Registry::new();
  registry
    .register(bind::<Session>().to_factory(Lifetime::Scoped, factory!(|| Session)))
    .unwrap();
  registry
    .register(bind::<Handler>().to_factory(
      Lifetime::Transient,
      factory!(|session: Session| Handler { session }),
    ))
    .unwrap();
  let container = registry.create_container();
  let scope = container.create_scope();

  let handler = scope.resolve::<Handler>().unwrap();
  let session = scope.resolve::<Session>().unwrap();
  let other = container.create_scope().resolve::<Handler>().unwrap();

  assert!(Arc::ptr_eq(&handler.session, &session));
  assert!(!Arc::ptr_eq(&other.session, &session));
}

// --- Cycles ---

#[test]
fn test_scoped_binding_depending_on_itself_fails_instead_of_blocking() {
  struct Left;

  // Arrange
  let registry = Registry::new();
  registry
    .register(Binder::<Left>::named("scoped").to_factory(
      Lifetime::Scoped,
      Factory::new(
        vec![fibre_di::DependencySpec::named(
          "again",
          fibre_di::BindingKey::named::<Left>("scoped"),
        )],
        |_| Ok(Left),
      ),
    ))
    .unwrap();
  let container = registry.create_container();
  let scope = container.create_scope();

  // Act
  let err = scope.resolve_named::<Left>("scoped").err().unwrap();

  // Assert
  assert!(matches!(
    err.root_cause(),
    Error::CircularDependency { .. }
  ));
  assert_eq!(scope.cached_instances(), 0);
}

#[test]
fn test_singleton_cycle_fails_instead_of_blocking() {
  struct Ping;
  struct Pong;

  let registry = Registry::new();
  registry
    .register(bind::<Ping>().to_factory(Lifetime::Singleton, factory!(|_pong: Pong| Ping)))
    .unwrap();
  registry
    .register(bind::<Pong>().to_factory(Lifetime::Singleton, factory!(|_ping: Ping| Pong)))
    .unwrap();
  let container = registry.create_container();

  let err = container.resolve::<Ping>().err().unwrap();

  assert!(matches!(
    err.root_cause(),
    Error::CircularDependency { ref key } if *key == fibre_di::BindingKey::of::<Ping>()
  ));
  assert_eq!(container.cached_singletons(), 0);
}
