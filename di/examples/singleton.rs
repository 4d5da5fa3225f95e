use fibre_di::{bind, resolve, Binder, Factory, Lifetime, Registry};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

// A simple service that gets a unique ID upon creation.
struct RequestTracker {
  id: usize,
}

// A thread-safe counter to generate unique IDs.
static ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn tracker_factory(kind: &'static str) -> Factory<RequestTracker> {
  Factory::from_fn(move || {
    println!("Creating {kind} RequestTracker...");
    Ok(RequestTracker {
      id: ID_COUNTER.fetch_add(1, Ordering::SeqCst),
    })
  })
}

fn main() {
  let registry = Registry::new();

  // --- Singleton Registration ---
  // This factory will only be called ONCE per container.
  registry
    .register(
      Binder::<RequestTracker>::named("singleton_tracker")
        .to_factory(Lifetime::Singleton, tracker_factory("SINGLETON")),
    )
    .unwrap();

  // --- Transient Registration ---
  // This factory will be called EVERY time the service is resolved.
  registry
    .register(
      Binder::<RequestTracker>::named("transient_tracker")
        .to_factory(Lifetime::Transient, tracker_factory("TRANSIENT")),
    )
    .unwrap();

  // --- Scoped Registration ---
  registry
    .register(bind::<RequestTracker>().to_factory(Lifetime::Scoped, tracker_factory("SCOPED")))
    .unwrap();

  let container = registry.create_container();

  println!("--- Resolving Singletons ---");
  let s1 = resolve!(container, RequestTracker, "singleton_tracker");
  let s2 = resolve!(container.create_scope(), RequestTracker, "singleton_tracker");
  println!("Singleton 1 ID: {}, Singleton 2 ID: {}", s1.id, s2.id);
  assert!(
    Arc::ptr_eq(&s1, &s2),
    "Singleton instances should be identical"
  );
  println!("Singleton instances are the same pointer, as expected.\n");

  println!("--- Resolving Transients ---");
  let t1 = resolve!(container, RequestTracker, "transient_tracker");
  let t2 = resolve!(container, RequestTracker, "transient_tracker");
  println!("Transient 1 ID: {}, Transient 2 ID: {}", t1.id, t2.id);
  assert!(
    !Arc::ptr_eq(&t1, &t2),
    "Transient instances should be different"
  );
  println!("Transient instances are different pointers, as expected.\n");

  println!("--- Resolving Scoped ---");
  let scope_a = container.create_scope();
  let scope_b = container.create_scope();
  let a1 = resolve!(scope_a, RequestTracker);
  let a2 = resolve!(scope_a, RequestTracker);
  let b1 = resolve!(scope_b, RequestTracker);
  println!("Scope A IDs: {}, {}; Scope B ID: {}", a1.id, a2.id, b1.id);
  assert!(Arc::ptr_eq(&a1, &a2));
  assert!(!Arc::ptr_eq(&a1, &b1));

  // Scoped services are not available from the container itself.
  assert!(fibre_di::Resolver::resolve::<RequestTracker>(&container).is_err());
  println!("Scoped instances are shared within a scope only, as expected.");
}
