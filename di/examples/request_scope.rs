use fibre_di::{bind, factory, resolve, Lifetime, Managed, Registry};
use std::sync::{
  atomic::{AtomicBool, AtomicUsize, Ordering},
  Arc,
};

struct Settings {
  dsn: String,
}

// A connection opened once per request and closed when the request ends.
struct Connection {
  id: usize,
  open: AtomicBool,
}

// A per-request service that uses the request's connection.
struct UserRepository {
  conn: Arc<Connection>,
}

impl UserRepository {
  fn find(&self, user: &str) -> String {
    format!("{user} (via connection #{})", self.conn.id)
  }
}

static OPENED: AtomicUsize = AtomicUsize::new(0);

fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .init();

  let registry = Registry::new();
  registry
    .register(bind::<Settings>().to_value(Settings {
      dsn: "postgres://localhost/app".to_string(),
    }))
    .unwrap();

  // --- Resource Registration ---
  // Setup runs when the connection is first resolved in a scope; teardown
  // runs when that scope closes.
  registry
    .register(bind::<Connection>().to_resource(
      Lifetime::Scoped,
      factory!(|settings: Settings| {
        let dsn = settings.dsn.clone();
        Managed::new(
          move || {
            let id = OPENED.fetch_add(1, Ordering::SeqCst);
            println!("Opening connection #{id} to {dsn}");
            Ok(Arc::new(Connection {
              id,
              open: AtomicBool::new(true),
            }))
          },
          |conn: Arc<Connection>| {
            println!("Closing connection #{}", conn.id);
            conn.open.store(false, Ordering::SeqCst);
          },
        )
      }),
    ))
    .unwrap();
  registry
    .register(bind::<UserRepository>().to_factory(
      Lifetime::Transient,
      factory!(|conn: Connection| UserRepository { conn }),
    ))
    .unwrap();

  let container = registry.create_container();

  // --- Handling Requests ---
  let mut connections = Vec::new();
  for user in ["alice", "bob"] {
    let scope = container.create_scope();
    let users = resolve!(scope, UserRepository);
    let again = resolve!(scope, UserRepository);
    assert!(Arc::ptr_eq(&users.conn, &again.conn));
    println!("Found {}", users.find(user));
    connections.push(Arc::clone(&users.conn));
    scope.close();
  }

  assert_ne!(connections[0].id, connections[1].id);
  assert!(connections.iter().all(|conn| !conn.open.load(Ordering::SeqCst)));
  println!("Every request got its own connection, and every connection was closed.");

  container.close();
}
