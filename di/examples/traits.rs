use fibre_di::{bind, factory, resolve, Lifetime, Registry};
use std::sync::Arc;

// 1. Define the abstraction (the trait)
trait Logger: Send + Sync {
  fn log(&self, message: &str);
}

// 2. Define a concrete implementation
struct ConsoleLogger;
impl Logger for ConsoleLogger {
  fn log(&self, message: &str) {
    println!("[CONSOLE LOG]: {}", message);
  }
}

// 3. Define a service that depends on the abstraction
struct ReportService {
  logger: Arc<dyn Logger>,
}

impl ReportService {
  fn generate_report(&self) {
    self.logger.log("Starting report generation.");
    self.logger.log("Finished report generation.");
  }
}

fn main() {
  let registry = Registry::new();

  // --- Registration ---

  // The concrete logger is a singleton; `dyn Logger` is an alias that serves
  // the same instance as a trait object.
  registry
    .register(bind::<ConsoleLogger>().to_factory(Lifetime::Singleton, factory!(|| ConsoleLogger)))
    .unwrap();
  registry
    .register(bind::<dyn Logger>().alias_with(|logger: Arc<ConsoleLogger>| logger as Arc<dyn Logger>))
    .unwrap();

  // ReportService declares the abstraction as its dependency. It never
  // constructs a logger itself.
  registry
    .register(bind::<ReportService>().to_factory(
      Lifetime::Singleton,
      fibre_di::Factory::new(
        vec![fibre_di::DependencySpec::named(
          "logger",
          fibre_di::BindingKey::of::<dyn Logger>(),
        )],
        |args| {
          Ok(ReportService {
            logger: args.get::<dyn Logger>("logger")?,
          })
        },
      ),
    ))
    .unwrap();

  // --- Resolution and Usage ---
  let container = registry.create_container();
  println!("Resolving the high-level service...");
  let report_service = resolve!(container, ReportService);

  println!("Using the service...");
  report_service.generate_report();
}
