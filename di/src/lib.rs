//! # Fibre DI
//!
//! A scoped dependency-injection container for Rust.
//!
//! Fibre DI maps service keys to bindings and resolves them on demand, caching
//! instances according to their lifetime and releasing acquired resources in
//! reverse order when their owning context closes.
//!
//! ## Core Concepts
//!
//! - **Registry**: Maps [`BindingKey`]s to [`Binding`]s. Bindings are usually
//!   built with [`bind`] and the [`factory!`] macro.
//! - **Container**: The root resolution context, created with
//!   [`Registry::create_container`]. Owns the singleton cache.
//! - **Scope**: A short-lived child context created with
//!   [`Container::create_scope`]. Owns the cache of scoped instances.
//! - **Lifetimes**: [`Lifetime::Transient`] builds on every resolution,
//!   [`Lifetime::Singleton`] once per container, [`Lifetime::Scoped`] once per
//!   scope.
//! - **Resources**: Providers may return a [`Resource`]; the container enters
//!   it and exits it when the container or scope that resolved it closes.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_di::{bind, factory, Lifetime, Managed, Registry, Resolver};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! struct Settings {
//!   dsn: String,
//! }
//!
//! struct Connection {
//!   dsn: String,
//!   open: AtomicBool,
//! }
//!
//! let registry = Registry::new();
//! registry
//!   .register(bind::<Settings>().to_value(Settings { dsn: "memory://".into() }))
//!   .unwrap();
//!
//! // One connection per scope, closed when the scope closes.
//! registry
//!   .register(bind::<Connection>().to_resource(
//!     Lifetime::Scoped,
//!     factory!(|settings: Settings| {
//!       let dsn = settings.dsn.clone();
//!       Managed::new(
//!         move || Ok(Arc::new(Connection { dsn, open: AtomicBool::new(true) })),
//!         |conn: Arc<Connection>| conn.open.store(false, Ordering::SeqCst),
//!       )
//!     }),
//!   ))
//!   .unwrap();
//!
//! let container = registry.create_container();
//! let scope = container.create_scope();
//!
//! let conn = scope.resolve::<Connection>().unwrap();
//! assert_eq!(conn.dsn, "memory://");
//! assert!(Arc::ptr_eq(&conn, &scope.resolve::<Connection>().unwrap()));
//!
//! scope.close();
//! assert!(!conn.open.load(Ordering::SeqCst));
//! ```

mod binding;
mod container;
mod context;
mod core;
mod dependency;
mod error;
mod macros;
mod registry;
mod resource;
mod scope;

pub use binding::{bind, Binder, Binding, Factory, Injectable, Provided};
pub use container::Container;
pub use context::{Context, Resolver};
pub use crate::core::{BindingKey, Instance, Lifetime};
pub use dependency::{extract_dependencies, Args, DependencySpec, Parameter, ParameterKind};
pub use error::{BoxError, Error, Result};
pub use registry::{OverrideGuard, Registry, RegistryConfig};
pub use resource::{Managed, Resource, ResourceStack};
pub use scope::Scope;
