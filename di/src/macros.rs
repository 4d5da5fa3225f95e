//! Public macros for declaring factories and resolving services.

/// Builds a [`Factory`](crate::Factory) from a closure with typed parameters.
///
/// Each parameter `name: Type` becomes a named dependency on the key of
/// `Type`, and is bound inside the body to the resolved `Arc<Type>`. The body
/// evaluates to the factory's output.
///
/// Dependencies are declared with [`BindingKey::of`](crate::BindingKey::of),
/// so an unregistered [`Injectable`](crate::Injectable) parameter type is not
/// autobound from here; it resolves only once it is registered or has been
/// autobound by an earlier
/// [`resolve_injectable`](crate::Resolver::resolve_injectable). Declare such a
/// dependency with [`BindingKey::injectable`](crate::BindingKey::injectable)
/// through [`Factory::new`](crate::Factory::new) instead.
///
/// # Examples
///
/// ```
/// use fibre_di::{bind, factory, Lifetime, Registry, Resolver};
///
/// struct Config { url: String }
/// struct Database { url: String }
///
/// let registry = Registry::new();
/// registry.register(bind::<Config>().to_value(Config { url: "pg://db".into() })).unwrap();
/// registry
///   .register(bind::<Database>().to_factory(
///     Lifetime::Singleton,
///     factory!(|config: Config| Database { url: config.url.clone() }),
///   ))
///   .unwrap();
///
/// let container = registry.create_container();
/// assert_eq!(container.resolve::<Database>().unwrap().url, "pg://db");
/// ```
#[macro_export]
macro_rules! factory {
    (|| $body:expr) => {
        $crate::Factory::new(
            ::std::vec::Vec::new(),
            move |_: &$crate::Args| -> ::std::result::Result<_, $crate::BoxError> { Ok($body) },
        )
    };

    (|$($name:ident : $type:ty),+ $(,)?| $body:expr) => {
        $crate::Factory::new(
            ::std::vec![
                $($crate::DependencySpec::named(
                    ::std::stringify!($name),
                    $crate::BindingKey::of::<$type>(),
                )),+
            ],
            move |args: &$crate::Args| -> ::std::result::Result<_, $crate::BoxError> {
                $(let $name: ::std::sync::Arc<$type> = args.get::<$type>(::std::stringify!($name))?;)+
                Ok($body)
            },
        )
    };
}

/// Resolves a service from a container, scope or context.
///
/// This macro panics if the service cannot be resolved, which suits code
/// where a missing registration is a programming error. For a fallible
/// version, call [`Resolver::resolve`](crate::Resolver::resolve) directly.
///
/// # Panics
///
/// Panics with the resolution error if the service cannot be resolved.
///
/// # Examples
///
/// ```
/// use fibre_di::{bind, resolve, Registry};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync { fn greet(&self) -> String; }
/// struct English;
/// impl Greeter for English { fn greet(&self) -> String { "Hello!".to_string() } }
///
/// let registry = Registry::new();
/// registry.register(bind::<String>().to_value(String::from("hello"))).unwrap();
/// registry.register(bind::<dyn Greeter>().to_value(Arc::new(English) as Arc<dyn Greeter>)).unwrap();
/// let container = registry.create_container();
///
/// assert_eq!(*resolve!(container, String), "hello");
/// assert_eq!(resolve!(container, trait Greeter).greet(), "Hello!");
/// ```
#[macro_export]
macro_rules! resolve {
    // resolve!(ctx, trait MyTrait)
    ($ctx:expr, trait $trait_ident:ident) => {
        $crate::Resolver::resolve::<dyn $trait_ident>(&$ctx).unwrap_or_else(|err| {
            panic!(
                "Failed to resolve required trait service {}: {}",
                ::std::any::type_name::<dyn $trait_ident>(),
                err
            )
        })
    };

    // resolve!(ctx, trait MyTrait, "name")
    ($ctx:expr, trait $trait_ident:ident, $name:expr) => {
        $crate::Resolver::resolve_named::<dyn $trait_ident>(&$ctx, $name).unwrap_or_else(|err| {
            panic!(
                "Failed to resolve required trait service with name '{}' {}: {}",
                $name,
                ::std::any::type_name::<dyn $trait_ident>(),
                err
            )
        })
    };

    // resolve!(ctx, MyService)
    ($ctx:expr, $type:ty) => {
        $crate::Resolver::resolve::<$type>(&$ctx).unwrap_or_else(|err| {
            panic!(
                "Failed to resolve required service {}: {}",
                ::std::any::type_name::<$type>(),
                err
            )
        })
    };

    // resolve!(ctx, MyService, "name")
    ($ctx:expr, $type:ty, $name:expr) => {
        $crate::Resolver::resolve_named::<$type>(&$ctx, $name).unwrap_or_else(|err| {
            panic!(
                "Failed to resolve required service with name '{}' {}: {}",
                $name,
                ::std::any::type_name::<$type>(),
                err
            )
        })
    };
}
