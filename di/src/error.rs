use thiserror::Error;

use crate::core::BindingKey;

/// The error type providers and resources report failures with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while registering bindings or resolving services.
#[derive(Debug, Error)]
pub enum Error {
  #[error("a binding for {key} is already registered")]
  DuplicateBinding { key: BindingKey },

  #[error("no binding registered for {key}")]
  BindingNotFound { key: BindingKey },

  #[error("provider '{provider}' is missing type information for parameter(s): {}", .parameters.join(", "))]
  MissingTypeInfo {
    provider: String,
    parameters: Vec<String>,
  },

  #[error("an override layer is already active on this registry")]
  OverrideActive,

  #[error("cannot resolve scoped binding {key} outside of a scope")]
  ScopedOutsideScope { key: BindingKey },

  #[error("circular dependency detected while building {key}")]
  CircularDependency { key: BindingKey },

  #[error("provider for {key} failed: {source}")]
  Provider { key: BindingKey, source: BoxError },

  #[error("failed to enter resource for {key}: {source}")]
  ResourceEnter { key: BindingKey, source: BoxError },

  #[error("provider argument '{name}' was not supplied")]
  MissingArgument { name: String },

  #[error("expected an instance of {expected}, found {found}")]
  TypeMismatch {
    expected: &'static str,
    found: &'static str,
  },

  /// Every resolution failure reaches the caller in this shape, keyed by the
  /// type that was originally requested.
  #[error("failed resolving {key}: {cause}")]
  Resolve {
    key: BindingKey,
    #[source]
    cause: Box<Error>,
  },
}

impl Error {
  /// The key a [`Error::Resolve`] was raised for.
  pub fn key(&self) -> Option<&BindingKey> {
    match self {
      Error::Resolve { key, .. } => Some(key),
      _ => None,
    }
  }

  /// The error wrapped by a [`Error::Resolve`].
  pub fn cause(&self) -> Option<&Error> {
    match self {
      Error::Resolve { cause, .. } => Some(cause),
      _ => None,
    }
  }

  /// Unwraps nested [`Error::Resolve`] layers down to the first other error.
  pub fn root_cause(&self) -> &Error {
    let mut current = self;
    while let Error::Resolve { cause, .. } = current {
      current = cause;
    }
    current
  }

  pub(crate) fn resolving(key: &BindingKey, cause: Error) -> Self {
    Error::Resolve {
      key: key.clone(),
      cause: Box::new(cause),
    }
  }
}

/// A specialized `Result` type for `fibre_di` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
