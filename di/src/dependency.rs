//! Dependency descriptors attached to bindings, and the arguments a provider
//! receives once those dependencies are resolved.

use std::any::type_name;
use std::sync::Arc;

use crate::core::{BindingKey, Instance};
use crate::error::{Error, Result};

/// One parameter a provider needs.
#[derive(Debug, Clone)]
pub struct DependencySpec {
  name: String,
  key: BindingKey,
  positional: bool,
  default: Option<Instance>,
}

impl DependencySpec {
  /// A dependency handed to the provider by name.
  pub fn named(name: impl Into<String>, key: BindingKey) -> Self {
    Self {
      name: name.into(),
      key,
      positional: false,
      default: None,
    }
  }

  /// A dependency handed to the provider by position.
  pub fn positional(name: impl Into<String>, key: BindingKey) -> Self {
    Self {
      positional: true,
      ..Self::named(name, key)
    }
  }

  /// Value used when the key is unregistered and the registry does not autobind.
  pub fn with_default(mut self, default: Instance) -> Self {
    self.default = Some(default);
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn key(&self) -> &BindingKey {
    &self.key
  }

  pub fn is_positional(&self) -> bool {
    self.positional
  }

  pub fn default(&self) -> Option<&Instance> {
    self.default.as_ref()
  }
}

impl PartialEq for DependencySpec {
  fn eq(&self, other: &Self) -> bool {
    let defaults_match = match (&self.default, &other.default) {
      (None, None) => true,
      (Some(a), Some(b)) => Instance::ptr_eq(a, b),
      _ => false,
    };
    self.name == other.name
      && self.key == other.key
      && self.positional == other.positional
      && defaults_match
  }
}

/// How a declared provider parameter is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
  Positional,
  Named,
  /// Collects any number of arguments. Never autowired.
  Variadic,
}

/// A provider parameter as described by whatever introspects the provider.
///
/// `key` is `None` when the parameter carries no type information, which
/// makes the provider impossible to autowire.
#[derive(Debug, Clone)]
pub struct Parameter {
  pub name: String,
  pub key: Option<BindingKey>,
  pub kind: ParameterKind,
  pub default: Option<Instance>,
}

impl Parameter {
  pub fn new(name: impl Into<String>, key: Option<BindingKey>, kind: ParameterKind) -> Self {
    Self {
      name: name.into(),
      key,
      kind,
      default: None,
    }
  }

  pub fn with_default(mut self, default: Instance) -> Self {
    self.default = Some(default);
    self
  }
}

/// Turns a provider's declared parameters into dependency specs.
///
/// Variadic parameters are dropped. Fails with [`Error::MissingTypeInfo`]
/// naming every remaining parameter that has no key.
pub fn extract_dependencies(
  provider: &str,
  parameters: impl IntoIterator<Item = Parameter>,
) -> Result<Vec<DependencySpec>> {
  let mut specs = Vec::new();
  let mut untyped = Vec::new();

  for parameter in parameters {
    if parameter.kind == ParameterKind::Variadic {
      continue;
    }
    let Some(key) = parameter.key else {
      untyped.push(parameter.name);
      continue;
    };
    let spec = match parameter.kind {
      ParameterKind::Positional => DependencySpec::positional(parameter.name, key),
      _ => DependencySpec::named(parameter.name, key),
    };
    specs.push(match parameter.default {
      Some(default) => spec.with_default(default),
      None => spec,
    });
  }

  if !untyped.is_empty() {
    return Err(Error::MissingTypeInfo {
      provider: provider.to_owned(),
      parameters: untyped,
    });
  }
  Ok(specs)
}

struct Argument {
  name: String,
  positional: bool,
  value: Instance,
}

/// The resolved arguments passed to a provider, in declaration order.
#[derive(Default)]
pub struct Args {
  entries: Vec<Argument>,
}

impl Args {
  pub fn new() -> Self {
    Self::default()
  }

  pub(crate) fn with_capacity(capacity: usize) -> Self {
    Self {
      entries: Vec::with_capacity(capacity),
    }
  }

  /// Appends the resolved value of `spec`.
  pub fn push(&mut self, spec: &DependencySpec, value: Instance) {
    self.entries.push(Argument {
      name: spec.name.clone(),
      positional: spec.positional,
      value,
    });
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// The argument declared under `name`, positional or not.
  pub fn instance(&self, name: &str) -> Result<&Instance> {
    self
      .entries
      .iter()
      .find(|arg| arg.name == name)
      .map(|arg| &arg.value)
      .ok_or_else(|| Error::MissingArgument {
        name: name.to_owned(),
      })
  }

  pub fn get<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
    downcast(self.instance(name)?)
  }

  /// Positional arguments, in order.
  pub fn positional(&self) -> impl Iterator<Item = &Instance> {
    self
      .entries
      .iter()
      .filter(|arg| arg.positional)
      .map(|arg| &arg.value)
  }

  /// Named (non-positional) arguments, in order.
  pub fn named(&self) -> impl Iterator<Item = (&str, &Instance)> {
    self
      .entries
      .iter()
      .filter(|arg| !arg.positional)
      .map(|arg| (arg.name.as_str(), &arg.value))
  }

  /// The positional argument at `index`.
  pub fn at<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>> {
    let instance = self
      .positional()
      .nth(index)
      .ok_or_else(|| Error::MissingArgument {
        name: format!("#{index}"),
      })?;
    downcast(instance)
  }
}

fn downcast<T: ?Sized + Send + Sync + 'static>(instance: &Instance) -> Result<Arc<T>> {
  instance.downcast::<T>().ok_or_else(|| Error::TypeMismatch {
    expected: type_name::<T>(),
    found: instance.type_name(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn extraction_skips_variadic_parameters() {
    let specs = extract_dependencies(
      "make_service",
      vec![
        Parameter::new("db", Some(BindingKey::of::<u32>()), ParameterKind::Positional),
        Parameter::new("rest", None, ParameterKind::Variadic),
        Parameter::new("name", Some(BindingKey::of::<String>()), ParameterKind::Named),
      ],
    )
    .unwrap();

    assert_eq!(
      specs,
      vec![
        DependencySpec::positional("db", BindingKey::of::<u32>()),
        DependencySpec::named("name", BindingKey::of::<String>()),
      ]
    );
  }

  #[test]
  fn extraction_reports_every_untyped_parameter() {
    let err = extract_dependencies(
      "make_service",
      vec![
        Parameter::new("a", None, ParameterKind::Named),
        Parameter::new("b", Some(BindingKey::of::<u32>()), ParameterKind::Named),
        Parameter::new("c", None, ParameterKind::Positional),
      ],
    )
    .unwrap_err();

    match err {
      Error::MissingTypeInfo {
        provider,
        parameters,
      } => {
        assert_eq!(provider, "make_service");
        assert_eq!(parameters, vec!["a".to_string(), "c".to_string()]);
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn extraction_keeps_defaults() {
    let fallback = Instance::new(Arc::new(5u32));
    let specs = extract_dependencies(
      "f",
      vec![Parameter::new("n", Some(BindingKey::of::<u32>()), ParameterKind::Named)
        .with_default(fallback.clone())],
    )
    .unwrap();
    assert!(Instance::ptr_eq(specs[0].default().unwrap(), &fallback));
  }

  #[test]
  fn args_lookup_by_name_and_position() {
    let mut args = Args::new();
    args.push(
      &DependencySpec::positional("first", BindingKey::of::<u32>()),
      Instance::new(Arc::new(1u32)),
    );
    args.push(
      &DependencySpec::named("label", BindingKey::of::<String>()),
      Instance::new(Arc::new(String::from("x"))),
    );
    args.push(
      &DependencySpec::positional("second", BindingKey::of::<u32>()),
      Instance::new(Arc::new(2u32)),
    );

    assert_eq!(args.len(), 3);
    assert_eq!(*args.at::<u32>(0).unwrap(), 1);
    assert_eq!(*args.at::<u32>(1).unwrap(), 2);
    assert_eq!(*args.get::<u32>("second").unwrap(), 2);
    assert_eq!(*args.get::<String>("label").unwrap(), "x");
    assert_eq!(args.named().count(), 1);

    assert!(matches!(
      args.at::<u32>(2),
      Err(Error::MissingArgument { .. })
    ));
    assert!(matches!(
      args.get::<u64>("first"),
      Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(
      args.get::<u32>("missing"),
      Err(Error::MissingArgument { .. })
    ));
  }
}
