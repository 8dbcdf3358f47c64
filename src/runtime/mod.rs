// Copyright 2024-2026 the Weft authors. MIT license.

mod instantiate;

pub use instantiate::instantiate_module;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::loader::LoadError;
use crate::module_path::ModulePath;
use crate::module_path::ResolveError;
use crate::syntax::format_number;
use crate::syntax::Expr;

#[derive(Debug, Clone, Error)]
pub enum EvalError {
  /// A synchronous `require` hit a module that is not in the registry.
  /// Dependencies are loaded before their importer runs, so this names a
  /// path that was never loaded at all.
  #[error("module \"{path}\" is not loaded")]
  ModuleNotLoaded { path: ModulePath },
  #[error("expected a module specifier string, found {found}")]
  InvalidSpecifier { found: String },
  #[error("undefined variable \"{name}\"")]
  UndefinedVariable { name: String },
  #[error("\"{name}\" is already declared")]
  AlreadyDeclared { name: String },
  #[error("cannot assign to constant \"{name}\"")]
  AssignToConst { name: String },
  #[error("cannot read property \"{property}\" of {found}")]
  NotAnObject {
    property: String,
    found: &'static str,
  },
  #[error("cannot set property \"{property}\" of {found}")]
  CannotSetProperty {
    property: String,
    found: &'static str,
  },
  #[error("{found} is not a function")]
  NotAFunction { found: &'static str },
  #[error("expected {expected} arguments, found {found}")]
  WrongArgumentCount { expected: usize, found: usize },
  #[error("unsupported operand types for `{op}`: {left} and {right}")]
  InvalidOperands {
    op: &'static str,
    left: &'static str,
    right: &'static str,
  },
  #[error("unsupported operand type for `{op}`: {operand}")]
  InvalidUnaryOperand {
    op: &'static str,
    operand: &'static str,
  },
  #[error(transparent)]
  Resolve(#[from] ResolveError),
  #[error("dynamic import failed: {0}")]
  DynamicImport(Arc<LoadError>),
}

/// A runtime value. Strings are immutable and cheap to clone; objects and
/// functions are references, so clones alias the same underlying data.
#[derive(Debug, Clone)]
pub enum Value {
  Null,
  Bool(bool),
  Number(f64),
  Str(Rc<str>),
  Object(ObjectRef),
  Function(Rc<Closure>),
}

impl Value {
  pub fn type_name(&self) -> &'static str {
    match self {
      Value::Null => "null",
      Value::Bool(_) => "boolean",
      Value::Number(_) => "number",
      Value::Str(_) => "string",
      Value::Object(_) => "object",
      Value::Function(_) => "function",
    }
  }

  pub fn truthy(&self) -> bool {
    match self {
      Value::Null => false,
      Value::Bool(value) => *value,
      Value::Number(value) => *value != 0.0 && !value.is_nan(),
      Value::Str(value) => !value.is_empty(),
      Value::Object(_) | Value::Function(_) => true,
    }
  }
}

/// Equality is the dialect's `==`: by value for primitives, by reference
/// for objects and functions, `false` across types.
impl PartialEq for Value {
  fn eq(&self, other: &Value) -> bool {
    match (self, other) {
      (Value::Null, Value::Null) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Number(a), Value::Number(b)) => a == b,
      (Value::Str(a), Value::Str(b)) => a == b,
      (Value::Object(a), Value::Object(b)) => a == b,
      (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
      _ => false,
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Value::Null => write!(f, "null"),
      Value::Bool(value) => write!(f, "{}", value),
      Value::Number(value) => write!(f, "{}", format_number(*value)),
      Value::Str(value) => write!(f, "{}", value),
      Value::Object(_) => write!(f, "[object]"),
      Value::Function(_) => write!(f, "[function]"),
    }
  }
}

/// A shared mutable object with insertion ordered properties. Export
/// objects are `ObjectRef`s, so every importer of a module observes the
/// same underlying map.
#[derive(Debug, Clone, Default)]
pub struct ObjectRef(Rc<RefCell<IndexMap<String, Value>>>);

impl ObjectRef {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<Value> {
    self.0.borrow().get(key).cloned()
  }

  pub fn set(&self, key: impl Into<String>, value: Value) {
    self.0.borrow_mut().insert(key.into(), value);
  }

  pub fn keys(&self) -> Vec<String> {
    self.0.borrow().keys().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.0.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.borrow().is_empty()
  }
}

/// Reference identity, matching the dialect's `==` on objects.
impl PartialEq for ObjectRef {
  fn eq(&self, other: &ObjectRef) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }
}

#[derive(Debug)]
pub struct Closure {
  pub params: Vec<String>,
  pub body: Expr,
  pub env: Rc<Env>,
}

#[derive(Debug, Clone)]
struct Binding {
  value: Value,
  mutable: bool,
}

/// A lexical scope chain. Module bodies execute in a single root scope;
/// each arrow call pushes a child capturing its defining scope.
#[derive(Debug, Default)]
pub struct Env {
  parent: Option<Rc<Env>>,
  bindings: RefCell<IndexMap<String, Binding>>,
}

impl Env {
  pub fn root() -> Rc<Self> {
    Rc::new(Self::default())
  }

  pub fn child(parent: &Rc<Env>) -> Rc<Self> {
    Rc::new(Self {
      parent: Some(parent.clone()),
      bindings: RefCell::new(IndexMap::new()),
    })
  }

  /// Introduces a binding in this scope. Redeclaring a name that already
  /// exists in the same scope is an error; shadowing an outer scope is
  /// allowed.
  pub fn declare(
    &self,
    name: &str,
    value: Value,
    mutable: bool,
  ) -> Result<(), EvalError> {
    let mut bindings = self.bindings.borrow_mut();
    if bindings.contains_key(name) {
      return Err(EvalError::AlreadyDeclared {
        name: name.to_string(),
      });
    }
    bindings.insert(name.to_string(), Binding { value, mutable });
    Ok(())
  }

  pub fn get(&self, name: &str) -> Option<Value> {
    if let Some(binding) = self.bindings.borrow().get(name) {
      return Some(binding.value.clone());
    }
    self.parent.as_ref()?.get(name)
  }

  pub fn assign(&self, name: &str, value: Value) -> Result<(), EvalError> {
    if let Some(binding) = self.bindings.borrow_mut().get_mut(name) {
      if !binding.mutable {
        return Err(EvalError::AssignToConst {
          name: name.to_string(),
        });
      }
      binding.value = value;
      return Ok(());
    }
    match &self.parent {
      Some(parent) => parent.assign(name, value),
      None => Err(EvalError::UndefinedVariable {
        name: name.to_string(),
      }),
    }
  }
}
