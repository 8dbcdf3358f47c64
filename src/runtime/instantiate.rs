// Copyright 2024-2026 the Weft authors. MIT license.

use std::rc::Rc;
use std::sync::Arc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::loader::LoadError;
use crate::loader::LoaderContext;
use crate::module_path::ModulePath;
use crate::syntax;
use crate::syntax::AssignTarget;
use crate::syntax::BinaryOp;
use crate::syntax::BindingKind;
use crate::syntax::Expr;
use crate::syntax::ExprKind;
use crate::syntax::ModuleKind;
use crate::syntax::Stmt;
use crate::syntax::StmtKind;
use crate::syntax::UnaryOp;
use crate::transform::DIRNAME_BINDING;
use crate::transform::DYNAMIC_IMPORT_FN;
use crate::transform::EXPORTS_BINDING;
use crate::transform::FILENAME_BINDING;
use crate::transform::MODULE_BINDING;
use crate::transform::REQUIRE_FN;

use super::Closure;
use super::Env;
use super::EvalError;
use super::ObjectRef;
use super::Value;

/// Executes a module's lowered source once and returns its export object.
///
/// The text is re-parsed in script mode, so module syntax that survived
/// lowering is a parse error rather than executable code. The body runs
/// in a fresh scope exposing exactly the module convention bindings:
/// `exports`, `module`, `__filename`, `__dirname`, plus `require` and
/// `__weft_import` recognized in call position. Nothing else from the
/// host is reachable.
///
/// The export object comes from the registry's record for `path`, created
/// on demand; a record pre-registered by the loader keeps its identity, so
/// importers holding the placeholder see the finished exports.
pub async fn instantiate_module(
  ctx: &LoaderContext,
  path: &ModulePath,
  text: &str,
) -> Result<ObjectRef, LoadError> {
  let module = match syntax::parse(path, text, ModuleKind::Script) {
    Ok(module) => module,
    Err(diagnostic) => {
      ctx.log(log::Level::Error, &diagnostic.display_with_source(text));
      return Err(diagnostic.into());
    }
  };
  let exports = ctx.registry.ensure(path);
  let module_object = ObjectRef::new();
  module_object.set(EXPORTS_BINDING, Value::Object(exports.clone()));

  let scope = Env::root();
  let declare = |name: &str, value: Value| -> Result<(), EvalError> {
    scope.declare(name, value, false)
  };
  declare(EXPORTS_BINDING, Value::Object(exports.clone()))?;
  declare(MODULE_BINDING, Value::Object(module_object))?;
  declare(FILENAME_BINDING, Value::Str(path.as_str().into()))?;
  declare(DIRNAME_BINDING, Value::Str(path.dir_path().into()))?;

  let evaluator = Evaluator { ctx, path };
  for stmt in &module.body {
    evaluator.exec_stmt(&scope, stmt).await?;
  }
  Ok(exports)
}

struct Evaluator<'a> {
  ctx: &'a LoaderContext,
  path: &'a ModulePath,
}

impl<'a> Evaluator<'a> {
  async fn exec_stmt(
    &self,
    scope: &Rc<Env>,
    stmt: &Stmt,
  ) -> Result<(), EvalError> {
    match &stmt.kind {
      StmtKind::Decl {
        binding,
        name,
        init,
      } => {
        let value = self.eval(scope, init).await?;
        scope.declare(name, value, *binding == BindingKind::Let)?;
      }
      StmtKind::Assign { target, value } => {
        let value = self.eval(scope, value).await?;
        match target {
          AssignTarget::Ident(name) => scope.assign(name, value)?,
          AssignTarget::Member { object, property } => {
            let object = self.eval(scope, object).await?;
            let Value::Object(object) = object else {
              return Err(EvalError::CannotSetProperty {
                property: property.clone(),
                found: object.type_name(),
              });
            };
            object.set(property.clone(), value);
          }
        }
      }
      StmtKind::Expr(expr) => {
        self.eval(scope, expr).await?;
      }
      StmtKind::Import(_)
      | StmtKind::ExportDefault(_)
      | StmtKind::ExportDecl { .. } => {
        unreachable!("module syntax is rejected by script mode parsing")
      }
    }
    Ok(())
  }

  fn eval<'b>(
    &'b self,
    scope: &'b Rc<Env>,
    expr: &'b Expr,
  ) -> LocalBoxFuture<'b, Result<Value, EvalError>> {
    async move {
      match &expr.kind {
        ExprKind::Null => Ok(Value::Null),
        ExprKind::Bool(value) => Ok(Value::Bool(*value)),
        ExprKind::Number(value) => Ok(Value::Number(*value)),
        ExprKind::Str(value) => Ok(Value::Str(value.as_str().into())),
        ExprKind::Ident(name) => {
          scope.get(name).ok_or_else(|| EvalError::UndefinedVariable {
            name: name.clone(),
          })
        }
        ExprKind::Object(props) => {
          let object = ObjectRef::new();
          for (key, value) in props {
            let value = self.eval(scope, value).await?;
            object.set(key.clone(), value);
          }
          Ok(Value::Object(object))
        }
        ExprKind::Member { object, property } => {
          let object = self.eval(scope, object).await?;
          match object {
            Value::Object(object) => {
              Ok(object.get(property).unwrap_or(Value::Null))
            }
            other => Err(EvalError::NotAnObject {
              property: property.clone(),
              found: other.type_name(),
            }),
          }
        }
        ExprKind::Call { callee, args } => {
          // the loader operations exist only in call position
          if let ExprKind::Ident(name) = &callee.kind {
            if name == REQUIRE_FN {
              return self.call_require(scope, args).await;
            }
            if name == DYNAMIC_IMPORT_FN {
              return self.call_dynamic_import(scope, args).await;
            }
          }
          let callee = self.eval(scope, callee).await?;
          let Value::Function(closure) = callee else {
            return Err(EvalError::NotAFunction {
              found: callee.type_name(),
            });
          };
          if args.len() != closure.params.len() {
            return Err(EvalError::WrongArgumentCount {
              expected: closure.params.len(),
              found: args.len(),
            });
          }
          let call_scope = Env::child(&closure.env);
          for (param, arg) in closure.params.iter().zip(args) {
            let value = self.eval(scope, arg).await?;
            call_scope.declare(param, value, true)?;
          }
          self.eval(&call_scope, &closure.body).await
        }
        // a dynamic import that reached execution unrewritten behaves
        // exactly like its rewritten form
        ExprKind::ImportCall { args } => {
          self.call_dynamic_import(scope, args).await
        }
        ExprKind::Unary { op, expr } => {
          let value = self.eval(scope, expr).await?;
          match op {
            UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
            UnaryOp::Neg => match value {
              Value::Number(value) => Ok(Value::Number(-value)),
              other => Err(EvalError::InvalidUnaryOperand {
                op: "-",
                operand: other.type_name(),
              }),
            },
          }
        }
        ExprKind::Binary { op, left, right } => {
          let left = self.eval(scope, left).await?;
          let right = self.eval(scope, right).await?;
          binary_op(*op, left, right)
        }
        ExprKind::Arrow { params, body } => {
          Ok(Value::Function(Rc::new(Closure {
            params: params.clone(),
            body: (**body).clone(),
            env: scope.clone(),
          })))
        }
      }
    }
    .boxed_local()
  }

  async fn call_require(
    &self,
    scope: &Rc<Env>,
    args: &[Expr],
  ) -> Result<Value, EvalError> {
    let specifier = self.specifier_arg(scope, args).await?;
    let resolved = self.ctx.resolver.resolve(&specifier, self.path)?;
    match self.ctx.registry.get(&resolved) {
      Some(record) => Ok(Value::Object(record.exports)),
      None => Err(EvalError::ModuleNotLoaded { path: resolved }),
    }
  }

  async fn call_dynamic_import(
    &self,
    scope: &Rc<Env>,
    args: &[Expr],
  ) -> Result<Value, EvalError> {
    let specifier = self.specifier_arg(scope, args).await?;
    let resolved = self.ctx.resolver.resolve(&specifier, self.path)?;
    let exports = self
      .ctx
      .loader
      .load(self.ctx, &resolved)
      .await
      .map_err(|err| EvalError::DynamicImport(Arc::new(err)))?;
    Ok(Value::Object(exports))
  }

  /// Evaluates a loader operation's arguments in order and takes the
  /// first as the specifier; anything past it is evaluated for effect
  /// and ignored, mirroring how the rewrite preserves argument lists.
  async fn specifier_arg(
    &self,
    scope: &Rc<Env>,
    args: &[Expr],
  ) -> Result<String, EvalError> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
      values.push(self.eval(scope, arg).await?);
    }
    match values.into_iter().next() {
      Some(Value::Str(specifier)) => Ok(specifier.to_string()),
      Some(other) => Err(EvalError::InvalidSpecifier {
        found: other.type_name().to_string(),
      }),
      None => Err(EvalError::InvalidSpecifier {
        found: "no arguments".to_string(),
      }),
    }
  }
}

fn binary_op(
  op: BinaryOp,
  left: Value,
  right: Value,
) -> Result<Value, EvalError> {
  let invalid = |left: &Value, right: &Value| EvalError::InvalidOperands {
    op: op.text(),
    left: left.type_name(),
    right: right.type_name(),
  };
  match op {
    BinaryOp::Add => match (&left, &right) {
      (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
      (Value::Str(_), _) | (_, Value::Str(_)) => {
        Ok(Value::Str(format!("{}{}", left, right).into()))
      }
      _ => Err(invalid(&left, &right)),
    },
    BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
      match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(match op {
          BinaryOp::Sub => a - b,
          BinaryOp::Mul => a * b,
          BinaryOp::Div => a / b,
          _ => a % b,
        })),
        _ => Err(invalid(&left, &right)),
      }
    }
    BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
      let ordering = match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => {
          a.partial_cmp(b).ok_or_else(|| invalid(&left, &right))?
        }
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => return Err(invalid(&left, &right)),
      };
      Ok(Value::Bool(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
      }))
    }
    BinaryOp::Eq => Ok(Value::Bool(left == right)),
    BinaryOp::Ne => Ok(Value::Bool(left != right)),
  }
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::source::MemoryModuleLoader;

  fn test_ctx() -> LoaderContext {
    LoaderContext::new(Rc::new(MemoryModuleLoader::default()))
  }

  fn path() -> ModulePath {
    ModulePath::new("/app/main.weft").unwrap()
  }

  async fn run(text: &str) -> ObjectRef {
    instantiate_module(&test_ctx(), &path(), text).await.unwrap()
  }

  async fn run_err(text: &str) -> LoadError {
    instantiate_module(&test_ctx(), &path(), text)
      .await
      .unwrap_err()
  }

  fn eval_err(err: LoadError) -> EvalError {
    match err {
      LoadError::Eval(err) => err,
      other => panic!("expected eval error, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_instantiate_arithmetic() {
    let exports = run("exports.default = 1 + 2 * 3 - 4 / 2;").await;
    assert_eq!(exports.get("default"), Some(Value::Number(5.0)));
  }

  #[tokio::test]
  async fn test_instantiate_strings_and_objects() {
    let exports = run(concat!(
      "let who = \"weft\";\n",
      "let o = { greeting: \"hello \" + who, nested: { n: 1 } };\n",
      "exports.default = o.greeting;\n",
      "exports.nested = o.nested.n;\n",
      "exports.missing = o.absent;\n",
    ))
    .await;
    assert_eq!(exports.get("default"), Some(Value::Str("hello weft".into())));
    assert_eq!(exports.get("nested"), Some(Value::Number(1.0)));
    assert_eq!(exports.get("missing"), Some(Value::Null));
  }

  #[tokio::test]
  async fn test_instantiate_arrows_capture_scope() {
    let exports = run(concat!(
      "let base = 10;\n",
      "let add = n => base + n;\n",
      "let twice = (f, x) => f(f(x));\n",
      "exports.default = twice(add, 1);\n",
    ))
    .await;
    assert_eq!(exports.get("default"), Some(Value::Number(21.0)));
  }

  #[tokio::test]
  async fn test_instantiate_module_bindings() {
    let exports = run(concat!(
      "exports.file = __filename;\n",
      "exports.dir = __dirname;\n",
      "module.exports.via_module = 1;\n",
    ))
    .await;
    assert_eq!(
      exports.get("file"),
      Some(Value::Str("/app/main.weft".into()))
    );
    assert_eq!(exports.get("dir"), Some(Value::Str("/app".into())));
    assert_eq!(exports.get("via_module"), Some(Value::Number(1.0)));
  }

  #[tokio::test]
  async fn test_instantiate_comparisons_and_logic() {
    let exports = run(concat!(
      "exports.lt = 1 < 2;\n",
      "exports.mixed = \"a\" < \"b\";\n",
      "exports.eq = 2 == 2;\n",
      "exports.ne = 2 != \"2\";\n",
      "exports.not = !null;\n",
    ))
    .await;
    assert_eq!(exports.get("lt"), Some(Value::Bool(true)));
    assert_eq!(exports.get("mixed"), Some(Value::Bool(true)));
    assert_eq!(exports.get("eq"), Some(Value::Bool(true)));
    assert_eq!(exports.get("ne"), Some(Value::Bool(true)));
    assert_eq!(exports.get("not"), Some(Value::Bool(true)));
  }

  #[tokio::test]
  async fn test_require_unloaded_module_names_path() {
    let err = eval_err(run_err("let dep = require(\"./dep.weft\");").await);
    let EvalError::ModuleNotLoaded { path } = err else {
      panic!("expected ModuleNotLoaded, got {:?}", err);
    };
    assert_eq!(path.as_str(), "/app/dep.weft");
  }

  #[tokio::test]
  async fn test_require_returns_registered_exports() {
    let ctx = test_ctx();
    let dep_path = ModulePath::new("/app/dep.weft").unwrap();
    let dep_exports = ctx.registry.ensure(&dep_path);
    dep_exports.set("answer", Value::Number(42.0));

    let exports = instantiate_module(
      &ctx,
      &path(),
      "exports.default = require(\"./dep.weft\").answer;",
    )
    .await
    .unwrap();
    assert_eq!(exports.get("default"), Some(Value::Number(42.0)));
  }

  #[tokio::test]
  async fn test_instantiate_rejects_module_syntax() {
    let err = run_err("export default 1;").await;
    let LoadError::Parse(diagnostic) = err else {
      panic!("expected parse error, got {:?}", err);
    };
    assert_eq!(
      diagnostic.message,
      "export declarations are not allowed in script code"
    );
  }

  #[tokio::test]
  async fn test_instantiate_error_cases() {
    let err = eval_err(run_err("exports.default = missing;").await);
    assert!(
      matches!(err, EvalError::UndefinedVariable { name } if name == "missing")
    );

    let err = eval_err(run_err("const c = 1;\nc = 2;").await);
    assert!(matches!(err, EvalError::AssignToConst { name } if name == "c"));

    let err = eval_err(run_err("let f = x => x;\nf(1, 2);").await);
    assert!(matches!(
      err,
      EvalError::WrongArgumentCount {
        expected: 1,
        found: 2
      }
    ));

    let err = eval_err(run_err("exports.default = null.field;").await);
    assert!(matches!(err, EvalError::NotAnObject { found: "null", .. }));

    let err = eval_err(run_err("exports.default = 1 + null;").await);
    assert!(matches!(err, EvalError::InvalidOperands { op: "+", .. }));

    let err = eval_err(run_err("require(1);").await);
    assert!(matches!(err, EvalError::InvalidSpecifier { .. }));
  }

  #[tokio::test]
  async fn test_fixed_scope_rejects_rebinding() {
    let err = eval_err(run_err("let exports = 1;").await);
    assert!(
      matches!(err, EvalError::AlreadyDeclared { name } if name == "exports")
    );
  }

  #[tokio::test]
  async fn test_loader_operations_are_not_values() {
    let err = eval_err(run_err("exports.default = require;").await);
    assert!(
      matches!(err, EvalError::UndefinedVariable { name } if name == "require")
    );
  }

  #[tokio::test]
  async fn test_instantiate_reuses_registry_record() {
    let ctx = test_ctx();
    let placeholder = ctx.registry.ensure(&path());
    let exports = instantiate_module(&ctx, &path(), "exports.default = 1;")
      .await
      .unwrap();
    assert_eq!(exports, placeholder);
    assert_eq!(placeholder.get("default"), Some(Value::Number(1.0)));
  }
}
