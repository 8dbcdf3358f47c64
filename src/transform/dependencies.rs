// Copyright 2024-2026 the Weft authors. MIT license.

use crate::syntax::AssignTarget;
use crate::syntax::Expr;
use crate::syntax::ExprKind;
use crate::syntax::Module;
use crate::syntax::StmtKind;

use super::REQUIRE_FN;

/// Collects the static dependency specifiers of a module in source order:
/// the specifier of every import declaration, plus the argument of every
/// call to [`REQUIRE_FN`] whose argument list is exactly one string
/// literal. Duplicates are preserved. Computed or multi argument `require`
/// calls are not statically knowable and are skipped, as are rewritten
/// dynamic imports (their callee is [`super::DYNAMIC_IMPORT_FN`], not the
/// synchronous one).
pub fn collect_dependencies(module: &Module) -> Vec<String> {
  let mut deps = Vec::new();
  for stmt in &module.body {
    match &stmt.kind {
      StmtKind::Import(decl) => deps.push(decl.specifier.clone()),
      StmtKind::ExportDefault(expr) | StmtKind::Expr(expr) => {
        collect_expr(expr, &mut deps)
      }
      StmtKind::ExportDecl { init, .. } | StmtKind::Decl { init, .. } => {
        collect_expr(init, &mut deps)
      }
      StmtKind::Assign { target, value } => {
        if let AssignTarget::Member { object, .. } = target {
          collect_expr(object, &mut deps);
        }
        collect_expr(value, &mut deps);
      }
    }
  }
  deps
}

fn collect_expr(expr: &Expr, deps: &mut Vec<String>) {
  match &expr.kind {
    ExprKind::Call { callee, args } => {
      if let (ExprKind::Ident(name), [arg]) = (&callee.kind, args.as_slice()) {
        if name == REQUIRE_FN {
          if let ExprKind::Str(specifier) = &arg.kind {
            deps.push(specifier.clone());
            return;
          }
        }
      }
      collect_expr(callee, deps);
      for arg in args {
        collect_expr(arg, deps);
      }
    }
    ExprKind::ImportCall { args } => {
      for arg in args {
        collect_expr(arg, deps);
      }
    }
    ExprKind::Object(props) => {
      for (_, value) in props {
        collect_expr(value, deps);
      }
    }
    ExprKind::Member { object, .. } => collect_expr(object, deps),
    ExprKind::Unary { expr, .. } => collect_expr(expr, deps),
    ExprKind::Binary { left, right, .. } => {
      collect_expr(left, deps);
      collect_expr(right, deps);
    }
    ExprKind::Arrow { body, .. } => collect_expr(body, deps),
    ExprKind::Null
    | ExprKind::Bool(_)
    | ExprKind::Number(_)
    | ExprKind::Str(_)
    | ExprKind::Ident(_) => {}
  }
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::super::rewrite_dynamic_imports;
  use super::*;
  use crate::module_path::ModulePath;
  use crate::syntax::parse;
  use crate::syntax::ModuleKind;

  fn deps_of(source: &str) -> Vec<String> {
    let path = ModulePath::new("/test.weft").unwrap();
    let module = parse(&path, source, ModuleKind::Module).unwrap();
    collect_dependencies(&module)
  }

  #[test]
  fn test_collect_in_source_order_with_duplicates() {
    let deps = deps_of(concat!(
      "import a from \"a\";\n",
      "let b = require(\"b\");\n",
      "import \"c\";\n",
      "let again = require(\"a\");\n",
    ));
    assert_eq!(deps, vec!["a", "b", "c", "a"]);
  }

  #[test]
  fn test_collect_nested_requires() {
    let deps = deps_of(concat!(
      "let o = { dep: require(\"x\") };\n",
      "f(require(\"y\"), 1 + require(\"z\"));\n",
    ));
    assert_eq!(deps, vec!["x", "y", "z"]);
  }

  #[test]
  fn test_collect_skips_non_literal_requires() {
    let deps = deps_of(concat!(
      "let name = \"a\";\n",
      "require(name);\n",
      "require(\"x\", \"extra\");\n",
      "require();\n",
      "other(\"not-a-dep\");\n",
    ));
    assert_eq!(deps, Vec::<String>::new());
  }

  #[test]
  fn test_collect_skips_rewritten_dynamic_imports() {
    let path = ModulePath::new("/test.weft").unwrap();
    let mut module = parse(
      &path,
      "let p = import(\"./later.weft\");\nlet q = require(\"now\");",
      ModuleKind::Module,
    )
    .unwrap();
    rewrite_dynamic_imports(&mut module);
    assert_eq!(collect_dependencies(&module), vec!["now"]);
  }

  #[test]
  fn test_collect_inner_require_of_computed_require() {
    // the outer call is not a static dependency, the inner one is
    assert_eq!(deps_of("require(require(\"inner\"));"), vec!["inner"]);
  }
}
