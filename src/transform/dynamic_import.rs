// Copyright 2024-2026 the Weft authors. MIT license.

use crate::syntax::AssignTarget;
use crate::syntax::Expr;
use crate::syntax::ExprKind;
use crate::syntax::Module;
use crate::syntax::Stmt;
use crate::syntax::StmtKind;

use super::DYNAMIC_IMPORT_FN;

/// Replaces every reserved `import(...)` expression in the tree with an
/// ordinary call to [`DYNAMIC_IMPORT_FN`], argument list preserved
/// verbatim. After this runs no `ImportCall` node remains, so later passes
/// matching ordinary call syntax observe these sites like any other call.
pub fn rewrite_dynamic_imports(module: &mut Module) {
  for stmt in &mut module.body {
    rewrite_stmt(stmt);
  }
}

fn rewrite_stmt(stmt: &mut Stmt) {
  match &mut stmt.kind {
    StmtKind::Import(_) => {}
    StmtKind::ExportDefault(expr) | StmtKind::Expr(expr) => rewrite_expr(expr),
    StmtKind::ExportDecl { init, .. } | StmtKind::Decl { init, .. } => {
      rewrite_expr(init)
    }
    StmtKind::Assign { target, value } => {
      if let AssignTarget::Member { object, .. } = target {
        rewrite_expr(object);
      }
      rewrite_expr(value);
    }
  }
}

fn rewrite_expr(expr: &mut Expr) {
  match &mut expr.kind {
    ExprKind::ImportCall { args } => {
      let mut args = std::mem::take(args);
      for arg in &mut args {
        rewrite_expr(arg);
      }
      expr.kind = ExprKind::Call {
        callee: Box::new(Expr {
          pos: expr.pos,
          kind: ExprKind::Ident(DYNAMIC_IMPORT_FN.to_string()),
        }),
        args,
      };
    }
    ExprKind::Object(props) => {
      for (_, value) in props {
        rewrite_expr(value);
      }
    }
    ExprKind::Member { object, .. } => rewrite_expr(object),
    ExprKind::Call { callee, args } => {
      rewrite_expr(callee);
      for arg in args {
        rewrite_expr(arg);
      }
    }
    ExprKind::Unary { expr, .. } => rewrite_expr(expr),
    ExprKind::Binary { left, right, .. } => {
      rewrite_expr(left);
      rewrite_expr(right);
    }
    ExprKind::Arrow { body, .. } => rewrite_expr(body),
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

  use super::*;
  use crate::module_path::ModulePath;
  use crate::syntax::parse;
  use crate::syntax::ModuleKind;

  fn parsed(source: &str) -> Module {
    let path = ModulePath::new("/test.weft").unwrap();
    parse(&path, source, ModuleKind::Module).unwrap()
  }

  fn count_import_calls(module: &Module) -> usize {
    fn walk(expr: &Expr, count: &mut usize) {
      match &expr.kind {
        ExprKind::ImportCall { args } => {
          *count += 1;
          for arg in args {
            walk(arg, count);
          }
        }
        ExprKind::Object(props) => {
          for (_, value) in props {
            walk(value, count);
          }
        }
        ExprKind::Member { object, .. } => walk(object, count),
        ExprKind::Call { callee, args } => {
          walk(callee, count);
          for arg in args {
            walk(arg, count);
          }
        }
        ExprKind::Unary { expr, .. } => walk(expr, count),
        ExprKind::Binary { left, right, .. } => {
          walk(left, count);
          walk(right, count);
        }
        ExprKind::Arrow { body, .. } => walk(body, count),
        _ => {}
      }
    }
    let mut count = 0;
    for stmt in &module.body {
      match &stmt.kind {
        StmtKind::ExportDefault(expr) | StmtKind::Expr(expr) => {
          walk(expr, &mut count)
        }
        StmtKind::ExportDecl { init, .. } | StmtKind::Decl { init, .. } => {
          walk(init, &mut count)
        }
        StmtKind::Assign { value, .. } => walk(value, &mut count),
        StmtKind::Import(_) => {}
      }
    }
    count
  }

  #[test]
  fn test_rewrite_replaces_import_call() {
    let mut module = parsed("let p = import(\"./later.weft\");");
    assert_eq!(count_import_calls(&module), 1);
    rewrite_dynamic_imports(&mut module);
    assert_eq!(count_import_calls(&module), 0);

    let StmtKind::Decl { init, .. } = &module.body[0].kind else {
      panic!("expected decl");
    };
    let ExprKind::Call { callee, args } = &init.kind else {
      panic!("expected rewritten call, got {:?}", init.kind);
    };
    assert_eq!(
      callee.kind,
      ExprKind::Ident(DYNAMIC_IMPORT_FN.to_string())
    );
    assert_eq!(args.len(), 1);
    assert_eq!(args[0].kind, ExprKind::Str("./later.weft".to_string()));
  }

  #[test]
  fn test_rewrite_preserves_argument_list() {
    let mut module = parsed("import(\"./a.weft\", 1, helper());");
    rewrite_dynamic_imports(&mut module);
    let StmtKind::Expr(expr) = &module.body[0].kind else {
      panic!("expected expression statement");
    };
    let ExprKind::Call { args, .. } = &expr.kind else {
      panic!("expected call");
    };
    assert_eq!(args.len(), 3);
    assert_eq!(args[0].kind, ExprKind::Str("./a.weft".to_string()));
    assert_eq!(args[1].kind, ExprKind::Number(1.0));
    assert!(matches!(args[2].kind, ExprKind::Call { .. }));
  }

  #[test]
  fn test_rewrite_reaches_nested_expressions() {
    let mut module = parsed(concat!(
      "let o = { p: import(\"./a.weft\") };\n",
      "f(1 + import(\"./b.weft\"), x => import(\"./c.weft\"));\n",
      "exports.lazy = import(import(\"./d.weft\"));\n",
    ));
    assert_eq!(count_import_calls(&module), 5);
    rewrite_dynamic_imports(&mut module);
    assert_eq!(count_import_calls(&module), 0);
  }
}
