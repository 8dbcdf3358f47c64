// Copyright 2024-2026 the Weft authors. MIT license.

use super::AssignTarget;
use super::BinaryOp;
use super::BindingKind;
use super::Expr;
use super::ExprKind;
use super::ImportClause;
use super::Module;
use super::Stmt;
use super::StmtKind;

#[derive(Debug, Default, Clone)]
pub struct EmitOptions {
  /// When set, every emitted statement carries a trailing `/*@ line:col */`
  /// marker pointing back at the source position it was lowered from.
  pub source_positions: bool,
}

/// Prints a module back to source text, one statement per line. The output
/// re-parses to an equivalent tree; parentheses are reintroduced from
/// operator precedence rather than preserved.
pub fn emit_module(module: &Module, options: &EmitOptions) -> String {
  let mut out = String::new();
  for stmt in &module.body {
    emit_stmt(stmt, &mut out);
    if options.source_positions {
      out.push_str(&format!(" /*@ {} */", stmt.pos));
    }
    out.push('\n');
  }
  out
}

fn emit_stmt(stmt: &Stmt, out: &mut String) {
  match &stmt.kind {
    StmtKind::Import(decl) => {
      match &decl.clause {
        ImportClause::Default(name) => {
          out.push_str(&format!("import {} from ", name));
        }
        ImportClause::Namespace(name) => {
          out.push_str(&format!("import * as {} from ", name));
        }
        ImportClause::Named(names) => {
          out.push_str(&format!("import {{ {} }} from ", names.join(", ")));
        }
        ImportClause::None => out.push_str("import "),
      }
      out.push_str(&quote_str(&decl.specifier));
      out.push(';');
    }
    StmtKind::ExportDefault(expr) => {
      out.push_str("export default ");
      emit_expr(expr, 0, out);
      out.push(';');
    }
    StmtKind::ExportDecl {
      binding,
      name,
      init,
    } => {
      out.push_str(&format!("export {} {} = ", binding_text(*binding), name));
      emit_expr(init, 0, out);
      out.push(';');
    }
    StmtKind::Decl {
      binding,
      name,
      init,
    } => {
      out.push_str(&format!("{} {} = ", binding_text(*binding), name));
      emit_expr(init, 0, out);
      out.push(';');
    }
    StmtKind::Assign { target, value } => {
      match target {
        AssignTarget::Ident(name) => out.push_str(name),
        AssignTarget::Member { object, property } => {
          emit_expr(object, PREC_POSTFIX, out);
          out.push('.');
          out.push_str(property);
        }
      }
      out.push_str(" = ");
      emit_expr(value, 0, out);
      out.push(';');
    }
    StmtKind::Expr(expr) => {
      emit_expr(expr, 0, out);
      out.push(';');
    }
  }
}

const PREC_UNARY: u8 = 5;
const PREC_POSTFIX: u8 = 6;
const PREC_PRIMARY: u8 = 7;

fn expr_prec(expr: &Expr) -> u8 {
  match &expr.kind {
    ExprKind::Arrow { .. } => 0,
    ExprKind::Binary { op, .. } => binary_prec(*op),
    ExprKind::Unary { .. } => PREC_UNARY,
    ExprKind::Member { .. }
    | ExprKind::Call { .. }
    | ExprKind::ImportCall { .. } => PREC_POSTFIX,
    _ => PREC_PRIMARY,
  }
}

fn binary_prec(op: BinaryOp) -> u8 {
  match op {
    BinaryOp::Eq | BinaryOp::Ne => 1,
    BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 2,
    BinaryOp::Add | BinaryOp::Sub => 3,
    BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 4,
  }
}

fn emit_expr(expr: &Expr, min_prec: u8, out: &mut String) {
  if expr_prec(expr) < min_prec {
    out.push('(');
    emit_expr(expr, 0, out);
    out.push(')');
    return;
  }
  match &expr.kind {
    ExprKind::Null => out.push_str("null"),
    ExprKind::Bool(true) => out.push_str("true"),
    ExprKind::Bool(false) => out.push_str("false"),
    ExprKind::Number(value) => out.push_str(&format_number(*value)),
    ExprKind::Str(value) => out.push_str(&quote_str(value)),
    ExprKind::Ident(name) => out.push_str(name),
    ExprKind::Object(props) => {
      if props.is_empty() {
        out.push_str("{}");
        return;
      }
      out.push_str("{ ");
      for (i, (key, value)) in props.iter().enumerate() {
        if i > 0 {
          out.push_str(", ");
        }
        out.push_str(key);
        out.push_str(": ");
        emit_expr(value, 0, out);
      }
      out.push_str(" }");
    }
    ExprKind::Member { object, property } => {
      emit_expr(object, PREC_POSTFIX, out);
      out.push('.');
      out.push_str(property);
    }
    ExprKind::Call { callee, args } => {
      emit_expr(callee, PREC_POSTFIX, out);
      emit_args(args, out);
    }
    ExprKind::ImportCall { args } => {
      out.push_str("import");
      emit_args(args, out);
    }
    ExprKind::Unary { op, expr } => {
      out.push_str(op.text());
      emit_expr(expr, PREC_UNARY, out);
    }
    ExprKind::Binary { op, left, right } => {
      let prec = binary_prec(*op);
      emit_expr(left, prec, out);
      out.push_str(&format!(" {} ", op.text()));
      emit_expr(right, prec + 1, out);
    }
    ExprKind::Arrow { params, body } => {
      out.push('(');
      out.push_str(&params.join(", "));
      out.push_str(") => ");
      emit_expr(body, 0, out);
    }
  }
}

fn emit_args(args: &[Expr], out: &mut String) {
  out.push('(');
  for (i, arg) in args.iter().enumerate() {
    if i > 0 {
      out.push_str(", ");
    }
    emit_expr(arg, 0, out);
  }
  out.push(')');
}

fn binding_text(binding: BindingKind) -> &'static str {
  match binding {
    BindingKind::Let => "let",
    BindingKind::Const => "const",
  }
}

pub(crate) fn format_number(value: f64) -> String {
  let integral = value.is_finite()
    && value.fract() == 0.0
    && value.abs() < 9_007_199_254_740_992.0;
  if integral {
    format!("{}", value as i64)
  } else {
    format!("{}", value)
  }
}

pub(crate) fn quote_str(value: &str) -> String {
  let mut out = String::with_capacity(value.len() + 2);
  out.push('"');
  for ch in value.chars() {
    match ch {
      '\\' => out.push_str("\\\\"),
      '"' => out.push_str("\\\""),
      '\n' => out.push_str("\\n"),
      '\t' => out.push_str("\\t"),
      '\r' => out.push_str("\\r"),
      ch => out.push(ch),
    }
  }
  out.push('"');
  out
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::super::parse;
  use super::super::ModuleKind;
  use super::*;
  use crate::module_path::ModulePath;

  fn emit(source: &str) -> String {
    let path = ModulePath::new("/test.weft").unwrap();
    let module = parse(&path, source, ModuleKind::Module).unwrap();
    emit_module(&module, &EmitOptions::default())
  }

  #[test]
  fn test_emit_statements() {
    let cases = [
      ("let a=1;", "let a = 1;\n"),
      ("const s = 'hi';", "const s = \"hi\";\n"),
      ("a.b.c = 1 + 2;", "a.b.c = 1 + 2;\n"),
      ("f(1, \"two\", g());", "f(1, \"two\", g());\n"),
      ("let o = {a: 1, b};", "let o = { a: 1, b: b };\n"),
      ("import d from './d.weft';", "import d from \"./d.weft\";\n"),
      (
        "import { a, b } from './ab.weft';",
        "import { a, b } from \"./ab.weft\";\n",
      ),
      ("export default 1 + 1;", "export default 1 + 1;\n"),
      ("import('./x.weft');", "import(\"./x.weft\");\n"),
    ];
    for (source, expected) in cases {
      assert_eq!(emit(source), expected, "{:?}", source);
    }
  }

  #[test]
  fn test_emit_reintroduces_parens() {
    let cases = [
      ("let a = (1 + 2) * 3;", "let a = (1 + 2) * 3;\n"),
      ("let b = 1 + 2 * 3;", "let b = 1 + 2 * 3;\n"),
      ("let c = -(1 + 2);", "let c = -(1 + 2);\n"),
      ("let d = (x => x)(1);", "let d = ((x) => x)(1);\n"),
      ("let e = 1 - (2 - 3);", "let e = 1 - (2 - 3);\n"),
    ];
    for (source, expected) in cases {
      assert_eq!(emit(source), expected, "{:?}", source);
    }
  }

  #[test]
  fn test_emit_escapes_strings() {
    assert_eq!(
      emit("let s = 'a\\n\"b\"';"),
      "let s = \"a\\n\\\"b\\\"\";\n"
    );
  }

  #[test]
  fn test_emit_position_markers() {
    let path = ModulePath::new("/test.weft").unwrap();
    let module =
      parse(&path, "let a = 1;\nlet b = 2;", ModuleKind::Module).unwrap();
    let emitted = emit_module(
      &module,
      &EmitOptions {
        source_positions: true,
      },
    );
    assert_eq!(
      emitted,
      "let a = 1; /*@ 1:1 */\nlet b = 2; /*@ 2:1 */\n"
    );
  }

  #[test]
  fn test_emit_numbers() {
    assert_eq!(format_number(42.0), "42");
    assert_eq!(format_number(-3.0), "-3");
    assert_eq!(format_number(1.5), "1.5");
  }
}
