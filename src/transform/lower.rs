// Copyright 2024-2026 the Weft authors. MIT license.

use crate::diagnostics::Position;
use crate::syntax::AssignTarget;
use crate::syntax::BindingKind;
use crate::syntax::Expr;
use crate::syntax::ExprKind;
use crate::syntax::ImportClause;
use crate::syntax::ImportDecl;
use crate::syntax::Module;
use crate::syntax::Stmt;
use crate::syntax::StmtKind;

use super::SyntaxPass;
use super::EXPORTS_BINDING;
use super::REQUIRE_FN;

/// The built in lowering pass: rewrites module syntax into the function
/// based convention executed at instantiation time.
///
/// ```text
/// import d from "s";        =>  let d = require("s").default;
/// import * as ns from "s";  =>  let ns = require("s");
/// import { a, b } from "s"; =>  let __mod0 = require("s");
///                               let a = __mod0.a;
///                               let b = __mod0.b;
/// import "s";               =>  require("s");
/// export default e;         =>  exports.default = e;
/// export let n = e;         =>  let n = e; exports.n = n;
/// ```
///
/// Lowered statements inherit the source position of the declaration they
/// came from. Everything else passes through untouched.
pub struct LowerModules;

impl SyntaxPass for LowerModules {
  fn name(&self) -> &'static str {
    "lower_modules"
  }

  fn run(&self, module: &mut Module) {
    let mut lowered = Vec::with_capacity(module.body.len());
    let mut temp_counter = 0usize;
    for stmt in module.body.drain(..) {
      match stmt.kind {
        StmtKind::Import(decl) => {
          lower_import(stmt.pos, decl, &mut temp_counter, &mut lowered)
        }
        StmtKind::ExportDefault(expr) => {
          lowered.push(export_assign(stmt.pos, "default", expr));
        }
        StmtKind::ExportDecl {
          binding,
          name,
          init,
        } => {
          lowered.push(Stmt {
            pos: stmt.pos,
            kind: StmtKind::Decl {
              binding,
              name: name.clone(),
              init,
            },
          });
          lowered.push(export_assign(stmt.pos, &name, ident(stmt.pos, &name)));
        }
        other => lowered.push(Stmt {
          pos: stmt.pos,
          kind: other,
        }),
      }
    }
    module.body = lowered;
  }
}

fn lower_import(
  pos: Position,
  decl: ImportDecl,
  temp_counter: &mut usize,
  out: &mut Vec<Stmt>,
) {
  match decl.clause {
    ImportClause::Default(name) => {
      out.push(let_decl(
        pos,
        name,
        member(pos, require_call(pos, &decl.specifier), "default"),
      ));
    }
    ImportClause::Namespace(name) => {
      out.push(let_decl(pos, name, require_call(pos, &decl.specifier)));
    }
    ImportClause::Named(names) => {
      let temp = format!("__mod{}", temp_counter);
      *temp_counter += 1;
      out.push(let_decl(
        pos,
        temp.clone(),
        require_call(pos, &decl.specifier),
      ));
      for name in names {
        out.push(let_decl(
          pos,
          name.clone(),
          member(pos, ident(pos, &temp), &name),
        ));
      }
    }
    ImportClause::None => {
      out.push(Stmt {
        pos,
        kind: StmtKind::Expr(require_call(pos, &decl.specifier)),
      });
    }
  }
}

fn require_call(pos: Position, specifier: &str) -> Expr {
  Expr {
    pos,
    kind: ExprKind::Call {
      callee: Box::new(ident(pos, REQUIRE_FN)),
      args: vec![Expr {
        pos,
        kind: ExprKind::Str(specifier.to_string()),
      }],
    },
  }
}

fn member(pos: Position, object: Expr, property: &str) -> Expr {
  Expr {
    pos,
    kind: ExprKind::Member {
      object: Box::new(object),
      property: property.to_string(),
    },
  }
}

fn ident(pos: Position, name: &str) -> Expr {
  Expr {
    pos,
    kind: ExprKind::Ident(name.to_string()),
  }
}

fn let_decl(pos: Position, name: String, init: Expr) -> Stmt {
  Stmt {
    pos,
    kind: StmtKind::Decl {
      binding: BindingKind::Let,
      name,
      init,
    },
  }
}

fn export_assign(pos: Position, key: &str, value: Expr) -> Stmt {
  Stmt {
    pos,
    kind: StmtKind::Assign {
      target: AssignTarget::Member {
        object: ident(pos, EXPORTS_BINDING),
        property: key.to_string(),
      },
      value,
    },
  }
}
