// Copyright 2024-2026 the Weft authors. MIT license.

mod emit;
mod lexer;
mod parser;

pub use emit::emit_module;
pub use emit::EmitOptions;
pub use parser::parse;

pub(crate) use emit::format_number;

use crate::diagnostics::Position;

/// How a source file is parsed. `Module` enables import and export
/// declarations; `Script` rejects them, which is what lowered source is
/// re-parsed as before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
  Module,
  Script,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
  pub kind: ModuleKind,
  pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
  pub pos: Position,
  pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
  Import(ImportDecl),
  ExportDefault(Expr),
  ExportDecl {
    binding: BindingKind,
    name: String,
    init: Expr,
  },
  Decl {
    binding: BindingKind,
    name: String,
    init: Expr,
  },
  Assign {
    target: AssignTarget,
    value: Expr,
  },
  Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
  Let,
  Const,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
  pub clause: ImportClause,
  pub specifier: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportClause {
  /// `import name from "specifier";`
  Default(String),
  /// `import * as name from "specifier";`
  Namespace(String),
  /// `import { a, b } from "specifier";`
  Named(Vec<String>),
  /// `import "specifier";`
  None,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
  Ident(String),
  Member { object: Expr, property: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
  pub pos: Position,
  pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
  Null,
  Bool(bool),
  Number(f64),
  Str(String),
  Ident(String),
  Object(Vec<(String, Expr)>),
  Member {
    object: Box<Expr>,
    property: String,
  },
  Call {
    callee: Box<Expr>,
    args: Vec<Expr>,
  },
  /// The reserved dynamic import operator, `import(...)`. Distinct from
  /// `Call` so passes matching ordinary calls never observe it; the
  /// dynamic import rewrite turns it into one before anything else runs.
  ImportCall {
    args: Vec<Expr>,
  },
  Unary {
    op: UnaryOp,
    expr: Box<Expr>,
  },
  Binary {
    op: BinaryOp,
    left: Box<Expr>,
    right: Box<Expr>,
  },
  Arrow {
    params: Vec<String>,
    body: Box<Expr>,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Neg,
  Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Rem,
  Lt,
  Le,
  Gt,
  Ge,
  Eq,
  Ne,
}

impl BinaryOp {
  pub fn text(&self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Rem => "%",
      BinaryOp::Lt => "<",
      BinaryOp::Le => "<=",
      BinaryOp::Gt => ">",
      BinaryOp::Ge => ">=",
      BinaryOp::Eq => "==",
      BinaryOp::Ne => "!=",
    }
  }
}

impl UnaryOp {
  pub fn text(&self) -> &'static str {
    match self {
      UnaryOp::Neg => "-",
      UnaryOp::Not => "!",
    }
  }
}
