// Copyright 2024-2026 the Weft authors. MIT license.

use crate::diagnostics::ParseDiagnostic;
use crate::diagnostics::Position;
use crate::module_path::ModulePath;

use super::lexer::tokenize;
use super::lexer::PositionedToken;
use super::lexer::Token;
use super::AssignTarget;
use super::BinaryOp;
use super::BindingKind;
use super::Expr;
use super::ExprKind;
use super::ImportClause;
use super::ImportDecl;
use super::Module;
use super::ModuleKind;
use super::Stmt;
use super::StmtKind;
use super::UnaryOp;

/// Parses source text into a module. `ModuleKind::Module` permits import
/// and export declarations; `ModuleKind::Script` rejects them, so lowered
/// output containing leftover module syntax fails here instead of
/// executing. The path is only used to attribute diagnostics.
pub fn parse(
  path: &ModulePath,
  source: &str,
  kind: ModuleKind,
) -> Result<Module, ParseDiagnostic> {
  let tokens = tokenize(path, source)?;
  let eof_pos = tokens.last().map(|t| t.pos).unwrap_or_else(Position::start);
  let mut parser = Parser {
    path,
    tokens,
    idx: 0,
    eof_pos,
  };
  parser.parse_module(kind)
}

struct Parser<'a> {
  path: &'a ModulePath,
  tokens: Vec<PositionedToken>,
  idx: usize,
  eof_pos: Position,
}

impl<'a> Parser<'a> {
  fn parse_module(
    &mut self,
    kind: ModuleKind,
  ) -> Result<Module, ParseDiagnostic> {
    let mut body = Vec::new();
    while self.peek().is_some() {
      body.push(self.parse_stmt(kind)?);
    }
    Ok(Module { kind, body })
  }

  fn parse_stmt(&mut self, kind: ModuleKind) -> Result<Stmt, ParseDiagnostic> {
    let pos = self.pos();
    match self.peek() {
      // `import(` is the dynamic import expression, not a declaration
      Some(Token::Import) if self.peek_at(1) != Some(&Token::LParen) => {
        if kind == ModuleKind::Script {
          return Err(self.error(
            pos,
            "import declarations are not allowed in script code",
          ));
        }
        self.bump();
        let decl = self.parse_import_decl()?;
        Ok(Stmt {
          pos,
          kind: StmtKind::Import(decl),
        })
      }
      Some(Token::Export) => {
        if kind == ModuleKind::Script {
          return Err(self.error(
            pos,
            "export declarations are not allowed in script code",
          ));
        }
        self.bump();
        self.parse_export_decl(pos)
      }
      Some(Token::Let) | Some(Token::Const) => {
        let binding = if self.eat(&Token::Let) {
          BindingKind::Let
        } else {
          self.bump();
          BindingKind::Const
        };
        let name = self.expect_ident()?;
        self.expect(&Token::Assign)?;
        let init = self.parse_expr()?;
        self.expect(&Token::Semi)?;
        Ok(Stmt {
          pos,
          kind: StmtKind::Decl {
            binding,
            name,
            init,
          },
        })
      }
      Some(_) => {
        let expr = self.parse_expr()?;
        if self.eat(&Token::Assign) {
          let target = assign_target(self.path, expr)?;
          let value = self.parse_expr()?;
          self.expect(&Token::Semi)?;
          Ok(Stmt {
            pos,
            kind: StmtKind::Assign { target, value },
          })
        } else {
          self.expect(&Token::Semi)?;
          Ok(Stmt {
            pos,
            kind: StmtKind::Expr(expr),
          })
        }
      }
      None => Err(self.error(self.eof_pos, "unexpected end of input")),
    }
  }

  fn parse_import_decl(&mut self) -> Result<ImportDecl, ParseDiagnostic> {
    let clause = match self.peek() {
      Some(Token::Str(_)) => ImportClause::None,
      Some(Token::Star) => {
        self.bump();
        self.expect(&Token::As)?;
        let name = self.expect_ident()?;
        ImportClause::Namespace(name)
      }
      Some(Token::LBrace) => {
        self.bump();
        let mut names = Vec::new();
        loop {
          if self.at(&Token::RBrace) {
            break;
          }
          names.push(self.expect_ident()?);
          if !self.eat(&Token::Comma) {
            break;
          }
        }
        self.expect(&Token::RBrace)?;
        ImportClause::Named(names)
      }
      Some(Token::Ident(_)) => {
        let name = self.expect_ident()?;
        ImportClause::Default(name)
      }
      _ => {
        let pos = self.pos();
        return Err(self.error(pos, "expected an import clause or a specifier"));
      }
    };
    if !matches!(clause, ImportClause::None) {
      self.expect(&Token::From)?;
    }
    let specifier = self.expect_str()?;
    self.expect(&Token::Semi)?;
    Ok(ImportDecl { clause, specifier })
  }

  fn parse_export_decl(
    &mut self,
    pos: Position,
  ) -> Result<Stmt, ParseDiagnostic> {
    match self.peek() {
      Some(Token::Default) => {
        self.bump();
        let expr = self.parse_expr()?;
        self.expect(&Token::Semi)?;
        Ok(Stmt {
          pos,
          kind: StmtKind::ExportDefault(expr),
        })
      }
      Some(Token::Let) | Some(Token::Const) => {
        let binding = if self.eat(&Token::Let) {
          BindingKind::Let
        } else {
          self.bump();
          BindingKind::Const
        };
        let name = self.expect_ident()?;
        self.expect(&Token::Assign)?;
        let init = self.parse_expr()?;
        self.expect(&Token::Semi)?;
        Ok(Stmt {
          pos,
          kind: StmtKind::ExportDecl {
            binding,
            name,
            init,
          },
        })
      }
      _ => {
        let pos = self.pos();
        Err(self.error(pos, "expected `default`, `let` or `const` after `export`"))
      }
    }
  }

  fn parse_expr(&mut self) -> Result<Expr, ParseDiagnostic> {
    self.parse_binary(0)
  }

  fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParseDiagnostic> {
    let mut left = self.parse_unary()?;
    while let Some(op) = self.peek_binary_op() {
      let prec = binary_prec(op);
      if prec < min_prec {
        break;
      }
      self.bump();
      let right = self.parse_binary(prec + 1)?;
      left = Expr {
        pos: left.pos,
        kind: ExprKind::Binary {
          op,
          left: Box::new(left),
          right: Box::new(right),
        },
      };
    }
    Ok(left)
  }

  fn peek_binary_op(&self) -> Option<BinaryOp> {
    match self.peek()? {
      Token::Plus => Some(BinaryOp::Add),
      Token::Minus => Some(BinaryOp::Sub),
      Token::Star => Some(BinaryOp::Mul),
      Token::Slash => Some(BinaryOp::Div),
      Token::Percent => Some(BinaryOp::Rem),
      Token::Lt => Some(BinaryOp::Lt),
      Token::Le => Some(BinaryOp::Le),
      Token::Gt => Some(BinaryOp::Gt),
      Token::Ge => Some(BinaryOp::Ge),
      Token::EqEq => Some(BinaryOp::Eq),
      Token::NotEq => Some(BinaryOp::Ne),
      _ => None,
    }
  }

  fn parse_unary(&mut self) -> Result<Expr, ParseDiagnostic> {
    let pos = self.pos();
    let op = match self.peek() {
      Some(Token::Minus) => Some(UnaryOp::Neg),
      Some(Token::Bang) => Some(UnaryOp::Not),
      _ => None,
    };
    if let Some(op) = op {
      self.bump();
      let expr = self.parse_unary()?;
      return Ok(Expr {
        pos,
        kind: ExprKind::Unary {
          op,
          expr: Box::new(expr),
        },
      });
    }
    self.parse_postfix()
  }

  fn parse_postfix(&mut self) -> Result<Expr, ParseDiagnostic> {
    let mut expr = self.parse_primary()?;
    loop {
      if self.eat(&Token::Dot) {
        let property = self.expect_ident()?;
        expr = Expr {
          pos: expr.pos,
          kind: ExprKind::Member {
            object: Box::new(expr),
            property,
          },
        };
      } else if self.eat(&Token::LParen) {
        let args = self.parse_args()?;
        expr = Expr {
          pos: expr.pos,
          kind: ExprKind::Call {
            callee: Box::new(expr),
            args,
          },
        };
      } else {
        break;
      }
    }
    Ok(expr)
  }

  fn parse_primary(&mut self) -> Result<Expr, ParseDiagnostic> {
    let pos = self.pos();
    match self.peek() {
      Some(Token::Null) => {
        self.bump();
        Ok(Expr {
          pos,
          kind: ExprKind::Null,
        })
      }
      Some(Token::True) => {
        self.bump();
        Ok(Expr {
          pos,
          kind: ExprKind::Bool(true),
        })
      }
      Some(Token::False) => {
        self.bump();
        Ok(Expr {
          pos,
          kind: ExprKind::Bool(false),
        })
      }
      Some(Token::Number(_)) => {
        let Some(PositionedToken {
          token: Token::Number(value),
          ..
        }) = self.bump()
        else {
          return Err(self.error(pos, "unexpected end of input"));
        };
        Ok(Expr {
          pos,
          kind: ExprKind::Number(value),
        })
      }
      Some(Token::Str(_)) => {
        let value = self.expect_str()?;
        Ok(Expr {
          pos,
          kind: ExprKind::Str(value),
        })
      }
      Some(Token::Ident(_)) => {
        let name = self.expect_ident()?;
        if self.eat(&Token::Arrow) {
          let body = self.parse_expr()?;
          return Ok(Expr {
            pos,
            kind: ExprKind::Arrow {
              params: vec![name],
              body: Box::new(body),
            },
          });
        }
        Ok(Expr {
          pos,
          kind: ExprKind::Ident(name),
        })
      }
      Some(Token::Import) => {
        self.bump();
        self.expect(&Token::LParen)?;
        let args = self.parse_args()?;
        Ok(Expr {
          pos,
          kind: ExprKind::ImportCall { args },
        })
      }
      Some(Token::LParen) => {
        if self.at_arrow_params() {
          self.bump();
          let mut params = Vec::new();
          loop {
            if self.at(&Token::RParen) {
              break;
            }
            params.push(self.expect_ident()?);
            if !self.eat(&Token::Comma) {
              break;
            }
          }
          self.expect(&Token::RParen)?;
          self.expect(&Token::Arrow)?;
          let body = self.parse_expr()?;
          return Ok(Expr {
            pos,
            kind: ExprKind::Arrow {
              params,
              body: Box::new(body),
            },
          });
        }
        self.bump();
        let expr = self.parse_expr()?;
        self.expect(&Token::RParen)?;
        Ok(expr)
      }
      Some(Token::LBrace) => {
        self.bump();
        let mut props = Vec::new();
        loop {
          if self.at(&Token::RBrace) {
            break;
          }
          let key_pos = self.pos();
          let key = self.expect_ident()?;
          let value = if self.eat(&Token::Colon) {
            self.parse_expr()?
          } else {
            Expr {
              pos: key_pos,
              kind: ExprKind::Ident(key.clone()),
            }
          };
          props.push((key, value));
          if !self.eat(&Token::Comma) {
            break;
          }
        }
        self.expect(&Token::RBrace)?;
        Ok(Expr {
          pos,
          kind: ExprKind::Object(props),
        })
      }
      Some(token) => {
        let found = token.describe();
        Err(self.error(pos, format!("unexpected token {}", found)))
      }
      None => Err(self.error(self.eof_pos, "unexpected end of input")),
    }
  }

  /// Decides whether a `(` begins arrow function parameters by scanning
  /// ahead for `(ident, ...) =>` without consuming anything.
  fn at_arrow_params(&self) -> bool {
    let mut i = self.idx + 1;
    loop {
      match self.tokens.get(i).map(|t| &t.token) {
        Some(Token::RParen) => {
          i += 1;
          break;
        }
        Some(Token::Ident(_)) => {
          i += 1;
          match self.tokens.get(i).map(|t| &t.token) {
            Some(Token::Comma) => i += 1,
            Some(Token::RParen) => {
              i += 1;
              break;
            }
            _ => return false,
          }
        }
        _ => return false,
      }
    }
    matches!(self.tokens.get(i).map(|t| &t.token), Some(Token::Arrow))
  }

  fn parse_args(&mut self) -> Result<Vec<Expr>, ParseDiagnostic> {
    let mut args = Vec::new();
    loop {
      if self.at(&Token::RParen) {
        break;
      }
      args.push(self.parse_expr()?);
      if !self.eat(&Token::Comma) {
        break;
      }
    }
    self.expect(&Token::RParen)?;
    Ok(args)
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.idx).map(|t| &t.token)
  }

  fn peek_at(&self, offset: usize) -> Option<&Token> {
    self.tokens.get(self.idx + offset).map(|t| &t.token)
  }

  fn bump(&mut self) -> Option<PositionedToken> {
    let token = self.tokens.get(self.idx).cloned()?;
    self.idx += 1;
    Some(token)
  }

  fn at(&self, token: &Token) -> bool {
    self.peek() == Some(token)
  }

  fn eat(&mut self, token: &Token) -> bool {
    if self.at(token) {
      self.idx += 1;
      true
    } else {
      false
    }
  }

  fn expect(&mut self, token: &Token) -> Result<Position, ParseDiagnostic> {
    let pos = self.pos();
    match self.peek() {
      Some(found) if found == token => {
        self.idx += 1;
        Ok(pos)
      }
      Some(found) => Err(self.error(
        pos,
        format!("expected {}, found {}", token.describe(), found.describe()),
      )),
      None => Err(self.error(
        self.eof_pos,
        format!("expected {}, found end of input", token.describe()),
      )),
    }
  }

  fn expect_ident(&mut self) -> Result<String, ParseDiagnostic> {
    let pos = self.pos();
    match self.peek() {
      Some(Token::Ident(_)) => {
        let Some(PositionedToken {
          token: Token::Ident(name),
          ..
        }) = self.bump()
        else {
          return Err(self.error(pos, "unexpected end of input"));
        };
        Ok(name)
      }
      Some(found) => Err(self.error(
        pos,
        format!("expected an identifier, found {}", found.describe()),
      )),
      None => Err(
        self.error(self.eof_pos, "expected an identifier, found end of input"),
      ),
    }
  }

  fn expect_str(&mut self) -> Result<String, ParseDiagnostic> {
    let pos = self.pos();
    match self.peek() {
      Some(Token::Str(_)) => {
        let Some(PositionedToken {
          token: Token::Str(value),
          ..
        }) = self.bump()
        else {
          return Err(self.error(pos, "unexpected end of input"));
        };
        Ok(value)
      }
      Some(found) => Err(self.error(
        pos,
        format!("expected a string literal, found {}", found.describe()),
      )),
      None => Err(self.error(
        self.eof_pos,
        "expected a string literal, found end of input",
      )),
    }
  }

  fn pos(&self) -> Position {
    self
      .tokens
      .get(self.idx)
      .map(|t| t.pos)
      .unwrap_or(self.eof_pos)
  }

  fn error(&self, pos: Position, message: impl Into<String>) -> ParseDiagnostic {
    ParseDiagnostic::new(self.path, pos, message)
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

fn assign_target(
  path: &ModulePath,
  expr: Expr,
) -> Result<AssignTarget, ParseDiagnostic> {
  match expr.kind {
    ExprKind::Ident(name) => Ok(AssignTarget::Ident(name)),
    ExprKind::Member { object, property } => Ok(AssignTarget::Member {
      object: *object,
      property,
    }),
    _ => Err(ParseDiagnostic::new(path, expr.pos, "invalid assignment target")),
  }
}
