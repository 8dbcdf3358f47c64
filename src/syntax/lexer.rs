// Copyright 2024-2026 the Weft authors. MIT license.

use crate::diagnostics::ParseDiagnostic;
use crate::diagnostics::Position;
use crate::module_path::ModulePath;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
  Ident(String),
  Number(f64),
  Str(String),
  Import,
  Export,
  Default,
  From,
  As,
  Let,
  Const,
  True,
  False,
  Null,
  LParen,
  RParen,
  LBrace,
  RBrace,
  Comma,
  Dot,
  Semi,
  Colon,
  Star,
  Arrow,
  Assign,
  Plus,
  Minus,
  Slash,
  Percent,
  Lt,
  Le,
  Gt,
  Ge,
  EqEq,
  NotEq,
  Bang,
}

impl Token {
  /// The token as it appears in source, for diagnostics.
  pub fn describe(&self) -> String {
    match self {
      Token::Ident(name) => format!("`{}`", name),
      Token::Number(value) => format!("`{}`", value),
      Token::Str(_) => "string literal".to_string(),
      Token::Import => "`import`".to_string(),
      Token::Export => "`export`".to_string(),
      Token::Default => "`default`".to_string(),
      Token::From => "`from`".to_string(),
      Token::As => "`as`".to_string(),
      Token::Let => "`let`".to_string(),
      Token::Const => "`const`".to_string(),
      Token::True => "`true`".to_string(),
      Token::False => "`false`".to_string(),
      Token::Null => "`null`".to_string(),
      Token::LParen => "`(`".to_string(),
      Token::RParen => "`)`".to_string(),
      Token::LBrace => "`{`".to_string(),
      Token::RBrace => "`}`".to_string(),
      Token::Comma => "`,`".to_string(),
      Token::Dot => "`.`".to_string(),
      Token::Semi => "`;`".to_string(),
      Token::Colon => "`:`".to_string(),
      Token::Star => "`*`".to_string(),
      Token::Arrow => "`=>`".to_string(),
      Token::Assign => "`=`".to_string(),
      Token::Plus => "`+`".to_string(),
      Token::Minus => "`-`".to_string(),
      Token::Slash => "`/`".to_string(),
      Token::Percent => "`%`".to_string(),
      Token::Lt => "`<`".to_string(),
      Token::Le => "`<=`".to_string(),
      Token::Gt => "`>`".to_string(),
      Token::Ge => "`>=`".to_string(),
      Token::EqEq => "`==`".to_string(),
      Token::NotEq => "`!=`".to_string(),
      Token::Bang => "`!`".to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken {
  pub token: Token,
  pub pos: Position,
}

pub fn tokenize(
  path: &ModulePath,
  source: &str,
) -> Result<Vec<PositionedToken>, ParseDiagnostic> {
  Lexer::new(path, source).run()
}

struct Lexer<'a> {
  path: &'a ModulePath,
  chars: Vec<char>,
  idx: usize,
  line: usize,
  column: usize,
}

impl<'a> Lexer<'a> {
  fn new(path: &'a ModulePath, source: &str) -> Self {
    Self {
      path,
      chars: source.chars().collect(),
      idx: 0,
      line: 1,
      column: 1,
    }
  }

  fn run(mut self) -> Result<Vec<PositionedToken>, ParseDiagnostic> {
    let mut tokens = Vec::new();
    loop {
      self.skip_trivia()?;
      let pos = self.pos();
      let Some(ch) = self.peek() else {
        break;
      };
      let token = match ch {
        '(' => self.single(Token::LParen),
        ')' => self.single(Token::RParen),
        '{' => self.single(Token::LBrace),
        '}' => self.single(Token::RBrace),
        ',' => self.single(Token::Comma),
        '.' => self.single(Token::Dot),
        ';' => self.single(Token::Semi),
        ':' => self.single(Token::Colon),
        '*' => self.single(Token::Star),
        '+' => self.single(Token::Plus),
        '-' => self.single(Token::Minus),
        '/' => self.single(Token::Slash),
        '%' => self.single(Token::Percent),
        '<' => self.single_or_pair(Token::Lt, '=', Token::Le),
        '>' => self.single_or_pair(Token::Gt, '=', Token::Ge),
        '!' => self.single_or_pair(Token::Bang, '=', Token::NotEq),
        '=' => {
          self.bump();
          match self.peek() {
            Some('=') => {
              self.bump();
              Token::EqEq
            }
            Some('>') => {
              self.bump();
              Token::Arrow
            }
            _ => Token::Assign,
          }
        }
        '"' | '\'' => self.string(pos)?,
        ch if ch.is_ascii_digit() => self.number(pos)?,
        ch if is_ident_start(ch) => self.ident(),
        ch => {
          return Err(self.error(pos, format!("unexpected character `{}`", ch)));
        }
      };
      tokens.push(PositionedToken { token, pos });
    }
    Ok(tokens)
  }

  fn skip_trivia(&mut self) -> Result<(), ParseDiagnostic> {
    loop {
      match self.peek() {
        Some(ch) if ch.is_whitespace() => {
          self.bump();
        }
        Some('/') if self.peek_at(1) == Some('/') => {
          while !matches!(self.peek(), None | Some('\n')) {
            self.bump();
          }
        }
        Some('/') if self.peek_at(1) == Some('*') => {
          let pos = self.pos();
          self.bump();
          self.bump();
          loop {
            match self.peek() {
              None => {
                return Err(self.error(pos, "unterminated block comment"));
              }
              Some('*') if self.peek_at(1) == Some('/') => {
                self.bump();
                self.bump();
                break;
              }
              _ => {
                self.bump();
              }
            }
          }
        }
        _ => return Ok(()),
      }
    }
  }

  fn string(&mut self, pos: Position) -> Result<Token, ParseDiagnostic> {
    let quote = self.bump().unwrap_or('"');
    let mut value = String::new();
    loop {
      match self.bump() {
        None | Some('\n') => {
          return Err(self.error(pos, "unterminated string literal"));
        }
        Some('\\') => match self.bump() {
          Some('n') => value.push('\n'),
          Some('t') => value.push('\t'),
          Some('r') => value.push('\r'),
          Some('\\') => value.push('\\'),
          Some('\'') => value.push('\''),
          Some('"') => value.push('"'),
          Some(other) => {
            return Err(
              self.error(pos, format!("unknown escape sequence `\\{}`", other)),
            );
          }
          None => {
            return Err(self.error(pos, "unterminated string literal"));
          }
        },
        Some(ch) if ch == quote => break,
        Some(ch) => value.push(ch),
      }
    }
    Ok(Token::Str(value))
  }

  fn number(&mut self, pos: Position) -> Result<Token, ParseDiagnostic> {
    let mut text = String::new();
    while matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
      text.push(self.bump().unwrap_or('0'));
    }
    if self.peek() == Some('.')
      && matches!(self.peek_at(1), Some(ch) if ch.is_ascii_digit())
    {
      text.push(self.bump().unwrap_or('.'));
      while matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
        text.push(self.bump().unwrap_or('0'));
      }
    }
    match text.parse::<f64>() {
      Ok(value) => Ok(Token::Number(value)),
      Err(_) => Err(self.error(pos, format!("invalid number literal `{}`", text))),
    }
  }

  fn ident(&mut self) -> Token {
    let mut name = String::new();
    while matches!(self.peek(), Some(ch) if is_ident_continue(ch)) {
      if let Some(ch) = self.bump() {
        name.push(ch);
      }
    }
    match name.as_str() {
      "import" => Token::Import,
      "export" => Token::Export,
      "default" => Token::Default,
      "from" => Token::From,
      "as" => Token::As,
      "let" => Token::Let,
      "const" => Token::Const,
      "true" => Token::True,
      "false" => Token::False,
      "null" => Token::Null,
      _ => Token::Ident(name),
    }
  }

  fn single(&mut self, token: Token) -> Token {
    self.bump();
    token
  }

  fn single_or_pair(&mut self, single: Token, next: char, pair: Token) -> Token {
    self.bump();
    if self.peek() == Some(next) {
      self.bump();
      pair
    } else {
      single
    }
  }

  fn peek(&self) -> Option<char> {
    self.chars.get(self.idx).copied()
  }

  fn peek_at(&self, offset: usize) -> Option<char> {
    self.chars.get(self.idx + offset).copied()
  }

  fn bump(&mut self) -> Option<char> {
    let ch = self.chars.get(self.idx).copied()?;
    self.idx += 1;
    if ch == '\n' {
      self.line += 1;
      self.column = 1;
    } else {
      self.column += 1;
    }
    Some(ch)
  }

  fn pos(&self) -> Position {
    Position::new(self.line, self.column)
  }

  fn error(&self, pos: Position, message: impl Into<String>) -> ParseDiagnostic {
    ParseDiagnostic::new(self.path, pos, message)
  }
}

fn is_ident_start(ch: char) -> bool {
  ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
  ch.is_ascii_alphanumeric() || ch == '_'
}
