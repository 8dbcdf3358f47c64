// Copyright 2024-2026 the Weft authors. MIT license.

use std::fmt;

use thiserror::Error;

use crate::module_path::ModulePath;

/// A 1-indexed position in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
  pub line: usize,
  pub column: usize,
}

impl Position {
  pub fn new(line: usize, column: usize) -> Self {
    Self { line, column }
  }

  pub fn start() -> Self {
    Self { line: 1, column: 1 }
  }
}

impl fmt::Display for Position {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}:{}", self.line, self.column)
  }
}

/// A syntax error produced while lexing or parsing module source. The
/// `Display` implementation is a single line; `display_with_source`
/// renders the full framed excerpt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} at {path}:{position}")]
pub struct ParseDiagnostic {
  pub path: ModulePath,
  pub position: Position,
  pub message: String,
}

impl ParseDiagnostic {
  pub fn new(
    path: &ModulePath,
    position: Position,
    message: impl Into<String>,
  ) -> Self {
    Self {
      path: path.clone(),
      position,
      message: message.into(),
    }
  }

  /// Renders the diagnostic against the source text it was produced from,
  /// framing the offending line with a caret under the failing column.
  pub fn display_with_source(&self, source: &str) -> String {
    format_source_error(&self.message, &self.path, source, self.position)
  }
}

/// Formats a source error as a human readable block: the message, the
/// `path:line:column` location and an excerpt of the offending line with
/// a caret marking the column. Positions are 1-indexed. Pure; the caller
/// decides where the rendered text goes.
pub fn format_source_error(
  message: &str,
  path: &ModulePath,
  source: &str,
  position: Position,
) -> String {
  let mut text = format!("error: {}\n --> {}:{}\n", message, path, position);
  let Some(line_text) = source.lines().nth(position.line.saturating_sub(1))
  else {
    return text;
  };
  // tabs render as single spaces so the caret column stays aligned
  let line_text = line_text.replace('\t', " ");
  let line_label = position.line.to_string();
  let gutter = " ".repeat(line_label.len());
  let caret_pad = " ".repeat(position.column.saturating_sub(1));
  text.push_str(&format!(
    "{} |\n{} | {}\n{} | {}^\n",
    gutter, line_label, line_text, gutter, caret_pad
  ));
  text
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::*;

  fn path() -> ModulePath {
    ModulePath::new("/app/main.weft").unwrap()
  }

  #[test]
  fn test_format_source_error() {
    let source = "let a = 1;\nlet b = ;\nlet c = 3;";
    let rendered = format_source_error(
      "unexpected token `;`",
      &path(),
      source,
      Position::new(2, 9),
    );
    assert_eq!(
      rendered,
      concat!(
        "error: unexpected token `;`\n",
        " --> /app/main.weft:2:9\n",
        "  |\n",
        "2 | let b = ;\n",
        "  |         ^\n",
      )
    );
  }

  #[test]
  fn test_format_source_error_line_out_of_range() {
    let rendered = format_source_error(
      "unexpected end of input",
      &path(),
      "",
      Position::new(1, 1),
    );
    assert_eq!(
      rendered,
      "error: unexpected end of input\n --> /app/main.weft:1:1\n"
    );
  }

  #[test]
  fn test_parse_diagnostic_display() {
    let diagnostic =
      ParseDiagnostic::new(&path(), Position::new(3, 5), "unexpected token `}`");
    assert_eq!(
      diagnostic.to_string(),
      "unexpected token `}` at /app/main.weft:3:5"
    );
  }
}
