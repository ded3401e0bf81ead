//! Source positions used to attribute diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A location in a build-definition file.
///
/// Lines and columns are 1-based. A position with line 0 is "unknown" and
/// renders as just the file name, or `-` when the file is empty too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
  pub file: String,
  pub line: usize,
  pub column: usize,
}

impl Position {
  pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
    Self {
      file: file.into(),
      line,
      column,
    }
  }

  /// Returns true if the position points at an actual line.
  pub fn is_valid(&self) -> bool {
    self.line > 0
  }
}

impl fmt::Display for Position {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (self.file.is_empty(), self.is_valid()) {
      (false, true) => write!(f, "{}:{}:{}", self.file, self.line, self.column),
      (true, true) => write!(f, "{}:{}", self.line, self.column),
      (false, false) => write!(f, "{}", self.file),
      (true, false) => write!(f, "-"),
    }
  }
}
