//! Parsing of Ninja-syntax strings and their variable references.
//!
//! Every value a module or package declares (variable values, rule commands,
//! build outputs and arguments) is written in Ninja's own string syntax. This
//! module splits such strings into literal text and variable references, and
//! resolves each reference through a [`VariableResolver`] to the name that
//! will be emitted into the Ninja file.
//!
//! # Reference Formats
//!
//! - `$name` - simple reference, name made of `[A-Za-z0-9_-]`
//! - `${name}` - braced reference, name may also contain `.` (`${cc.cflags}`)
//!
//! # Escapes
//!
//! `$$`, `$ `, `$:` and `$` followed by a newline are Ninja escapes. They
//! are kept verbatim in the literal text so the rendered string stays valid
//! Ninja. A newline anywhere else would end the Ninja line early and is
//! rejected.
//!
//! # Example
//!
//! ```
//! use knit_lib::ninja_string::{parse, Segment};
//!
//! let segments = parse("gcc ${cflags} -o $out").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("gcc ".to_string()),
//!     Segment::Variable("cflags".to_string()),
//!     Segment::Literal(" -o ".to_string()),
//!     Segment::Variable("out".to_string()),
//! ]);
//! ```

use std::fmt;

use thiserror::Error;

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
  /// Literal Ninja text, escapes included.
  Literal(String),

  /// A variable reference.
  Variable(String),
}

/// Errors that can occur while parsing a Ninja string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NinjaStringError {
  #[error("unclosed variable reference at position {0}")]
  Unclosed(usize),

  #[error("empty variable name at position {0}")]
  EmptyName(usize),

  #[error("invalid character {ch:?} in variable name at position {pos}")]
  InvalidNameChar { pos: usize, ch: char },

  #[error("invalid escape '${ch}' at position {pos}")]
  InvalidEscape { pos: usize, ch: char },

  #[error("dangling '$' at end of string")]
  TrailingDollar,

  #[error("line break at position {0} outside a '$' escape")]
  LineBreak(usize),

  #[error("undefined variable {0:?}")]
  Undefined(String),
}

/// Resolves variable references to the names emitted into the Ninja file.
pub trait VariableResolver {
  /// Map a reference as written (`cflags`, `cc.cflags`) to its emitted
  /// name, or `None` if nothing visible declares it.
  fn resolve_variable(&self, name: &str) -> Option<String>;
}

fn is_simple_name_char(ch: char) -> bool {
  ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

fn is_braced_name_char(ch: char) -> bool {
  is_simple_name_char(ch) || ch == '.'
}

/// Parse a Ninja string into segments without resolving references.
///
/// # Errors
///
/// Returns an error on an unclosed `${`, an empty or malformed name, an
/// unknown escape, a trailing `$` or a bare line break.
pub fn parse(input: &str) -> Result<Vec<Segment>, NinjaStringError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch == '\n' || ch == '\r' {
      return Err(NinjaStringError::LineBreak(pos));
    }
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    match chars.peek().copied() {
      Some((_, c @ ('$' | ' ' | ':' | '\n'))) => {
        literal.push('$');
        literal.push(c);
        chars.next();
      }
      Some((_, '{')) => {
        chars.next(); // consume the {

        let mut name = String::new();
        let mut found_close = false;

        while let Some((name_pos, c)) = chars.next() {
          if c == '}' {
            found_close = true;
            break;
          }
          if !is_braced_name_char(c) {
            return Err(NinjaStringError::InvalidNameChar { pos: name_pos, ch: c });
          }
          name.push(c);
        }

        if !found_close {
          return Err(NinjaStringError::Unclosed(pos));
        }
        if name.is_empty() {
          return Err(NinjaStringError::EmptyName(pos));
        }

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Variable(name));
      }
      Some((_, c)) if is_simple_name_char(c) => {
        let mut name = String::new();
        while let Some(&(_, c)) = chars.peek() {
          if !is_simple_name_char(c) {
            break;
          }
          name.push(c);
          chars.next();
        }

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Variable(name));
      }
      Some((_, c)) => return Err(NinjaStringError::InvalidEscape { pos, ch: c }),
      None => return Err(NinjaStringError::TrailingDollar),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// A Ninja string whose references have been resolved to emitted names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NinjaString {
  segments: Vec<Segment>,
}

impl NinjaString {
  /// Parse `input` and resolve every reference through `resolver`.
  ///
  /// # Errors
  ///
  /// Returns [`NinjaStringError::Undefined`] for the first reference the
  /// resolver does not know, or any parse error.
  pub fn parse(input: &str, resolver: &impl VariableResolver) -> Result<Self, NinjaStringError> {
    let segments = parse(input)?
      .into_iter()
      .map(|segment| match segment {
        Segment::Variable(name) => resolver
          .resolve_variable(&name)
          .map(Segment::Variable)
          .ok_or(NinjaStringError::Undefined(name)),
        literal => Ok(literal),
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self { segments })
  }

  /// The resolved names this string references, in order of appearance.
  pub fn variables(&self) -> impl Iterator<Item = &str> {
    self.segments.iter().filter_map(|segment| match segment {
      Segment::Variable(name) => Some(name.as_str()),
      Segment::Literal(_) => None,
    })
  }

  /// Render the string as Ninja text.
  pub fn value(&self) -> String {
    let mut result = String::new();
    for segment in &self.segments {
      match segment {
        Segment::Literal(s) => result.push_str(s),
        Segment::Variable(name) => {
          result.push_str("${");
          result.push_str(name);
          result.push('}');
        }
      }
    }
    result
  }

  pub fn is_empty(&self) -> bool {
    self.segments.is_empty()
  }
}

impl fmt::Display for NinjaString {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.value())
  }
}

/// Escape literal text for use as a Ninja value.
///
/// `$` is doubled. Ninja has no way to carry a line break inside a value,
/// so each one becomes a space.
pub fn escape_value(input: &str) -> String {
  input.replace('$', "$$").replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Escape literal text for use as a path in a build line, where spaces
/// and colons are also significant.
pub fn escape_path(input: &str) -> String {
  escape_value(input).replace(' ', "$ ").replace(':', "$:")
}
