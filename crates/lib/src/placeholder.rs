//! Placeholder parsing and substitution for destination templates.
//!
//! Special destinations are written as templates that reference locations
//! only known once a build plan exists:
//!
//! - `{webroot}` - the build's web root (build dir + document root)
//! - `{approot}` - the application's source root
//!
//! # Example
//!
//! ```
//! use webbuild_lib::placeholder::{parse, Placeholder, Segment};
//!
//! let segments = parse("{webroot}/sites/default").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Placeholder(Placeholder::WebRoot),
//!     Segment::Literal("/sites/default".to_string()),
//! ]);
//! ```

use std::path::Path;

use thiserror::Error;

/// A parsed placeholder reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
  WebRoot,
  AppRoot,
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Literal(String),
  Placeholder(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder: {{{0}}}")]
  UnknownType(String),
}

/// Supplies the values placeholders expand to.
pub trait Resolver {
  fn resolve_web_root(&self) -> &Path;
  fn resolve_app_root(&self) -> &Path;
}

/// Parse a destination template into segments.
///
/// # Errors
///
/// Returns an error for an unterminated `{` or an unknown placeholder name.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices();

  while let Some((pos, ch)) = chars.next() {
    if ch != '{' {
      literal.push(ch);
      continue;
    }

    let mut name = String::new();
    let mut found_close = false;
    for (_, c) in chars.by_ref() {
      if c == '}' {
        found_close = true;
        break;
      }
      name.push(c);
    }

    if !found_close {
      return Err(PlaceholderError::Unclosed(pos));
    }

    if !literal.is_empty() {
      segments.push(Segment::Literal(std::mem::take(&mut literal)));
    }

    let placeholder = match name.as_str() {
      "webroot" => Placeholder::WebRoot,
      "approot" => Placeholder::AppRoot,
      _ => return Err(PlaceholderError::UnknownType(name)),
    };
    segments.push(Segment::Placeholder(placeholder));
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Parse and expand a template in one step.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let segments = parse(input)?;
  Ok(substitute_segments(&segments, resolver))
}

pub fn substitute_segments(segments: &[Segment], resolver: &impl Resolver) -> String {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Placeholder(Placeholder::WebRoot) => result.push_str(&resolver.resolve_web_root().to_string_lossy()),
      Segment::Placeholder(Placeholder::AppRoot) => result.push_str(&resolver.resolve_app_root().to_string_lossy()),
    }
  }

  result
}
