//! Glob-based ignore sets.
//!
//! Patterns follow `fnmatch` rules with case folding, where `*` never crosses
//! a `/`. A pattern without a slash is matched against an entry's basename at
//! any depth. A pattern with a slash, or anchored with a leading `/`, is
//! matched against the entry's path relative to the placement root.

use std::fmt;
use std::path::Path;

use glob::{MatchOptions, Pattern, PatternError};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
  case_sensitive: false,
  require_literal_separator: true,
  require_literal_leading_dot: false,
};

/// Hidden files are never placed unless a toolstack clears the set.
pub const DEFAULT_IGNORED: &[&str] = &[".*"];

#[derive(Clone)]
struct IgnorePattern {
  raw: String,
  by_path: bool,
  pattern: Pattern,
}

#[derive(Clone, Default)]
pub struct IgnoreSet {
  patterns: Vec<IgnorePattern>,
}

impl fmt::Debug for IgnoreSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.patterns()).finish()
  }
}

impl IgnoreSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// A set holding [`DEFAULT_IGNORED`].
  pub fn with_defaults() -> Self {
    let mut set = Self::new();
    for pattern in DEFAULT_IGNORED {
      // The defaults are known-valid patterns.
      if let Ok(compiled) = Pattern::new(pattern) {
        set.patterns.push(IgnorePattern {
          raw: pattern.to_string(),
          by_path: false,
          pattern: compiled,
        });
      }
    }
    set
  }

  /// Add a pattern. Adding a pattern that is already present is a no-op.
  pub fn add(&mut self, pattern: &str) -> Result<(), PatternError> {
    if self.contains(pattern) {
      return Ok(());
    }
    let by_path = pattern.contains('/');
    let compiled = Pattern::new(pattern.trim_start_matches('/'))?;
    self.patterns.push(IgnorePattern {
      raw: pattern.to_string(),
      by_path,
      pattern: compiled,
    });
    Ok(())
  }

  pub fn extend<I, S>(&mut self, patterns: I) -> Result<(), PatternError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    for pattern in patterns {
      self.add(pattern.as_ref())?;
    }
    Ok(())
  }

  pub fn contains(&self, pattern: &str) -> bool {
    self.patterns.iter().any(|p| p.raw == pattern)
  }

  pub fn patterns(&self) -> impl Iterator<Item = &str> {
    self.patterns.iter().map(|p| p.raw.as_str())
  }

  pub fn is_empty(&self) -> bool {
    self.patterns.is_empty()
  }

  /// Whether an entry, given by its path relative to the placement root,
  /// is ignored.
  pub fn is_ignored(&self, relative: &Path) -> bool {
    let rel = relative.to_string_lossy().replace('\\', "/");
    let rel = rel.trim_start_matches('/');
    let basename = rel.rsplit('/').next().unwrap_or(rel);

    self.patterns.iter().any(|p| {
      if p.by_path {
        p.pattern.matches_with(rel, MATCH_OPTIONS)
      } else {
        p.pattern.matches_with(basename, MATCH_OPTIONS)
      }
    })
  }
}
