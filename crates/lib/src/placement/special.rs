//! Remapping of specific application files to fixed build locations.

use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::{info, warn};

use super::{FsError, Filesystem, IgnoreSet, nested_destination, passes_through_link};
use crate::placeholder::{self, Resolver};

pub const WEB_ROOT_TEMPLATE: &str = "{webroot}";

/// Ordered mapping from a glob (relative to the app root) to a destination
/// template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecialDestinations {
  entries: Vec<(String, String)>,
}

impl SpecialDestinations {
  pub fn new() -> Self {
    Self::default()
  }

  /// `favicon.ico` and `robots.txt` always belong in the web root.
  pub fn with_defaults() -> Self {
    Self::new()
      .with("favicon.ico", WEB_ROOT_TEMPLATE)
      .with("robots.txt", WEB_ROOT_TEMPLATE)
  }

  /// Map `pattern` to `template`, replacing an earlier mapping for the same
  /// pattern in place.
  pub fn with(mut self, pattern: &str, template: &str) -> Self {
    self.insert(pattern, template);
    self
  }

  pub fn insert(&mut self, pattern: &str, template: &str) {
    match self.entries.iter_mut().find(|(p, _)| p == pattern) {
      Some(entry) => entry.1 = template.to_string(),
      None => self.entries.push((pattern.to_string(), template.to_string())),
    }
  }

  pub fn patterns(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(p, _)| p.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(p, t)| (p.as_str(), t.as_str()))
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Place every matching source entry at its expanded destination.
  ///
  /// Destinations that already exist are removed, with a warning, before the
  /// source is copied or linked there. Mappings onto the bare web root are
  /// skipped for in-place builds, where those files already are in the web
  /// root. A destination reached through a linked directory of the build is
  /// never written, since it lives in the source tree.
  pub fn apply(&self, ctx: &SpecialContext<'_>) -> Result<usize, FsError> {
    let mut placed = 0;

    for (pattern, template) in self.iter() {
      if template == WEB_ROOT_TEMPLATE && ctx.in_place {
        continue;
      }

      let expanded = placeholder::substitute(template, ctx)?;
      let full_pattern = format!("{}/{}", Pattern::escape(&ctx.app_root.to_string_lossy()), pattern);

      for source in glob::glob(&full_pattern)? {
        let source = match source {
          Ok(source) => source,
          Err(e) => {
            warn!(pattern, error = %e, "skipping unreadable match");
            continue;
          }
        };
        let relative = source.strip_prefix(ctx.app_root).unwrap_or(&source).to_path_buf();
        if ctx.ignored.is_ignored(&relative) {
          continue;
        }

        let destination = nested_destination(&source, Path::new(&expanded));
        if destination == source {
          continue;
        }
        if passes_through_link(&ctx.build_dir, &destination) {
          warn!(
            file = %relative.display(),
            destination = %destination.display(),
            "destination is inside a linked directory, skipping"
          );
          continue;
        }

        place_special(ctx, &source, &relative, &destination)?;
        placed += 1;
      }
    }

    Ok(placed)
  }
}

fn place_special(ctx: &SpecialContext<'_>, source: &Path, relative: &Path, destination: &Path) -> Result<(), FsError> {
  if ctx.copy {
    info!(file = %relative.display(), destination = %destination.display(), "Copying file");
  } else {
    info!(file = %relative.display(), destination = %destination.display(), "Symlinking file");
  }

  if destination.exists() || super::is_symlink(destination) {
    warn!(path = %destination.display(), "Overriding existing path in destination");
    ctx.fs.remove(destination)?;
  }

  ctx.fs.place(source, destination, ctx.copy, &IgnoreSet::new())
}

/// What special destination processing needs to know about a build.
#[derive(Debug, Clone)]
pub struct SpecialContext<'a> {
  pub app_root: &'a Path,
  /// Build directory the destinations are checked against.
  pub build_dir: PathBuf,
  pub web_root: PathBuf,
  pub ignored: &'a IgnoreSet,
  pub copy: bool,
  pub in_place: bool,
  pub fs: &'a Filesystem,
}

impl Resolver for SpecialContext<'_> {
  fn resolve_web_root(&self) -> &Path {
    &self.web_root
  }

  fn resolve_app_root(&self) -> &Path {
    self.app_root
  }
}
