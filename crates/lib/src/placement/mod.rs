//! File placement engine.
//!
//! Moves application files into a build directory by copying or symlinking,
//! honouring an [`IgnoreSet`] and a set of [`SpecialDestinations`]. Every
//! toolstack places files exclusively through [`Filesystem`].
//!
//! Placement never merges silently: an existing destination is either
//! skipped, reported, or removed with a warning before being replaced. A file
//! is never put in place of a directory; it is nested inside it instead.

pub mod ignore;
pub mod special;

use std::fs::{self, DirEntry};
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::ALWAYS_SKIP;
use crate::placeholder::PlaceholderError;

pub use ignore::IgnoreSet;
pub use special::{SpecialContext, SpecialDestinations};

#[derive(Debug, Error)]
pub enum FsError {
  #[error("failed to create directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to remove {path}: {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to copy {from} to {to}: {source}")]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to create symlink {link} -> {target}: {source}")]
  Symlink {
    target: PathBuf,
    link: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to resolve path {path}: {source}")]
  Resolve {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to move {from} to {to}: {source}")]
  Rename {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("symlink target does not exist: {0}")]
  MissingTarget(PathBuf),

  #[error("file exists: {0}")]
  Exists(PathBuf),

  #[error("invalid pattern: {0}")]
  Pattern(#[from] glob::PatternError),

  #[error("invalid destination template: {0}")]
  Template(#[from] PlaceholderError),
}

/// How symlink targets are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkStyle {
  /// Relative to the link's parent directory, so a project can be moved.
  #[default]
  Relative,
  Absolute,
}

/// Options for [`Filesystem::symlink_all`].
#[derive(Debug, Clone, Copy)]
pub struct SymlinkAllOptions<'a> {
  /// Leave entries that already exist at the destination untouched instead
  /// of failing.
  pub skip_existing: bool,
  /// Descend into directories that exist on both sides instead of treating
  /// them as existing entries.
  pub recursive: bool,
  pub exclude: &'a IgnoreSet,
  /// Copy entries instead of symlinking them.
  pub copy: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Filesystem {
  link_style: LinkStyle,
  copy_on_windows: bool,
}

impl Filesystem {
  pub fn new(link_style: LinkStyle) -> Self {
    Self {
      link_style,
      copy_on_windows: false,
    }
  }

  /// On Windows, copy wherever a symlink would be created.
  pub fn with_copy_on_windows(mut self, copy_on_windows: bool) -> Self {
    self.copy_on_windows = copy_on_windows;
    self
  }

  pub fn link_style(&self) -> LinkStyle {
    self.link_style
  }

  /// Create a directory (and its parents), applying `mode` to the leaf on
  /// Unix. An existing directory is left alone.
  pub fn mkdir(&self, path: &Path, mode: u32) -> Result<(), FsError> {
    if path.is_dir() {
      return Ok(());
    }
    fs::create_dir_all(path).map_err(|source| FsError::CreateDir {
      path: path.to_path_buf(),
      source,
    })?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|source| FsError::CreateDir {
        path: path.to_path_buf(),
        source,
      })?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
  }

  /// Remove a file, directory tree or symlink. Symlinks are removed, never
  /// followed. A missing path is not an error.
  pub fn remove(&self, path: &Path) -> Result<(), FsError> {
    let metadata = match fs::symlink_metadata(path) {
      Ok(metadata) => metadata,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
      Err(source) => {
        return Err(FsError::Remove {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    let result = if metadata.file_type().is_symlink() {
      remove_link(path)
    } else if metadata.is_dir() {
      fs::remove_dir_all(path)
    } else {
      fs::remove_file(path)
    };

    result.map_err(|source| FsError::Remove {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Copy a file or directory.
  ///
  /// A file copied onto an existing directory is nested inside it under its
  /// own name. A symlink at the destination is replaced, never written
  /// through.
  pub fn copy(&self, src: &Path, dst: &Path) -> Result<(), FsError> {
    if src.is_dir() {
      return self.copy_all(src, dst, &IgnoreSet::new());
    }

    let dst = nested_destination(src, dst);
    if is_symlink(&dst) {
      self.remove(&dst)?;
    }
    if let Some(parent) = dst.parent() {
      fs::create_dir_all(parent).map_err(|source| FsError::CreateDir {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    fs::copy(src, &dst).map_err(|source| FsError::Copy {
      from: src.to_path_buf(),
      to: dst.clone(),
      source,
    })?;
    Ok(())
  }

  /// Recursively copy `src` to `dst`.
  ///
  /// `.git`, `.DS_Store`, symlinks and entries matching `exclude` are skipped.
  /// When `dst` lies inside `src` it is not copied into itself.
  pub fn copy_all(&self, src: &Path, dst: &Path, exclude: &IgnoreSet) -> Result<(), FsError> {
    if !src.is_dir() {
      return self.copy(src, dst);
    }

    fs::create_dir_all(dst).map_err(|source| FsError::CreateDir {
      path: dst.to_path_buf(),
      source,
    })?;

    let src = canonicalize(src)?;
    // The top-level entry of `src` that contains `dst`, if any.
    let guard = canonicalize(dst).ok().and_then(|d| {
      let first = d.strip_prefix(&src).ok()?.components().next()?;
      Some(src.join(first))
    });
    self.copy_tree(&src, dst, Path::new(""), exclude, guard.as_deref())
  }

  fn copy_tree(
    &self,
    src: &Path,
    dst: &Path,
    rel: &Path,
    exclude: &IgnoreSet,
    guard: Option<&Path>,
  ) -> Result<(), FsError> {
    fs::create_dir_all(dst).map_err(|source| FsError::CreateDir {
      path: dst.to_path_buf(),
      source,
    })?;

    for entry in read_dir_sorted(src)? {
      let name = entry.file_name();
      let entry_rel = rel.join(&name);
      if is_always_skipped(&name) || exclude.is_ignored(&entry_rel) {
        continue;
      }

      let path = entry.path();
      if is_symlink(&path) {
        debug!(path = %path.display(), "skipping symlink");
        continue;
      }
      if guard == Some(path.as_path()) {
        continue;
      }

      let target = dst.join(&name);
      if path.is_dir() {
        self.copy_tree(&path, &target, &entry_rel, exclude, guard)?;
      } else if path.is_file() {
        if is_symlink(&target) {
          self.remove(&target)?;
        }
        fs::copy(&path, &target).map_err(|source| FsError::Copy {
          from: path.clone(),
          to: target.clone(),
          source,
        })?;
      }
    }

    Ok(())
  }

  /// Create a symlink at `link` pointing to `target`.
  ///
  /// The target must exist. An existing symlink at `link` is replaced; any
  /// other existing entry is an error.
  pub fn symlink(&self, target: &Path, link: &Path) -> Result<(), FsError> {
    if !target.exists() {
      return Err(FsError::MissingTarget(target.to_path_buf()));
    }
    if is_symlink(link) {
      self.remove(link)?;
    } else if link.exists() {
      return Err(FsError::Exists(link.to_path_buf()));
    }

    if cfg!(windows) && self.copy_on_windows {
      return self.copy(target, link);
    }

    let link_target = self.link_target(target, link)?;
    create_link(&link_target, link, target.is_dir()).map_err(|source| FsError::Symlink {
      target: link_target.clone(),
      link: link.to_path_buf(),
      source,
    })
  }

  /// Point `link` at `target` in a single rename.
  ///
  /// The new link is created under a temporary name next to `link` and moved
  /// over the old one, so the old target stays reachable until the switch. A
  /// real directory or file at `link` is removed first.
  pub fn replace_link(&self, target: &Path, link: &Path) -> Result<(), FsError> {
    if !target.exists() {
      return Err(FsError::MissingTarget(target.to_path_buf()));
    }
    if !is_symlink(link) && link.exists() {
      warn!(path = %link.display(), "Overriding existing path");
      self.remove(link)?;
    }

    let link_target = self.link_target(target, link)?;
    let name = link.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let temp = link.with_file_name(format!(".{name}.{}.tmp", std::process::id()));
    self.remove(&temp)?;

    create_link(&link_target, &temp, target.is_dir()).map_err(|source| FsError::Symlink {
      target: link_target.clone(),
      link: temp.clone(),
      source,
    })?;

    // Windows refuses to rename over an existing directory link.
    #[cfg(windows)]
    self.remove(link)?;

    fs::rename(&temp, link).map_err(|source| FsError::Rename {
      from: temp.clone(),
      to: link.to_path_buf(),
      source,
    })?;
    debug!(link = %link.display(), target = %link_target.display(), "switched link");
    Ok(())
  }

  /// The target to write into a link at `link`, creating its parent.
  fn link_target(&self, target: &Path, link: &Path) -> Result<PathBuf, FsError> {
    let parent = link.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|source| FsError::CreateDir {
      path: parent.to_path_buf(),
      source,
    })?;

    let absolute_target = absolute_path(target)?;
    Ok(match self.link_style {
      LinkStyle::Absolute => absolute_target,
      LinkStyle::Relative => make_path_relative(&absolute_target, &canonicalize(parent)?),
    })
  }

  /// Copy or symlink a single entry.
  pub fn place(&self, src: &Path, dst: &Path, copy: bool, exclude: &IgnoreSet) -> Result<(), FsError> {
    if copy {
      self.copy_all(src, dst, exclude)
    } else {
      self.symlink(src, dst)
    }
  }

  /// Place every entry of `src` into `dst`, one link (or copy) per entry.
  ///
  /// `dst` is created if missing. `.git`, `.DS_Store`, symlinks and entries
  /// matching `opts.exclude` are skipped. A file whose destination is an
  /// existing directory is nested inside that directory. Broken links at the
  /// destination are replaced.
  pub fn symlink_all(&self, src: &Path, dst: &Path, opts: SymlinkAllOptions<'_>) -> Result<(), FsError> {
    let src = canonicalize(src)?;
    self.symlink_tree(&src, dst, Path::new(""), opts)
  }

  fn symlink_tree(&self, src: &Path, dst: &Path, rel: &Path, opts: SymlinkAllOptions<'_>) -> Result<(), FsError> {
    fs::create_dir_all(dst).map_err(|source| FsError::CreateDir {
      path: dst.to_path_buf(),
      source,
    })?;

    for entry in read_dir_sorted(src)? {
      let name = entry.file_name();
      let entry_rel = rel.join(&name);
      if is_always_skipped(&name) || opts.exclude.is_ignored(&entry_rel) {
        continue;
      }

      let source = entry.path();
      if is_symlink(&source) {
        continue;
      }

      let mut link = dst.join(&name);
      if opts.recursive && !is_symlink(&link) && link.is_dir() && source.is_dir() {
        self.symlink_tree(&source, &link, &entry_rel, opts)?;
        continue;
      }

      if !source.is_dir() && link.is_dir() {
        info!(
          file = %entry_rel.display(),
          directory = %link.display(),
          "destination is a directory, nesting file inside it"
        );
        link = link.join(&name);
      }

      if link.exists() {
        if opts.skip_existing {
          debug!(path = %link.display(), "skipping existing path");
          continue;
        }
        return Err(FsError::Exists(link));
      } else if is_symlink(&link) {
        info!(path = %link.display(), "removing broken symlink");
        self.remove(&link)?;
      }

      debug!(
        source = %source.display(),
        destination = %link.display(),
        copy = opts.copy,
        "placing entry"
      );
      self.place(&source, &link, opts.copy, opts.exclude)?;
    }

    Ok(())
  }
}

/// Express `target` relative to the directory `base`.
///
/// Both paths should be absolute and normalized. When they share no common
/// root (different drives on Windows), `target` is returned unchanged.
pub fn make_path_relative(target: &Path, base: &Path) -> PathBuf {
  let target_components: Vec<Component<'_>> = target.components().collect();
  let base_components: Vec<Component<'_>> = base.components().collect();

  let common = target_components
    .iter()
    .zip(base_components.iter())
    .take_while(|(a, b)| a == b)
    .count();

  let shares_root = matches!(target_components.first(), Some(first) if base_components.first() == Some(first));
  if !shares_root {
    return target.to_path_buf();
  }

  let mut relative = PathBuf::new();
  for _ in common..base_components.len() {
    relative.push("..");
  }
  for component in &target_components[common..] {
    relative.push(component.as_os_str());
  }

  if relative.as_os_str().is_empty() {
    PathBuf::from(".")
  } else {
    relative
  }
}

pub fn is_symlink(path: &Path) -> bool {
  fs::symlink_metadata(path)
    .map(|m| m.file_type().is_symlink())
    .unwrap_or(false)
}

/// Where a non-directory `src` lands when placed at `dst`.
pub fn nested_destination(src: &Path, dst: &Path) -> PathBuf {
  match src.file_name() {
    Some(name) if !src.is_dir() && dst.is_dir() => dst.join(name),
    _ => dst.to_path_buf(),
  }
}

fn is_always_skipped(name: &std::ffi::OsStr) -> bool {
  name.to_str().is_some_and(|n| ALWAYS_SKIP.contains(&n))
}

fn canonicalize(path: &Path) -> Result<PathBuf, FsError> {
  dunce::canonicalize(path).map_err(|source| FsError::Resolve {
    path: path.to_path_buf(),
    source,
  })
}

/// Absolute form of `path` without resolving a final symlink component.
fn absolute_path(path: &Path) -> Result<PathBuf, FsError> {
  match (path.parent(), path.file_name()) {
    (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => Ok(canonicalize(parent)?.join(name)),
    (_, Some(name)) => Ok(canonicalize(Path::new("."))?.join(name)),
    _ => canonicalize(path),
  }
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<DirEntry>, FsError> {
  let read_err = |source| FsError::Read {
    path: dir.to_path_buf(),
    source,
  };
  let mut entries = fs::read_dir(dir)
    .map_err(read_err)?
    .collect::<Result<Vec<_>, _>>()
    .map_err(read_err)?;
  entries.sort_by_key(|e| e.file_name());
  Ok(entries)
}

#[cfg(unix)]
fn create_link(target: &Path, link: &Path, _is_dir: bool) -> io::Result<()> {
  std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_link(target: &Path, link: &Path, is_dir: bool) -> io::Result<()> {
  if is_dir {
    std::os::windows::fs::symlink_dir(target, link)
  } else {
    std::os::windows::fs::symlink_file(target, link)
  }
}

#[cfg(unix)]
fn remove_link(path: &Path) -> io::Result<()> {
  fs::remove_file(path)
}

#[cfg(windows)]
fn remove_link(path: &Path) -> io::Result<()> {
  // Directory symlinks must be removed as directories on Windows.
  fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

/// Whether any directory between `root` and `path` (exclusive) is a symlink.
pub fn passes_through_link(root: &Path, path: &Path) -> bool {
  let Ok(relative) = path.strip_prefix(root) else {
    return false;
  };
  let mut current = root.to_path_buf();
  let mut components = relative.components().peekable();
  while let Some(component) = components.next() {
    if components.peek().is_none() {
      break;
    }
    current.push(component);
    if is_symlink(&current) {
      return true;
    }
  }
  false
}
