//! Build retention.
//!
//! Old build directories are removed according to a keep-count and an
//! optional maximum age. Builds published through the web root are never
//! removed unless explicitly requested.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use std::{fs, io};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::LocalConfig;
use crate::placement::is_symlink;

#[derive(Debug, Error)]
pub enum RetentionError {
  #[error("failed to read builds directory {path}: {source}")]
  ReadBuilds {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read link {path}: {source}")]
  ReadLink {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("could not resolve the active build behind {link} (target {target})")]
  ResolveActive { link: PathBuf, target: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
  /// Builds beyond `keep` are deleted only when older than this. `None`
  /// deletes every build beyond `keep`.
  pub max_age: Option<Duration>,
  /// Number of most recent builds always kept.
  pub keep: usize,
  /// Allow deleting the builds the web root points at.
  pub include_active: bool,
}

impl RetentionPolicy {
  /// The policy applied automatically after a build.
  pub fn from_config(config: &LocalConfig) -> Self {
    Self {
      max_age: config.max_build_age.map(Duration::from_secs),
      keep: config.keep_builds,
      include_active: false,
    }
  }
}

#[derive(Debug, Default, Serialize)]
pub struct CleanStats {
  pub deleted: usize,
  pub kept: usize,
  pub deleted_paths: Vec<PathBuf>,
}

/// Delete old builds of the project at `project_root`.
pub fn clean_builds(
  project_root: &Path,
  config: &LocalConfig,
  policy: &RetentionPolicy,
) -> Result<CleanStats, RetentionError> {
  let builds_dir = config.builds_path(project_root);
  let mut stats = CleanStats::default();
  if !builds_dir.is_dir() {
    return Ok(stats);
  }

  let active = if policy.include_active {
    HashSet::new()
  } else {
    active_builds(project_root, config)?
  };

  let now = SystemTime::now();
  for (path, modified) in list_builds(&builds_dir)? {
    let age = now.duration_since(modified).unwrap_or_default();

    if active.contains(&path) {
      debug!(path = %path.display(), "keeping active build");
      stats.kept += 1;
      continue;
    }
    let too_many = stats.kept >= policy.keep;
    let too_old = policy.max_age.is_none_or(|max_age| age > max_age);
    if !(too_many && too_old) {
      stats.kept += 1;
      continue;
    }

    info!(path = %path.display(), "Deleting build");
    let result = if is_symlink(&path) {
      fs::remove_file(&path)
    } else {
      fs::remove_dir_all(&path)
    };
    match result {
      Ok(()) => {
        stats.deleted += 1;
        stats.deleted_paths.push(path);
      }
      Err(e) => warn!(path = %path.display(), error = %e, "failed to delete build"),
    }
  }

  info!(deleted = stats.deleted, kept = stats.kept, "cleaned builds");
  Ok(stats)
}

/// Builds newest first, by modification time and then by name.
fn list_builds(builds_dir: &Path) -> Result<Vec<(PathBuf, SystemTime)>, RetentionError> {
  let read_err = |source| RetentionError::ReadBuilds {
    path: builds_dir.to_path_buf(),
    source,
  };

  let mut builds = Vec::new();
  for entry in fs::read_dir(builds_dir).map_err(read_err)? {
    let entry = entry.map_err(read_err)?;
    if entry.file_name().to_string_lossy().starts_with('.') {
      continue;
    }
    let modified = entry
      .metadata()
      .and_then(|m| m.modified())
      .unwrap_or(SystemTime::UNIX_EPOCH);
    builds.push((entry.path(), modified));
  }

  builds.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
  Ok(builds)
}

/// Build directories currently published through the web root.
///
/// The web root is either a link itself or, for projects with several
/// applications, a directory of links.
pub fn active_builds(project_root: &Path, config: &LocalConfig) -> Result<HashSet<PathBuf>, RetentionError> {
  let web_root = config.web_root_path(project_root);
  let builds_dir = normalize(&config.builds_path(project_root));

  let mut links = Vec::new();
  if is_symlink(&web_root) {
    links.push(web_root);
  } else if web_root.is_dir() {
    let entries = fs::read_dir(&web_root).map_err(|source| RetentionError::ReadBuilds {
      path: web_root.clone(),
      source,
    })?;
    links.extend(entries.flatten().map(|e| e.path()).filter(|p| is_symlink(p)));
  }

  let mut active = HashSet::new();
  for link in links {
    let target = fs::read_link(&link).map_err(|source| RetentionError::ReadLink {
      path: link.clone(),
      source,
    })?;
    let absolute = if target.is_absolute() {
      target.clone()
    } else {
      link.parent().unwrap_or(project_root).join(&target)
    };
    let Ok(resolved) = dunce::canonicalize(&absolute) else {
      debug!(link = %link.display(), "skipping dangling web root link");
      continue;
    };
    if !resolved.starts_with(&builds_dir) {
      continue;
    }

    let mut build = resolved.as_path();
    while build.parent() != Some(builds_dir.as_path()) {
      match build.parent() {
        Some(parent) if parent.starts_with(&builds_dir) => build = parent,
        _ => return Err(RetentionError::ResolveActive { link, target }),
      }
    }
    active.insert(config.builds_path(project_root).join(build.strip_prefix(&builds_dir).unwrap_or(build)));
  }

  Ok(active)
}

fn normalize(path: &Path) -> PathBuf {
  dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
