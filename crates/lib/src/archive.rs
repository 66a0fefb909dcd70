//! Build archive cache.
//!
//! A finished build that does not point back into the mutable source tree can
//! be stored as `<archive_dir>/<tree-id>.tar.gz`. When the same sources are
//! built again with the same settings, the archive is unpacked instead of
//! running the dependency managers.
//!
//! The tree id covers the application files, the settings that change the
//! build output, the toolstack and [`BUILD_VERSION`].

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use tar::{Archive, Builder};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::build::marker::read_marker;
use crate::config::LocalConfig;
use crate::consts::BUILD_VERSION;
use crate::placement::IgnoreSet;
use crate::settings::BuildSettings;
use crate::util::hash::{DirHashError, hash_bytes, hash_directory};

const ARCHIVE_EXTENSION: &str = ".tar.gz";

#[derive(Debug, Error)]
pub enum ArchiveError {
  #[error("failed to hash application tree: {0}")]
  Hash(#[from] DirHashError),

  #[error("failed to create archive {path}: {source}")]
  Create {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to extract archive {path}: {source}")]
  Extract {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read directory {path}: {source}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// The settings that change what a build contains.
#[derive(Serialize)]
struct TreeSettings {
  copy: bool,
  absolute_links: bool,
  no_cache: bool,
  working_copy: bool,
  lock: bool,
}

impl From<&BuildSettings> for TreeSettings {
  fn from(settings: &BuildSettings) -> Self {
    Self {
      copy: settings.copy,
      absolute_links: settings.absolute_links,
      no_cache: settings.no_cache,
      working_copy: settings.drush.working_copy,
      lock: settings.drush.lock,
    }
  }
}

/// Identify an application tree for archiving.
///
/// Entries matching `ignored` are left out, exactly as they are left out of
/// the build.
pub fn tree_id(
  app_root: &Path,
  ignored: &IgnoreSet,
  settings: &BuildSettings,
  toolstack: &str,
) -> Result<String, ArchiveError> {
  let files = hash_directory(app_root, |rel| ignored.is_ignored(rel))?;
  let settings = serde_json::to_string(&TreeSettings::from(settings)).unwrap_or_default();
  let combined = format!("{files}\n{settings}\n{toolstack}\n{BUILD_VERSION}");
  Ok(hash_bytes(combined.as_bytes()).0)
}

pub fn archive_path(project_root: &Path, config: &LocalConfig, tree_id: &str) -> PathBuf {
  config
    .archives_path(project_root)
    .join(format!("{tree_id}{ARCHIVE_EXTENSION}"))
}

/// Store the contents of `build_dir` at `archive`.
///
/// Symlinks are stored as links. The archive is written under a temporary
/// name and moved into place once complete.
pub fn save_archive(build_dir: &Path, archive: &Path) -> Result<(), ArchiveError> {
  let create_err = |source| ArchiveError::Create {
    path: archive.to_path_buf(),
    source,
  };
  let dir = archive.parent().unwrap_or_else(|| Path::new("."));
  fs::create_dir_all(dir).map_err(create_err)?;

  let temp = tempfile::NamedTempFile::new_in(dir).map_err(create_err)?;
  {
    let encoder = GzEncoder::new(BufWriter::new(temp.as_file()), Compression::default());
    let mut builder = Builder::new(encoder);
    builder.follow_symlinks(false);
    builder.append_dir_all(".", build_dir).map_err(create_err)?;
    let mut writer = builder.into_inner().map_err(create_err)?.finish().map_err(create_err)?;
    writer.flush().map_err(create_err)?;
  }
  temp.persist(archive).map_err(|e| create_err(e.error))?;

  info!(archive = %archive.display(), "Saved build archive");
  Ok(())
}

/// Unpack `archive` into `build_dir`, creating it if needed.
pub fn extract_archive(archive: &Path, build_dir: &Path) -> Result<(), ArchiveError> {
  let extract_err = |source| ArchiveError::Extract {
    path: archive.to_path_buf(),
    source,
  };
  fs::create_dir_all(build_dir).map_err(extract_err)?;

  let file = File::open(archive).map_err(extract_err)?;
  let mut tar = Archive::new(GzDecoder::new(BufReader::new(file)));
  tar.set_preserve_permissions(true);
  tar.set_overwrite(true);
  tar.unpack(build_dir).map_err(extract_err)?;

  info!(archive = %archive.display(), build_dir = %build_dir.display(), "Extracted build archive");
  Ok(())
}

/// Delete archives that no remaining build was made from.
///
/// Returns the number of archives deleted.
pub fn clean_archives(project_root: &Path, config: &LocalConfig) -> Result<usize, ArchiveError> {
  let archives_dir = config.archives_path(project_root);
  if !archives_dir.is_dir() {
    return Ok(0);
  }

  let live = live_tree_ids(&config.builds_path(project_root))?;
  let read_err = |source| ArchiveError::ReadDir {
    path: archives_dir.clone(),
    source,
  };

  let mut deleted = 0;
  for entry in fs::read_dir(&archives_dir).map_err(read_err)? {
    let entry = entry.map_err(read_err)?;
    let name = entry.file_name().to_string_lossy().into_owned();
    let Some(tree_id) = name.strip_suffix(ARCHIVE_EXTENSION) else {
      continue;
    };
    if live.contains(tree_id) {
      continue;
    }

    let path = entry.path();
    match fs::remove_file(&path) {
      Ok(()) => {
        debug!(path = %path.display(), "deleted unused archive");
        deleted += 1;
      }
      Err(e) => warn!(path = %path.display(), error = %e, "failed to delete archive"),
    }
  }

  if deleted > 0 {
    info!(deleted, "cleaned build archives");
  }
  Ok(deleted)
}

fn live_tree_ids(builds_dir: &Path) -> Result<HashSet<String>, ArchiveError> {
  let mut live = HashSet::new();
  if !builds_dir.is_dir() {
    return Ok(live);
  }

  let read_err = |source| ArchiveError::ReadDir {
    path: builds_dir.to_path_buf(),
    source,
  };
  for entry in fs::read_dir(builds_dir).map_err(read_err)? {
    let path = entry.map_err(read_err)?.path();
    if !path.is_dir() {
      continue;
    }
    match read_marker(&path) {
      Ok(Some(marker)) => live.extend(marker.tree_id),
      Ok(None) => {}
      Err(e) => warn!(path = %path.display(), error = %e, "skipping build with unreadable marker"),
    }
  }
  Ok(live)
}
