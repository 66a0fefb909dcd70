//! The metadata file written into every finished build directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::BUILD_MARKER;

const MARKER_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum MarkerError {
  #[error("failed to read build marker {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse build marker {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to write build marker {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMarker {
  /// Marker format version.
  pub version: u32,
  /// Id of the application the build belongs to.
  pub app: String,
  /// Key of the toolstack that produced the build.
  pub toolstack: String,
  /// Tree id of the sources, when the build could be archived.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tree_id: Option<String>,
  pub environment_id: String,
  pub created_at: DateTime<Utc>,
}

impl BuildMarker {
  pub fn new(app: impl Into<String>, toolstack: &str, tree_id: Option<String>, environment_id: &str) -> Self {
    Self {
      version: MARKER_VERSION,
      app: app.into(),
      toolstack: toolstack.to_string(),
      tree_id,
      environment_id: environment_id.to_string(),
      created_at: Utc::now(),
    }
  }
}

pub fn write_marker(build_dir: &Path, marker: &BuildMarker) -> Result<(), MarkerError> {
  let path = build_dir.join(BUILD_MARKER);
  let write_err = |source| MarkerError::Write {
    path: path.clone(),
    source,
  };
  let content = serde_json::to_string_pretty(marker).map_err(|e| write_err(io::Error::other(e)))?;
  fs::write(&path, format!("{content}\n")).map_err(write_err)
}

/// Read the marker of a build directory.
///
/// Returns `None` if the build never finished and so has no marker.
pub fn read_marker(build_dir: &Path) -> Result<Option<BuildMarker>, MarkerError> {
  let path = build_dir.join(BUILD_MARKER);
  let content = match fs::read_to_string(&path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
    Err(source) => return Err(MarkerError::Read { path, source }),
  };
  let marker = serde_json::from_str(&content).map_err(|source| MarkerError::Parse { path, source })?;
  Ok(Some(marker))
}
