//! Per-application YAML configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::AppError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub name: Option<String>,
  /// Runtime type such as `php:8.2` or `nodejs:20`.
  #[serde(rename = "type")]
  pub app_type: Option<String>,
  pub build: BuildSection,
  pub web: WebSection,
  pub hooks: HooksSection,
  /// Application path to mount definition.
  pub mounts: BTreeMap<String, MountConfig>,
  pub source: SourceSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSection {
  /// Toolstack key or short name; detection is used when unset.
  pub flavor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSection {
  pub document_root: Option<String>,
  pub move_to_root: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksSection {
  pub build: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
  pub source: String,
  pub source_path: Option<String>,
}

impl Default for MountConfig {
  fn default() -> Self {
    Self {
      source: "local".to_string(),
      source_path: None,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
  /// Application root relative to the project root.
  pub root: Option<String>,
}

impl AppConfig {
  pub fn from_file(path: &Path) -> Result<Self, AppError> {
    let content = fs::read_to_string(path).map_err(|source| AppError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse(&content).map_err(|source| AppError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file is a valid, empty configuration.
    if content.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(content)
  }
}
