//! Project-local configuration.
//!
//! `LocalConfig` names the on-disk layout of a project (builds, web root,
//! shared state, archives) and the external tools the toolstacks invoke. It is
//! loaded once per command and handed to the orchestrator explicitly.
//!
//! Values are resolved in three layers:
//! 1. Built-in defaults
//! 2. `.webbuild.json` in the project root, if present
//! 3. `WEBBUILD_*` environment variables

use std::path::{Path, PathBuf};
use std::{fs, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{CONFIG_FILE_NAME, DEFAULT_KEEP_BUILDS, ENV_PREFIX};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse config file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid value for {name}: {value}")]
  InvalidEnv { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
  /// Directory holding timestamped build directories.
  pub build_dir: String,
  /// Symlink (or directory of symlinks) pointing at the active build(s).
  pub web_root: String,
  /// Persistent state that survives across builds.
  pub shared_dir: String,
  /// Cached build archives keyed by tree id.
  pub archive_dir: String,
  /// Per-application configuration file name.
  pub app_config_file: String,
  /// Overrides the bundled resource templates.
  pub resources_dir: Option<PathBuf>,
  /// Copy instead of symlinking on Windows.
  pub copy_on_windows: bool,
  pub drush_executable: String,
  pub composer_executable: String,
  pub npm_executable: String,
  /// Number of recent builds always kept by automatic cleanup.
  pub keep_builds: usize,
  /// Builds older than this many seconds are eligible for automatic cleanup.
  pub max_build_age: Option<u64>,
}

impl Default for LocalConfig {
  fn default() -> Self {
    Self {
      build_dir: "builds".to_string(),
      web_root: "www".to_string(),
      shared_dir: "shared".to_string(),
      archive_dir: ".build-archives".to_string(),
      app_config_file: ".app.yaml".to_string(),
      resources_dir: None,
      copy_on_windows: true,
      drush_executable: "drush".to_string(),
      composer_executable: "composer".to_string(),
      npm_executable: "npm".to_string(),
      keep_builds: DEFAULT_KEEP_BUILDS,
      max_build_age: None,
    }
  }
}

impl LocalConfig {
  /// Load the configuration for a project.
  ///
  /// A missing config file is not an error; defaults apply.
  pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
    let path = project_root.join(CONFIG_FILE_NAME);
    let mut config = if path.is_file() {
      let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
      })?;
      serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
      })?
    } else {
      LocalConfig::default()
    };

    config.apply_env_overrides()?;
    debug!(?config, "loaded local config");
    Ok(config)
  }

  fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
    if let Some(dir) = env_var("RESOURCES_DIR") {
      self.resources_dir = Some(PathBuf::from(dir));
    }
    if let Some(drush) = env_var("DRUSH") {
      self.drush_executable = drush;
    }
    if let Some(composer) = env_var("COMPOSER") {
      self.composer_executable = composer;
    }
    if let Some(npm) = env_var("NPM") {
      self.npm_executable = npm;
    }
    if let Some(keep) = env_var("KEEP_BUILDS") {
      self.keep_builds = keep.parse().map_err(|_| ConfigError::InvalidEnv {
        name: format!("{ENV_PREFIX}KEEP_BUILDS"),
        value: keep.clone(),
      })?;
    }
    Ok(())
  }

  pub fn builds_path(&self, project_root: &Path) -> PathBuf {
    project_root.join(&self.build_dir)
  }

  pub fn web_root_path(&self, project_root: &Path) -> PathBuf {
    project_root.join(&self.web_root)
  }

  pub fn shared_path(&self, project_root: &Path) -> PathBuf {
    project_root.join(&self.shared_dir)
  }

  pub fn archives_path(&self, project_root: &Path) -> PathBuf {
    project_root.join(&self.archive_dir)
  }

  /// Project-root entries owned by the build process, as anchored ignore
  /// patterns (`/builds`, `/www`, ...).
  pub fn layout_ignores(&self) -> Vec<String> {
    [&self.build_dir, &self.web_root, &self.shared_dir, &self.archive_dir]
      .iter()
      .map(|entry| format!("/{}", entry.trim_matches('/')))
      .collect()
  }
}

fn env_var(suffix: &str) -> Option<String> {
  std::env::var(format!("{ENV_PREFIX}{suffix}"))
    .ok()
    .filter(|value| !value.is_empty())
}
