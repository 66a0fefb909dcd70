//! Per-invocation build settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_ENVIRONMENT_ID;

/// How much the build narrates, also forwarded to tools that accept it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
  Quiet,
  #[default]
  Normal,
  Verbose,
  VeryVerbose,
  Debug,
}

/// Options specific to Drush make.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrushSettings {
  pub concurrency: Option<u32>,
  /// Keep VCS checkouts of downloaded projects.
  pub working_copy: bool,
  /// Resolve against `.lock` make files, writing them when missing.
  pub lock: bool,
}

/// Settings for one build invocation.
///
/// Read-only once a build starts: the orchestrator and every toolstack only
/// ever see a shared reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
  /// Overrides the application's document root.
  pub document_root: Option<PathBuf>,
  /// Copy files into the build instead of symlinking them.
  pub copy: bool,
  /// Use absolute instead of relative symlink targets.
  pub absolute_links: bool,
  pub no_clean: bool,
  pub no_archive: bool,
  pub no_cache: bool,
  pub no_build_hooks: bool,
  pub environment_id: String,
  pub verbosity: Verbosity,
  pub drush: DrushSettings,
}

impl Default for BuildSettings {
  fn default() -> Self {
    Self {
      document_root: None,
      copy: false,
      absolute_links: false,
      no_clean: false,
      no_archive: false,
      no_cache: false,
      no_build_hooks: false,
      environment_id: DEFAULT_ENVIRONMENT_ID.to_string(),
      verbosity: Verbosity::Normal,
      drush: DrushSettings::default(),
    }
  }
}

impl BuildSettings {
  /// Whether finished builds may be stored in, or restored from, the archive
  /// cache.
  pub fn use_archives(&self) -> bool {
    !self.no_archive && !self.no_cache
  }
}
