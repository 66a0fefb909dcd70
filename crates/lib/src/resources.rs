//! Bundled file templates.
//!
//! Templates are compiled into the binary. A directory configured through
//! [`crate::config::LocalConfig::resources_dir`] takes precedence, file by
//! file, so individual templates can be replaced without rebuilding.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

const DRUPAL_SETTINGS_D8: &str = include_str!(concat!(
  env!("CARGO_MANIFEST_DIR"),
  "/resources/drupal/settings-d8.php.dist"
));
const DRUPAL_SETTINGS_D7: &str = include_str!(concat!(
  env!("CARGO_MANIFEST_DIR"),
  "/resources/drupal/settings-d7.php.dist"
));
const DRUPAL_SETTINGS_LOCAL: &str = include_str!(concat!(
  env!("CARGO_MANIFEST_DIR"),
  "/resources/drupal/settings.local.php.dist"
));
const DRUPAL_GITIGNORE_VANILLA: &str = include_str!(concat!(
  env!("CARGO_MANIFEST_DIR"),
  "/resources/drupal/gitignore-vanilla"
));

#[derive(Debug, Error)]
pub enum ResourceError {
  #[error("failed to read resource override {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
  /// `settings.php` for Drupal 8 and later.
  DrupalSettings,
  /// `settings.php` for Drupal 7 and earlier.
  DrupalSettingsLegacy,
  DrupalSettingsLocal,
  DrupalGitignoreVanilla,
}

impl Resource {
  /// Path of the override file, relative to the resources directory.
  pub fn relative_path(self) -> &'static str {
    match self {
      Resource::DrupalSettings => "drupal/settings-d8.php.dist",
      Resource::DrupalSettingsLegacy => "drupal/settings-d7.php.dist",
      Resource::DrupalSettingsLocal => "drupal/settings.local.php.dist",
      Resource::DrupalGitignoreVanilla => "drupal/gitignore-vanilla",
    }
  }

  fn embedded(self) -> &'static str {
    match self {
      Resource::DrupalSettings => DRUPAL_SETTINGS_D8,
      Resource::DrupalSettingsLegacy => DRUPAL_SETTINGS_D7,
      Resource::DrupalSettingsLocal => DRUPAL_SETTINGS_LOCAL,
      Resource::DrupalGitignoreVanilla => DRUPAL_GITIGNORE_VANILLA,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct Resources {
  override_dir: Option<PathBuf>,
}

impl Resources {
  pub fn new(override_dir: Option<PathBuf>) -> Self {
    Self { override_dir }
  }

  pub fn content(&self, resource: Resource) -> Result<Cow<'static, str>, ResourceError> {
    if let Some(dir) = &self.override_dir {
      let path = dir.join(resource.relative_path());
      if path.is_file() {
        debug!(path = %path.display(), "using resource override");
        return fs::read_to_string(&path)
          .map(Cow::Owned)
          .map_err(|source| ResourceError::Read { path, source });
      }
    }
    Ok(Cow::Borrowed(resource.embedded()))
  }

  /// Write a template to `destination`, creating parent directories.
  pub fn install(&self, resource: Resource, destination: &Path) -> Result<(), ResourceError> {
    let content = self.content(resource)?;
    let write_err = |source| ResourceError::Write {
      path: destination.to_path_buf(),
      source,
    };
    if let Some(parent) = destination.parent() {
      fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(destination, content.as_bytes()).map_err(write_err)
  }
}
