//! Applications within a project source tree.

pub mod config;
pub mod finder;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::consts::DEFAULT_DOCUMENT_ROOT;

pub use config::AppConfig;
pub use finder::ApplicationFinder;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("failed to read application config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse application config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("duplicate application name '{name}' in {first} and {second}")]
  DuplicateName {
    name: String,
    first: PathBuf,
    second: PathBuf,
  },

  #[error("application root not found: {0}")]
  MissingRoot(PathBuf),

  #[error("failed to scan {path}: {message}")]
  Scan { path: PathBuf, message: String },
}

/// A writable mount realised as a link into the shared directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedMount {
  /// Path inside the application, without leading or trailing slashes.
  pub path: String,
  /// Directory below the application's shared directory.
  pub source_path: String,
}

#[derive(Debug, Clone)]
pub struct LocalApplication {
  root: PathBuf,
  source_dir: PathBuf,
  config: AppConfig,
  single: bool,
}

impl LocalApplication {
  pub fn new(root: impl Into<PathBuf>, source_dir: impl Into<PathBuf>, config: AppConfig) -> Self {
    Self {
      root: root.into(),
      source_dir: source_dir.into(),
      config,
      single: true,
    }
  }

  pub fn with_single(mut self, single: bool) -> Self {
    self.single = single;
    self
  }

  /// The configured name, else the path relative to the project, else
  /// `default`.
  pub fn id(&self) -> String {
    if let Some(name) = self.name() {
      return name.to_string();
    }
    let relative = self
      .root
      .strip_prefix(&self.source_dir)
      .map(|p| p.to_string_lossy().replace('\\', "/"))
      .unwrap_or_default();
    if relative.is_empty() {
      "default".to_string()
    } else {
      relative
    }
  }

  pub fn name(&self) -> Option<&str> {
    self.config.name.as_deref().filter(|n| !n.is_empty())
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn source_dir(&self) -> &Path {
    &self.source_dir
  }

  pub fn config(&self) -> &AppConfig {
    &self.config
  }

  /// Whether this is the only application in its project.
  pub fn is_single(&self) -> bool {
    self.single
  }

  pub fn flavor(&self) -> Option<&str> {
    self.config.build.flavor.as_deref().filter(|f| !f.is_empty())
  }

  pub fn build_hook(&self) -> Option<&str> {
    self.config.hooks.build.as_deref().filter(|h| !h.trim().is_empty())
  }

  /// Document root relative to the build directory.
  pub fn document_root(&self, override_root: Option<&Path>) -> PathBuf {
    let configured = override_root
      .map(|p| p.to_string_lossy().into_owned())
      .or_else(|| self.config.web.document_root.clone())
      .unwrap_or_else(|| DEFAULT_DOCUMENT_ROOT.to_string());
    let trimmed = configured.trim_matches('/');
    if trimmed.is_empty() {
      PathBuf::from(DEFAULT_DOCUMENT_ROOT)
    } else {
      PathBuf::from(trimmed)
    }
  }

  /// Whether in-place placement should put the whole application inside the
  /// document root rather than the build directory.
  pub fn should_move_to_root(&self, document_root: &Path) -> bool {
    if self.config.web.move_to_root == Some(true) {
      return true;
    }
    document_root == Path::new(DEFAULT_DOCUMENT_ROOT) && !self.root.join(DEFAULT_DOCUMENT_ROOT).is_dir()
  }

  /// Local mounts, which keep their data in the shared directory.
  pub fn shared_file_mounts(&self) -> Vec<SharedMount> {
    self
      .config
      .mounts
      .iter()
      .filter(|(_, mount)| mount.source == "local")
      .map(|(path, mount)| SharedMount {
        path: path.trim_matches('/').to_string(),
        source_path: mount
          .source_path
          .as_deref()
          .map(|p| p.trim_matches('/'))
          .filter(|p| !p.is_empty())
          .unwrap_or("files")
          .to_string(),
      })
      .filter(|mount| !mount.path.is_empty())
      .collect()
  }

  /// This application's part of the project's shared directory.
  pub fn shared_dir(&self, project_shared: &Path) -> PathBuf {
    if self.single {
      project_shared.to_path_buf()
    } else {
      project_shared.join(sanitize(&self.id()))
    }
  }

  /// Where the active build of this application is published.
  pub fn local_web_root(&self, destination: &Path) -> PathBuf {
    if self.single {
      destination.to_path_buf()
    } else {
      destination.join(self.id().replace('/', "-"))
    }
  }
}

/// Replace anything but ASCII alphanumerics, `-` and `_` with `-`, collapsing
/// runs.
pub fn sanitize(value: &str) -> String {
  let mut result = String::with_capacity(value.len());
  let mut replaced = false;
  for ch in value.chars() {
    if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
      result.push(ch);
      replaced = false;
    } else if !replaced {
      result.push('-');
      replaced = true;
    }
  }
  result
}
