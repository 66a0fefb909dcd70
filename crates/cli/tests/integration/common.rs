//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Isolated project directory.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn empty() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Project root, canonicalized so it compares equal to paths the binary
  /// reports.
  pub fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap()
  }

  /// Write a file relative to the project root.
  pub fn write_file(&self, relative_path: &str, content: &str) -> &Self {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    self
  }

  pub fn builds(&self) -> Vec<PathBuf> {
    let dir = self.root().join("builds");
    let Ok(entries) = std::fs::read_dir(dir) else {
      return Vec::new();
    };
    let mut builds: Vec<PathBuf> = entries
      .flatten()
      .map(|e| e.path())
      .filter(|p| !p.file_name().unwrap().to_string_lossy().starts_with('.'))
      .collect();
    builds.sort();
    builds
  }

  /// A Command for the webbuild binary running in the project root.
  ///
  /// `WEBBUILD_*` overrides from the calling environment are removed.
  pub fn webbuild_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("webbuild");
    cmd.current_dir(self.temp.path());
    for name in ["RESOURCES_DIR", "DRUSH", "COMPOSER", "NPM", "KEEP_BUILDS"] {
      cmd.env_remove(format!("WEBBUILD_{name}"));
    }
    cmd
  }

  /// Run `webbuild build` in the project and assert it succeeded.
  pub fn build(&self) {
    self.webbuild_cmd().arg("build").assert().success();
  }
}

pub fn is_symlink(path: &Path) -> bool {
  std::fs::symlink_metadata(path)
    .map(|m| m.file_type().is_symlink())
    .unwrap_or(false)
}
