//! Shared fixtures for orchestrator tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use webbuild_lib::build::LocalBuild;
use webbuild_lib::config::LocalConfig;
use webbuild_lib::settings::BuildSettings;
use webbuild_lib::shell::{Shell, ShellCommand, ShellError};
use webbuild_lib::vcs::NoVcs;

/// A shell that pretends to be composer, npm, drush and `/bin/sh`.
///
/// - `composer install` writes `vendor/autoload.php` in its working dir.
/// - `npm install` writes `node_modules/left-pad/index.js`.
/// - `drush version` reports 8.4.12; `drush make <file> <dest>` fills `dest`
///   with a minimal Drupal core, or a contrib module with `--no-core`.
/// - Scripts containing `exit 1` fail; `touch <name>` creates a file.
#[derive(Clone, Default)]
pub struct FakeShell {
  commands: Arc<Mutex<Vec<ShellCommand>>>,
}

impl FakeShell {
  pub fn new() -> Self {
    Self::default()
  }

  /// Recorded commands as `program arg...`.
  pub fn lines(&self) -> Vec<String> {
    self.commands.lock().unwrap().iter().map(ToString::to_string).collect()
  }

  pub fn count(&self, program: &str) -> usize {
    self
      .commands
      .lock()
      .unwrap()
      .iter()
      .filter(|c| c.program() == program)
      .count()
  }
}

impl Shell for FakeShell {
  fn execute(&self, command: &ShellCommand, must_succeed: bool) -> Result<Option<String>, ShellError> {
    self.commands.lock().unwrap().push(command.clone());
    let cwd = command.cwd().map(Path::to_path_buf).unwrap_or_default();
    let args = command.get_args();

    match command.program() {
      "composer" if args.first().map(String::as_str) == Some("install") => {
        write(&cwd, "vendor/autoload.php", "<?php // autoload");
      }
      "npm" if args.first().map(String::as_str) == Some("install") => {
        write(&cwd, "node_modules/left-pad/index.js", "module.exports = {};");
      }
      "drush" => match args.first().map(String::as_str) {
        Some("version") => return Ok(Some("8.4.12".to_string())),
        Some("make") => {
          let positional: Vec<&String> = args.iter().skip(1).filter(|a| !a.starts_with("--")).collect();
          let destination = PathBuf::from(positional[1]);
          if args.iter().any(|a| a == "--no-core") {
            write(&destination, "modules/contrib/views/views.info.yml", "name: Views");
          } else {
            write(&destination, "index.php", "<?php // Drupal");
            write(&destination, "core/includes/bootstrap.inc", "<?php");
            write(&destination, "sites/default/default.settings.php", "<?php");
          }
        }
        _ => {}
      },
      _ => {
        let script = args.last().cloned().unwrap_or_default();
        if script.contains("exit 1") {
          if must_succeed {
            return Err(ShellError::Failed {
              command: command.to_string(),
              code: Some(1),
            });
          }
          return Ok(None);
        }
        if let Some(name) = script.strip_prefix("touch ") {
          write(&cwd, name.trim(), "");
        }
      }
    }
    Ok(Some(String::new()))
  }

  fn command_exists(&self, _program: &str) -> bool {
    true
  }
}

pub fn write(root: &Path, relative: &str, content: &str) {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}

/// A project source tree in a temporary directory.
pub struct Project {
  temp: TempDir,
  pub shell: FakeShell,
  pub config: LocalConfig,
}

impl Project {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
      shell: FakeShell::new(),
      config: LocalConfig::default(),
    }
  }

  pub fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap()
  }

  pub fn write(&self, relative: &str, content: &str) -> &Self {
    write(&self.root(), relative, content);
    self
  }

  pub fn local_build(&self) -> LocalBuild {
    LocalBuild::new(self.config.clone())
      .with_shell(self.shell.clone())
      .with_vcs(NoVcs)
  }

  pub fn build(&self, settings: &BuildSettings) -> webbuild_lib::build::BuildOutcome {
    self.local_build().build(&self.root(), None, settings, &[]).unwrap()
  }

  pub fn www(&self) -> PathBuf {
    self.config.web_root_path(&self.root())
  }

  /// Build directories, oldest name first, without the lock file.
  pub fn builds(&self) -> Vec<PathBuf> {
    let mut builds: Vec<PathBuf> = fs::read_dir(self.config.builds_path(&self.root()))
      .unwrap()
      .filter_map(Result::ok)
      .map(|e| e.path())
      .filter(|p| !p.file_name().unwrap().to_string_lossy().starts_with('.'))
      .collect();
    builds.sort();
    builds
  }
}

pub fn copy_settings() -> BuildSettings {
  BuildSettings {
    copy: true,
    ..Default::default()
  }
}

pub fn is_symlink(path: &Path) -> bool {
  fs::symlink_metadata(path)
    .map(|m| m.file_type().is_symlink())
    .unwrap_or(false)
}
