//! Test utilities for webbuild-lib.
//!
//! Cross-platform helpers for laying out source trees and symlinks in tests,
//! and a shell double for toolstack tests.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use crate::shell::{Shell, ShellCommand, ShellError};

/// Write a file, creating parent directories as needed.
pub fn write_file(root: &Path, relative: &str, content: &str) {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}

/// Cross-platform symlink creation helper.
pub fn create_symlink(target: &Path, link: &Path) {
  #[cfg(unix)]
  {
    std::os::unix::fs::symlink(target, link).unwrap();
  }
  #[cfg(windows)]
  {
    if target.is_dir() {
      std::os::windows::fs::symlink_dir(target, link).unwrap();
    } else {
      std::os::windows::fs::symlink_file(target, link).unwrap();
    }
  }
}

type Effect = Box<dyn Fn(&ShellCommand) -> Option<String> + Send + Sync>;

/// Records every command instead of running it.
///
/// An optional effect simulates what the real tool would do and supplies its
/// stdout. Programs registered as missing fail to spawn, programs registered
/// as failing exit unsuccessfully.
pub struct RecordingShell {
  commands: Mutex<Vec<ShellCommand>>,
  missing: Vec<String>,
  failing: Vec<String>,
  effect: Option<Effect>,
}

impl RecordingShell {
  pub fn new() -> Self {
    Self {
      commands: Mutex::new(Vec::new()),
      missing: Vec::new(),
      failing: Vec::new(),
      effect: None,
    }
  }

  pub fn with_missing(mut self, program: &str) -> Self {
    self.missing.push(program.to_string());
    self
  }

  pub fn with_failing(mut self, program: &str) -> Self {
    self.failing.push(program.to_string());
    self
  }

  pub fn with_effect(mut self, effect: impl Fn(&ShellCommand) -> Option<String> + Send + Sync + 'static) -> Self {
    self.effect = Some(Box::new(effect));
    self
  }

  pub fn commands(&self) -> Vec<ShellCommand> {
    self.commands.lock().unwrap().clone()
  }

  /// Commands rendered as `program arg...`.
  pub fn command_lines(&self) -> Vec<String> {
    self.commands().iter().map(ToString::to_string).collect()
  }
}

impl Shell for RecordingShell {
  fn execute(&self, command: &ShellCommand, must_succeed: bool) -> Result<Option<String>, ShellError> {
    if self.missing.iter().any(|m| m == command.program()) {
      return Err(ShellError::Spawn {
        command: command.to_string(),
        source: io::Error::from(io::ErrorKind::NotFound),
      });
    }
    self.commands.lock().unwrap().push(command.clone());
    if self.failing.iter().any(|f| f == command.program()) {
      if must_succeed {
        return Err(ShellError::Failed {
          command: command.to_string(),
          code: Some(1),
        });
      }
      return Ok(None);
    }
    let output = self.effect.as_ref().and_then(|effect| effect(command));
    Ok(Some(output.unwrap_or_default()))
  }

  fn command_exists(&self, program: &str) -> bool {
    !self.missing.iter().any(|m| m == program)
  }
}
