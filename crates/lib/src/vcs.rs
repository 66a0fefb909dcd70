//! Version-control ignore checks and exclude hints.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::consts::APP_NAME;
use crate::shell::{Shell, ShellCommand, SystemShell};

/// Answers whether paths are ignored by the repository they live in.
pub trait VcsIgnore: Send + Sync {
  /// The repository root containing `dir`, if any.
  fn root(&self, dir: &Path) -> Option<PathBuf>;

  fn is_ignored(&self, path: &Path) -> bool;
}

/// Git via its command-line client.
#[derive(Debug, Clone)]
pub struct GitCli {
  executable: String,
}

impl Default for GitCli {
  fn default() -> Self {
    Self {
      executable: "git".to_string(),
    }
  }
}

impl GitCli {
  pub fn new(executable: impl Into<String>) -> Self {
    Self {
      executable: executable.into(),
    }
  }
}

impl VcsIgnore for GitCli {
  fn root(&self, dir: &Path) -> Option<PathBuf> {
    let command = ShellCommand::new(&self.executable)
      .args(["rev-parse", "--show-toplevel"])
      .current_dir(dir);
    match SystemShell.execute(&command, false) {
      Ok(Some(root)) if !root.is_empty() => Some(PathBuf::from(root)),
      _ => None,
    }
  }

  fn is_ignored(&self, path: &Path) -> bool {
    let Some(parent) = path.parent() else {
      return false;
    };
    let command = ShellCommand::new(&self.executable)
      .args(["check-ignore", "-q"])
      .arg(path.to_string_lossy())
      .current_dir(if parent.is_dir() { parent } else { Path::new(".") });
    // check-ignore exits 0 only when the path is ignored.
    matches!(SystemShell.execute(&command, false), Ok(Some(_)))
  }
}

/// For trees outside any repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVcs;

impl VcsIgnore for NoVcs {
  fn root(&self, _dir: &Path) -> Option<PathBuf> {
    None
  }

  fn is_ignored(&self, _path: &Path) -> bool {
    false
  }
}

/// Add the project's build layout to `.git/info/exclude` so that builds never
/// show up as untracked files.
///
/// Entries already listed are not repeated. Returns whether the file was
/// changed. Projects without a `.git` directory are left alone.
pub fn write_git_exclude(project_root: &Path, entries: &[String]) -> io::Result<bool> {
  let git_dir = project_root.join(".git");
  if !git_dir.is_dir() {
    debug!(path = %project_root.display(), "not a git checkout, skipping exclude file");
    return Ok(false);
  }

  let exclude_file = git_dir.join("info").join("exclude");
  let existing = match fs::read_to_string(&exclude_file) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
    Err(e) => return Err(e),
  };

  let missing: Vec<&String> = entries
    .iter()
    .filter(|entry| !existing.lines().any(|line| line.trim() == entry.as_str()))
    .collect();
  if missing.is_empty() {
    return Ok(false);
  }

  let mut content = existing;
  if !content.is_empty() && !content.ends_with('\n') {
    content.push('\n');
  }
  if !content.is_empty() {
    content.push('\n');
  }
  content.push_str(&format!("# Automatically added by {APP_NAME}\n"));
  for entry in missing {
    content.push_str(entry);
    content.push('\n');
  }

  if let Some(parent) = exclude_file.parent() {
    fs::create_dir_all(parent)?;
  }
  fs::write(&exclude_file, content)?;
  info!(path = %exclude_file.display(), "updated git exclude file");
  Ok(true)
}
