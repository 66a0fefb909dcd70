//! Shell execution service.
//!
//! External dependency managers (composer, npm, drush) and build hooks run as
//! blocking child processes. Both output streams are logged line by line while
//! they run; stdout is also captured and returned. Output that is not valid
//! UTF-8 is decoded lossily.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ShellError {
  #[error("failed to run '{command}': {source}")]
  Spawn {
    command: String,
    #[source]
    source: io::Error,
  },

  #[error("command '{command}' failed (exit code {code:?})")]
  Failed { command: String, code: Option<i32> },
}

/// A program invocation: program, arguments, working directory and extra
/// environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellCommand {
  program: String,
  args: Vec<String>,
  cwd: Option<PathBuf>,
  env: BTreeMap<String, String>,
}

impl ShellCommand {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      ..Default::default()
    }
  }

  /// Run `script` through the platform shell.
  ///
  /// Uses `/bin/sh -c` on Unix and `cmd.exe /C` on Windows rather than the
  /// user's login shell, which may source profile files.
  pub fn script(script: &str) -> Self {
    #[cfg(unix)]
    {
      Self::new("/bin/sh").arg("-c").arg(script)
    }

    #[cfg(windows)]
    {
      Self::new("cmd.exe").arg("/C").arg(script)
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  pub fn program(&self) -> &str {
    &self.program
  }

  pub fn get_args(&self) -> &[String] {
    &self.args
  }

  pub fn cwd(&self) -> Option<&Path> {
    self.cwd.as_deref()
  }

  pub fn envs(&self) -> &BTreeMap<String, String> {
    &self.env
  }
}

impl fmt::Display for ShellCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      if arg.contains(' ') {
        write!(f, " '{}'", arg)?;
      } else {
        write!(f, " {}", arg)?;
      }
    }
    Ok(())
  }
}

pub trait Shell: Send + Sync {
  /// Run a command to completion.
  ///
  /// Returns the trimmed stdout on success. On a non-zero exit this is an
  /// error when `must_succeed` is set, and `Ok(None)` otherwise.
  fn execute(&self, command: &ShellCommand, must_succeed: bool) -> Result<Option<String>, ShellError>;

  /// Whether `program` can be found, either as a path or on `PATH`.
  fn command_exists(&self, program: &str) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShell;

impl Shell for SystemShell {
  fn execute(&self, command: &ShellCommand, must_succeed: bool) -> Result<Option<String>, ShellError> {
    info!(command = %command, cwd = ?command.cwd(), "running command");

    let mut process = Command::new(command.program());
    process
      .args(command.get_args())
      .envs(command.envs())
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped());
    if let Some(cwd) = command.cwd() {
      process.current_dir(cwd);
    }

    let spawn_err = |source| ShellError::Spawn {
      command: command.to_string(),
      source,
    };
    let mut child = process.spawn().map_err(spawn_err)?;

    let stderr = child.stderr.take();
    let program = command.program().to_string();
    let stderr_thread = thread::spawn(move || match stderr {
      Some(stderr) => for_each_line(stderr, |line| info!(program = %program, "{}", line)),
      None => Ok(()),
    });

    let mut stdout = String::new();
    let read = match child.stdout.take() {
      Some(out) => for_each_line(out, |line| {
        debug!(program = %command.program(), "{}", line);
        stdout.push_str(&line);
        stdout.push('\n');
      }),
      None => Ok(()),
    };
    // Reap the child and the reader before reporting any read error.
    let status = child.wait();
    if let Ok(Err(e)) = stderr_thread.join() {
      debug!(program = %command.program(), error = %e, "stopped reading stderr");
    }
    read.map_err(spawn_err)?;
    let status = status.map_err(spawn_err)?;

    if !status.success() {
      if must_succeed {
        return Err(ShellError::Failed {
          command: command.to_string(),
          code: status.code(),
        });
      }
      debug!(command = %command, code = ?status.code(), "command failed");
      return Ok(None);
    }

    Ok(Some(stdout.trim().to_string()))
  }

  fn command_exists(&self, program: &str) -> bool {
    find_executable(program).is_some()
  }
}

/// Call `f` with every line of `reader`, without the line ending.
fn for_each_line(reader: impl Read, mut f: impl FnMut(String)) -> io::Result<()> {
  let mut reader = BufReader::new(reader);
  let mut buf = Vec::new();
  loop {
    buf.clear();
    if reader.read_until(b'\n', &mut buf)? == 0 {
      return Ok(());
    }
    let line = String::from_utf8_lossy(&buf);
    f(line.trim_end_matches(['\n', '\r']).to_string());
  }
}

/// Locate `program` the way the OS would when spawning it.
pub fn find_executable(program: &str) -> Option<PathBuf> {
  let candidate = Path::new(program);
  if candidate.components().count() > 1 {
    return candidate.is_file().then(|| candidate.to_path_buf());
  }

  let path = std::env::var_os("PATH")?;
  std::env::split_paths(&path).find_map(|dir| {
    executable_names(program)
      .into_iter()
      .map(|name| dir.join(name))
      .find(|p| p.is_file())
  })
}

#[cfg(unix)]
fn executable_names(program: &str) -> Vec<String> {
  vec![program.to_string()]
}

#[cfg(windows)]
fn executable_names(program: &str) -> Vec<String> {
  ["", ".exe", ".bat", ".cmd"]
    .iter()
    .map(|ext| format!("{program}{ext}"))
    .collect()
}
