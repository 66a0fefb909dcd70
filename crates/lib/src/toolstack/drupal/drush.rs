//! Drush, invoked as an external tool.

use std::path::Path;

use semver::Version;
use tracing::{debug, info};

use crate::settings::{BuildSettings, Verbosity};
use crate::shell::{Shell, ShellCommand, ShellError};
use crate::toolstack::{BuildContext, ToolstackError};

/// Oldest Drush that can run make files.
pub const MIN_MAJOR_VERSION: u64 = 6;

/// First major version whose `make` accepts `--lock`.
const MAKE_LOCK_MAJOR_VERSION: u64 = 7;

const TOOL: &str = "drush";

pub struct Drush<'a> {
  executable: &'a str,
  shell: &'a dyn Shell,
  version: Version,
}

impl<'a> Drush<'a> {
  /// Find the installed Drush and check that it is recent enough.
  pub fn ensure_installed(ctx: &BuildContext<'a>) -> Result<Self, ToolstackError> {
    let config = ctx.config;
    let executable = config.drush_executable.as_str();
    let not_installed = || ToolstackError::ToolNotInstalled {
      tool: TOOL,
      executable: executable.to_string(),
    };

    let command = ShellCommand::new(executable).args(["version", "--format=string"]);
    let output = match ctx.shell.execute(&command, false) {
      Ok(Some(output)) => output,
      Ok(None) | Err(ShellError::Spawn { .. }) => return Err(not_installed()),
      Err(e) => return Err(e.into()),
    };

    let version = parse_version(&output).ok_or_else(|| ToolstackError::UnknownToolVersion {
      tool: TOOL,
      output: output.clone(),
    })?;
    if version.major < MIN_MAJOR_VERSION {
      return Err(ToolstackError::ToolTooOld {
        tool: TOOL,
        found: version.to_string(),
        required: format!("{MIN_MAJOR_VERSION}.0.0"),
      });
    }

    debug!(version = %version, "found drush");
    Ok(Self {
      executable,
      shell: ctx.shell,
      version,
    })
  }

  pub fn version(&self) -> &Version {
    &self.version
  }

  pub fn supports_make_lock(&self) -> bool {
    self.version.major >= MAKE_LOCK_MAJOR_VERSION
  }

  /// Run `drush make` with `args` in the make file's directory.
  ///
  /// Drush resolves relative `copy` download URLs against the working
  /// directory, not the make file.
  pub fn make(&self, args: Vec<String>, make_file: &Path) -> Result<(), ToolstackError> {
    let mut command = ShellCommand::new(self.executable).arg("make").args(args);
    if let Some(dir) = make_file.parent() {
      command = command.current_dir(dir);
    }
    info!(make_file = %make_file.display(), "Running drush make");
    self.shell.execute(&command, true)?;
    Ok(())
  }
}

/// Flags passed to every `drush make` run.
pub fn flags(settings: &BuildSettings) -> Vec<String> {
  let mut flags = vec!["--yes".to_string()];

  match settings.verbosity {
    Verbosity::Quiet => flags.push("--quiet".to_string()),
    Verbosity::Debug => flags.push("--debug".to_string()),
    Verbosity::VeryVerbose => flags.push("--verbose".to_string()),
    Verbosity::Normal | Verbosity::Verbose => {}
  }

  if settings.drush.working_copy {
    flags.push("--working-copy".to_string());
  }

  if settings.no_cache {
    flags.push("--no-cache".to_string());
  } else {
    flags.push("--cache-duration-releasexml=300".to_string());
  }

  if let Some(concurrency) = settings.drush.concurrency {
    flags.push(format!("--concurrency={concurrency}"));
  }

  flags
}

/// Pull a version out of `drush version` output.
///
/// Accepts bare versions (`8.1.15`) as well as labelled ones
/// (`Drush Version : 8.1.15`), and pads short versions like `10.3`.
pub fn parse_version(output: &str) -> Option<Version> {
  output
    .split_whitespace()
    .map(|token| token.trim_start_matches('v'))
    .filter(|token| token.starts_with(|c: char| c.is_ascii_digit()))
    .find_map(|token| {
      let (numbers, pre) = match token.split_once('-') {
        Some((numbers, pre)) => (numbers, Some(pre)),
        None => (token, None),
      };
      let mut parts: Vec<&str> = numbers.split('.').filter(|p| !p.is_empty()).collect();
      if parts.len() > 3 || parts.iter().any(|p| !p.chars().all(|c| c.is_ascii_digit())) {
        return None;
      }
      while parts.len() < 3 {
        parts.push("0");
      }
      let normalized = match pre {
        Some(pre) => format!("{}-{}", parts.join("."), pre),
        None => parts.join("."),
      };
      Version::parse(&normalized).ok()
    })
}
