//! Toolstacks: the strategies that turn an application tree into a build.
//!
//! Every toolstack goes through the same three phases for one build attempt:
//!
//! 1. [`Toolstack::prepare`] resolves paths and rules into an immutable
//!    [`BuildPlan`]. No filesystem writes happen here.
//! 2. [`Toolstack::build`] materialises the application in the build
//!    directory, either by placing the tree as-is or by running a dependency
//!    manager, and always finishes with special destinations.
//! 3. [`Toolstack::install`] wires in state that lives outside the build:
//!    shared file mounts, default config files and local overrides.
//!
//! Toolstacks themselves hold no state. Everything a phase learns that a
//! later phase needs travels in the plan or in the returned [`BuildReport`].

pub mod base;
pub mod composer;
pub mod drupal;
pub mod nodejs;
pub mod none;
pub mod plan;
pub mod selector;
pub mod symfony;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::LocalConfig;
use crate::placeholder::PlaceholderError;
use crate::placement::FsError;
use crate::resources::{ResourceError, Resources};
use crate::settings::BuildSettings;
use crate::shell::{Shell, ShellError};
use crate::vcs::VcsIgnore;

pub use composer::Composer;
pub use drupal::Drupal;
pub use nodejs::NodeJs;
pub use none::NoToolstack;
pub use plan::{BuildPlan, PrepareRequest};
pub use selector::Selector;
pub use symfony::Symfony;

#[derive(Debug, Error)]
pub enum ToolstackError {
  #[error("found multiple files ending in '*.profile' in {0}")]
  MultipleProfiles(PathBuf),

  #[error("couldn't find a make file in {app_root}; possible filenames: {candidates}")]
  MissingMakeFile { app_root: PathBuf, candidates: String },

  #[error("{tool} is not installed (looked for '{executable}')")]
  ToolNotInstalled { tool: &'static str, executable: String },

  #[error("{tool} {found} is too old; version {required} or later is required")]
  ToolTooOld {
    tool: &'static str,
    found: String,
    required: String,
  },

  #[error("could not determine the {tool} version from '{output}'")]
  UnknownToolVersion { tool: &'static str, output: String },

  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Fs(#[from] FsError),

  #[error(transparent)]
  Shell(#[from] ShellError),

  #[error(transparent)]
  Resource(#[from] ResourceError),

  #[error("invalid ignore pattern: {0}")]
  Pattern(#[from] glob::PatternError),

  #[error(transparent)]
  Template(#[from] PlaceholderError),
}

/// Services available to the build and install phases.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
  pub settings: &'a BuildSettings,
  pub config: &'a LocalConfig,
  pub shell: &'a dyn Shell,
  pub vcs: &'a dyn VcsIgnore,
  pub resources: &'a Resources,
}

impl fmt::Debug for BuildContext<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BuildContext")
      .field("settings", self.settings)
      .field("config", self.config)
      .finish_non_exhaustive()
  }
}

/// What the build phase did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
  /// The application was placed as-is instead of being built by a tool.
  pub in_place: bool,
}

pub trait Toolstack: fmt::Debug + Send + Sync {
  /// Stable identifier, e.g. `php:drupal`.
  fn key(&self) -> &'static str;

  /// Short name accepted for explicit selection, e.g. `drupal`.
  fn name(&self) -> &'static str;

  /// Whether this toolstack recognises the tree at `app_root`.
  fn detect(&self, app_root: &Path) -> bool;

  fn prepare(&self, request: &PrepareRequest<'_>) -> Result<BuildPlan, ToolstackError> {
    BuildPlan::new(request)
  }

  fn build(&self, plan: &BuildPlan, ctx: &BuildContext<'_>) -> Result<BuildReport, ToolstackError>;

  fn install(&self, plan: &BuildPlan, ctx: &BuildContext<'_>) -> Result<(), ToolstackError> {
    let _ = ctx;
    base::process_shared_file_mounts(plan)
  }

  /// A tree of links back into the mutable source cannot be archived and
  /// restored later.
  fn can_archive(&self, plan: &BuildPlan, report: &BuildReport) -> bool {
    !report.in_place || plan.copy()
  }

  fn web_root(&self, plan: &BuildPlan) -> PathBuf {
    plan.web_root()
  }
}
