//! The local build orchestrator.
//!
//! [`LocalBuild`] turns a project source tree into servable builds:
//!
//! 1. Take the project's build lock and add the build layout to the git
//!    exclude file.
//! 2. Find the applications in the tree and, for each one, pick a toolstack,
//!    create a fresh build directory and drive the toolstack through
//!    prepare, build and install. Unchanged sources are restored from the
//!    archive cache instead of being rebuilt.
//! 3. Write a marker into the build and switch the application's web root
//!    link to it in one rename.
//! 4. Clean up old builds and unused archives.
//!
//! Builds run one application at a time and block on every external tool.

pub mod marker;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::app::{AppError, ApplicationFinder, LocalApplication, sanitize};
use crate::archive::{ArchiveError, archive_path, clean_archives, extract_archive, save_archive, tree_id};
use crate::config::LocalConfig;
use crate::hooks::run_build_hook;
use crate::lock::{BuildLock, LockError};
use crate::placement::{FsError, is_symlink};
use crate::resources::Resources;
use crate::retention::{CleanStats, RetentionError, RetentionPolicy, clean_builds};
use crate::settings::BuildSettings;
use crate::shell::{Shell, ShellError, SystemShell};
use crate::toolstack::{BuildContext, PrepareRequest, Selector, Toolstack, ToolstackError};
use crate::vcs::{GitCli, VcsIgnore, write_git_exclude};

use marker::{BuildMarker, MarkerError, write_marker};

#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Lock(#[from] LockError),

  #[error(transparent)]
  App(#[from] AppError),

  #[error("no toolstack found for application '{app}'")]
  NoToolstack { app: String },

  #[error("unknown build flavor '{flavor}' for application '{app}'")]
  UnknownToolstack { app: String, flavor: String },

  #[error("failed to build application '{app}': {source}")]
  Toolstack {
    app: String,
    #[source]
    source: ToolstackError,
  },

  #[error("build hook could not be run: {0}")]
  Hook(#[from] ShellError),

  #[error(transparent)]
  Archive(#[from] ArchiveError),

  #[error(transparent)]
  Marker(#[from] MarkerError),

  #[error(transparent)]
  Fs(#[from] FsError),

  #[error(transparent)]
  Retention(#[from] RetentionError),

  #[error("web root not found: {0}")]
  MissingWebRoot(PathBuf),

  #[error("failed to access {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// The result of building one application.
#[derive(Debug, Clone, Serialize)]
pub struct AppBuild {
  pub app: String,
  pub toolstack: String,
  pub build_dir: PathBuf,
  /// The published link pointing at the build's web root.
  pub web_root: PathBuf,
  /// The build was unpacked from the archive cache.
  pub restored: bool,
  /// The build was stored in the archive cache.
  pub archived: bool,
  pub success: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct BuildOutcome {
  pub apps: Vec<AppBuild>,
  /// Requested application ids that do not exist in the project.
  pub not_found: Vec<String>,
  pub clean: Option<CleanOutcome>,
}

impl BuildOutcome {
  /// Whether every application built and every hook succeeded.
  pub fn success(&self) -> bool {
    self.apps.iter().all(|app| app.success)
  }
}

#[derive(Debug, Default, Serialize)]
pub struct CleanOutcome {
  pub builds: CleanStats,
  pub archives_deleted: usize,
}

pub struct LocalBuild {
  config: LocalConfig,
  selector: Selector,
  shell: Box<dyn Shell>,
  vcs: Box<dyn VcsIgnore>,
  resources: Resources,
}

impl LocalBuild {
  pub fn new(config: LocalConfig) -> Self {
    let resources = Resources::new(config.resources_dir.clone());
    Self {
      config,
      selector: Selector::default(),
      shell: Box::new(SystemShell),
      vcs: Box::new(GitCli::default()),
      resources,
    }
  }

  pub fn with_shell(mut self, shell: impl Shell + 'static) -> Self {
    self.shell = Box::new(shell);
    self
  }

  pub fn with_vcs(mut self, vcs: impl VcsIgnore + 'static) -> Self {
    self.vcs = Box::new(vcs);
    self
  }

  pub fn with_selector(mut self, selector: Selector) -> Self {
    self.selector = selector;
    self
  }

  pub fn with_resources(mut self, resources: Resources) -> Self {
    self.resources = resources;
    self
  }

  pub fn config(&self) -> &LocalConfig {
    &self.config
  }

  /// Build the applications in `source_dir`.
  ///
  /// Web roots are published below `destination`, by default the project's
  /// configured web root. An empty `apps` builds every application.
  pub fn build(
    &self,
    source_dir: &Path,
    destination: Option<&Path>,
    settings: &BuildSettings,
    apps: &[String],
  ) -> Result<BuildOutcome, BuildError> {
    let source_dir = dunce::canonicalize(source_dir).map_err(|source| BuildError::Io {
      path: source_dir.to_path_buf(),
      source,
    })?;
    let _lock = BuildLock::acquire(&self.config.builds_path(&source_dir), "build")?;

    if let Err(e) = write_git_exclude(&source_dir, &self.config.layout_ignores()) {
      warn!(error = %e, "failed to update git exclude file");
    }

    let destination = match destination {
      Some(path) => std::path::absolute(path).map_err(|source| BuildError::Io {
        path: path.to_path_buf(),
        source,
      })?,
      None => self.config.web_root_path(&source_dir),
    };

    let found = ApplicationFinder::new(&self.config).find(&source_dir)?;
    let mut outcome = BuildOutcome::default();
    for app in &found {
      if !apps.is_empty() && !apps.contains(&app.id()) {
        continue;
      }
      outcome.apps.push(self.build_app(app, &source_dir, &destination, settings)?);
    }

    for requested in apps {
      if !found.iter().any(|app| &app.id() == requested) {
        warn!(app = %requested, "Application not found");
        outcome.not_found.push(requested.clone());
      }
    }

    if !settings.no_clean {
      info!("Cleaning up");
      outcome.clean = Some(self.clean_unlocked(&source_dir, &RetentionPolicy::from_config(&self.config), true)?);
    }

    Ok(outcome)
  }

  /// Delete old builds, and unused archives when `archives` is set.
  pub fn clean(&self, project_root: &Path, policy: &RetentionPolicy, archives: bool) -> Result<CleanOutcome, BuildError> {
    let builds_dir = self.config.builds_path(project_root);
    if !builds_dir.is_dir() {
      debug!(path = %builds_dir.display(), "no builds to clean");
      let archives_deleted = if archives {
        clean_archives(project_root, &self.config)?
      } else {
        0
      };
      return Ok(CleanOutcome {
        archives_deleted,
        ..Default::default()
      });
    }

    let _lock = BuildLock::acquire(&builds_dir, "clean")?;
    self.clean_unlocked(project_root, policy, archives)
  }

  /// The toolstack for an application: its configured build flavor, else
  /// detection.
  pub fn toolstack_for(&self, app: &LocalApplication) -> Result<&dyn Toolstack, BuildError> {
    match app.flavor() {
      Some(flavor) => self.selector.by_name(flavor).ok_or_else(|| BuildError::UnknownToolstack {
        app: app.id(),
        flavor: flavor.to_string(),
      }),
      None => self
        .selector
        .pick(app.root())
        .ok_or_else(|| BuildError::NoToolstack { app: app.id() }),
    }
  }

  fn clean_unlocked(&self, project_root: &Path, policy: &RetentionPolicy, archives: bool) -> Result<CleanOutcome, BuildError> {
    let builds = clean_builds(project_root, &self.config, policy)?;
    let archives_deleted = if archives {
      clean_archives(project_root, &self.config)?
    } else {
      0
    };
    Ok(CleanOutcome {
      builds,
      archives_deleted,
    })
  }

  fn build_app(
    &self,
    app: &LocalApplication,
    source_dir: &Path,
    destination: &Path,
    settings: &BuildSettings,
  ) -> Result<AppBuild, BuildError> {
    let id = app.id();
    let toolstack = self.toolstack_for(app)?;
    let toolstack_err = |source| BuildError::Toolstack { app: id.clone(), source };

    let build_dir = self.create_build_dir(source_dir, app, settings)?;
    let document_root = app.document_root(settings.document_root.as_deref());
    let shared_dir = app.shared_dir(&self.config.shared_path(source_dir));
    let mounts = app.shared_file_mounts();
    let extra_ignored: Vec<String> = destination_ignore(app.root(), destination).into_iter().collect();

    let plan = toolstack
      .prepare(&PrepareRequest {
        app_root: app.root(),
        build_dir: &build_dir,
        document_root: &document_root,
        move_to_root: app.should_move_to_root(&document_root),
        shared_dir: &shared_dir,
        mounts: &mounts,
        settings,
        config: &self.config,
        extra_ignored: &extra_ignored,
      })
      .map_err(toolstack_err)?;
    let ctx = BuildContext {
      settings,
      config: &self.config,
      shell: self.shell.as_ref(),
      vcs: self.vcs.as_ref(),
      resources: &self.resources,
    };

    let archive = if settings.use_archives() {
      let tree_id = tree_id(app.root(), plan.ignored(), settings, toolstack.key())?;
      debug!(app = %id, tree_id = %tree_id, "computed tree id");
      let path = archive_path(source_dir, &self.config, &tree_id);
      Some((tree_id, path))
    } else {
      None
    };

    let mut success = true;
    let mut restored = false;
    let mut archived = false;
    match &archive {
      Some((_, path)) if path.is_file() => {
        info!(app = %id, "Extracting archive for application");
        extract_archive(path, &build_dir)?;
        restored = true;
      }
      _ => {
        info!(app = %id, toolstack = toolstack.key(), build_dir = %build_dir.display(), "Building application");
        let report = toolstack.build(&plan, &ctx).map_err(toolstack_err)?;
        let mut can_archive = toolstack.can_archive(&plan, &report);

        if let Some(hook) = app.build_hook() {
          if settings.no_build_hooks {
            info!("Skipping post-build hooks");
          } else if !run_build_hook(hook, &plan.placement_root(), ctx.shell)? {
            success = false;
            can_archive = false;
          }
        }

        if let Some((_, path)) = &archive
          && can_archive
        {
          save_archive(&build_dir, path)?;
          archived = true;
        }
      }
    }

    toolstack.install(&plan, &ctx).map_err(toolstack_err)?;

    let tree_id = archive.map(|(tree_id, _)| tree_id).filter(|_| restored || archived);
    write_marker(
      &build_dir,
      &BuildMarker::new(id.clone(), toolstack.key(), tree_id, &settings.environment_id),
    )?;

    let web_root = toolstack.web_root(&plan);
    if !web_root.is_dir() {
      return Err(BuildError::MissingWebRoot(web_root));
    }
    let local_web_root = app.local_web_root(destination);
    plan.filesystem().replace_link(&web_root, &local_web_root)?;
    info!(app = %id, web_root = %local_web_root.display(), "Build complete for application");

    Ok(AppBuild {
      app: id,
      toolstack: toolstack.key().to_string(),
      build_dir,
      web_root: local_web_root,
      restored,
      archived,
      success,
    })
  }

  /// Create `<builds>/<timestamp>--<environment>[--<app>]`, adding `-2`,
  /// `-3`, ... when a build of the same second exists.
  fn create_build_dir(
    &self,
    source_dir: &Path,
    app: &LocalApplication,
    settings: &BuildSettings,
  ) -> Result<PathBuf, BuildError> {
    let builds_dir = self.config.builds_path(source_dir);
    let mut name = format!(
      "{}--{}",
      Local::now().format("%Y-%m-%d--%H-%M-%S"),
      sanitize(&settings.environment_id)
    );
    if !app.is_single() {
      name.push_str("--");
      name.push_str(&sanitize(&app.id()));
    }

    let build_dir = unique_path(&builds_dir, &name);
    fs::create_dir_all(&build_dir).map_err(|source| BuildError::Io {
      path: build_dir.clone(),
      source,
    })?;
    debug!(path = %build_dir.display(), "created build directory");
    Ok(build_dir)
  }
}

fn unique_path(dir: &Path, name: &str) -> PathBuf {
  let mut candidate = dir.join(name);
  let mut n = 1;
  while candidate.exists() || is_symlink(&candidate) {
    n += 1;
    candidate = dir.join(format!("{name}-{n}"));
  }
  candidate
}

/// An anchored ignore pattern for a destination inside the application, so
/// that builds are never placed into themselves.
fn destination_ignore(app_root: &Path, destination: &Path) -> Option<String> {
  let relative = destination.strip_prefix(app_root).ok()?;
  let relative = relative.to_string_lossy().replace('\\', "/");
  let relative = relative.trim_matches('/');
  (!relative.is_empty()).then(|| format!("/{relative}"))
}
