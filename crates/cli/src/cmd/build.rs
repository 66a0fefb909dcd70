//! Implementation of the `webbuild build` command.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use webbuild_lib::build::{BuildOutcome, LocalBuild};
use webbuild_lib::config::LocalConfig;
use webbuild_lib::settings::{BuildSettings, DrushSettings, Verbosity};

use crate::output::{
  OutputFormat, format_duration, print_info, print_stat, print_success, print_warning,
};

pub struct BuildArgs {
  pub source: PathBuf,
  pub destination: Option<PathBuf>,
  pub copy: bool,
  pub abslinks: bool,
  pub no_clean: bool,
  pub no_archive: bool,
  pub no_cache: bool,
  pub no_build_hooks: bool,
  pub environment_id: Option<String>,
  pub document_root: Option<PathBuf>,
  pub concurrency: Option<u32>,
  pub working_copy: bool,
  pub lock: bool,
  pub apps: Vec<String>,
  pub verbosity: Verbosity,
  pub output: OutputFormat,
}

impl BuildArgs {
  fn settings(&self) -> BuildSettings {
    let defaults = BuildSettings::default();
    BuildSettings {
      document_root: self.document_root.clone(),
      copy: self.copy,
      absolute_links: self.abslinks,
      no_clean: self.no_clean,
      no_archive: self.no_archive,
      no_cache: self.no_cache,
      no_build_hooks: self.no_build_hooks,
      environment_id: self.environment_id.clone().unwrap_or(defaults.environment_id),
      verbosity: self.verbosity,
      drush: DrushSettings {
        concurrency: self.concurrency,
        working_copy: self.working_copy,
        lock: self.lock,
      },
    }
  }
}

/// Build a project and publish its web roots.
///
/// Returns `false` when an application or its build hook failed, or a
/// requested application does not exist.
pub fn cmd_build(args: BuildArgs) -> Result<bool> {
  let start = Instant::now();

  let source = dunce::canonicalize(&args.source)
    .with_context(|| format!("Source directory not found: {}", args.source.display()))?;
  let config = LocalConfig::load(&source).context("Failed to load project configuration")?;
  let settings = args.settings();
  debug!(?settings, source = %source.display(), "build settings");

  let outcome = LocalBuild::new(config)
    .build(&source, args.destination.as_deref(), &settings, &args.apps)
    .context("Build failed")?;
  let success = outcome.success() && outcome.not_found.is_empty();

  args.output.report(&outcome, |outcome| {
    print_outcome(outcome);
    print_stat("Duration", &format_duration(start.elapsed()));
  })?;

  Ok(success)
}

fn print_outcome(outcome: &BuildOutcome) {
  for app in &outcome.apps {
    println!();
    if app.success {
      print_success(&format!("Built application '{}'", app.app));
    } else {
      print_warning(&format!("Application '{}' built with a failing hook", app.app));
    }
    print_stat("Toolstack", &app.toolstack);
    print_stat("Build", &app.build_dir.display().to_string());
    print_stat("Web root", &app.web_root.display().to_string());
    if app.restored {
      print_stat("Source", "restored from archive");
    } else if app.archived {
      print_stat("Archive", "saved");
    }
  }

  for missing in &outcome.not_found {
    print_warning(&format!("Application not found: {missing}"));
  }

  if let Some(clean) = &outcome.clean {
    println!();
    print_info(&format!(
      "Cleaned {} old build(s), {} archive(s)",
      clean.builds.deleted, clean.archives_deleted
    ));
  }
}
