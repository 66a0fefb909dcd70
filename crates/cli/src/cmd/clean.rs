//! Implementation of the `webbuild clean` command.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use webbuild_lib::build::LocalBuild;
use webbuild_lib::config::LocalConfig;
use webbuild_lib::retention::RetentionPolicy;

use crate::output::{OutputFormat, format_duration, print_stat, print_success};

/// Delete old builds of a project.
///
/// Unset options fall back to the project's configuration.
pub fn cmd_clean(
  project: &Path,
  max_age: Option<Duration>,
  keep: Option<usize>,
  include_active: bool,
  archives: bool,
  output: OutputFormat,
) -> Result<bool> {
  let start = Instant::now();

  let project = dunce::canonicalize(project)
    .with_context(|| format!("Project directory not found: {}", project.display()))?;
  let config = LocalConfig::load(&project).context("Failed to load project configuration")?;

  let defaults = RetentionPolicy::from_config(&config);
  let policy = RetentionPolicy {
    max_age: max_age.or(defaults.max_age),
    keep: keep.unwrap_or(defaults.keep),
    include_active,
  };

  let outcome = LocalBuild::new(config)
    .clean(&project, &policy, archives)
    .context("Clean failed")?;

  output.report(&outcome, |outcome| {
    println!();
    print_success("Clean complete!");
    print_stat("Builds removed", &outcome.builds.deleted.to_string());
    print_stat("Builds kept", &outcome.builds.kept.to_string());
    if archives {
      print_stat("Archives removed", &outcome.archives_deleted.to_string());
    }
    print_stat("Duration", &format_duration(start.elapsed()));
  })?;

  Ok(true)
}
