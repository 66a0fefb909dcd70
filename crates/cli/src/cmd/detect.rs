use std::path::Path;

use anyhow::{Context, Result};

use webbuild_lib::app::ApplicationFinder;
use webbuild_lib::build::LocalBuild;
use webbuild_lib::config::LocalConfig;

/// Print the toolstack key of every application below `app_root`.
///
/// A single application prints the bare key; several print one
/// `<id>: <key>` line each.
pub fn cmd_detect(app_root: &Path) -> Result<bool> {
  let root = dunce::canonicalize(app_root)
    .with_context(|| format!("Directory not found: {}", app_root.display()))?;
  let config = LocalConfig::load(&root).context("Failed to load project configuration")?;
  let apps = ApplicationFinder::new(&config)
    .find(&root)
    .context("Failed to find applications")?;

  let build = LocalBuild::new(config);
  for app in &apps {
    let toolstack = build.toolstack_for(app)?;
    if app.is_single() {
      println!("{}", toolstack.key());
    } else {
      println!("{}: {}", app.id(), toolstack.key());
    }
  }

  Ok(true)
}
