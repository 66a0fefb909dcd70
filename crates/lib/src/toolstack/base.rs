//! Steps shared by several toolstacks.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{BuildContext, BuildPlan, ToolstackError};
use crate::placement::{SymlinkAllOptions, is_symlink, passes_through_link};
use crate::resources::Resource;

/// Mode for directories that hold state shared between builds.
pub const SHARED_DIR_MODE: u32 = 0o775;

/// Place the application tree into the build and return where it went.
///
/// Copy mode copies the whole tree. Symlink mode links each top-level entry,
/// so the build directory itself stays a real directory that tools and mounts
/// can write into.
pub fn copy_to_build_dir(plan: &BuildPlan) -> Result<PathBuf, ToolstackError> {
  let fs = plan.filesystem();
  let destination = plan.placement_root();

  if plan.copy() {
    info!(
      source = %plan.app_root().display(),
      destination = %destination.display(),
      "Copying application files"
    );
    fs.copy_all(plan.app_root(), &destination, plan.ignored())?;
  } else {
    info!(
      source = %plan.app_root().display(),
      destination = %destination.display(),
      "Symlinking application files"
    );
    fs.symlink_all(
      plan.app_root(),
      &destination,
      SymlinkAllOptions {
        skip_existing: true,
        recursive: false,
        exclude: plan.ignored(),
        copy: false,
      },
    )?;
  }

  Ok(destination)
}

/// Fail unless `executable` can be run.
pub fn require_tool(ctx: &BuildContext<'_>, tool: &'static str, executable: &str) -> Result<(), ToolstackError> {
  if ctx.shell.command_exists(executable) {
    Ok(())
  } else {
    Err(ToolstackError::ToolNotInstalled {
      tool,
      executable: executable.to_string(),
    })
  }
}

pub fn process_special_destinations(plan: &BuildPlan, in_place: bool) -> Result<usize, ToolstackError> {
  let fs = plan.filesystem();
  let placed = plan
    .special_destinations()
    .apply(&plan.special_context(&fs, in_place))?;
  debug!(placed, "processed special destinations");
  Ok(placed)
}

pub fn ensure_shared_dir(plan: &BuildPlan) -> Result<(), ToolstackError> {
  plan.filesystem().mkdir(plan.shared_dir(), SHARED_DIR_MODE)?;
  Ok(())
}

/// Link every local mount of the application into the shared directory.
///
/// Mounts reached through a linked entry are skipped, so that nothing is
/// created inside the source tree.
pub fn process_shared_file_mounts(plan: &BuildPlan) -> Result<(), ToolstackError> {
  ensure_shared_dir(plan)?;

  let build_dir = plan.build_dir();
  if is_symlink(build_dir) || plan.mounts().is_empty() {
    return Ok(());
  }

  let fs = plan.filesystem();
  info!("Creating symbolic links to mimic shared file mounts");
  for mount in plan.mounts() {
    let link = build_dir.join(&mount.path);
    if passes_through_link(build_dir, &link) {
      warn!(mount = %mount.path, "mount path is inside a linked entry, skipping");
      continue;
    }

    let target = plan.shared_dir().join(&mount.source_path);
    if link.exists() && !is_symlink(&link) {
      info!(path = %mount.path, "Removing existing file");
      fs.remove(&link)?;
    }
    fs.mkdir(&target, SHARED_DIR_MODE)?;

    info!(mount = %mount.path, target = %target.display(), "Symlinking mount");
    fs.symlink(&target, &link)?;
  }

  Ok(())
}

/// Give the build's `sites/default` a `settings.local.php` kept in the
/// shared directory.
///
/// The shared copy is created from the bundled template only when it does
/// not exist yet, so local edits survive every rebuild.
pub fn install_drupal_settings_local(plan: &BuildPlan, ctx: &BuildContext<'_>) -> Result<(), ToolstackError> {
  let sites_default = plan.web_root().join("sites").join("default");
  let settings_local = sites_default.join("settings.local.php");
  if !sites_default.is_dir() || settings_local.exists() {
    return Ok(());
  }

  ensure_shared_dir(plan)?;
  let shared_settings_local = plan.shared_dir().join("settings.local.php");
  if shared_settings_local.exists() {
    info!(path = %shared_settings_local.display(), "Symlinking settings.local.php into sites/default");
  } else {
    info!(path = %shared_settings_local.display(), "Creating file");
    ctx
      .resources
      .install(Resource::DrupalSettingsLocal, &shared_settings_local)?;
    info!("Edit this file to add your database credentials and other Drupal configuration.");
  }

  plan.filesystem().symlink(&shared_settings_local, &settings_local)?;
  Ok(())
}

/// Write a default `.gitignore` into an application that lives in a
/// repository without one.
pub fn copy_git_ignore(plan: &BuildPlan, ctx: &BuildContext<'_>, resource: Resource) -> Result<(), ToolstackError> {
  let Some(repo_root) = ctx.vcs.root(plan.app_root()) else {
    return Ok(());
  };
  let app_gitignore = plan.app_root().join(".gitignore");
  if app_gitignore.exists() || repo_root.join(".gitignore").exists() {
    return Ok(());
  }

  info!(path = %app_gitignore.display(), "Creating a .gitignore file");
  ctx.resources.install(resource, &app_gitignore)?;
  Ok(())
}

/// Warn when an application file that should stay out of version control is
/// not ignored.
pub fn check_ignored(plan: &BuildPlan, ctx: &BuildContext<'_>, relative: &str) {
  let Some(repo_root) = ctx.vcs.root(plan.app_root()) else {
    return;
  };
  let path = plan.app_root().join(relative);
  if !ctx.vcs.is_ignored(&path) {
    let suggestion = path.strip_prefix(&repo_root).unwrap_or(&path);
    warn!(path = %suggestion.display(), "You should exclude this file using .gitignore");
  }
}
