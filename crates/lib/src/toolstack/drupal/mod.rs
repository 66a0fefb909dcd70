//! Drupal applications.
//!
//! Three mutually exclusive build modes, checked in this order:
//!
//! - **profile**: the app root holds exactly one `*.profile` file. An
//!   optional contrib make file is resolved into a temporary directory that
//!   becomes `profiles/<name>`, an optional core make file is resolved into
//!   the web root, and the app's own files are placed recursively into the
//!   profile without touching what Drush produced.
//! - **project**: a make file is resolved into the web root and the app's
//!   top-level files are placed into `sites/default`.
//! - **vanilla**: the app is placed as-is.
//!
//! In profile and project mode a custom `settings.php` is copied into
//! `sites/default` even for symlink builds, since PHP would resolve its
//! includes relative to the source tree.

pub mod drush;
pub mod make;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use super::composer::composer_requires;
use super::{BuildContext, BuildPlan, BuildReport, Toolstack, ToolstackError, base};
use crate::placement::{IgnoreSet, SymlinkAllOptions};
use crate::resources::Resource;
use crate::settings::BuildSettings;

use drush::Drush;

const MAKE_FILE_IGNORES: &[&str] = &["*.make", "*.make.lock", "*.make.yml", "*.make.yml.lock", "settings.local.php"];

/// Composer packages that mark a Drupal project.
const DRUPAL_PACKAGES: &[&str] = &["drupal/core", "drupal/phing-drush-task"];

/// `index.php` of every Drupal release mentions Drupal within this many bytes.
const INDEX_SNIFF_LEN: usize = 3178;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildMode {
  Profile(String),
  Project(PathBuf),
  Vanilla,
}

/// Work out how the app at `app_root` is built.
pub fn build_mode(app_root: &Path, settings: &BuildSettings) -> Result<BuildMode, ToolstackError> {
  let regenerate_lock = settings.drush.lock;
  let project_make = make::find_make_file(app_root, regenerate_lock, false);

  let mut profiles = profile_files(app_root)?;
  if profiles.len() > 1 {
    return Err(ToolstackError::MultipleProfiles(app_root.to_path_buf()));
  }

  if regenerate_lock && project_make.is_none() {
    return Err(ToolstackError::MissingMakeFile {
      app_root: app_root.to_path_buf(),
      candidates: make::candidates(true, false).join(", "),
    });
  }

  if let Some(profile) = profiles.pop() {
    return Ok(BuildMode::Profile(profile));
  }
  Ok(match project_make {
    Some(make_file) => BuildMode::Project(make_file),
    None => BuildMode::Vanilla,
  })
}

/// Names of the `*.profile` files at the app root, without extensions.
fn profile_files(app_root: &Path) -> Result<Vec<String>, ToolstackError> {
  let entries = fs::read_dir(app_root).map_err(|source| ToolstackError::Io {
    path: app_root.to_path_buf(),
    source,
  })?;

  let mut profiles: Vec<String> = entries
    .filter_map(Result::ok)
    .filter(|entry| entry.path().is_file())
    .filter_map(|entry| {
      let name = entry.file_name().to_string_lossy().into_owned();
      name
        .ends_with(".profile")
        .then(|| name.split('.').next().unwrap_or_default().to_string())
    })
    .collect();
  profiles.sort();
  Ok(profiles)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Drupal;

impl Drupal {
  fn build_project(&self, plan: &BuildPlan, ctx: &BuildContext<'_>, make_file: &Path) -> Result<BuildPlan, ToolstackError> {
    let drush = Drush::ensure_installed(ctx)?;
    let web_root = plan.web_root();

    let mut args = vec![make_file.display().to_string(), web_root.display().to_string()];
    args.extend(drush::flags(ctx.settings));
    args.extend(lock_option(&drush, ctx.settings, make_file));
    drush.make(args, make_file)?;

    let plan = with_make_file_ignores(plan.clone())?;
    let plan = process_settings_php(plan, &web_root)?;
    let plan = plan.with_special_destination("sites.php", "{webroot}/sites");

    let excludes = plan.placement_excludes()?;
    plan.filesystem().symlink_all(
      plan.app_root(),
      &web_root.join("sites").join("default"),
      SymlinkAllOptions {
        skip_existing: true,
        recursive: false,
        exclude: &excludes,
        copy: plan.copy(),
      },
    )?;
    Ok(plan)
  }

  fn build_profile(&self, plan: &BuildPlan, ctx: &BuildContext<'_>, profile: &str) -> Result<BuildPlan, ToolstackError> {
    let regenerate_lock = ctx.settings.drush.lock;
    let project_make = make::find_make_file(plan.app_root(), regenerate_lock, false);
    let core_make = make::find_make_file(plan.app_root(), regenerate_lock, true);
    let drush = if project_make.is_some() || core_make.is_some() {
      Some(Drush::ensure_installed(ctx)?)
    } else {
      None
    };

    info!(profile, "Building profile");
    let fs = plan.filesystem();
    let web_root = plan.web_root();
    let profile_dir = web_root.join("profiles").join(profile);

    let mut temp_profile_dir = None;
    if let (Some(make_file), Some(drush)) = (&project_make, &drush) {
      let temp_dir = plan.build_dir().join(format!("tmp-{profile}"));
      fs.remove(&temp_dir)?;
      fs.mkdir(&temp_dir, 0o755)?;

      let mut args = vec![
        "--no-core".to_string(),
        "--contrib-destination=.".to_string(),
        make_file.display().to_string(),
        temp_dir.display().to_string(),
      ];
      args.extend(drush::flags(ctx.settings));
      args.extend(lock_option(drush, ctx.settings, make_file));
      drush.make(args, make_file)?;
      temp_profile_dir = Some(temp_dir);
    }

    if let (Some(core_make), Some(drush)) = (&core_make, &drush) {
      let mut args = vec![core_make.display().to_string(), web_root.display().to_string()];
      args.extend(drush::flags(ctx.settings));
      args.extend(lock_option(drush, ctx.settings, core_make));
      drush.make(args, core_make)?;
    }

    if let Some(temp_dir) = temp_profile_dir.filter(|dir| dir.is_dir()) {
      if let Some(parent) = profile_dir.parent() {
        fs.mkdir(parent, 0o755)?;
      }
      fs::rename(&temp_dir, &profile_dir).map_err(|source| ToolstackError::Io {
        path: profile_dir.clone(),
        source,
      })?;
    }

    if plan.copy() {
      info!("Copying existing app files to the profile");
    } else {
      info!("Symlinking existing app files to the profile");
    }

    let plan = with_make_file_ignores(plan.clone())?
      .with_special_destination("settings*.php", "{webroot}/sites/default")
      .with_special_destination("sites.php", "{webroot}/sites");
    let plan = process_settings_php(plan, &web_root)?;

    let excludes = plan.placement_excludes()?;
    fs.symlink_all(
      plan.app_root(),
      &profile_dir,
      SymlinkAllOptions {
        skip_existing: true,
        recursive: true,
        exclude: &excludes,
        copy: plan.copy(),
      },
    )?;
    Ok(plan)
  }

  /// An app-root `settings.php` is placed as-is here like every other file.
  fn build_vanilla(&self, plan: &BuildPlan, ctx: &BuildContext<'_>) -> Result<(), ToolstackError> {
    warn!("Building in vanilla mode: you are missing out!");
    base::copy_to_build_dir(plan)?;

    if !plan.copy() {
      base::copy_git_ignore(plan, ctx, Resource::DrupalGitignoreVanilla)?;
      base::check_ignored(plan, ctx, "sites/default/settings.local.php");
      base::check_ignored(plan, ctx, "sites/default/files");
    }
    Ok(())
  }
}

impl Toolstack for Drupal {
  fn key(&self) -> &'static str {
    "php:drupal"
  }

  fn name(&self) -> &'static str {
    "drupal"
  }

  /// Looks at the app root and its direct subdirectories for a make file,
  /// a Drupal `index.php`, or a `composer.json` requiring Drupal.
  fn detect(&self, app_root: &Path) -> bool {
    if !app_root.is_dir() {
      return false;
    }

    let files: Vec<PathBuf> = WalkDir::new(app_root)
      .max_depth(2)
      .sort_by_file_name()
      .into_iter()
      .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
      .filter_map(Result::ok)
      .filter(|e| e.file_type().is_file())
      .map(|e| e.into_path())
      .collect();

    let named = |path: &PathBuf| path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

    files.iter().any(|path| {
      let name = named(path);
      name.starts_with("project.make") || name.starts_with("drupal-org.make")
    }) || files
      .iter()
      .any(|path| named(path) == "index.php" && index_mentions_drupal(path))
      || files
        .iter()
        .any(|path| named(path) == "composer.json" && composer_requires(path, DRUPAL_PACKAGES))
  }

  fn build(&self, plan: &BuildPlan, ctx: &BuildContext<'_>) -> Result<BuildReport, ToolstackError> {
    let (plan, in_place) = match build_mode(plan.app_root(), ctx.settings)? {
      BuildMode::Profile(profile) => (self.build_profile(plan, ctx, &profile)?, false),
      BuildMode::Project(make_file) => (self.build_project(plan, ctx, &make_file)?, false),
      BuildMode::Vanilla => {
        self.build_vanilla(plan, ctx)?;
        (plan.clone(), true)
      }
    };

    base::process_special_destinations(&plan, in_place)?;
    Ok(BuildReport { in_place })
  }

  fn install(&self, plan: &BuildPlan, ctx: &BuildContext<'_>) -> Result<(), ToolstackError> {
    base::process_shared_file_mounts(plan)?;

    let web_root = plan.web_root();
    let sites_default = web_root.join("sites").join("default");
    let settings_php = sites_default.join("settings.php");
    if sites_default.is_dir() && !settings_php.exists() {
      let template = if web_root.join("core/includes/bootstrap.inc").exists() {
        Resource::DrupalSettings
      } else {
        Resource::DrupalSettingsLegacy
      };
      info!(path = %settings_php.display(), "Creating settings.php");
      ctx.resources.install(template, &settings_php)?;
    }

    base::install_drupal_settings_local(plan, ctx)?;

    if sites_default.is_dir() {
      let fs = plan.filesystem();
      fs.mkdir(&plan.shared_dir().join("files"), base::SHARED_DIR_MODE)?;

      // Dotfiles and the roots of mounts stay out of sites/default.
      let mut skip = IgnoreSet::with_defaults();
      for mount in plan.mounts() {
        if let Some(first) = mount.path.split('/').next() {
          skip.add(first)?;
        }
      }
      fs.symlink_all(
        plan.shared_dir(),
        &sites_default,
        SymlinkAllOptions {
          skip_existing: true,
          recursive: false,
          exclude: &skip,
          copy: false,
        },
      )?;
    }

    Ok(())
  }
}

fn with_make_file_ignores(plan: BuildPlan) -> Result<BuildPlan, ToolstackError> {
  MAKE_FILE_IGNORES
    .iter()
    .try_fold(plan, |plan, pattern| plan.with_ignored(pattern))
}

/// Copy a custom `settings.php` into `sites/default` for symlink builds and
/// keep it out of the regular placement.
fn process_settings_php(plan: BuildPlan, web_root: &Path) -> Result<BuildPlan, ToolstackError> {
  if plan.copy() {
    return Ok(plan);
  }
  let settings_php = plan.app_root().join("settings.php");
  if !settings_php.exists() {
    return Ok(plan);
  }

  info!(path = %settings_php.display(), "Found a custom settings.php file");
  let destination = web_root.join("sites").join("default").join("settings.php");
  plan.filesystem().copy(&settings_php, &destination)?;
  info!("Your settings.php file has been copied (not symlinked) into the build directory. You will need to rebuild if you edit this file.");

  plan.with_ignored("/settings.php")
}

fn lock_option(drush: &Drush<'_>, settings: &BuildSettings, make_file: &Path) -> Option<String> {
  if settings.drush.lock && drush.supports_make_lock() {
    make::lock_option(make_file)
  } else {
    None
  }
}

fn index_mentions_drupal(path: &Path) -> bool {
  use std::io::Read;

  let Ok(file) = fs::File::open(path) else {
    return false;
  };
  let mut beginning = Vec::with_capacity(INDEX_SNIFF_LEN);
  if file.take(INDEX_SNIFF_LEN as u64).read_to_end(&mut beginning).is_err() {
    return false;
  }
  String::from_utf8_lossy(&beginning).contains("Drupal")
}
