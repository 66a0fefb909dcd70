//! PHP applications managed by Composer.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use super::{BuildContext, BuildPlan, BuildReport, PrepareRequest, Toolstack, ToolstackError, base};
use crate::shell::ShellCommand;

pub const COMPOSER_JSON: &str = "composer.json";

const INSTALL_ARGS: &[&str] = &[
  "install",
  "--no-progress",
  "--prefer-dist",
  "--optimize-autoloader",
  "--no-interaction",
  "--no-ansi",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct Composer;

impl Toolstack for Composer {
  fn key(&self) -> &'static str {
    "php:composer"
  }

  fn name(&self) -> &'static str {
    "composer"
  }

  fn detect(&self, app_root: &Path) -> bool {
    app_root.join(COMPOSER_JSON).is_file()
  }

  fn prepare(&self, request: &PrepareRequest<'_>) -> Result<BuildPlan, ToolstackError> {
    BuildPlan::new(request)?.with_ignored("/vendor")
  }

  fn build(&self, plan: &BuildPlan, ctx: &BuildContext<'_>) -> Result<BuildReport, ToolstackError> {
    run_composer_build(plan, ctx, &[], &[])
  }
}

/// Place the application, then install its dependencies next to it.
///
/// The application files are placed as they are, so the build only archives
/// in copy mode.
pub(crate) fn run_composer_build(
  plan: &BuildPlan,
  ctx: &BuildContext<'_>,
  extra_args: &[&str],
  env: &[(&str, &str)],
) -> Result<BuildReport, ToolstackError> {
  let executable = ctx.config.composer_executable.as_str();
  base::require_tool(ctx, "composer", executable)?;

  let root = base::copy_to_build_dir(plan)?;
  if root.join(COMPOSER_JSON).exists() {
    let mut command = ShellCommand::new(executable)
      .args(INSTALL_ARGS.iter().copied())
      .args(extra_args.iter().copied())
      .current_dir(&root);
    if ctx.settings.no_cache {
      command = command.arg("--no-cache");
    }
    for (key, value) in env {
      command = command.env(*key, *value);
    }

    info!(dir = %root.display(), "Installing Composer dependencies");
    ctx.shell.execute(&command, true)?;
  } else {
    debug!(dir = %root.display(), "no composer.json in build, skipping install");
  }

  base::process_special_destinations(plan, true)?;
  Ok(BuildReport { in_place: true })
}

/// Whether the app's `composer.json` requires any of `packages`.
///
/// An unreadable or malformed manifest requires nothing.
pub fn composer_requires(manifest: &Path, packages: &[&str]) -> bool {
  let Ok(content) = fs::read_to_string(manifest) else {
    return false;
  };
  let Ok(json) = serde_json::from_str::<Value>(&content) else {
    debug!(path = %manifest.display(), "ignoring malformed composer.json");
    return false;
  };
  json
    .get("require")
    .and_then(Value::as_object)
    .is_some_and(|require| packages.iter().any(|p| require.contains_key(*p)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::LocalConfig;
  use crate::placement::is_symlink;
  use crate::resources::Resources;
  use crate::settings::BuildSettings;
  use crate::util::testutil::{RecordingShell, write_file};
  use crate::vcs::NoVcs;
  use std::path::PathBuf;
  use tempfile::TempDir;

  fn prepare(app: &Path, build: &Path, settings: &BuildSettings) -> BuildPlan {
    let config = LocalConfig::default();
    Composer
      .prepare(&PrepareRequest {
        app_root: app,
        build_dir: build,
        document_root: Path::new("public"),
        move_to_root: false,
        shared_dir: Path::new("/unused"),
        mounts: &[],
        settings,
        config: &config,
        extra_ignored: &[],
      })
      .unwrap()
  }

  fn app(temp: &TempDir) -> PathBuf {
    let app = temp.path().join("app");
    write_file(&app, "composer.json", r#"{"require": {"monolog/monolog": "^3"}}"#);
    write_file(&app, "public/index.php", "<?php");
    write_file(&app, "vendor/autoload.php", "<?php // stale");
    app
  }

  #[test]
  fn detects_composer_json() {
    let temp = TempDir::new().unwrap();
    assert!(!Composer.detect(temp.path()));
    write_file(temp.path(), "composer.json", "{}");
    assert!(Composer.detect(temp.path()));
  }

  #[test]
  fn composer_requires_reads_require_section() {
    let temp = TempDir::new().unwrap();
    let manifest = temp.path().join("composer.json");
    std::fs::write(&manifest, r#"{"require": {"drupal/core": "^10"}, "require-dev": {"phpunit/phpunit": "*"}}"#)
      .unwrap();

    assert!(composer_requires(&manifest, &["drupal/core"]));
    assert!(!composer_requires(&manifest, &["phpunit/phpunit"]));

    std::fs::write(&manifest, "{not json").unwrap();
    assert!(!composer_requires(&manifest, &["drupal/core"]));
  }

  #[test]
  fn installs_in_build_dir_without_vendor() {
    let temp = TempDir::new().unwrap();
    let app = app(&temp);
    let build = temp.path().join("builds/b1");
    let settings = BuildSettings {
      no_cache: true,
      ..Default::default()
    };
    let config = LocalConfig::default();
    let resources = Resources::default();
    let shell = RecordingShell::new();
    let ctx = BuildContext {
      settings: &settings,
      config: &config,
      shell: &shell,
      vcs: &NoVcs,
      resources: &resources,
    };

    let plan = prepare(&app, &build, &settings);
    let report = Composer.build(&plan, &ctx).unwrap();

    assert!(report.in_place);
    assert!(!Composer.can_archive(&plan, &report));
    assert!(is_symlink(&build.join("composer.json")));
    assert!(!build.join("vendor").exists());

    let commands = shell.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(
      commands[0].to_string(),
      "composer install --no-progress --prefer-dist --optimize-autoloader --no-interaction --no-ansi --no-cache"
    );
    assert_eq!(commands[0].cwd(), Some(build.as_path()));
  }

  #[test]
  fn symlink_build_leaves_source_web_root_untouched() {
    let temp = TempDir::new().unwrap();
    let app = app(&temp);
    write_file(&app, "robots.txt", "root robots");
    write_file(&app, "public/robots.txt", "public robots");
    let build = temp.path().join("builds/b1");
    let settings = BuildSettings::default();
    let config = LocalConfig::default();
    let resources = Resources::default();
    let shell = RecordingShell::new();
    let ctx = BuildContext {
      settings: &settings,
      config: &config,
      shell: &shell,
      vcs: &NoVcs,
      resources: &resources,
    };

    Composer.build(&prepare(&app, &build, &settings), &ctx).unwrap();

    let source = app.join("public/robots.txt");
    assert!(!is_symlink(&source));
    assert_eq!(std::fs::read_to_string(&source).unwrap(), "public robots");
    assert_eq!(std::fs::read_to_string(build.join("public/robots.txt")).unwrap(), "public robots");
  }

  #[test]
  fn copy_build_is_archivable() {
    let temp = TempDir::new().unwrap();
    let app = app(&temp);
    let build = temp.path().join("builds/b1");
    let settings = BuildSettings {
      copy: true,
      ..Default::default()
    };
    let config = LocalConfig::default();
    let resources = Resources::default();
    let shell = RecordingShell::new();
    let ctx = BuildContext {
      settings: &settings,
      config: &config,
      shell: &shell,
      vcs: &NoVcs,
      resources: &resources,
    };

    let plan = prepare(&app, &build, &settings);
    let report = Composer.build(&plan, &ctx).unwrap();
    assert!(Composer.can_archive(&plan, &report));
  }

  #[test]
  fn missing_composer_is_fatal() {
    let temp = TempDir::new().unwrap();
    let app = app(&temp);
    let build = temp.path().join("builds/b1");
    let settings = BuildSettings::default();
    let config = LocalConfig::default();
    let resources = Resources::default();
    let shell = RecordingShell::new().with_missing("composer");
    let ctx = BuildContext {
      settings: &settings,
      config: &config,
      shell: &shell,
      vcs: &NoVcs,
      resources: &resources,
    };

    let err = Composer.build(&prepare(&app, &build, &settings), &ctx).unwrap_err();
    assert!(matches!(err, ToolstackError::ToolNotInstalled { tool: "composer", .. }));
    assert!(!build.exists());
  }
}
