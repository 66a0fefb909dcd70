//! End-to-end Drupal builds against a simulated drush.

use std::fs;

use webbuild_lib::build::BuildError;
use webbuild_lib::settings::BuildSettings;
use webbuild_lib::toolstack::ToolstackError;

use super::common::{Project, is_symlink};

fn drupal_project() -> Project {
  let project = Project::new();
  project
    .write("project.make", "core = 8.x\napi = 2\n")
    .write("settings.php", "<?php $databases = [];")
    .write("modules/custom/hello/hello.info.yml", "name: Hello");
  project
}

#[test]
fn composer_drupal_site_is_drupal() {
  let project = Project::new();
  project
    .write("composer.json", r#"{"require": {"drupal/core": "^10.2"}}"#)
    .write("web/index.php", "<?php");

  let outcome = project.build(&BuildSettings::default());

  assert_eq!(outcome.apps[0].toolstack, "php:drupal");
  assert_eq!(project.shell.count("drush"), 0);
}

#[test]
fn custom_settings_php_is_copied_in_symlink_mode() {
  let project = drupal_project();

  let outcome = project.build(&BuildSettings::default());

  assert!(outcome.success());
  let sites_default = project.www().join("sites/default");
  let settings_php = sites_default.join("settings.php");
  assert!(settings_php.is_file());
  assert!(!is_symlink(&settings_php));
  assert_eq!(fs::read_to_string(&settings_php).unwrap(), "<?php $databases = [];");

  assert!(is_symlink(&sites_default.join("modules")));
  assert!(!sites_default.join("project.make").exists());
  assert!(project.www().join("core/includes/bootstrap.inc").is_file());
}

#[test]
fn shared_settings_local_created_once() {
  let project = drupal_project();
  let shared_local = project.root().join("shared/settings.local.php");

  project.build(&BuildSettings::default());
  assert!(shared_local.is_file());
  assert!(is_symlink(&project.www().join("sites/default/settings.local.php")));
  assert!(is_symlink(&project.www().join("sites/default/files")));

  fs::write(&shared_local, "<?php // my credentials").unwrap();
  project.build(&BuildSettings::default());

  assert_eq!(fs::read_to_string(&shared_local).unwrap(), "<?php // my credentials");
  assert_eq!(
    fs::read_to_string(project.www().join("sites/default/settings.local.php")).unwrap(),
    "<?php // my credentials"
  );
}

#[test]
fn drush_make_runs_with_flags() {
  let project = drupal_project();
  let settings = BuildSettings {
    no_cache: true,
    ..Default::default()
  };

  project.build(&settings);

  let make = project
    .shell
    .lines()
    .into_iter()
    .find(|line| line.starts_with("drush make"))
    .unwrap();
  assert!(make.contains("project.make"));
  assert!(make.contains("--yes"));
  assert!(make.contains("--no-cache"));
}

#[test]
fn multiple_profiles_abort_the_build() {
  let project = Project::new();
  project
    .write("one.profile", "<?php")
    .write("two.profile", "<?php")
    .write("index.php", "<?php // Drupal");

  let err = project
    .local_build()
    .build(&project.root(), None, &BuildSettings::default(), &[])
    .unwrap_err();

  assert!(matches!(
    err,
    BuildError::Toolstack {
      source: ToolstackError::MultipleProfiles(_),
      ..
    }
  ));
}

#[test]
fn lock_without_make_file_is_fatal() {
  let project = Project::new();
  project.write("index.php", "<?php // Drupal");
  let settings = BuildSettings {
    drush: webbuild_lib::settings::DrushSettings {
      lock: true,
      ..Default::default()
    },
    ..Default::default()
  };

  let err = project
    .local_build()
    .build(&project.root(), None, &settings, &[])
    .unwrap_err();

  assert!(matches!(
    err,
    BuildError::Toolstack {
      source: ToolstackError::MissingMakeFile { .. },
      ..
    }
  ));
}
