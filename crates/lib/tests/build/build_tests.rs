//! End-to-end builds with the generic toolstacks.

use std::fs;

use webbuild_lib::build::BuildError;
use webbuild_lib::build::marker::read_marker;
use webbuild_lib::lock::BuildLock;
use webbuild_lib::settings::BuildSettings;

use super::common::{Project, copy_settings, is_symlink};

#[test]
fn plain_tree_is_mirrored_without_dotfiles() {
  let project = Project::new();
  project
    .write("index.html", "<h1>Hello</h1>")
    .write("css/site.css", "body {}")
    .write(".env", "SECRET=1");

  let outcome = project.build(&BuildSettings::default());

  assert!(outcome.success());
  assert_eq!(outcome.apps[0].toolstack, "none");
  let www = project.www();
  assert!(is_symlink(&www));
  assert_eq!(fs::read_to_string(www.join("index.html")).unwrap(), "<h1>Hello</h1>");
  assert_eq!(fs::read_to_string(www.join("css/site.css")).unwrap(), "body {}");
  assert!(!www.join(".env").exists());
  assert!(!www.join("builds").exists());
}

#[test]
fn build_writes_marker() {
  let project = Project::new();
  project.write("index.html", "hi");

  let outcome = project.build(&BuildSettings::default());

  let marker = read_marker(&outcome.apps[0].build_dir).unwrap().unwrap();
  assert_eq!(marker.app, "default");
  assert_eq!(marker.toolstack, "none");
  assert_eq!(marker.environment_id, "local");
  assert_eq!(marker.tree_id, None);
}

#[test]
fn symlink_builds_are_independent_but_identical() {
  let project = Project::new();
  project.write("index.html", "same").write("img/logo.svg", "<svg/>");

  let first = project.build(&BuildSettings::default());
  let second = project.build(&BuildSettings::default());

  let first_dir = &first.apps[0].build_dir;
  let second_dir = &second.apps[0].build_dir;
  assert_ne!(first_dir, second_dir);
  for file in ["index.html", "img/logo.svg"] {
    assert_eq!(
      fs::read_to_string(first_dir.join("public").join(file)).unwrap(),
      fs::read_to_string(second_dir.join("public").join(file)).unwrap()
    );
  }
  assert_eq!(
    dunce::canonicalize(project.www()).unwrap(),
    dunce::canonicalize(second_dir.join("public")).unwrap()
  );
}

#[test]
fn composer_copy_build_is_archived_then_restored() {
  let project = Project::new();
  project
    .write("composer.json", r#"{"require": {"slim/slim": "^4"}}"#)
    .write("public/index.php", "<?php");

  let first = project.build(&copy_settings());
  assert_eq!(first.apps[0].toolstack, "php:composer");
  assert!(first.apps[0].archived);
  assert!(first.apps[0].build_dir.join("vendor/autoload.php").is_file());
  assert_eq!(project.shell.count("composer"), 1);

  let second = project.build(&copy_settings());
  assert!(second.apps[0].restored);
  assert_eq!(project.shell.count("composer"), 1);
  assert!(second.apps[0].build_dir.join("vendor/autoload.php").is_file());
  assert!(project.www().join("index.php").is_file());

  let marker = read_marker(&second.apps[0].build_dir).unwrap().unwrap();
  assert!(marker.tree_id.is_some());
}

#[test]
fn in_place_symlink_build_is_not_archived() {
  let project = Project::new();
  project.write("index.html", "hi");

  let outcome = project.build(&BuildSettings::default());

  assert!(!outcome.apps[0].archived);
  assert!(!project.config.archives_path(&project.root()).exists());
}

#[test]
fn no_archive_setting_always_builds() {
  let project = Project::new();
  project.write("composer.json", "{}");
  let settings = BuildSettings {
    copy: true,
    no_archive: true,
    ..Default::default()
  };

  project.build(&settings);
  let second = project.build(&settings);

  assert!(!second.apps[0].restored);
  assert_eq!(project.shell.count("composer"), 2);
}

#[test]
fn failing_hook_fails_build_and_skips_archive() {
  let project = Project::new();
  project
    .write("composer.json", "{}")
    .write(".app.yaml", "hooks:\n  build: exit 1\n");

  let outcome = project.build(&copy_settings());

  assert!(!outcome.success());
  assert!(!outcome.apps[0].archived);
  assert!(is_symlink(&project.www()));
}

#[test]
fn hook_runs_in_built_application() {
  let project = Project::new();
  project
    .write("composer.json", "{}")
    .write(".app.yaml", "hooks:\n  build: touch built.txt\n");

  let outcome = project.build(&copy_settings());

  assert!(outcome.success());
  assert!(project.www().join("built.txt").exists());

  let skipped = BuildSettings {
    no_build_hooks: true,
    ..copy_settings()
  };
  project.write("composer.json", r#"{"name": "changed/app"}"#);
  let outcome = project.build(&skipped);
  assert!(!outcome.apps[0].build_dir.join("public/built.txt").exists());
}

#[test]
fn nodejs_is_only_used_when_configured() {
  let project = Project::new();
  project
    .write("package.json", "{}")
    .write(".app.yaml", "build:\n  flavor: nodejs\n");

  let outcome = project.build(&BuildSettings::default());

  assert_eq!(outcome.apps[0].toolstack, "nodejs");
  assert_eq!(project.shell.count("npm"), 1);
  assert!(project.www().join("node_modules/left-pad/index.js").is_file());
}

#[test]
fn multi_app_projects_get_one_link_per_app() {
  let project = Project::new();
  project
    .write("api/.app.yaml", "name: api\n")
    .write("api/index.php", "<?php")
    .write("frontend/.app.yaml", "name: frontend\n")
    .write("frontend/index.html", "<html></html>");

  let outcome = project.build(&BuildSettings::default());

  assert_eq!(outcome.apps.len(), 2);
  let www = project.www();
  assert!(www.is_dir() && !is_symlink(&www));
  assert!(www.join("api/index.php").is_file());
  assert!(www.join("frontend/index.html").is_file());
  assert!(
    outcome.apps[0]
      .build_dir
      .file_name()
      .unwrap()
      .to_string_lossy()
      .ends_with("--local--api")
  );
}

#[test]
fn selected_apps_only_and_unknown_ones_reported() {
  let project = Project::new();
  project
    .write("api/.app.yaml", "name: api\n")
    .write("api/index.php", "<?php")
    .write("frontend/.app.yaml", "name: frontend\n")
    .write("frontend/index.html", "<html></html>");

  let outcome = project
    .local_build()
    .build(
      &project.root(),
      None,
      &BuildSettings::default(),
      &["frontend".to_string(), "admin".to_string()],
    )
    .unwrap();

  assert_eq!(outcome.apps.len(), 1);
  assert_eq!(outcome.apps[0].app, "frontend");
  assert_eq!(outcome.not_found, vec!["admin".to_string()]);
}

#[test]
fn destination_inside_source_is_not_copied() {
  let project = Project::new();
  project.write("index.html", "hi");
  let destination = project.root().join("_www");

  project
    .local_build()
    .build(&project.root(), Some(&destination), &copy_settings(), &[])
    .unwrap();
  let outcome = project
    .local_build()
    .build(&project.root(), Some(&destination), &copy_settings(), &[])
    .unwrap();

  assert!(destination.join("index.html").is_file());
  assert!(!outcome.apps[0].build_dir.join("public/_www").exists());
}

#[test]
fn web_root_switch_keeps_previous_build() {
  let project = Project::new();
  project.write("index.html", "v1");
  let first = project.build(&copy_settings());

  project.write("index.html", "v2");
  let second = project.build(&copy_settings());

  assert_eq!(fs::read_to_string(project.www().join("index.html")).unwrap(), "v2");
  assert_eq!(
    fs::read_to_string(first.apps[0].build_dir.join("public/index.html")).unwrap(),
    "v1"
  );
  assert_ne!(first.apps[0].build_dir, second.apps[0].build_dir);
}

#[cfg(unix)]
#[test]
fn concurrent_build_is_refused() {
  let project = Project::new();
  project.write("index.html", "hi");
  let _held = BuildLock::acquire(&project.config.builds_path(&project.root()), "build").unwrap();

  let err = project
    .local_build()
    .build(&project.root(), None, &BuildSettings::default(), &[])
    .unwrap_err();

  assert!(matches!(err, BuildError::Lock(_)));
}
