//! Cleanup of builds and archives through the orchestrator.

use webbuild_lib::config::LocalConfig;
use webbuild_lib::retention::RetentionPolicy;
use webbuild_lib::settings::BuildSettings;

use super::common::{Project, copy_settings};

fn project_keeping(keep: usize) -> Project {
  let mut project = Project::new();
  project.config = LocalConfig {
    keep_builds: keep,
    ..Default::default()
  };
  project
}

#[test]
fn build_cleans_up_beyond_keep_count() {
  let project = project_keeping(2);
  project.write("index.html", "hi");

  let mut last = None;
  for _ in 0..4 {
    last = Some(project.build(&BuildSettings::default()));
  }

  let builds = project.builds();
  assert_eq!(builds.len(), 2);
  let active = &last.unwrap().apps[0].build_dir;
  assert!(builds.contains(active));
}

#[test]
fn no_clean_keeps_everything() {
  let project = project_keeping(1);
  project.write("index.html", "hi");
  let settings = BuildSettings {
    no_clean: true,
    ..Default::default()
  };

  for _ in 0..3 {
    let outcome = project.build(&settings);
    assert!(outcome.clean.is_none());
  }

  assert_eq!(project.builds().len(), 3);
}

#[test]
fn stale_archives_removed_with_their_builds() {
  let project = project_keeping(1);
  project.write("index.html", "v1");
  project.build(&copy_settings());
  let archives = project.config.archives_path(&project.root());
  assert_eq!(std::fs::read_dir(&archives).unwrap().count(), 1);

  project.write("index.html", "v2");
  let outcome = project.build(&copy_settings());

  let clean = outcome.clean.unwrap();
  assert_eq!(clean.builds.deleted, 1);
  assert_eq!(clean.archives_deleted, 1);
  assert_eq!(std::fs::read_dir(&archives).unwrap().count(), 1);
}

#[test]
fn explicit_clean_protects_active_build() {
  let project = Project::new();
  project.write("index.html", "hi");
  let settings = BuildSettings {
    no_clean: true,
    ..Default::default()
  };
  let first = project.build(&settings);
  project.build(&settings);
  project.build(&settings);

  // Point the web root back at the oldest build.
  webbuild_lib::placement::Filesystem::new(Default::default())
    .replace_link(&first.apps[0].build_dir.join("public"), &project.www())
    .unwrap();

  let policy = RetentionPolicy {
    max_age: None,
    keep: 0,
    include_active: false,
  };
  let outcome = project.local_build().clean(&project.root(), &policy, true).unwrap();

  assert_eq!(outcome.builds.deleted, 2);
  assert_eq!(project.builds(), vec![first.apps[0].build_dir.clone()]);
}

#[test]
fn clean_without_builds_is_noop() {
  let project = Project::new();
  let policy = RetentionPolicy::from_config(&project.config);

  let outcome = project.local_build().clean(&project.root(), &policy, true).unwrap();

  assert_eq!(outcome.builds.deleted, 0);
  assert!(!project.config.builds_path(&project.root()).exists());
}
