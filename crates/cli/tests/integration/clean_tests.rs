//! Clean command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

fn project_with_builds(count: usize) -> TestEnv {
  let env = TestEnv::empty();
  env.write_file("index.html", "hi");
  for _ in 0..count {
    env.webbuild_cmd().args(["build", "--no-clean"]).assert().success();
  }
  env
}

#[test]
fn clean_without_builds_succeeds() {
  let env = TestEnv::empty();

  env
    .webbuild_cmd()
    .arg("clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Clean complete"));

  assert!(!env.root().join("builds").exists());
}

#[test]
fn clean_keeps_requested_builds() {
  let env = project_with_builds(3);
  assert_eq!(env.builds().len(), 3);

  env
    .webbuild_cmd()
    .args(["clean", "--keep", "1"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Builds removed: 2"));

  assert_eq!(env.builds().len(), 1);
}

#[test]
fn clean_never_deletes_active_build() {
  let env = project_with_builds(2);
  let active = std::fs::canonicalize(env.root().join("www")).unwrap();

  env.webbuild_cmd().args(["clean", "--keep", "0"]).assert().success();

  let builds = env.builds();
  assert_eq!(builds.len(), 1);
  assert!(active.starts_with(std::fs::canonicalize(&builds[0]).unwrap()));
}

#[test]
fn include_active_deletes_everything() {
  let env = project_with_builds(2);

  env
    .webbuild_cmd()
    .args(["clean", "--keep", "0", "--include-active"])
    .assert()
    .success();

  assert!(env.builds().is_empty());
}

#[test]
fn max_age_protects_recent_builds() {
  let env = project_with_builds(2);

  env
    .webbuild_cmd()
    .args(["clean", "--keep", "0", "--max-age", "1d", "--include-active"])
    .assert()
    .success();

  assert_eq!(env.builds().len(), 2);
}

#[test]
fn configured_keep_count_applies_after_build() {
  let env = project_with_builds(2);
  env.write_file(".webbuild.json", r#"{"keep_builds": 1}"#);

  env.build();

  assert_eq!(env.builds().len(), 1);
}

#[test]
fn clean_json_output_is_valid() {
  let env = project_with_builds(1);

  env
    .webbuild_cmd()
    .args(["clean", "--archives", "-o", "json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("deleted_paths"))
    .stdout(predicate::str::contains("archives_deleted"));
}
