//! Build command integration tests.

use std::fs;

use predicates::prelude::*;

use super::common::{TestEnv, is_symlink};

#[test]
fn build_publishes_web_root() {
  let env = TestEnv::empty();
  env.write_file("index.html", "<h1>Hello</h1>").write_file(".env", "SECRET=1");

  env
    .webbuild_cmd()
    .arg("build")
    .assert()
    .success()
    .stdout(predicate::str::contains("Built application 'default'"))
    .stdout(predicate::str::contains("Toolstack"));

  let www = env.root().join("www");
  assert!(is_symlink(&www));
  assert_eq!(fs::read_to_string(www.join("index.html")).unwrap(), "<h1>Hello</h1>");
  assert!(!www.join(".env").exists());
  assert_eq!(env.builds().len(), 1);
}

#[test]
fn build_json_output_is_valid() {
  let env = TestEnv::empty();
  env.write_file("index.html", "hi");

  let output = env.webbuild_cmd().args(["build", "-o", "json"]).output().unwrap();
  assert!(output.status.success());

  let outcome: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(outcome["apps"][0]["app"], "default");
  assert_eq!(outcome["apps"][0]["toolstack"], "none");
  assert_eq!(outcome["apps"][0]["success"], true);
  assert!(outcome["clean"]["builds"]["deleted"].is_number());
}

#[test]
fn environment_id_names_build_directory() {
  let env = TestEnv::empty();
  env.write_file("index.html", "hi");

  env.webbuild_cmd().args(["build", "--env", "feature/x"]).assert().success();

  let builds = env.builds();
  assert_eq!(builds.len(), 1);
  let name = builds[0].file_name().unwrap().to_string_lossy().into_owned();
  assert!(name.ends_with("--feature-x"), "unexpected build name {name}");
}

#[test]
fn copy_mode_places_real_files() {
  let env = TestEnv::empty();
  env.write_file("index.html", "hi");

  env.webbuild_cmd().args(["build", "--copy"]).assert().success();

  let index = env.root().join("www/index.html");
  assert!(!is_symlink(&index));
  assert_eq!(fs::read_to_string(index).unwrap(), "hi");
}

#[test]
fn custom_destination_receives_link() {
  let env = TestEnv::empty();
  env.write_file("index.html", "hi");
  let out = tempfile::TempDir::new().unwrap();

  env
    .webbuild_cmd()
    .arg("build")
    .arg("--destination")
    .arg(out.path().join("current"))
    .assert()
    .success();

  assert!(is_symlink(&out.path().join("current")));
  assert!(!env.root().join("www").exists());
}

#[test]
fn unknown_app_fails() {
  let env = TestEnv::empty();
  env.write_file("index.html", "hi");

  env
    .webbuild_cmd()
    .args(["build", "--app", "nope"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Application not found: nope"));
}

#[test]
fn selected_app_only_is_built() {
  let env = TestEnv::empty();
  env
    .write_file("api/.app.yaml", "name: api\n")
    .write_file("api/index.html", "api")
    .write_file("site/.app.yaml", "name: site\n")
    .write_file("site/index.html", "site");

  env.webbuild_cmd().args(["build", "--app", "site"]).assert().success();

  assert!(is_symlink(&env.root().join("www/site")));
  assert!(!env.root().join("www/api").exists());
}

#[cfg(unix)]
#[test]
fn build_hook_runs_in_build() {
  let env = TestEnv::empty();
  env
    .write_file("index.html", "hi")
    .write_file(".app.yaml", "hooks:\n  build: touch built.txt\n");

  env.build();

  assert!(env.root().join("www/built.txt").exists());
  assert!(!env.root().join("built.txt").exists());
}

#[cfg(unix)]
#[test]
fn failing_hook_fails_command() {
  let env = TestEnv::empty();
  env
    .write_file("index.html", "hi")
    .write_file(".app.yaml", "hooks:\n  build: exit 1\n");

  env
    .webbuild_cmd()
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("built with a failing hook"));

  // The build is still published.
  assert!(is_symlink(&env.root().join("www")));
}

#[cfg(unix)]
#[test]
fn no_build_hooks_skips_hook() {
  let env = TestEnv::empty();
  env
    .write_file("index.html", "hi")
    .write_file(".app.yaml", "hooks:\n  build: exit 1\n");

  env.webbuild_cmd().args(["build", "--no-build-hooks"]).assert().success();
}

