use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn plain_directory_has_no_toolstack() {
  let env = TestEnv::empty();
  env.write_file("index.html", "hi");

  env
    .webbuild_cmd()
    .arg("detect")
    .assert()
    .success()
    .stdout("none\n");
}

#[test]
fn composer_project_with_drupal_core_is_drupal() {
  let env = TestEnv::empty();
  env.write_file("composer.json", r#"{"require": {"drupal/core": "^10"}}"#);

  env
    .webbuild_cmd()
    .arg("detect")
    .assert()
    .success()
    .stdout("php:drupal\n");
}

#[test]
fn symfony_is_preferred_over_composer() {
  let env = TestEnv::empty();
  env.write_file("composer.json", r#"{"require": {"symfony/symfony": "^6"}}"#);

  env
    .webbuild_cmd()
    .arg("detect")
    .assert()
    .success()
    .stdout("php:symfony\n");
}

#[test]
fn package_json_alone_is_not_nodejs() {
  let env = TestEnv::empty();
  env.write_file("package.json", "{}");

  env
    .webbuild_cmd()
    .arg("detect")
    .assert()
    .success()
    .stdout("none\n");
}

#[test]
fn configured_flavor_wins() {
  let env = TestEnv::empty();
  env
    .write_file("package.json", "{}")
    .write_file(".app.yaml", "name: frontend\nbuild:\n  flavor: nodejs\n");

  env
    .webbuild_cmd()
    .arg("detect")
    .assert()
    .success()
    .stdout("nodejs\n");
}

#[test]
fn multiple_applications_are_listed_by_id() {
  let env = TestEnv::empty();
  env
    .write_file("api/.app.yaml", "name: api\n")
    .write_file("api/composer.json", "{}")
    .write_file("site/.app.yaml", "name: site\n")
    .write_file("site/index.html", "hi");

  env
    .webbuild_cmd()
    .arg("detect")
    .assert()
    .success()
    .stdout(predicate::str::contains("api: php:composer"))
    .stdout(predicate::str::contains("site: none"));
}

#[test]
fn unknown_flavor_fails() {
  let env = TestEnv::empty();
  env.write_file(".app.yaml", "build:\n  flavor: rails\n");

  env
    .webbuild_cmd()
    .arg("detect")
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown build flavor 'rails'"));
}
