//! Drush make file lookup.

use std::path::{Path, PathBuf};

const MAKE_FILES: &[&str] = &["project.make.yml", "project.make", "drupal-org.make.yml", "drupal-org.make"];

const LOCKED_MAKE_FILES: &[&str] = &[
  "project.make.lock",
  "project.make.yml.lock",
  "drupal-org.make.yml.lock",
  "drupal-org.make.lock",
];

/// Make file names in order of preference.
///
/// Existing lock files come first unless the lock is being regenerated.
/// Core variants use `-core.make` in place of `.make`.
pub fn candidates(regenerate_lock: bool, core: bool) -> Vec<String> {
  let locked = if regenerate_lock { &[][..] } else { LOCKED_MAKE_FILES };
  locked
    .iter()
    .chain(MAKE_FILES)
    .map(|name| {
      if core {
        name.replacen(".make", "-core.make", 1)
      } else {
        name.to_string()
      }
    })
    .collect()
}

pub fn find_make_file(app_root: &Path, regenerate_lock: bool, core: bool) -> Option<PathBuf> {
  candidates(regenerate_lock, core)
    .into_iter()
    .map(|name| app_root.join(name))
    .find(|path| path.exists())
}

pub fn is_lock_file(make_file: &Path) -> bool {
  make_file
    .file_name()
    .is_some_and(|name| name.to_string_lossy().contains(".lock"))
}

/// The `--lock` option that writes a lock file next to `make_file`.
pub fn lock_option(make_file: &Path) -> Option<String> {
  if is_lock_file(make_file) {
    return None;
  }
  Some(format!("--lock={}.lock", make_file.display()))
}
