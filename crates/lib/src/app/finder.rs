//! Discovery of applications in a project source tree.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::{AppConfig, AppError, LocalApplication};
use crate::config::LocalConfig;

/// Config files deeper than this are not considered.
const MAX_DEPTH: usize = 5;

const SKIP_DIRS: &[&str] = &[".git", ".idea", "node_modules", "vendor"];

pub struct ApplicationFinder<'a> {
  config: &'a LocalConfig,
}

impl<'a> ApplicationFinder<'a> {
  pub fn new(config: &'a LocalConfig) -> Self {
    Self { config }
  }

  /// Find every application below `source_dir`.
  ///
  /// Applications are defined by config files. A tree without any is a
  /// single application rooted at `source_dir`.
  pub fn find(&self, source_dir: &Path) -> Result<Vec<LocalApplication>, AppError> {
    let layout = [
      self.config.build_dir.as_str(),
      self.config.web_root.as_str(),
      self.config.shared_dir.as_str(),
      self.config.archive_dir.as_str(),
    ];

    let walker = WalkDir::new(source_dir)
      .max_depth(MAX_DEPTH)
      .sort_by_file_name()
      .into_iter()
      .filter_entry(|e| {
        if !e.file_type().is_dir() || e.depth() == 0 {
          return true;
        }
        let name = e.file_name().to_string_lossy();
        !(SKIP_DIRS.contains(&name.as_ref()) || (e.depth() == 1 && layout.contains(&name.as_ref())))
      });

    let mut apps: Vec<(PathBuf, AppConfig)> = Vec::new();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    for entry in walker {
      let entry = entry.map_err(|e| AppError::Scan {
        path: source_dir.to_path_buf(),
        message: e.to_string(),
      })?;
      if !entry.file_type().is_file() || entry.file_name() != self.config.app_config_file.as_str() {
        continue;
      }

      let config_path = entry.path();
      let config = AppConfig::from_file(config_path)?;
      let root = match &config.source.root {
        Some(root) => source_dir.join(root.trim_matches('/')),
        None => config_path.parent().unwrap_or(source_dir).to_path_buf(),
      };
      if !root.is_dir() {
        return Err(AppError::MissingRoot(root));
      }

      if let Some(name) = config.name.clone().filter(|n| !n.is_empty()) {
        if let Some(first) = seen.get(&name) {
          return Err(AppError::DuplicateName {
            name,
            first: first.clone(),
            second: config_path.to_path_buf(),
          });
        }
        seen.insert(name, config_path.to_path_buf());
      }

      debug!(root = %root.display(), name = ?config.name, "found application");
      apps.push((root, config));
    }

    if apps.is_empty() {
      debug!(path = %source_dir.display(), "no application config found, using source dir");
      return Ok(vec![LocalApplication::new(source_dir, source_dir, AppConfig::default())]);
    }

    let single = apps.len() == 1;
    Ok(
      apps
        .into_iter()
        .map(|(root, config)| LocalApplication::new(root, source_dir, config).with_single(single))
        .collect(),
    )
  }
}
