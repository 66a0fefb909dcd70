//! Choosing a toolstack for an application.

use std::path::Path;

use tracing::debug;

use super::{Composer, Drupal, NoToolstack, NodeJs, Symfony, Toolstack};

/// Toolstacks in detection priority order.
///
/// Specific toolstacks come before the ones they refine, and the universal
/// fallback comes last.
#[derive(Debug)]
pub struct Selector {
  toolstacks: Vec<Box<dyn Toolstack>>,
}

impl Default for Selector {
  fn default() -> Self {
    Self::new(vec![
      Box::new(Drupal),
      Box::new(Symfony),
      Box::new(Composer),
      Box::new(NodeJs),
      Box::new(NoToolstack),
    ])
  }
}

impl Selector {
  pub fn new(toolstacks: Vec<Box<dyn Toolstack>>) -> Self {
    Self { toolstacks }
  }

  /// The first toolstack that recognises `app_root`.
  pub fn pick(&self, app_root: &Path) -> Option<&dyn Toolstack> {
    let picked = self.toolstacks.iter().find(|t| t.detect(app_root)).map(Box::as_ref);
    if let Some(toolstack) = picked {
      debug!(app_root = %app_root.display(), toolstack = toolstack.key(), "detected toolstack");
    }
    picked
  }

  /// Look a toolstack up by key (`php:drupal`) or short name (`drupal`).
  pub fn by_name(&self, name: &str) -> Option<&dyn Toolstack> {
    let name = name.trim().to_ascii_lowercase();
    self
      .toolstacks
      .iter()
      .find(|t| t.key() == name || t.name() == name)
      .map(Box::as_ref)
  }

  pub fn toolstacks(&self) -> impl Iterator<Item = &dyn Toolstack> {
    self.toolstacks.iter().map(Box::as_ref)
  }
}
