//! The immutable build plan produced by the prepare phase.

use std::path::{Path, PathBuf};

use crate::app::SharedMount;
use crate::config::LocalConfig;
use crate::placement::{Filesystem, IgnoreSet, LinkStyle, SpecialContext, SpecialDestinations};
use crate::settings::BuildSettings;

use super::ToolstackError;

/// Inputs to [`super::Toolstack::prepare`].
#[derive(Debug, Clone, Copy)]
pub struct PrepareRequest<'a> {
  pub app_root: &'a Path,
  pub build_dir: &'a Path,
  /// Relative to the build directory.
  pub document_root: &'a Path,
  /// Place in-place builds inside the document root.
  pub move_to_root: bool,
  pub shared_dir: &'a Path,
  pub mounts: &'a [SharedMount],
  pub settings: &'a BuildSettings,
  pub config: &'a LocalConfig,
  /// Patterns ignored on top of the defaults, e.g. a destination that lies
  /// inside the application.
  pub extra_ignored: &'a [String],
}

/// Everything the build and install phases need to know about one build.
///
/// Toolstacks that learn more rules while building derive an extended copy
/// through [`BuildPlan::with_ignored`] and
/// [`BuildPlan::with_special_destination`]; a plan is never changed in place.
#[derive(Debug, Clone)]
pub struct BuildPlan {
  app_root: PathBuf,
  build_dir: PathBuf,
  document_root: PathBuf,
  move_to_root: bool,
  shared_dir: PathBuf,
  mounts: Vec<SharedMount>,
  copy: bool,
  link_style: LinkStyle,
  copy_on_windows: bool,
  ignored: IgnoreSet,
  special: SpecialDestinations,
}

impl BuildPlan {
  /// A plan with the default ignore set and special destinations.
  pub fn new(request: &PrepareRequest<'_>) -> Result<Self, ToolstackError> {
    let mut ignored = IgnoreSet::with_defaults();
    ignored.extend(request.config.layout_ignores())?;
    ignored.extend(request.extra_ignored)?;

    Ok(Self {
      app_root: request.app_root.to_path_buf(),
      build_dir: request.build_dir.to_path_buf(),
      document_root: request.document_root.to_path_buf(),
      move_to_root: request.move_to_root,
      shared_dir: request.shared_dir.to_path_buf(),
      mounts: request.mounts.to_vec(),
      copy: request.settings.copy,
      link_style: if request.settings.absolute_links {
        LinkStyle::Absolute
      } else {
        LinkStyle::Relative
      },
      copy_on_windows: request.config.copy_on_windows,
      ignored,
      special: SpecialDestinations::with_defaults(),
    })
  }

  pub fn with_ignored(mut self, pattern: &str) -> Result<Self, ToolstackError> {
    self.ignored.add(pattern)?;
    Ok(self)
  }

  pub fn with_special_destination(mut self, pattern: &str, template: &str) -> Self {
    self.special.insert(pattern, template);
    self
  }

  pub fn app_root(&self) -> &Path {
    &self.app_root
  }

  pub fn build_dir(&self) -> &Path {
    &self.build_dir
  }

  pub fn document_root(&self) -> &Path {
    &self.document_root
  }

  pub fn web_root(&self) -> PathBuf {
    self.build_dir.join(&self.document_root)
  }

  /// Where an in-place build puts the application tree.
  pub fn placement_root(&self) -> PathBuf {
    if self.move_to_root {
      self.web_root()
    } else {
      self.build_dir.clone()
    }
  }

  pub fn shared_dir(&self) -> &Path {
    &self.shared_dir
  }

  pub fn mounts(&self) -> &[SharedMount] {
    &self.mounts
  }

  pub fn copy(&self) -> bool {
    self.copy
  }

  pub fn ignored(&self) -> &IgnoreSet {
    &self.ignored
  }

  pub fn special_destinations(&self) -> &SpecialDestinations {
    &self.special
  }

  pub fn filesystem(&self) -> Filesystem {
    Filesystem::new(self.link_style).with_copy_on_windows(self.copy_on_windows)
  }

  /// The ignore set plus every special destination pattern, for placements
  /// that must leave remapped files to [`SpecialDestinations::apply`].
  pub fn placement_excludes(&self) -> Result<IgnoreSet, ToolstackError> {
    let mut excludes = self.ignored.clone();
    excludes.extend(self.special.patterns())?;
    Ok(excludes)
  }

  pub fn special_context<'a>(&'a self, fs: &'a Filesystem, in_place: bool) -> SpecialContext<'a> {
    SpecialContext {
      app_root: &self.app_root,
      build_dir: self.build_dir.clone(),
      web_root: self.web_root(),
      ignored: &self.ignored,
      copy: self.copy,
      in_place,
      fs,
    }
  }
}
