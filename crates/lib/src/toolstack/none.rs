//! The fallback toolstack: the application is served as it is.

use std::path::Path;

use super::{BuildContext, BuildPlan, BuildReport, Toolstack, ToolstackError, base};

#[derive(Debug, Clone, Copy, Default)]
pub struct NoToolstack;

impl Toolstack for NoToolstack {
  fn key(&self) -> &'static str {
    "none"
  }

  fn name(&self) -> &'static str {
    "none"
  }

  fn detect(&self, _app_root: &Path) -> bool {
    true
  }

  fn build(&self, plan: &BuildPlan, _ctx: &BuildContext<'_>) -> Result<BuildReport, ToolstackError> {
    base::copy_to_build_dir(plan)?;
    base::process_special_destinations(plan, true)?;
    Ok(BuildReport { in_place: true })
  }
}
