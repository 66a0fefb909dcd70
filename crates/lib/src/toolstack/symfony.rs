//! Symfony full-stack applications.
//!
//! A Composer build for production: no dev dependencies, the production
//! environment selected, and the runtime directories created fresh in the
//! build instead of being shared with the source tree.

use std::path::Path;

use super::composer::{COMPOSER_JSON, composer_requires, run_composer_build};
use super::{BuildContext, BuildPlan, BuildReport, PrepareRequest, Toolstack, ToolstackError, base};

const FULL_STACK_PACKAGE: &str = "symfony/symfony";

const RUNTIME_DIRS: &[&str] = &["var/cache", "var/log"];

#[derive(Debug, Clone, Copy, Default)]
pub struct Symfony;

impl Toolstack for Symfony {
  fn key(&self) -> &'static str {
    "php:symfony"
  }

  fn name(&self) -> &'static str {
    "symfony"
  }

  fn detect(&self, app_root: &Path) -> bool {
    composer_requires(&app_root.join(COMPOSER_JSON), &[FULL_STACK_PACKAGE])
  }

  fn prepare(&self, request: &PrepareRequest<'_>) -> Result<BuildPlan, ToolstackError> {
    BuildPlan::new(request)?.with_ignored("/vendor")?.with_ignored("/var")
  }

  fn build(&self, plan: &BuildPlan, ctx: &BuildContext<'_>) -> Result<BuildReport, ToolstackError> {
    let report = run_composer_build(plan, ctx, &["--no-dev"], &[("SYMFONY_ENV", "prod"), ("APP_ENV", "prod")])?;

    let fs = plan.filesystem();
    let root = plan.placement_root();
    for dir in RUNTIME_DIRS {
      fs.mkdir(&root.join(dir), base::SHARED_DIR_MODE)?;
    }
    Ok(report)
  }
}
