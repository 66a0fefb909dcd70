//! Node.js applications.
//!
//! Never detected automatically: `package.json` is too common a file to say
//! anything about how an application is built. Select it with the `nodejs`
//! flavor.

use std::path::Path;

use tracing::{debug, info};

use super::{BuildContext, BuildPlan, BuildReport, PrepareRequest, Toolstack, ToolstackError, base};
use crate::shell::ShellCommand;

#[derive(Debug, Clone, Copy, Default)]
pub struct NodeJs;

impl Toolstack for NodeJs {
  fn key(&self) -> &'static str {
    "nodejs"
  }

  fn name(&self) -> &'static str {
    "nodejs"
  }

  fn detect(&self, _app_root: &Path) -> bool {
    false
  }

  fn prepare(&self, request: &PrepareRequest<'_>) -> Result<BuildPlan, ToolstackError> {
    BuildPlan::new(request)?.with_ignored("/node_modules")
  }

  fn build(&self, plan: &BuildPlan, ctx: &BuildContext<'_>) -> Result<BuildReport, ToolstackError> {
    let has_manifest = plan.app_root().join("package.json").exists();
    let executable = ctx.config.npm_executable.as_str();
    if has_manifest {
      base::require_tool(ctx, "npm", executable)?;
    }

    let root = base::copy_to_build_dir(plan)?;
    if has_manifest {
      info!(dir = %root.display(), "Installing Node.js dependencies");
      let command = ShellCommand::new(executable).arg("install").current_dir(&root);
      ctx.shell.execute(&command, true)?;
    } else {
      debug!(dir = %root.display(), "no package.json, skipping npm install");
    }

    base::process_special_destinations(plan, true)?;
    Ok(BuildReport { in_place: true })
  }
}
