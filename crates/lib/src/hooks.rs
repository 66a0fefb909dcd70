//! User-defined build hooks.

use std::path::Path;

use tracing::{info, warn};

use crate::shell::{Shell, ShellCommand, ShellError};

/// Run an application's build hook in `dir`.
///
/// Returns `Ok(false)` when the hook exits unsuccessfully; the build carries
/// on but must not be archived. Failing to start the shell at all is an
/// error.
pub fn run_build_hook(script: &str, dir: &Path, shell: &dyn Shell) -> Result<bool, ShellError> {
  info!(dir = %dir.display(), "Running post-build hooks");
  let command = ShellCommand::script(script).current_dir(dir);
  match shell.execute(&command, false)? {
    Some(_) => Ok(true),
    None => {
      warn!("The build hook failed");
      Ok(false)
    }
  }
}
