mod build;
mod clean;
mod detect;

pub use build::{BuildArgs, cmd_build};
pub use clean::cmd_clean;
pub use detect::cmd_detect;
