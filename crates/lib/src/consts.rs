pub const APP_NAME: &str = "webbuild";

/// Bumped whenever the layout of a finished build changes, so archives made
/// by older releases are never restored.
pub const BUILD_VERSION: u32 = 3;

/// Project-level configuration file, looked up in the project root.
pub const CONFIG_FILE_NAME: &str = ".webbuild.json";

/// Metadata written into every finished build directory.
pub const BUILD_MARKER: &str = ".webbuild-build.json";

/// Prefix for environment variable overrides of [`crate::config::LocalConfig`].
pub const ENV_PREFIX: &str = "WEBBUILD_";

pub const DEFAULT_DOCUMENT_ROOT: &str = "public";
pub const DEFAULT_ENVIRONMENT_ID: &str = "local";
pub const DEFAULT_KEEP_BUILDS: usize = 10;

/// Entries that are never placed, copied or hashed, at any depth.
pub const ALWAYS_SKIP: &[&str] = &[".git", ".DS_Store"];
