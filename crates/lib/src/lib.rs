//! webbuild-lib: local builds of web applications.
//!
//! Given a project source tree, the library finds its applications, picks a
//! toolstack for each one and materialises a servable build:
//! - `toolstack`: detection and the prepare/build/install strategies
//! - `placement`: copying and symlinking application files into a build
//! - `build`: the orchestrator that creates builds and publishes web roots
//! - `retention` and `archive`: cleanup of old builds and the archive cache

pub mod app;
pub mod archive;
pub mod build;
pub mod config;
pub mod consts;
pub mod hooks;
pub mod lock;
pub mod placeholder;
pub mod placement;
pub mod resources;
pub mod retention;
pub mod settings;
pub mod shell;
pub mod toolstack;
pub mod util;
pub mod vcs;
