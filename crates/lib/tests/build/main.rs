//! Integration tests driving the full build orchestrator.
//!
//! External tools are replaced by a fake shell that simulates their effect
//! on the filesystem, so no composer, npm or drush is needed.

mod build_tests;
mod clean_tests;
mod common;
mod drupal_tests;
