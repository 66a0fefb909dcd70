//! CLI integration tests.
//!
//! Every test works on its own temporary project and only builds
//! applications that need no external dependency manager.

mod build_tests;
mod clean_tests;
mod common;
mod detect_tests;
