//! Shared test utilities for casefacts integration tests.
//!
//! - `TestHarness`: temp directory, on-disk database, upload storage
//! - builders for PDF fixtures and worker configs

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
