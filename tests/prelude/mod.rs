//! Common imports for integration tests.
#![allow(unfulfilled_lint_expectations)]

#[expect(unused_imports, reason = "re-exporting common test utilities")]
pub use rstest::{fixture, rstest};
#[expect(unused_imports, reason = "re-exporting common test utilities")]
pub use tempfile::{TempDir, tempdir};

#[macro_use]
#[path = "../common/mod.rs"]
mod common;
#[expect(unused_imports, reason = "re-exporting common test utilities")]
pub use common::*;
