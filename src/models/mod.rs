//! Data models for resolved tests
//!
//! Tests, their lifecycle state and the failures they settle with.

mod failure;

pub use failure::{FailureKind, TestFailure};
pub use test::{Test, TestSnapshot, TestState, TITLE_SEPARATOR};
