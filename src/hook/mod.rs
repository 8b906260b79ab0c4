//! Hooks and hook sequencing
//!
//! A hook is anything that runs as part of a test: `beforeEach`/`afterEach`
//! functions and the test body itself.

mod doneable;

pub use doneable::{sequence, Done, Hook};
