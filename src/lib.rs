//! rosespec: a BDD test engine
//!
//! Suites are written with `describe`/`it`/`before_each`/`after_each` on a
//! [`Builder`], resolved into independent [`Test`]s and run sequentially,
//! with bounded concurrency or across worker processes.
//!
//! ```no_run
//! use rosespec::{Hook, Suite};
//!
//! fn main() -> std::process::ExitCode {
//!     rosespec::run(Suite::new(|b| {
//!         b.describe("Math", |b| {
//!             b.it("adds", Hook::sync(|| {
//!                 anyhow::ensure!(1 + 1 == 2, "addition broke");
//!                 Ok(())
//!             }))?;
//!             Ok(())
//!         })
//!     }))
//! }
//! ```

use std::time::Duration;

pub mod cli;
pub mod config;
pub mod dsl;
pub mod executor;
pub mod hook;
pub mod models;
pub mod output;
pub mod report;
pub mod resolve;
pub mod tree;
pub mod utils;
pub mod worker;

mod harness;

pub use dsl::{Builder, CaseHandle, DslError, Suite};
pub use executor::{ConcurrentRunner, ParallelRunner, RunOutcome, SequentialRunner, Strategy};
pub use harness::run;
pub use hook::{Done, Hook};
pub use models::{FailureKind, Test, TestFailure, TestState};
pub use report::{run_session, Reporter, RunReport, RunStats};
pub use resolve::{resolve, Selection};

/// Timeout for tests when no group or case sets one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);
