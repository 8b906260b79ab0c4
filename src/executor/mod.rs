//! Test execution engine
//!
//! Provides sequential, bounded-concurrency and multi-process runners.

mod concurrent;
mod parallel;

pub use concurrent::{ConcurrentRunner, SequentialRunner, DEFAULT_CONCURRENCY};
pub use parallel::{default_parallelism, partition, ParallelRunner, RunOutcome};

use std::fmt;

use crate::models::Test;
use crate::report::EventSender;

/// The runner selected for a run
#[derive(Clone, Debug)]
pub enum Strategy {
    Sequential(SequentialRunner),
    Concurrent(ConcurrentRunner),
    Parallel(ParallelRunner),
}

impl Strategy {
    pub async fn run(&self, tests: Vec<Test>, events: &EventSender) -> RunOutcome {
        match self {
            Strategy::Sequential(runner) => RunOutcome::new(runner.run(tests, events).await),
            Strategy::Concurrent(runner) => RunOutcome::new(runner.run(tests, events).await),
            Strategy::Parallel(runner) => runner.run(tests, events).await,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Sequential(_) => write!(f, "sequential"),
            Strategy::Concurrent(runner) => {
                write!(f, "concurrent, {} at a time", runner.concurrency())
            }
            Strategy::Parallel(runner) => write!(
                f,
                "parallel, {} workers x {}",
                runner.parallelism(),
                runner.child_concurrency()
            ),
        }
    }
}
