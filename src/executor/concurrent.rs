//! In-process runners
//!
//! A bounded worker pool: at most `concurrency` tests run at once and a
//! queued test is admitted whenever a running one settles.

use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::VecDeque;
use tracing::debug;

use crate::models::Test;
use crate::report::EventSender;

/// Default number of tests running at once within one process
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Bounded-concurrency runner
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConcurrentRunner {
    concurrency: usize,
}

impl ConcurrentRunner {
    /// A level of 0 is treated as 1
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every test and return them once all have settled.
    ///
    /// Completion order is unspecified; queued tests are admitted in input
    /// order.
    pub async fn run(&self, tests: Vec<Test>, events: &EventSender) -> Vec<Test> {
        let split = self.concurrency.min(tests.len());
        let mut queue: VecDeque<Test> = tests[split..].iter().cloned().collect();
        let mut running = FuturesUnordered::new();

        for test in &tests[..split] {
            debug!("Admitting {}", test);
            running.push(test.run(events));
        }

        while running.next().await.is_some() {
            if let Some(test) = queue.pop_front() {
                debug!("Admitting {} ({} queued)", test, queue.len());
                running.push(test.run(events));
            }
        }
        tests
    }
}

impl Default for ConcurrentRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

/// One test at a time, each started after the previous one settled
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequentialRunner;

impl SequentialRunner {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self, tests: Vec<Test>, events: &EventSender) -> Vec<Test> {
        ConcurrentRunner::new(1).run(tests, events).await
    }
}
