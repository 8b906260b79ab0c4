//! Run sessions
//!
//! Drives a runner while forwarding its events to a reporter, then computes
//! the final statistics.

use serde::Serialize;
use tracing::info;

use crate::executor::Strategy;
use crate::models::{Test, TestState};
use crate::report::{self, Reporter};
use crate::utils::timer::Timer;
use crate::worker::ProtocolError;

/// Aggregate counters of a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub duration_ms: u64,
    pub passes: usize,
    pub failures: usize,
    /// Selected tests that never settled
    pub pending: usize,
}

impl RunStats {
    pub fn from_tests(tests: &[Test], duration_ms: u64) -> Self {
        let mut stats = RunStats {
            duration_ms,
            ..Default::default()
        };
        for test in tests {
            match test.state() {
                TestState::Passed => stats.passes += 1,
                TestState::Failed(_) => stats.failures += 1,
                TestState::NotStarted | TestState::Running => stats.pending += 1,
            }
        }
        stats
    }

    pub fn total(&self) -> usize {
        self.passes + self.failures + self.pending
    }
}

/// Outcome of a whole run
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub tests: Vec<Test>,
    pub stats: RunStats,
    pub protocol_errors: Vec<ProtocolError>,
}

impl RunReport {
    pub fn new(tests: Vec<Test>, duration_ms: u64, protocol_errors: Vec<ProtocolError>) -> Self {
        let stats = RunStats::from_tests(&tests, duration_ms);
        Self {
            tests,
            stats,
            protocol_errors,
        }
    }

    /// Every test passed and no protocol problem occurred
    pub fn is_success(&self) -> bool {
        self.stats.failures == 0 && self.stats.pending == 0 && self.protocol_errors.is_empty()
    }

    pub fn failed_tests(&self) -> impl Iterator<Item = &Test> {
        self.tests.iter().filter(|t| t.error().is_some())
    }
}

/// Run `tests` with `strategy`, reporting as events arrive.
///
/// `all_finished` is called only after the event channel has closed, so
/// every `finished` precedes it.
pub async fn run_session(
    strategy: &Strategy,
    tests: Vec<Test>,
    reporter: &mut dyn Reporter,
) -> RunReport {
    info!("Running {} tests ({})", tests.len(), strategy);
    let timer = Timer::start("run");
    let (events, mut rx) = report::channel();

    let run = async move {
        let outcome = strategy.run(tests, &events).await;
        drop(events);
        outcome
    };
    let drain = async {
        while let Some(event) = rx.recv().await {
            reporter.on_event(&event);
        }
    };
    let (outcome, ()) = tokio::join!(run, drain);

    for error in &outcome.protocol_errors {
        reporter.protocol_error(error);
    }
    let report = RunReport::new(outcome.tests, timer.stop_ms(), outcome.protocol_errors);
    reporter.all_finished(&report);
    report
}
