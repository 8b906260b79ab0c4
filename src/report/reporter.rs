//! Reporter contract
//!
//! Presentation layers implement [`Reporter`]; every method has an empty
//! default so a reporter only overrides what it renders.

use tracing::{info, warn};

use crate::models::{Test, TestFailure};
use crate::report::{RunReport, TestEvent, TestEventKind};
use crate::worker::ProtocolError;

pub trait Reporter: Send {
    fn started(&mut self, _test: &Test) {}

    fn passed(&mut self, _test: &Test) {}

    fn failed(&mut self, _test: &Test, _failure: &TestFailure) {}

    fn finished(&mut self, _test: &Test) {}

    /// A runner-level problem that is not attributed to any test
    fn protocol_error(&mut self, _error: &ProtocolError) {}

    /// Fires once, after every test's `finished`
    fn all_finished(&mut self, _report: &RunReport) {}

    /// Route a lifecycle event to the matching callback
    fn on_event(&mut self, event: &TestEvent) {
        let test = &event.test;
        match event.kind {
            TestEventKind::Started => self.started(test),
            TestEventKind::Passed => self.passed(test),
            TestEventKind::Failed => {
                let failure = test
                    .error()
                    .unwrap_or_else(|| TestFailure::error("failed without a recorded error"));
                self.failed(test, &failure);
            }
            TestEventKind::Finished => self.finished(test),
        }
    }
}

/// Reports progress through `tracing`
#[derive(Debug, Default)]
pub struct LogReporter;

impl LogReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for LogReporter {
    fn started(&mut self, test: &Test) {
        info!("Running {}", test);
    }

    fn passed(&mut self, test: &Test) {
        let ms = test.duration().map(|d| d.as_millis()).unwrap_or_default();
        info!("  ✓ {} ({}ms)", test, ms);
    }

    fn failed(&mut self, test: &Test, failure: &TestFailure) {
        warn!("  ✗ {}: {} [{}]", test, failure, failure.kind);
    }

    fn protocol_error(&mut self, error: &ProtocolError) {
        warn!("Protocol error: {}", error);
    }

    fn all_finished(&mut self, report: &RunReport) {
        let stats = &report.stats;
        info!(
            "Run completed in {}ms - Pass: {} Fail: {} Pending: {}",
            stats.duration_ms, stats.passes, stats.failures, stats.pending
        );
    }
}

/// Fans events out to several reporters in order
#[derive(Default)]
pub struct MultiReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl MultiReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }
}

impl Reporter for MultiReporter {
    fn on_event(&mut self, event: &TestEvent) {
        for reporter in &mut self.reporters {
            reporter.on_event(event);
        }
    }

    fn protocol_error(&mut self, error: &ProtocolError) {
        for reporter in &mut self.reporters {
            reporter.protocol_error(error);
        }
    }

    fn all_finished(&mut self, report: &RunReport) {
        for reporter in &mut self.reporters {
            reporter.all_finished(report);
        }
    }
}
