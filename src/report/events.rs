//! Lifecycle event plumbing
//!
//! Tests emit events onto an unbounded channel; the session drains it and
//! forwards each event to the reporter.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::models::Test;

/// Per-test lifecycle event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestEventKind {
    Started,
    Passed,
    Failed,
    Finished,
}

#[derive(Clone, Debug)]
pub struct TestEvent {
    pub kind: TestEventKind,
    pub test: Test,
}

/// Sending half of the event channel
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<TestEvent>,
}

pub type EventReceiver = mpsc::UnboundedReceiver<TestEvent>;

impl EventSender {
    pub fn emit(&self, kind: TestEventKind, test: &Test) {
        // Nobody listening is not an error for the test itself
        let _ = self.tx.send(TestEvent {
            kind,
            test: test.clone(),
        });
    }
}

/// Create a new event channel
pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, rx)
}
