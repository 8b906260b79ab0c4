//! Parent/worker wire format
//!
//! One JSON object per line in each direction: the parent writes a single
//! [`WorkerAssignment`], the worker answers with [`WorkerMessage`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::TestFailure;
use crate::report::{TestEvent, TestEventKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkerEvent {
    TestStarted,
    TestPassed,
    TestFailed,
}

impl fmt::Display for WorkerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerEvent::TestStarted => write!(f, "testStarted"),
            WorkerEvent::TestPassed => write!(f, "testPassed"),
            WorkerEvent::TestFailed => write!(f, "testFailed"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TestFailure>,
}

/// A lifecycle event reported by a worker, keyed by full title
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerMessage {
    pub event: WorkerEvent,
    pub full_name: String,
    #[serde(default)]
    pub payload: Payload,
}

impl WorkerMessage {
    /// Translate a local event; `finished` has no wire counterpart
    pub fn from_event(event: &TestEvent) -> Option<Self> {
        let test = &event.test;
        let (kind, payload) = match event.kind {
            TestEventKind::Started => (
                WorkerEvent::TestStarted,
                Payload {
                    start_time: test.started_at(),
                    ..Default::default()
                },
            ),
            TestEventKind::Passed => (
                WorkerEvent::TestPassed,
                Payload {
                    start_time: test.started_at(),
                    finish_time: test.finished_at(),
                    error: None,
                },
            ),
            TestEventKind::Failed => (
                WorkerEvent::TestFailed,
                Payload {
                    start_time: test.started_at(),
                    finish_time: test.finished_at(),
                    error: test.error(),
                },
            ),
            TestEventKind::Finished => return None,
        };
        Some(Self {
            event: kind,
            full_name: test.full_title().to_string(),
            payload,
        })
    }

    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim())
    }
}

/// What a worker should run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerAssignment {
    pub worker: usize,
    /// Positions of the assigned tests in the resolved, unfiltered list
    pub ordinals: Vec<usize>,
    pub concurrency: usize,
    pub default_timeout_ms: u64,
}

impl WorkerAssignment {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input.trim())
    }
}
