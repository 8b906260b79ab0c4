//! Test failure model
//!
//! Failures are plain data so they survive the trip from a worker process to
//! the parent unchanged.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// What made a test fail
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// A hook or body returned an error
    #[default]
    Error,
    /// A hook or body panicked
    Panic,
    /// The test ran past its effective timeout
    Timeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Error => write!(f, "error"),
            FailureKind::Panic => write!(f, "panic"),
            FailureKind::Timeout => write!(f, "timeout"),
        }
    }
}

/// Terminal failure of a test
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct TestFailure {
    #[serde(default)]
    pub kind: FailureKind,
    pub message: String,
}

impl TestFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            format!("{kind} raised without a message")
        } else {
            message
        };
        Self { kind, message }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Error, message)
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("Timeout of {}ms exceeded", limit.as_millis()),
        )
    }

    /// Keep the whole context chain of an error in the message
    pub fn from_error(err: anyhow::Error) -> Self {
        Self::error(format!("{err:#}"))
    }

    /// Convert a panic payload, describing payloads that are not strings
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else if let Some(err) = payload.downcast_ref::<anyhow::Error>() {
            format!("{err:#}")
        } else {
            "panicked with a non-string payload".to_string()
        };
        Self::new(FailureKind::Panic, message)
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == FailureKind::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_failure() {
        let failure = TestFailure::timeout(Duration::from_millis(250));
        assert!(failure.is_timeout());
        assert_eq!(failure.to_string(), "Timeout of 250ms exceeded");
    }

    #[test]
    fn test_empty_message_is_normalized() {
        let failure = TestFailure::error("   ");
        assert_eq!(failure.message, "error raised without a message");
    }

    #[test]
    fn test_error_context_is_kept() {
        let err = anyhow::anyhow!("disk full").context("writing fixture");
        let failure = TestFailure::from_error(err);
        assert_eq!(failure.message, "writing fixture: disk full");
    }

    #[test]
    fn test_panic_payloads() {
        let failure = TestFailure::from_panic(Box::new("static"));
        assert_eq!(failure.message, "static");
        assert_eq!(failure.kind, FailureKind::Panic);

        let failure = TestFailure::from_panic(Box::new(String::from("owned")));
        assert_eq!(failure.message, "owned");

        let failure = TestFailure::from_panic(Box::new(7_i64));
        assert_eq!(failure.message, "panicked with a non-string payload");
    }

    #[test]
    fn test_serialized_shape() {
        let failure = TestFailure::error("boom");
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["message"], "boom");
        assert_eq!(json["kind"], "error");

        // `kind` is optional on the wire
        let parsed: TestFailure = serde_json::from_str(r#"{"message":"bare"}"#).unwrap();
        assert_eq!(parsed, TestFailure::error("bare"));
    }
}
