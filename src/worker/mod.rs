//! Worker processes for the parallel runner
//!
//! Message contract, launchers and the worker-side entry point.

mod launcher;
mod message;
mod serve;

pub use launcher::{
    InProcessLauncher, LaunchError, ProcessLauncher, WorkerHandle, WorkerLauncher, WorkerSignal,
};
pub use message::{Payload, WorkerAssignment, WorkerEvent, WorkerMessage};
pub use serve::serve;

use serde::Serialize;
use thiserror::Error;

/// A problem between the parent and a worker.
///
/// Never attributed to a test: the tests involved stay pending.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProtocolError {
    #[error("worker {worker} reported unknown test \"{full_name}\"")]
    UnknownTest { worker: usize, full_name: String },

    #[error("worker {worker} sent {event} for \"{full_name}\" out of order")]
    UnexpectedEvent {
        worker: usize,
        event: WorkerEvent,
        full_name: String,
    },

    #[error("worker {worker} exited (status {status:?}) with {pending} tests unsettled")]
    WorkerExited {
        worker: usize,
        status: Option<i32>,
        pending: usize,
    },

    #[error("worker {worker} was silent for {idle_ms}ms with {pending} tests unsettled")]
    Unresponsive {
        worker: usize,
        idle_ms: u64,
        pending: usize,
    },

    #[error("worker {worker} could not be launched: {reason}")]
    Launch { worker: usize, reason: String },
}

impl ProtocolError {
    pub fn worker(&self) -> usize {
        match self {
            ProtocolError::UnknownTest { worker, .. }
            | ProtocolError::UnexpectedEvent { worker, .. }
            | ProtocolError::WorkerExited { worker, .. }
            | ProtocolError::Unresponsive { worker, .. }
            | ProtocolError::Launch { worker, .. } => *worker,
        }
    }
}
