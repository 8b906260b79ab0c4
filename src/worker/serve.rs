//! Worker side of the parallel runner

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::debug;

use crate::dsl::Suite;
use crate::executor::ConcurrentRunner;
use crate::models::Test;
use crate::report;
use crate::worker::{WorkerAssignment, WorkerMessage};

/// Rebuild the suite, run the assigned tests and hand every lifecycle
/// message to `write`.
///
/// Returns once every assigned test has settled. If `write` fails, no
/// further tests are admitted and the error is returned right away; tests
/// already running finish in the background.
pub async fn serve<W>(suite: &Suite, assignment: &WorkerAssignment, mut write: W) -> Result<()>
where
    W: FnMut(WorkerMessage) -> Result<()>,
{
    let default_timeout = Duration::from_millis(assignment.default_timeout_ms);
    let tests = suite
        .tests(default_timeout)
        .context("Failed to build suite in worker")?;

    let assigned = assignment
        .ordinals
        .iter()
        .map(|&ordinal| {
            tests
                .get(ordinal)
                .cloned()
                .with_context(|| format!("Assigned test #{ordinal} does not exist"))
        })
        .collect::<Result<Vec<Test>>>()?;

    debug!(
        "Worker {} running {} tests (concurrency {})",
        assignment.worker,
        assigned.len(),
        assignment.concurrency
    );

    let runner = ConcurrentRunner::new(assignment.concurrency);
    let (events, mut rx) = report::channel();
    let run = async move {
        runner.run(assigned, &events).await;
        drop(events);
    };
    let forward = async {
        while let Some(event) = rx.recv().await {
            if let Some(message) = WorkerMessage::from_event(&event) {
                write(message)?;
            }
        }
        Ok::<(), anyhow::Error>(())
    };

    tokio::pin!(forward);

    tokio::select! {
        forwarded = &mut forward => return forwarded,
        () = run => {}
    }
    forward.await
}
