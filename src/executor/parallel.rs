//! Multi-process test execution
//!
//! Tests are split into contiguous groups, one per worker. Each worker runs
//! its group with a [`ConcurrentRunner`](super::ConcurrentRunner) and reports
//! lifecycle messages; the parent replays them onto local placeholder tests
//! matched by full title.

use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::executor::DEFAULT_CONCURRENCY;
use crate::models::{Test, TestFailure, TestState};
use crate::report::EventSender;
use crate::worker::{
    ProtocolError, WorkerAssignment, WorkerEvent, WorkerLauncher, WorkerMessage, WorkerSignal,
};

/// Number of workers when none is configured
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(1)
}

/// Split `items` into `parts` contiguous groups of near-equal size.
///
/// The first `len % parts` groups get one extra item. Always returns `parts`
/// groups (at least one), some possibly empty.
pub fn partition<T: Clone>(items: &[T], parts: usize) -> Vec<Vec<T>> {
    let parts = parts.max(1);
    let base = items.len() / parts;
    let extra = items.len() % parts;

    let mut groups = Vec::with_capacity(parts);
    let mut start = 0;
    for index in 0..parts {
        let size = base + usize::from(index < extra);
        groups.push(items[start..start + size].to_vec());
        start += size;
    }
    groups
}

/// Tests ran, plus anything that went wrong between parent and workers
#[derive(Clone, Debug, Default)]
pub struct RunOutcome {
    pub tests: Vec<Test>,
    pub protocol_errors: Vec<ProtocolError>,
}

impl RunOutcome {
    pub fn new(tests: Vec<Test>) -> Self {
        Self {
            tests,
            protocol_errors: Vec::new(),
        }
    }
}

/// Fans tests out to worker processes
#[derive(Clone)]
pub struct ParallelRunner {
    parallelism: usize,
    child_concurrency: usize,
    default_timeout: Duration,
    idle_timeout: Option<Duration>,
    launcher: Arc<dyn WorkerLauncher>,
}

impl ParallelRunner {
    pub fn new(launcher: Arc<dyn WorkerLauncher>) -> Self {
        Self {
            parallelism: default_parallelism(),
            child_concurrency: DEFAULT_CONCURRENCY,
            default_timeout: crate::DEFAULT_TIMEOUT,
            idle_timeout: None,
            launcher,
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_child_concurrency(mut self, concurrency: usize) -> Self {
        self.child_concurrency = concurrency.max(1);
        self
    }

    /// Timeout workers use for tests without an explicit one.
    /// Must match the timeout the parent resolved with.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Kill a worker that sends nothing for this long
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn child_concurrency(&self) -> usize {
        self.child_concurrency
    }

    /// Run every test in a worker and wait for all workers to finish.
    ///
    /// Tests whose worker died or misbehaved stay pending; the cause is in
    /// [`RunOutcome::protocol_errors`].
    pub async fn run(&self, tests: Vec<Test>, events: &EventSender) -> RunOutcome {
        let groups = partition(&tests, self.parallelism);
        info!(
            "Running {} tests across {} workers",
            tests.len(),
            groups.iter().filter(|g| !g.is_empty()).count()
        );

        let supervisors = groups
            .into_iter()
            .enumerate()
            .filter(|(_, group)| !group.is_empty())
            .map(|(worker, group)| self.supervise(worker, group, events));
        let protocol_errors = join_all(supervisors).await.into_iter().flatten().collect();

        RunOutcome {
            tests,
            protocol_errors,
        }
    }

    async fn supervise(
        &self,
        worker: usize,
        group: Vec<Test>,
        events: &EventSender,
    ) -> Vec<ProtocolError> {
        let assignment = WorkerAssignment {
            worker,
            ordinals: group.iter().map(Test::ordinal).collect(),
            concurrency: self.child_concurrency,
            default_timeout_ms: self.default_timeout.as_millis() as u64,
        };
        let placeholders = Placeholders::new(worker, &group);

        let mut handle = match self.launcher.launch(assignment) {
            Ok(handle) => handle,
            Err(err) => {
                warn!("Worker {} failed to launch: {}", worker, err);
                return vec![ProtocolError::Launch {
                    worker,
                    reason: err.to_string(),
                }];
            }
        };

        let mut errors = Vec::new();
        loop {
            let signal = match self.idle_timeout {
                Some(idle) => match tokio::time::timeout(idle, handle.recv()).await {
                    Ok(signal) => signal,
                    Err(_) => {
                        handle.kill();
                        let pending = placeholders.pending();
                        if pending > 0 {
                            let error = ProtocolError::Unresponsive {
                                worker,
                                idle_ms: idle.as_millis() as u64,
                                pending,
                            };
                            warn!("{}", error);
                            errors.push(error);
                        }
                        break;
                    }
                },
                None => handle.recv().await,
            };

            match signal {
                Some(WorkerSignal::Message(message)) => {
                    if let Err(error) = placeholders.apply(message, events) {
                        warn!("{}", error);
                        errors.push(error);
                    }
                }
                Some(WorkerSignal::Output(line)) => info!("[worker {}] {}", worker, line),
                Some(WorkerSignal::Exited(status)) => {
                    debug!("Worker {} exited with {:?}", worker, status);
                    if let Some(error) = placeholders.exited(status) {
                        warn!("{}", error);
                        errors.push(error);
                    }
                    break;
                }
                None => {
                    if let Some(error) = placeholders.exited(None) {
                        warn!("{}", error);
                        errors.push(error);
                    }
                    break;
                }
            }
        }
        errors
    }
}

impl fmt::Debug for ParallelRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelRunner")
            .field("parallelism", &self.parallelism)
            .field("child_concurrency", &self.child_concurrency)
            .field("default_timeout", &self.default_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

/// Local stand-ins for one worker's tests, keyed by full title
struct Placeholders {
    worker: usize,
    by_title: HashMap<String, Vec<Test>>,
}

impl Placeholders {
    fn new(worker: usize, tests: &[Test]) -> Self {
        let mut by_title: HashMap<String, Vec<Test>> = HashMap::new();
        for test in tests {
            by_title
                .entry(test.full_title().to_string())
                .or_default()
                .push(test.clone());
        }
        Self { worker, by_title }
    }

    /// Replay a worker message onto the matching placeholder.
    ///
    /// Duplicate titles are matched to the first placeholder in a state
    /// that accepts the event.
    fn apply(&self, message: WorkerMessage, events: &EventSender) -> Result<(), ProtocolError> {
        let candidates =
            self.by_title
                .get(&message.full_name)
                .ok_or_else(|| ProtocolError::UnknownTest {
                    worker: self.worker,
                    full_name: message.full_name.clone(),
                })?;
        let unexpected = || ProtocolError::UnexpectedEvent {
            worker: self.worker,
            event: message.event,
            full_name: message.full_name.clone(),
        };

        let payload = message.payload.clone();
        match message.event {
            WorkerEvent::TestStarted => {
                let test = candidates
                    .iter()
                    .find(|t| !t.is_started())
                    .ok_or_else(unexpected)?;
                test.mark_started(payload.start_time.unwrap_or_else(Utc::now), events);
            }
            WorkerEvent::TestPassed | WorkerEvent::TestFailed => {
                let test = candidates
                    .iter()
                    .find(|t| t.state() == TestState::Running)
                    .ok_or_else(unexpected)?;
                let outcome = if message.event == WorkerEvent::TestPassed {
                    Ok(())
                } else {
                    Err(payload.error.unwrap_or_else(|| {
                        TestFailure::error("worker reported a failure without an error")
                    }))
                };
                test.settle(
                    outcome,
                    payload.finish_time.unwrap_or_else(Utc::now),
                    None,
                    events,
                );
            }
        }
        Ok(())
    }

    fn pending(&self) -> usize {
        self.by_title
            .values()
            .flatten()
            .filter(|t| !t.is_finished())
            .count()
    }

    fn exited(&self, status: Option<i32>) -> Option<ProtocolError> {
        let pending = self.pending();
        (pending > 0).then_some(ProtocolError::WorkerExited {
            worker: self.worker,
            status,
            pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::Suite;
    use crate::hook::Hook;
    use crate::report;
    use crate::worker::{InProcessLauncher, LaunchError, Payload, WorkerHandle};
    use std::sync::Mutex;
    use tokio::sync::{mpsc, oneshot};

    fn two_groups() -> Suite {
        Suite::new(|b| {
            b.describe("A", |b| {
                b.it("one", Hook::sync(|| Ok(())))?;
                b.it("two", Hook::sync(|| Ok(())))?;
                Ok(())
            })?;
            b.describe("B", |b| {
                b.it("three", Hook::sync(|| Ok(())))?;
                b.it("four", Hook::sync(|| anyhow::bail!("four is broken")))?;
                Ok(())
            })
        })
    }

    /// Launcher replaying canned signals. Channels stay open until the
    /// launcher is dropped, like a worker that stopped talking.
    struct Scripted {
        script: Box<dyn Fn(&WorkerAssignment) -> Vec<WorkerSignal> + Send + Sync>,
        channels: Mutex<Vec<(mpsc::UnboundedSender<WorkerSignal>, oneshot::Receiver<()>)>>,
    }

    impl Scripted {
        fn new<F>(script: F) -> Self
        where
            F: Fn(&WorkerAssignment) -> Vec<WorkerSignal> + Send + Sync + 'static,
        {
            Self {
                script: Box::new(script),
                channels: Mutex::new(Vec::new()),
            }
        }
    }

    impl WorkerLauncher for Scripted {
        fn launch(&self, assignment: WorkerAssignment) -> Result<WorkerHandle, LaunchError> {
            let (tx, rx) = mpsc::unbounded_channel();
            for signal in (self.script)(&assignment) {
                tx.send(signal).unwrap();
            }
            let (kill_tx, kill_rx) = oneshot::channel();
            self.channels.lock().unwrap().push((tx, kill_rx));
            Ok(WorkerHandle::new(rx, kill_tx))
        }
    }

    fn message(event: WorkerEvent, full_name: &str) -> WorkerSignal {
        WorkerSignal::Message(WorkerMessage {
            event,
            full_name: full_name.to_string(),
            payload: Payload::default(),
        })
    }

    #[test]
    fn test_partition_spreads_remainder() {
        let groups = partition(&[1, 2, 3, 4, 5, 6, 7], 3);
        assert_eq!(groups, vec![vec![1, 2, 3], vec![4, 5], vec![6, 7]]);

        let groups = partition(&[1, 2], 4);
        assert_eq!(groups, vec![vec![1], vec![2], vec![], vec![]]);

        assert_eq!(partition::<u8>(&[], 0), vec![Vec::<u8>::new()]);
    }

    #[tokio::test]
    async fn test_results_round_trip_from_workers() {
        let suite = two_groups();
        let tests = suite.tests(crate::DEFAULT_TIMEOUT).unwrap();
        let runner = ParallelRunner::new(Arc::new(InProcessLauncher::new(suite)))
            .with_parallelism(2)
            .with_child_concurrency(2);

        let (events, _rx) = report::channel();
        let outcome = runner.run(tests, &events).await;

        assert!(outcome.protocol_errors.is_empty());
        let passes = outcome.tests.iter().filter(|t| t.state().is_success()).count();
        assert_eq!(passes, 3);

        let failed: Vec<_> = outcome.tests.iter().filter_map(Test::error).collect();
        assert_eq!(failed, vec![TestFailure::error("four is broken")]);
        assert!(outcome.tests.iter().all(|t| t.duration().is_some()));
    }

    #[tokio::test]
    async fn test_crashed_worker_is_a_protocol_error() {
        let tests = two_groups().tests(crate::DEFAULT_TIMEOUT).unwrap();
        let launcher = Scripted::new(|assignment| {
            if assignment.worker == 1 {
                vec![message(WorkerEvent::TestStarted, "B three"), WorkerSignal::Exited(Some(101))]
            } else {
                vec![
                    message(WorkerEvent::TestStarted, "A one"),
                    message(WorkerEvent::TestPassed, "A one"),
                    message(WorkerEvent::TestStarted, "A two"),
                    message(WorkerEvent::TestPassed, "A two"),
                    WorkerSignal::Exited(Some(0)),
                ]
            }
        });
        let runner = ParallelRunner::new(Arc::new(launcher)).with_parallelism(2);

        let (events, _rx) = report::channel();
        let outcome = runner.run(tests, &events).await;

        assert_eq!(
            outcome.protocol_errors,
            vec![ProtocolError::WorkerExited {
                worker: 1,
                status: Some(101),
                pending: 2
            }]
        );
        assert_eq!(outcome.tests[2].state(), TestState::Running);
        assert_eq!(outcome.tests[3].state(), TestState::NotStarted);
        assert!(outcome.tests[..2].iter().all(|t| t.state().is_success()));
    }

    #[tokio::test]
    async fn test_unknown_and_out_of_order_messages() {
        let tests = two_groups().tests(crate::DEFAULT_TIMEOUT).unwrap();
        let launcher = Scripted::new(|_| {
            vec![
                message(WorkerEvent::TestPassed, "A one"),
                message(WorkerEvent::TestStarted, "Nobody knows"),
                message(WorkerEvent::TestStarted, "A one"),
                message(WorkerEvent::TestPassed, "A one"),
                message(WorkerEvent::TestStarted, "A two"),
                message(WorkerEvent::TestFailed, "A two"),
                WorkerSignal::Output("stray print".to_string()),
                WorkerSignal::Exited(Some(0)),
            ]
        });
        let runner = ParallelRunner::new(Arc::new(launcher)).with_parallelism(1);

        let (events, _rx) = report::channel();
        let outcome = runner.run(tests[..2].to_vec(), &events).await;

        assert_eq!(
            outcome.protocol_errors,
            vec![
                ProtocolError::UnexpectedEvent {
                    worker: 0,
                    event: WorkerEvent::TestPassed,
                    full_name: "A one".to_string()
                },
                ProtocolError::UnknownTest {
                    worker: 0,
                    full_name: "Nobody knows".to_string()
                },
            ]
        );
        assert!(outcome.tests[0].state().is_success());
        assert!(outcome.tests[1].error().is_some());
    }

    #[tokio::test]
    async fn test_silent_worker_times_out() {
        let tests = two_groups().tests(crate::DEFAULT_TIMEOUT).unwrap();
        let launcher = Scripted::new(|_| vec![message(WorkerEvent::TestStarted, "A one")]);
        let runner = ParallelRunner::new(Arc::new(launcher))
            .with_parallelism(1)
            .with_idle_timeout(Some(Duration::from_millis(20)));

        let (events, _rx) = report::channel();
        let outcome = runner.run(tests, &events).await;

        assert_eq!(
            outcome.protocol_errors,
            vec![ProtocolError::Unresponsive {
                worker: 0,
                idle_ms: 20,
                pending: 4
            }]
        );
    }

    #[tokio::test]
    async fn test_duplicate_titles_fill_in_order() {
        let suite = Suite::new(|b| {
            b.describe("Dup", |b| {
                b.it("same", Hook::sync(|| Ok(())))?;
                b.it("same", Hook::sync(|| anyhow::bail!("second copy")))?;
                Ok(())
            })
        });
        let tests = suite.tests(crate::DEFAULT_TIMEOUT).unwrap();
        let runner =
            ParallelRunner::new(Arc::new(InProcessLauncher::new(suite))).with_parallelism(1);

        let (events, _rx) = report::channel();
        let outcome = runner.run(tests, &events).await;

        assert!(outcome.protocol_errors.is_empty());
        assert!(outcome.tests.iter().all(|t| t.is_finished()));
    }
}
