//! Worker launchers
//!
//! A launcher starts one worker for an assignment and hands back a
//! [`WorkerHandle`]: a stream of [`WorkerSignal`]s ending in `Exited`, plus
//! a kill switch.

use std::path::PathBuf;
use std::process::Stdio;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::dsl::Suite;
use crate::worker::{serve, WorkerAssignment, WorkerMessage};

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn worker process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("failed to encode worker assignment: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Something a running worker produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerSignal {
    Message(WorkerMessage),
    /// A stdout line that is not a message
    Output(String),
    /// The worker is gone; always the last signal
    Exited(Option<i32>),
}

/// Parent-side handle onto one worker.
///
/// Dropping the handle kills the worker.
#[derive(Debug)]
pub struct WorkerHandle {
    signals: mpsc::UnboundedReceiver<WorkerSignal>,
    kill: Option<oneshot::Sender<()>>,
}

impl WorkerHandle {
    pub fn new(signals: mpsc::UnboundedReceiver<WorkerSignal>, kill: oneshot::Sender<()>) -> Self {
        Self {
            signals,
            kill: Some(kill),
        }
    }

    /// Next signal; `None` once the worker's stream is closed
    pub async fn recv(&mut self) -> Option<WorkerSignal> {
        self.signals.recv().await
    }

    pub fn kill(&mut self) {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
    }
}

/// Starts workers. Must be called from within a tokio runtime.
pub trait WorkerLauncher: Send + Sync {
    fn launch(&self, assignment: WorkerAssignment) -> Result<WorkerHandle, LaunchError>;
}

/// Runs each worker as a child process speaking JSON lines.
///
/// The assignment is written to the child's stdin, which is then closed;
/// every stdout line is decoded as a [`WorkerMessage`].
#[derive(Clone, Debug)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Re-execute the running binary with the `worker` subcommand
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?).with_arg("worker"))
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(&self, assignment: WorkerAssignment) -> Result<WorkerHandle, LaunchError> {
        let input = assignment.to_json()?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;
        debug!(
            "Launched worker {} (pid {:?}) with {} tests",
            assignment.worker,
            child.id(),
            assignment.ordinals.len()
        );

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let (tx, rx) = mpsc::unbounded_channel();
        let (kill_tx, mut kill_rx) = oneshot::channel::<()>();
        let worker = assignment.worker;

        tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                if let Err(err) = stdin.write_all(input.as_bytes()).await {
                    warn!("Failed to send assignment to worker {}: {}", worker, err);
                }
            }

            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                loop {
                    tokio::select! {
                        line = lines.next_line() => match line {
                            Ok(Some(line)) => {
                                let signal = match WorkerMessage::parse(&line) {
                                    Ok(message) => WorkerSignal::Message(message),
                                    Err(_) => WorkerSignal::Output(line),
                                };
                                if tx.send(signal).is_err() {
                                    break;
                                }
                            }
                            Ok(None) => break,
                            Err(err) => {
                                warn!("Failed to read from worker {}: {}", worker, err);
                                break;
                            }
                        },
                        _ = &mut kill_rx => {
                            debug!("Killing worker {}", worker);
                            let _ = child.start_kill();
                            break;
                        }
                    }
                }
            }

            let status = match child.wait().await {
                Ok(status) => status.code(),
                Err(err) => {
                    warn!("Failed to wait for worker {}: {}", worker, err);
                    None
                }
            };
            let _ = tx.send(WorkerSignal::Exited(status));
        });

        Ok(WorkerHandle::new(rx, kill_tx))
    }
}

/// Runs each worker as a task in this process.
///
/// The suite is rebuilt per worker and every message still goes through
/// the JSON line codec, so behavior matches [`ProcessLauncher`].
#[derive(Clone, Debug)]
pub struct InProcessLauncher {
    suite: Suite,
}

impl InProcessLauncher {
    pub fn new(suite: Suite) -> Self {
        Self { suite }
    }
}

impl WorkerLauncher for InProcessLauncher {
    fn launch(&self, assignment: WorkerAssignment) -> Result<WorkerHandle, LaunchError> {
        let suite = self.suite.clone();
        let (tx, rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let messages = tx.clone();
            let work = serve(&suite, &assignment, move |message| {
                let line = message.to_line()?;
                let decoded = WorkerMessage::parse(&line)?;
                messages
                    .send(WorkerSignal::Message(decoded))
                    .map_err(|_| anyhow::anyhow!("parent stopped listening"))
            });

            let status = tokio::select! {
                result = work => match result {
                    Ok(()) => Some(0),
                    Err(err) => {
                        let _ = tx.send(WorkerSignal::Output(format!("{err:#}")));
                        Some(1)
                    }
                },
                _ = kill_rx => None,
            };
            let _ = tx.send(WorkerSignal::Exited(status));
        });

        Ok(WorkerHandle::new(rx, kill_tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::Hook;
    use crate::worker::WorkerEvent;

    #[tokio::test]
    async fn test_in_process_worker_reports_and_exits() {
        let suite = Suite::new(|b| {
            b.describe("Foo", |b| {
                b.it("bar", Hook::sync(|| Ok(())))?;
                Ok(())
            })
        });
        let launcher = InProcessLauncher::new(suite);
        let mut handle = launcher
            .launch(WorkerAssignment {
                worker: 0,
                ordinals: vec![0],
                concurrency: 1,
                default_timeout_ms: 1000,
            })
            .unwrap();

        let mut signals = Vec::new();
        while let Some(signal) = handle.recv().await {
            signals.push(signal);
        }
        assert_eq!(signals.len(), 3);
        assert!(matches!(
            &signals[0],
            WorkerSignal::Message(m) if m.event == WorkerEvent::TestStarted
        ));
        assert!(matches!(
            &signals[1],
            WorkerSignal::Message(m) if m.event == WorkerEvent::TestPassed && m.full_name == "Foo bar"
        ));
        assert_eq!(signals[2], WorkerSignal::Exited(Some(0)));
    }

    #[tokio::test]
    async fn test_in_process_worker_can_be_killed() {
        let suite = Suite::new(|b| {
            b.describe("Slow", |b| {
                b.it(
                    "sleeps",
                    Hook::future(|| async {
                        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                        Ok(())
                    }),
                )?;
                Ok(())
            })
        });
        let mut handle = InProcessLauncher::new(suite)
            .launch(WorkerAssignment {
                worker: 0,
                ordinals: vec![0],
                concurrency: 1,
                default_timeout_ms: 0,
            })
            .unwrap();

        assert!(matches!(handle.recv().await, Some(WorkerSignal::Message(_))));
        handle.kill();
        assert_eq!(handle.recv().await, Some(WorkerSignal::Exited(None)));
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_launch() {
        let launcher = ProcessLauncher::new("/nonexistent/rosespec-worker");
        let err = launcher
            .launch(WorkerAssignment {
                worker: 0,
                ordinals: vec![],
                concurrency: 1,
                default_timeout_ms: 0,
            })
            .unwrap_err();
        assert!(matches!(err, LaunchError::Spawn(_)));
    }
}
