//! Doneable hooks
//!
//! A hook either signals completion by returning (synchronously or through a
//! future) or by invoking a [`Done`] callback it was handed. [`Hook::invoke`]
//! folds every calling convention into one asynchronous outcome.

use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tracing::trace;

use crate::models::TestFailure;

type SyncFn = dyn Fn() -> anyhow::Result<()> + Send + Sync;
type FutureFn = dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;
type CallbackFn = dyn Fn(Done) + Send + Sync;

/// A hook or test body
#[derive(Clone)]
pub enum Hook {
    /// Completes when the function returns
    Sync(Arc<SyncFn>),
    /// Completes when the returned future resolves
    Future(Arc<FutureFn>),
    /// Completes when the [`Done`] callback is invoked
    Callback(Arc<CallbackFn>),
}

impl Hook {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Hook::Sync(Arc::new(f))
    }

    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Hook::Future(Arc::new(move || f().boxed()))
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Done) + Send + Sync + 'static,
    {
        Hook::Callback(Arc::new(f))
    }

    /// Whether the hook takes a completion callback
    pub fn takes_done(&self) -> bool {
        matches!(self, Hook::Callback(_))
    }

    /// Run the hook to completion.
    ///
    /// Panics and errors never escape: they come back as a [`TestFailure`].
    /// Synchronous and callback hooks run on the blocking pool so a
    /// surrounding timeout can still fire while they block.
    pub async fn invoke(&self) -> Result<(), TestFailure> {
        match self {
            Hook::Sync(f) => {
                let f = Arc::clone(f);
                match tokio::task::spawn_blocking(move || f()).await {
                    Ok(result) => result.map_err(TestFailure::from_error),
                    Err(err) => Err(join_failure(err)),
                }
            }
            Hook::Future(f) => {
                let fut = match catch_unwind(AssertUnwindSafe(|| f())) {
                    Ok(fut) => fut,
                    Err(payload) => return Err(TestFailure::from_panic(payload)),
                };
                match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(result) => result.map_err(TestFailure::from_error),
                    Err(payload) => Err(TestFailure::from_panic(payload)),
                }
            }
            Hook::Callback(f) => {
                let (tx, rx) = oneshot::channel();
                let f = Arc::clone(f);
                let done = Done { tx };
                if let Err(err) = tokio::task::spawn_blocking(move || f(done)).await {
                    return Err(join_failure(err));
                }
                match rx.await {
                    Ok(result) => result,
                    Err(_) => Err(TestFailure::error(
                        "done callback was dropped without being called",
                    )),
                }
            }
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Hook::Sync(_) => "sync",
            Hook::Future(_) => "future",
            Hook::Callback(_) => "callback",
        };
        write!(f, "Hook({kind})")
    }
}

/// Completion callback handed to [`Hook::callback`] hooks.
///
/// Consumed on use, so completion can be signalled at most once.
pub struct Done {
    tx: oneshot::Sender<Result<(), TestFailure>>,
}

impl Done {
    /// Signal success
    pub fn ok(self) {
        self.finish(Ok(()));
    }

    /// Signal failure with a reason
    pub fn fail(self, reason: impl fmt::Display) {
        let failure = TestFailure::error(reason.to_string());
        self.finish(Err(failure));
    }

    /// Signal the outcome of a fallible operation
    pub fn result(self, result: anyhow::Result<()>) {
        self.finish(result.map_err(TestFailure::from_error));
    }

    fn finish(self, outcome: Result<(), TestFailure>) {
        // The receiver is gone once the test timed out
        if self.tx.send(outcome).is_err() {
            trace!("done called after the hook was abandoned");
        }
    }
}

impl fmt::Debug for Done {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Done")
    }
}

/// Run hooks one at a time in order, stopping at the first failure
pub async fn sequence(hooks: &[Hook]) -> Result<(), TestFailure> {
    for hook in hooks {
        hook.invoke().await?;
    }
    Ok(())
}

fn join_failure(err: JoinError) -> TestFailure {
    if err.is_panic() {
        TestFailure::from_panic(err.into_panic())
    } else {
        TestFailure::error("hook task was cancelled")
    }
}
