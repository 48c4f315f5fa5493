//! Bounded-retry status polling
//!
//! [`poll_until`] repeats a fetch until a predicate accepts the result, the
//! fetch fails, the attempt budget runs out, or the task is cancelled.
//! [`spawn_polling_task`] runs that loop on its own tokio task and hands the
//! outcome to a [`PollHandler`]. Nothing in here knows about data files;
//! [`StatusTracker`] binds the poller to submitted records.

mod tracker;

pub use tracker::StatusTracker;

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Attempt budget and spacing for one polling task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    max_attempts: u32,
    interval: Duration,
}

impl PollConfig {
    /// Create a config; `max_attempts` is raised to at least 1
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// Fetches made before giving up
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay between fetches
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Longest a task can wait between its first and last fetch
    pub fn budget(&self) -> Duration {
        self.interval * (self.max_attempts - 1)
    }
}

/// How a polling loop ended
#[derive(Debug)]
pub enum PollOutcome<T> {
    /// The predicate accepted a fetched value
    Terminal(T),
    /// A fetch failed; errors are never retried
    Failed(Error),
    /// Every attempt returned a non-terminal value
    Exhausted {
        /// Number of fetches made
        attempts: u32,
    },
    /// The cancellation token fired
    Cancelled,
}

impl<T> PollOutcome<T> {
    /// Whether the loop reached a terminal value
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

/// Poll `fetch` until `is_terminal` accepts its result
///
/// The first fetch happens immediately; later ones are spaced by
/// `config.interval()`. Exactly `config.max_attempts()` fetches are made
/// before [`PollOutcome::Exhausted`] is returned.
pub async fn poll_until<T, F, Fut, P>(
    mut fetch: F,
    is_terminal: P,
    config: PollConfig,
    cancel: &CancellationToken,
) -> PollOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&T) -> bool,
{
    let mut attempts = 0u32;

    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return PollOutcome::Cancelled,
            result = fetch() => result,
        };

        match result {
            Err(e) => return PollOutcome::Failed(e),
            Ok(value) if is_terminal(&value) => return PollOutcome::Terminal(value),
            Ok(_) => {}
        }

        attempts += 1;
        if attempts >= config.max_attempts {
            return PollOutcome::Exhausted { attempts };
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return PollOutcome::Cancelled,
            () = tokio::time::sleep(config.interval) => {}
        }
    }
}

/// Receives the outcome of a spawned polling task
///
/// Nothing is delivered for a cancelled task.
#[async_trait]
pub trait PollHandler<T: Send + Sync + 'static>: Send + Sync {
    /// The predicate accepted `result`
    async fn on_success(&self, target_id: u64, result: &T);

    /// A fetch failed
    async fn on_error(&self, target_id: u64, error: &Error);

    /// The attempt budget ran out
    async fn on_exhausted(&self, target_id: u64, attempts: u32);
}

/// A running polling loop for one target
///
/// Dropping the value detaches the task; call [`PollingTask::cancel`] to stop
/// it.
#[derive(Debug)]
pub struct PollingTask<T> {
    target_id: u64,
    cancel: CancellationToken,
    handle: JoinHandle<PollOutcome<T>>,
}

impl<T> PollingTask<T> {
    /// Id of the polled target
    pub const fn target_id(&self) -> u64 {
        self.target_id
    }

    /// Stop the task before its next fetch or delivery
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the task has finished running
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// A clone of the task's cancellation token
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the task and return how it ended
    pub async fn join(self) -> PollOutcome<T> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => PollOutcome::Cancelled,
            Err(e) => PollOutcome::Failed(Error::Internal(format!(
                "polling task for {} panicked: {e}",
                self.target_id
            ))),
        }
    }
}

/// Spawn [`poll_until`] for `target_id` and report the outcome to `handler`
pub fn spawn_polling_task<T, F, Fut, P, H>(
    target_id: u64,
    fetch: F,
    is_terminal: P,
    handler: Arc<H>,
    config: PollConfig,
) -> PollingTask<T>
where
    T: Send + Sync + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    P: Fn(&T) -> bool + Send + 'static,
    H: PollHandler<T> + ?Sized + 'static,
{
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let handle = tokio::spawn(async move {
        let outcome = poll_until(fetch, is_terminal, config, &token).await;

        // A task cancelled mid-fetch must not write into torn-down state.
        if token.is_cancelled() {
            debug!(target_id, "Polling cancelled");
            return PollOutcome::Cancelled;
        }

        match &outcome {
            PollOutcome::Terminal(value) => handler.on_success(target_id, value).await,
            PollOutcome::Failed(e) => handler.on_error(target_id, e).await,
            PollOutcome::Exhausted { attempts } => {
                handler.on_exhausted(target_id, *attempts).await;
            }
            PollOutcome::Cancelled => {}
        }
        outcome
    });

    PollingTask {
        target_id,
        cancel,
        handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn config(max_attempts: u32) -> PollConfig {
        PollConfig::new(max_attempts, Duration::from_millis(100))
    }

    #[test]
    fn test_config_clamps_attempts() {
        assert_eq!(PollConfig::new(0, Duration::ZERO).max_attempts(), 1);
        assert_eq!(config(5).budget(), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_exactly_max_attempts() {
        for max in [1, 2, 5] {
            let calls = AtomicU32::new(0);
            let outcome = poll_until(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, Error>(0u32) }
                },
                |_| false,
                config(max),
                &CancellationToken::new(),
            )
            .await;

            assert!(matches!(outcome, PollOutcome::Exhausted { attempts } if attempts == max));
            assert_eq!(calls.load(Ordering::SeqCst), max);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_terminal_value() {
        let calls = AtomicU32::new(0);
        let outcome = poll_until(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok::<_, Error>(n) }
            },
            |n| *n == 3,
            config(10),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(outcome, PollOutcome::Terminal(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let outcome: PollOutcome<u32> = poll_until(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::Transport("503".to_string())) }
            },
            |_| false,
            config(10),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(outcome, PollOutcome::Failed(Error::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = poll_until(|| async { Ok::<_, Error>(1) }, |_| true, config(3), &cancel).await;
        assert!(matches!(outcome, PollOutcome::Cancelled));
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PollHandler<u32> for Recorder {
        async fn on_success(&self, target_id: u64, result: &u32) {
            self.events
                .lock()
                .unwrap()
                .push(format!("success {target_id} {result}"));
        }

        async fn on_error(&self, target_id: u64, _error: &Error) {
            self.events.lock().unwrap().push(format!("error {target_id}"));
        }

        async fn on_exhausted(&self, target_id: u64, attempts: u32) {
            self.events
                .lock()
                .unwrap()
                .push(format!("exhausted {target_id} {attempts}"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_task_reports_to_handler() {
        let recorder = Arc::new(Recorder::default());
        let task = spawn_polling_task(7, || async { Ok(42u32) }, |_| true, recorder.clone(), config(3));

        assert_eq!(task.target_id(), 7);
        assert!(task.join().await.is_terminal());
        assert_eq!(*recorder.events.lock().unwrap(), vec!["success 7 42"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_task_reports_exhaustion() {
        let recorder = Arc::new(Recorder::default());
        let task = spawn_polling_task(8, || async { Ok(0u32) }, |_| false, recorder.clone(), config(4));

        assert!(matches!(task.join().await, PollOutcome::Exhausted { attempts: 4 }));
        assert_eq!(*recorder.events.lock().unwrap(), vec!["exhausted 8 4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_task_reports_nothing() {
        let recorder = Arc::new(Recorder::default());
        let task = spawn_polling_task(9, || async { Ok(0u32) }, |_| false, recorder.clone(), config(100));

        tokio::time::sleep(Duration::from_millis(250)).await;
        task.cancel();
        assert!(task.is_cancelled());
        assert!(matches!(task.join().await, PollOutcome::Cancelled));
        assert!(recorder.events.lock().unwrap().is_empty());
    }
}
