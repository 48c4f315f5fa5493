//! Record status tracking
//!
//! Binds the generic poller to submitted records: one polling task per
//! record id, results written into the [`RecordStore`].

use crate::error::{Error, Result};
use crate::poll::{PollConfig, PollHandler, PollOutcome, PollingTask, spawn_polling_task};
use crate::records::RecordStore;
use crate::submit::{Alert, ProgressCallback};
use crate::transport::Transport;
use crate::types::{Status, StatusReport};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Advisory shown when polling gives up before the server finishes
pub const STILL_PROCESSING_MESSAGE: &str =
    "Your file is still being processed. Check back later for the final status.";

/// Shown when a status check fails
pub const STATUS_CHECK_FAILED_MESSAGE: &str =
    "We could not retrieve the status of your file. Please try again later.";

/// Writes poll outcomes into the record store
struct RecordUpdater {
    records: RecordStore,
    progress: Arc<dyn ProgressCallback>,
}

#[async_trait]
impl PollHandler<StatusReport> for RecordUpdater {
    async fn on_success(&self, target_id: u64, result: &StatusReport) {
        info!(record_id = target_id, status = %result.status, "Processing finished");
        match self
            .records
            .apply_status(target_id, result.status, result.error_count)
        {
            Ok(_) => self.progress.on_status(target_id, result.status).await,
            Err(e) => self.progress.on_error(&e).await,
        }
    }

    async fn on_error(&self, target_id: u64, error: &Error) {
        warn!(record_id = target_id, "Status check failed: {error}");
        self.progress.on_error(error).await;
        self.progress
            .on_alert(&Alert::error(STATUS_CHECK_FAILED_MESSAGE))
            .await;
    }

    async fn on_exhausted(&self, target_id: u64, attempts: u32) {
        info!(record_id = target_id, attempts, "Still pending, giving up");
        match self.records.apply_status(target_id, Status::TimedOut, None) {
            Ok(_) => {
                self.progress.on_status(target_id, Status::TimedOut).await;
                self.progress
                    .on_alert(&Alert::advisory(STILL_PROCESSING_MESSAGE))
                    .await;
            }
            Err(e) => self.progress.on_error(&e).await,
        }
    }
}

/// Keeps at most one live polling task per record
///
/// Dropping the tracker cancels every task it started.
pub struct StatusTracker {
    transport: Arc<dyn Transport>,
    handler: Arc<RecordUpdater>,
    config: PollConfig,
    tasks: Mutex<HashMap<u64, PollingTask<StatusReport>>>,
}

impl StatusTracker {
    /// Create a tracker writing into `records`
    pub fn new(
        transport: Arc<dyn Transport>,
        records: RecordStore,
        progress: Arc<dyn ProgressCallback>,
        config: PollConfig,
    ) -> Self {
        Self {
            transport,
            handler: Arc::new(RecordUpdater { records, progress }),
            config,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<u64, PollingTask<StatusReport>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Poll record `id` until it reaches a terminal status
    ///
    /// Returns false if a live task already polls this record.
    pub fn track(&self, id: u64) -> bool {
        let mut tasks = self.tasks();
        if tasks.get(&id).is_some_and(|t| !t.is_finished()) {
            debug!(record_id = id, "Already tracking");
            return false;
        }

        let transport = Arc::clone(&self.transport);
        let task = spawn_polling_task(
            id,
            move || {
                let transport = Arc::clone(&transport);
                async move { transport.get_status(id).await }
            },
            |report: &StatusReport| report.status.is_terminal(),
            Arc::clone(&self.handler),
            self.config,
        );

        debug!(record_id = id, "Tracking status");
        tasks.insert(id, task);
        true
    }

    /// Poll a record again, typically one that timed out
    ///
    /// Records already in a natural terminal status are not polled.
    pub fn refresh(&self, id: u64) -> Result<bool> {
        let record = self
            .handler
            .records
            .get(id)
            .ok_or(Error::RecordNotFound(id))?;

        if record.status.is_terminal() && record.status.is_natural() {
            return Ok(false);
        }
        Ok(self.track(id))
    }

    /// Whether a live task polls record `id`
    pub fn is_tracking(&self, id: u64) -> bool {
        self.tasks().get(&id).is_some_and(|t| !t.is_finished())
    }

    /// Number of live tasks
    pub fn live_count(&self) -> usize {
        let mut tasks = self.tasks();
        tasks.retain(|_, t| !t.is_finished());
        tasks.len()
    }

    /// Stop polling record `id`
    pub fn cancel(&self, id: u64) -> bool {
        let removed = self.tasks().remove(&id);
        match removed {
            Some(task) => {
                task.cancel();
                true
            }
            None => false,
        }
    }

    /// Stop every task
    pub fn cancel_all(&self) {
        for (_, task) in self.tasks().drain() {
            task.cancel();
        }
    }

    /// Wait for every task started so far
    pub async fn wait_all(&self) -> Vec<(u64, PollOutcome<StatusReport>)> {
        let tasks: Vec<PollingTask<StatusReport>> =
            self.tasks().drain().map(|(_, task)| task).collect();

        let mut outcomes = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = task.target_id();
            outcomes.push((id, task.join().await));
        }
        outcomes.sort_by_key(|(id, _)| *id);
        outcomes
    }
}

impl Drop for StatusTracker {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
