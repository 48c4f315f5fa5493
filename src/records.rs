//! Submitted record store
//!
//! The client-side projection of server records. Writers update one record
//! at a time; readers either take a snapshot or subscribe to changes.

use crate::error::{Error, Result};
use crate::types::{Status, SubmittedRecord};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Shared collection of submitted records, in server order
#[derive(Debug, Clone)]
pub struct RecordStore {
    tx: Arc<watch::Sender<Vec<SubmittedRecord>>>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    /// Empty store
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    /// Store seeded with `records`
    pub fn with_records(records: Vec<SubmittedRecord>) -> Self {
        let (tx, _rx) = watch::channel(records);
        Self { tx: Arc::new(tx) }
    }

    /// Replace everything with a fresh server listing
    pub fn replace_all(&self, records: Vec<SubmittedRecord>) {
        debug!(count = records.len(), "Replacing record listing");
        self.tx.send_replace(records);
    }

    /// Insert a record, or replace the one with the same id
    ///
    /// New records go first, matching the newest-first server listing.
    pub fn insert(&self, record: SubmittedRecord) {
        self.tx.send_modify(|records| {
            if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
                *existing = record;
            } else {
                records.insert(0, record);
            }
        });
    }

    /// Record with `id`
    pub fn get(&self, id: u64) -> Option<SubmittedRecord> {
        self.tx.borrow().iter().find(|r| r.id == id).cloned()
    }

    /// Copy of every record
    pub fn snapshot(&self) -> Vec<SubmittedRecord> {
        self.tx.borrow().clone()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// Receive the full record list whenever it changes
    pub fn subscribe(&self) -> watch::Receiver<Vec<SubmittedRecord>> {
        self.tx.subscribe()
    }

    /// Write a new status for record `id`
    ///
    /// Only Pending -> terminal is legal, except that a synthetic `TimedOut`
    /// gives way to a later natural terminal status. Returns whether the
    /// record changed.
    pub fn apply_status(&self, id: u64, status: Status, error_count: Option<u32>) -> Result<bool> {
        let mut outcome = Err(Error::RecordNotFound(id));

        self.tx.send_if_modified(|records| {
            let Some(record) = records.iter_mut().find(|r| r.id == id) else {
                return false;
            };

            let error_count = error_count.unwrap_or(record.error_count);
            if record.status == status {
                let changed = record.error_count != error_count;
                record.error_count = error_count;
                outcome = Ok(changed);
                return changed;
            }

            if !is_legal_transition(record.status, status) {
                outcome = Err(Error::IllegalTransition {
                    id,
                    from: record.status,
                    to: status,
                });
                return false;
            }

            debug!(record_id = id, from = %record.status, to = %status, "Status updated");
            record.status = status;
            record.error_count = error_count;
            outcome = Ok(true);
            true
        });

        if let Err(e @ Error::IllegalTransition { .. }) = &outcome {
            warn!("{e}");
        }
        outcome
    }
}

const fn is_legal_transition(from: Status, to: Status) -> bool {
    match from {
        Status::Pending => to.is_terminal(),
        Status::TimedOut => to.is_terminal() && to.is_natural(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Quarter;
    use chrono::Utc;

    fn record(id: u64, status: Status) -> SubmittedRecord {
        SubmittedRecord {
            id,
            section: "Active Case Data".to_string(),
            quarter: Quarter::Q1,
            year: 2021,
            created_at: Utc::now(),
            submitted_by: "analyst@example.com".to_string(),
            file_name: format!("file-{id}.csv"),
            status,
            error_count: 0,
        }
    }

    #[test]
    fn test_insert_puts_new_records_first() {
        let store = RecordStore::with_records(vec![record(1, Status::Accepted)]);
        store.insert(record(2, Status::Pending));

        let ids: Vec<u64> = store.snapshot().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_insert_replaces_same_id() {
        let store = RecordStore::new();
        store.insert(record(1, Status::Pending));
        store.insert(record(1, Status::Pending));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_pending_to_terminal() {
        let store = RecordStore::with_records(vec![record(1, Status::Pending)]);
        assert!(store.apply_status(1, Status::AcceptedWithErrors, Some(3)).unwrap());

        let updated = store.get(1).unwrap();
        assert_eq!(updated.status, Status::AcceptedWithErrors);
        assert_eq!(updated.error_count, 3);
    }

    #[test]
    fn test_terminal_cannot_change() {
        let store = RecordStore::with_records(vec![record(1, Status::Accepted)]);
        let err = store.apply_status(1, Status::Rejected, None).unwrap_err();

        assert!(matches!(
            err,
            Error::IllegalTransition {
                id: 1,
                from: Status::Accepted,
                to: Status::Rejected
            }
        ));
        assert_eq!(store.get(1).unwrap().status, Status::Accepted);
    }

    #[test]
    fn test_terminal_cannot_return_to_pending() {
        let store = RecordStore::with_records(vec![record(1, Status::Rejected)]);
        assert!(store.apply_status(1, Status::Pending, None).is_err());
    }

    #[test]
    fn test_timed_out_is_overwritten_by_natural_status() {
        let store = RecordStore::with_records(vec![record(1, Status::Pending)]);
        store.apply_status(1, Status::TimedOut, None).unwrap();
        assert!(store.apply_status(1, Status::Accepted, None).unwrap());
        assert_eq!(store.get(1).unwrap().status, Status::Accepted);
    }

    #[test]
    fn test_same_status_is_noop() {
        let store = RecordStore::with_records(vec![record(1, Status::TimedOut)]);
        assert!(!store.apply_status(1, Status::TimedOut, None).unwrap());
    }

    #[test]
    fn test_unknown_record() {
        let store = RecordStore::new();
        assert!(matches!(
            store.apply_status(42, Status::Accepted, None),
            Err(Error::RecordNotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let store = RecordStore::with_records(vec![record(1, Status::Pending)]);
        let mut rx = store.subscribe();

        store.apply_status(1, Status::Accepted, None).unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow()[0].status, Status::Accepted);
    }

    #[tokio::test]
    async fn test_rejected_write_does_not_notify() {
        let store = RecordStore::with_records(vec![record(1, Status::Accepted)]);
        let rx = store.subscribe();

        let _ = store.apply_status(1, Status::Rejected, None);
        assert!(!rx.has_changed().unwrap());
    }
}
