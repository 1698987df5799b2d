//! Session cache
//!
//! The only writer of the session store. Everything else reads and
//! commits session records through this type.

use crate::domain::entities::SessionRecord;
use crate::domain::repository::SessionStore;
use crate::domain::value_objects::ExamMode;
use crate::error::{ExamError, ExamResult};
use kernel::id::{ExamSessionId, UserId};
use std::sync::Arc;

/// Live-session counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTotals {
    pub total: usize,
    pub free: usize,
    pub rating: usize,
    pub terminated: usize,
}

#[derive(Clone)]
pub struct ExamSessionCache {
    store: Arc<dyn SessionStore>,
}

impl ExamSessionCache {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Create and store a fresh record
    pub fn create(&self, mode: ExamMode, user_id: Option<UserId>, now_ms: i64) -> SessionRecord {
        let record = SessionRecord::new(mode, user_id, now_ms);
        self.store.put(record.clone());
        tracing::info!(
            session_id = %record.id,
            mode = %mode,
            authenticated = user_id.is_some(),
            "Exam session created"
        );
        record
    }

    /// Independent copy of a live record
    pub fn get(&self, id: &ExamSessionId) -> ExamResult<SessionRecord> {
        self.store.get(id).ok_or_else(|| {
            tracing::debug!(session_id = %id, "Exam session not in cache");
            ExamError::SessionNotFound
        })
    }

    pub fn find(&self, id: &ExamSessionId) -> Option<SessionRecord> {
        self.store.get(id)
    }

    /// Commit a modified record
    pub fn save(&self, record: SessionRecord) {
        self.store.put(record);
    }

    pub fn remove(&self, id: &ExamSessionId) -> Option<SessionRecord> {
        let removed = self.store.remove(id);
        if removed.is_some() {
            tracing::info!(session_id = %id, "Exam session removed");
        }
        removed
    }

    pub fn mode(&self, id: &ExamSessionId) -> Option<ExamMode> {
        self.store.mode(id)
    }

    pub fn snapshot(&self) -> Vec<SessionRecord> {
        self.store.snapshot()
    }

    pub fn totals(&self) -> SessionTotals {
        self.store
            .snapshot()
            .iter()
            .fold(SessionTotals::default(), |mut totals, record| {
                totals.total += 1;
                match record.mode {
                    ExamMode::Free => totals.free += 1,
                    ExamMode::Rating => totals.rating += 1,
                }
                if record.is_terminated() {
                    totals.terminated += 1;
                }
                totals
            })
    }

    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }
}
