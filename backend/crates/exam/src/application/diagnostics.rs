//! Diagnostics Use Case
//!
//! Read-only view of every live session record, for the debug endpoint.

use crate::application::session_cache::{ExamSessionCache, SessionTotals};
use crate::domain::entities::SessionRecord;

#[derive(Debug, Clone)]
pub struct DiagnosticsOutput {
    pub totals: SessionTotals,
    pub sessions: Vec<SessionRecord>,
}

pub struct DiagnosticsUseCase {
    cache: ExamSessionCache,
}

impl DiagnosticsUseCase {
    pub fn new(cache: ExamSessionCache) -> Self {
        Self { cache }
    }

    pub fn execute(&self) -> DiagnosticsOutput {
        let mut sessions = self.cache.snapshot();
        sessions.sort_by_key(|record| record.started_at_ms);
        let totals = self.cache.totals();
        tracing::debug!(total = totals.total, "Session diagnostics requested");
        DiagnosticsOutput { totals, sessions }
    }
}
