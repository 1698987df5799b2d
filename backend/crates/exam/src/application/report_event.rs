//! Report Event Use Case
//!
//! Unified integrity endpoint. Each [`EventKind`] resolves to exactly one
//! [`EventStrategy`] through a [`StrategyTable`]; a kind without an entry
//! is a configuration error, distinct from an unknown wire tag (which is
//! already rejected when the request body is parsed).

use crate::application::locks::ExamLocks;
use crate::application::now_ms;
use crate::application::session_cache::ExamSessionCache;
use crate::domain::services::{HeartbeatEngine, HeartbeatOutcome, ViolationAccountant};
use crate::domain::value_objects::{EventKind, ViolationCategory};
use crate::error::{ExamError, ExamResult};
use kernel::id::ExamSessionId;
use platform::client::ClientKey;
use std::collections::HashMap;
use std::sync::Arc;

/// Handling applied to one event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStrategy {
    Heartbeat,
    /// Count one violation of the category and check its limit
    RecordViolation(ViolationCategory),
}

/// Event kind to strategy mapping
#[derive(Debug, Clone)]
pub struct StrategyTable(HashMap<EventKind, EventStrategy>);

impl StrategyTable {
    /// One entry per kind: heartbeat, or record-and-check of its category
    pub fn standard() -> Self {
        let table = EventKind::ALL
            .into_iter()
            .map(|kind| {
                let strategy = match kind.violation_category() {
                    Some(category) => EventStrategy::RecordViolation(category),
                    None => EventStrategy::Heartbeat,
                };
                (kind, strategy)
            })
            .collect();
        Self(table)
    }

    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    pub fn with(mut self, kind: EventKind, strategy: EventStrategy) -> Self {
        self.0.insert(kind, strategy);
        self
    }

    pub fn without(mut self, kind: EventKind) -> Self {
        self.0.remove(&kind);
        self
    }

    pub fn resolve(&self, kind: EventKind) -> ExamResult<EventStrategy> {
        self.0
            .get(&kind)
            .copied()
            .ok_or(ExamError::NoStrategyForEvent(kind))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone)]
pub struct ReportEventInput {
    pub exam_id: ExamSessionId,
    pub question_id: Option<i64>,
    pub token: Option<String>,
    pub kind: EventKind,
    pub client: ClientKey,
    pub timezone_offset: Option<i32>,
    pub timezone: Option<String>,
    pub client_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEventOutput {
    Heartbeat(HeartbeatOutcome),
    Violation { terminated: bool },
}

impl ReportEventOutput {
    /// Non-committal reply for an unmonitored session
    fn unmonitored(kind: EventKind) -> Self {
        match kind.violation_category() {
            None => Self::Heartbeat(HeartbeatOutcome::unmonitored()),
            Some(_) => Self::Violation { terminated: false },
        }
    }

    pub fn terminated(&self) -> bool {
        match self {
            Self::Heartbeat(outcome) => outcome.terminated,
            Self::Violation { terminated } => *terminated,
        }
    }
}

/// Report Event Use Case
pub struct ReportEventUseCase {
    cache: ExamSessionCache,
    locks: Arc<ExamLocks>,
    heartbeat: Arc<HeartbeatEngine>,
    accountant: ViolationAccountant,
    strategies: Arc<StrategyTable>,
}

impl ReportEventUseCase {
    pub fn new(
        cache: ExamSessionCache,
        locks: Arc<ExamLocks>,
        heartbeat: Arc<HeartbeatEngine>,
        accountant: ViolationAccountant,
        strategies: Arc<StrategyTable>,
    ) -> Self {
        Self {
            cache,
            locks,
            heartbeat,
            accountant,
            strategies,
        }
    }

    pub async fn execute(&self, input: ReportEventInput) -> ExamResult<ReportEventOutput> {
        let _client_guard = self.locks.client(&input.client).await;

        let mode = self
            .cache
            .mode(&input.exam_id)
            .ok_or(ExamError::SessionNotFound)?;
        if !mode.is_monitored() {
            return Ok(ReportEventOutput::unmonitored(input.kind));
        }

        let strategy = self.strategies.resolve(input.kind)?;
        if strategy == EventStrategy::Heartbeat && input.question_id.is_none() {
            return Err(ExamError::MalformedRequest(
                "questionId is required for this event".to_string(),
            ));
        }

        tracing::debug!(
            session_id = %input.exam_id,
            event = %input.kind,
            client = %input.client,
            timezone_offset = ?input.timezone_offset,
            timezone = ?input.timezone,
            client_time = ?input.client_time,
            "Integrity event received"
        );

        let _session_guard = self.locks.session(&input.exam_id).await;
        let mut record = self.cache.get(&input.exam_id)?;

        let output = match strategy {
            EventStrategy::Heartbeat => ReportEventOutput::Heartbeat(self.heartbeat.process(
                &mut record,
                input.token.as_deref(),
                input.question_id,
                now_ms(),
            )),
            EventStrategy::RecordViolation(category) => ReportEventOutput::Violation {
                terminated: self.accountant.record(&mut record, category),
            },
        };

        self.cache.save(record);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_covers_every_kind() {
        let table = StrategyTable::standard();
        assert_eq!(table.len(), EventKind::ALL.len());
        assert_eq!(
            table.resolve(EventKind::HeartBeat).unwrap(),
            EventStrategy::Heartbeat
        );
        assert_eq!(
            table.resolve(EventKind::AntiOcrTamp).unwrap(),
            EventStrategy::RecordViolation(ViolationCategory::AntiOcrTampering)
        );
    }

    #[test]
    fn test_missing_strategy_is_server_error() {
        let table = StrategyTable::standard().without(EventKind::DevTools);
        let err = table.resolve(EventKind::DevTools).unwrap_err();
        assert!(matches!(err, ExamError::NoStrategyForEvent(EventKind::DevTools)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_unmonitored_reply_shape() {
        assert_eq!(
            ReportEventOutput::unmonitored(EventKind::HeartBeat),
            ReportEventOutput::Heartbeat(HeartbeatOutcome::unmonitored())
        );
        assert_eq!(
            ReportEventOutput::unmonitored(EventKind::TabSwitch),
            ReportEventOutput::Violation { terminated: false }
        );
    }
}
