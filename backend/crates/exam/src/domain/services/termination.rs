//! Termination policy
//!
//! Pure decisions over a session's counters. Setting a flag goes through
//! [`SessionRecord::mark_terminated`], which never clears one.

use crate::domain::entities::SessionRecord;
use crate::domain::value_objects::TerminationCause;

#[derive(Debug, Clone, Copy)]
pub struct TerminationPolicy {
    max_heartbeat_missed: u32,
}

impl TerminationPolicy {
    pub fn new(max_heartbeat_missed: u32) -> Self {
        Self {
            max_heartbeat_missed,
        }
    }

    pub fn heartbeat_limit_reached(&self, record: &SessionRecord) -> bool {
        record.heartbeat.missed >= self.max_heartbeat_missed
    }

    /// Terminate by violations when the missed-heartbeat limit is reached
    pub fn apply_heartbeat_limit(&self, record: &mut SessionRecord) -> bool {
        if self.heartbeat_limit_reached(record) {
            if !record.terminated_by_violations() {
                tracing::warn!(
                    session_id = %record.id,
                    missed = record.heartbeat.missed,
                    limit = self.max_heartbeat_missed,
                    "Missed heartbeat limit reached, terminating exam"
                );
            }
            record.mark_terminated(TerminationCause::Violations);
            return true;
        }
        false
    }

    /// Terminate by fail count when the absolute wrong-answer limit is reached
    pub fn apply_fail_limit(record: &mut SessionRecord, limit: u32) -> bool {
        if record.total_fail >= limit {
            if !record.terminated_by_fail_count() {
                tracing::info!(
                    session_id = %record.id,
                    total_fail = record.total_fail,
                    limit,
                    "Wrong answer limit reached, terminating exam"
                );
            }
            record.mark_terminated(TerminationCause::FailCount);
            return true;
        }
        false
    }

    /// The one cause shown to the client; violations win over fail count
    pub fn surfaced_cause(record: &SessionRecord) -> Option<TerminationCause> {
        if record.terminated_by_violations() {
            Some(TerminationCause::Violations)
        } else if record.terminated_by_fail_count() {
            Some(TerminationCause::FailCount)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::ExamMode;

    #[test]
    fn test_heartbeat_limit_boundary() {
        let policy = TerminationPolicy::new(3);
        let mut record = SessionRecord::new(ExamMode::Rating, None, 0);

        record.heartbeat.missed = 2;
        assert!(!policy.apply_heartbeat_limit(&mut record));
        assert!(!record.is_terminated());

        record.heartbeat.missed = 3;
        assert!(policy.apply_heartbeat_limit(&mut record));
        assert!(record.terminated_by_violations());
    }

    #[test]
    fn test_fail_limit() {
        let mut record = SessionRecord::new(ExamMode::Rating, None, 0);
        record.total_fail = 4;
        assert!(!TerminationPolicy::apply_fail_limit(&mut record, 5));
        record.total_fail = 5;
        assert!(TerminationPolicy::apply_fail_limit(&mut record, 5));
        assert_eq!(
            TerminationPolicy::surfaced_cause(&record),
            Some(TerminationCause::FailCount)
        );
    }

    #[test]
    fn test_violations_take_precedence() {
        let mut record = SessionRecord::new(ExamMode::Rating, None, 0);
        assert_eq!(TerminationPolicy::surfaced_cause(&record), None);
        record.mark_terminated(TerminationCause::FailCount);
        record.mark_terminated(TerminationCause::Violations);
        assert_eq!(
            TerminationPolicy::surfaced_cause(&record),
            Some(TerminationCause::Violations)
        );
    }
}
