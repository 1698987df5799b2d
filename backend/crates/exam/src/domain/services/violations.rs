//! Violation accounting

use crate::domain::entities::SessionRecord;
use crate::domain::value_objects::{TerminationCause, ViolationCategory, ViolationLimits};

/// Counts violations and applies their thresholds
///
/// Tab-switch and text-copy are compared one counter against one limit.
/// Every other category feeds the aggregate tampering sum.
#[derive(Debug, Clone, Copy)]
pub struct ViolationAccountant {
    limits: ViolationLimits,
}

impl ViolationAccountant {
    pub fn new(limits: ViolationLimits) -> Self {
        Self { limits }
    }

    /// Record one violation and terminate the session if a limit is reached
    ///
    /// An already violation-terminated session is left untouched. Returns
    /// the terminated-by-violations flag after the call.
    pub fn record(&self, record: &mut SessionRecord, category: ViolationCategory) -> bool {
        if record.terminated_by_violations() {
            return true;
        }

        let count = record.violations.increment(category);
        tracing::warn!(
            session_id = %record.id,
            category = %category,
            count,
            "Violation recorded"
        );

        if self.limit_reached(record, category) {
            tracing::warn!(
                session_id = %record.id,
                category = %category,
                "Violation limit reached, terminating exam"
            );
            record.mark_terminated(TerminationCause::Violations);
        }
        record.terminated_by_violations()
    }

    /// Aggregate tampering check
    pub fn is_over_limit(&self, record: &SessionRecord) -> bool {
        record.violations.tampering_total() >= self.limits.max_tampering
    }

    fn limit_reached(&self, record: &SessionRecord, category: ViolationCategory) -> bool {
        match category {
            ViolationCategory::TabSwitch => {
                record.violations.get(category) >= self.limits.max_tab_switch
            }
            ViolationCategory::TextCopy => {
                record.violations.get(category) >= self.limits.max_text_copy
            }
            _ => self.is_over_limit(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::ExamMode;

    fn accountant() -> ViolationAccountant {
        ViolationAccountant::new(ViolationLimits::default())
    }

    #[test]
    fn test_tab_switch_uses_own_limit() {
        let accountant = accountant();
        let mut record = SessionRecord::new(ExamMode::Rating, None, 0);

        assert!(!accountant.record(&mut record, ViolationCategory::TabSwitch));
        assert!(!accountant.record(&mut record, ViolationCategory::TabSwitch));
        assert!(accountant.record(&mut record, ViolationCategory::TabSwitch));
        assert_eq!(record.violations.get(ViolationCategory::TabSwitch), 3);
    }

    #[test]
    fn test_tampering_is_summed_across_categories() {
        let accountant = accountant();
        let mut record = SessionRecord::new(ExamMode::Rating, None, 0);

        assert!(!accountant.record(&mut record, ViolationCategory::DomTampering));
        // Different category, same aggregate: limit of 2 reached
        assert!(accountant.record(&mut record, ViolationCategory::ExternalContent));
    }

    #[test]
    fn test_tab_and_copy_do_not_feed_tampering_sum() {
        let accountant = accountant();
        let mut record = SessionRecord::new(ExamMode::Rating, None, 0);

        accountant.record(&mut record, ViolationCategory::TabSwitch);
        accountant.record(&mut record, ViolationCategory::TextCopy);
        assert!(!accountant.is_over_limit(&record));
        assert!(!accountant.record(&mut record, ViolationCategory::DevTools));
    }

    #[test]
    fn test_terminated_session_is_not_counted_further() {
        let accountant = accountant();
        let mut record = SessionRecord::new(ExamMode::Rating, None, 0);
        record.mark_terminated(TerminationCause::Violations);

        assert!(accountant.record(&mut record, ViolationCategory::TextCopy));
        assert_eq!(record.violations.get(ViolationCategory::TextCopy), 0);
    }
}
