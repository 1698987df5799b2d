//! Application Layer - Use Cases
//!
//! This layer orchestrates domain logic, the session cache and the
//! collaborators. Every read-modify-write of a session record happens
//! under its session lock.

pub mod abort_exam;
pub mod check_answer;
pub mod config;
pub mod diagnostics;
pub mod locks;
pub mod next_question;
pub mod report_event;
pub mod session_cache;
pub mod start_exam;

use crate::domain::entities::SessionRecord;
use crate::domain::value_objects::{Difficulty, ExamMode};
use chrono::Utc;

/// Wall clock in Unix milliseconds
pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Progress figures shown to the client next to a question or verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamProgress {
    pub mode: ExamMode,
    pub difficulty: Difficulty,
    pub consecutive_success: u32,
    pub consecutive_fail: u32,
    pub total_success: u32,
    pub total_fail: u32,
    /// Only tracked in rated mode
    pub base_points: Option<i64>,
}

impl ExamProgress {
    pub fn of(record: &SessionRecord) -> Self {
        Self {
            mode: record.mode,
            difficulty: record.difficulty,
            consecutive_success: record.consecutive_success,
            consecutive_fail: record.consecutive_fail,
            total_success: record.total_success,
            total_fail: record.total_fail,
            base_points: record.mode.is_monitored().then(|| record.base_points()),
        }
    }
}
