//! Domain Entities
//!
//! Core business entities for the exam domain.

use crate::domain::value_objects::{
    Difficulty, ExamMode, TerminationCause, ViolationCategory,
};
use kernel::id::{ExamRequestId, ExamSessionId, UserId};
use std::collections::HashSet;

/// One answer option of a question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub id: i64,
    pub content: String,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

/// Question as served by the question bank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub options: Vec<AnswerOption>,
}

impl Question {
    pub fn option(&self, option_id: i64) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    pub fn correct_option(&self) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.is_correct)
    }
}

/// An answer given during a rated exam
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAnswer {
    /// Snapshot of the question as it was asked
    pub question: Question,
    pub chosen_option_id: i64,
    pub correct: bool,
    /// Seconds between issuing the question and the answer, millisecond precision
    pub time_to_answer_secs: f64,
}

/// Per-category violation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViolationCounters {
    counts: [u32; ViolationCategory::COUNT],
}

impl ViolationCounters {
    #[inline]
    pub fn get(&self, category: ViolationCategory) -> u32 {
        self.counts[category.index()]
    }

    /// Increment one counter, returning the new value
    pub fn increment(&mut self, category: ViolationCategory) -> u32 {
        let slot = &mut self.counts[category.index()];
        *slot = slot.saturating_add(1);
        *slot
    }

    /// Sum over all tampering-class categories
    pub fn tampering_total(&self) -> u32 {
        ViolationCategory::ALL
            .iter()
            .filter(|c| c.is_tampering_class())
            .map(|c| self.get(*c))
            .sum()
    }

    pub fn any(&self) -> bool {
        self.counts.iter().any(|&c| c > 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ViolationCategory, u32)> + '_ {
        ViolationCategory::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

/// Heartbeat protocol state
///
/// No stored token means the protocol was never initialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeartbeatState {
    pub token: Option<String>,
    pub last_heartbeat_ms: Option<i64>,
    pub next_expected_ms: Option<i64>,
    pub missed: u32,
}

impl HeartbeatState {
    pub fn is_initialized(&self) -> bool {
        self.token.is_some()
    }

    /// Store a freshly issued token and the next deadline
    pub fn rotate(&mut self, token: String, now_ms: i64, interval_ms: u64) {
        self.token = Some(token);
        self.last_heartbeat_ms = Some(now_ms);
        self.next_expected_ms = Some(now_ms.saturating_add(interval_ms as i64));
    }
}

/// Idempotency keys of the two progression calls
///
/// `next_*` is the only key the next call may carry; after a call it
/// moves to `last_*` so a retry can be recognised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestIds {
    pub last_question: Option<ExamRequestId>,
    pub next_question: Option<ExamRequestId>,
    pub last_answer_check: Option<ExamRequestId>,
    pub next_answer_check: Option<ExamRequestId>,
}

/// Mutable state of one exam attempt
///
/// Cloning is deep: the answer list and correct-ID set are owned values.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: ExamSessionId,
    pub user_id: Option<UserId>,
    pub mode: ExamMode,
    pub difficulty: Difficulty,
    pub started_at_ms: i64,

    pub last_question_id: Option<i64>,
    pub last_question_issued_ms: Option<i64>,
    pub correct_question_ids: HashSet<i64>,
    pub answers: Vec<RecordedAnswer>,

    /// Reset whenever the difficulty changes
    pub consecutive_success: u32,
    pub consecutive_fail: u32,
    /// Never reset
    pub total_success: u32,
    pub total_fail: u32,
    base_points: i64,

    pub requests: RequestIds,
    pub heartbeat: HeartbeatState,
    pub violations: ViolationCounters,

    terminated_by_violations: bool,
    terminated_by_fail_count: bool,
}

impl SessionRecord {
    /// Create a fresh record expecting its first next-question call
    pub fn new(mode: ExamMode, user_id: Option<UserId>, now_ms: i64) -> Self {
        Self {
            id: ExamSessionId::new(),
            user_id,
            mode,
            difficulty: Difficulty::MIN,
            started_at_ms: now_ms,
            last_question_id: None,
            last_question_issued_ms: None,
            correct_question_ids: HashSet::new(),
            answers: Vec::new(),
            consecutive_success: 0,
            consecutive_fail: 0,
            total_success: 0,
            total_fail: 0,
            base_points: 0,
            requests: RequestIds {
                next_question: Some(ExamRequestId::new()),
                ..RequestIds::default()
            },
            heartbeat: HeartbeatState::default(),
            violations: ViolationCounters::default(),
            terminated_by_violations: false,
            terminated_by_fail_count: false,
        }
    }

    #[inline]
    pub fn base_points(&self) -> i64 {
        self.base_points
    }

    /// Apply a point delta; the balance is floored at zero
    pub fn add_points(&mut self, delta: i64) {
        self.base_points = self.base_points.saturating_add(delta).max(0);
    }

    #[inline]
    pub fn terminated_by_violations(&self) -> bool {
        self.terminated_by_violations
    }

    #[inline]
    pub fn terminated_by_fail_count(&self) -> bool {
        self.terminated_by_fail_count
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.terminated_by_violations || self.terminated_by_fail_count
    }

    // Terminal flags can only be set, never cleared.
    pub fn mark_terminated(&mut self, cause: TerminationCause) {
        match cause {
            TerminationCause::Violations => self.terminated_by_violations = true,
            TerminationCause::FailCount => self.terminated_by_fail_count = true,
        }
    }

    pub fn answered(&self) -> u32 {
        self.total_success + self.total_fail
    }
}

/// Outcome of a finished exam
#[derive(Debug, Clone, PartialEq)]
pub struct ExamSummary {
    pub exam_id: ExamSessionId,
    pub mode: ExamMode,
    pub total_success: u32,
    pub total_fail: u32,
    /// Whole seconds, at least one
    pub duration_secs: i64,
    pub base_points: i64,
    /// Answers per second times ten, rounded to two decimals
    pub time_bonus: f64,
    pub score: i64,
    pub violations: ViolationCounters,
    pub heartbeat_missed: u32,
    pub termination: Option<TerminationCause>,
}

/// A finished exam handed to the result sink
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedExam {
    pub summary: ExamSummary,
    pub user_id: Option<UserId>,
    pub answers: Vec<RecordedAnswer>,
    /// Violation-terminated exams are kept out of the global rating
    pub eligible_for_leaderboard: bool,
}
