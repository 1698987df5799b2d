//! Repository Traits
//!
//! Interfaces for session storage and the exam's collaborators.
//! Implementations are in the infrastructure layer.

use crate::domain::entities::{FinishedExam, Question, SessionRecord};
use crate::domain::value_objects::{Difficulty, ExamMode};
use crate::error::ExamResult;
use kernel::id::{ExamSessionId, UserId};

/// Bounded, expiring container of live session records
///
/// Thread-safe on its own. Callers serialize read-modify-write cycles
/// with the session lock; the store only guards its own bookkeeping.
pub trait SessionStore: Send + Sync {
    /// Insert or replace a record, refreshing its expiry
    fn put(&self, record: SessionRecord);

    /// Independent copy of a live record
    fn get(&self, id: &ExamSessionId) -> Option<SessionRecord>;

    /// Mode of a live record without copying it
    fn mode(&self, id: &ExamSessionId) -> Option<ExamMode>;

    fn remove(&self, id: &ExamSessionId) -> Option<SessionRecord>;

    /// Copies of every live record
    fn snapshot(&self) -> Vec<SessionRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries, returning how many were removed
    fn purge_expired(&self) -> usize;
}

/// Question bank
#[trait_variant::make(QuestionRepository: Send)]
pub trait LocalQuestionRepository {
    /// Find a question with its options
    async fn find_by_id(&self, question_id: i64) -> ExamResult<Option<Question>>;

    /// All questions of one difficulty level
    async fn find_by_difficulty(&self, difficulty: Difficulty) -> ExamResult<Vec<Question>>;
}

/// Write-only sink for finished exams
#[trait_variant::make(ExamResultSink: Send)]
pub trait LocalExamResultSink {
    async fn record(&self, exam: &FinishedExam) -> ExamResult<()>;
}

/// Per-user pointer to the exam in progress
#[trait_variant::make(UserDirectory: Send)]
pub trait LocalUserDirectory {
    async fn unfinished_exam(&self, user_id: &UserId) -> ExamResult<Option<ExamSessionId>>;

    async fn set_unfinished_exam(&self, user_id: &UserId, exam_id: &ExamSessionId)
    -> ExamResult<()>;

    async fn clear_unfinished_exam(&self, user_id: &UserId) -> ExamResult<()>;
}

/// Everything the exam flows need from outside
pub trait ExamRepository:
    QuestionRepository + ExamResultSink + UserDirectory + Send + Sync + 'static
{
}

impl<T> ExamRepository for T where
    T: QuestionRepository + ExamResultSink + UserDirectory + Send + Sync + 'static
{
}
