//! Abort Exam Use Case
//!
//! Finishing is split in two: [`finalize`] runs under the session lock
//! and takes the record out of the cache; [`persist`] runs after the
//! lock is released and talks to the collaborators.

use crate::application::locks::ExamLocks;
use crate::application::now_ms;
use crate::application::session_cache::ExamSessionCache;
use crate::domain::entities::{ExamSummary, FinishedExam, SessionRecord};
use crate::domain::repository::{ExamRepository, ExamResultSink, UserDirectory};
use crate::domain::services::scoring;
use crate::domain::value_objects::ExamMode;
use crate::error::ExamResult;
use kernel::id::ExamSessionId;
use std::sync::Arc;

/// Summarize a record and drop it from the cache
pub(crate) fn finalize(cache: &ExamSessionCache, record: SessionRecord, now_ms: i64) -> FinishedExam {
    let summary = scoring::summarize(&record, now_ms);
    cache.remove(&record.id);

    tracing::info!(
        session_id = %record.id,
        mode = %record.mode,
        total_success = summary.total_success,
        total_fail = summary.total_fail,
        score = summary.score,
        terminated = record.is_terminated(),
        "Exam finished"
    );
    if record.violations.any() || record.heartbeat.missed > 0 {
        tracing::warn!(
            session_id = %record.id,
            violations = ?summary.violations,
            heartbeat_missed = summary.heartbeat_missed,
            "Exam finished with recorded violations"
        );
    }

    FinishedExam {
        eligible_for_leaderboard: !record.terminated_by_violations(),
        user_id: record.user_id,
        answers: record.answers,
        summary,
    }
}

/// Hand a finished exam to the collaborators; failures are only logged
pub(crate) async fn persist<R: ExamRepository>(repo: &R, finished: &FinishedExam) {
    if let Some(user_id) = finished.user_id {
        if let Err(e) = repo.clear_unfinished_exam(&user_id).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to clear unfinished exam");
        }
    }

    if finished.summary.mode != ExamMode::Rating {
        return;
    }
    if let Err(e) = repo.record(finished).await {
        tracing::error!(
            exam_id = %finished.summary.exam_id,
            error = %e,
            "Failed to store exam result"
        );
    }
}

#[derive(Debug, Clone)]
pub struct AbortExamInput {
    pub exam_id: ExamSessionId,
}

/// Abort Exam Use Case
pub struct AbortExamUseCase<R>
where
    R: ExamRepository,
{
    repo: Arc<R>,
    cache: ExamSessionCache,
    locks: Arc<ExamLocks>,
}

impl<R> AbortExamUseCase<R>
where
    R: ExamRepository,
{
    pub fn new(repo: Arc<R>, cache: ExamSessionCache, locks: Arc<ExamLocks>) -> Self {
        Self { repo, cache, locks }
    }

    pub async fn execute(&self, input: AbortExamInput) -> ExamResult<ExamSummary> {
        let finished = {
            let _guard = self.locks.session(&input.exam_id).await;
            let record = self.cache.get(&input.exam_id)?;
            finalize(&self.cache, record, now_ms())
        };

        persist(self.repo.as_ref(), &finished).await;
        Ok(finished.summary)
    }
}
