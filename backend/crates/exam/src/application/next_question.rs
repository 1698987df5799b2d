//! Next Question Use Case

use crate::application::abort_exam::{finalize, persist};
use crate::application::config::ExamConfig;
use crate::application::locks::ExamLocks;
use crate::application::session_cache::ExamSessionCache;
use crate::application::{ExamProgress, now_ms};
use crate::domain::entities::{ExamSummary, Question, SessionRecord};
use crate::domain::repository::{ExamRepository, QuestionRepository};
use crate::domain::services::{HeartbeatEngine, TerminationPolicy, scoring, selection};
use crate::domain::value_objects::{Difficulty, TerminationCause};
use crate::error::{ExamError, ExamResult};
use kernel::id::{ExamRequestId, ExamSessionId};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct NextQuestionInput {
    pub exam_id: ExamSessionId,
    pub request_id: ExamRequestId,
}

#[derive(Debug, Clone)]
pub enum NextQuestionOutput {
    Question {
        question: Question,
        /// Key the following answer check must carry
        request_id: ExamRequestId,
        progress: ExamProgress,
    },
    /// The exam ended; the record is gone
    Terminated {
        cause: TerminationCause,
        /// Results are only disclosed for fail-count terminations
        summary: Option<ExamSummary>,
    },
}

/// Next Question Use Case
pub struct NextQuestionUseCase<R>
where
    R: ExamRepository,
{
    repo: Arc<R>,
    cache: ExamSessionCache,
    locks: Arc<ExamLocks>,
    config: Arc<ExamConfig>,
    heartbeat: Arc<HeartbeatEngine>,
}

impl<R> NextQuestionUseCase<R>
where
    R: ExamRepository,
{
    pub fn new(
        repo: Arc<R>,
        cache: ExamSessionCache,
        locks: Arc<ExamLocks>,
        config: Arc<ExamConfig>,
        heartbeat: Arc<HeartbeatEngine>,
    ) -> Self {
        Self {
            repo,
            cache,
            locks,
            config,
            heartbeat,
        }
    }

    pub async fn execute(&self, input: NextQuestionInput) -> ExamResult<NextQuestionOutput> {
        let now = now_ms();
        let guard = self.locks.session(&input.exam_id).await;
        let mut record = self.cache.get(&input.exam_id)?;

        if record.mode.is_monitored() {
            if let Some(cause) = TerminationPolicy::surfaced_cause(&record) {
                tracing::warn!(session_id = %record.id, cause = ?cause, "Next question on terminated exam");
                let finished = finalize(&self.cache, record, now);
                drop(guard);
                persist(self.repo.as_ref(), &finished).await;
                return Ok(NextQuestionOutput::Terminated {
                    cause,
                    summary: (cause == TerminationCause::FailCount).then_some(finished.summary),
                });
            }
        }

        if record.requests.next_question != Some(input.request_id) {
            if record.requests.last_question == Some(input.request_id) {
                tracing::warn!(
                    session_id = %record.id,
                    request_id = %input.request_id,
                    "Duplicate next-question request, replaying"
                );
                return self.replay(&record).await;
            }
            tracing::warn!(
                session_id = %record.id,
                request_id = %input.request_id,
                "Unexpected next-question request ID"
            );
            return Err(ExamError::InvalidRequestId);
        }

        let rules = *self.config.rules(record.mode);
        let target = scoring::adapt_difficulty(&mut record, &rules);
        let question = self.select(&record, target).await?;

        let answer_check_id = ExamRequestId::new();
        record.requests.last_question = Some(input.request_id);
        record.requests.next_question = None;
        record.requests.next_answer_check = Some(answer_check_id);
        record.last_question_id = Some(question.id);
        record.last_question_issued_ms = Some(now);
        record.difficulty = question.difficulty;

        if record.mode.is_monitored() {
            self.heartbeat.check_long_absence(&mut record, now);
        }

        tracing::info!(
            session_id = %record.id,
            question_id = question.id,
            difficulty = question.difficulty.level(),
            "Question issued"
        );

        let progress = ExamProgress::of(&record);
        self.cache.save(record);

        Ok(NextQuestionOutput::Question {
            question,
            request_id: answer_check_id,
            progress,
        })
    }

    /// Same question again, without advancing the record
    async fn replay(&self, record: &SessionRecord) -> ExamResult<NextQuestionOutput> {
        let question_id = record
            .last_question_id
            .ok_or_else(|| ExamError::Internal("replay without an issued question".to_string()))?;
        let question = self
            .repo
            .find_by_id(question_id)
            .await?
            .ok_or(ExamError::QuestionNotFound(question_id))?;
        let request_id = record
            .requests
            .next_answer_check
            .or(record.requests.last_answer_check)
            .ok_or_else(|| ExamError::Internal("replay without an answer-check key".to_string()))?;

        Ok(NextQuestionOutput::Question {
            question,
            request_id,
            progress: ExamProgress::of(record),
        })
    }

    /// Nearest level with questions, skipping already solved ones
    async fn select(&self, record: &SessionRecord, target: Difficulty) -> ExamResult<Question> {
        for level in selection::search_order(target) {
            let candidates = self.repo.find_by_difficulty(level).await?;
            if candidates.is_empty() {
                continue;
            }
            let picked = selection::pick(
                candidates,
                record.last_question_id,
                &record.correct_question_ids,
                &mut rand::rng(),
            );
            if let Some(question) = picked {
                if level != target {
                    tracing::debug!(
                        session_id = %record.id,
                        target = target.level(),
                        served = level.level(),
                        "No questions at target difficulty, using nearest level"
                    );
                }
                return Ok(question);
            }
        }
        Err(ExamError::NoQuestions)
    }
}
