//! Check Answer Use Case

use crate::application::config::ExamConfig;
use crate::application::locks::ExamLocks;
use crate::application::session_cache::ExamSessionCache;
use crate::application::{ExamProgress, now_ms};
use crate::domain::entities::{AnswerOption, SessionRecord};
use crate::domain::repository::{ExamRepository, QuestionRepository};
use crate::domain::services::{HeartbeatEngine, TerminationPolicy, scoring};
use crate::domain::value_objects::TerminationCause;
use crate::error::{ExamError, ExamResult};
use kernel::id::{ExamRequestId, ExamSessionId};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CheckAnswerInput {
    pub exam_id: ExamSessionId,
    pub request_id: ExamRequestId,
    pub selected_option_id: i64,
}

#[derive(Debug, Clone)]
pub struct CheckAnswerOutput {
    pub correct_option: AnswerOption,
    pub user_choice_correct: bool,
    /// Key the following next-question call must carry
    pub request_id: ExamRequestId,
    pub progress: ExamProgress,
    /// Set when this answer (or an earlier event) ended a rated exam
    pub termination: Option<TerminationCause>,
}

/// Check Answer Use Case
pub struct CheckAnswerUseCase<R>
where
    R: ExamRepository,
{
    repo: Arc<R>,
    cache: ExamSessionCache,
    locks: Arc<ExamLocks>,
    config: Arc<ExamConfig>,
    heartbeat: Arc<HeartbeatEngine>,
}

impl<R> CheckAnswerUseCase<R>
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

    pub async fn execute(&self, input: CheckAnswerInput) -> ExamResult<CheckAnswerOutput> {
        let now = now_ms();
        let _guard = self.locks.session(&input.exam_id).await;
        let mut record = self.cache.get(&input.exam_id)?;

        // No question issued yet, so no answer check can be expected
        let question_id = record.last_question_id.ok_or(ExamError::InvalidRequestId)?;
        let question = self
            .repo
            .find_by_id(question_id)
            .await?
            .ok_or(ExamError::QuestionNotFound(question_id))?;
        let chosen = question
            .option(input.selected_option_id)
            .ok_or(ExamError::AnswerNotFound(input.selected_option_id))?;
        let correct = chosen.is_correct;
        let correct_option = question.correct_option().cloned().ok_or_else(|| {
            ExamError::Internal(format!("question {question_id} has no correct option"))
        })?;

        if record.requests.last_answer_check == Some(input.request_id) {
            tracing::warn!(
                session_id = %record.id,
                request_id = %input.request_id,
                "Duplicate answer check, replaying verdict"
            );
            let request_id = record
                .requests
                .next_question
                .or(record.requests.last_question)
                .ok_or_else(|| ExamError::Internal("replay without a question key".to_string()))?;
            return Ok(CheckAnswerOutput {
                correct_option,
                user_choice_correct: correct,
                request_id,
                progress: ExamProgress::of(&record),
                termination: self.termination(&record),
            });
        }

        if record.requests.next_answer_check != Some(input.request_id) {
            tracing::warn!(
                session_id = %record.id,
                request_id = %input.request_id,
                "Unexpected answer-check request ID"
            );
            return Err(ExamError::InvalidRequestId);
        }

        scoring::apply_answer(&mut record, question.id, correct);

        let next_question_id = ExamRequestId::new();
        record.requests.last_answer_check = Some(input.request_id);
        record.requests.next_answer_check = None;
        record.requests.next_question = Some(next_question_id);

        if record.mode.is_monitored() {
            scoring::record_rated_answer(
                &mut record,
                &question,
                input.selected_option_id,
                correct,
                now,
            );
            let limit = self.config.rules(record.mode).fail_answers_absolute_limit;
            TerminationPolicy::apply_fail_limit(&mut record, limit);
            self.heartbeat.check_long_absence(&mut record, now);
        }

        tracing::info!(
            session_id = %record.id,
            question_id = question.id,
            correct,
            total_success = record.total_success,
            total_fail = record.total_fail,
            "Answer checked"
        );

        let output = CheckAnswerOutput {
            correct_option,
            user_choice_correct: correct,
            request_id: next_question_id,
            progress: ExamProgress::of(&record),
            termination: self.termination(&record),
        };
        self.cache.save(record);
        Ok(output)
    }

    fn termination(&self, record: &SessionRecord) -> Option<TerminationCause> {
        if record.mode.is_monitored() {
            TerminationPolicy::surfaced_cause(record)
        } else {
            None
        }
    }
}
