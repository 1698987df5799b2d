//! Start Exam Use Case
//!
//! Starting either resumes the user's live session of the same mode or
//! creates a new one, then serves its pending question through the
//! next-question flow.

use crate::application::config::ExamConfig;
use crate::application::locks::ExamLocks;
use crate::application::next_question::{NextQuestionInput, NextQuestionOutput, NextQuestionUseCase};
use crate::application::now_ms;
use crate::application::session_cache::ExamSessionCache;
use crate::domain::entities::SessionRecord;
use crate::domain::repository::{ExamRepository, UserDirectory};
use crate::domain::services::HeartbeatEngine;
use crate::domain::value_objects::ExamMode;
use crate::error::{ExamError, ExamResult};
use kernel::id::{ExamSessionId, UserId};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct StartExamInput {
    pub mode: ExamMode,
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone)]
pub struct StartExamOutput {
    pub exam_id: ExamSessionId,
    pub resumed: bool,
    pub next: NextQuestionOutput,
}

/// Start Exam Use Case
pub struct StartExamUseCase<R>
where
    R: ExamRepository,
{
    repo: Arc<R>,
    cache: ExamSessionCache,
    locks: Arc<ExamLocks>,
    config: Arc<ExamConfig>,
    heartbeat: Arc<HeartbeatEngine>,
}

impl<R> StartExamUseCase<R>
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

    pub async fn execute(&self, input: StartExamInput) -> ExamResult<StartExamOutput> {
        if self.config.rules(input.mode).requires_identity && input.user_id.is_none() {
            tracing::debug!(mode = %input.mode, "Anonymous start of an identified exam mode");
            return Err(ExamError::AuthenticationRequired);
        }

        let (record, resumed) = match self.resumable(input.user_id, input.mode).await? {
            Some(record) => (record, true),
            None => {
                let record = self.cache.create(input.mode, input.user_id, now_ms());
                if let Some(user_id) = input.user_id {
                    self.repo.set_unfinished_exam(&user_id, &record.id).await?;
                }
                (record, false)
            }
        };

        // Pending key if the question was not served yet, else replay it
        let request_id = record
            .requests
            .next_question
            .or(record.requests.last_question)
            .ok_or_else(|| ExamError::Internal("session without a question key".to_string()))?;

        if resumed {
            tracing::info!(session_id = %record.id, mode = %record.mode, "Exam session resumed");
        }

        let next = NextQuestionUseCase::new(
            self.repo.clone(),
            self.cache.clone(),
            self.locks.clone(),
            self.config.clone(),
            self.heartbeat.clone(),
        )
        .execute(NextQuestionInput {
            exam_id: record.id,
            request_id,
        })
        .await?;

        Ok(StartExamOutput {
            exam_id: record.id,
            resumed,
            next,
        })
    }

    /// The user's unfinished session, if it is still live and of the same mode
    async fn resumable(
        &self,
        user_id: Option<UserId>,
        mode: ExamMode,
    ) -> ExamResult<Option<SessionRecord>> {
        let Some(user_id) = user_id else {
            return Ok(None);
        };
        let Some(exam_id) = self.repo.unfinished_exam(&user_id).await? else {
            return Ok(None);
        };
        Ok(self.cache.find(&exam_id).filter(|record| record.mode == mode))
    }
}
