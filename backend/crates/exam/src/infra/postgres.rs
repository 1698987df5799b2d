//! PostgreSQL Repository Implementations

use crate::domain::entities::{AnswerOption, FinishedExam, Question};
use crate::domain::repository::{ExamResultSink, QuestionRepository, UserDirectory};
use crate::domain::value_objects::Difficulty;
use crate::error::{ExamError, ExamResult};
use kernel::id::{ExamSessionId, UserId};
use sqlx::PgPool;
use sqlx::types::Json;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// PostgreSQL-backed repository
#[derive(Clone)]
pub struct PgExamRepository {
    pool: PgPool,
}

impl PgExamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_options(&self, question_ids: &[i64]) -> ExamResult<HashMap<i64, Vec<AnswerOption>>> {
        let rows = sqlx::query_as::<_, OptionRow>(
            r#"
            SELECT option_id, question_id, content, is_correct, explanation
            FROM exam_question_options
            WHERE question_id = ANY($1)
            ORDER BY option_id
            "#,
        )
        .bind(question_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut options: HashMap<i64, Vec<AnswerOption>> = HashMap::new();
        for row in rows {
            options
                .entry(row.question_id)
                .or_default()
                .push(row.into_option());
        }
        Ok(options)
    }

    async fn assemble(&self, rows: Vec<QuestionRow>) -> ExamResult<Vec<Question>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.question_id).collect();
        let mut options = self.load_options(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let opts = options.remove(&row.question_id).unwrap_or_default();
                row.into_question(opts)
            })
            .collect()
    }
}

impl QuestionRepository for PgExamRepository {
    async fn find_by_id(&self, question_id: i64) -> ExamResult<Option<Question>> {
        let row = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT question_id, question_text, topic, difficulty
            FROM exam_questions
            WHERE question_id = $1
            "#,
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.assemble(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_difficulty(&self, difficulty: Difficulty) -> ExamResult<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT question_id, question_text, topic, difficulty
            FROM exam_questions
            WHERE difficulty = $1
            ORDER BY question_id
            "#,
        )
        .bind(difficulty.level() as i16)
        .fetch_all(&self.pool)
        .await?;

        self.assemble(rows).await
    }
}

impl ExamResultSink for PgExamRepository {
    async fn record(&self, exam: &FinishedExam) -> ExamResult<()> {
        let summary = &exam.summary;
        let violations: BTreeMap<&'static str, u32> = summary
            .violations
            .iter()
            .map(|(category, count)| (category.code(), count))
            .collect();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO exam_results (
                exam_id,
                user_id,
                mode,
                total_success,
                total_fail,
                duration_secs,
                base_points,
                time_bonus,
                score,
                heartbeat_missed,
                violations,
                termination,
                eligible_for_leaderboard
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(summary.exam_id.into_uuid())
        .bind(exam.user_id.map(UserId::into_uuid))
        .bind(summary.mode.code())
        .bind(summary.total_success as i32)
        .bind(summary.total_fail as i32)
        .bind(summary.duration_secs)
        .bind(summary.base_points)
        .bind(summary.time_bonus)
        .bind(summary.score)
        .bind(summary.heartbeat_missed as i32)
        .bind(Json(violations))
        .bind(summary.termination.map(|cause| format!("{cause:?}")))
        .bind(exam.eligible_for_leaderboard)
        .execute(&mut *tx)
        .await?;

        for (position, answer) in exam.answers.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO exam_result_answers (
                    exam_id,
                    position,
                    question_id,
                    difficulty,
                    chosen_option_id,
                    correct,
                    time_to_answer_secs
                ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(summary.exam_id.into_uuid())
            .bind(position as i32)
            .bind(answer.question.id)
            .bind(answer.question.difficulty.level() as i16)
            .bind(answer.chosen_option_id)
            .bind(answer.correct)
            .bind(answer.time_to_answer_secs)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            exam_id = %summary.exam_id,
            score = summary.score,
            answers = exam.answers.len(),
            "Exam result stored"
        );

        Ok(())
    }
}

impl UserDirectory for PgExamRepository {
    async fn unfinished_exam(&self, user_id: &UserId) -> ExamResult<Option<ExamSessionId>> {
        let exam_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT exam_id FROM exam_unfinished WHERE user_id = $1",
        )
        .bind(user_id.into_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(exam_id.map(ExamSessionId::from_uuid))
    }

    async fn set_unfinished_exam(
        &self,
        user_id: &UserId,
        exam_id: &ExamSessionId,
    ) -> ExamResult<()> {
        sqlx::query(
            r#"
            INSERT INTO exam_unfinished (user_id, exam_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET exam_id = EXCLUDED.exam_id, updated_at = now()
            "#,
        )
        .bind(user_id.into_uuid())
        .bind(exam_id.into_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_unfinished_exam(&self, user_id: &UserId) -> ExamResult<()> {
        sqlx::query("DELETE FROM exam_unfinished WHERE user_id = $1")
            .bind(user_id.into_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// Database row types

#[derive(sqlx::FromRow)]
struct QuestionRow {
    question_id: i64,
    question_text: String,
    topic: String,
    difficulty: i16,
}

impl QuestionRow {
    fn into_question(self, options: Vec<AnswerOption>) -> ExamResult<Question> {
        let difficulty = u8::try_from(self.difficulty)
            .ok()
            .and_then(Difficulty::new)
            .ok_or_else(|| {
                ExamError::Internal(format!(
                    "question {} has difficulty {} out of range",
                    self.question_id, self.difficulty
                ))
            })?;

        Ok(Question {
            id: self.question_id,
            text: self.question_text,
            topic: self.topic,
            difficulty,
            options,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OptionRow {
    option_id: i64,
    question_id: i64,
    content: String,
    is_correct: bool,
    explanation: Option<String>,
}

impl OptionRow {
    fn into_option(self) -> AnswerOption {
        AnswerOption {
            id: self.option_id,
            content: self.content,
            is_correct: self.is_correct,
            explanation: self.explanation,
        }
    }
}
