//! In-memory collaborators
//!
//! Used when no database is configured and in tests.

use crate::domain::entities::{AnswerOption, FinishedExam, Question};
use crate::domain::repository::{ExamResultSink, QuestionRepository, UserDirectory};
use crate::domain::value_objects::Difficulty;
use crate::error::ExamResult;
use kernel::id::{ExamSessionId, UserId};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
pub struct MemoryExamRepository {
    questions: RwLock<BTreeMap<i64, Question>>,
    results: Mutex<Vec<FinishedExam>>,
    unfinished: RwLock<HashMap<UserId, ExamSessionId>>,
}

impl MemoryExamRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_questions(questions: impl IntoIterator<Item = Question>) -> Self {
        let repo = Self::new();
        repo.seed(questions);
        repo
    }

    /// A small generated bank with `per_level` questions on every level
    pub fn sample(per_level: usize) -> Self {
        let mut questions = Vec::new();
        for level in Difficulty::MIN.level()..=Difficulty::MAX.level() {
            let difficulty = Difficulty::clamped(level as i32);
            for n in 0..per_level {
                let id = level as i64 * 1_000 + n as i64;
                questions.push(Question {
                    id,
                    text: format!("Sample question {n} (level {level})"),
                    topic: "sample".to_string(),
                    difficulty,
                    options: (0..4)
                        .map(|k| AnswerOption {
                            id: id * 10 + k,
                            content: format!("Option {k}"),
                            is_correct: k == 0,
                            explanation: (k == 0).then(|| "The first option is correct".to_string()),
                        })
                        .collect(),
                });
            }
        }
        Self::with_questions(questions)
    }

    pub fn seed(&self, questions: impl IntoIterator<Item = Question>) {
        let mut bank = self.questions.write();
        for question in questions {
            bank.insert(question.id, question);
        }
    }

    /// Finished exams handed to the sink so far
    pub fn recorded(&self) -> Vec<FinishedExam> {
        self.results.lock().clone()
    }
}

impl QuestionRepository for MemoryExamRepository {
    async fn find_by_id(&self, question_id: i64) -> ExamResult<Option<Question>> {
        Ok(self.questions.read().get(&question_id).cloned())
    }

    async fn find_by_difficulty(&self, difficulty: Difficulty) -> ExamResult<Vec<Question>> {
        Ok(self
            .questions
            .read()
            .values()
            .filter(|q| q.difficulty == difficulty)
            .cloned()
            .collect())
    }
}

impl ExamResultSink for MemoryExamRepository {
    async fn record(&self, exam: &FinishedExam) -> ExamResult<()> {
        self.results.lock().push(exam.clone());
        Ok(())
    }
}

impl UserDirectory for MemoryExamRepository {
    async fn unfinished_exam(&self, user_id: &UserId) -> ExamResult<Option<ExamSessionId>> {
        Ok(self.unfinished.read().get(user_id).copied())
    }

    async fn set_unfinished_exam(
        &self,
        user_id: &UserId,
        exam_id: &ExamSessionId,
    ) -> ExamResult<()> {
        self.unfinished.write().insert(*user_id, *exam_id);
        Ok(())
    }

    async fn clear_unfinished_exam(&self, user_id: &UserId) -> ExamResult<()> {
        self.unfinished.write().remove(user_id);
        Ok(())
    }
}
