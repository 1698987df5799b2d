//! Progression and scoring rules

use crate::domain::entities::{ExamSummary, Question, RecordedAnswer, SessionRecord};
use crate::domain::services::termination::TerminationPolicy;
use crate::domain::value_objects::{Difficulty, ExamMode, ModeRules};

/// Difficulty for the next question, resetting the streak counters on change
pub fn adapt_difficulty(record: &mut SessionRecord, rules: &ModeRules) -> Difficulty {
    let current = record.difficulty;
    let next = if record.consecutive_success >= rules.success_answers_to_level_up {
        current.harder()
    } else if record.consecutive_fail >= rules.fail_answers_to_level_down {
        current.easier()
    } else {
        return current;
    };

    record.consecutive_success = 0;
    record.consecutive_fail = 0;
    tracing::debug!(
        session_id = %record.id,
        from = current.level(),
        to = next.level(),
        "Difficulty adapted"
    );
    next
}

/// Update streak and absolute counters for one answer
pub fn apply_answer(record: &mut SessionRecord, question_id: i64, correct: bool) {
    if correct {
        record.consecutive_success += 1;
        record.consecutive_fail = 0;
        record.total_success += 1;
        record.correct_question_ids.insert(question_id);
    } else {
        record.consecutive_fail += 1;
        record.consecutive_success = 0;
        record.total_fail += 1;
    }
}

/// Rated mode bookkeeping: keep the answer and move the base points
pub fn record_rated_answer(
    record: &mut SessionRecord,
    question: &Question,
    chosen_option_id: i64,
    correct: bool,
    now_ms: i64,
) {
    let issued_ms = record.last_question_issued_ms.unwrap_or(now_ms);
    record.answers.push(RecordedAnswer {
        question: question.clone(),
        chosen_option_id,
        correct,
        time_to_answer_secs: seconds_between(issued_ms, now_ms),
    });

    let points = question.difficulty.points();
    record.add_points(if correct { points } else { -points });
}

/// Elapsed seconds with millisecond precision
pub fn seconds_between(from_ms: i64, to_ms: i64) -> f64 {
    to_ms.saturating_sub(from_ms).max(0) as f64 / 1000.0
}

/// Round half away from zero to two decimals
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Final summary of a session at `now_ms`
///
/// Free practice reports counts only; score fields stay at zero.
pub fn summarize(record: &SessionRecord, now_ms: i64) -> ExamSummary {
    let duration_secs = (now_ms.saturating_sub(record.started_at_ms) / 1000).max(1);

    let (base_points, time_bonus, score) = match record.mode {
        ExamMode::Free => (0, 0.0, 0),
        ExamMode::Rating => {
            let bonus = round2(record.answered() as f64 / duration_secs as f64 * 10.0);
            let base = record.base_points();
            (base, bonus, (base as f64 * bonus) as i64)
        }
    };

    ExamSummary {
        exam_id: record.id,
        mode: record.mode,
        total_success: record.total_success,
        total_fail: record.total_fail,
        duration_secs,
        base_points,
        time_bonus,
        score,
        violations: record.violations,
        heartbeat_missed: record.heartbeat.missed,
        termination: TerminationPolicy::surfaced_cause(record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::AnswerOption;

    fn question(level: u8) -> Question {
        Question {
            id: 100 + level as i64,
            text: "q".to_string(),
            topic: "t".to_string(),
            difficulty: Difficulty::new(level).unwrap(),
            options: vec![AnswerOption {
                id: 1,
                content: "a".to_string(),
                is_correct: true,
                explanation: None,
            }],
        }
    }

    #[test]
    fn test_level_up_after_success_streak() {
        let rules = ModeRules::rating();
        let mut record = SessionRecord::new(ExamMode::Rating, None, 0);
        record.difficulty = Difficulty::new(4).unwrap();
        record.consecutive_success = rules.success_answers_to_level_up;

        assert_eq!(adapt_difficulty(&mut record, &rules).level(), 5);
        assert_eq!(record.consecutive_success, 0);
    }

    #[test]
    fn test_level_down_after_fail_streak_clamped() {
        let rules = ModeRules::rating();
        let mut record = SessionRecord::new(ExamMode::Rating, None, 0);
        record.consecutive_fail = rules.fail_answers_to_level_down;

        assert_eq!(adapt_difficulty(&mut record, &rules), Difficulty::MIN);
        assert_eq!(record.consecutive_fail, 0);
    }

    #[test]
    fn test_no_change_keeps_counters() {
        let rules = ModeRules::rating();
        let mut record = SessionRecord::new(ExamMode::Rating, None, 0);
        record.consecutive_success = 1;
        adapt_difficulty(&mut record, &rules);
        assert_eq!(record.consecutive_success, 1);
    }

    #[test]
    fn test_apply_answer_streaks() {
        let mut record = SessionRecord::new(ExamMode::Free, None, 0);
        apply_answer(&mut record, 5, true);
        apply_answer(&mut record, 6, true);
        apply_answer(&mut record, 7, false);
        assert_eq!(record.consecutive_success, 0);
        assert_eq!(record.consecutive_fail, 1);
        assert_eq!((record.total_success, record.total_fail), (2, 1));
        assert!(record.correct_question_ids.contains(&6));
        assert!(!record.correct_question_ids.contains(&7));
    }

    #[test]
    fn test_rated_answer_points_never_negative() {
        let mut record = SessionRecord::new(ExamMode::Rating, None, 0);
        record.last_question_issued_ms = Some(1_000);

        record_rated_answer(&mut record, &question(2), 1, true, 3_250);
        assert_eq!(record.base_points(), 20);
        assert_eq!(record.answers[0].time_to_answer_secs, 2.25);

        record_rated_answer(&mut record, &question(5), 1, false, 4_000);
        assert_eq!(record.base_points(), 0);
    }

    #[test]
    fn test_summary_score() {
        let mut record = SessionRecord::new(ExamMode::Rating, None, 0);
        record.total_success = 3;
        record.total_fail = 1;
        record.add_points(60);

        let summary = summarize(&record, 20_000);
        assert_eq!(summary.duration_secs, 20);
        assert_eq!(summary.time_bonus, 2.0);
        assert_eq!(summary.score, 120);
        assert_eq!(summary.termination, None);
    }

    #[test]
    fn test_summary_duration_at_least_one_second() {
        let record = SessionRecord::new(ExamMode::Rating, None, 10_000);
        let summary = summarize(&record, 10_200);
        assert_eq!(summary.duration_secs, 1);
    }

    #[test]
    fn test_free_summary_has_no_score() {
        let mut record = SessionRecord::new(ExamMode::Free, None, 0);
        record.total_success = 4;
        let summary = summarize(&record, 5_000);
        assert_eq!(summary.score, 0);
        assert_eq!(summary.total_success, 4);
    }
}
