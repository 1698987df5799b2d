//! API DTOs (Data Transfer Objects)

use crate::application::ExamProgress;
use crate::application::check_answer::CheckAnswerOutput;
use crate::application::diagnostics::DiagnosticsOutput;
use crate::application::next_question::NextQuestionOutput;
use crate::application::report_event::ReportEventOutput;
use crate::application::session_cache::SessionTotals;
use crate::application::start_exam::StartExamOutput;
use crate::domain::entities::{
    AnswerOption, ExamSummary, Question, SessionRecord, ViolationCounters,
};
use crate::domain::services::HeartbeatOutcome;
use crate::domain::value_objects::{EventKind, ExamMode, TerminationCause};
use kernel::id::{ExamRequestId, ExamSessionId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request for POST /api/exam/start
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub mode: ExamMode,
}

/// Request for POST /api/exam/next
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextRequest {
    pub exam_id: ExamSessionId,
    pub request_id: ExamRequestId,
}

/// Request for POST /api/exam/answer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub exam_id: ExamSessionId,
    pub request_id: ExamRequestId,
    pub answer_id: i64,
}

/// Request for POST /api/exam/abort
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortRequest {
    pub exam_id: ExamSessionId,
}

/// Request for POST /api/exam/ui-feedback/status
///
/// `eventType` carries a wire tag; unknown tags fail deserialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedRequest {
    pub exam_id: ExamSessionId,
    #[serde(default)]
    pub question_id: Option<i64>,
    #[serde(default)]
    pub token: Option<String>,
    pub event_type: EventKind,
    #[serde(default)]
    pub timezone_offset: Option<i32>,
    #[serde(default)]
    pub timezone_string: Option<String>,
    #[serde(default)]
    pub client_time: Option<i64>,
}

/// Heartbeat-class reply; absent values are sent as `null`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    pub next_token: Option<String>,
    pub terminated: bool,
    pub challenge: Option<String>,
}

impl From<HeartbeatOutcome> for HeartbeatResponse {
    fn from(outcome: HeartbeatOutcome) -> Self {
        Self {
            next_token: outcome.next_token,
            terminated: outcome.terminated,
            challenge: outcome.challenge,
        }
    }
}

/// Violation-class reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViolationResponse {
    pub terminated: bool,
}

/// Response for POST /api/exam/ui-feedback/status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventResponse {
    Heartbeat(HeartbeatResponse),
    Violation(ViolationResponse),
}

impl From<ReportEventOutput> for EventResponse {
    fn from(output: ReportEventOutput) -> Self {
        match output {
            ReportEventOutput::Heartbeat(outcome) => Self::Heartbeat(outcome.into()),
            ReportEventOutput::Violation { terminated } => {
                Self::Violation(ViolationResponse { terminated })
            }
        }
    }
}

/// Answer option without its correctness flag
#[derive(Debug, Clone, Serialize)]
pub struct OptionDto {
    pub id: i64,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionDto {
    pub id: i64,
    pub text: String,
    pub topic: String,
    pub difficulty: u8,
    pub options: Vec<OptionDto>,
}

impl From<Question> for QuestionDto {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            text: question.text,
            topic: question.topic,
            difficulty: question.difficulty.level(),
            options: question
                .options
                .into_iter()
                .map(|o| OptionDto {
                    id: o.id,
                    content: o.content,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDto {
    pub mode: ExamMode,
    pub difficulty: u8,
    pub consecutive_success: u32,
    pub consecutive_fail: u32,
    pub total_success: u32,
    pub total_fail: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_points: Option<i64>,
}

impl From<ExamProgress> for ProgressDto {
    fn from(p: ExamProgress) -> Self {
        Self {
            mode: p.mode,
            difficulty: p.difficulty.level(),
            consecutive_success: p.consecutive_success,
            consecutive_fail: p.consecutive_fail,
            total_success: p.total_success,
            total_fail: p.total_fail,
            base_points: p.base_points,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDto {
    pub exam_id: ExamSessionId,
    pub mode: ExamMode,
    pub total_success: u32,
    pub total_fail: u32,
    pub duration_secs: i64,
    pub base_points: i64,
    pub time_bonus: f64,
    pub score: i64,
    pub violations: BTreeMap<&'static str, u32>,
    pub heartbeat_missed: u32,
    pub termination: Option<TerminationCause>,
}

impl From<ExamSummary> for SummaryDto {
    fn from(s: ExamSummary) -> Self {
        Self {
            exam_id: s.exam_id,
            mode: s.mode,
            total_success: s.total_success,
            total_fail: s.total_fail,
            duration_secs: s.duration_secs,
            base_points: s.base_points,
            time_bonus: s.time_bonus,
            score: s.score,
            violations: violation_map(&s.violations),
            heartbeat_missed: s.heartbeat_missed,
            termination: s.termination,
        }
    }
}

/// Response for POST /api/exam/next
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextQuestionResponse {
    pub terminated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<ExamRequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<TerminationCause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryDto>,
}

impl From<NextQuestionOutput> for NextQuestionResponse {
    fn from(output: NextQuestionOutput) -> Self {
        match output {
            NextQuestionOutput::Question {
                question,
                request_id,
                progress,
            } => Self {
                terminated: false,
                question: Some(question.into()),
                request_id: Some(request_id),
                progress: Some(progress.into()),
                cause: None,
                reason: None,
                summary: None,
            },
            NextQuestionOutput::Terminated { cause, summary } => Self {
                terminated: true,
                question: None,
                request_id: None,
                progress: None,
                cause: Some(cause),
                reason: Some(cause.reason()),
                summary: summary.map(Into::into),
            },
        }
    }
}

/// Response for POST /api/exam/start
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub exam_id: ExamSessionId,
    pub resumed: bool,
    #[serde(flatten)]
    pub next: NextQuestionResponse,
}

impl From<StartExamOutput> for StartResponse {
    fn from(output: StartExamOutput) -> Self {
        Self {
            exam_id: output.exam_id,
            resumed: output.resumed,
            next: output.next.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrectOptionDto {
    pub id: i64,
    pub content: String,
    pub explanation: Option<String>,
}

impl From<AnswerOption> for CorrectOptionDto {
    fn from(o: AnswerOption) -> Self {
        Self {
            id: o.id,
            content: o.content,
            explanation: o.explanation,
        }
    }
}

/// Response for POST /api/exam/answer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub correct_option: CorrectOptionDto,
    pub user_choice_correct: bool,
    pub request_id: ExamRequestId,
    pub progress: ProgressDto,
    pub terminated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<TerminationCause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl From<CheckAnswerOutput> for AnswerResponse {
    fn from(output: CheckAnswerOutput) -> Self {
        Self {
            correct_option: output.correct_option.into(),
            user_choice_correct: output.user_choice_correct,
            request_id: output.request_id,
            progress: output.progress.into(),
            terminated: output.termination.is_some(),
            cause: output.termination,
            reason: output.termination.map(|c| c.reason()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshotDto {
    pub exam_id: ExamSessionId,
    pub user_id: Option<UserId>,
    pub mode: ExamMode,
    pub difficulty: u8,
    pub started_at_ms: i64,
    pub last_question_id: Option<i64>,
    pub total_success: u32,
    pub total_fail: u32,
    pub base_points: i64,
    pub heartbeat_initialized: bool,
    pub heartbeat_missed: u32,
    pub next_heartbeat_ms: Option<i64>,
    pub violations: BTreeMap<&'static str, u32>,
    pub terminated_by_violations: bool,
    pub terminated_by_fail_count: bool,
}

impl From<&SessionRecord> for SessionSnapshotDto {
    fn from(r: &SessionRecord) -> Self {
        Self {
            exam_id: r.id,
            user_id: r.user_id,
            mode: r.mode,
            difficulty: r.difficulty.level(),
            started_at_ms: r.started_at_ms,
            last_question_id: r.last_question_id,
            total_success: r.total_success,
            total_fail: r.total_fail,
            base_points: r.base_points(),
            heartbeat_initialized: r.heartbeat.is_initialized(),
            heartbeat_missed: r.heartbeat.missed,
            next_heartbeat_ms: r.heartbeat.next_expected_ms,
            violations: violation_map(&r.violations),
            terminated_by_violations: r.terminated_by_violations(),
            terminated_by_fail_count: r.terminated_by_fail_count(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TotalsDto {
    pub total: usize,
    pub free: usize,
    pub rating: usize,
    pub terminated: usize,
}

impl From<SessionTotals> for TotalsDto {
    fn from(t: SessionTotals) -> Self {
        Self {
            total: t.total,
            free: t.free,
            rating: t.rating,
            terminated: t.terminated,
        }
    }
}

/// Response for GET /api/exam/debug/sessions
#[derive(Debug, Clone, Serialize)]
pub struct SessionsResponse {
    pub totals: TotalsDto,
    pub sessions: Vec<SessionSnapshotDto>,
}

impl From<DiagnosticsOutput> for SessionsResponse {
    fn from(output: DiagnosticsOutput) -> Self {
        Self {
            totals: output.totals.into(),
            sessions: output.sessions.iter().map(Into::into).collect(),
        }
    }
}

fn violation_map(counters: &ViolationCounters) -> BTreeMap<&'static str, u32> {
    counters.iter().map(|(c, n)| (c.code(), n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_heartbeat_response_keeps_nulls() {
        let body = serde_json::to_value(EventResponse::from(ReportEventOutput::Heartbeat(
            HeartbeatOutcome::terminated(),
        )))
        .unwrap();
        assert_eq!(
            body,
            json!({ "nextToken": null, "terminated": true, "challenge": null })
        );
    }

    #[test]
    fn test_violation_response_shape() {
        let body = serde_json::to_value(EventResponse::from(ReportEventOutput::Violation {
            terminated: false,
        }))
        .unwrap();
        assert_eq!(body, json!({ "terminated": false }));
    }

    #[test]
    fn test_unified_request_parses_wire_tag() {
        let req: UnifiedRequest = serde_json::from_value(json!({
            "examId": ExamSessionId::new(),
            "questionId": 3,
            "token": "init_abc",
            "eventType": "UI_MENU_HB_CHECK",
            "timezoneOffset": -120,
        }))
        .unwrap();
        assert_eq!(req.event_type, EventKind::HeartBeat);
        assert_eq!(req.question_id, Some(3));
        assert!(req.client_time.is_none());
    }

    #[test]
    fn test_unified_request_rejects_unknown_tag() {
        let result = serde_json::from_value::<UnifiedRequest>(json!({
            "examId": ExamSessionId::new(),
            "eventType": "UI_FOO",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_question_dto_hides_correctness() {
        let question = Question {
            id: 1,
            text: "Pick one".to_string(),
            topic: "misc".to_string(),
            difficulty: crate::domain::value_objects::Difficulty::MIN,
            options: vec![AnswerOption {
                id: 10,
                content: "A".to_string(),
                is_correct: true,
                explanation: Some("because".to_string()),
            }],
        };
        let body = serde_json::to_value(QuestionDto::from(question)).unwrap();
        assert_eq!(body["options"][0], json!({ "id": 10, "content": "A" }));
    }
}
