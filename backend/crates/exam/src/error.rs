//! Exam Error Types
//!
//! Exam-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.
//!
//! Limit breaches are not errors: they are terminal state transitions
//! reported in the response payload. Only conditions the client cannot
//! continue from, or server-side faults, are surfaced here.

use crate::domain::value_objects::EventKind;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Exam-specific result type alias
pub type ExamResult<T> = Result<T, ExamError>;

#[derive(Debug, Error)]
pub enum ExamError {
    /// Session expired, evicted or never existed
    #[error("Exam session not found or expired")]
    SessionNotFound,

    /// Request ID is neither the expected one nor a retry of the last one
    #[error("Request ID does not match the expected one")]
    InvalidRequestId,

    /// Body rejected before reaching the exam flows
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// An event kind without a handling strategy
    #[error("No strategy registered for event {0}")]
    NoStrategyForEvent(EventKind),

    #[error("Question {0} not found")]
    QuestionNotFound(i64),

    #[error("Answer option {0} not found")]
    AnswerNotFound(i64),

    /// The question bank has nothing to serve at any level
    #[error("No questions available")]
    NoQuestions,

    #[error("Authentication required for this exam mode")]
    AuthenticationRequired,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExamError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ExamError::SessionNotFound => StatusCode::GONE,
            ExamError::InvalidRequestId => StatusCode::CONFLICT,
            ExamError::MalformedRequest(_) | ExamError::AnswerNotFound(_) => {
                StatusCode::BAD_REQUEST
            }
            ExamError::QuestionNotFound(_) => StatusCode::NOT_FOUND,
            ExamError::NoQuestions => StatusCode::SERVICE_UNAVAILABLE,
            ExamError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            ExamError::NoStrategyForEvent(_)
            | ExamError::InvalidConfig(_)
            | ExamError::Database(_)
            | ExamError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExamError::SessionNotFound => ErrorKind::Gone,
            ExamError::InvalidRequestId => ErrorKind::Conflict,
            ExamError::MalformedRequest(_) | ExamError::AnswerNotFound(_) => ErrorKind::BadRequest,
            ExamError::QuestionNotFound(_) => ErrorKind::NotFound,
            ExamError::NoQuestions => ErrorKind::ServiceUnavailable,
            ExamError::AuthenticationRequired => ErrorKind::Unauthorized,
            ExamError::NoStrategyForEvent(_)
            | ExamError::InvalidConfig(_)
            | ExamError::Database(_)
            | ExamError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    fn action(&self) -> Option<&'static str> {
        match self {
            ExamError::SessionNotFound => Some("Start the exam again"),
            ExamError::AuthenticationRequired => Some("Sign in to take a rated exam"),
            _ => None,
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            ExamError::NoStrategyForEvent(kind) => {
                tracing::error!(event = %kind, "Exam event has no handling strategy");
            }
            ExamError::Database(e) => {
                tracing::error!(error = %e, "Exam database error");
            }
            ExamError::Internal(msg) | ExamError::InvalidConfig(msg) => {
                tracing::error!(message = %msg, "Exam internal error");
            }
            ExamError::InvalidRequestId => {
                tracing::warn!("Exam request ID rejected");
            }
            ExamError::NoQuestions => {
                tracing::warn!("Question bank exhausted");
            }
            _ => {
                tracing::debug!(error = %self, "Exam error");
            }
        }
    }
}

impl From<ExamError> for AppError {
    fn from(err: ExamError) -> Self {
        let kind = err.kind();
        // Server-side detail stays in the logs
        let mut app = if kind.is_server_error() {
            AppError::new(kind, "Internal server error")
        } else {
            AppError::new(kind, err.to_string())
        };
        if let Some(action) = err.action() {
            app = app.with_action(action);
        }
        app.with_source(err)
    }
}

impl IntoResponse for ExamError {
    fn into_response(self) -> Response {
        self.log();
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_not_found_is_gone() {
        let app: AppError = ExamError::SessionNotFound.into();
        assert_eq!(app.status_code(), 410);
        assert_eq!(app.action(), Some("Start the exam again"));
    }

    #[test]
    fn test_server_errors_are_opaque() {
        let app: AppError = ExamError::NoStrategyForEvent(EventKind::DevTools).into();
        assert_eq!(app.status_code(), 500);
        assert!(!app.message().contains("DEVTOOLS"));

        let app: AppError = ExamError::Internal("lock poisoned in stripe 7".into()).into();
        assert!(!app.message().contains("stripe"));
    }

    #[test]
    fn test_status_and_kind_agree() {
        let errors = [
            ExamError::SessionNotFound,
            ExamError::InvalidRequestId,
            ExamError::MalformedRequest("x".into()),
            ExamError::QuestionNotFound(1),
            ExamError::AnswerNotFound(1),
            ExamError::NoQuestions,
            ExamError::AuthenticationRequired,
            ExamError::Internal("x".into()),
        ];
        for err in errors {
            assert_eq!(err.status_code().as_u16(), err.kind().status_code());
        }
    }
}
