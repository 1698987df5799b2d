//! Exam Router

use crate::application::config::ExamConfig;
use crate::domain::repository::{ExamRepository, SessionStore};
use crate::infra::postgres::PgExamRepository;
use crate::presentation::handlers::{self, ExamAppState};
use crate::presentation::identity::IdentityResolver;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

/// Create the exam router with PostgreSQL collaborators
pub fn exam_router(
    repo: PgExamRepository,
    store: Arc<dyn SessionStore>,
    config: ExamConfig,
    identity: IdentityResolver,
) -> Router {
    exam_router_generic(ExamAppState::new(repo, store, config).with_identity(identity))
}

/// Create a generic exam router for any collaborator implementation
pub fn exam_router_generic<R>(state: ExamAppState<R>) -> Router
where
    R: ExamRepository,
{
    let mut router = Router::new()
        .route("/start", post(handlers::start_exam::<R>))
        .route("/next", post(handlers::next_question::<R>))
        .route("/answer", post(handlers::check_answer::<R>))
        .route("/abort", post(handlers::abort_exam::<R>))
        .route("/ui-feedback/status", post(handlers::report_event::<R>));

    if state.config.debug_endpoints {
        tracing::warn!("Exam debug endpoints enabled");
        router = router.route("/debug/sessions", get(handlers::list_sessions::<R>));
    }

    router.with_state(state)
}
