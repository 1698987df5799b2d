//! HTTP Handlers
//!
//! Progression calls (`start`, `next`, `answer`, `abort`) take the client
//! lock here; the integrity endpoint takes it inside its use case after
//! parsing. Session locks are always taken by the use cases.

use crate::application::abort_exam::{AbortExamInput, AbortExamUseCase};
use crate::application::check_answer::{CheckAnswerInput, CheckAnswerUseCase};
use crate::application::config::ExamConfig;
use crate::application::diagnostics::DiagnosticsUseCase;
use crate::application::locks::ExamLocks;
use crate::application::next_question::{NextQuestionInput, NextQuestionUseCase};
use crate::application::report_event::{ReportEventInput, ReportEventUseCase, StrategyTable};
use crate::application::session_cache::ExamSessionCache;
use crate::application::start_exam::{StartExamInput, StartExamUseCase};
use crate::domain::repository::{ExamRepository, SessionStore};
use crate::domain::services::{HeartbeatEngine, ViolationAccountant};
use crate::error::{ExamError, ExamResult};
use crate::presentation::dto::{
    AbortRequest, AnswerRequest, AnswerResponse, EventResponse, NextQuestionResponse,
    NextRequest, SessionsResponse, StartRequest, StartResponse, SummaryDto, UnifiedRequest,
};
use crate::presentation::identity::IdentityResolver;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use platform::client::{ClientKey, resolve_client_key};
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared state for exam handlers
pub struct ExamAppState<R>
where
    R: ExamRepository,
{
    pub repo: Arc<R>,
    pub cache: ExamSessionCache,
    pub locks: Arc<ExamLocks>,
    pub config: Arc<ExamConfig>,
    pub heartbeat: Arc<HeartbeatEngine>,
    pub accountant: ViolationAccountant,
    pub strategies: Arc<StrategyTable>,
    pub identity: IdentityResolver,
}

impl<R> ExamAppState<R>
where
    R: ExamRepository,
{
    pub fn new(repo: R, store: Arc<dyn SessionStore>, config: ExamConfig) -> Self {
        Self {
            repo: Arc::new(repo),
            cache: ExamSessionCache::new(store),
            locks: Arc::new(ExamLocks::new(config.lock_stripes)),
            heartbeat: Arc::new(config.anti_cheat.heartbeat_engine()),
            accountant: config.anti_cheat.accountant(),
            strategies: Arc::new(StrategyTable::standard()),
            identity: IdentityResolver::default(),
            config: Arc::new(config),
        }
    }

    pub fn with_identity(mut self, identity: IdentityResolver) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_strategies(mut self, strategies: StrategyTable) -> Self {
        self.strategies = Arc::new(strategies);
        self
    }
}

impl<R> Clone for ExamAppState<R>
where
    R: ExamRepository,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            cache: self.cache.clone(),
            locks: self.locks.clone(),
            config: self.config.clone(),
            heartbeat: self.heartbeat.clone(),
            accountant: self.accountant,
            strategies: self.strategies.clone(),
            identity: self.identity,
        }
    }
}

/// POST /api/exam/start
pub async fn start_exam<R>(
    State(state): State<ExamAppState<R>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: Result<Json<StartRequest>, JsonRejection>,
) -> ExamResult<Json<StartResponse>>
where
    R: ExamRepository,
{
    let req = parse(payload)?;
    let user_id = state.identity.resolve(&headers)?;
    let _client_guard = state.locks.client(&client_key(&headers, addr)).await;

    let use_case = StartExamUseCase::new(
        state.repo.clone(),
        state.cache.clone(),
        state.locks.clone(),
        state.config.clone(),
        state.heartbeat.clone(),
    );

    let output = use_case
        .execute(StartExamInput {
            mode: req.mode,
            user_id,
        })
        .await?;

    Ok(Json(output.into()))
}

/// POST /api/exam/next
pub async fn next_question<R>(
    State(state): State<ExamAppState<R>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: Result<Json<NextRequest>, JsonRejection>,
) -> ExamResult<Json<NextQuestionResponse>>
where
    R: ExamRepository,
{
    let req = parse(payload)?;
    let _client_guard = state.locks.client(&client_key(&headers, addr)).await;

    let use_case = NextQuestionUseCase::new(
        state.repo.clone(),
        state.cache.clone(),
        state.locks.clone(),
        state.config.clone(),
        state.heartbeat.clone(),
    );

    let output = use_case
        .execute(NextQuestionInput {
            exam_id: req.exam_id,
            request_id: req.request_id,
        })
        .await?;

    Ok(Json(output.into()))
}

/// POST /api/exam/answer
pub async fn check_answer<R>(
    State(state): State<ExamAppState<R>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> ExamResult<Json<AnswerResponse>>
where
    R: ExamRepository,
{
    let req = parse(payload)?;
    let _client_guard = state.locks.client(&client_key(&headers, addr)).await;

    let use_case = CheckAnswerUseCase::new(
        state.repo.clone(),
        state.cache.clone(),
        state.locks.clone(),
        state.config.clone(),
        state.heartbeat.clone(),
    );

    let output = use_case
        .execute(CheckAnswerInput {
            exam_id: req.exam_id,
            request_id: req.request_id,
            selected_option_id: req.answer_id,
        })
        .await?;

    Ok(Json(output.into()))
}

/// POST /api/exam/abort
pub async fn abort_exam<R>(
    State(state): State<ExamAppState<R>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: Result<Json<AbortRequest>, JsonRejection>,
) -> ExamResult<Json<SummaryDto>>
where
    R: ExamRepository,
{
    let req = parse(payload)?;
    let _client_guard = state.locks.client(&client_key(&headers, addr)).await;

    let use_case =
        AbortExamUseCase::new(state.repo.clone(), state.cache.clone(), state.locks.clone());
    let summary = use_case
        .execute(AbortExamInput {
            exam_id: req.exam_id,
        })
        .await?;

    Ok(Json(summary.into()))
}

/// POST /api/exam/ui-feedback/status
pub async fn report_event<R>(
    State(state): State<ExamAppState<R>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: Result<Json<UnifiedRequest>, JsonRejection>,
) -> ExamResult<Json<EventResponse>>
where
    R: ExamRepository,
{
    let req = parse(payload)?;

    let use_case = ReportEventUseCase::new(
        state.cache.clone(),
        state.locks.clone(),
        state.heartbeat.clone(),
        state.accountant,
        state.strategies.clone(),
    );

    let output = use_case
        .execute(ReportEventInput {
            exam_id: req.exam_id,
            question_id: req.question_id,
            token: req.token,
            kind: req.event_type,
            client: client_key(&headers, addr),
            timezone_offset: req.timezone_offset,
            timezone: req.timezone_string,
            client_time: req.client_time,
        })
        .await?;

    Ok(Json(output.into()))
}

/// GET /api/exam/debug/sessions
pub async fn list_sessions<R>(State(state): State<ExamAppState<R>>) -> Json<SessionsResponse>
where
    R: ExamRepository,
{
    let use_case = DiagnosticsUseCase::new(state.cache.clone());
    Json(use_case.execute().into())
}

fn client_key(headers: &HeaderMap, addr: SocketAddr) -> ClientKey {
    resolve_client_key(headers, Some(addr.ip()))
}

/// Unwrap a JSON body, mapping any rejection to a 400
fn parse<T>(payload: Result<Json<T>, JsonRejection>) -> ExamResult<T> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Rejected request body");
            Err(ExamError::MalformedRequest(rejection.body_text()))
        }
    }
}
