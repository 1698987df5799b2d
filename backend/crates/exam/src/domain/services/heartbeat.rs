//! Heartbeat protocol engine
//!
//! Per-session state machine `UNINITIALIZED -> ACTIVE -> TERMINATED`,
//! driven entirely by the caller-supplied clock so it stays pure.
//!
//! - An init-marker token (`init_` prefix) starts the protocol. Repeating
//!   it on an initialized session costs one missed heartbeat.
//! - Every other heartbeat must present the last issued token verbatim.
//!   A mismatch costs one missed heartbeat, but a new token is still
//!   issued so one corrupted round-trip does not lock the client out.
//! - A correct token that arrives after `next_expected + tolerance` also
//!   costs one missed heartbeat.
//! - The stored token rotates on every processed heartbeat, including the
//!   one that reaches the limit.
//! - Only violation termination freezes the protocol; a session ended by
//!   wrong answers keeps answering heartbeats.
//! - Reaching the missed limit terminates the session for good.

use crate::domain::entities::SessionRecord;
use crate::domain::services::termination::TerminationPolicy;
use crate::domain::value_objects::HeartbeatTiming;
use kernel::id::ExamSessionId;
use rand::Rng;

/// Response payload of a heartbeat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatOutcome {
    pub next_token: Option<String>,
    pub terminated: bool,
    pub challenge: Option<String>,
}

impl HeartbeatOutcome {
    pub fn terminated() -> Self {
        Self {
            next_token: None,
            terminated: true,
            challenge: None,
        }
    }

    /// Non-committal answer for sessions that are not monitored
    pub fn unmonitored() -> Self {
        Self {
            next_token: None,
            terminated: false,
            challenge: None,
        }
    }

    fn active(issued: IssuedHeartbeat) -> Self {
        Self {
            next_token: Some(issued.token),
            terminated: false,
            challenge: Some(issued.challenge),
        }
    }
}

/// Freshly generated token, interval and challenge for the next round
#[derive(Debug, Clone)]
pub struct IssuedHeartbeat {
    pub token: String,
    pub interval_ms: u64,
    pub challenge: String,
}

pub struct HeartbeatEngine {
    timing: HeartbeatTiming,
    policy: TerminationPolicy,
    secret: [u8; 32],
    init_prefix: String,
}

impl HeartbeatEngine {
    pub fn new(
        timing: HeartbeatTiming,
        policy: TerminationPolicy,
        secret: [u8; 32],
        init_prefix: impl Into<String>,
    ) -> Self {
        Self {
            timing,
            policy,
            secret,
            init_prefix: init_prefix.into(),
        }
    }

    pub fn is_init_token(&self, token: &str) -> bool {
        token.starts_with(&self.init_prefix)
    }

    /// Generate the next token, a random interval in `[min, max]` and its challenge
    pub fn issue(
        &self,
        session_id: ExamSessionId,
        question_id: Option<i64>,
        now_ms: i64,
    ) -> IssuedHeartbeat {
        let mut rng = rand::rng();
        let min = self.timing.min_interval_ms;
        let interval_ms = rng.random_range(min..=self.timing.max_interval_ms.max(min));
        let nonce: u64 = rng.random();

        let question = question_id.map_or_else(|| "-".to_string(), |id| id.to_string());
        let message = format!("{session_id}:{question}:{now_ms}:{nonce}");
        let token = platform::crypto::to_base64(&platform::crypto::hmac_sha256(
            &self.secret,
            message.as_bytes(),
        ));

        IssuedHeartbeat {
            token,
            interval_ms,
            challenge: build_challenge(interval_ms, &mut rng),
        }
    }

    /// Handle one heartbeat against `record`, mutating it in place
    pub fn process(
        &self,
        record: &mut SessionRecord,
        presented: Option<&str>,
        question_id: Option<i64>,
        now_ms: i64,
    ) -> HeartbeatOutcome {
        let question_id = question_id.or(record.last_question_id);

        if let Some(token) = presented.filter(|t| self.is_init_token(t)) {
            return self.initialize(record, token, question_id, now_ms);
        }

        if record.terminated_by_violations() {
            tracing::debug!(session_id = %record.id, "Heartbeat on violation-terminated exam");
            return HeartbeatOutcome::terminated();
        }

        let issued = self.issue(record.id, question_id, now_ms);
        let valid = token_matches(presented, record.heartbeat.token.as_deref());
        let late = valid && self.is_late(record, now_ms);

        if !valid {
            record.heartbeat.missed += 1;
            tracing::warn!(
                session_id = %record.id,
                token = %presented.map(preview).unwrap_or_default(),
                missed = record.heartbeat.missed,
                "Invalid heartbeat token"
            );
        } else if late {
            record.heartbeat.missed += 1;
            tracing::warn!(
                session_id = %record.id,
                missed = record.heartbeat.missed,
                "Heartbeat arrived late"
            );
        }

        record.heartbeat.rotate(issued.token.clone(), now_ms, issued.interval_ms);

        if (!valid || late) && self.policy.apply_heartbeat_limit(record) {
            return HeartbeatOutcome::terminated();
        }

        tracing::debug!(session_id = %record.id, interval_ms = issued.interval_ms, "Heartbeat accepted");
        HeartbeatOutcome::active(issued)
    }

    fn initialize(
        &self,
        record: &mut SessionRecord,
        token: &str,
        question_id: Option<i64>,
        now_ms: i64,
    ) -> HeartbeatOutcome {
        // Counted even on a terminated session: replaying init is itself the violation.
        if record.heartbeat.is_initialized() {
            record.heartbeat.missed += 1;
            tracing::warn!(
                session_id = %record.id,
                token = %preview(token),
                missed = record.heartbeat.missed,
                "Repeated heartbeat initialization"
            );
        }

        if record.terminated_by_violations() || self.policy.apply_heartbeat_limit(record) {
            return HeartbeatOutcome::terminated();
        }

        let issued = self.issue(record.id, question_id, now_ms);
        record.heartbeat.rotate(issued.token.clone(), now_ms, issued.interval_ms);
        tracing::info!(session_id = %record.id, "Heartbeat protocol initialized");
        HeartbeatOutcome::active(issued)
    }

    /// Allowed lateness for the current heartbeat
    ///
    /// Widened by half when the gap since the last heartbeat is under
    /// 1.2x the maximum interval, which is the signature of client clock
    /// skew rather than a missed beat.
    pub fn tolerance_ms(&self, record: &SessionRecord, now_ms: i64) -> u64 {
        let base = self.timing.tolerance_ms;
        let skew_suspected = record.heartbeat.last_heartbeat_ms.is_some_and(|last| {
            let gap = now_ms.saturating_sub(last).max(0) as u64;
            gap.saturating_mul(5) < self.timing.max_interval_ms.saturating_mul(6)
        });
        if skew_suspected { base * 3 / 2 } else { base }
    }

    pub fn is_late(&self, record: &SessionRecord, now_ms: i64) -> bool {
        record.heartbeat.next_expected_ms.is_some_and(|next| {
            now_ms > next.saturating_add(self.tolerance_ms(record, now_ms) as i64)
        })
    }

    /// Catch a client that stopped sending heartbeats altogether
    ///
    /// Run when an answer or next question is requested. Returns whether
    /// a missed heartbeat was registered. A session that never initialized
    /// the protocol owes its first heartbeat within one maximum interval
    /// of the exam start.
    pub fn check_long_absence(&self, record: &mut SessionRecord, now_ms: i64) -> bool {
        let window = self.timing.long_absence_tolerance_ms as i64;
        let deadline = record.heartbeat.next_expected_ms.unwrap_or_else(|| {
            record
                .started_at_ms
                .saturating_add(self.timing.max_interval_ms as i64)
        });
        if now_ms <= deadline.saturating_add(window) {
            return false;
        }

        record.heartbeat.missed += 1;
        tracing::warn!(
            session_id = %record.id,
            missed = record.heartbeat.missed,
            tolerance_ms = window,
            "Long heartbeat absence detected"
        );
        self.policy.apply_heartbeat_limit(record);
        true
    }
}

/// Exact-match token check; an absent token on either side is invalid
fn token_matches(presented: Option<&str>, stored: Option<&str>) -> bool {
    match (presented, stored) {
        (Some(p), Some(s)) => platform::crypto::constant_time_eq(p.as_bytes(), s.as_bytes()),
        _ => false,
    }
}

fn preview(token: &str) -> String {
    let head: String = token.chars().take(10).collect();
    format!("{head}...")
}

/// Arithmetic function body the client evaluates to learn the next interval
pub fn build_challenge<R: Rng + ?Sized>(interval_ms: u64, rng: &mut R) -> String {
    if rng.random_bool(0.5) {
        let a = rng.random_range(0..=interval_ms);
        format!("function(x){{return {}+{};}}", a, interval_ms - a)
    } else {
        let a = interval_ms + rng.random_range(0..10_000);
        format!("function(x){{return {}-{};}}", a, a - interval_ms)
    }
}
