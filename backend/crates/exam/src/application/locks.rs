//! Exam lock coordinator
//!
//! Two independent striped pools. The client pool serializes requests
//! from one client at the unified event endpoint, before the session is
//! even known to exist. The session pool serializes every
//! read-modify-write cycle on one session record.
//!
//! Order is always client pool first, then session pool.

use kernel::id::ExamSessionId;
use platform::client::ClientKey;
use platform::lock::{StripeGuard, StripedLock};

#[derive(Debug)]
pub struct ExamLocks {
    clients: StripedLock,
    sessions: StripedLock,
}

impl ExamLocks {
    pub fn new(stripes: usize) -> Self {
        Self {
            clients: StripedLock::new(stripes),
            sessions: StripedLock::new(stripes),
        }
    }

    pub async fn client(&self, key: &ClientKey) -> StripeGuard<'_> {
        let guard = self.clients.acquire(key).await;
        tracing::trace!(client = %key, stripe = guard.stripe(), "Client lock acquired");
        guard
    }

    pub async fn session(&self, id: &ExamSessionId) -> StripeGuard<'_> {
        let guard = self.sessions.acquire(id).await;
        tracing::trace!(session_id = %id, stripe = guard.stripe(), "Session lock acquired");
        guard
    }

    pub fn stripes(&self) -> usize {
        self.sessions.stripes()
    }
}

impl Default for ExamLocks {
    fn default() -> Self {
        Self::new(StripedLock::DEFAULT_STRIPES)
    }
}
