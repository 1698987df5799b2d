//! Expiring in-memory session store
//!
//! Entries expire a fixed time after their last write. When full, the
//! least recently used entry is evicted. Expiry is enforced lazily on
//! every access and eagerly by [`spawn_sweeper`].
//!
//! The `*_at` methods take the clock explicitly; the [`SessionStore`]
//! impl passes `Instant::now()`.

use crate::domain::entities::SessionRecord;
use crate::domain::repository::SessionStore;
use crate::domain::value_objects::ExamMode;
use kernel::id::ExamSessionId;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

struct Entry {
    record: SessionRecord,
    written_at: Instant,
    /// Key into `Inner::recency`
    tick: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<ExamSessionId, Entry>,
    /// Access order, oldest first
    recency: BTreeMap<u64, ExamSessionId>,
    next_tick: u64,
}

impl Inner {
    fn bump(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }

    fn touch(&mut self, id: &ExamSessionId) {
        let tick = self.bump();
        if let Some(entry) = self.entries.get_mut(id) {
            self.recency.remove(&entry.tick);
            entry.tick = tick;
            self.recency.insert(tick, *id);
        }
    }

    fn take(&mut self, id: &ExamSessionId) -> Option<SessionRecord> {
        let entry = self.entries.remove(id)?;
        self.recency.remove(&entry.tick);
        Some(entry.record)
    }
}

pub struct ExpiringSessionStore {
    inner: Mutex<Inner>,
    max_entries: usize,
    ttl: Duration,
}

impl ExpiringSessionStore {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.written_at) >= self.ttl
    }

    pub fn put_at(&self, record: SessionRecord, now: Instant) {
        let mut inner = self.inner.lock();
        let id = record.id;
        inner.take(&id);

        let tick = inner.bump();
        inner.recency.insert(tick, id);
        inner.entries.insert(
            id,
            Entry {
                record,
                written_at: now,
                tick,
            },
        );

        if inner.entries.len() > self.max_entries {
            self.purge_locked(&mut inner, now);
        }
        while inner.entries.len() > self.max_entries {
            let Some((_, victim)) = inner.recency.pop_first() else {
                break;
            };
            inner.entries.remove(&victim);
            tracing::info!(session_id = %victim, "Exam session evicted at capacity");
        }
    }

    pub fn get_at(&self, id: &ExamSessionId, now: Instant) -> Option<SessionRecord> {
        let mut inner = self.inner.lock();
        let expired = self.is_expired(inner.entries.get(id)?, now);
        if expired {
            inner.take(id);
            tracing::debug!(session_id = %id, "Exam session expired");
            return None;
        }
        inner.touch(id);
        inner.entries.get(id).map(|entry| entry.record.clone())
    }

    pub fn mode_at(&self, id: &ExamSessionId, now: Instant) -> Option<ExamMode> {
        let inner = self.inner.lock();
        inner
            .entries
            .get(id)
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| entry.record.mode)
    }

    pub fn snapshot_at(&self, now: Instant) -> Vec<SessionRecord> {
        let inner = self.inner.lock();
        inner
            .entries
            .values()
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| entry.record.clone())
            .collect()
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut inner = self.inner.lock();
        self.purge_locked(&mut inner, now)
    }

    fn purge_locked(&self, inner: &mut Inner, now: Instant) -> usize {
        let expired: Vec<ExamSessionId> = inner
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            inner.take(id);
        }
        expired.len()
    }
}

impl SessionStore for ExpiringSessionStore {
    fn put(&self, record: SessionRecord) {
        self.put_at(record, Instant::now());
    }

    fn get(&self, id: &ExamSessionId) -> Option<SessionRecord> {
        self.get_at(id, Instant::now())
    }

    fn mode(&self, id: &ExamSessionId) -> Option<ExamMode> {
        self.mode_at(id, Instant::now())
    }

    fn remove(&self, id: &ExamSessionId) -> Option<SessionRecord> {
        self.inner.lock().take(id)
    }

    fn snapshot(&self) -> Vec<SessionRecord> {
        self.snapshot_at(Instant::now())
    }

    fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }
}

/// Periodically drop expired sessions in the background
pub fn spawn_sweeper(store: Arc<dyn SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                tracing::info!(purged, remaining = store.len(), "Expired exam sessions purged");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    fn record() -> SessionRecord {
        SessionRecord::new(ExamMode::Rating, None, 0)
    }

    #[test]
    fn test_expire_after_write() {
        let store = ExpiringSessionStore::new(8, TTL);
        let t0 = Instant::now();
        let r = record();
        let id = r.id;
        store.put_at(r, t0);

        // Reads do not extend the lifetime
        assert!(store.get_at(&id, t0 + Duration::from_secs(59)).is_some());
        assert!(store.get_at(&id, t0 + TTL).is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_write_refreshes_expiry() {
        let store = ExpiringSessionStore::new(8, TTL);
        let t0 = Instant::now();
        let r = record();
        let id = r.id;
        store.put_at(r.clone(), t0);
        store.put_at(r, t0 + Duration::from_secs(50));

        assert!(store.get_at(&id, t0 + Duration::from_secs(100)).is_some());
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let store = ExpiringSessionStore::new(2, TTL);
        let t0 = Instant::now();
        let (a, b, c) = (record(), record(), record());
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);

        store.put_at(a, t0);
        store.put_at(b, t0);
        // Touch `a` so `b` becomes the oldest
        assert!(store.get_at(&a_id, t0).is_some());
        store.put_at(c, t0);

        assert_eq!(store.len(), 2);
        assert!(store.get_at(&a_id, t0).is_some());
        assert!(store.get_at(&b_id, t0).is_none());
        assert!(store.get_at(&c_id, t0).is_some());
    }

    #[test]
    fn test_capacity_prefers_expired_victims() {
        let store = ExpiringSessionStore::new(2, TTL);
        let t0 = Instant::now();
        let (a, b, c) = (record(), record(), record());
        let (a_id, b_id) = (a.id, b.id);

        store.put_at(a, t0);
        store.put_at(b, t0 + Duration::from_secs(30));
        // `b` is touched last but `a` has expired by now
        store.get_at(&a_id, t0 + Duration::from_secs(30));
        store.put_at(c, t0 + TTL);

        assert!(store.get_at(&b_id, t0 + TTL).is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_get_returns_independent_copy() {
        let store = ExpiringSessionStore::new(8, TTL);
        let r = record();
        let id = r.id;
        store.put(r);

        let mut copy = store.get(&id).unwrap();
        copy.correct_question_ids.insert(42);
        copy.total_success = 1;

        let fresh = store.get(&id).unwrap();
        assert!(fresh.correct_question_ids.is_empty());
        assert_eq!(fresh.total_success, 0);
    }

    #[test]
    fn test_purge_and_snapshot() {
        let store = ExpiringSessionStore::new(8, TTL);
        let t0 = Instant::now();
        store.put_at(record(), t0);
        store.put_at(record(), t0 + Duration::from_secs(30));

        let later = t0 + Duration::from_secs(70);
        assert_eq!(store.snapshot_at(later).len(), 1);
        assert_eq!(store.purge_expired_at(later), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_mode_and_remove() {
        let store = ExpiringSessionStore::new(8, TTL);
        let r = SessionRecord::new(ExamMode::Free, None, 0);
        let id = r.id;
        store.put(r);

        assert_eq!(store.mode(&id), Some(ExamMode::Free));
        assert!(store.remove(&id).is_some());
        assert_eq!(store.mode(&id), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_purges_in_background() {
        let store = Arc::new(ExpiringSessionStore::new(8, Duration::ZERO));
        store.put(record());
        assert_eq!(store.len(), 1);
        let handle = spawn_sweeper(store.clone(), Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.len(), 0);
        handle.abort();
    }
}
