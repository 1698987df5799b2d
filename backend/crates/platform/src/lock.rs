//! Striped lock pool
//!
//! A fixed number of mutexes shared by an unbounded key space. A key is
//! mapped to `hash(key) % stripes`, so memory stays bounded and unrelated
//! keys only contend when they collide on a stripe. Collisions cause
//! false contention, never a correctness problem: the same key always
//! maps to the same stripe.
//!
//! The guards are `tokio::sync` guards and may be held across `.await`.

use std::hash::{BuildHasher, Hash, RandomState};
use tokio::sync::{Mutex, MutexGuard};

/// Fixed pool of mutexes indexed by key hash
pub struct StripedLock {
    stripes: Box<[Mutex<()>]>,
    hasher: RandomState,
}

/// Exclusive hold on one stripe, released on drop
#[must_use = "the stripe is released as soon as the guard is dropped"]
pub struct StripeGuard<'a> {
    _guard: MutexGuard<'a, ()>,
    stripe: usize,
}

impl StripeGuard<'_> {
    /// Index of the held stripe
    pub fn stripe(&self) -> usize {
        self.stripe
    }
}

impl StripedLock {
    pub const DEFAULT_STRIPES: usize = 10_240;

    /// Create a pool with `stripes` locks (at least one)
    pub fn new(stripes: usize) -> Self {
        let stripes = stripes.max(1);
        Self {
            stripes: (0..stripes).map(|_| Mutex::new(())).collect(),
            hasher: RandomState::new(),
        }
    }

    pub fn stripes(&self) -> usize {
        self.stripes.len()
    }

    /// Stripe index a key maps to
    pub fn stripe_of<K: Hash + ?Sized>(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) % self.stripes.len() as u64) as usize
    }

    /// Wait for exclusive access to the stripe owning `key`
    pub async fn acquire<K: Hash + ?Sized>(&self, key: &K) -> StripeGuard<'_> {
        let stripe = self.stripe_of(key);
        StripeGuard {
            _guard: self.stripes[stripe].lock().await,
            stripe,
        }
    }

    /// Take the stripe owning `key` if it is free
    pub fn try_acquire<K: Hash + ?Sized>(&self, key: &K) -> Option<StripeGuard<'_>> {
        let stripe = self.stripe_of(key);
        self.stripes[stripe]
            .try_lock()
            .ok()
            .map(|guard| StripeGuard {
                _guard: guard,
                stripe,
            })
    }
}

impl Default for StripedLock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STRIPES)
    }
}

impl std::fmt::Debug for StripedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripedLock")
            .field("stripes", &self.stripes.len())
            .finish()
    }
}
