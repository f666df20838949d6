//! Component E (rate half) — per-endpoint-class token bucket.
//!
//! Hand-rolled against the exact linear-refill formula `spec.md` §4.E pins,
//! rather than layering the teacher's `governor`-based GCRA limiter
//! (`fc-router/src/pool.rs`): the testable properties in `spec.md` §8 assert
//! specific `availableTokens`/`lastRefillAt` semantics that a GCRA
//! reinterpretation would make awkward to verify directly. The `DashMap` +
//! per-key `parking_lot::Mutex` shape is still the teacher's — sharded
//! locking with a map-level lock only on first-touch key creation
//! (`spec.md` §5 Shared resources table).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::clock::Clock;
use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    Login,
    Refresh,
    HandoffIssue,
    HandoffExchange,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    /// Sustained tokens per minute.
    pub rate_per_minute: f64,
    pub burst: f64,
}

impl EndpointClass {
    /// Recommended parameters from `spec.md` §4.E.
    pub fn default_limit(self) -> RateLimit {
        match self {
            EndpointClass::Login => RateLimit { rate_per_minute: 5.0, burst: 10.0 },
            EndpointClass::Refresh => RateLimit { rate_per_minute: 20.0, burst: 30.0 },
            EndpointClass::HandoffIssue => RateLimit { rate_per_minute: 10.0, burst: 15.0 },
            EndpointClass::HandoffExchange => RateLimit { rate_per_minute: 10.0, burst: 15.0 },
        }
    }
}

struct BucketState {
    available: f64,
    last_refill_at: DateTime<Utc>,
}

pub struct RateLimiter<C: Clock> {
    buckets: DashMap<(EndpointClass, String), Mutex<BucketState>>,
    limits: [(EndpointClass, RateLimit); 4],
    clock: C,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(clock: C) -> Self {
        Self::with_limits(
            [
                (EndpointClass::Login, EndpointClass::Login.default_limit()),
                (EndpointClass::Refresh, EndpointClass::Refresh.default_limit()),
                (EndpointClass::HandoffIssue, EndpointClass::HandoffIssue.default_limit()),
                (EndpointClass::HandoffExchange, EndpointClass::HandoffExchange.default_limit()),
            ],
            clock,
        )
    }

    pub fn with_limits(limits: [(EndpointClass, RateLimit); 4], clock: C) -> Self {
        Self {
            buckets: DashMap::new(),
            limits,
            clock,
        }
    }

    fn limit_for(&self, class: EndpointClass) -> RateLimit {
        self.limits
            .iter()
            .find(|(c, _)| *c == class)
            .map(|(_, limit)| *limit)
            .expect("all endpoint classes have a configured limit")
    }

    /// Checks out one token for `(class, remote_address)`. On exhaustion,
    /// returns the number of seconds until at least one token is available.
    ///
    /// Takes the map's shard *read* lock on the common hit path (`get`),
    /// released on every concurrent caller for the same key; the map-level
    /// write lock (`entry`) is only taken on first-touch key creation, per
    /// `spec.md` §5. Contention on a hot key then serializes solely on the
    /// per-key `Mutex`, not on the shard.
    pub fn check(&self, class: EndpointClass, remote_address: &str) -> Result<(), AuthError> {
        let limit = self.limit_for(class);
        let now = self.clock.now();
        let key = (class, remote_address.to_string());

        if let Some(state_lock) = self.buckets.get(&key) {
            return Self::consume(&state_lock, limit, now);
        }

        let state_lock = self.buckets.entry(key).or_insert_with(|| {
            Mutex::new(BucketState {
                available: limit.burst,
                last_refill_at: now,
            })
        });
        Self::consume(&state_lock, limit, now)
    }

    fn consume(state_lock: &Mutex<BucketState>, limit: RateLimit, now: DateTime<Utc>) -> Result<(), AuthError> {
        let mut state = state_lock.lock();

        let elapsed_secs = (now - state.last_refill_at).num_milliseconds().max(0) as f64 / 1000.0;
        let refill = elapsed_secs * (limit.rate_per_minute / 60.0);
        state.available = (state.available + refill).min(limit.burst);
        state.last_refill_at = now;

        if state.available >= 1.0 {
            state.available -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - state.available;
            let seconds_needed = deficit / (limit.rate_per_minute / 60.0);
            Err(AuthError::RateLimited {
                retry_after_secs: seconds_needed.ceil().max(1.0) as u64,
            })
        }
    }
}
