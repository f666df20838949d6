//! Component C — Handoff Broker.
//!
//! Issues unguessable, single-use, short-lived codes binding a subject, for
//! the web-session-to-native-client handoff. Grounded on the teacher's
//! `AuthorizationCode` entity (`fc-platform/src/auth/authorization_code.rs`),
//! generalized from a database-backed OAuth code to an in-memory capability
//! per `spec.md` §3.1/§4.C (the core persists nothing durably).

use std::sync::Arc;
use std::time::Duration as StdDuration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::RngCore;
use subtle::ConstantTimeEq;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::AuthError;

const CODE_BYTES: usize = 32;

#[derive(Debug, Clone)]
struct HandoffEntry {
    subject: String,
    expires_at: DateTime<Utc>,
}

/// Sole externally observable redemption failure: absence and expiry are
/// indistinguishable by design (`spec.md` §4.C "Rationale for
/// indistinguishability").
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("handoff code invalid")]
pub struct RedeemError;

pub struct HandoffBroker<C: Clock> {
    store: Arc<DashMap<String, HandoffEntry>>,
    ttl: Duration,
    clock: C,
}

impl<C: Clock + Clone + 'static> HandoffBroker<C> {
    pub fn new(ttl: Duration, clock: C) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            ttl,
            clock,
        }
    }

    /// Generates a fresh 32-byte, URL-safe-base64 code and binds it to
    /// `subject`. Restarts generation on the vanishingly unlikely collision
    /// with an existing live code (`spec.md` §4.C step 2).
    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        let expires_at = self.clock.now() + self.ttl;

        loop {
            let code = generate_code()?;
            // `entry().or_insert_with()` would silently keep the *old* entry
            // on collision; an explicit contains-check-then-insert under the
            // shard lock is what the spec's "pre-insertion existence check"
            // requires.
            let mut inserted = false;
            self.store.entry(code.clone()).or_insert_with(|| {
                inserted = true;
                HandoffEntry {
                    subject: subject.to_string(),
                    expires_at,
                }
            });
            if inserted {
                debug!(subject, "issued handoff code");
                return Ok(code);
            }
            // Collision: try again with a fresh code.
        }
    }

    /// Atomically looks up, validates, and removes the code in one critical
    /// section (`spec.md` §9: "a two-phase approach... is incorrect").
    pub fn redeem(&self, presented: &str) -> Result<String, RedeemError> {
        let now = self.clock.now();

        let Some((_, entry)) = self.store.remove_if(presented, |_, entry| entry.expires_at > now) else {
            // Either absent, or present-but-expired (removed below if so).
            // Equalize timing cost between "never existed" and "existed but
            // stale" by touching an empty reference the same way a real
            // comparison would.
            let _ = empty_reference_eq(presented);
            self.store.remove(presented);
            return Err(RedeemError);
        };

        Ok(entry.subject)
    }

    /// Removes all entries whose expiry has passed. Runs on a 30s period
    /// from [`HandoffBroker::spawn_evictor`].
    pub fn sweep(&self) {
        let now = self.clock.now();
        self.store.retain(|_, entry| entry.expires_at > now);
    }

    /// Spawns the background eviction task. Exits cleanly when `shutdown`
    /// is cancelled (`spec.md` §5 Shutdown).
    pub fn spawn_evictor(self: &Arc<Self>, sweep_interval: StdDuration, shutdown: CancellationToken) {
        let broker = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => broker.sweep(),
                    _ = shutdown.cancelled() => {
                        info!("handoff evictor shutting down");
                        break;
                    }
                }
            }
        });
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.store.len()
    }
}

fn generate_code() -> Result<String, AuthError> {
    let mut bytes = [0u8; CODE_BYTES];
    rand::thread_rng().try_fill_bytes(&mut bytes).map_err(|e| {
        AuthError::internal(format!("RNG unavailable while generating handoff code: {e}"))
    })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Constant-time comparison against an empty string, to deny an attacker a
/// timing oracle on code existence (`spec.md` §4.C step a).
fn empty_reference_eq(presented: &str) -> bool {
    presented.as_bytes().ct_eq(b"").into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_support::FixedClock;

    fn broker() -> Arc<HandoffBroker<FixedClock>> {
        Arc::new(HandoffBroker::new(Duration::seconds(60), FixedClock::new(Utc::now())))
    }

    #[test]
    fn redeem_succeeds_at_most_once() {
        let broker = broker();
        let code = broker.issue("user-1").unwrap();
        assert_eq!(broker.redeem(&code).unwrap(), "user-1");
        assert_eq!(broker.redeem(&code).unwrap_err(), RedeemError);
    }

    #[test]
    fn unknown_code_is_invalid() {
        let broker = broker();
        assert_eq!(broker.redeem("never-issued").unwrap_err(), RedeemError);
    }

    #[test]
    fn expired_code_is_invalid_and_removed() {
        let clock = FixedClock::new(Utc::now());
        let broker = Arc::new(HandoffBroker::new(Duration::seconds(60), clock.clone()));
        let code = broker.issue("user-1").unwrap();
        clock.advance(Duration::seconds(61));
        assert_eq!(broker.redeem(&code).unwrap_err(), RedeemError);
        assert_eq!(broker.len(), 0);
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let clock = FixedClock::new(Utc::now());
        let broker = Arc::new(HandoffBroker::new(Duration::seconds(60), clock.clone()));
        let stale = broker.issue("user-1").unwrap();
        clock.advance(Duration::seconds(30));
        let fresh = broker.issue("user-2").unwrap();
        clock.advance(Duration::seconds(31));

        broker.sweep();

        assert_eq!(broker.len(), 1);
        assert_eq!(broker.redeem(&stale).unwrap_err(), RedeemError);
        assert_eq!(broker.redeem(&fresh).unwrap(), "user-2");
    }

    #[test]
    fn issued_codes_have_expected_shape() {
        let broker = broker();
        let code = broker.issue("user-1").unwrap();
        assert_eq!(code.len(), 43);
        assert!(!code.contains('='));
    }
}
