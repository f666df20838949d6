//! End-to-end scenarios from the component contracts: login, refresh
//! rotation, the handoff broker's happy path and expiry, guest issuance,
//! and rate limiting. Exercises the orchestrator and its collaborators
//! directly rather than standing up a real HTTP server, in the style of
//! the teacher's `auth_service` tests (`fc-platform/src/auth`).

use std::sync::Arc;

use chrono::{Duration, Utc};

use wl_auth::auth::{
    cookie::CookieValue, HandoffBroker, MintConfig, RefreshSource, SessionOrchestrator, TokenMint, TokenVerifier,
};
use wl_auth::clock::test_support::FixedClock;
use wl_auth::identity::memory::InMemoryIdentityStore;
use wl_auth::identity::IdentityStore;
use wl_auth::{AuthError, Secret};

fn secret() -> Secret {
    Secret::new(b"01234567890123456789012345678901".to_vec()).unwrap()
}

fn orchestrator(
    clock: FixedClock,
    identity: Arc<dyn IdentityStore>,
) -> SessionOrchestrator<FixedClock> {
    let secret = secret();
    let mint_config = MintConfig {
        issuer: "wishlist-auth".to_string(),
        access_ttl: Duration::minutes(15),
        refresh_ttl: Duration::days(7),
        guest_ttl: Duration::hours(24),
    };
    let mint = TokenMint::new(mint_config, &secret, clock.clone());
    let verifier = TokenVerifier::new("wishlist-auth", &secret, clock.clone());
    let broker = Arc::new(HandoffBroker::new(Duration::seconds(60), clock.clone()));

    SessionOrchestrator::new(mint, verifier, broker, identity, Duration::days(7).num_seconds(), 60)
}

#[tokio::test]
async fn web_login_then_transparent_refresh_after_access_expiry() {
    let clock = FixedClock::new(Utc::now());
    let identity = Arc::new(InMemoryIdentityStore::new());
    identity.add_user("user-1", "alice@example.com", "hunter2");
    let orchestrator = orchestrator(clock.clone(), identity);

    let login = orchestrator.login("alice@example.com", "hunter2").await.unwrap();
    assert_eq!(login.user.subject, "user-1");
    assert!(matches!(login.cookie.value, CookieValue::Set(_)));

    // Simulate the access token expiring; the refresh token is still live.
    clock.advance(Duration::minutes(16));

    let refreshed = orchestrator.refresh(RefreshSource::Cookie(&login.refresh_token)).unwrap();
    assert_ne!(refreshed.access_token, login.access_token);
    assert_ne!(refreshed.refresh_token, login.refresh_token);
}

#[tokio::test]
async fn login_rejects_wrong_credential() {
    let clock = FixedClock::new(Utc::now());
    let identity = Arc::new(InMemoryIdentityStore::new());
    identity.add_user("user-1", "alice@example.com", "hunter2");
    let orchestrator = orchestrator(clock, identity);

    let Err(err) = orchestrator.login("alice@example.com", "wrong").await else {
        panic!("expected InvalidCredentials")
    };
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn handoff_happy_path_then_second_redemption_is_rejected() {
    let clock = FixedClock::new(Utc::now());
    let identity = Arc::new(InMemoryIdentityStore::new());
    identity.add_user("user-1", "alice@example.com", "hunter2");
    let orchestrator = orchestrator(clock, identity);

    let login = orchestrator.login("alice@example.com", "hunter2").await.unwrap();
    let issued = orchestrator.handoff_issue(&login.user.subject).unwrap();
    assert_eq!(issued.expires_in_secs, 60);

    let exchanged = orchestrator.handoff_exchange(&issued.code).await.unwrap();
    assert_eq!(exchanged.user.subject, "user-1");

    let Err(second) = orchestrator.handoff_exchange(&issued.code).await else {
        panic!("expected HandoffInvalid on replay")
    };
    assert!(matches!(second, AuthError::HandoffInvalid));
}

#[tokio::test]
async fn handoff_code_expires_after_its_ttl() {
    let clock = FixedClock::new(Utc::now());
    let identity = Arc::new(InMemoryIdentityStore::new());
    identity.add_user("user-1", "alice@example.com", "hunter2");
    let orchestrator = orchestrator(clock.clone(), identity);

    let issued = orchestrator.handoff_issue("user-1").unwrap();

    clock.advance(Duration::seconds(61));

    let Err(err) = orchestrator.handoff_exchange(&issued.code).await else {
        panic!("expected HandoffInvalid after expiry")
    };
    assert!(matches!(err, AuthError::HandoffInvalid));
}

#[tokio::test]
async fn unknown_and_expired_handoff_codes_are_indistinguishable() {
    let clock = FixedClock::new(Utc::now());
    let identity = Arc::new(InMemoryIdentityStore::new());
    let orchestrator = orchestrator(clock, identity);

    let Err(err) = orchestrator.handoff_exchange("never-issued-code").await else {
        panic!("expected HandoffInvalid for an unknown code")
    };
    assert!(matches!(err, AuthError::HandoffInvalid));
}

#[tokio::test]
async fn guest_reservation_gets_a_distinct_bounded_authority_token() {
    let clock = FixedClock::new(Utc::now());
    let identity = Arc::new(InMemoryIdentityStore::new());
    let orchestrator = orchestrator(clock, identity);

    let guest_a = orchestrator.issue_guest_token("guest-a@example.com").unwrap();
    let guest_b = orchestrator.issue_guest_token("guest-b@example.com").unwrap();

    assert_ne!(guest_a.guest_token, guest_b.guest_token);
}

#[tokio::test]
async fn logout_always_clears_the_refresh_cookie() {
    let clock = FixedClock::new(Utc::now());
    let identity = Arc::new(InMemoryIdentityStore::new());
    let orchestrator = orchestrator(clock, identity);

    let outcome = orchestrator.logout();
    assert_eq!(outcome.cookie.value, CookieValue::Clear);
}

#[tokio::test]
async fn rate_limiter_exhausts_burst_then_recovers_after_idle() {
    use wl_auth::admission::{EndpointClass, RateLimiter};

    let clock = FixedClock::new(Utc::now());
    let limiter = RateLimiter::new(clock.clone());

    for _ in 0..10 {
        assert!(limiter.check(EndpointClass::Login, "203.0.113.5").is_ok());
    }
    let err = limiter.check(EndpointClass::Login, "203.0.113.5").unwrap_err();
    assert!(matches!(err, AuthError::RateLimited { .. }));

    // One token refills after 12 seconds at 5/minute.
    clock.advance(Duration::seconds(12));
    assert!(limiter.check(EndpointClass::Login, "203.0.113.5").is_ok());
}
