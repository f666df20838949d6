//! Component D — Session Orchestrator.
//!
//! Composes the Mint, Verifier, Broker, and an injected Identity Store into
//! the five primary operations plus guest-token issue (`spec.md` §4.D).
//! Modeled on the teacher's `login`/`logout` handlers
//! (`fc-platform/src/auth/auth_api.rs`) and refresh rotation
//! (`fc-platform/src/auth/refresh_token.rs`), generalized from a
//! database-backed session to the stateless dual-token model this spec
//! requires.

use std::sync::Arc;

use uuid::Uuid;

use crate::clock::Clock;
use crate::error::AuthError;
use crate::identity::IdentityStore;

use super::broker::HandoffBroker;
use super::claims::{PrincipalType, TokenKind};
use super::cookie::CookieDirective;
use super::mint::TokenMint;
use super::verify::{TokenVerifier, VerifyError};

/// Where the caller found a presented refresh token. Priority order per
/// `spec.md` §4.D.2: cookie, then bearer header, then body field.
pub enum RefreshSource<'a> {
    Cookie(&'a str),
    BearerHeader(&'a str),
    BodyField(&'a str),
}

impl<'a> RefreshSource<'a> {
    fn token(&self) -> &'a str {
        match self {
            RefreshSource::Cookie(t) | RefreshSource::BearerHeader(t) | RefreshSource::BodyField(t) => t,
        }
    }
}

pub struct UserProjection {
    pub subject: String,
    pub email: String,
}

pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProjection,
    pub cookie: CookieDirective,
}

pub struct RefreshOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub cookie: CookieDirective,
}

pub struct HandoffIssueOutcome {
    pub code: String,
    pub expires_in_secs: u64,
}

pub struct HandoffExchangeOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProjection,
}

pub struct LogoutOutcome {
    pub cookie: CookieDirective,
}

pub struct GuestIssueOutcome {
    pub guest_token: String,
}

pub struct SessionOrchestrator<C: Clock + Clone + 'static> {
    mint: TokenMint<C>,
    verifier: TokenVerifier<C>,
    broker: Arc<HandoffBroker<C>>,
    identity: Arc<dyn IdentityStore>,
    refresh_ttl_secs: i64,
    handoff_ttl_secs: u64,
}

impl<C: Clock + Clone + 'static> SessionOrchestrator<C> {
    pub fn new(
        mint: TokenMint<C>,
        verifier: TokenVerifier<C>,
        broker: Arc<HandoffBroker<C>>,
        identity: Arc<dyn IdentityStore>,
        refresh_ttl_secs: i64,
        handoff_ttl_secs: u64,
    ) -> Self {
        Self {
            mint,
            verifier,
            broker,
            identity,
            refresh_ttl_secs,
            handoff_ttl_secs,
        }
    }

    /// `spec.md` §4.D.1.
    pub async fn login(&self, email: &str, credential: &str) -> Result<LoginOutcome, AuthError> {
        let user = self
            .identity
            .verify(email, credential)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let access_token = self.mint.mint_access(&user.subject, &user.email, PrincipalType::Registered)?;
        let refresh = self.mint.mint_refresh(&user.subject, &user.email, PrincipalType::Registered)?;

        Ok(LoginOutcome {
            access_token,
            refresh_token: refresh.token.clone(),
            user: UserProjection {
                subject: user.subject,
                email: user.email,
            },
            cookie: CookieDirective::set_refresh(refresh.token, self.refresh_ttl_secs),
        })
    }

    /// `spec.md` §4.D.2. Always rotates: the presented refresh token is
    /// never reused, a fresh `tokenId` is minted regardless of whether two
    /// concurrent callers present the same token (`spec.md` §5 Ordering
    /// guarantees — this is accepted, not a bug).
    pub fn refresh(&self, presented: RefreshSource<'_>) -> Result<RefreshOutcome, AuthError> {
        match self.try_refresh(presented.token()) {
            Ok(outcome) => Ok(outcome),
            Err(_verify_error) => Err(AuthError::RefreshRejected),
        }
    }

    fn try_refresh(&self, token: &str) -> Result<RefreshOutcome, VerifyError> {
        let claims = self.verifier.require_kind(token, TokenKind::Refresh)?;

        let access_token = self
            .mint
            .mint_access(&claims.sub, &claims.email, claims.principal_type)
            .map_err(|_| VerifyError::Malformed)?;
        let new_refresh = self
            .mint
            .mint_refresh(&claims.sub, &claims.email, claims.principal_type)
            .map_err(|_| VerifyError::Malformed)?;

        Ok(RefreshOutcome {
            access_token,
            refresh_token: new_refresh.token.clone(),
            cookie: CookieDirective::set_refresh(new_refresh.token, self.refresh_ttl_secs),
        })
    }

    /// Cookie directive to send alongside a `RefreshRejected` response, so
    /// the client never keeps a stale refresh cookie (`spec.md` §7).
    pub fn clear_refresh_cookie() -> CookieDirective {
        CookieDirective::clear_refresh()
    }

    /// `spec.md` §4.D.3. Requires the caller already authenticated via the
    /// Gate; `subject` is that caller's principal id.
    pub fn handoff_issue(&self, subject: &str) -> Result<HandoffIssueOutcome, AuthError> {
        let code = self.broker.issue(subject)?;
        Ok(HandoffIssueOutcome {
            code,
            expires_in_secs: self.handoff_ttl_secs,
        })
    }

    /// `spec.md` §4.D.4. A missing user after successful redemption
    /// collapses to the same `HandoffInvalid` outcome as a bad code, for the
    /// same anti-probing reason as the Broker itself.
    pub async fn handoff_exchange(&self, code: &str) -> Result<HandoffExchangeOutcome, AuthError> {
        let subject = self.broker.redeem(code).map_err(|_| AuthError::HandoffInvalid)?;

        let user = self
            .identity
            .lookup_by_subject(&subject)
            .await?
            .ok_or(AuthError::HandoffInvalid)?;

        let access_token = self.mint.mint_access(&user.subject, &user.email, PrincipalType::Registered)?;
        let refresh = self.mint.mint_refresh(&user.subject, &user.email, PrincipalType::Registered)?;

        Ok(HandoffExchangeOutcome {
            access_token,
            refresh_token: refresh.token,
            user: UserProjection {
                subject: user.subject,
                email: user.email,
            },
        })
    }

    /// `spec.md` §4.D.5. Idempotent and unconditional.
    pub fn logout(&self) -> LogoutOutcome {
        LogoutOutcome {
            cookie: CookieDirective::clear_refresh(),
        }
    }

    /// `spec.md` §4.D.6. Guest subjects are drawn from a `guest:` namespace
    /// (Open Question in `spec.md` §9, decided in `DESIGN.md`) so downstream
    /// log analysis can cheaply distinguish them without parsing claims.
    pub fn issue_guest_token(&self, email: &str) -> Result<GuestIssueOutcome, AuthError> {
        let subject = format!("guest:{}", Uuid::new_v4());
        let guest_token = self.mint.mint_guest(&subject, email)?;
        Ok(GuestIssueOutcome { guest_token })
    }
}
