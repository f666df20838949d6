//! Component B — Token Verifier.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::clock::Clock;
use crate::secret::Secret;

use super::claims::{Claims, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("malformed token")]
    Malformed,
    #[error("bad signature")]
    BadSignature,
    #[error("bad issuer")]
    BadIssuer,
    #[error("expired")]
    Expired,
    #[error("principal type mismatch")]
    PrincipalTypeMismatch,
}

pub struct TokenVerifier<C: Clock> {
    issuer: String,
    decoding_key: DecodingKey,
    clock: C,
}

impl<C: Clock> TokenVerifier<C> {
    pub fn new(issuer: impl Into<String>, secret: &Secret, clock: C) -> Self {
        Self {
            issuer: issuer.into(),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            clock,
        }
    }

    /// Parses, verifies the MAC, and checks issuer/expiry. Does not check
    /// `TokenKind` — callers that require a specific kind should follow up
    /// with [`TokenVerifier::require_kind`].
    pub fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        if token.split('.').count() != 3 {
            return Err(VerifyError::Malformed);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is enforced manually below against our injected clock, not
        // jsonwebtoken's wall-clock `SystemTime::now()`, so tests can pin
        // the boundary instant exactly.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => VerifyError::BadSignature,
                jsonwebtoken::errors::ErrorKind::Base64(_)
                | jsonwebtoken::errors::ErrorKind::Json(_)
                | jsonwebtoken::errors::ErrorKind::Utf8(_) => VerifyError::Malformed,
                _ => VerifyError::BadSignature,
            })?
            .claims;

        if claims.issuer != self.issuer {
            return Err(VerifyError::BadIssuer);
        }

        if self.clock.now().timestamp() >= claims.exp {
            return Err(VerifyError::Expired);
        }

        Ok(claims)
    }

    pub fn require_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, VerifyError> {
        let claims = self.verify(token)?;
        if claims.kind != expected {
            return Err(VerifyError::PrincipalTypeMismatch);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::PrincipalType;
    use crate::auth::mint::{MintConfig, TokenMint};
    use crate::clock::test_support::FixedClock;
    use chrono::{Duration, Utc};

    fn harness() -> (TokenMint<FixedClock>, TokenVerifier<FixedClock>, FixedClock) {
        let secret = Secret::new(vec![9u8; 32]).unwrap();
        let clock = FixedClock::new(Utc::now());
        let config = MintConfig {
            issuer: "wishlist-auth".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            guest_ttl: Duration::hours(24),
        };
        let mint = TokenMint::new(config, &secret, clock.clone());
        let verifier = TokenVerifier::new("wishlist-auth", &secret, clock.clone());
        (mint, verifier, clock)
    }

    #[test]
    fn round_trips_claims() {
        let (mint, verifier, _clock) = harness();
        let token = mint.mint_access("user-1", "a@example.com", PrincipalType::Registered).unwrap();
        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "a@example.com");
        assert!(claims.is_access());
    }

    #[test]
    fn rejects_tampered_signature() {
        let (mint, verifier, _clock) = harness();
        let token = mint.mint_access("user-1", "a@example.com", PrincipalType::Registered).unwrap();
        let mut segments: Vec<&str> = token.split('.').collect();
        let mut mac: Vec<char> = segments[2].chars().collect();
        let last = mac.len() - 1;
        mac[last] = if mac[last] == 'A' { 'B' } else { 'A' };
        let tampered_mac: String = mac.into_iter().collect();
        segments[2] = &tampered_mac;
        let tampered = segments.join(".");

        assert_eq!(verifier.verify(&tampered).unwrap_err(), VerifyError::BadSignature);
    }

    #[test]
    fn rejects_malformed_structure() {
        let (_mint, verifier, _clock) = harness();
        assert_eq!(verifier.verify("not-a-jwt").unwrap_err(), VerifyError::Malformed);
    }

    #[test]
    fn rejects_exactly_at_expiry() {
        let (mint, verifier, clock) = harness();
        let token = mint.mint_access("user-1", "a@example.com", PrincipalType::Registered).unwrap();
        clock.advance(Duration::minutes(15));
        assert_eq!(verifier.verify(&token).unwrap_err(), VerifyError::Expired);
    }

    #[test]
    fn accepts_one_second_before_expiry() {
        let (mint, verifier, clock) = harness();
        let token = mint.mint_access("user-1", "a@example.com", PrincipalType::Registered).unwrap();
        clock.advance(Duration::minutes(15) - Duration::seconds(1));
        assert!(verifier.verify(&token).is_ok());
    }

    #[test]
    fn rejects_wrong_principal_kind() {
        let (mint, verifier, _clock) = harness();
        let refresh = mint.mint_refresh("user-1", "a@example.com", PrincipalType::Registered).unwrap();
        assert_eq!(
            verifier.require_kind(&refresh.token, TokenKind::Access).unwrap_err(),
            VerifyError::PrincipalTypeMismatch
        );
    }
}
