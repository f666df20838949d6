//! Component A — Token Mint.
//!
//! Produces signed access/refresh/guest tokens: a compact
//! `base64url(header).base64url(claims).base64url(mac)` string, HMAC-SHA256
//! over the first two segments. `jsonwebtoken` is used as the encoding/MAC
//! engine (HS256) rather than hand-rolled base64+HMAC, the same crate the
//! teacher uses for its own access tokens.

use chrono::Duration;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::AuthError;
use crate::secret::Secret;

use super::claims::{Claims, PrincipalType, TokenKind};

#[derive(Debug, Clone)]
pub struct MintConfig {
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub guest_ttl: Duration,
}

pub struct TokenMint<C: Clock> {
    config: MintConfig,
    encoding_key: EncodingKey,
    clock: C,
}

/// A minted refresh token plus the fresh `tokenId` it carries, so the
/// Orchestrator can log/track rotation without re-parsing the token.
pub struct MintedRefresh {
    pub token: String,
    pub token_id: String,
}

impl<C: Clock> TokenMint<C> {
    pub fn new(config: MintConfig, secret: &Secret, clock: C) -> Self {
        Self {
            config,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            clock,
        }
    }

    pub fn mint_access(
        &self,
        subject: &str,
        email: &str,
        principal_type: PrincipalType,
    ) -> Result<String, AuthError> {
        self.encode(subject, email, principal_type, TokenKind::Access, self.config.access_ttl, None)
    }

    pub fn mint_refresh(
        &self,
        subject: &str,
        email: &str,
        principal_type: PrincipalType,
    ) -> Result<MintedRefresh, AuthError> {
        let token_id = Uuid::new_v4().to_string();
        let token = self.encode(
            subject,
            email,
            principal_type,
            TokenKind::Refresh,
            self.config.refresh_ttl,
            Some(token_id.clone()),
        )?;
        Ok(MintedRefresh { token, token_id })
    }

    pub fn mint_guest(&self, subject: &str, email: &str) -> Result<String, AuthError> {
        self.encode(subject, email, PrincipalType::Guest, TokenKind::Guest, self.config.guest_ttl, None)
    }

    fn encode(
        &self,
        subject: &str,
        email: &str,
        principal_type: PrincipalType,
        kind: TokenKind,
        ttl: Duration,
        token_id: Option<String>,
    ) -> Result<String, AuthError> {
        let now = self.clock.now();
        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            principal_type,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            issuer: self.config.issuer.clone(),
            kind,
            token_id,
        };

        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("failed to mint token: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_support::FixedClock;
    use chrono::Utc;

    fn mint() -> TokenMint<FixedClock> {
        let secret = Secret::new(vec![7u8; 32]).unwrap();
        let clock = FixedClock::new(Utc::now());
        let config = MintConfig {
            issuer: "wishlist-auth".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            guest_ttl: Duration::hours(24),
        };
        TokenMint::new(config, &secret, clock)
    }

    #[test]
    fn mints_access_token_with_three_segments() {
        let mint = mint();
        let token = mint.mint_access("user-1", "a@example.com", PrincipalType::Registered).unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn refresh_tokens_get_distinct_token_ids() {
        let mint = mint();
        let r1 = mint.mint_refresh("user-1", "a@example.com", PrincipalType::Registered).unwrap();
        let r2 = mint.mint_refresh("user-1", "a@example.com", PrincipalType::Registered).unwrap();
        assert_ne!(r1.token_id, r2.token_id);
    }

    #[test]
    fn expires_at_is_strictly_after_issued_at() {
        let mint = mint();
        let token = mint.mint_guest("guest-1", "guest@example.com").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let claims_json = jsonwebtoken::decode::<Claims>(
            &token,
            &jsonwebtoken::DecodingKey::from_secret(&[7u8; 32]),
            &{
                let mut v = jsonwebtoken::Validation::new(Algorithm::HS256);
                v.validate_exp = false;
                v.required_spec_claims.clear();
                v
            },
        )
        .unwrap();
        assert!(claims_json.claims.exp > claims_json.claims.iat);
        assert_eq!(parts.len(), 3);
    }
}
