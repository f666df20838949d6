//! Claim bundle shared by access, refresh, and guest tokens.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrincipalType {
    Registered,
    Guest,
}

/// Which of the three mint operations produced a token. Carried so the
/// Verifier and Gate can reject a refresh token presented where an access
/// token is required, and vice versa (`PrincipalTypeMismatch`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Guest,
}

/// Canonical claim set. Field order here is the canonical key order the
/// Mint serializes in; `serde_json` preserves struct field order for
/// non-map types, which is what the MAC is computed over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id (registered) or freshly generated guest id.
    pub sub: String,
    pub email: String,
    #[serde(rename = "principalType")]
    pub principal_type: PrincipalType,
    #[serde(rename = "issuedAt")]
    pub iat: i64,
    #[serde(rename = "expiresAt")]
    pub exp: i64,
    pub issuer: String,
    pub kind: TokenKind,
    /// Only set on refresh tokens: a fresh id minted with each issuance,
    /// enabling a future revocation list without breaking the wire shape.
    #[serde(rename = "tokenId", skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
}

impl Claims {
    pub fn is_refresh(&self) -> bool {
        matches!(self.kind, TokenKind::Refresh)
    }

    pub fn is_access(&self) -> bool {
        matches!(self.kind, TokenKind::Access)
    }

    pub fn is_guest(&self) -> bool {
        matches!(self.kind, TokenKind::Guest)
    }
}
