//! Deployment signing secret.
//!
//! Loaded once at startup, frozen for the process lifetime, never logged.
//! Misconfiguration (missing or too short) is a startup-time fatal condition,
//! not a runtime error, per the mint contract.

use zeroize::Zeroize;

pub const MIN_SECRET_BYTES: usize = 32;

pub struct Secret(Vec<u8>);

impl Secret {
    /// Builds a secret from raw bytes, rejecting anything shorter than the
    /// minimum required entropy budget.
    pub fn new(bytes: Vec<u8>) -> Result<Self, SecretError> {
        if bytes.len() < MIN_SECRET_BYTES {
            return Err(SecretError::TooShort { len: bytes.len() });
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Secret").field(&"<redacted>").finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("signing secret must be at least {MIN_SECRET_BYTES} bytes, got {len}")]
    TooShort { len: usize },
}
