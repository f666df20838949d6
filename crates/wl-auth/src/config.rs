//! Typed configuration assembled from the process environment, following
//! the teacher's `env_or`/`env_or_parse` pattern
//! (`bin/fc-platform-server/src/main.rs`).
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `WL_ISSUER` | `wishlist-auth` | Token issuer claim |
//! | `WL_SIGNING_SECRET` | - | HMAC signing secret, required, >= 32 bytes |
//! | `WL_ACCESS_TTL_SECS` | `900` | Access token lifetime |
//! | `WL_REFRESH_TTL_SECS` | `604800` | Refresh token lifetime |
//! | `WL_GUEST_TTL_SECS` | `86400` | Guest token lifetime |
//! | `WL_HANDOFF_TTL_SECS` | `60` | Handoff code lifetime, clamped to a 120s hard cap |
//! | `WL_HANDOFF_SWEEP_SECS` | `30` | Handoff evictor sweep period |
//! | `WL_ALLOWED_ORIGINS` | - | Comma-separated exact-match origin allow-list |
//! | `WL_REQUEST_DEADLINE_SECS` | `5` | Per-request timeout enforced by the server binary |
//! | `WL_RATE_<CLASS>_PER_MINUTE` | see `EndpointClass::default_limit` | Sustained rate override, per endpoint class |
//! | `WL_RATE_<CLASS>_BURST` | see `EndpointClass::default_limit` | Burst cap override, per endpoint class |
//!
//! `<CLASS>` is one of `LOGIN`, `REFRESH`, `HANDOFF_ISSUE`, `HANDOFF_EXCHANGE`.

use chrono::Duration;

use crate::admission::{EndpointClass, RateLimit};
use crate::secret::{Secret, SecretError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("WL_SIGNING_SECRET is not set")]
    MissingSigningSecret,
    #[error("WL_SIGNING_SECRET invalid: {0}")]
    InvalidSigningSecret(#[from] SecretError),
}

#[derive(Debug)]
pub struct AuthConfig {
    pub issuer: String,
    pub signing_secret: Secret,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub guest_ttl: Duration,
    pub handoff_ttl: Duration,
    pub handoff_sweep_interval: std::time::Duration,
    pub allowed_origins: Vec<String>,
    pub request_deadline: std::time::Duration,
    pub rate_limits: [(EndpointClass, RateLimit); 4],
}

const RATE_LIMITED_CLASSES: [(EndpointClass, &str); 4] = [
    (EndpointClass::Login, "LOGIN"),
    (EndpointClass::Refresh, "REFRESH"),
    (EndpointClass::HandoffIssue, "HANDOFF_ISSUE"),
    (EndpointClass::HandoffExchange, "HANDOFF_EXCHANGE"),
];

fn rate_limit_for(class: EndpointClass, env_name: &str) -> RateLimit {
    let default = class.default_limit();
    RateLimit {
        rate_per_minute: env_or_parse(&format!("WL_RATE_{env_name}_PER_MINUTE"), default.rate_per_minute),
        burst: env_or_parse(&format!("WL_RATE_{env_name}_BURST"), default.burst),
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Hard cap on `handoffTtl` (`spec.md` §6.4: "default 60s; hard cap 120s").
const HANDOFF_TTL_HARD_CAP_SECS: i64 = 120;

impl AuthConfig {
    /// Loads configuration from the environment. The signing secret is the
    /// one startup-fatal condition (`spec.md` §6.1): a missing or too-short
    /// secret must abort the process before it binds a socket, never surface
    /// as a runtime error on the first request.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret_raw = std::env::var("WL_SIGNING_SECRET").map_err(|_| ConfigError::MissingSigningSecret)?;
        let signing_secret = Secret::new(secret_raw.into_bytes())?;

        let allowed_origins = std::env::var("WL_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            issuer: env_or("WL_ISSUER", "wishlist-auth"),
            signing_secret,
            access_ttl: Duration::seconds(env_or_parse("WL_ACCESS_TTL_SECS", 900)),
            refresh_ttl: Duration::seconds(env_or_parse("WL_REFRESH_TTL_SECS", 604_800)),
            guest_ttl: Duration::seconds(env_or_parse("WL_GUEST_TTL_SECS", 86_400)),
            handoff_ttl: Duration::seconds(env_or_parse("WL_HANDOFF_TTL_SECS", 60).min(HANDOFF_TTL_HARD_CAP_SECS)),
            handoff_sweep_interval: std::time::Duration::from_secs(env_or_parse("WL_HANDOFF_SWEEP_SECS", 30)),
            allowed_origins,
            request_deadline: std::time::Duration::from_secs(env_or_parse("WL_REQUEST_DEADLINE_SECS", 5)),
            rate_limits: RATE_LIMITED_CLASSES.map(|(class, env_name)| (class, rate_limit_for(class, env_name))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // All cases run in one test: `std::env::var` is process-global, and
    // parallel test threads would otherwise race on the same env vars.
    #[test]
    fn loads_and_validates_from_env() {
        std::env::remove_var("WL_SIGNING_SECRET");
        assert!(matches!(AuthConfig::from_env().unwrap_err(), ConfigError::MissingSigningSecret));

        std::env::set_var("WL_SIGNING_SECRET", "too-short");
        assert!(matches!(AuthConfig::from_env().unwrap_err(), ConfigError::InvalidSigningSecret(_)));

        std::env::set_var("WL_SIGNING_SECRET", "01234567890123456789012345678901");
        std::env::set_var("WL_HANDOFF_TTL_SECS", "9999");
        let config = AuthConfig::from_env().unwrap();
        assert_eq!(config.handoff_ttl, Duration::seconds(HANDOFF_TTL_HARD_CAP_SECS));

        std::env::remove_var("WL_HANDOFF_TTL_SECS");
        std::env::remove_var("WL_SIGNING_SECRET");
    }
}
