//! Component E (origin half) — exact-match CORS allow-list.
//!
//! `spec.md` §4.E: no wildcards, no suffix matches, scheme/host/port all
//! significant. Rendered via `tower_http::cors`, the same crate family the
//! teacher already depends on for CORS in `bin/fc-platform-server`
//! (there configured permissively with `Any`; here exact-match).

use std::collections::HashSet;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::auth::cookie::REFRESH_COOKIE_NAME;

#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: HashSet<String>,
}

impl OriginPolicy {
    pub fn new(allowed: impl IntoIterator<Item = String>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    /// Exact-match only: differs by a single character (port, scheme,
    /// trailing slash) and it's rejected (`spec.md` §8 Boundary behaviours).
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed.contains(origin)
    }

    /// Builds the `tower_http` CORS layer: credentials allowed, the
    /// `authorization` header both allowed and exposed, preflight cached for
    /// 24 hours (`spec.md` §4.E). Disallowed origins simply get no
    /// `Access-Control-Allow-Origin` echoed back — the browser, not this
    /// layer, then blocks the real request.
    pub fn cors_layer(&self) -> CorsLayer {
        let allowed = self.allowed.clone();

        CorsLayer::new()
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE])
            .expose_headers([axum::http::header::AUTHORIZATION])
            .max_age(std::time::Duration::from_secs(24 * 60 * 60))
            .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
                origin
                    .to_str()
                    .map(|o| allowed.contains(o))
                    .unwrap_or(false)
            }))
    }
}

/// Name of the cookie the Gate reads refresh tokens from, re-exported here
/// since the origin layer and the gate both need it at the HTTP boundary.
pub const REFRESH_COOKIE: &str = REFRESH_COOKIE_NAME;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_only() {
        let policy = OriginPolicy::new(["https://app.example.com".to_string()]);
        assert!(policy.is_allowed("https://app.example.com"));
        assert!(!policy.is_allowed("https://app.example.com/"));
        assert!(!policy.is_allowed("http://app.example.com"));
        assert!(!policy.is_allowed("https://app.example.com:8443"));
        assert!(!policy.is_allowed("https://evil.example"));
    }
}
