//! Component F — Authenticated Request Gate.
//!
//! An Axum `FromRequestParts` extractor plus a `tower::Layer` that injects
//! the verifier into request extensions, modeled directly on the teacher's
//! `Authenticated`/`AuthLayer`/`AuthMiddleware` trio
//! (`fc-platform/src/shared/middleware.rs`). The gate only accepts access
//! tokens, rejecting refresh or guest principal types presented where an
//! access token is required (`spec.md` §4.F).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, header::COOKIE, request::Parts, HeaderValue},
    response::Response,
};
use tower::{Layer, Service};
use tracing::debug;

use crate::admission::origin::REFRESH_COOKIE;
use crate::auth::{Claims, TokenKind, TokenVerifier};
use crate::clock::SystemClock;
use crate::error::AuthError;

/// Shared verifier handle, injected into request extensions by [`GateLayer`].
#[derive(Clone)]
pub struct GateState(pub Arc<TokenVerifier<SystemClock>>);

/// Extracted principal, attached to the request context for downstream
/// handlers. Carries the full claim bundle per `spec.md` §4.F.
pub struct Authenticated(pub Claims);

impl std::ops::Deref for Authenticated {
    type Target = Claims;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub fn extract_bearer(header_value: &str) -> Option<&str> {
    header_value.strip_prefix("Bearer ")
}

fn extract_cookie<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').map(|c| c.trim()).find_map(|c| {
                let (cookie_name, value) = c.split_once('=')?;
                (cookie_name == name).then_some(value)
            })
        })
}

fn presented_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v: &HeaderValue| v.to_str().ok())
        .and_then(extract_bearer)
        .or_else(|| extract_cookie(parts, REFRESH_COOKIE))
}

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let gate_state = parts
            .extensions
            .get::<GateState>()
            .ok_or_else(|| AuthError::internal("gate state not configured"))?
            .clone();

        let token = presented_token(parts).ok_or(AuthError::Unauthorized)?;

        let claims = gate_state.0.require_kind(token, TokenKind::Access).map_err(|e| {
            debug!(error = %e, "gate rejected token");
            AuthError::Unauthorized
        })?;

        Ok(Authenticated(claims))
    }
}

/// Layer that inserts [`GateState`] into every request's extensions so the
/// [`Authenticated`] extractor can find it downstream.
#[derive(Clone)]
pub struct GateLayer {
    state: GateState,
}

impl GateLayer {
    pub fn new(verifier: Arc<TokenVerifier<SystemClock>>) -> Self {
        Self {
            state: GateState(verifier),
        }
    }
}

impl<S> Layer<S> for GateLayer {
    type Service = GateMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GateMiddleware {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct GateMiddleware<S> {
    inner: S,
    state: GateState,
}

impl<S, B> Service<axum::http::Request<B>> for GateMiddleware<S>
where
    S: Service<axum::http::Request<B>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        req.extensions_mut().insert(self.state.clone());
        Box::pin(self.inner.call(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bearer_prefix() {
        assert_eq!(extract_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer("abc.def.ghi"), None);
    }
}
