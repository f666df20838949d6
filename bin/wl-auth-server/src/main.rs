//! Wishlist Auth Server
//!
//! Thin Axum binary wiring the `wl-auth` core components into HTTP routes:
//! login, refresh, logout, web-to-mobile handoff issue/exchange, and guest
//! reservation tokens, fronted by the origin and rate admission policies.
//!
//! ## Environment Variables
//!
//! See `wl_auth::config::AuthConfig` for the full list (`WL_SIGNING_SECRET`,
//! `WL_ISSUER`, `WL_ALLOWED_ORIGINS`, the various `WL_*_TTL_SECS`, etc).
//! Additionally:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `WL_API_PORT` | `8080` | HTTP API port |
//! | `RUST_LOG` | `info` | Log level |

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use wl_auth::admission::{EndpointClass, OriginPolicy, RateLimiter};
use wl_auth::auth::cookie::{CookieDirective, CookieValue, REFRESH_COOKIE_NAME};
use wl_auth::auth::{HandoffBroker, MintConfig, RefreshSource, SessionOrchestrator, TokenMint, TokenVerifier};
use wl_auth::clock::SystemClock;
use wl_auth::config::AuthConfig;
use wl_auth::error::AuthError;
use wl_auth::gate::{extract_bearer, Authenticated, GateLayer};
use wl_auth::health::{get_health, HealthState};
use wl_auth::identity::memory::InMemoryIdentityStore;
use wl_auth::identity::IdentityStore;

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<SessionOrchestrator<SystemClock>>,
    rate_limiter: Arc<RateLimiter<SystemClock>>,
}

fn remote_key(addr: SocketAddr) -> String {
    addr.ip().to_string()
}

fn apply_cookie(jar: CookieJar, directive: CookieDirective) -> CookieJar {
    match directive.value {
        CookieValue::Set(token) => {
            let cookie = Cookie::build((directive.name, token))
                .http_only(directive.http_only)
                .secure(directive.secure)
                .same_site(if directive.same_site_none { SameSite::None } else { SameSite::Lax })
                .path(directive.path)
                .max_age(time::Duration::seconds(directive.max_age_secs))
                .build();
            jar.add(cookie)
        }
        CookieValue::Clear => jar.remove(Cookie::from(directive.name)),
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct UserPayload {
    subject: String,
    email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    access_token: String,
    refresh_token: String,
    user: UserPayload,
}

async fn login_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    state.rate_limiter.check(EndpointClass::Login, &remote_key(addr))?;
    let outcome = state.orchestrator.login(&req.email, &req.password).await?;
    let jar = apply_cookie(CookieJar::new(), outcome.cookie);
    Ok((
        jar,
        Json(SessionResponse {
            access_token: outcome.access_token,
            refresh_token: outcome.refresh_token,
            user: UserPayload {
                subject: outcome.user.subject,
                email: outcome.user.email,
            },
        }),
    ))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

async fn refresh_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    headers: HeaderMap,
    body: Result<Json<RefreshRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    state.rate_limiter.check(EndpointClass::Refresh, &remote_key(addr))?;

    let cookie_token = jar.get(REFRESH_COOKIE_NAME).map(|c| c.value().to_string());
    let header_token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer)
        .map(str::to_string);
    let body_token = body.ok().and_then(|Json(b)| b.refresh_token);

    let token = cookie_token
        .as_deref()
        .map(RefreshSource::Cookie)
        .or_else(|| header_token.as_deref().map(RefreshSource::BearerHeader))
        .or_else(|| body_token.as_deref().map(RefreshSource::BodyField))
        .ok_or(AuthError::RefreshRejected)?;

    let outcome = state.orchestrator.refresh(token)?;
    let jar = apply_cookie(CookieJar::new(), outcome.cookie);
    Ok((
        jar,
        Json(serde_json::json!({
            "accessToken": outcome.access_token,
            "refreshToken": outcome.refresh_token,
        })),
    ))
}

async fn logout_handler(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.orchestrator.logout();
    let jar = apply_cookie(CookieJar::new(), outcome.cookie);
    (jar, Json(serde_json::json!({})))
}

#[derive(Serialize)]
struct HandoffIssueResponse {
    code: String,
    #[serde(rename = "expiresIn")]
    expires_in_secs: u64,
}

async fn mobile_handoff_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Authenticated(claims): Authenticated,
) -> Result<impl IntoResponse, AuthError> {
    state.rate_limiter.check(EndpointClass::HandoffIssue, &remote_key(addr))?;
    let outcome = state.orchestrator.handoff_issue(&claims.sub)?;
    Ok(Json(HandoffIssueResponse {
        code: outcome.code,
        expires_in_secs: outcome.expires_in_secs,
    }))
}

#[derive(Deserialize)]
struct ExchangeRequest {
    code: String,
}

async fn exchange_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<ExchangeRequest>,
) -> Result<impl IntoResponse, AuthError> {
    state.rate_limiter.check(EndpointClass::HandoffExchange, &remote_key(addr))?;
    let outcome = state.orchestrator.handoff_exchange(&req.code).await?;
    Ok(Json(SessionResponse {
        access_token: outcome.access_token,
        refresh_token: outcome.refresh_token,
        user: UserPayload {
            subject: outcome.user.subject,
            email: outcome.user.email,
        },
    }))
}

#[derive(Deserialize)]
struct GuestRequest {
    email: String,
}

async fn guest_handler(State(state): State<AppState>, Json(req): Json<GuestRequest>) -> Result<impl IntoResponse, AuthError> {
    let outcome = state.orchestrator.issue_guest_token(&req.email)?;
    Ok(Json(serde_json::json!({ "guestToken": outcome.guest_token })))
}

async fn me_handler(Authenticated(claims): Authenticated) -> impl IntoResponse {
    Json(serde_json::json!({
        "subject": claims.sub,
        "email": claims.email,
        "principalType": claims.principal_type,
    }))
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    wl_common::logging::init_logging("wl-auth-server");
    info!("Starting wishlist auth server");

    let config = AuthConfig::from_env()?;
    let clock = SystemClock;

    let mint_config = MintConfig {
        issuer: config.issuer.clone(),
        access_ttl: config.access_ttl,
        refresh_ttl: config.refresh_ttl,
        guest_ttl: config.guest_ttl,
    };
    let mint = TokenMint::new(mint_config, &config.signing_secret, clock);
    let verifier = TokenVerifier::new(config.issuer.clone(), &config.signing_secret, clock);
    let gate_verifier = Arc::new(TokenVerifier::new(config.issuer.clone(), &config.signing_secret, clock));

    let shutdown = CancellationToken::new();
    let broker = Arc::new(HandoffBroker::new(config.handoff_ttl, clock));
    broker.spawn_evictor(config.handoff_sweep_interval, shutdown.clone());

    // No external identity backend is wired into this binary: user
    // registration and credential storage live outside the auth core
    // (`spec.md` §1). The in-memory store stands in until a real one is
    // plugged in at this seam.
    let identity: Arc<dyn IdentityStore> = Arc::new(InMemoryIdentityStore::new());

    let orchestrator = Arc::new(SessionOrchestrator::new(
        mint,
        verifier,
        broker,
        identity.clone(),
        config.refresh_ttl.num_seconds(),
        config.handoff_ttl.num_seconds() as u64,
    ));

    let rate_limiter = Arc::new(RateLimiter::with_limits(config.rate_limits, clock));
    let origin_policy = OriginPolicy::new(config.allowed_origins.clone());

    let app_state = AppState { orchestrator, rate_limiter };
    let health_state = HealthState { identity };

    let auth_router = Router::new()
        .route("/auth/login", post(login_handler))
        .route("/auth/refresh", post(refresh_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/guest", post(guest_handler))
        .route("/auth/mobile-handoff", post(mobile_handoff_handler))
        .route("/auth/exchange", post(exchange_handler))
        .route("/auth/me", get(me_handler))
        .with_state(app_state);

    let health_router = Router::new().route("/healthz", get(get_health)).with_state(health_state);

    let app = Router::new()
        .merge(auth_router)
        .merge(health_router)
        .layer(GateLayer::new(gate_verifier))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, config.request_deadline))
        .layer(TraceLayer::new_for_http())
        .layer(origin_policy.cors_layer());

    let port: u16 = env_or_parse("WL_API_PORT", 8080);
    let addr = format!("0.0.0.0:{port}");
    info!("Listening on http://{addr}");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    info!("Wishlist auth server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
