//! `GET /healthz`, grounded on the teacher's `shared/health_api.rs` but
//! trimmed to what a stateless core actually has to report: process
//! liveness and reachability of the injected Identity Store, with no
//! database of its own to ping.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;

use crate::identity::IdentityStore;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Clone)]
pub struct HealthState {
    pub identity: Arc<dyn IdentityStore>,
}

pub async fn get_health(State(state): State<HealthState>) -> impl IntoResponse {
    if state.identity.is_reachable().await {
        (StatusCode::OK, Json(HealthResponse { status: "healthy" }))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse { status: "unhealthy" }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::memory::InMemoryIdentityStore;

    #[tokio::test]
    async fn reports_healthy_when_identity_store_reachable() {
        let state = HealthState { identity: Arc::new(InMemoryIdentityStore::new()) };
        let response = get_health(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
