//! HTTP surface consumed by the dashboard UI
//!
//! Thin JSON layer over the session manager and the flag store. Connect
//! and switch results keep the `{success, ...}` shape the UI renders
//! directly; nothing here holds state of its own.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::flags::{FeatureFlag, FeatureFlagStore};
use crate::session::WalletSessionManager;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<WalletSessionManager>,
    pub flags: Arc<FeatureFlagStore>,
    pub service_name: String,
}

impl AppState {
    pub fn new(
        manager: Arc<WalletSessionManager>,
        flags: Arc<FeatureFlagStore>,
        service_name: impl Into<String>,
    ) -> Self {
        Self { manager, flags, service_name: service_name.into() }
    }
}

pub fn create_router(manager: Arc<WalletSessionManager>, flags: Arc<FeatureFlagStore>) -> Router {
    create_router_with_name(manager, flags, "brewtrace")
}

pub fn create_router_with_name(
    manager: Arc<WalletSessionManager>,
    flags: Arc<FeatureFlagStore>,
    service_name: &str,
) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session", get(session))
        .route("/wallet/connect", post(wallet_connect))
        .route("/wallet/disconnect", post(wallet_disconnect))
        .route("/wallet/switch", post(wallet_switch))
        .route("/flags", get(flags_get))
        .route("/flags/toggle", post(flags_toggle))
        .route("/flags/reset", post(flags_reset))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(manager, flags, service_name))
}

async fn health(State(s): State<AppState>) -> impl IntoResponse {
    Json(json!({"status": "ok", "service": s.service_name}))
}

async fn session(State(s): State<AppState>) -> impl IntoResponse {
    Json(s.manager.session())
}

async fn wallet_connect(State(s): State<AppState>) -> Json<Value> {
    match s.manager.connect().await {
        Ok(address) => Json(json!({"success": true, "address": address})),
        Err(e) => Json(json!({"success": false, "error": e.to_string()})),
    }
}

async fn wallet_disconnect(State(s): State<AppState>) -> impl IntoResponse {
    s.manager.disconnect_wallet();
    Json(s.manager.session())
}

#[derive(Deserialize)]
struct SwitchRequest {
    chain_id: u64,
}

#[derive(Serialize)]
struct SwitchResponse {
    success: bool,
    chain_id: u64,
    network_name: String,
}

async fn wallet_switch(
    State(s): State<AppState>,
    Json(payload): Json<SwitchRequest>,
) -> Json<SwitchResponse> {
    let success = s.manager.switch_network(payload.chain_id).await;
    let session = s.manager.session();
    Json(SwitchResponse { success, chain_id: session.chain_id, network_name: session.network_name })
}

async fn flags_get(State(s): State<AppState>) -> impl IntoResponse {
    Json(s.flags.get())
}

#[derive(Deserialize)]
struct ToggleRequest {
    flag: String,
}

async fn flags_toggle(
    State(s): State<AppState>,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let flag = FeatureFlag::from_str(&payload.flag)
        .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("unknown flag: {}", payload.flag)))?;
    s.flags.toggle(flag);
    Ok(Json(serde_json::to_value(s.flags.get()).unwrap_or(Value::Null)))
}

async fn flags_reset(State(s): State<AppState>) -> impl IntoResponse {
    s.flags.reset();
    Json(s.flags.get())
}
