#![cfg(feature = "server")]

//! HTTP surface tests: the router reflects manager and flag store state.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use brewtrace::{create_router, DevProvider, FeatureFlagStore, WalletSessionManager, DEV_ACCOUNT};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

async fn test_router() -> (Router, Arc<WalletSessionManager>, Arc<FeatureFlagStore>) {
    let flags = Arc::new(FeatureFlagStore::in_memory());
    let provider = Arc::new(DevProvider::new().with_chain(137));
    let manager = Arc::new(WalletSessionManager::start(Some(provider), flags.clone()).await);
    (create_router(manager.clone(), flags.clone()), manager, flags)
}

async fn body_json(body: Body) -> Value {
    let bytes = to_bytes(body, usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_service() {
    let (router, manager, _) = test_router().await;
    let response = router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "brewtrace");
    manager.close();
}

#[tokio::test]
async fn session_endpoint_reflects_manager() {
    let (router, manager, _) = test_router().await;
    let response = router.oneshot(get("/session")).await.unwrap();
    let body = body_json(response.into_body()).await;
    assert_eq!(body["provider_available"], true);
    assert_eq!(body["is_connected"], false);
    assert_eq!(body["state"], "disconnected");
    manager.close();
}

#[tokio::test]
async fn connect_endpoint_returns_success_shape() {
    let (router, manager, _) = test_router().await;
    let response = router.clone().oneshot(post("/wallet/connect", "{}")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["address"], DEV_ACCOUNT);

    let response = router.oneshot(get("/session")).await.unwrap();
    let body = body_json(response.into_body()).await;
    assert_eq!(body["is_connected"], true);
    assert_eq!(body["network_name"], "Polygon");
    manager.close();
}

#[tokio::test]
async fn connect_endpoint_reports_flag_gate() {
    let (router, manager, flags) = test_router().await;
    flags.toggle(brewtrace::FeatureFlag::WalletConnect);

    let response = router.oneshot(post("/wallet/connect", "{}")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.into_body()).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("disabled"));
    manager.close();
}

#[tokio::test]
async fn switch_endpoint_reports_new_network() {
    let (router, manager, _) = test_router().await;
    let response = router
        .oneshot(post("/wallet/switch", r#"{"chain_id": 1}"#))
        .await
        .unwrap();
    let body = body_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["chain_id"], 1);
    assert_eq!(body["network_name"], "Ethereum Mainnet");
    manager.close();
}

#[tokio::test]
async fn toggle_rejects_unknown_flag() {
    let (router, manager, flags) = test_router().await;
    let response = router
        .clone()
        .oneshot(post("/flags/toggle", r#"{"flag": "ENABLE_TIME_TRAVEL"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .oneshot(post("/flags/toggle", r#"{"flag": "ENABLE_MINTING"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.into_body()).await;
    assert_eq!(body["ENABLE_MINTING"], false);
    assert!(!flags.get().minting);
    manager.close();
}

#[tokio::test]
async fn reset_endpoint_restores_defaults() {
    let (router, manager, flags) = test_router().await;
    flags.toggle(brewtrace::FeatureFlag::Marketplace);

    let response = router.oneshot(post("/flags/reset", "{}")).await.unwrap();
    let body = body_json(response.into_body()).await;
    assert_eq!(body["ENABLE_MARKETPLACE"], true);
    assert!(flags.get().marketplace);
    manager.close();
}
