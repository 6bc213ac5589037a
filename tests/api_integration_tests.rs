//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each shard route.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use coherent_kv::{
    api::create_router, coherence::HttpChannelFactory, AppState, ShardService,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app(max_cache: usize) -> Router {
    let shard = ShardService::new(max_cache, Arc::new(HttpChannelFactory::new()));
    create_router(AppState::new(Arc::new(shard)))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// == Single-key Tests ==

#[tokio::test]
async fn test_put_then_get() {
    let app = create_test_app(0);

    let (status, body) = post(&app, "/put", json!({"key": "1", "value": "x"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = post(&app, "/get", json!({"key": "1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], "x");
}

#[tokio::test]
async fn test_get_absent_key_is_empty() {
    let app = create_test_app(0);
    let (status, body) = post(&app, "/get", json!({"key": "missing"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], "");
}

#[tokio::test]
async fn test_put_overwrites_through_server_cache() {
    let app = create_test_app(8);
    post(&app, "/put", json!({"key": "k", "value": "1"})).await;
    post(&app, "/get", json!({"key": "k"})).await;
    post(&app, "/put", json!({"key": "k", "value": "2"})).await;

    let (_, body) = post(&app, "/get", json!({"key": "k"})).await;
    assert_eq!(body["value"], "2");
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let app = create_test_app(0);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/put")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"key": 1}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

// == Batch Tests ==

#[tokio::test]
async fn test_batch_put_then_batch_get() {
    let app = create_test_app(0);

    let (status, _) = post(
        &app,
        "/batch_put",
        json!({"keys": ["a", "b", "c"], "values": ["1", "2", "3"]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(&app, "/batch_get", json!({"keys": ["a", "b", "c", "d"]})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["values"], json!(["1", "2", "3", ""]));
}

#[tokio::test]
async fn test_batch_put_length_mismatch() {
    let app = create_test_app(0);

    let (status, body) = post(
        &app,
        "/batch_put",
        json!({"keys": ["a", "b"], "values": ["1"]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (_, body) = post(&app, "/batch_get", json!({"keys": ["a"]})).await;
    assert_eq!(body["values"], json!([""]));
}

#[tokio::test]
async fn test_batch_op_on_empty_store() {
    let app = create_test_app(0);

    let (status, body) = post(
        &app,
        "/batch_op",
        json!({"ops": [
            {"kind": "GET", "key": "x"},
            {"kind": "PUT", "key": "y", "value": "9"},
            {"kind": "GET", "key": "y"}
        ]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!(["", "", "9"]));
}

// == Registration Tests ==

#[tokio::test]
async fn test_register_cache() {
    let app = create_test_app(0);

    let (status, body) = post(
        &app,
        "/register_cache",
        json!({"key": "k", "client_addr": "127.0.0.1:7000"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (_, stats) = get(&app, "/stats").await;
    assert_eq!(stats["watched_keys"], 1);
}

#[tokio::test]
async fn test_register_cache_empty_addr_rejected() {
    let app = create_test_app(0);
    let (status, _) = post(&app, "/register_cache", json!({"key": "k", "client_addr": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_cache_unaddressable_endpoint() {
    let app = create_test_app(0);
    let (status, body) = post(
        &app,
        "/register_cache",
        json!({"key": "k", "client_addr": "http://[::1"}),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_get_with_unaddressable_client_still_returns_value() {
    let app = create_test_app(0);
    post(&app, "/put", json!({"key": "k", "value": "v"})).await;

    let (status, body) = post(
        &app,
        "/get",
        json!({"key": "k", "client_addr": "http://[::1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], "v");

    let (_, stats) = get(&app, "/stats").await;
    assert_eq!(stats["watched_keys"], 0);
}

// == Stats and Health Tests ==

#[tokio::test]
async fn test_stats_counts_operations() {
    let app = create_test_app(4);
    post(&app, "/put", json!({"key": "a", "value": "1"})).await;
    post(&app, "/get", json!({"key": "a"})).await;
    post(&app, "/get", json!({"key": "a"})).await;
    post(&app, "/batch_get", json!({"keys": ["a", "b"]})).await;

    let (status, stats) = get(&app, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["gets"], 4);
    assert_eq!(stats["puts"], 1);
    assert_eq!(stats["keys"], 1);
    assert_eq!(stats["cache"]["capacity"], 4);
    assert!(stats["invalidations"]["delivered"].is_u64());
}

#[tokio::test]
async fn test_stats_without_server_cache() {
    let app = create_test_app(0);
    let (_, stats) = get(&app, "/stats").await;
    assert!(stats["cache"].is_null());
    assert_eq!(stats["cache_hit_rate"], 0.0);
}

#[tokio::test]
async fn test_health() {
    let app = create_test_app(0);
    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_unknown_route() {
    let app = create_test_app(0);
    let response = app
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
