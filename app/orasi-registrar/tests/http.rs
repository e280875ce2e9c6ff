//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! HTTP endpoint tests

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use orasi_registrar::{
    http::{HttpServer, WEIGHT_UPDATED},
    store::MemoryStore,
    Registrar, ServiceDescriptor, StopHandle,
};
use std::sync::Arc;
use tower::ServiceExt;

fn descriptor() -> ServiceDescriptor {
    ServiceDescriptor::new("orders", "10.0.0.5:9000").with_weight(10)
}

async fn test_app(store: &MemoryStore) -> (Router, Arc<Registrar>, StopHandle) {
    let registrar = Arc::new(Registrar::new(Arc::new(store.clone())));
    let handle = registrar.register(descriptor(), 5).await.unwrap();
    let app = HttpServer::new(registrar.clone()).create_router();
    (app, registrar, handle)
}

async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_update_weight() {
    let store = MemoryStore::new();
    let (app, registrar, handle) = test_app(&store).await;

    let (status, body) = send(app, "GET", "/weight?weight=50").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, WEIGHT_UPDATED);
    let server = registrar.get_server_info().await.unwrap().unwrap();
    assert_eq!(server.weight, 50);
    assert_eq!(server.addr, "10.0.0.5:9000");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_update_weight_via_post() {
    let store = MemoryStore::new();
    let (app, registrar, handle) = test_app(&store).await;

    let (status, _) = send(app, "POST", "/weight?weight=-3").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(registrar.descriptor().await.unwrap().weight, -3);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_update_weight_rejects_bad_input() {
    let store = MemoryStore::new();
    let (app, registrar, handle) = test_app(&store).await;
    let puts = store.calls().await.puts;

    for uri in ["/weight?weight=heavy", "/weight", "/weight?weight="] {
        let (status, body) = send(app.clone(), "GET", uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body.contains("invalid weight"), "{uri}: {body}");
    }

    assert_eq!(store.calls().await.puts, puts);
    assert_eq!(registrar.descriptor().await.unwrap().weight, 10);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_update_weight_store_failure() {
    let store = MemoryStore::new();
    let (app, _registrar, handle) = test_app(&store).await;

    store.fail_next_puts(1).await;
    let (status, body) = send(app, "GET", "/weight?weight=7").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("rejected"), "{body}");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_update_weight_before_register() {
    let registrar = Arc::new(Registrar::new(Arc::new(MemoryStore::new())));
    let app = HttpServer::new(registrar).create_router();

    let (status, _) = send(app, "GET", "/weight?weight=7").await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_server_info() {
    let store = MemoryStore::new();
    let (app, registrar, handle) = test_app(&store).await;

    let (status, body) = send(app.clone(), "GET", "/server").await;
    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["server"]["addr"], "10.0.0.5:9000");
    assert_eq!(value["server"]["weight"], 10);

    handle.shutdown().await.unwrap();
    assert!(registrar.get_server_info().await.unwrap().is_none());

    let (status, _) = send(app, "GET", "/server").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_live() {
    let store = MemoryStore::new();
    let (app, _registrar, handle) = test_app(&store).await;

    let (status, body) = send(app, "GET", "/health/live").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("alive"));

    handle.shutdown().await.unwrap();
}
