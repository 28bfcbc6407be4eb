use crate::config::{Config, StoreBackend};
use crate::routes;
use crate::state::AppState;
use crate::store::{Item, ProductStore, ScanPage};
use anyhow::Result;
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{Request, StatusCode, header},
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

pub fn test_config() -> Config {
    Config {
        store_backend: StoreBackend::Memory,
        service_port: 3000,
        service_host: "0.0.0.0".to_string(),
        scan_page_size: 100,
        scan_max_pages: 10_000,
    }
}

/// Full router backed by the given store
pub fn setup_test_app(store: Arc<dyn ProductStore>, config: Config) -> Router {
    let state = AppState {
        store,
        config: Arc::new(config),
    };
    routes::router(state)
}

/// A body one byte over axum's default 2 MiB request limit
pub fn oversized_body() -> String {
    "x".repeat(2 * 1024 * 1024 + 1)
}

/// Store whose scan always hands back the same continuation token
#[derive(Default)]
pub struct StuckScanStore {
    scan_calls: AtomicUsize,
}

impl StuckScanStore {
    pub const TOKEN: &'static str = "x";

    pub fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductStore for StuckScanStore {
    async fn get(&self, _product_id: &str) -> Result<Option<Item>> {
        Ok(None)
    }

    async fn put(&self, _item: Item) -> Result<()> {
        Ok(())
    }

    async fn update_field(&self, _product_id: &str, key: &str, value: JsonValue) -> Result<Item> {
        let mut updated = Item::new();
        updated.insert(key.to_string(), value);
        Ok(updated)
    }

    async fn delete(&self, _product_id: &str) -> Result<Option<Item>> {
        Ok(None)
    }

    async fn scan_page(&self, _start_after: Option<&str>, _limit: usize) -> Result<ScanPage> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ScanPage {
            items: vec![],
            continuation: Some(Self::TOKEN.to_string()),
        })
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Send one request through the router
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<String>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|value| value.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    TestResponse {
        status,
        content_type,
        body,
    }
}
