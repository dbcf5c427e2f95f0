//! Shared test helpers for API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use sharebox_api::{AppState, build_app};
use sharebox_core::config::AppConfig;
use sharebox_database::MemoryStore;
use sharebox_service::{ServiceContext, Stores};
use sharebox_storage::StorageManager;
use sharebox_storage::providers::MemoryStorageProvider;

/// Test application backed by in-memory stores.
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Record stores
    pub store: Arc<MemoryStore>,
    /// Object store
    pub objects: Arc<MemoryStorageProvider>,
    /// Caller identity sent with authenticated requests
    pub user_id: Uuid,
    _temp: TempDir,
}

impl TestApp {
    /// External storage: clients get presigned URLs.
    pub fn new() -> Self {
        Self::with_config(false, |_| {})
    }

    /// Internal storage: transfers are proxied.
    pub fn internal() -> Self {
        Self::with_config(true, |_| {})
    }

    /// Build with a tweaked configuration.
    pub fn with_config(is_internal: bool, tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let temp = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = AppConfig::default();
        config.server.temp_dir = temp.path().join("spool").to_string_lossy().into_owned();
        tweak(&mut config);

        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryStorageProvider::new());
        let storage =
            StorageManager::from_provider(objects.clone(), is_internal, config.storage.clone());
        let services = ServiceContext::new(&config, storage, Stores::memory(store.clone()))
            .expect("Failed to build services");

        Self {
            router: build_app(AppState::new(config, services)),
            store,
            objects,
            user_id: Uuid::new_v4(),
            _temp: temp,
        }
    }

    /// JSON request as the test user.
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        self.send(method, path, body, Some(self.user_id)).await
    }

    /// JSON request with an explicit identity.
    pub async fn send(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        user: Option<Uuid>,
    ) -> TestResponse {
        let body = body
            .map(|b| serde_json::to_vec(&b).expect("Failed to serialize body"))
            .unwrap_or_default();
        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");
        if let Some(user) = user {
            req = req.header("x-user-id", user.to_string());
        }
        self.dispatch(req.body(Body::from(body)).expect("Failed to build request"))
            .await
    }

    /// Raw body request as the test user.
    pub async fn send_bytes(&self, method: &str, path: &str, body: &'static [u8]) -> TestResponse {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("x-user-id", self.user_id.to_string())
            .body(Body::from(body))
            .expect("Failed to build request");
        self.dispatch(req).await
    }

    async fn dispatch(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024 * 1024)
            .await
            .expect("Failed to read body");
        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            bytes,
            body,
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub bytes: Bytes,
    /// Parsed JSON body, or null
    pub body: Value,
}

impl TestResponse {
    /// A header value as text.
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}
