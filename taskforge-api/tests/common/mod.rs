/// Common test utilities for the HTTP integration tests
///
/// Every context gets its own in-memory store, session cache and
/// notification queue, so tests run in parallel without Postgres or Redis.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use taskforge_api::app::{build_router, AppState};
use taskforge_api::config::ApiConfig;
use taskforge_shared::auth::password::PasswordParams;
use taskforge_shared::config::EngineConfig;
use taskforge_shared::engine::Engine;
use taskforge_shared::notify::MemoryNotificationQueue;
use taskforge_shared::session::MemorySessionCache;
use taskforge_shared::store::MemoryStore;
use tower::ServiceExt;

/// Test context containing the router and its backends
#[allow(dead_code)]
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub queue: Arc<MemoryNotificationQueue>,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MemoryNotificationQueue::new());

        let engine = Engine::new(
            store.clone(),
            Arc::new(MemorySessionCache::new()),
            queue.clone(),
            EngineConfig {
                app_url: "https://app.test".to_string(),
                password: PasswordParams {
                    memory_kib: 1024,
                    iterations: 1,
                    parallelism: 1,
                },
                ..Default::default()
            },
        );

        let config = ApiConfig {
            production: false,
            ..Default::default()
        };

        Self {
            app: build_router(AppState::new(engine, config)),
            store,
            queue,
        }
    }

    /// Sends one request; returns the status, headers and JSON body
    /// (`Value::Null` for empty bodies)
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, headers, json)
    }

    /// Last `code=` value sent to `to`
    pub fn code_sent_to(&self, to: &str) -> String {
        let message = self
            .queue
            .sent()
            .into_iter()
            .rev()
            .find(|n| n.to == to)
            .expect("no message for recipient");
        let (_, code) = message.body.split_once("code=").expect("message has no code");
        code.trim().to_string()
    }

    /// Registers, verifies and logs in; returns the session token
    pub async fn signed_in(&self, email: &str) -> String {
        let (status, _, _) = self
            .send(
                "POST",
                "/v1/auth/register",
                None,
                Some(serde_json::json!({ "email": email, "password": "pw1" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let code = self.code_sent_to(email);
        let (status, _, _) = self
            .send("GET", &format!("/v1/auth/verify?code={}", code), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, body) = self
            .send(
                "POST",
                "/v1/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": "pw1" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        body["token"].as_str().unwrap().to_string()
    }
}
