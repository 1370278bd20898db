//! Router-level test harness: fixture models, a temp DB and a mock LLM.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crate::api::router::api_router;
use crate::chat::{ChatService, MockLlmClient};
use crate::core_state::CoreState;
use crate::inference::artifacts::tests::write_all;
use crate::inference::InferenceEngine;

pub(crate) struct TestApp {
    pub core: Arc<CoreState>,
    _tmp: tempfile::TempDir,
}

impl TestApp {
    /// All bundles loaded, chatbot answers "Mock reply".
    pub fn loaded() -> Self {
        Self::with_llm(true, MockLlmClient::new("Mock reply"))
    }

    /// No bundles loaded.
    pub fn unavailable() -> Self {
        Self::with_llm(false, MockLlmClient::new("Mock reply"))
    }

    pub fn with_llm(models: bool, llm: MockLlmClient) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let models_dir = tmp.path().join("models");
        std::fs::create_dir_all(&models_dir).unwrap();
        let engine = if models {
            write_all(&models_dir);
            InferenceEngine::load(&models_dir).unwrap()
        } else {
            InferenceEngine::load_lenient(&models_dir)
        };
        let chat = ChatService::new(Arc::new(llm), "llama3.2");
        let core = CoreState::new(engine, chat, tmp.path().join("medinfer.db"));
        Self {
            core: Arc::new(core),
            _tmp: tmp,
        }
    }

    pub fn router(&self) -> Router {
        api_router(self.core.clone())
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

pub(crate) async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(router, request).await
}

pub(crate) async fn post_json(router: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}
