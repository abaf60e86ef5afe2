// tests/common/mod.rs

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use quizlink::{
    ai::{GenerativeModel, ModelHandle},
    attempts::AttemptRegistry,
    config::Config,
    routes,
    state::AppState,
    store::MemoryDocumentStore,
};
use serde_json::{Value, json};

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        gemini_api_key: None,
        gemini_model: "gemini-test".to_string(),
        gemini_base_url: "http://127.0.0.1:9".to_string(),
        ai_rate_limit: None,
    }
}

/// Helper function to spawn the app on a random port for testing.
/// Backed by a fresh in-memory store, so tests never share data.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_model(None).await
}

pub async fn spawn_app_with_model(model: Option<Arc<dyn GenerativeModel>>) -> TestApp {
    let state = AppState {
        store: Arc::new(MemoryDocumentStore::new()),
        config: test_config(),
        ai: model.map(ModelHandle::new).unwrap_or_default(),
        attempts: AttemptRegistry::new(),
    };

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    // Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

pub struct TestUser {
    pub token: String,
    pub user_id: String,
    pub email: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, role: &str, display_name: &str) -> TestUser {
        let email = format!("{}@example.com", uuid::Uuid::new_v4().simple());
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "email": email,
                "password": "password123",
                "displayName": display_name,
                "role": role
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.unwrap();
        TestUser {
            token: body["token"].as_str().unwrap().to_string(),
            user_id: body["userId"].as_str().unwrap().to_string(),
            email,
        }
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_json(&self, path: &str, token: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put_json(&self, path: &str, token: &str, body: &Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Creates the one-question Math quiz and returns its id.
    pub async fn create_math_quiz(&self, token: &str, published: bool) -> String {
        let response = self.post_json("/api/quizzes", token, &math_quiz(published)).await;
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }
}

/// One true/false question worth 10 points; "o1" is correct.
pub fn math_quiz(published: bool) -> Value {
    json!({
        "title": "Math",
        "description": "Basic arithmetic",
        "questions": [{
            "id": "q1",
            "type": "true-false",
            "text": "1 + 1 = 2",
            "options": [
                {"id": "o1", "text": "True"},
                {"id": "o2", "text": "False"}
            ],
            "correctAnswer": ["o1"],
            "points": 10
        }],
        "isPublished": published,
        "isPublic": published,
        "category": "math"
    })
}

pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
