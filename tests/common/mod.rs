#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use feathers_pos::{
    config::{AppConfig, StockPolicy},
    db,
    events::{self, EventSender},
    seed,
    services::employees::EmployeeView,
    AppState,
};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const MANAGER_ID: i32 = 2;
pub const CASHIER_ID: i32 = 3;
pub const FIVE_PIECE_MEAL: i32 = 3;

/// Inventory ids of the starter stock
pub mod stock {
    pub const CHICKEN_TENDERS: i32 = 1;
    pub const FISH_FILLET: i32 = 2;
    pub const FRIES_PORTION: i32 = 3;
    pub const SAUCE_CUP: i32 = 8;
}

/// Helper harness for an application backed by a throwaway SQLite file
/// holding the starter menu, stock and staff.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    manager_token: String,
    cashier_token: String,
    _event_task: tokio::task::JoinHandle<()>,
    _dir: TempDir,
}

/// A decoded JSON response
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

/// Knobs for a `TestApp`. A single pooled connection serialises every
/// request at the pool; concurrency tests ask for more.
pub struct TestAppBuilder {
    stock_policy: StockPolicy,
    max_connections: u32,
}

impl TestAppBuilder {
    pub fn stock_policy(mut self, stock_policy: StockPolicy) -> Self {
        self.stock_policy = stock_policy;
        self
    }

    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub async fn build(self) -> TestApp {
        TestApp::start(self).await
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::builder().build().await
    }

    pub async fn with_policy(stock_policy: StockPolicy) -> Self {
        Self::builder().stock_policy(stock_policy).build().await
    }

    pub fn builder() -> TestAppBuilder {
        TestAppBuilder {
            stock_policy: StockPolicy::Reject,
            max_connections: 1,
        }
    }

    /// Construct a new test application with fresh database state.
    async fn start(settings: TestAppBuilder) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("feathers_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "integration_session_secret_with_enough_entropy_91".to_string(),
            "test".to_string(),
        );
        cfg.stock_policy = settings.stock_policy;
        cfg.kitchen_poll_max_wait_secs = 5;
        cfg.db_max_connections = settings.max_connections;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        seed::seed_defaults(&pool)
            .await
            .expect("failed to seed starter data");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);

        let manager_token = state
            .sessions
            .issue(EmployeeView {
                id: MANAGER_ID,
                name: "Jordan Lee".into(),
                username: Some("jlee".into()),
                is_manager: true,
            })
            .expect("issue manager session")
            .token;
        let cashier_token = state
            .sessions
            .issue(EmployeeView {
                id: CASHIER_ID,
                name: "Sam Rivera".into(),
                username: Some("srivera".into()),
                is_manager: false,
            })
            .expect("issue cashier session")
            .token;

        let router = feathers_pos::app_router(state.clone());

        Self {
            router,
            state,
            manager_token,
            cashier_token,
            _event_task: event_task,
            _dir: dir,
        }
    }

    pub fn manager_token(&self) -> &str {
        &self.manager_token
    }

    pub fn cashier_token(&self) -> &str {
        &self.cashier_token
    }

    /// Send a request against the router with optional body, token and headers.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");

        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("parse response body")
        };
        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None, None, &[]).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body), None, &[]).await
    }

    pub async fn get_as_manager(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None, Some(self.manager_token()), &[])
            .await
    }

    pub async fn send_as_manager(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        self.send(method, uri, body, Some(self.manager_token()), &[])
            .await
    }

    /// Current quantity of an inventory item, read through the API.
    pub async fn stock_of(&self, inventory_item_id: i32) -> i64 {
        let response = self
            .get(&format!("/api/v1/inventory/{}", inventory_item_id))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.data()["quantity"]
            .as_i64()
            .expect("quantity is a number")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
