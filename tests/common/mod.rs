//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use cafe_server::blob::LocalBlobStore;
use cafe_server::config::ServerConfig;
use cafe_server::mail::{Email, MailError, Mailer};
use cafe_server::security::rate_limit::ManualClock;
use cafe_server::security::{Principal, RateLimiters};
use cafe_server::store::MemoryStore;
use cafe_server::{build_router, AppState};

pub const ADMIN_EMAIL: &str = "owner@cafe.test";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";
pub const SECRET: &str = "test-secret-test-secret-test-secret";
pub const START_MS: u64 = 1_700_000_000_000;

/// Mailer that records every message and can be told to fail.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
    pub fail: AtomicBool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Rejected(503));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.admin.email = ADMIN_EMAIL.into();
    config.admin.password = ADMIN_PASSWORD.into();
    config.session.secret = SECRET.into();
    config.contact.notify_email = "hello@cafe.test".into();
    config.storage.seed_examples = false;
    config
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub uploads: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(test_config(), RecordingMailer::default())
    }

    pub fn with(mut config: ServerConfig, mailer: RecordingMailer) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        config.storage.upload_dir = uploads.path().display().to_string();

        let clock = Arc::new(ManualClock::new(START_MS));
        let limiters = RateLimiters::with_clock(&config.rate_limit, clock.clone());
        let store = Arc::new(MemoryStore::new(None));
        let mailer = Arc::new(mailer);
        let blobs = Arc::new(LocalBlobStore::new(uploads.path(), "/uploads"));

        let state = AppState::new(config, limiters, store.clone(), mailer.clone(), blobs).unwrap();
        let router = build_router(state.clone());

        Self {
            router,
            state,
            clock,
            store,
            mailer,
            uploads,
        }
    }

    pub fn token_for(&self, email: &str) -> String {
        self.state
            .signer
            .issue(&Principal::for_email(email, ADMIN_EMAIL))
    }

    pub fn admin_token(&self) -> String {
        self.token_for(ADMIN_EMAIL)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("session={token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
