// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end renewal scenarios.
//!
//! Runs a mock token-protected API on a loopback port and builds
//! [`SessionClient`]s pointed at it.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use tokenrelay::store::StoredSession;
use tokenrelay::{ClientConfig, CredentialPair, CredentialStore, MemoryStore, SessionClient};
use tokenrelay::{SessionEvent, TeardownReason};

/// How the mock's renewal endpoint behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Issue a new pair and start accepting the new access credential.
    Rotate,
    /// Reject every renewal with 401.
    Reject,
    /// Issue a new pair that the API still refuses.
    IssueRevoked,
}

/// One request the mock API received.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Bytes,
}

struct MockState {
    mode: RefreshMode,
    refresh_delay: Duration,
    valid_access: Mutex<String>,
    valid_refresh: Mutex<String>,
    issued: AtomicU32,
    refresh_calls: AtomicU32,
    seen: Mutex<Vec<SeenRequest>>,
}

/// A running mock API. The server task ends with the test runtime.
pub struct MockApi {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockApi {
    /// Start a mock that accepts `valid_access` and renews `valid_refresh`.
    pub async fn start(
        mode: RefreshMode,
        valid_access: &str,
        valid_refresh: &str,
        refresh_delay: Duration,
    ) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            mode,
            refresh_delay,
            valid_access: Mutex::new(valid_access.to_owned()),
            valid_refresh: Mutex::new(valid_refresh.to_owned()),
            issued: AtomicU32::new(0),
            refresh_calls: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/auth/refresh", post(refresh))
            .fallback(api)
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self { addr, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn refresh_calls(&self) -> u32 {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn valid_access(&self) -> String {
        self.state.valid_access.lock().clone()
    }

    /// Requests seen for `path`, in arrival order.
    pub fn requests_to(&self, path: &str) -> Vec<SeenRequest> {
        self.state.seen.lock().iter().filter(|r| r.path == path).cloned().collect()
    }

    pub fn request_count(&self) -> usize {
        self.state.seen.lock().len()
    }

    /// A client with its own in-memory store seeded from `session`.
    pub fn client(&self, session: StoredSession) -> anyhow::Result<TestClient> {
        let store = Arc::new(MemoryStore::new());
        store.save(&session);
        let client = SessionClient::new(&ClientConfig::new(self.base_url()), store.clone())?;
        let events = client.subscribe();
        Ok(TestClient { client, store, events })
    }

    /// A client holding `pair`.
    pub fn client_with_pair(&self, access: &str, refresh: &str) -> anyhow::Result<TestClient> {
        self.client(StoredSession {
            access_token: Some(access.to_owned()),
            refresh_token: Some(refresh.to_owned()),
            user: Some(serde_json::json!({ "id": 1, "username": "editor" })),
        })
    }
}

/// Client under test with direct access to its store and event stream.
pub struct TestClient {
    pub client: SessionClient,
    pub store: Arc<MemoryStore>,
    pub events: broadcast::Receiver<SessionEvent>,
}

impl TestClient {
    /// Drain pending events and return the teardown reasons among them.
    pub fn teardowns(&mut self) -> Vec<TeardownReason> {
        let mut reasons = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let SessionEvent::TornDown { reason, .. } = event {
                reasons.push(reason);
            }
        }
        reasons
    }

    pub fn pair(&self) -> Option<CredentialPair> {
        self.store.get()
    }
}

async fn refresh(
    State(state): State<Arc<MockState>>,
    Json(req): Json<serde_json::Value>,
) -> impl IntoResponse {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.refresh_delay).await;

    let presented = req["refreshToken"].as_str().unwrap_or_default().to_owned();
    if state.mode == RefreshMode::Reject || presented != *state.valid_refresh.lock() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "message": "refresh token expired" })),
        );
    }

    let n = state.issued.fetch_add(1, Ordering::SeqCst) + 1;
    let access = format!("access-{n}");
    let refresh = format!("refresh-{n}");
    if state.mode == RefreshMode::Rotate {
        *state.valid_access.lock() = access.clone();
    }
    *state.valid_refresh.lock() = refresh.clone();

    (StatusCode::OK, Json(serde_json::json!({ "accessToken": access, "refreshToken": refresh })))
}

async fn api(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let path = uri.path().to_owned();
    let authorization =
        headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_owned);
    state.seen.lock().push(SeenRequest {
        method: method.clone(),
        path: path.clone(),
        authorization: authorization.clone(),
        body: body.clone(),
    });

    match path.as_str() {
        "/auth/login" => {
            return (StatusCode::OK, Json(serde_json::json!({ "ok": true })));
        }
        "/invalid" => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({ "message": "title must not be empty" })),
            );
        }
        "/boom" => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "message": "database unavailable" })),
            );
        }
        _ => {}
    }

    let expected = format!("Bearer {}", state.valid_access.lock());
    if authorization.as_deref() != Some(expected.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "message": "Unauthorized", "path": path })),
        );
    }

    let echoed: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();
    (
        StatusCode::OK,
        Json(serde_json::json!({ "method": method.as_str(), "path": path, "body": echoed })),
    )
}
