#![allow(dead_code)]

//! Local launcher backend for tests.
//!
//! Serves catalog documents on `/api/streams` and `/api/resync` and answers
//! stream URLs under `/live/` with 200 for registered files and 404 otherwise.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

struct ServerState {
    streams: Value,
    resync: Value,
    feed_status: StatusCode,
    live: HashSet<String>,
    feed_hits: AtomicUsize,
    probe_hits: AtomicUsize,
}

/// Builder for a [`FeedServer`].
pub struct FeedServerBuilder {
    streams: Value,
    resync: Option<Value>,
    feed_status: StatusCode,
    live: HashSet<String>,
}

impl FeedServerBuilder {
    /// Document served by `/api/resync`; defaults to the streams document.
    pub fn resync(mut self, document: Value) -> Self {
        self.resync = Some(document);
        self
    }

    /// Answers both feed endpoints with `status` and an error body.
    pub fn feed_status(mut self, status: StatusCode) -> Self {
        self.feed_status = status;
        self
    }

    /// Registers a file under `/live/` that answers 200.
    pub fn live(mut self, file: &str) -> Self {
        self.live.insert(file.to_string());
        self
    }

    pub async fn start(self) -> FeedServer {
        let state = Arc::new(ServerState {
            resync: self.resync.unwrap_or_else(|| self.streams.clone()),
            streams: self.streams,
            feed_status: self.feed_status,
            live: self.live,
            feed_hits: AtomicUsize::new(0),
            probe_hits: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/api/streams", get(streams))
            .route("/api/resync", get(resync))
            .route("/live/{file}", get(live_stream))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind feed server");
        let addr = listener.local_addr().expect("feed server address");
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Feed server stopped: {}", e);
            }
        });

        FeedServer { addr, state, task }
    }
}

/// Running local backend; aborted on drop.
pub struct FeedServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    task: JoinHandle<()>,
}

impl FeedServer {
    pub fn builder(streams: Value) -> FeedServerBuilder {
        FeedServerBuilder {
            streams,
            resync: None,
            feed_status: StatusCode::OK,
            live: HashSet::new(),
        }
    }

    /// Base URL to configure the catalog feed with.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Absolute URL of a path on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }

    /// Number of requests answered on the feed endpoints.
    pub fn feed_hits(&self) -> usize {
        self.state.feed_hits.load(Ordering::SeqCst)
    }

    /// Number of requests answered under `/live/`.
    pub fn probe_hits(&self) -> usize {
        self.state.probe_hits.load(Ordering::SeqCst)
    }
}

impl Drop for FeedServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn streams(State(state): State<Arc<ServerState>>) -> Response {
    feed_response(&state, &state.streams)
}

async fn resync(State(state): State<Arc<ServerState>>) -> Response {
    feed_response(&state, &state.resync)
}

fn feed_response(state: &ServerState, document: &Value) -> Response {
    state.feed_hits.fetch_add(1, Ordering::SeqCst);
    if state.feed_status != StatusCode::OK {
        return (state.feed_status, Json(json!({ "error": "unavailable" }))).into_response();
    }
    Json(document.clone()).into_response()
}

async fn live_stream(
    State(state): State<Arc<ServerState>>,
    Path(file): Path<String>,
) -> StatusCode {
    state.probe_hits.fetch_add(1, Ordering::SeqCst);
    if state.live.contains(&file) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}
