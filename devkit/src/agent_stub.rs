/*!
Mock Glances agent for development without a monitored machine

Serves `GET /api/3/fs` on a loopback port with scripted replies, so the
monitor can be exercised against drive lists, HTTP errors, malformed bodies
and agents that never answer. Every request is recorded for assertions.
*/

use anyhow::Result;
use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Path of the Glances filesystem listing endpoint.
pub const FS_PATH: &str = "/api/3/fs";

/// What the stub answers to one request.
#[derive(Debug, Clone)]
pub enum AgentReply {
    /// 200 with the given JSON document as body
    Drives(Value),
    /// Given status code with an empty body
    Status(u16),
    /// 200 with a raw, possibly malformed, body
    Body(String),
    /// Accept the connection and never answer
    Hang,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
}

struct Script {
    queue: VecDeque<AgentReply>,
    fallback: AgentReply,
}

impl Script {
    fn next(&mut self) -> AgentReply {
        self.queue.pop_front().unwrap_or_else(|| self.fallback.clone())
    }
}

/// Shared between the test handle and the router
#[derive(Clone)]
struct StubState {
    script: Arc<Mutex<Script>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubState {
    fn record(&self, method: &Method, uri: &Uri) {
        log::info!("[MOCK] {} {}", method, uri.path());
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            path: uri.path().to_string(),
        });
    }

    fn next_reply(&self) -> AgentReply {
        self.script.lock().unwrap().next()
    }
}

/// Loopback HTTP server standing in for one Glances agent
pub struct MockAgent {
    addr: SocketAddr,
    state: StubState,
    task: JoinHandle<()>,
}

impl MockAgent {
    /// Starts a stub answering with an empty drive list until scripted otherwise
    pub async fn start() -> Result<Self> {
        env_logger::try_init().ok();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = StubState {
            script: Arc::new(Mutex::new(Script {
                queue: VecDeque::new(),
                fallback: AgentReply::Drives(Value::Array(Vec::new())),
            })),
            requests: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route(FS_PATH, get(fs_listing))
            .fallback(unknown_path)
            .with_state(state.clone());

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::warn!("[MOCK] server stopped: {}", e);
            }
        });

        log::info!("[MOCK] Glances agent listening on {}", addr);
        Ok(Self { addr, state, task })
    }

    /// Starts a stub that keeps answering with `drives`
    pub async fn serving(drives: Value) -> Result<Self> {
        let agent = Self::start().await?;
        agent.reply_with(AgentReply::Drives(drives));
        Ok(agent)
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Replaces the standing reply and drops any queued one-shot replies
    pub fn reply_with(&self, reply: AgentReply) {
        let mut script = self.state.script.lock().unwrap();
        script.queue.clear();
        script.fallback = reply;
    }

    /// Queues a reply used for the next request only
    pub fn push_reply(&self, reply: AgentReply) {
        self.state.script.lock().unwrap().queue.push_back(reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }
}

impl Drop for MockAgent {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Returns a loopback port with nothing listening on it
pub fn unused_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

async fn fs_listing(State(state): State<StubState>, method: Method, uri: Uri) -> Response {
    state.record(&method, &uri);

    match state.next_reply() {
        AgentReply::Drives(drives) => (StatusCode::OK, Json(drives)).into_response(),
        AgentReply::Status(code) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        AgentReply::Body(body) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        AgentReply::Hang => std::future::pending().await,
    }
}

async fn unknown_path(State(state): State<StubState>, method: Method, uri: Uri) -> StatusCode {
    state.record(&method, &uri);
    StatusCode::NOT_FOUND
}
