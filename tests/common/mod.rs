#![allow(dead_code)]

use argo_console::modules::api::GatewayClient;
use argo_console::modules::form::ConfigForm;
use argo_console::modules::session::ConsoleSession;
use argo_console::modules::stats::stats_url;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri, header::CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Captured {
    pub method: &'static str,
    pub path: String,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

/// In-process stand-in for the gateway's admin surface.
#[derive(Clone, Default)]
pub struct MockGateway {
    pub frames: Vec<String>,
    pub hold_open: bool,
    pub uuid: Vec<String>,
    pub admin_status: Option<StatusCode>,
    pub requests: Arc<Mutex<Vec<Captured>>>,
}

impl MockGateway {
    pub fn with_frames(frames: &[&str]) -> Self {
        Self {
            frames: frames.iter().map(|f| f.to_string()).collect(),
            ..Self::default()
        }
    }

    fn capture(&self, method: &'static str, uri: &Uri, headers: Option<&HeaderMap>, body: Option<Value>) {
        let content_type = headers
            .and_then(|h| h.get(CONTENT_TYPE))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push(Captured {
            method,
            path: uri.path().to_string(),
            content_type,
            body,
        });
    }

    pub fn captured(&self) -> Vec<Captured> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn serve(self) -> SocketAddr {
        let app = Router::new()
            .route("/admin/uuid", get(uuid))
            .route("/admin", post(admin))
            .route("/apps/install", post(install))
            .route("/signalk/v1/api/messages/:key", get(message))
            .route("/ws/stats", get(stats))
            .with_state(self);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }
}

async fn uuid(State(gw): State<MockGateway>, uri: Uri) -> Json<Value> {
    gw.capture("GET", &uri, None, None);
    Json(json!({ "uuid": gw.uuid }))
}

async fn admin(
    State(gw): State<MockGateway>,
    headers: HeaderMap,
    uri: Uri,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    gw.capture("POST", &uri, Some(&headers), Some(body));
    match gw.admin_status {
        Some(status) => (status, "Could not parse data".to_string()),
        None => (StatusCode::OK, "saved".to_string()),
    }
}

async fn install(
    State(gw): State<MockGateway>,
    headers: HeaderMap,
    uri: Uri,
    Json(body): Json<Value>,
) -> StatusCode {
    gw.capture("POST", &uri, Some(&headers), Some(body));
    StatusCode::OK
}

async fn message(State(gw): State<MockGateway>, uri: Uri, Path(key): Path<String>) -> impl IntoResponse {
    gw.capture("GET", &uri, None, None);
    match key.as_str() {
        "126992" => Json(json!({
            "Description": "System Time",
            "Pgn": 126992,
            "Category": "Navigation",
            "Size": 8,
            "FieldList": [{"Name": "SID", "BitLength": 8}, {"Name": "Date", "BitLength": 16}]
        }))
        .into_response(),
        "broken" => (StatusCode::OK, "{\"Description\":").into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn stats(ws: WebSocketUpgrade, State(gw): State<MockGateway>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| push_frames(socket, gw))
}

async fn push_frames(mut socket: WebSocket, gw: MockGateway) {
    for frame in &gw.frames {
        if socket.send(Message::Text(frame.clone())).await.is_err() {
            return;
        }
    }
    if gw.hold_open {
        while let Some(Ok(msg)) = socket.recv().await {
            if matches!(msg, Message::Close(_)) {
                return;
            }
        }
        return;
    }
    let _ = socket.send(Message::Close(None)).await;
}

pub fn session_for(addr: SocketAddr, form: ConfigForm) -> ConsoleSession {
    let base = Url::parse(&format!("http://{addr}/")).unwrap();
    let socket = stats_url(&base).unwrap();
    let client = GatewayClient::new(base, Some(Duration::from_secs(5))).unwrap();
    ConsoleSession::new(client, socket, form)
}

/// An address nothing is listening on.
pub async fn dead_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
