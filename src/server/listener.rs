//! HTTP/WebSocket listener
//!
//! Serves room and stream descriptions and upgrades signaling, chat and
//! viewer-count sockets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

use crate::chat::run_chat_client;
use crate::directory::{Room, RoomDirectory};
use crate::error::Result;
use crate::rtc::{Environment, RtcBackend, WebrtcBackend};
use crate::server::config::ServerConfig;
use crate::server::viewers::serve_viewer_count;
use crate::server::ws::split_socket;
use crate::session::{SessionRole, SignalingSession};

/// Shared state behind every route
struct ServerState {
    config: ServerConfig,
    directory: Arc<RoomDirectory>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

/// WebRTC relay server
pub struct RelayServer {
    state: Arc<ServerState>,
}

impl RelayServer {
    /// Create a server backed by the `webrtc` engine
    pub fn new(config: ServerConfig) -> Result<Self> {
        let backend = WebrtcBackend::new(config.ice_config())?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Create a server with a custom engine backend
    pub fn with_backend(config: ServerConfig, backend: Arc<dyn RtcBackend>) -> Self {
        let directory = Arc::new(RoomDirectory::with_policy(backend, config.retry_policy));
        Self::with_directory(config, directory)
    }

    /// Create a server around an existing directory
    pub fn with_directory(config: ServerConfig, directory: Arc<RoomDirectory>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            state: Arc::new(ServerState {
                config,
                directory,
                next_session_id: AtomicU64::new(1),
                connection_semaphore,
            }),
        }
    }

    /// Get a reference to the room directory
    pub fn directory(&self) -> &Arc<RoomDirectory> {
        &self.state.directory
    }

    /// Build the HTTP router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/room/create", get(room_create))
            .route("/room/:uuid", get(room_page))
            .route("/room/:uuid/websocket", get(room_websocket))
            .route("/room/:uuid/chat/websocket", get(room_chat_websocket))
            .route("/room/:uuid/viewer/websocket", get(room_viewer_websocket))
            .route("/stream/:suuid", get(stream_page))
            .route("/stream/:suuid/websocket", get(stream_websocket))
            .route("/stream/:suuid/chat/websocket", get(stream_chat_websocket))
            .route("/stream/:suuid/viewer/websocket", get(stream_viewer_websocket))
            .with_state(Arc::clone(&self.state))
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.state.config.bind_addr).await?;
        tracing::info!(
            addr = %self.state.config.bind_addr,
            environment = ?self.state.config.environment,
            "Relay server listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        Ok(())
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> std::net::SocketAddr {
        self.state.config.bind_addr
    }
}

/// Addresses advertised for a room or stream page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct PageLinks {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_websocket_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_websocket_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_websocket_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_websocket_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_link: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_stream: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub leave: bool,
}

impl PageLinks {
    pub fn room(environment: Environment, host: &str, room: &Room) -> Self {
        let ws = environment.ws_scheme();
        let http = http_scheme(environment);
        let id = room.id();

        Self {
            kind: Some("room"),
            room_websocket_addr: Some(format!("{}://{}/room/{}/websocket", ws, host, id)),
            room_link: Some(format!("{}://{}/room/{}", http, host, id)),
            chat_websocket_addr: Some(format!("{}://{}/room/{}/chat/websocket", ws, host, id)),
            viewer_websocket_addr: Some(format!("{}://{}/room/{}/viewer/websocket", ws, host, id)),
            stream_link: Some(format!("{}://{}/stream/{}", http, host, room.public_id())),
            ..Default::default()
        }
    }

    pub fn stream(environment: Environment, host: &str, public_id: &str) -> Self {
        let ws = environment.ws_scheme();

        Self {
            kind: Some("stream"),
            stream_websocket_addr: Some(format!("{}://{}/stream/{}/websocket", ws, host, public_id)),
            chat_websocket_addr: Some(format!("{}://{}/stream/{}/chat/websocket", ws, host, public_id)),
            viewer_websocket_addr: Some(format!(
                "{}://{}/stream/{}/viewer/websocket",
                ws, host, public_id
            )),
            ..Default::default()
        }
    }

    pub fn no_stream() -> Self {
        Self {
            no_stream: true,
            leave: true,
            ..Default::default()
        }
    }
}

fn http_scheme(environment: Environment) -> &'static str {
    match environment {
        Environment::Production => "https",
        Environment::Development => "http",
    }
}

fn request_host(headers: &HeaderMap, state: &ServerState) -> String {
    headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| state.config.bind_addr.to_string())
}

async fn room_create() -> Redirect {
    Redirect::to(&format!("/room/{}", Uuid::new_v4()))
}

async fn room_page(
    Path(uuid): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<ServerState>>,
) -> Json<PageLinks> {
    let room = state.directory.resolve(&uuid).await;
    let host = request_host(&headers, &state);
    Json(PageLinks::room(state.config.environment, &host, &room))
}

async fn stream_page(
    Path(suuid): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<ServerState>>,
) -> Json<PageLinks> {
    match state.directory.resolve_by_public_id(&suuid).await {
        Ok(_) => {
            let host = request_host(&headers, &state);
            Json(PageLinks::stream(state.config.environment, &host, &suuid))
        }
        Err(e) => {
            tracing::debug!(error = %e, "Stream page requested for unknown stream");
            Json(PageLinks::no_stream())
        }
    }
}

async fn room_websocket(
    Path(uuid): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> Response {
    let room = state.directory.resolve(&uuid).await;
    upgrade_signaling(ws, state, room, SessionRole::Participant)
}

async fn stream_websocket(
    Path(suuid): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> Response {
    match state.directory.resolve_by_public_id(&suuid).await {
        Ok(room) => upgrade_signaling(ws, state, room, SessionRole::Viewer),
        Err(e) => not_found(e),
    }
}

async fn room_chat_websocket(
    Path(uuid): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> Response {
    match state.directory.lookup(&uuid).await {
        Some(room) => upgrade_chat(ws, state, room),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn stream_chat_websocket(
    Path(suuid): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> Response {
    match state.directory.resolve_by_public_id(&suuid).await {
        Ok(room) => upgrade_chat(ws, state, room),
        Err(e) => not_found(e),
    }
}

async fn room_viewer_websocket(
    Path(uuid): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> Response {
    match state.directory.lookup(&uuid).await {
        Some(room) => upgrade_viewer_count(ws, state, room),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn stream_viewer_websocket(
    Path(suuid): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> Response {
    match state.directory.resolve_by_public_id(&suuid).await {
        Ok(room) => upgrade_viewer_count(ws, state, room),
        Err(e) => not_found(e),
    }
}

fn not_found(err: crate::directory::DirectoryError) -> Response {
    tracing::debug!(error = %err, "Socket requested for unknown stream");
    StatusCode::NOT_FOUND.into_response()
}

fn acquire_permit(state: &ServerState) -> std::result::Result<Option<OwnedSemaphorePermit>, ()> {
    match state.connection_semaphore {
        Some(ref sem) => match Arc::clone(sem).try_acquire_owned() {
            Ok(permit) => Ok(Some(permit)),
            Err(_) => Err(()),
        },
        None => Ok(None),
    }
}

fn upgrade_signaling(
    ws: WebSocketUpgrade,
    state: Arc<ServerState>,
    room: Arc<Room>,
    role: SessionRole,
) -> Response {
    // Check connection limit
    let permit = match acquire_permit(&state) {
        Ok(permit) => permit,
        Err(()) => {
            tracing::warn!(room = %room.id(), "Connection rejected: limit reached");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };

    let session_id = state.next_session_id.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(session_id = session_id, room = %room.id(), role = ?role, "New signaling connection");

    ws.on_upgrade(move |socket| async move {
        let _permit = permit;
        let (inbound, outbound) = split_socket(socket);

        let session = SignalingSession::new(
            session_id,
            role,
            Arc::clone(room.negotiator()),
            Arc::clone(state.directory.backend()),
            state.config.session_config(),
        );

        if let Err(e) = session.run(inbound, outbound).await {
            tracing::debug!(session_id = session_id, error = %e, "Session error");
        }
    })
}

fn upgrade_chat(ws: WebSocketUpgrade, state: Arc<ServerState>, room: Arc<Room>) -> Response {
    let config = state.config.chat_config();
    ws.on_upgrade(move |socket| async move {
        let (inbound, outbound) = split_socket(socket);
        run_chat_client(room.hub().clone(), inbound, outbound, config).await;
    })
}

fn upgrade_viewer_count(ws: WebSocketUpgrade, state: Arc<ServerState>, room: Arc<Room>) -> Response {
    let interval = state.config.viewer_poll_interval;
    let write_timeout = state.config.write_timeout;
    ws.on_upgrade(move |socket| async move {
        let (inbound, outbound) = split_socket(socket);
        serve_viewer_count(
            Arc::clone(room.negotiator()),
            inbound,
            outbound,
            interval,
            write_timeout,
        )
        .await;
    })
}
