//! HTTP + WebSocket API for the session server
//!
//! Endpoints:
//! - GET  /health                               - Health check
//! - POST /lock/acquire                         - Claim a lock
//! - POST /lock/release                         - Release a lock
//! - GET  /lock/:resource                       - Current holder
//! - GET  /locks                                - All held locks
//! - POST /player/:id/disconnect                - Release every lock of a player
//! - POST /progress                             - Broadcast a change event
//! - WS   /ws/:player                           - Change events from other players
//! - POST /screenshots/:player                  - Upload a screenshot
//! - GET  /screenshots                          - Player folders
//! - GET  /screenshots/:folder                  - Screenshots in a folder
//! - GET  /screenshots/:folder/:photo_id        - One screenshot

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{ws::{Message, WebSocket}, Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::core::registry::LockRegistry;
use crate::core::screenshot::{ScreenshotError, ScreenshotStore};
use crate::types::{ChangeEvent, LockClaimResult, LockRecord, PlayerId, ReasonCode, ScreenshotInfo};
use crate::{MIN_SCREENSHOT_INTERVAL_MS, RELAY_CHANNEL_CAPACITY};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Root of the universe directory (screenshots live below it)
    pub universe_dir: PathBuf,
    /// Minimum time between two uploads of one player
    pub screenshot_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            universe_dir: PathBuf::from("./Universe"),
            screenshot_interval_ms: MIN_SCREENSHOT_INTERVAL_MS,
        }
    }
}

/// App state
pub struct AppState {
    pub registry: Arc<LockRegistry>,
    pub screenshots: Arc<ScreenshotStore>,
    pub relay: broadcast::Sender<ChangeEvent>,
    /// Open WebSockets per player
    connections: DashMap<PlayerId, usize>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        let (relay, _) = broadcast::channel(RELAY_CHANNEL_CAPACITY);
        Self {
            registry: Arc::new(LockRegistry::new()),
            screenshots: Arc::new(ScreenshotStore::new(&config.universe_dir, config.screenshot_interval_ms)),
            relay,
            connections: DashMap::new(),
        }
    }

    /// Count a newly opened socket for `player`
    pub fn open_connection(&self, player: &PlayerId) -> usize {
        let mut open = self.connections.entry(player.clone()).or_insert(0);
        *open += 1;
        *open
    }

    /// Count a closed socket. When it was the player's last one, every lock
    /// the player holds is released and the released names are returned.
    pub fn close_connection(&self, player: &PlayerId) -> Option<Vec<String>> {
        let last = match self.connections.entry(player.clone()) {
            Entry::Occupied(mut open) if *open.get() > 1 => {
                *open.get_mut() -= 1;
                false
            }
            Entry::Occupied(open) => {
                open.remove();
                true
            }
            Entry::Vacant(_) => true,
        };
        last.then(|| self.registry.release_all(player))
    }
}

/// Lock claim/release request
#[derive(Debug, Deserialize)]
pub struct LockRequest {
    pub resource: String,
    pub requester: PlayerId,
}

/// Lock claim response
#[derive(Debug, Serialize)]
pub struct LockClaimResponse {
    pub resource: String,
    #[serde(flatten)]
    pub result: LockClaimResult,
    pub reason: ReasonCode,
}

/// Lock release response
#[derive(Debug, Serialize)]
pub struct LockReleaseResponse {
    pub resource: String,
    pub released: bool,
    pub reason: ReasonCode,
}

/// Lock holder response
#[derive(Debug, Serialize)]
pub struct HolderResponse {
    pub resource: String,
    pub holder: Option<PlayerId>,
}

/// Disconnect response
#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    pub player: PlayerId,
    pub released: Vec<String>,
}

/// Relay response
#[derive(Debug, Serialize)]
pub struct RelayResponse {
    /// Live subscribers the event was handed to
    pub receivers: usize,
}

/// Screenshot upload request
#[derive(Debug, Deserialize)]
pub struct ScreenshotUpload {
    pub date_taken: i64,
    pub data: Vec<u8>,
}

/// Screenshot upload response
#[derive(Debug, Serialize)]
pub struct ScreenshotSaved {
    pub folder: String,
    pub date_taken: i64,
    pub num_bytes: usize,
    pub reason: ReasonCode,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub locks_held: usize,
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
}

/// API errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Screenshot(#[from] ScreenshotError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, reason) = match &self {
            ApiError::Screenshot(e) => {
                let status = match e {
                    ScreenshotError::DuplicateWrite { .. } => StatusCode::CONFLICT,
                    ScreenshotError::RateExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
                    ScreenshotError::InvalidName(_) => StatusCode::BAD_REQUEST,
                    ScreenshotError::NotFound(_) => StatusCode::NOT_FOUND,
                    ScreenshotError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.reason())
            }
            ApiError::Task(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };
        let body = ErrorResponse {
            error: self.to_string(),
            reason,
        };
        (status, Json(body)).into_response()
    }
}

/// Create the API router with fresh state
pub fn create_router(config: ServerConfig) -> Router {
    create_router_with_state(Arc::new(AppState::new(&config)))
}

/// Create the API router around existing state
pub fn create_router_with_state(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/lock/acquire", post(acquire_lock))
        .route("/lock/release", post(release_lock))
        .route("/lock/:resource", get(get_holder))
        .route("/locks", get(list_locks))
        .route("/player/:id/disconnect", post(disconnect_player))
        .route("/progress", post(relay_change))
        .route("/ws/:player", get(websocket_handler))
        .route("/screenshots", get(screenshot_folders))
        .route("/screenshots/:folder", get(screenshot_list).post(upload_screenshot))
        .route("/screenshots/:folder/:photo_id", get(screenshot_download))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        locks_held: state.registry.len(),
    })
}

/// Claim a lock
async fn acquire_lock(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LockRequest>,
) -> Json<LockClaimResponse> {
    let result = state.registry.try_acquire(&req.resource, &req.requester);
    Json(LockClaimResponse {
        resource: req.resource,
        reason: result.reason(),
        result,
    })
}

/// Release a lock
async fn release_lock(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LockRequest>,
) -> Json<LockReleaseResponse> {
    let released = state.registry.release(&req.resource, &req.requester);
    Json(LockReleaseResponse {
        resource: req.resource,
        released,
        reason: if released {
            ReasonCode::L002_LOCK_RELEASED
        } else {
            ReasonCode::L002_RELEASE_DENIED
        },
    })
}

/// Current holder of a lock
async fn get_holder(
    State(state): State<Arc<AppState>>,
    Path(resource): Path<String>,
) -> Json<HolderResponse> {
    let holder = state.registry.holder_of(&resource);
    Json(HolderResponse { resource, holder })
}

/// All held locks
async fn list_locks(State(state): State<Arc<AppState>>) -> Json<Vec<LockRecord>> {
    Json(state.registry.locks())
}

/// Release every lock of a disconnected player
async fn disconnect_player(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<DisconnectResponse> {
    let player = PlayerId::new(id);
    let released = state.registry.release_all(&player);
    Json(DisconnectResponse { player, released })
}

/// Broadcast a change event to connected players
async fn relay_change(
    State(state): State<Arc<AppState>>,
    Json(event): Json<ChangeEvent>,
) -> Json<RelayResponse> {
    // No subscribers is not an error, the event is simply dropped
    let receivers = state.relay.send(event).unwrap_or(0);
    Json(RelayResponse { receivers })
}

/// WebSocket handler for change events
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(player): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let player = PlayerId::new(player);
    let rx = state.relay.subscribe();
    ws.on_upgrade(move |socket| handle_websocket(socket, state, player, rx))
}

/// Forward other players' events out, accept this player's events in.
/// Closing the player's last socket counts as a disconnect.
async fn handle_websocket(
    socket: WebSocket,
    state: Arc<AppState>,
    player: PlayerId,
    mut rx: broadcast::Receiver<ChangeEvent>,
) {
    let open = state.open_connection(&player);
    info!(%player, connections = open, "player connected");
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Ok(event) if event.origin() != &player => {
                    let json = serde_json::to_string(&event).unwrap_or_default();
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%player, skipped, "relay lagged, change events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ChangeEvent>(&text) {
                    Ok(event) if event.origin() == &player => {
                        let _ = state.relay.send(event);
                    }
                    Ok(event) => {
                        warn!(%player, origin = %event.origin(), "change event with foreign origin dropped");
                    }
                    Err(e) => debug!(%player, error = %e, "malformed change event"),
                },
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    match state.close_connection(&player) {
        Some(released) => info!(%player, released = released.len(), "player disconnected"),
        None => debug!(%player, "socket closed, player still connected"),
    }
}

/// Upload a screenshot
async fn upload_screenshot(
    State(state): State<Arc<AppState>>,
    Path(folder): Path<String>,
    Json(upload): Json<ScreenshotUpload>,
) -> Result<Json<ScreenshotSaved>, ApiError> {
    let store = Arc::clone(&state.screenshots);
    let player = PlayerId::new(folder.clone());
    let info = ScreenshotInfo::new(upload.date_taken, upload.data);
    let num_bytes = info.num_bytes;

    tokio::task::spawn_blocking(move || store.save(&player, &info)).await??;

    Ok(Json(ScreenshotSaved {
        folder,
        date_taken: upload.date_taken,
        num_bytes,
        reason: ReasonCode::S001_SCREENSHOT_SAVED,
    }))
}

/// List player folders
async fn screenshot_folders(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    let store = Arc::clone(&state.screenshots);
    let folders = tokio::task::spawn_blocking(move || store.folders()).await??;
    Ok(Json(folders))
}

/// List screenshots in a folder
async fn screenshot_list(
    State(state): State<Arc<AppState>>,
    Path(folder): Path<String>,
) -> Result<Json<Vec<ScreenshotInfo>>, ApiError> {
    let store = Arc::clone(&state.screenshots);
    let screenshots = tokio::task::spawn_blocking(move || store.list(&folder)).await??;
    Ok(Json(screenshots))
}

/// Download one screenshot
async fn screenshot_download(
    State(state): State<Arc<AppState>>,
    Path((folder, photo_id)): Path<(String, i64)>,
) -> Result<Json<ScreenshotInfo>, ApiError> {
    let store = Arc::clone(&state.screenshots);
    let screenshot = tokio::task::spawn_blocking(move || store.get(&folder, photo_id)).await??;
    Ok(Json(screenshot))
}

/// Run the API server
pub async fn run_server(addr: &str, config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router(config.clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        universe = %config.universe_dir.display(),
        screenshot_interval_ms = config.screenshot_interval_ms,
        "session server listening"
    );
    axum::serve(listener, router).await?;
    Ok(())
}
