//! HTTP server for the dashboard's mock analysis and chat API.
//!
//! This module provides an HTTP server that:
//! - Accepts a camera frame via multipart upload and returns a mock analysis
//! - Serves the contact directory and the employee/HR chat threads
//!
//! # Architecture
//!
//! ```text
//! Dashboard ──→ POST /api/analyze-face ──→ decode ──→ presence ──→ mock engine
//!           ──→ GET|POST /api/chats/:id ──→ message store
//!           ──→ GET /api/quick-replies ──→ canned replies per role
//! ```

use crate::activity::{create_shared_log, SharedActivityLog};
use crate::config::{Config, DetectorConfig, EngineConfig};
use crate::capture::Frame;
use crate::core::{
    AnalysisResult, FaceAnalysis, MockEngine, PresenceDetector, RecommendationTable,
};
use crate::messaging::{Contact, Message, MessageError, MessageStore, Role};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

/// Multipart field carrying the frame.
pub const IMAGE_FIELD: &str = "image";

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Dashboard origins allowed by CORS.
const ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Artificial delay before analysis responses
    pub analysis_delay: Duration,
    pub detector: DetectorConfig,
    pub engine: EngineConfig,
    pub recommendations: RecommendationTable,
    /// Shared activity counters, if the caller wants them
    pub activity: Option<SharedActivityLog>,
}

impl ServerConfig {
    /// Create a server configuration with default analysis settings
    pub fn new(port: u16) -> Self {
        Self {
            port,
            analysis_delay: Duration::from_millis(1000),
            detector: DetectorConfig::default(),
            engine: EngineConfig::default(),
            recommendations: RecommendationTable::default(),
            activity: None,
        }
    }

    /// Build from the agent configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            port: config.server.port,
            analysis_delay: config.server.analysis_delay,
            detector: config.detector.clone(),
            engine: config.engine.clone(),
            recommendations: config.recommendations.clone(),
            activity: None,
        }
    }

    pub fn with_analysis_delay(mut self, delay: Duration) -> Self {
        self.analysis_delay = delay;
        self
    }

    pub fn with_activity_log(mut self, log: SharedActivityLog) -> Self {
        self.activity = Some(log);
        self
    }
}

/// Shared server state
pub struct ServerState {
    engine: Mutex<MockEngine>,
    detector: PresenceDetector,
    messages: MessageStore,
    activity: SharedActivityLog,
    analysis_delay: Duration,
}

impl ServerState {
    /// Create new server state seeded with the demo chat threads
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            engine: Mutex::new(MockEngine::new(
                config.engine.clone(),
                config.recommendations.clone(),
            )),
            detector: PresenceDetector::from_config(&config.detector),
            messages: MessageStore::with_demo_data(),
            activity: config.activity.clone().unwrap_or_else(create_shared_log),
            analysis_delay: config.analysis_delay,
        }
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn activity(&self) -> &SharedActivityLog {
        &self.activity
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: Option<&str>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.map(str::to_string),
        }),
    )
}

/// Query for the contact directory
#[derive(Debug, Deserialize)]
pub struct ContactQuery {
    pub q: Option<String>,
}

/// Directory entry with the latest message preview
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactEntry {
    #[serde(flatten)]
    pub contact: Contact,
    pub last_message: Option<Message>,
}

/// Query for the quick-reply list
#[derive(Debug, Deserialize)]
pub struct QuickReplyQuery {
    pub role: Option<String>,
}

/// Canned replies for one side of the chat
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickRepliesResponse {
    pub role: Role,
    pub sender_id: &'static str,
    pub replies: &'static [&'static str],
}

/// Body of POST /api/chats/:contact_id
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub sender_id: String,
    pub content: String,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Pull the `image` field out of a multipart body.
///
/// `Ok(None)` when the form has no such field.
async fn read_image(multipart: &mut Multipart) -> Result<Option<Vec<u8>>, String> {
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field.bytes().await.map_err(|e| e.to_string())?;
            return Ok(Some(bytes.to_vec()));
        }
    }
    Ok(None)
}

/// Decode the upload and run the presence heuristic on it.
async fn detect_subject(state: &ServerState, mut multipart: Multipart) -> Result<bool, ApiError> {
    let bytes = match read_image(&mut multipart).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "No image file provided",
                None,
            ))
        }
        Err(e) => {
            tracing::error!("Failed to read upload: {}", e);
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to analyze face",
                None,
            ));
        }
    };

    let frame = Frame::from_encoded(&bytes).map_err(|e| {
        tracing::error!("Face analysis error: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to analyze face",
            None,
        )
    })?;

    let detected = state.detector.detect(&frame);
    state.activity.record_frame_sampled(detected);
    Ok(detected)
}

/// POST /api/analyze-face
///
/// Returns emotion scores, age and gender for the uploaded frame.
async fn analyze_face(
    State(state): State<Arc<ServerState>>,
    multipart: Multipart,
) -> Result<Json<FaceAnalysis>, ApiError> {
    let face_detected = detect_subject(&state, multipart).await?;

    let analysis = state.engine.lock().await.face_analysis(face_detected);
    if face_detected {
        state.activity.record_analysis_completed();
    }

    tokio::time::sleep(state.analysis_delay).await;
    Ok(Json(analysis))
}

/// POST /api/face/analyze
///
/// Full analysis result, or 422 when nobody is in frame.
async fn analyze_stress(
    State(state): State<Arc<ServerState>>,
    multipart: Multipart,
) -> Result<Json<AnalysisResult>, ApiError> {
    let presence = detect_subject(&state, multipart).await?;

    let result = state.engine.lock().await.analyze(presence).map_err(|e| {
        state.activity.record_analysis_rejected();
        api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            e.user_message(),
            Some("NO_SUBJECT_DETECTED"),
        )
    })?;
    state.activity.record_analysis_completed();

    tokio::time::sleep(state.analysis_delay).await;
    Ok(Json(result))
}

/// GET /api/contacts?q=
async fn contacts(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ContactQuery>,
) -> Json<Vec<ContactEntry>> {
    let term = query.q.unwrap_or_default();
    let entries = state
        .messages
        .search_contacts(&term)
        .into_iter()
        .map(|contact| ContactEntry {
            last_message: state.messages.last_message(&contact.id),
            contact: contact.clone(),
        })
        .collect();
    Json(entries)
}

/// GET /api/chats/:contact_id
async fn chat_history(
    State(state): State<Arc<ServerState>>,
    Path(contact_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let thread = state.messages.thread(&contact_id).map_err(|e| {
        api_error(StatusCode::NOT_FOUND, e.to_string(), Some("UNKNOWN_CONTACT"))
    })?;
    Ok(Json(thread.to_vec()))
}

/// POST /api/chats/:contact_id
async fn send_message(
    State(state): State<Arc<ServerState>>,
    Path(contact_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let message = state
        .messages
        .append(&contact_id, &request.sender_id, &request.content)
        .map_err(|e| {
            let code = match e {
                MessageError::EmptyMessage => "EMPTY_MESSAGE",
                MessageError::UnknownContact(_) => "UNKNOWN_CONTACT",
            };
            api_error(StatusCode::BAD_REQUEST, e.to_string(), Some(code))
        })?;

    state.activity.record_message_sent();
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/quick-replies?role=
///
/// Defaults to the employee side.
async fn quick_replies(
    Query(query): Query<QuickReplyQuery>,
) -> Result<Json<QuickRepliesResponse>, ApiError> {
    let role = match query.role.as_deref() {
        None => Role::Employee,
        Some(name) => Role::parse(name).ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                format!("Unknown role '{}'", name),
                Some("UNKNOWN_ROLE"),
            )
        })?,
    };

    Ok(Json(QuickRepliesResponse {
        role,
        sender_id: role.sender_id(),
        replies: role.quick_replies(),
    }))
}

/// Build the router around existing state
pub fn router(state: Arc<ServerState>) -> Router {
    let origins = ALLOWED_ORIGINS.map(HeaderValue::from_static);

    Router::new()
        .route("/health", get(health))
        .route("/api/analyze-face", post(analyze_face))
        .route("/api/face/analyze", post(analyze_stress))
        .route("/api/contacts", get(contacts))
        .route("/api/chats/:contact_id", get(chat_history).post(send_message))
        .route("/api/quick-replies", get(quick_replies))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config));
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("EmoCollab server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
