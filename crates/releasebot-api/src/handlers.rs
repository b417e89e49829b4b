//! Route handler functions for all API endpoints.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use releasebot_chat::{validate_contact, ContactInfo, Intent, QueryType, SessionSummary};

use crate::error::ApiError;
use crate::state::AppState;

/// Capabilities reported by `/health`.
pub const FEATURES: &[&str] = &[
    "intent-detection",
    "query-engine",
    "follow-up-detection",
    "conversation-memory",
    "escalation",
    "contact-collection",
];

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub answer: String,
    pub needs_contact: bool,
    pub confidence: u8,
    pub session_id: String,
    pub intent: Intent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_sessions: usize,
    pub corpus_size: usize,
    pub features: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsResponse {
    pub active_sessions: usize,
    pub sessions: Vec<SessionSummary>,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Session keys
// =============================================================================

/// Client-supplied session id, or a stable hash of the caller's address
/// and user agent.
pub fn session_key(supplied: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(id) = supplied.map(str::trim).filter(|s| !s.is_empty()) {
        return id.to_string();
    }

    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let ip = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| header("x-real-ip"))
        .unwrap_or("unknown");
    let user_agent = header("user-agent").unwrap_or("unknown");

    let digest = Sha256::digest(format!("{}-{}", ip, user_agent).as_bytes());
    hex::encode(digest)[..16].to_string()
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let session_id = session_key(body.session_id.as_deref(), &headers);
    tracing::info!(
        %request_id,
        session = %session_id,
        chars = body.message.chars().count(),
        active_sessions = state.sessions().len(),
        "Chat message received"
    );

    let reply = state
        .orchestrator
        .handle_message(&body.message, &session_id)
        .await
        .map_err(|e| {
            tracing::warn!(%request_id, error = %e, "Chat message rejected");
            ApiError::from(e)
        })?;

    tracing::info!(
        %request_id,
        needs_contact = reply.needs_contact,
        confidence = reply.confidence,
        "Chat reply sent"
    );

    Ok(Json(ChatResponse {
        answer: reply.answer,
        needs_contact: reply.needs_contact,
        confidence: reply.confidence,
        session_id,
        intent: reply.intent,
        query_type: reply.query_type,
    }))
}

/// POST /api/contact
pub async fn contact(
    State(state): State<AppState>,
    Json(info): Json<ContactInfo>,
) -> Result<Json<ContactResponse>, ApiError> {
    validate_contact(&info)?;

    state.contacts.submit(&info).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to record contact");
        ApiError::Internal("Failed to save contact information".to_string())
    })?;

    Ok(Json(ContactResponse {
        success: true,
        message: "Contact information received. Our team will reach out soon.".to_string(),
    }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let records = state.records.clone();
    let corpus_size = match tokio::task::spawn_blocking(move || records.all_records()).await {
        Ok(Ok(corpus)) => corpus.len(),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Corpus unavailable for health check");
            0
        }
        Err(e) => {
            tracing::warn!(error = %e, "Corpus load task failed during health check");
            0
        }
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "releasebot".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.sessions().len(),
        corpus_size,
        features: FEATURES.iter().map(|f| f.to_string()).collect(),
    })
}

/// GET /api/debug/sessions
pub async fn debug_sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    let sessions = state.sessions().summaries();
    Json(SessionsResponse {
        active_sessions: state.sessions().len(),
        sessions,
        timestamp: Utc::now(),
    })
}
