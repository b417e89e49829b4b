//! Bearer-token authentication for the admin endpoints.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rand::Rng;

use crate::state::AppState;

/// Generate a random 32-character hex token.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex::encode(bytes)
}

/// Read the admin token from `env_var`, or generate one for this process.
///
/// A generated token is logged once so an operator can use it.
pub fn resolve_admin_token(env_var: &str) -> String {
    match std::env::var(env_var) {
        Ok(token) if !token.trim().is_empty() => token.trim().to_string(),
        _ => {
            let token = generate_token();
            tracing::warn!(
                env = %env_var,
                token = %token,
                "Admin token not set, generated a temporary one"
            );
            token
        }
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

/// Middleware that validates `Authorization: Bearer <token>` against
/// `AppState.admin_token`.
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(value) = req.headers().get("authorization") else {
        return unauthorized("Missing Authorization header");
    };
    let Ok(value) = value.to_str() else {
        return unauthorized("Invalid Authorization header encoding");
    };
    match value.strip_prefix("Bearer ") {
        Some(token) if token == state.admin_token => next.run(req).await,
        _ => unauthorized("Invalid bearer token"),
    }
}
