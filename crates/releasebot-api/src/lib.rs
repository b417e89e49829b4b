//! HTTP surface for the release assistant.
//!
//! Exposes the chat endpoint, contact collection, a health check and an
//! authenticated session debug view.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
