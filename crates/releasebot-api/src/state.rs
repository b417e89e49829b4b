//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use releasebot_chat::{ChatOrchestrator, ContactSink, SessionStore};
use releasebot_core::{RecordSource, ReleasebotConfig};

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ReleasebotConfig>,
    pub orchestrator: Arc<ChatOrchestrator>,
    pub contacts: Arc<dyn ContactSink>,
    pub records: Arc<dyn RecordSource>,
    /// Bearer token guarding the debug endpoints.
    pub admin_token: String,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: ReleasebotConfig,
        orchestrator: Arc<ChatOrchestrator>,
        contacts: Arc<dyn ContactSink>,
        records: Arc<dyn RecordSource>,
        admin_token: impl Into<String>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator,
            contacts,
            records,
            admin_token: admin_token.into(),
            start_time: Instant::now(),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        self.orchestrator.sessions()
    }
}
