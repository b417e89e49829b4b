//! releasebot binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Open the release record store (CSV + JSON cache)
//! 3. Pick the answer composer and contact sink from config and secrets
//! 4. Start the session sweeper and the release refresher
//! 5. Serve the HTTP API

mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use releasebot_api::auth::resolve_admin_token;
use releasebot_api::{start_server, AppState};
use releasebot_chat::{
    AnswerComposer, ChatOrchestrator, ContactSink, EscalationPolicy, GeminiComposer,
    GuardedComposer, LogContactSink, OfflineComposer, SessionStore, SheetsContactSink,
};
use releasebot_core::ReleasebotConfig;
use releasebot_storage::{CorpusRefresher, HttpReleaseFeed, RecordStore};

use crate::cli::CliArgs;

fn secret(env_var: &str) -> Option<String> {
    std::env::var(env_var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn build_composer(config: &ReleasebotConfig) -> Result<Arc<dyn AnswerComposer>, Box<dyn std::error::Error>> {
    let composer = &config.composer;
    let timeout = Duration::from_secs(composer.timeout_secs.max(1));

    match (composer.provider.as_str(), secret(&composer.api_key_env)) {
        ("gemini", Some(key)) => {
            let gemini = GeminiComposer::from_config(composer, key)?;
            tracing::info!(model = %composer.model, "Answer composer: Gemini");
            Ok(Arc::new(GuardedComposer::new(gemini, timeout, composer.max_retries)))
        }
        (provider, _) => {
            tracing::warn!(
                provider = %provider,
                env = %composer.api_key_env,
                "No model API key configured, answers will be extractive"
            );
            Ok(Arc::new(GuardedComposer::new(
                OfflineComposer::default(),
                timeout,
                composer.max_retries,
            )))
        }
    }
}

fn build_contact_sink(config: &ReleasebotConfig) -> Result<Arc<dyn ContactSink>, Box<dyn std::error::Error>> {
    let contact = &config.contact;
    match (contact.sheet_id.as_deref(), secret(&contact.access_token_env)) {
        (Some(sheet_id), Some(token)) => {
            tracing::info!(sheet = %sheet_id, "Contacts will be appended to Google Sheets");
            Ok(Arc::new(SheetsContactSink::from_config(contact, sheet_id, token)?))
        }
        _ => {
            tracing::info!("Contacts will be logged only");
            Ok(Arc::new(LogContactSink))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = ReleasebotConfig::load_or_default(&config_file);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }
    config.server.port = args.resolve_port(config.server.port);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting releasebot v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    if let Err(e) = std::fs::create_dir_all(&config.general.data_dir) {
        tracing::error!(path = %config.general.data_dir, error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    // Records.
    let store = Arc::new(RecordStore::from_config(&config));
    match store.get_all_records() {
        Ok(corpus) => tracing::info!(
            records = corpus.len(),
            csv = %store.csv_path().display(),
            "Release records loaded"
        ),
        Err(e) => tracing::warn!(error = %e, "Release records unavailable at startup"),
    }

    // Chat.
    let sessions = Arc::new(SessionStore::new(config.chat.history_limit));
    let orchestrator = Arc::new(ChatOrchestrator::new(
        config.chat.clone(),
        store.clone(),
        build_composer(&config)?,
        sessions.clone(),
        EscalationPolicy::from_config(&config.escalation),
    ));
    let contacts = build_contact_sink(&config)?;

    // === Background tasks ===

    let idle = chrono::Duration::minutes(config.chat.session_idle_minutes.min(525_600) as i64);
    let sweep_every = Duration::from_secs(config.chat.sweep_interval_minutes.max(1) * 60);
    sessions.clone().spawn_sweeper(sweep_every, idle);
    tracing::info!(
        idle_minutes = config.chat.session_idle_minutes,
        sweep_minutes = config.chat.sweep_interval_minutes,
        "Session sweeper started"
    );

    match (config.refresh.enabled, config.refresh.feed_url.as_deref()) {
        (true, Some(url)) => {
            let refresher = Arc::new(CorpusRefresher::new(
                store.clone(),
                Arc::new(HttpReleaseFeed::new(url)),
            ));
            refresher.spawn(
                Duration::from_secs(config.refresh.initial_delay_secs),
                Duration::from_secs(config.refresh.interval_hours.max(1) * 3600),
            );
        }
        (true, None) => tracing::info!("Release refresh enabled but no feed_url configured"),
        (false, _) => tracing::info!("Release refresh disabled"),
    }

    // API.
    let admin_token = resolve_admin_token(&config.server.admin_token_env);
    let state = AppState::new(config, orchestrator, contacts, store, admin_token);
    start_server(state).await?;

    Ok(())
}
