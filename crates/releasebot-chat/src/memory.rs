//! Per-session conversation memory.
//!
//! Each session lives behind its own async mutex so that one turn of a
//! session (read history, compose, append) is applied as a unit while other
//! sessions proceed in parallel. The map itself is only locked for lookup,
//! insert and removal.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use releasebot_core::{Language, ReleaseRecord};
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::types::ConversationTurn;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const DEFAULT_CONTEXT_TURNS: usize = 3;

// =============================================================================
// Session
// =============================================================================

/// Rolling conversation state for one session key.
#[derive(Debug)]
pub struct Session {
    id: String,
    history: VecDeque<ConversationTurn>,
    history_limit: usize,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    language: Language,
    evicted: bool,
}

impl Session {
    pub fn new(id: impl Into<String>, history_limit: usize) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            history: VecDeque::with_capacity(history_limit.max(1)),
            history_limit: history_limit.max(1),
            created_at: now,
            last_activity: now,
            language: Language::default(),
            evicted: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn history(&self) -> &VecDeque<ConversationTurn> {
        &self.history
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Append a turn, evicting the oldest once the bound is exceeded.
    pub fn add_turn(&mut self, turn: ConversationTurn, language: Language) {
        self.history.push_back(turn);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
        self.language = language;
        self.touch();
    }

    /// The last `n` turns rendered as numbered `User:`/`Assistant:` blocks,
    /// oldest first, separated by a blank line. Empty when there is no history.
    pub fn recent_context_text(&self, n: usize) -> String {
        let skip = self.history.len().saturating_sub(n);
        self.history
            .iter()
            .skip(skip)
            .enumerate()
            .map(|(i, turn)| {
                format!(
                    "[{}] User: {}\nAssistant: {}",
                    i + 1,
                    turn.user_message,
                    turn.bot_response
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Records used by the most recent turn; empty when there is none.
    pub fn last_records(&self) -> Vec<Arc<ReleaseRecord>> {
        self.history
            .back()
            .map(|t| t.records_used.clone())
            .unwrap_or_default()
    }

    pub fn last_user_message(&self) -> Option<&str> {
        self.history.back().map(|t| t.user_message.as_str())
    }

    pub fn is_idle(&self, now: DateTime<Utc>, idle: Duration) -> bool {
        now - self.last_activity > idle
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            turns: self.history.len(),
            language: self.language,
            created_at: self.created_at,
            last_activity: self.last_activity,
            last_tag: self.history.back().map(|t| t.tag.as_str().to_string()),
        }
    }
}

/// Debug view of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub turns: usize,
    pub language: Language,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub last_tag: Option<String>,
}

// =============================================================================
// SessionStore
// =============================================================================

pub type SessionHandle = Arc<AsyncMutex<Session>>;

/// All live sessions, keyed by opaque session id.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
    history_limit: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl SessionStore {
    pub fn new(history_limit: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            history_limit,
        }
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionHandle>> {
        // Poisoning is ignored: every map operation is a single insert/remove.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the session for `key`, creating it if absent. Idempotent.
    pub fn get_or_create(&self, key: &str) -> SessionHandle {
        let mut map = self.map();
        map.entry(key.to_string())
            .or_insert_with(|| {
                debug!(session = %key, "Creating session");
                Arc::new(AsyncMutex::new(Session::new(key, self.history_limit)))
            })
            .clone()
    }

    /// Lock the session for `key` for the duration of one turn.
    ///
    /// If the sweep evicted the session while we were waiting for it, a
    /// fresh session is resolved instead.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<Session> {
        loop {
            let handle = self.get_or_create(key);
            let mut guard = handle.lock_owned().await;
            if !guard.evicted {
                guard.touch();
                return guard;
            }
        }
    }

    pub async fn add_turn(&self, key: &str, turn: ConversationTurn, language: Language) {
        self.acquire(key).await.add_turn(turn, language);
    }

    pub async fn recent_context_text(&self, key: &str, n: usize) -> String {
        self.acquire(key).await.recent_context_text(n)
    }

    pub async fn last_records(&self, key: &str) -> Vec<Arc<ReleaseRecord>> {
        self.acquire(key).await.last_records()
    }

    pub async fn last_user_message(&self, key: &str) -> Option<String> {
        self.acquire(key).await.last_user_message().map(str::to_string)
    }

    pub async fn language(&self, key: &str) -> Language {
        self.acquire(key).await.language()
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Summaries of sessions not currently mid-turn.
    pub fn summaries(&self) -> Vec<SessionSummary> {
        let map = self.map();
        let mut out: Vec<SessionSummary> = map
            .values()
            .filter_map(|h| h.try_lock().ok().map(|s| s.summary()))
            .collect();
        out.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        out
    }

    /// Evict sessions idle for longer than `idle`. Sessions locked by an
    /// in-flight turn are active by definition and are skipped.
    pub fn sweep(&self, idle: Duration) -> usize {
        let now = Utc::now();
        let mut map = self.map();
        let before = map.len();
        map.retain(|_, handle| match handle.try_lock() {
            Ok(mut session) if session.is_idle(now, idle) => {
                session.evicted = true;
                false
            }
            _ => true,
        });
        let evicted = before - map.len();
        if evicted > 0 {
            info!(evicted, remaining = map.len(), "Evicted idle sessions");
        }
        evicted
    }

    /// Run [`sweep`](Self::sweep) every `period`.
    pub fn spawn_sweeper(self: Arc<Self>, period: std::time::Duration, idle: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.sweep(idle);
            }
        })
    }
}
