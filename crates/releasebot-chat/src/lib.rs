//! Conversational core of the release assistant.
//!
//! Intent classification, the rule cascade that selects release records for
//! a question, follow-up detection over per-session memory, escalation
//! decisions, answer composition, and the orchestrator tying them together.

pub mod composer;
pub mod contact;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod extractive;
pub mod followup;
pub mod gemini;
pub mod intent;
pub mod memory;
pub mod orchestrator;
pub mod types;

pub use composer::{
    fallback_escalation_message, fallback_greeting_message, AnswerComposer, CompositionKind,
    CompositionRequest, GuardedComposer,
};
pub use contact::{validate_contact, ContactInfo, ContactSink, LogContactSink, SheetsContactSink};
pub use engine::QueryEngine;
pub use error::ChatError;
pub use escalation::{EscalationDecision, EscalationPolicy};
pub use extractive::OfflineComposer;
pub use followup::{FollowUp, FollowUpDetector};
pub use gemini::{GeminiComposer, PromptTemplates};
pub use intent::{IntentClassifier, IntentResult};
pub use memory::{Session, SessionHandle, SessionStore, SessionSummary};
pub use orchestrator::{ChatOrchestrator, ChatReply};
pub use types::{ConversationTurn, Intent, QueryResult, QueryType, TurnTag};
