//! Answer composition.
//!
//! A composer turns selected records into prose. Implementations are
//! opaque to the orchestrator; it only sees [`AnswerComposer::compose`]
//! and treats any error as a reason to escalate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use releasebot_core::{Language, ReleaseRecord};
use tracing::warn;

use crate::error::ChatError;

// =============================================================================
// Requests
// =============================================================================

/// What kind of text the composer is asked to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositionKind {
    /// Answer a fresh question from the selected records.
    Answer,
    /// Continue the previous turn using its records.
    FollowUp,
    Greeting,
    /// Explain that a human will follow up.
    Escalation { reason: String },
}

impl CompositionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositionKind::Answer => "answer",
            CompositionKind::FollowUp => "follow-up",
            CompositionKind::Greeting => "greeting",
            CompositionKind::Escalation { .. } => "escalation",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompositionRequest {
    pub kind: CompositionKind,
    pub question: String,
    pub records: Vec<Arc<ReleaseRecord>>,
    /// Recent conversation rendered as text; empty when there is none.
    pub context: String,
    pub language: Language,
}

impl CompositionRequest {
    pub fn new(kind: CompositionKind, question: impl Into<String>, language: Language) -> Self {
        Self {
            kind,
            question: question.into(),
            records: Vec::new(),
            context: String::new(),
            language,
        }
    }

    pub fn with_records(mut self, records: Vec<Arc<ReleaseRecord>>) -> Self {
        self.records = records;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

// =============================================================================
// Trait
// =============================================================================

#[async_trait]
pub trait AnswerComposer: Send + Sync {
    async fn compose(&self, request: &CompositionRequest) -> Result<String, ChatError>;
}

// =============================================================================
// GuardedComposer
// =============================================================================

/// Bounds every call to the inner composer with a timeout, retrying a
/// failed or timed-out attempt up to `max_retries` times.
pub struct GuardedComposer<C> {
    inner: C,
    timeout: Duration,
    max_retries: u32,
}

impl<C: AnswerComposer> GuardedComposer<C> {
    pub fn new(inner: C, timeout: Duration, max_retries: u32) -> Self {
        Self {
            inner,
            timeout,
            max_retries,
        }
    }
}

#[async_trait]
impl<C: AnswerComposer> AnswerComposer for GuardedComposer<C> {
    async fn compose(&self, request: &CompositionRequest) -> Result<String, ChatError> {
        let mut attempt = 0;
        loop {
            let err = match tokio::time::timeout(self.timeout, self.inner.compose(request)).await {
                Ok(Ok(text)) => return Ok(text),
                Ok(Err(e)) => e,
                Err(_) => ChatError::ComposerTimeout(self.timeout.as_secs()),
            };
            if attempt >= self.max_retries {
                return Err(err);
            }
            attempt += 1;
            warn!(
                kind = request.kind.as_str(),
                attempt,
                error = %err,
                "Composer attempt failed, retrying"
            );
        }
    }
}

// =============================================================================
// Fixed messages
// =============================================================================

/// Used when an escalation message cannot be composed.
pub fn fallback_escalation_message(language: Language) -> &'static str {
    if language.is_spanish() {
        "No tengo información específica sobre eso en nuestras notas de lanzamiento actuales. \
Sin embargo, nuestro equipo de soporte estará encantado de ayudarte. \
¿Podrías compartir tus datos de contacto para que puedan comunicarse contigo?"
    } else {
        "I don't have specific information about that in our current release notes. \
However, our support team would be happy to help you! \
Could you please share your contact details so they can reach out to you?"
    }
}

/// Used when a greeting cannot be composed.
pub fn fallback_greeting_message(language: Language) -> &'static str {
    if language.is_spanish() {
        "¡Hola! Soy tu asistente de lanzamientos. ¿En qué puedo ayudarte hoy?"
    } else {
        "Hello! I'm your release notes assistant. How can I help you today?"
    }
}
