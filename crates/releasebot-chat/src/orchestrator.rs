//! Chat orchestrator: routes one message through classification, follow-up
//! detection, the query engine, escalation and composition, then records
//! the completed turn in the session.

use std::sync::Arc;

use releasebot_core::config::ChatConfig;
use releasebot_core::{Corpus, RecordSource, ReleaseRecord};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::composer::{
    fallback_escalation_message, fallback_greeting_message, AnswerComposer, CompositionKind,
    CompositionRequest,
};
use crate::engine::QueryEngine;
use crate::error::ChatError;
use crate::escalation::{EscalationDecision, EscalationPolicy};
use crate::followup::FollowUpDetector;
use crate::intent::{IntentClassifier, IntentResult};
use crate::memory::{Session, SessionStore};
use crate::types::{ConversationTurn, Intent, QueryType, TurnTag};

/// Confidence reported for answers built from the previous turn's records.
pub const FOLLOW_UP_CONFIDENCE: u8 = 90;

const REASON_REQUESTED: &str =
    "User requested human assistance or services beyond release information";
const REASON_UNKNOWN: &str = "Unable to determine intent";

/// Result of handling one message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub answer: String,
    pub needs_contact: bool,
    /// 0-100.
    pub confidence: u8,
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,
    pub records_used: usize,
}

/// A reply plus what gets recorded in the session.
struct Outcome {
    reply: ChatReply,
    records: Vec<Arc<ReleaseRecord>>,
    tag: TurnTag,
}

pub struct ChatOrchestrator {
    config: ChatConfig,
    classifier: IntentClassifier,
    follow_ups: FollowUpDetector,
    engine: QueryEngine,
    policy: EscalationPolicy,
    records: Arc<dyn RecordSource>,
    composer: Arc<dyn AnswerComposer>,
    sessions: Arc<SessionStore>,
}

impl ChatOrchestrator {
    pub fn new(
        config: ChatConfig,
        records: Arc<dyn RecordSource>,
        composer: Arc<dyn AnswerComposer>,
        sessions: Arc<SessionStore>,
        policy: EscalationPolicy,
    ) -> Self {
        Self {
            config,
            classifier: IntentClassifier::new(),
            follow_ups: FollowUpDetector::new(),
            engine: QueryEngine::new(),
            policy,
            records,
            composer,
            sessions,
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Handle one inbound message for `session_key`.
    ///
    /// The session stays locked from the first history read until the turn
    /// is recorded, so turns of one session are applied in order. If the
    /// returned future is dropped nothing is recorded.
    pub async fn handle_message(
        &self,
        message: &str,
        session_key: &str,
    ) -> Result<ChatReply, ChatError> {
        if !self.config.enabled {
            return Err(ChatError::Disabled);
        }
        let text = message.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if text.chars().count() > self.config.max_message_length {
            return Err(ChatError::MessageTooLong(self.config.max_message_length));
        }

        let intent = self.classifier.classify(text);
        debug!(
            session = %session_key,
            intent = %intent.intent,
            confidence = intent.confidence,
            language = %intent.language,
            "Classified message"
        );

        let mut session = self.sessions.acquire(session_key).await;

        let outcome = match intent.intent {
            Intent::Greeting => self.greet(text, &intent).await,
            Intent::EscalationRequest => {
                self.escalate(text, &intent, REASON_REQUESTED, None).await
            }
            Intent::Unknown => self.escalate(text, &intent, REASON_UNKNOWN, None).await,
            Intent::Question => self.answer(text, &intent, &session).await,
        };

        info!(
            session = %session_key,
            intent = %intent.intent,
            tag = %outcome.tag,
            needs_contact = outcome.reply.needs_contact,
            confidence = outcome.reply.confidence,
            records = outcome.reply.records_used,
            "Turn complete"
        );

        session.add_turn(
            ConversationTurn::new(text, outcome.reply.answer.clone(), outcome.records, outcome.tag),
            intent.language,
        );
        Ok(outcome.reply)
    }

    // -- Routes --

    async fn greet(&self, text: &str, intent: &IntentResult) -> Outcome {
        let request = CompositionRequest::new(CompositionKind::Greeting, text, intent.language);
        let answer = match self.composer.compose(&request).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Greeting composition failed, using fixed message");
                fallback_greeting_message(intent.language).to_string()
            }
        };
        Outcome {
            reply: ChatReply {
                answer,
                needs_contact: false,
                confidence: intent.confidence,
                intent: intent.intent,
                query_type: None,
                records_used: 0,
            },
            records: Vec::new(),
            tag: TurnTag::Greeting,
        }
    }

    async fn escalate(
        &self,
        text: &str,
        intent: &IntentResult,
        reason: &str,
        query_type: Option<QueryType>,
    ) -> Outcome {
        let request = CompositionRequest::new(
            CompositionKind::Escalation {
                reason: reason.to_string(),
            },
            text,
            intent.language,
        );
        let answer = match self.composer.compose(&request).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Escalation composition failed, using fixed message");
                fallback_escalation_message(intent.language).to_string()
            }
        };
        self.escalation_outcome(answer, intent, query_type)
    }

    fn escalation_outcome(
        &self,
        answer: String,
        intent: &IntentResult,
        query_type: Option<QueryType>,
    ) -> Outcome {
        Outcome {
            reply: ChatReply {
                answer,
                needs_contact: true,
                confidence: 0,
                intent: intent.intent,
                query_type,
                records_used: 0,
            },
            records: Vec::new(),
            tag: TurnTag::Escalation,
        }
    }

    async fn answer(&self, text: &str, intent: &IntentResult, session: &Session) -> Outcome {
        let context = session.recent_context_text(self.config.context_turns);

        let follow_up = self.follow_ups.detect(text, session);
        if follow_up.is_follow_up {
            let previous = session.last_records();
            if !previous.is_empty() {
                debug!(
                    prior_topic = follow_up.prior_topic.as_deref().unwrap_or(""),
                    records = previous.len(),
                    "Follow-up detected, reusing previous records"
                );
                let request =
                    CompositionRequest::new(CompositionKind::FollowUp, text, intent.language)
                        .with_records(previous.clone())
                        .with_context(context.clone());
                match self.composer.compose(&request).await {
                    Ok(answer) => {
                        return Outcome {
                            reply: ChatReply {
                                answer,
                                needs_contact: false,
                                confidence: FOLLOW_UP_CONFIDENCE,
                                intent: intent.intent,
                                query_type: None,
                                records_used: previous.len(),
                            },
                            records: previous,
                            tag: TurnTag::FollowUp,
                        }
                    }
                    Err(e) => warn!(error = %e, "Follow-up composition failed, running fresh query"),
                }
            }
        }

        let corpus = self.load_corpus().await;
        let result = self.engine.query(text, &corpus);
        info!(
            query_type = %result.query_type,
            records = result.selected.len(),
            confidence = result.confidence,
            rationale = %result.rationale,
            "Query evaluated"
        );

        if let EscalationDecision {
            escalate: true,
            reason: Some(reason),
        } = self.policy.assess(&result)
        {
            return self
                .escalate(text, intent, reason, Some(result.query_type))
                .await;
        }

        let request = CompositionRequest::new(CompositionKind::Answer, text, intent.language)
            .with_records(result.selected.clone())
            .with_context(context);
        let answer = match self.composer.compose(&request).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Answer composition failed, escalating");
                return self.escalation_outcome(
                    fallback_escalation_message(intent.language).to_string(),
                    intent,
                    Some(result.query_type),
                );
            }
        };

        let review = self.policy.review_answer(&answer);
        if review.escalate {
            info!("Composed answer admits insufficient information, escalating");
            return self.escalation_outcome(answer, intent, Some(result.query_type));
        }

        Outcome {
            reply: ChatReply {
                answer,
                needs_contact: false,
                confidence: result.confidence,
                intent: intent.intent,
                query_type: Some(result.query_type),
                records_used: result.selected.len(),
            },
            records: result.selected,
            tag: TurnTag::Query(result.query_type),
        }
    }

    /// An unreadable corpus behaves like an empty one.
    ///
    /// A cold store reads and parses files, so the read runs on the blocking
    /// pool instead of the worker driving this turn.
    async fn load_corpus(&self) -> Corpus {
        let records = Arc::clone(&self.records);
        match tokio::task::spawn_blocking(move || records.all_records()).await {
            Ok(Ok(corpus)) => corpus,
            Ok(Err(e)) => {
                warn!(error = %e, "Release records unavailable, treating corpus as empty");
                Arc::new(Vec::new())
            }
            Err(e) => {
                warn!(error = %e, "Release record load task failed, treating corpus as empty");
                Arc::new(Vec::new())
            }
        }
    }
}
