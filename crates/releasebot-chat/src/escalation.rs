use releasebot_core::config::EscalationConfig;

use crate::types::QueryResult;

pub const REASON_NO_RECORDS: &str = "No relevant releases found";
pub const REASON_LOW_CONFIDENCE: &str = "Low confidence";
pub const REASON_INSUFFICIENT_ANSWER: &str = "Insufficient information in available releases";

/// Whether a turn should hand over to contact collection, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationDecision {
    pub escalate: bool,
    pub reason: Option<&'static str>,
}

impl EscalationDecision {
    pub fn proceed() -> Self {
        Self {
            escalate: false,
            reason: None,
        }
    }

    pub fn escalate(reason: &'static str) -> Self {
        Self {
            escalate: true,
            reason: Some(reason),
        }
    }
}

/// Thresholds deciding when the assistant gives up on answering.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    min_confidence: u8,
    insufficient_phrases: Vec<String>,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::from_config(&EscalationConfig::default())
    }
}

impl EscalationPolicy {
    pub fn new(min_confidence: u8, insufficient_phrases: Vec<String>) -> Self {
        Self {
            min_confidence,
            insufficient_phrases: insufficient_phrases
                .into_iter()
                .map(|p| p.to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &EscalationConfig) -> Self {
        Self::new(config.min_confidence, config.insufficient_phrases.clone())
    }

    pub fn min_confidence(&self) -> u8 {
        self.min_confidence
    }

    /// Checked before composing: no records, or confidence strictly below
    /// the threshold.
    pub fn assess(&self, result: &QueryResult) -> EscalationDecision {
        if result.is_empty() {
            EscalationDecision::escalate(REASON_NO_RECORDS)
        } else if result.confidence < self.min_confidence {
            EscalationDecision::escalate(REASON_LOW_CONFIDENCE)
        } else {
            EscalationDecision::proceed()
        }
    }

    /// Checked after composing: the answer itself admits it cannot help.
    pub fn review_answer(&self, answer: &str) -> EscalationDecision {
        let lowered = answer.to_lowercase();
        if self
            .insufficient_phrases
            .iter()
            .any(|p| lowered.contains(p.as_str()))
        {
            EscalationDecision::escalate(REASON_INSUFFICIENT_ANSWER)
        } else {
            EscalationDecision::proceed()
        }
    }
}
