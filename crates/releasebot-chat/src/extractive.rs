//! Extractive answer rendering.
//!
//! Composes answers directly from the selected records without calling a
//! language model. Used when no model API key is configured.

use std::sync::Arc;

use async_trait::async_trait;
use releasebot_core::{Language, ReleaseRecord};

use crate::composer::{
    fallback_escalation_message, fallback_greeting_message, AnswerComposer, CompositionKind,
    CompositionRequest,
};
use crate::error::ChatError;

/// Records listed in one answer; the rest are summarized as a count.
pub const DEFAULT_MAX_LISTED: usize = 10;

pub struct OfflineComposer {
    max_listed: usize,
}

impl Default for OfflineComposer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LISTED)
    }
}

impl OfflineComposer {
    pub fn new(max_listed: usize) -> Self {
        Self {
            max_listed: max_listed.max(1),
        }
    }

    fn single_record_answer(&self, record: &ReleaseRecord, language: Language) -> String {
        if language.is_spanish() {
            format!(
                "El {}, {} recibió un cambio ({}): {}",
                record.date, record.feature, record.category, record.description
            )
        } else {
            format!(
                "On {}, {} received a change ({}): {}",
                record.date, record.feature, record.category, record.description
            )
        }
    }

    fn multi_record_answer(&self, records: &[Arc<ReleaseRecord>], language: Language) -> String {
        let listed = &records[..records.len().min(self.max_listed)];
        let mut lines = vec![if language.is_spanish() {
            format!("Encontré {} lanzamientos relacionados:", records.len())
        } else {
            format!("I found {} related releases:", records.len())
        }];
        for r in listed {
            lines.push(format!("- {} {} ({}): {}", r.date, r.feature, r.category, r.description));
        }
        let hidden = records.len() - listed.len();
        if hidden > 0 {
            lines.push(if language.is_spanish() {
                format!("...y {} más.", hidden)
            } else {
                format!("...and {} more.", hidden)
            });
        }
        lines.join("\n")
    }

    fn records_answer(&self, records: &[Arc<ReleaseRecord>], language: Language) -> String {
        match records {
            [] => fallback_escalation_message(language).to_string(),
            [only] => self.single_record_answer(only, language),
            many => self.multi_record_answer(many, language),
        }
    }
}

#[async_trait]
impl AnswerComposer for OfflineComposer {
    async fn compose(&self, request: &CompositionRequest) -> Result<String, ChatError> {
        let language = request.language;
        let text = match &request.kind {
            CompositionKind::Greeting => fallback_greeting_message(language).to_string(),
            CompositionKind::Escalation { .. } => fallback_escalation_message(language).to_string(),
            CompositionKind::Answer => self.records_answer(&request.records, language),
            CompositionKind::FollowUp => {
                let intro = if language.is_spanish() {
                    "Sobre lo que hablábamos:"
                } else {
                    "Regarding what we discussed:"
                };
                format!("{}\n{}", intro, self.records_answer(&request.records, language))
            }
        };
        Ok(text)
    }
}
