//! Gemini-backed answer composer.
//!
//! Calls the `generateContent` REST endpoint directly with a rendered prompt
//! and returns the concatenated text parts of the first candidate.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use releasebot_core::config::ComposerConfig;
use releasebot_core::{Language, ReleaseRecord};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::composer::{AnswerComposer, CompositionKind, CompositionRequest};
use crate::error::ChatError;

const DEFAULT_QUESTION_PROMPT: &str = "You are a product release notes assistant. \
Answer ONLY from the release information below.

RELEASES:
{CONTEXT}

RECENT CONVERSATION:
{HISTORY}

QUESTION: {QUESTION}

Rules:
1. Reply in {LANGUAGE}.
2. Be concise and professional; cite release dates when mentioning features.
3. If the releases do not answer the question, say that our support team can provide more detailed information.";

const DEFAULT_FOLLOWUP_PROMPT: &str = "You are a product release notes assistant. \
The user is following up on the previous answer.

RECENT CONVERSATION:
{HISTORY}

RELEASES DISCUSSED:
{CONTEXT}

FOLLOW-UP: {QUESTION}

Clarify, summarize or expand using only the releases above. Reply in {LANGUAGE}.";

const DEFAULT_GREETING_PROMPT: &str = "You are a friendly product release notes assistant. \
The user said: \"{QUESTION}\". Greet them briefly and offer help with questions about \
recent releases. Reply in {LANGUAGE}, in at most two sentences.";

const DEFAULT_ESCALATION_PROMPT: &str = "You are a product release notes assistant that could \
not answer the user's question ({REASON}).

QUESTION: {QUESTION}

Politely explain that the release notes do not cover this, that our support team will \
help, and ask the user to share their contact details. Reply in {LANGUAGE}, in at most \
three sentences.";

// =============================================================================
// Prompt templates
// =============================================================================

/// Prompt templates, one per composition kind.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    pub question: String,
    pub follow_up: String,
    pub greeting: String,
    pub escalation: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            question: DEFAULT_QUESTION_PROMPT.to_string(),
            follow_up: DEFAULT_FOLLOWUP_PROMPT.to_string(),
            greeting: DEFAULT_GREETING_PROMPT.to_string(),
            escalation: DEFAULT_ESCALATION_PROMPT.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Load templates from `dir`, keeping the built-in default for any file
    /// that is missing or unreadable.
    pub fn load(dir: &Path) -> Self {
        let mut templates = Self::default();
        for (file, slot) in [
            ("QUESTION_PROMPT.txt", &mut templates.question),
            ("FOLLOWUP_PROMPT.txt", &mut templates.follow_up),
            ("GREETING_PROMPT.txt", &mut templates.greeting),
            ("ESCALATION_PROMPT.txt", &mut templates.escalation),
        ] {
            let path = dir.join(file);
            match std::fs::read_to_string(&path) {
                Ok(text) if !text.trim().is_empty() => *slot = text,
                Ok(_) => warn!(path = %path.display(), "Prompt file is empty, using default"),
                Err(e) => debug!(path = %path.display(), error = %e, "Prompt file not loaded, using default"),
            }
        }
        templates
    }

    fn template_for(&self, kind: &CompositionKind) -> &str {
        match kind {
            CompositionKind::Answer => &self.question,
            CompositionKind::FollowUp => &self.follow_up,
            CompositionKind::Greeting => &self.greeting,
            CompositionKind::Escalation { .. } => &self.escalation,
        }
    }

    /// Substitute every placeholder for `request`.
    pub fn render(&self, request: &CompositionRequest) -> String {
        let reason = match &request.kind {
            CompositionKind::Escalation { reason } => reason.as_str(),
            _ => "",
        };
        let history = if request.context.is_empty() {
            "(none)"
        } else {
            request.context.as_str()
        };
        self.template_for(&request.kind)
            .replace("{CONTEXT}", &format_records(&request.records))
            .replace("{HISTORY}", history)
            .replace("{REASON}", reason)
            .replace("{LANGUAGE}", language_name(request.language))
            .replace("{QUESTION}", &request.question)
    }
}

fn format_records(records: &[std::sync::Arc<ReleaseRecord>]) -> String {
    records
        .iter()
        .map(|r| format!("• {} - {} ({}): {}", r.date, r.feature, r.category, r.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn language_name(language: Language) -> &'static str {
    match language {
        Language::Es => "Spanish",
        Language::En | Language::Other => "English",
    }
}

// =============================================================================
// GeminiComposer
// =============================================================================

pub struct GeminiComposer {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    templates: PromptTemplates,
}

impl GeminiComposer {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        templates: PromptTemplates,
    ) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ChatError::Composer(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            templates,
        })
    }

    /// Build from config; templates come from `prompts_dir` when set.
    pub fn from_config(config: &ComposerConfig, api_key: impl Into<String>) -> Result<Self, ChatError> {
        let templates = match &config.prompts_dir {
            Some(dir) => PromptTemplates::load(Path::new(dir)),
            None => PromptTemplates::default(),
        };
        Self::new(&config.base_url, &config.model, api_key, templates)
    }

    async fn generate(&self, prompt: String) -> Result<String, ChatError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Composer(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ChatError::Composer(format!(
                "Gemini returned {}: {}",
                status,
                truncate(&text, 200)
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Composer(format!("failed to parse Gemini response: {}", e)))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::Composer("Gemini returned no text".to_string()));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl AnswerComposer for GeminiComposer {
    async fn compose(&self, request: &CompositionRequest) -> Result<String, ChatError> {
        debug!(
            kind = request.kind.as_str(),
            records = request.records.len(),
            model = %self.model,
            "Composing with Gemini"
        );
        self.generate(self.templates.render(request)).await
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}
