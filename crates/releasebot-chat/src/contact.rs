//! Contact collection for escalated conversations.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use releasebot_core::config::ContactConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ChatError;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex"));

/// Contact details left by a user the assistant could not help.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ContactInfo {
    /// The supplied timestamp, or now in RFC 3339.
    pub fn timestamp_or_now(&self) -> String {
        self.timestamp
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| Utc::now().to_rfc3339())
    }
}

/// Collect every violation rather than stopping at the first.
pub fn validate_contact(contact: &ContactInfo) -> Result<(), ChatError> {
    let mut errors = Vec::new();
    if contact.name.trim().chars().count() < 2 {
        errors.push("Name must be at least 2 characters".to_string());
    }
    if !EMAIL.is_match(contact.email.trim()) {
        errors.push("Valid email address is required".to_string());
    }
    if contact.organization.trim().chars().count() < 2 {
        errors.push("Organization must be at least 2 characters".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ChatError::InvalidContact(errors))
    }
}

#[async_trait]
pub trait ContactSink: Send + Sync {
    async fn submit(&self, contact: &ContactInfo) -> Result<(), ChatError>;
}

// =============================================================================
// SheetsContactSink
// =============================================================================

/// Appends one row per contact to a Google Sheet via `values:append`.
pub struct SheetsContactSink {
    client: Client,
    base_url: String,
    sheet_id: String,
    range: String,
    access_token: String,
}

impl SheetsContactSink {
    pub fn new(
        base_url: impl Into<String>,
        sheet_id: impl Into<String>,
        range: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChatError::ContactSink(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sheet_id: sheet_id.into(),
            range: range.into(),
            access_token: access_token.into(),
        })
    }

    pub fn from_config(
        config: &ContactConfig,
        sheet_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, ChatError> {
        Self::new(&config.base_url, sheet_id, &config.range, access_token)
    }
}

#[async_trait]
impl ContactSink for SheetsContactSink {
    async fn submit(&self, contact: &ContactInfo) -> Result<(), ChatError> {
        let url = format!(
            "{}/spreadsheets/{}/values/{}:append",
            self.base_url, self.sheet_id, self.range
        );
        let row = serde_json::json!({
            "values": [[
                contact.timestamp_or_now(),
                contact.name.trim(),
                contact.email.trim(),
                contact.organization.trim(),
                contact.question,
            ]]
        });

        let response = self
            .client
            .post(&url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(&self.access_token)
            .json(&row)
            .send()
            .await
            .map_err(|e| ChatError::ContactSink(format!("Sheets request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::ContactSink(format!(
                "Sheets returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        info!(sheet = %self.sheet_id, email = %contact.email.trim(), "Contact logged to sheet");
        Ok(())
    }
}

// =============================================================================
// LogContactSink
// =============================================================================

/// Records contacts in the structured log only.
#[derive(Debug, Default)]
pub struct LogContactSink;

#[async_trait]
impl ContactSink for LogContactSink {
    async fn submit(&self, contact: &ContactInfo) -> Result<(), ChatError> {
        info!(
            name = %contact.name.trim(),
            email = %contact.email.trim(),
            organization = %contact.organization.trim(),
            question = %contact.question,
            timestamp = %contact.timestamp_or_now(),
            "Contact received"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn contact() -> ContactInfo {
        ContactInfo {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            organization: "Acme".to_string(),
            question: "Is SSO coming?".to_string(),
            timestamp: Some("2024-05-01T10:00:00Z".to_string()),
        }
    }

    // ---- Validation ----

    #[test]
    fn test_valid_contact() {
        assert!(validate_contact(&contact()).is_ok());
    }

    #[test]
    fn test_all_violations_reported() {
        let bad = ContactInfo {
            name: " A ".to_string(),
            email: "not an email".to_string(),
            organization: "".to_string(),
            question: String::new(),
            timestamp: None,
        };
        match validate_contact(&bad) {
            Err(ChatError::InvalidContact(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected InvalidContact, got {:?}", other),
        }
    }

    #[test]
    fn test_email_shapes() {
        for (email, ok) in [
            ("a@b.co", true),
            ("first.last@sub.example.org", true),
            ("a@b", false),
            ("a b@c.com", false),
            ("@c.com", false),
        ] {
            let c = ContactInfo {
                email: email.to_string(),
                ..contact()
            };
            assert_eq!(validate_contact(&c).is_ok(), ok, "{}", email);
        }
    }

    #[test]
    fn test_contact_deserializes_camel_case_without_timestamp() {
        let c: ContactInfo = serde_json::from_str(
            r#"{"name":"Ana","email":"ana@example.com","organization":"Acme","question":"q"}"#,
        )
        .unwrap();
        assert!(c.timestamp.is_none());
        assert!(!c.timestamp_or_now().is_empty());
    }

    // ---- Sinks ----

    #[tokio::test]
    async fn test_sheets_sink_appends_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/spreadsheets/sheet-1/values/A:E:append"))
            .and(query_param("valueInputOption", "USER_ENTERED"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(serde_json::json!({
                "values": [["2024-05-01T10:00:00Z", "Ana", "ana@example.com", "Acme", "Is SSO coming?"]]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let sink = SheetsContactSink::new(server.uri(), "sheet-1", "A:E", "tok").unwrap();
        sink.submit(&contact()).await.unwrap();
    }

    #[tokio::test]
    async fn test_sheets_sink_reports_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let sink = SheetsContactSink::new(server.uri(), "sheet-1", "A:E", "tok").unwrap();
        let err = sink.submit(&contact()).await.unwrap_err();
        assert!(matches!(err, ChatError::ContactSink(_)));
    }

    #[tokio::test]
    async fn test_log_sink_accepts() {
        assert!(LogContactSink.submit(&contact()).await.is_ok());
    }
}
