use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ReleasebotError, Result};

/// Top-level configuration for the release assistant.
///
/// Loaded from `releasebot.toml` by default. Each section corresponds to one
/// subsystem; every field has a default so partial files are valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleasebotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub escalation: EscalationConfig,
    #[serde(default)]
    pub composer: ComposerConfig,
    #[serde(default)]
    pub contact: ContactConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

impl ReleasebotConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ReleasebotConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ReleasebotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the release CSV, its JSON cache and prompt files.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Requests per second accepted before answering 429.
    pub rate_limit_per_second: u64,
    /// Environment variable holding the bearer token for debug endpoints.
    /// A random token is generated at startup when unset.
    pub admin_token_env: String,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            rate_limit_per_second: 50,
            admin_token_env: "RELEASEBOT_ADMIN_TOKEN".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

/// Release corpus location and caching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// CSV file name, relative to `general.data_dir` unless absolute.
    pub csv_file: String,
    /// JSON cache file name, relative to `general.data_dir` unless absolute.
    pub cache_file: String,
    /// Hours a cache file or in-memory snapshot stays fresh.
    pub cache_ttl_hours: u64,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            csv_file: "releases.csv".to_string(),
            cache_file: "releases-cache.json".to_string(),
            cache_ttl_hours: 24,
        }
    }
}

/// Conversation handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub enabled: bool,
    /// Maximum accepted message length in characters.
    pub max_message_length: usize,
    /// Turns retained per session.
    pub history_limit: usize,
    /// Turns rendered into the composer's conversation context.
    pub context_turns: usize,
    /// Minutes of inactivity before a session is evicted.
    pub session_idle_minutes: u64,
    /// Minutes between eviction sweeps.
    pub sweep_interval_minutes: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_message_length: 2000,
            history_limit: 10,
            context_turns: 3,
            session_idle_minutes: 120,
            sweep_interval_minutes: 30,
        }
    }
}

/// When to hand a conversation over to a human.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Results strictly below this confidence are escalated.
    pub min_confidence: u8,
    /// Phrases in a composed answer that signal it lacked information.
    pub insufficient_phrases: Vec<String>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            min_confidence: 40,
            insufficient_phrases: vec![
                "more detailed information".to_string(),
                "our support team".to_string(),
                "información más detallada".to_string(),
                "nuestro equipo de soporte".to_string(),
            ],
        }
    }
}

/// Generative answer composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// "gemini" or "offline".
    pub provider: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Retries after a timeout or failure.
    pub max_retries: u32,
    /// Directory with prompt template overrides, relative to `general.data_dir`.
    pub prompts_dir: Option<String>,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 20,
            max_retries: 1,
            prompts_dir: Some("prompts".to_string()),
        }
    }
}

/// Escalation contact logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactConfig {
    /// Spreadsheet id. Contacts are only logged locally when unset.
    pub sheet_id: Option<String>,
    /// Environment variable holding an OAuth access token for the Sheets API.
    pub access_token_env: String,
    pub range: String,
    pub base_url: String,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            sheet_id: None,
            access_token_env: "GOOGLE_SHEETS_TOKEN".to_string(),
            range: "A:E".to_string(),
            base_url: "https://sheets.googleapis.com/v4".to_string(),
        }
    }
}

/// Background corpus refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub enabled: bool,
    /// JSON feed of release records, newest first.
    pub feed_url: Option<String>,
    pub initial_delay_secs: u64,
    pub interval_hours: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            feed_url: None,
            initial_delay_secs: 10,
            interval_hours: 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ReleasebotConfig::default();
        assert_eq!(config.general.data_dir, "./data");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.corpus.cache_ttl_hours, 24);
        assert_eq!(config.chat.history_limit, 10);
        assert_eq!(config.chat.context_turns, 3);
        assert_eq!(config.chat.session_idle_minutes, 120);
        assert_eq!(config.chat.sweep_interval_minutes, 30);
        assert_eq!(config.escalation.min_confidence, 40);
        assert_eq!(config.composer.model, "gemini-2.5-flash");
        assert_eq!(config.composer.max_retries, 1);
        assert!(config.contact.sheet_id.is_none());
        assert_eq!(config.refresh.interval_hours, 6);
        assert_eq!(config.refresh.initial_delay_secs, 10);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
data_dir = "/srv/releasebot"
log_level = "debug"

[server]
port = 8080
rate_limit_per_second = 5

[chat]
history_limit = 4
session_idle_minutes = 30

[escalation]
min_confidence = 60
insufficient_phrases = ["contact sales"]

[contact]
sheet_id = "abc123"
"#;
        let file = create_temp_config(content);
        let config = ReleasebotConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/srv/releasebot");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.rate_limit_per_second, 5);
        assert_eq!(config.chat.history_limit, 4);
        assert_eq!(config.chat.session_idle_minutes, 30);
        assert_eq!(config.escalation.min_confidence, 60);
        assert_eq!(config.escalation.insufficient_phrases, vec!["contact sales"]);
        assert_eq!(config.contact.sheet_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[composer]
provider = "offline"
"#;
        let file = create_temp_config(content);
        let config = ReleasebotConfig::load(file.path()).unwrap();
        assert_eq!(config.composer.provider, "offline");
        // Remaining fields use defaults
        assert_eq!(config.composer.timeout_secs, 20);
        assert_eq!(config.chat.max_message_length, 2000);
        assert_eq!(config.corpus.csv_file, "releases.csv");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ReleasebotConfig::load_or_default(Path::new("/nonexistent/releasebot.toml"));
        assert_eq!(config.general.data_dir, "./data");
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        assert!(ReleasebotConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = ReleasebotConfig::load(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.escalation.insufficient_phrases.len(), 4);
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("releasebot.toml");

        let mut config = ReleasebotConfig::default();
        config.server.port = 9090;
        config.refresh.feed_url = Some("https://example.com/feed.json".to_string());
        config.save(&path).unwrap();

        assert!(path.exists());
        let reloaded = ReleasebotConfig::load(&path).unwrap();
        assert_eq!(reloaded.server.port, 9090);
        assert_eq!(
            reloaded.refresh.feed_url.as_deref(),
            Some("https://example.com/feed.json")
        );
        assert_eq!(reloaded.composer.prompts_dir.as_deref(), Some("prompts"));
    }
}
