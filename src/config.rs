use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scheduler::DailyTime;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Openai,
    Openrouter,
    Ollama,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Openai => write!(f, "openai"),
            LlmProvider::Openrouter => write!(f, "openrouter"),
            LlmProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl LlmProvider {
    /// Local providers run without an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LlmProvider::Ollama)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            base_url: String::new(),
            api_key: String::new(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Returns the effective base_url: if the stored value is empty,
    /// fall back to the canonical URL for the configured provider.
    pub fn effective_base_url(&self) -> &str {
        if !self.base_url.is_empty() {
            return &self.base_url;
        }
        match self.provider {
            LlmProvider::Openai => "https://api.openai.com/v1",
            LlmProvider::Openrouter => "https://openrouter.ai/api/v1",
            LlmProvider::Ollama => "http://localhost:11434/v1",
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Chats that receive the scheduled daily question
    #[serde(default)]
    pub broadcast_chat_ids: Vec<i64>,
    #[serde(default = "default_timeout_secs")]
    pub send_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            broadcast_chat_ids: Vec::new(),
            send_timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_path")]
    pub path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    /// Local wall-clock times, "HH:MM"
    #[serde(default = "default_times")]
    pub times: Vec<DailyTime>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            times: default_times(),
        }
    }
}

/// User-facing texts. Defaults are the group's Persian wording.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MessagesConfig {
    pub greeting: String,
    pub group_only: String,
    pub question_header: String,
    pub mentions_prefix: String,
    pub fallback_question: String,
    pub fallback_quip: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            greeting: "سلام! من ربات گروه مدیریت استرسم 😊".to_string(),
            group_only: "این دستور فقط توی گروه کار می‌کنه.".to_string(),
            question_header: "🧠 سوال امروز:".to_string(),
            mentions_prefix: "📣".to_string(),
            fallback_question: "وقتی استرس داری، معمولاً چه کاری بهت کمک می‌کنه؟".to_string(),
            fallback_quip: "ممنون که جواب دادی 🌱 یه نفس عمیق بکش، ما کنارتیم.".to_string(),
        }
    }
}

/// Values read from the process environment. They take precedence over the file.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    pub bot_token: Option<String>,
    pub llm_api_key: Option<String>,
    pub broadcast_chat_ids: Option<String>,
    pub broadcast_times: Option<String>,
    pub users_file: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let var = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
        };
        Self {
            bot_token: var(&["BOT_TOKEN", "TELEGRAM_BOT_TOKEN"]),
            llm_api_key: var(&["OPENAI_API_KEY", "LLM_API_KEY"]),
            broadcast_chat_ids: var(&["BROADCAST_CHAT_IDS"]),
            broadcast_times: var(&["BROADCAST_TIMES"]),
            users_file: var(&["USERS_FILE"]),
        }
    }
}

/// Long polling holds `getUpdates` open this long; the HTTP timeout must exceed it.
const LONG_POLL_SECS: u64 = 10;

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    300
}

fn default_temperature() -> f32 {
    0.8
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("users.json")
}

fn default_times() -> Vec<DailyTime> {
    vec![DailyTime::new(9, 0)]
}

impl Config {
    /// Read the optional TOML file at `path`, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = if path.exists() {
            Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?,
            )
        } else {
            None
        };

        Self::from_parts(content.as_deref(), EnvOverrides::from_env())
            .with_context(|| format!("Invalid configuration ({})", path.display()))
    }

    /// Build a validated config from file content and explicit overrides.
    /// Tests pass overrides directly instead of mutating env vars.
    pub fn from_parts(content: Option<&str>, overrides: EnvOverrides) -> Result<Self> {
        let mut config: Config = match content {
            Some(content) => toml::from_str(content).context("Failed to parse config file")?,
            None => Config::default(),
        };

        if let Some(token) = overrides.bot_token {
            config.telegram.bot_token = token;
        }
        if let Some(key) = overrides.llm_api_key {
            config.llm.api_key = key;
        }
        if let Some(ids) = overrides.broadcast_chat_ids {
            config.telegram.broadcast_chat_ids = parse_list(&ids, |s| {
                s.parse::<i64>()
                    .with_context(|| format!("Invalid chat id in BROADCAST_CHAT_IDS: {s}"))
            })?;
        }
        if let Some(times) = overrides.broadcast_times {
            config.schedule.times = parse_list(&times, |s| s.parse::<DailyTime>())?;
        }
        if let Some(path) = overrides.users_file {
            config.registry.path = PathBuf::from(path);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("Missing Telegram bot token (set BOT_TOKEN or [telegram].bot_token)");
        }
        if self.llm.provider.requires_api_key() && self.llm.api_key.trim().is_empty() {
            anyhow::bail!(
                "Missing API key for provider '{}' (set OPENAI_API_KEY or [llm].api_key)",
                self.llm.provider
            );
        }
        if self.llm.timeout_secs == 0 {
            anyhow::bail!("[llm].timeout_secs must be greater than zero");
        }
        if self.telegram.send_timeout_secs <= LONG_POLL_SECS {
            anyhow::bail!(
                "[telegram].send_timeout_secs must be greater than {} (the long polling timeout)",
                LONG_POLL_SECS
            );
        }
        Ok(())
    }
}

fn parse_list<T>(raw: &str, parse: impl Fn(&str) -> Result<T>) -> Result<Vec<T>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> EnvOverrides {
        EnvOverrides {
            bot_token: Some("123:abc".to_string()),
            llm_api_key: Some("sk-test".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_without_file() {
        let config = Config::from_parts(None, creds()).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::Openai);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.effective_base_url(), "https://api.openai.com/v1");
        assert_eq!(config.registry.path, PathBuf::from("users.json"));
        assert_eq!(config.schedule.times, vec![DailyTime::new(9, 0)]);
        assert!(config.telegram.broadcast_chat_ids.is_empty());
    }

    #[test]
    fn test_missing_bot_token_is_fatal() {
        let overrides = EnvOverrides {
            llm_api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let err = Config::from_parts(None, overrides).unwrap_err();
        assert!(err.to_string().contains("bot token"));
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let overrides = EnvOverrides {
            bot_token: Some("123:abc".to_string()),
            ..Default::default()
        };
        let err = Config::from_parts(None, overrides).unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_ollama_needs_no_api_key() {
        let toml = r#"
            [llm]
            provider = "ollama"
            model = "llama3"
        "#;
        let overrides = EnvOverrides {
            bot_token: Some("123:abc".to_string()),
            ..Default::default()
        };
        let config = Config::from_parts(Some(toml), overrides).unwrap();
        assert_eq!(config.llm.effective_base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn test_file_values_and_env_precedence() {
        let toml = r#"
            [telegram]
            bot_token = "from-file"
            broadcast_chat_ids = [-100111]

            [llm]
            api_key = "file-key"
            temperature = 0.5

            [schedule]
            times = ["08:30", "21:00"]

            [messages]
            greeting = "hi"
        "#;
        let overrides = EnvOverrides {
            bot_token: Some("from-env".to_string()),
            broadcast_chat_ids: Some("-100222, -100333".to_string()),
            ..Default::default()
        };
        let config = Config::from_parts(Some(toml), overrides).unwrap();
        assert_eq!(config.telegram.bot_token, "from-env");
        assert_eq!(config.llm.api_key, "file-key");
        assert_eq!(config.llm.temperature, 0.5);
        assert_eq!(config.telegram.broadcast_chat_ids, vec![-100222, -100333]);
        assert_eq!(
            config.schedule.times,
            vec![DailyTime::new(8, 30), DailyTime::new(21, 0)]
        );
        assert_eq!(config.messages.greeting, "hi");
        // untouched message keys keep their defaults
        assert_eq!(config.messages.question_header, "🧠 سوال امروز:");
    }

    #[test]
    fn test_env_times_override() {
        let overrides = EnvOverrides {
            broadcast_times: Some("07:05,19:45".to_string()),
            users_file: Some("/data/members.json".to_string()),
            ..creds()
        };
        let config = Config::from_parts(None, overrides).unwrap();
        assert_eq!(
            config.schedule.times,
            vec![DailyTime::new(7, 5), DailyTime::new(19, 45)]
        );
        assert_eq!(config.registry.path, PathBuf::from("/data/members.json"));
    }

    #[test]
    fn test_invalid_time_is_fatal() {
        let toml = r#"
            [schedule]
            times = ["25:00"]
        "#;
        assert!(Config::from_parts(Some(toml), creds()).is_err());

        let overrides = EnvOverrides {
            broadcast_times: Some("9am".to_string()),
            ..creds()
        };
        assert!(Config::from_parts(None, overrides).is_err());
    }

    #[test]
    fn test_invalid_chat_id_is_fatal() {
        let overrides = EnvOverrides {
            broadcast_chat_ids: Some("-100, group".to_string()),
            ..creds()
        };
        assert!(Config::from_parts(None, overrides).is_err());
    }

    #[test]
    fn test_send_timeout_must_outlast_long_polling() {
        for secs in [1, 5, 10] {
            let toml = format!("[telegram]\nsend_timeout_secs = {secs}\n");
            let err = Config::from_parts(Some(&toml), creds()).unwrap_err();
            assert!(err.to_string().contains("send_timeout_secs"), "secs: {secs}");
        }

        let toml = "[telegram]\nsend_timeout_secs = 11\n";
        let config = Config::from_parts(Some(toml), creds()).unwrap();
        assert_eq!(config.telegram.send_timeout_secs, 11);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let toml = r#"
            [llm]
            timeout_secs = 0
        "#;
        assert!(Config::from_parts(Some(toml), creds()).is_err());
    }
}
