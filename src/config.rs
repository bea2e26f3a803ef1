use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use teloxide::types::{ChatId, Recipient};

use crate::access::OperatorIdentity;
use crate::error::ConfigError;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub admin_id: Option<String>,
    #[serde(default)]
    pub admin_username: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_quiz_temperature")]
    pub quiz_temperature: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    /// Language the generated posts and quizzes are written in
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// Maximum number of senders tracked before least-recently-used eviction
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default = "default_llm_config")]
    pub llm: LlmConfig,
    #[serde(default = "default_content_config")]
    pub content: ContentConfig,
    #[serde(default = "default_rate_limit_config")]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama3-8b-8192".to_string()
}

fn default_temperature() -> f32 {
    0.8
}

fn default_max_tokens() -> u32 {
    1500
}

fn default_top_p() -> f32 {
    0.9
}

fn default_quiz_temperature() -> f32 {
    0.7
}

fn default_language() -> String {
    "Simple Arabic (MSA)".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_window_ms() -> u64 {
    10_000
}

fn default_capacity() -> usize {
    10_000
}

fn default_llm_config() -> LlmConfig {
    LlmConfig {
        api_key: String::new(),
        base_url: default_base_url(),
        model: default_model(),
        temperature: default_temperature(),
        max_tokens: default_max_tokens(),
        top_p: default_top_p(),
        quiz_temperature: default_quiz_temperature(),
    }
}

fn default_content_config() -> ContentConfig {
    ContentConfig {
        language: default_language(),
        max_attempts: default_max_attempts(),
        retry_delay_ms: default_retry_delay_ms(),
    }
}

fn default_rate_limit_config() -> RateLimitConfig {
    RateLimitConfig {
        window_ms: default_window_ms(),
        capacity: default_capacity(),
    }
}

impl Config {
    /// Load configuration from an optional TOML file, a `.env` file and the
    /// process environment, in increasing order of precedence.
    pub fn load(path: &Path) -> Result<Self> {
        let content = if path.exists() {
            Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?,
            )
        } else {
            None
        };

        // A missing .env is the normal case in production
        let _ = dotenvy::dotenv();

        let config = Self::from_sources(content.as_deref(), |key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Build and validate a config from TOML text plus an environment lookup.
    pub fn from_sources(
        toml_text: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(toml_text.unwrap_or(""))?;

        let var = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = var("BOT_TOKEN") {
            config.telegram.bot_token = v;
        }
        if let Some(v) = var("GROQ_API_KEY") {
            config.llm.api_key = v;
        }
        if let Some(v) = var("CHANNEL_ID") {
            config.telegram.channel_id = v;
        }
        if let Some(v) = var("ADMIN_ID") {
            config.telegram.admin_id = Some(v);
        }
        if let Some(v) = var("ADMIN_USERNAME") {
            config.telegram.admin_username = Some(v);
        }
        if let Some(v) = var("LLM_MODEL") {
            config.llm.model = v;
        }
        if let Some(v) = var("PORT") {
            let port = v
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value: v })?;
            config.server.port = Some(port);
        }
        if let Some(v) = var("RATE_LIMIT_MS") {
            config.rate_limit.window_ms = v.parse().map_err(|_| ConfigError::Invalid {
                key: "RATE_LIMIT_MS",
                value: v,
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.telegram.bot_token.trim().is_empty() {
            missing.push("BOT_TOKEN");
        }
        if self.llm.api_key.trim().is_empty() {
            missing.push("GROQ_API_KEY");
        }
        if self.telegram.channel_id.trim().is_empty() {
            missing.push("CHANNEL_ID");
        }
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }
        if self.content.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "content.max_attempts",
                value: "0".to_string(),
            });
        }
        if self.rate_limit.capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "rate_limit.capacity",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// The operator allowed to drive the bot. Empty when no admin is configured.
    pub fn operator(&self) -> OperatorIdentity {
        OperatorIdentity::new(
            self.telegram.admin_id.as_deref(),
            self.telegram.admin_username.as_deref(),
        )
    }

    /// Destination channel: numeric ids become chat ids, anything else a channel username.
    pub fn channel(&self) -> Recipient {
        let raw = self.telegram.channel_id.trim();
        match raw.parse::<i64>() {
            Ok(id) => Recipient::Id(ChatId(id)),
            Err(_) if raw.starts_with('@') => Recipient::ChannelUsername(raw.to_string()),
            Err(_) => Recipient::ChannelUsername(format!("@{}", raw)),
        }
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit.window_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.content.retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("BOT_TOKEN", "123:abc"),
            ("GROQ_API_KEY", "gsk_test"),
            ("CHANNEL_ID", "@mychannel"),
        ]
    }

    #[test]
    fn test_env_only_uses_defaults() {
        let config = Config::from_sources(None, env_of(&required())).unwrap();
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.llm.model, "llama3-8b-8192");
        assert_eq!(config.llm.max_tokens, 1500);
        assert_eq!(config.rate_limit.window_ms, 10_000);
        assert_eq!(config.content.max_attempts, 3);
        assert_eq!(config.retry_delay(), Duration::from_secs(2));
        assert!(config.server.port.is_none());
        assert!(config.operator().is_open());
    }

    #[test]
    fn test_missing_required_settings() {
        let err = Config::from_sources(None, env_of(&[("BOT_TOKEN", "t")])).unwrap_err();
        match err {
            ConfigError::Missing(keys) => assert_eq!(keys, vec!["GROQ_API_KEY", "CHANNEL_ID"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_env_value_counts_as_missing() {
        let mut pairs = required();
        pairs[0] = ("BOT_TOKEN", "   ");
        let err = Config::from_sources(None, env_of(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref k) if k == &vec!["BOT_TOKEN"]));
    }

    #[test]
    fn test_env_overrides_file() {
        let toml_text = r#"
            [telegram]
            bot_token = "from-file"
            channel_id = "-1001234"
            admin_username = "@Boss"

            [llm]
            api_key = "file-key"
            model = "mixtral-8x7b-32768"

            [rate_limit]
            window_ms = 5000
        "#;
        let config = Config::from_sources(
            Some(toml_text),
            env_of(&[("BOT_TOKEN", "from-env"), ("PORT", "8080")]),
        )
        .unwrap();
        assert_eq!(config.telegram.bot_token, "from-env");
        assert_eq!(config.llm.api_key, "file-key");
        assert_eq!(config.llm.model, "mixtral-8x7b-32768");
        assert_eq!(config.rate_limit.window_ms, 5000);
        assert_eq!(config.server.port, Some(8080));
        assert!(!config.operator().is_open());
    }

    #[test]
    fn test_invalid_port() {
        let mut pairs = required();
        pairs.push(("PORT", "eighty"));
        let err = Config::from_sources(None, env_of(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn test_channel_recipient() {
        let mut pairs = required();
        pairs[2] = ("CHANNEL_ID", "-1001234567890");
        let config = Config::from_sources(None, env_of(&pairs)).unwrap();
        assert_eq!(config.channel(), Recipient::Id(ChatId(-1001234567890)));

        pairs[2] = ("CHANNEL_ID", "mychannel");
        let config = Config::from_sources(None, env_of(&pairs)).unwrap();
        assert_eq!(
            config.channel(),
            Recipient::ChannelUsername("@mychannel".to_string())
        );
    }
}
