use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

pub const DEFAULT_MODELS: &[&str] = &["gpt-4", "gpt-4-0613", "gpt-3.5-turbo"];
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_ADDGENE_BASE: &str = "https://www.addgene.org";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub prompt: PromptConfig,
    pub scraper: ScraperConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    /// Sessions untouched this long are discarded; 0 keeps them forever
    pub session_idle_secs: u64,
}

impl ServerConfig {
    pub fn session_idle_ttl(&self) -> Option<Duration> {
        (self.session_idle_secs > 0).then(|| Duration::from_secs(self.session_idle_secs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
            session_idle_secs: 3600,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct LLMConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub models: Vec<String>,
    pub temperature: f32,
    pub attempt_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_ms: u64,
    pub request_budget_secs: u64,
}

// Hand-written so the key never ends up in logs.
impl std::fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_base", &self.api_base)
            .field("models", &self.models)
            .field("temperature", &self.temperature)
            .field("attempt_timeout_secs", &self.attempt_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_base_ms", &self.retry_base_ms)
            .field("request_budget_secs", &self.request_budget_secs)
            .finish()
    }
}

impl LLMConfig {
    /// The configured API key, if one is set and non-blank
    pub fn active_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }

    pub fn request_budget(&self) -> Duration {
        Duration::from_secs(self.request_budget_secs)
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            temperature: 0.2,
            attempt_timeout_secs: 60,
            max_retries: 2,
            retry_base_ms: 500,
            request_budget_secs: 180,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    pub max_prompt_chars: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self { max_prompt_chars: 48_000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    pub addgene_base_url: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            addgene_base_url: DEFAULT_ADDGENE_BASE.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let llm_defaults = LLMConfig::default();

        Ok(Self {
            server: ServerConfig {
                port: parse_var("PORT", 3000)?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: split_list(
                    &env::var("ALLOWED_ORIGINS")
                        .unwrap_or_else(|_| "http://localhost:3000".to_string()),
                ),
                session_idle_secs: parse_var(
                    "LABMATE_SESSION_IDLE_SECS",
                    ServerConfig::default().session_idle_secs,
                )?,
            },
            llm: LLMConfig {
                api_key: env::var("OPENAI_API_KEY").ok(),
                api_base: env::var("OPENAI_API_BASE").unwrap_or(llm_defaults.api_base),
                models: env::var("LABMATE_MODELS")
                    .map(|raw| split_list(&raw))
                    .ok()
                    .filter(|models| !models.is_empty())
                    .unwrap_or(llm_defaults.models),
                temperature: parse_var("LABMATE_TEMPERATURE", llm_defaults.temperature)?,
                attempt_timeout_secs: parse_var(
                    "LABMATE_ATTEMPT_TIMEOUT_SECS",
                    llm_defaults.attempt_timeout_secs,
                )?,
                max_retries: parse_var("LABMATE_MAX_RETRIES", llm_defaults.max_retries)?,
                retry_base_ms: parse_var("LABMATE_RETRY_BASE_MS", llm_defaults.retry_base_ms)?,
                request_budget_secs: parse_var(
                    "LABMATE_REQUEST_BUDGET_SECS",
                    llm_defaults.request_budget_secs,
                )?,
            },
            prompt: PromptConfig {
                max_prompt_chars: parse_var(
                    "LABMATE_MAX_PROMPT_CHARS",
                    PromptConfig::default().max_prompt_chars,
                )?,
            },
            scraper: ScraperConfig {
                addgene_base_url: env::var("ADDGENE_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_ADDGENE_BASE.to_string()),
            },
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_defaults() {
        let llm = LLMConfig::default();
        assert_eq!(llm.models, vec!["gpt-4", "gpt-4-0613", "gpt-3.5-turbo"]);
        assert_eq!(llm.temperature, 0.2);
        assert_eq!(llm.attempt_timeout(), Duration::from_secs(60));
        assert!(llm.active_api_key().is_none());
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let llm = LLMConfig {
            api_key: Some("   ".to_string()),
            ..LLMConfig::default()
        };
        assert!(llm.active_api_key().is_none());
    }

    #[test]
    fn test_debug_masks_api_key() {
        let llm = LLMConfig {
            api_key: Some("sk-secret-123".to_string()),
            ..LLMConfig::default()
        };
        let rendered = format!("{:?}", llm);
        assert!(!rendered.contains("sk-secret-123"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn test_session_idle_ttl() {
        let server = ServerConfig::default();
        assert_eq!(server.session_idle_ttl(), Some(Duration::from_secs(3600)));

        let server = ServerConfig {
            session_idle_secs: 0,
            ..ServerConfig::default()
        };
        assert!(server.session_idle_ttl().is_none());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }
}
