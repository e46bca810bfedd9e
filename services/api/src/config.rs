//! Application Configuration Module
//!
//! Loads every setting the service needs once at start-up. The resulting
//! [`Config`] builds the provider client and the story components.
use secrecy::SecretString;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use storyteller_core::ReplySchema;
use storyteller_core::turn::PollPolicy;
use tracing::Level;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub openai_api_key: SecretString,
    pub openai_base_url: Option<String>,
    pub persona_model: String,
    pub assistant_model: String,
    pub image_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub reply_schema: ReplySchema,
    pub poll: PollPolicy,
    /// Enables the scene archive routes when set.
    pub assets_dir: Option<PathBuf>,
    pub prompts_dir: Option<PathBuf>,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// A `.env` file in the current directory is loaded first, if present.
    ///
    /// *   `OPENAI_API_KEY`: Required.
    /// *   `OPENAI_BASE_URL`: (Optional) Overrides the provider endpoint.
    /// *   `BIND_ADDRESS`: (Optional) Defaults to "0.0.0.0:5000".
    /// *   `PERSONA_MODEL`, `ASSISTANT_MODEL`, `IMAGE_MODEL`, `TTS_MODEL`, `TTS_VOICE`: (Optional) Model choices.
    /// *   `REPLY_SCHEMA`: (Optional) "scene" or "legacy". Defaults to "scene".
    /// *   `RUN_POLL_INTERVAL_MS`, `RUN_POLL_MAX_INTERVAL_MS`, `RUN_TIMEOUT_SECS`: (Optional) Run polling.
    /// *   `GAME_ASSETS_DIR`, `PROMPTS_DIR`: (Optional) Directories.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let openai_api_key = var("OPENAI_API_KEY")
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;

        let bind_address = parse_or(var("BIND_ADDRESS"), "BIND_ADDRESS", || {
            DEFAULT_BIND_ADDRESS.parse::<SocketAddr>()
        })?;

        let reply_schema = match var("REPLY_SCHEMA") {
            Some(value) => value
                .parse::<ReplySchema>()
                .map_err(|e| ConfigError::InvalidValue("REPLY_SCHEMA".to_string(), e))?,
            None => ReplySchema::default(),
        };

        let defaults = PollPolicy::default();
        let initial_ms: u64 = parse_or(var("RUN_POLL_INTERVAL_MS"), "RUN_POLL_INTERVAL_MS", || {
            Ok::<_, ConfigError>(defaults.initial_interval.as_millis() as u64)
        })?;
        let max_ms: u64 = parse_or(var("RUN_POLL_MAX_INTERVAL_MS"), "RUN_POLL_MAX_INTERVAL_MS", || {
            Ok::<_, ConfigError>(defaults.max_interval.as_millis() as u64)
        })?;
        let timeout_secs: u64 = parse_or(var("RUN_TIMEOUT_SECS"), "RUN_TIMEOUT_SECS", || {
            Ok::<_, ConfigError>(defaults.timeout.as_secs())
        })?;
        if initial_ms == 0 || max_ms < initial_ms {
            return Err(ConfigError::InvalidValue(
                "RUN_POLL_INTERVAL_MS".to_string(),
                format!("must be between 1 and RUN_POLL_MAX_INTERVAL_MS ({})", max_ms),
            ));
        }
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "RUN_TIMEOUT_SECS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }
        let poll = PollPolicy {
            initial_interval: Duration::from_millis(initial_ms),
            max_interval: Duration::from_millis(max_ms),
            timeout: Duration::from_secs(timeout_secs),
            ..defaults
        };

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            openai_api_key,
            openai_base_url: var("OPENAI_BASE_URL"),
            persona_model: var("PERSONA_MODEL").unwrap_or_else(|| "gpt-4".to_string()),
            assistant_model: var("ASSISTANT_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            image_model: var("IMAGE_MODEL").unwrap_or_else(|| "dall-e-3".to_string()),
            tts_model: var("TTS_MODEL").unwrap_or_else(|| "tts-1-hd".to_string()),
            tts_voice: var("TTS_VOICE").unwrap_or_else(|| "nova".to_string()),
            reply_schema,
            poll,
            assets_dir: var("GAME_ASSETS_DIR").map(PathBuf::from),
            prompts_dir: var("PROMPTS_DIR").map(PathBuf::from),
            log_level,
        })
    }
}

/// Parses `value` when present, otherwise falls back to `default`.
fn parse_or<T, E>(
    value: Option<String>,
    name: &str,
    default: impl FnOnce() -> Result<T, E>,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    E: std::fmt::Display,
{
    match value {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => default().map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("OPENAI_API_KEY", "sk-test")]).unwrap();

        assert_eq!(config.openai_api_key.expose_secret(), "sk-test");
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:5000");
        assert_eq!(config.persona_model, "gpt-4");
        assert_eq!(config.assistant_model, "gpt-4o");
        assert_eq!(config.image_model, "dall-e-3");
        assert_eq!(config.tts_model, "tts-1-hd");
        assert_eq!(config.tts_voice, "nova");
        assert_eq!(config.reply_schema, ReplySchema::SceneObject);
        assert_eq!(config.poll, PollPolicy::default());
        assert!(config.assets_dir.is_none());
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn test_missing_api_key() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingVar(name)) if name == "OPENAI_API_KEY"));
        assert!(matches!(
            load(&[("OPENAI_API_KEY", "  ")]),
            Err(ConfigError::MissingVar(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("REPLY_SCHEMA", "legacy"),
            ("RUN_POLL_INTERVAL_MS", "100"),
            ("RUN_POLL_MAX_INTERVAL_MS", "800"),
            ("RUN_TIMEOUT_SECS", "30"),
            ("GAME_ASSETS_DIR", "/srv/scenes"),
            ("RUST_LOG", "debug"),
        ])
        .unwrap();

        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.reply_schema, ReplySchema::BlockArray);
        assert_eq!(config.poll.initial_interval, Duration::from_millis(100));
        assert_eq!(config.poll.max_interval, Duration::from_millis(800));
        assert_eq!(config.poll.timeout, Duration::from_secs(30));
        assert_eq!(config.assets_dir, Some(PathBuf::from("/srv/scenes")));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn test_invalid_values() {
        for (name, value) in [
            ("BIND_ADDRESS", "not-an-address"),
            ("REPLY_SCHEMA", "xml"),
            ("RUN_TIMEOUT_SECS", "soon"),
            ("RUN_TIMEOUT_SECS", "0"),
            ("RUN_POLL_INTERVAL_MS", "9000"),
            ("RUST_LOG", "loud"),
        ] {
            let result = load(&[("OPENAI_API_KEY", "sk-test"), (name, value)]);
            assert!(
                matches!(result, Err(ConfigError::InvalidValue(..))),
                "{}={} should be rejected",
                name,
                value
            );
        }
    }
}
