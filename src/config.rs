use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::chatbot::engine::{normalize_keywords, ChannelScope, EngineConfig, DEFAULT_CORRECTION_KEYWORDS};
use crate::chatbot::persona::Personas;
use crate::moderation::BannedTerms;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// A banned term did not compile.
    InvalidRegex { source: regex::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::InvalidRegex { source } => {
                write!(f, "invalid banned term pattern: {}", source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::InvalidRegex { source } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    /// Falls back to `DISCORD_TOKEN`.
    #[serde(default)]
    discord_bot_token: String,
    /// Falls back to `GEMINI_API_KEY`.
    #[serde(default)]
    gemini_api_key: String,
    /// Falls back to `GROQ_API_KEY`.
    #[serde(default)]
    groq_api_key: String,
    #[serde(default = "default_gemini_model")]
    gemini_model: String,
    #[serde(default = "default_groq_model")]
    groq_model: String,
    /// Channels where banned terms are checked. Empty disables moderation.
    #[serde(default)]
    moderated_channels: Vec<u64>,
    /// Channels where the bot talks. Empty means every channel it can see.
    #[serde(default)]
    response_channels: Vec<u64>,
    #[serde(default = "default_true")]
    require_mention: bool,
    #[serde(default = "default_true")]
    ignore_broadcasts: bool,
    #[serde(default)]
    banned_terms: Vec<String>,
    correction_keywords: Option<Vec<String>>,
    #[serde(default)]
    personas: Personas,
    #[serde(default = "default_timezone")]
    timezone: String,
    log_channel_id: Option<u64>,
    /// Directory for log files. Defaults to current directory.
    data_dir: Option<String>,
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_groq_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_timezone() -> String {
    "Asia/Manila".to_string()
}

fn default_true() -> bool {
    true
}

pub struct Config {
    pub discord_bot_token: String,
    pub gemini_api_key: String,
    pub groq_api_key: String,
    pub gemini_model: String,
    pub groq_model: String,
    pub engine: EngineConfig,
    pub timezone: Tz,
    pub log_channel_id: Option<u64>,
    /// Directory for state files (logs).
    pub data_dir: PathBuf,
}

impl Config {
    /// Load from `path`, taking missing credentials from the process environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    pub fn load_with_env<P, E>(path: P, env: E) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        E: Fn(&str) -> Option<String>,
    {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        let credential = |value: String, var: &str| -> Result<String, ConfigError> {
            let value = if value.is_empty() { env(var).unwrap_or_default() } else { value };
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{} is required (config file or {} environment variable)",
                    var.to_lowercase(),
                    var
                )));
            }
            Ok(value)
        };

        let discord_bot_token = credential(file.discord_bot_token, "DISCORD_TOKEN")?;
        let gemini_api_key = credential(file.gemini_api_key, "GEMINI_API_KEY")?;
        let groq_api_key = credential(file.groq_api_key, "GROQ_API_KEY")?;

        let timezone: Tz = file
            .timezone
            .parse()
            .map_err(|_| ConfigError::Validation(format!("unknown timezone '{}'", file.timezone)))?;

        let banned_terms = BannedTerms::new(&file.banned_terms)
            .map_err(|e| ConfigError::InvalidRegex { source: e })?;

        let correction_keywords = match file.correction_keywords {
            Some(keywords) => normalize_keywords(keywords),
            None => normalize_keywords(DEFAULT_CORRECTION_KEYWORDS),
        };

        let engine = EngineConfig {
            response_scope: ChannelScope::from_ids(file.response_channels, ChannelScope::Everywhere),
            moderation_scope: ChannelScope::from_ids(file.moderated_channels, ChannelScope::Nowhere),
            require_mention: file.require_mention,
            ignore_broadcasts: file.ignore_broadcasts,
            correction_keywords,
            banned_terms,
            personas: file.personas,
        };

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            discord_bot_token,
            gemini_api_key,
            groq_api_key,
            gemini_model: file.gemini_model,
            groq_model: file.groq_model,
            engine,
            timezone,
            log_channel_id: file.log_channel_id,
            data_dir,
        })
    }
}
