//! Configuration management for Autopost
//!
//! Non-secret settings come from a TOML file; every section is optional and
//! falls back to the defaults below. API secrets are read from the process
//! environment only (see [`Credentials::from_env`]).

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::mentions::DEFAULT_ROSTER;
use crate::schedule::{TimeSlot, DEFAULT_SLOTS, MAX_POSTS_PER_DAY};

pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schedule: ScheduleConfig,
    pub content: ContentConfig,
    pub media: MediaConfig,
    pub mentions: MentionsConfig,
    pub twitter: TwitterConfig,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Requested posts per day, clamped to 4..=10 when the schedule is built
    pub posts_per_day: u32,
    /// Candidate UTC times of day ("HH:MM"), used in order
    pub slots: Vec<String>,
    /// Seconds between schedule checks
    pub poll_interval: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            posts_per_day: 4,
            slots: DEFAULT_SLOTS.iter().map(|s| s.to_string()).collect(),
            poll_interval: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub path: String,
    pub column: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            path: "tweetlist.xlsx".to_string(),
            column: "Tweet".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub folder: String,
    pub min_files: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            folder: "media".to_string(),
            min_files: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MentionsConfig {
    /// Handles without the leading '@'
    pub handles: Vec<String>,
    pub window: usize,
}

impl Default for MentionsConfig {
    fn default() -> Self {
        Self {
            handles: DEFAULT_ROSTER.iter().map(|s| s.to_string()).collect(),
            window: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    /// Base URL for the v2 API (tweets, users/me)
    pub api_url: String,
    /// Full URL of the v1.1 chunked media upload endpoint
    pub upload_url: String,
    pub chunk_size: usize,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.twitter.com".to_string(),
            upload_url: "https://upload.twitter.com/1.1/media/upload.json".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_url: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.telegram.org".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file is not an error: the built-in defaults are used.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::info!(
                "No config file at {}, using built-in defaults",
                config_path.display()
            );
            let config = Self::default_config();
            config.validate()?;
            return Ok(config);
        }
        Self::load_from_path(&config_path)
    }

    /// Load and validate configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// The defaults the bot shipped with
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        for slot in &self.schedule.slots {
            slot.parse::<TimeSlot>()?;
        }

        let needed = crate::schedule::clamp_posts_per_day(self.schedule.posts_per_day);
        if self.schedule.slots.len() < needed {
            return Err(invalid(
                "schedule.slots",
                format!(
                    "{} slot(s) configured but {} posts per day requested (max {})",
                    self.schedule.slots.len(),
                    needed,
                    MAX_POSTS_PER_DAY
                ),
            ));
        }

        if self.schedule.poll_interval == 0 {
            return Err(invalid("schedule.poll_interval", "must be at least 1 second"));
        }

        if self.mentions.window == 0 {
            return Err(invalid("mentions.window", "must be at least 1"));
        }

        if self.mentions.handles.iter().all(|h| h.replace('@', "").trim().is_empty()) {
            return Err(invalid("mentions.handles", "at least one handle is required"));
        }

        if self.twitter.chunk_size == 0 {
            return Err(invalid("twitter.chunk_size", "must be greater than zero"));
        }

        if self.media.min_files == 0 {
            return Err(invalid("media.min_files", "must be at least 1"));
        }

        Ok(())
    }

    pub fn content_path(&self) -> PathBuf {
        expand_path(&self.content.path)
    }

    pub fn media_folder(&self) -> PathBuf {
        expand_path(&self.media.folder)
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> crate::error::AutopostError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
    .into()
}

/// Expand `~` in a configured path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// Resolve the configuration file path
///
/// `AUTOPOST_CONFIG` wins; otherwise `<config dir>/autopost/config.toml`.
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("AUTOPOST_CONFIG") {
        return Ok(expand_path(&path));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("autopost").join("config.toml"))
}

/// OAuth 1.0a user-context credentials for the posting account
#[derive(Debug)]
pub struct Credentials {
    pub api_key: SecretString,
    pub api_secret: SecretString,
    pub access_token: SecretString,
    pub access_secret: SecretString,
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_secret: impl Into<String>,
    ) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            api_secret: SecretString::from(api_secret.into()),
            access_token: SecretString::from(access_token.into()),
            access_secret: SecretString::from(access_secret.into()),
        }
    }

    /// Read the four `TWITTER_*` secrets from the environment
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            required_env("TWITTER_API_KEY")?,
            required_env("TWITTER_API_SECRET")?,
            required_env("TWITTER_ACCESS_TOKEN")?,
            required_env("TWITTER_ACCESS_SECRET")?,
        ))
    }
}

/// Bot token and chat for the Telegram side channel
#[derive(Debug)]
pub struct TelegramCredentials {
    pub bot_token: SecretString,
    pub chat_id: String,
}

impl TelegramCredentials {
    /// Both `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID` must be set, otherwise
    /// notifications are disabled
    pub fn from_env() -> Option<Self> {
        let bot_token = optional_env("TELEGRAM_BOT_TOKEN")?;
        let chat_id = optional_env("TELEGRAM_CHAT_ID")?;
        Some(Self {
            bot_token: SecretString::from(bot_token),
            chat_id,
        })
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_env(name: &str) -> Result<String> {
    optional_env(name).ok_or_else(|| ConfigError::MissingField(name.to_string()).into())
}
