//! Status notifications
//!
//! Everything the post cycle has to say is a plain line of text. A
//! [`Reporter`] logs each line through `tracing` and forwards it to a
//! [`NotificationSink`]. Sinks are fire-and-forget: delivery failures are
//! logged and swallowed so they never interrupt posting.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use libautopost::notify::{NoopSink, Reporter};
//!
//! # async fn example() {
//! let reporter = Reporter::new(Arc::new(NoopSink));
//! reporter.info("Bot started").await;
//! # }
//! ```

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::json;
use std::sync::{Arc, Mutex};

use crate::config::{TelegramConfig, TelegramCredentials};

/// Receives human-readable status lines
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver `text`; never fails from the caller's point of view
    async fn send(&self, text: &str);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    async fn send(&self, _text: &str) {}
}

/// Keeps every message in memory, for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// True when any message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn send(&self, text: &str) {
        match self.messages.lock() {
            Ok(mut messages) => messages.push(text.to_string()),
            Err(poisoned) => poisoned.into_inner().push(text.to_string()),
        }
    }
}

/// Sends messages to a Telegram chat through the Bot API
pub struct TelegramSink {
    http: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl std::fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // endpoint embeds the bot token
        f.debug_struct("TelegramSink")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl TelegramSink {
    pub fn new(config: &TelegramConfig, credentials: &TelegramCredentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_url.trim_end_matches('/'),
                credentials.bot_token.expose_secret()
            ),
            chat_id: credentials.chat_id.clone(),
        }
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn send(&self, text: &str) {
        let result = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(
                    status = response.status().as_u16(),
                    "Telegram notification was rejected"
                );
            }
            // Strip the URL; it carries the bot token
            Err(e) => tracing::warn!("Telegram notification failed: {}", e.without_url()),
        }
    }
}

/// Telegram when both credentials are present, otherwise a no-op
pub fn sink_from_env(config: &TelegramConfig) -> Arc<dyn NotificationSink> {
    match TelegramCredentials::from_env() {
        Some(credentials) => {
            tracing::debug!("Telegram notifications enabled");
            Arc::new(TelegramSink::new(config, &credentials))
        }
        None => {
            tracing::debug!("Telegram credentials not set, notifications are log-only");
            Arc::new(NoopSink)
        }
    }
}

/// Logs a status line and forwards it to the sink
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn NotificationSink>,
}

impl Reporter {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Reporter that only logs
    pub fn log_only() -> Self {
        Self::new(Arc::new(NoopSink))
    }

    pub async fn info(&self, text: impl AsRef<str>) {
        let text = text.as_ref();
        tracing::info!("{}", text);
        self.sink.send(text).await;
    }

    pub async fn warn(&self, text: impl AsRef<str>) {
        let text = text.as_ref();
        tracing::warn!("{}", text);
        self.sink.send(text).await;
    }

    pub async fn error(&self, text: impl AsRef<str>) {
        let text = text.as_ref();
        tracing::error!("{}", text);
        self.sink.send(text).await;
    }
}
