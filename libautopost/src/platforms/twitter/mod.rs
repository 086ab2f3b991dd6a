//! Twitter (X) platform implementation
//!
//! Publishing uses the v2 `tweets` endpoint and media goes through the v1.1
//! chunked upload endpoint. Both are authenticated with OAuth 1.0a user
//! context; see [`oauth`].

pub mod oauth;
pub mod upload;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::{Credentials, TwitterConfig};
use crate::error::{PlatformError, Result};
use crate::platforms::Platform;
use crate::types::{MediaFile, POST_CHAR_LIMIT};

pub use oauth::{OAuthSigner, SignedRequest};
pub use upload::{segment_ranges, MediaUploader, ProcessingState, UploadPhase, UploadSession};

const USER_AGENT: &str = concat!("autopost/", env!("CARGO_PKG_VERSION"));

/// Longest slice of a response body carried into an error message
const MAX_ERROR_BODY: usize = 300;

pub struct TwitterClient {
    http: reqwest::Client,
    signer: OAuthSigner,
    api_url: String,
    uploader: MediaUploader,
}

impl TwitterClient {
    pub fn new(config: &TwitterConfig, credentials: Credentials) -> Result<Self> {
        Self::with_signer(config, OAuthSigner::new(credentials))
    }

    /// Build a client around an existing signer (fixed nonce/clock in tests)
    pub fn with_signer(config: &TwitterConfig, signer: OAuthSigner) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PlatformError::Network(format!("Failed to build HTTP client: {}", e)))?;

        let uploader = MediaUploader::new(
            http.clone(),
            signer.clone(),
            config.upload_url.clone(),
            config.chunk_size,
        );

        Ok(Self {
            http,
            signer,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            uploader,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Public link for a published post
    pub fn status_url(id: &str) -> String {
        format!("https://twitter.com/user/status/{}", id)
    }
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    username: String,
}

#[derive(Debug, Deserialize)]
struct CreatedPost {
    id: String,
}

#[async_trait]
impl Platform for TwitterClient {
    async fn verify_credentials(&self) -> Result<String> {
        let url = self.endpoint("/2/users/me");
        let signed = self.signer.sign("GET", &url, &[]);

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, signed.authorization)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "credential check"))?;
        let response =
            check_status(response, "credential check", PlatformError::Authentication).await?;

        let body: DataEnvelope<UserData> = response.json().await.map_err(|e| {
            PlatformError::Authentication(format!("credential check returned an unreadable body: {}", e))
        })?;
        let user = body.data.ok_or_else(|| {
            PlatformError::Authentication("credential check returned no user".to_string())
        })?;

        info!(username = %user.username, "Twitter credentials verified");
        Ok(user.username)
    }

    async fn upload_media(&self, media: &MediaFile) -> Result<String> {
        let session = self.uploader.upload(media).await?;
        debug!(
            media_id = %session.media_id,
            processing_state = ?session.processing_state,
            "Media ready to attach"
        );
        Ok(session.media_id)
    }

    async fn publish(&self, text: &str, media_ids: &[String]) -> Result<Option<String>> {
        let url = self.endpoint("/2/tweets");
        // JSON bodies are not part of the signature
        let signed = self.signer.sign("POST", &url, &[]);

        let mut payload = json!({ "text": text });
        if !media_ids.is_empty() {
            payload["media"] = json!({ "media_ids": media_ids });
        }

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, signed.authorization)
            .json(&payload)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "publish"))?;
        let response = check_status(response, "publish", PlatformError::Posting).await?;

        let id = match response.json::<DataEnvelope<CreatedPost>>().await {
            Ok(DataEnvelope { data: Some(post) }) => Some(post.id),
            Ok(_) => None,
            Err(e) => {
                debug!("Could not read publish response body: {}", e);
                None
            }
        };
        Ok(id)
    }

    fn post_url(&self, id: &str) -> Option<String> {
        Some(Self::status_url(id))
    }

    fn name(&self) -> &str {
        "twitter"
    }

    fn character_limit(&self) -> Option<usize> {
        Some(POST_CHAR_LIMIT)
    }
}

/// Pass 2xx responses through; turn anything else into a `PlatformError`
///
/// 401/403 map to `Authentication`, 429 to `RateLimit`, 5xx to `Network` and
/// other statuses to `fallback`.
pub(crate) async fn check_status(
    response: reqwest::Response,
    context: &str,
    fallback: fn(String) -> PlatformError,
) -> std::result::Result<reqwest::Response, PlatformError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(map_http_error(status.as_u16(), &body, context, fallback))
}

pub(crate) fn map_http_error(
    status: u16,
    body: &str,
    context: &str,
    fallback: fn(String) -> PlatformError,
) -> PlatformError {
    let detail = api_error_message(body);
    match status {
        401 | 403 => PlatformError::Authentication(format!(
            "Twitter rejected {} ({}): {}. \
                Suggestion: check the app's read/write permission and regenerate the access token.",
            context, status, detail
        )),
        429 => PlatformError::RateLimit(format!(
            "Twitter rate limit hit during {} ({}): {}",
            context, status, detail
        )),
        500..=599 => PlatformError::Network(format!(
            "Twitter server error during {} ({}): {}",
            context, status, detail
        )),
        _ => fallback(format!("{} returned {}: {}", context, status, detail)),
    }
}

pub(crate) fn map_transport_error(error: reqwest::Error, context: &str) -> PlatformError {
    PlatformError::Network(format!("{} request failed: {}", context, error))
}

/// Best human-readable message in a Twitter error body
fn api_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = value.get("detail").and_then(|d| d.as_str()) {
            return detail.to_string();
        }
        if let Some(message) = value
            .get("errors")
            .and_then(|e| e.get(0))
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
        if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
            return error.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_http_error(401, "", "publish", PlatformError::Posting),
            PlatformError::Authentication(_)
        ));
        assert!(matches!(
            map_http_error(403, "", "publish", PlatformError::Posting),
            PlatformError::Authentication(_)
        ));
        assert!(matches!(
            map_http_error(429, "", "publish", PlatformError::Posting),
            PlatformError::RateLimit(_)
        ));
        assert!(matches!(
            map_http_error(503, "", "publish", PlatformError::Posting),
            PlatformError::Network(_)
        ));
        assert!(matches!(
            map_http_error(400, "", "publish", PlatformError::Posting),
            PlatformError::Posting(_)
        ));
        assert!(matches!(
            map_http_error(400, "", "media upload INIT", PlatformError::Upload),
            PlatformError::Upload(_)
        ));
    }

    #[test]
    fn test_api_error_message_shapes() {
        assert_eq!(
            api_error_message(r#"{"title":"Forbidden","detail":"You are not permitted to perform this action.","status":403}"#),
            "You are not permitted to perform this action."
        );
        assert_eq!(
            api_error_message(r#"{"errors":[{"code":324,"message":"Invalid media id"}]}"#),
            "Invalid media id"
        );
        assert_eq!(api_error_message("  "), "empty response body");
        assert_eq!(api_error_message(&"x".repeat(1000)).len(), MAX_ERROR_BODY);
    }

    #[test]
    fn test_error_message_carries_context_and_status() {
        let err = map_http_error(
            400,
            r#"{"detail":"Text is too long"}"#,
            "publish",
            PlatformError::Posting,
        );
        assert_eq!(
            err.to_string(),
            "Posting failed: publish returned 400: Text is too long"
        );
    }

    #[test]
    fn test_status_url() {
        assert_eq!(
            TwitterClient::status_url("1445880548472328192"),
            "https://twitter.com/user/status/1445880548472328192"
        );
    }
}
