//! Mock platform implementation for testing
//!
//! A configurable stand-in for the Twitter client. It records every upload and
//! publish so tests can assert on what the post cycle sent, and can be told to
//! fail credential checks, uploads (all or for specific files) or publishing.
//! Clones share their recordings, so a test can keep one clone while the
//! cycle owns another.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::{PlatformError, Result};
use crate::platforms::Platform;
use crate::types::MediaFile;

/// One recorded publish call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub text: String,
    pub media_ids: Vec<String>,
}

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Platform name, also used in generated ids and links
    pub name: String,

    /// Username returned by a successful credential check
    pub username: String,

    /// Error returned by `verify_credentials`
    pub auth_error: Option<PlatformError>,

    /// Error returned by every upload
    pub upload_error: Option<PlatformError>,

    /// File names whose upload fails with a processing error
    pub failing_media: Vec<String>,

    /// Error returned by every publish
    pub publish_error: Option<PlatformError>,

    /// Whether a successful publish reports a post id
    pub returns_post_id: bool,

    /// Limit the post cycle composes for
    pub character_limit: Option<usize>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            username: "mock_user".to_string(),
            auth_error: None,
            upload_error: None,
            failing_media: Vec::new(),
            publish_error: None,
            returns_post_id: true,
            character_limit: Some(crate::types::POST_CHAR_LIMIT),
        }
    }
}

#[derive(Debug, Default)]
struct Recorded {
    verify_calls: usize,
    uploads: Vec<String>,
    published: Vec<PublishedPost>,
    attempted_publishes: usize,
}

/// Mock platform for testing
#[derive(Debug, Clone)]
pub struct MockPlatform {
    config: MockConfig,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            recorded: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    /// A mock platform that always succeeds
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Credential checks fail with an authentication error
    pub fn auth_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            auth_error: Some(PlatformError::Authentication(error.to_string())),
            ..Default::default()
        })
    }

    /// Every upload fails
    pub fn upload_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            upload_error: Some(PlatformError::Upload(error.to_string())),
            ..Default::default()
        })
    }

    /// Uploads of the named files fail; everything else succeeds
    pub fn failing_media<I, S>(name: &str, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(MockConfig {
            name: name.to_string(),
            failing_media: files.into_iter().map(Into::into).collect(),
            ..Default::default()
        })
    }

    /// Every publish fails with `error`
    pub fn publish_failure(name: &str, error: PlatformError) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            publish_error: Some(error),
            ..Default::default()
        })
    }

    pub fn verify_call_count(&self) -> usize {
        self.recorded().verify_calls
    }

    /// File names passed to `upload_media`, in call order
    pub fn uploaded_files(&self) -> Vec<String> {
        self.recorded().uploads.clone()
    }

    pub fn upload_call_count(&self) -> usize {
        self.recorded().uploads.len()
    }

    /// Successful publishes, in call order
    pub fn published(&self) -> Vec<PublishedPost> {
        self.recorded().published.clone()
    }

    /// Publish calls, successful or not
    pub fn publish_call_count(&self) -> usize {
        self.recorded().attempted_publishes
    }

    fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        // A panicking test thread must not hide the recordings from the others
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn verify_credentials(&self) -> Result<String> {
        self.recorded().verify_calls += 1;

        match &self.config.auth_error {
            Some(error) => Err(error.clone().into()),
            None => Ok(self.config.username.clone()),
        }
    }

    async fn upload_media(&self, media: &MediaFile) -> Result<String> {
        let file_name = media.file_name();
        let call = {
            let mut recorded = self.recorded();
            recorded.uploads.push(file_name.clone());
            recorded.uploads.len()
        };

        if let Some(error) = &self.config.upload_error {
            return Err(error.clone().into());
        }
        if self.config.failing_media.contains(&file_name) {
            return Err(PlatformError::Processing(format!(
                "media {} failed processing: InvalidMedia",
                file_name
            ))
            .into());
        }

        Ok(format!("{}-media-{}", self.config.name, call))
    }

    async fn publish(&self, text: &str, media_ids: &[String]) -> Result<Option<String>> {
        let call = {
            let mut recorded = self.recorded();
            recorded.attempted_publishes += 1;
            recorded.attempted_publishes
        };

        if let Some(error) = &self.config.publish_error {
            return Err(error.clone().into());
        }

        self.recorded().published.push(PublishedPost {
            text: text.to_string(),
            media_ids: media_ids.to_vec(),
        });

        Ok(self
            .config
            .returns_post_id
            .then(|| format!("{}-post-{}", self.config.name, call)))
    }

    fn post_url(&self, id: &str) -> Option<String> {
        Some(format!("https://{}.invalid/status/{}", self.config.name, id))
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn character_limit(&self) -> Option<usize> {
        self.config.character_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutopostError;
    use crate::types::MediaKind;
    use std::path::PathBuf;

    fn media(name: &str) -> MediaFile {
        MediaFile {
            path: PathBuf::from("/media").join(name),
            kind: MediaKind::Jpeg,
        }
    }

    #[tokio::test]
    async fn test_mock_success_records_calls() {
        let platform = MockPlatform::success("test");
        let observer = platform.clone();

        assert_eq!(platform.verify_credentials().await.unwrap(), "mock_user");
        let id = platform.upload_media(&media("a.jpg")).await.unwrap();
        assert_eq!(id, "test-media-1");

        let post_id = platform.publish("Hello", &[id.clone()]).await.unwrap();
        assert_eq!(post_id.as_deref(), Some("test-post-1"));

        assert_eq!(observer.verify_call_count(), 1);
        assert_eq!(observer.uploaded_files(), vec!["a.jpg"]);
        assert_eq!(
            observer.published(),
            vec![PublishedPost {
                text: "Hello".to_string(),
                media_ids: vec![id],
            }]
        );
    }

    #[tokio::test]
    async fn test_mock_auth_failure() {
        let platform = MockPlatform::auth_failure("test", "Invalid credentials");

        let err = platform.verify_credentials().await.unwrap_err();
        assert!(err.is_authentication());
        assert!(err.to_string().contains("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_mock_failing_media_only() {
        let platform = MockPlatform::failing_media("test", ["bad.mp4"]);

        assert!(platform.upload_media(&media("good.jpg")).await.is_ok());
        let err = platform.upload_media(&media("bad.mp4")).await.unwrap_err();
        assert!(matches!(
            err,
            AutopostError::Platform(PlatformError::Processing(_))
        ));
        assert_eq!(platform.upload_call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_publish_failure_not_recorded_as_published() {
        let platform =
            MockPlatform::publish_failure("test", PlatformError::Posting("duplicate".to_string()));

        assert!(platform.publish("Hello", &[]).await.is_err());
        assert_eq!(platform.publish_call_count(), 1);
        assert!(platform.published().is_empty());
    }

    #[tokio::test]
    async fn test_mock_without_post_id() {
        let platform = MockPlatform::new(MockConfig {
            returns_post_id: false,
            ..Default::default()
        });
        assert_eq!(platform.publish("Hello", &[]).await.unwrap(), None);
        assert_eq!(platform.published().len(), 1);
    }

    #[test]
    fn test_mock_reports_configured_name_and_limit() {
        let platform = MockPlatform::new(MockConfig {
            name: "short".to_string(),
            character_limit: Some(100),
            ..Default::default()
        });

        assert_eq!(platform.name(), "short");
        assert_eq!(platform.character_limit(), Some(100));
        assert_eq!(
            platform.post_url("7").as_deref(),
            Some("https://short.invalid/status/7")
        );
    }
}
