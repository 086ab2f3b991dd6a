//! Platform abstraction
//!
//! The post cycle only talks to a [`Platform`]; the Twitter client is the
//! production implementation and [`mock::MockPlatform`] stands in for it in
//! tests.
//!
//! # Examples
//!
//! ```no_run
//! use libautopost::config::{Credentials, TwitterConfig};
//! use libautopost::platforms::{twitter::TwitterClient, Platform};
//!
//! # async fn example() -> libautopost::error::Result<()> {
//! let client = TwitterClient::new(&TwitterConfig::default(), Credentials::from_env()?)?;
//!
//! let username = client.verify_credentials().await?;
//! println!("Posting as @{}", username);
//!
//! if let Some(id) = client.publish("Hello from autopost", &[]).await? {
//!     println!("Posted: {:?}", client.post_url(&id));
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::types::MediaFile;

pub mod twitter;

// Mock platform is available for all builds (not just tests) to support integration tests
pub mod mock;

/// A destination posts are published to
#[async_trait]
pub trait Platform: Send + Sync {
    /// Check the credentials and return the account's username
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` when the service rejects the
    /// credentials.
    async fn verify_credentials(&self) -> Result<String>;

    /// Upload one media file and return the id to attach to a post
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Upload` or `PlatformError::Processing` when
    /// any step of the upload fails, and `MediaError::Read` when the file
    /// cannot be read.
    async fn upload_media(&self, media: &MediaFile) -> Result<String>;

    /// Publish `text` with the given media attached
    ///
    /// Returns the new post's id when the service reports one. A success
    /// response without an id still counts as published.
    async fn publish(&self, text: &str, media_ids: &[String]) -> Result<Option<String>>;

    /// Public link for a published post id, when the platform has one
    fn post_url(&self, _id: &str) -> Option<String> {
        None
    }

    /// Lowercase identifier (e.g. "twitter")
    fn name(&self) -> &str;

    /// Maximum characters per post, or `None` when there is no hard limit
    fn character_limit(&self) -> Option<usize>;
}
