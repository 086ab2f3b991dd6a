//! Autopost - scheduled posting with rotating media and mentions
//!
//! This library holds the pieces of the posting bot: the content queue, the
//! media pool, the mention rotation, post composition, the Twitter client
//! (OAuth 1.0a signing and chunked media upload) and the post cycle that ties
//! them together. The `autopost-send` binary schedules the cycles.

pub mod composer;
pub mod config;
pub mod content;
pub mod cycle;
pub mod error;
pub mod logging;
pub mod media;
pub mod mentions;
pub mod notify;
pub mod platforms;
pub mod schedule;
pub mod types;

// Re-export commonly used types
pub use config::{Config, Credentials};
pub use content::{ContentSource, ContentStore};
pub use cycle::{CycleOutcome, CycleStep, PostCycle};
pub use error::{AutopostError, Result};
pub use media::MediaPool;
pub use mentions::MentionRotator;
pub use notify::{NotificationSink, Reporter};
pub use platforms::Platform;
pub use schedule::{DailySchedule, TimeSlot};
pub use types::{ComposedPost, MediaFile, MediaKind};
