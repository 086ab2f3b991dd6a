//! Core types for Autopost

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Hard limit on post length, counted in characters
pub const POST_CHAR_LIMIT: usize = 280;

// ============================================================================
// Media Types
// ============================================================================

/// Media formats the bot will pick up from the media folder
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaKind {
    Jpeg,
    Png,
    Mp4,
    Mov,
}

impl MediaKind {
    /// Detect the kind from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "mp4" => Some(Self::Mp4),
            "mov" => Some(Self::Mov),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// MIME type declared to the upload endpoint
    ///
    /// QuickTime files are declared as MP4; the endpoint accepts both.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Mp4 | Self::Mov => "video/mp4",
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Mp4 | Self::Mov)
    }

    /// Upload category; video needs `tweet_video` to get async processing
    pub fn media_category(&self) -> &'static str {
        if self.is_video() {
            "tweet_video"
        } else {
            "tweet_image"
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mime_type())
    }
}

/// A media file selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl MediaFile {
    /// Returns `None` when the extension is not an eligible media type
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let kind = MediaKind::from_path(&path)?;
        Some(Self { path, kind })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

// ============================================================================
// Post Types
// ============================================================================

/// The text that will be published for one queue item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPost {
    pub text: String,
    /// Handles (without '@') appended to the text
    pub mentions: Vec<String>,
    /// Whether the content had to be cut to fit
    pub truncated: bool,
    /// Character limit the post was composed for; `None` when unlimited
    pub limit: Option<usize>,
}

impl ComposedPost {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// True when the final text is still longer than the platform allows
    pub fn exceeds_limit(&self) -> bool {
        self.limit.is_some_and(|limit| self.char_count() > limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_extension() {
        assert_eq!(MediaKind::from_extension("jpg"), Some(MediaKind::Jpeg));
        assert_eq!(MediaKind::from_extension("JPEG"), Some(MediaKind::Jpeg));
        assert_eq!(MediaKind::from_extension("png"), Some(MediaKind::Png));
        assert_eq!(MediaKind::from_extension("Mp4"), Some(MediaKind::Mp4));
        assert_eq!(MediaKind::from_extension("mov"), Some(MediaKind::Mov));
        assert_eq!(MediaKind::from_extension("gif"), None);
        assert_eq!(MediaKind::from_extension("txt"), None);
    }

    #[test]
    fn test_media_kind_classification() {
        assert_eq!(MediaKind::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(MediaKind::Png.mime_type(), "image/png");
        assert_eq!(MediaKind::Mp4.mime_type(), "video/mp4");
        assert_eq!(MediaKind::Mov.mime_type(), "video/mp4");

        assert!(!MediaKind::Png.is_video());
        assert!(MediaKind::Mov.is_video());
        assert_eq!(MediaKind::Jpeg.media_category(), "tweet_image");
        assert_eq!(MediaKind::Mp4.media_category(), "tweet_video");
    }

    #[test]
    fn test_media_file_from_path() {
        let file = MediaFile::from_path("media/clip.MOV").unwrap();
        assert_eq!(file.kind, MediaKind::Mov);
        assert_eq!(file.file_name(), "clip.MOV");

        assert!(MediaFile::from_path("media/notes.txt").is_none());
        assert!(MediaFile::from_path("media/no_extension").is_none());
    }

    #[test]
    fn test_composed_post_limit() {
        let post = ComposedPost {
            text: "é".repeat(280),
            mentions: vec![],
            truncated: false,
            limit: Some(POST_CHAR_LIMIT),
        };
        assert_eq!(post.char_count(), 280);
        assert!(!post.exceeds_limit());

        let post = ComposedPost {
            text: "x".repeat(281),
            mentions: vec![],
            truncated: true,
            limit: Some(POST_CHAR_LIMIT),
        };
        assert!(post.exceeds_limit());

        let unlimited = ComposedPost {
            limit: None,
            ..post
        };
        assert!(!unlimited.exceeds_limit());
    }
}
