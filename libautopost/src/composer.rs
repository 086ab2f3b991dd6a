//! Post composition
//!
//! A post is the queue text followed by a blank line and the mention block.
//! When that is over the platform's character limit, the text is cut to
//! [`MENTION_HEADROOM`] characters below the limit and marked with an
//! ellipsis. The mention block itself is never shortened, so a very long
//! block can still push the result past the limit; callers can detect that
//! through [`ComposedPost::exceeds_limit`].

use crate::types::{ComposedPost, POST_CHAR_LIMIT};

/// Characters kept free for the mention block when content is truncated
pub const MENTION_HEADROOM: usize = 20;

/// Render handles as `@a @b @c`
pub fn mention_block(mentions: &[String]) -> String {
    mentions
        .iter()
        .map(|handle| format!("@{}", handle))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compose for the default [`POST_CHAR_LIMIT`]
pub fn compose(content: &str, mentions: &[String]) -> ComposedPost {
    compose_with_limit(content, mentions, Some(POST_CHAR_LIMIT))
}

/// Compose for a platform limit; `None` never truncates
pub fn compose_with_limit(content: &str, mentions: &[String], limit: Option<usize>) -> ComposedPost {
    let tags = mention_block(mentions);
    let full = format!("{}\n\n{}", content, tags);

    let limit_value = match limit {
        Some(limit) if full.chars().count() > limit => limit,
        _ => {
            return ComposedPost {
                text: full,
                mentions: mentions.to_vec(),
                truncated: false,
                limit,
            };
        }
    };

    let head: String = content
        .chars()
        .take(limit_value.saturating_sub(MENTION_HEADROOM))
        .collect();
    let text = format!("{}...\n{}", head, tags);
    if text.chars().count() > limit_value {
        tracing::warn!(
            chars = text.chars().count(),
            mention_chars = tags.chars().count(),
            "Composed post is still over {} characters after truncation",
            limit_value
        );
    }

    ComposedPost {
        text,
        mentions: mentions.to_vec(),
        truncated: true,
        limit,
    }
}
