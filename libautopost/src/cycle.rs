//! The post cycle
//!
//! One cycle takes the post at the current position through the steps of
//! [`CycleStep`]. Which step runs next is decided by [`next_step`] alone:
//!
//! | step | succeeded | failed |
//! |---|---|---|
//! | Loading | Composing | end, [`CycleOutcome::Halted`] |
//! | Composing | Uploading | end, [`CycleOutcome::Halted`] |
//! | Uploading | Publishing | Advancing, then [`CycleOutcome::Skipped`] |
//! | Publishing | Advancing | Advancing, then [`CycleOutcome::Skipped`] |
//! | Advancing | end | end |
//!
//! The position only ever grows. Content and media are picked with
//! `position mod len` and the mention window keeps rotating across passes.
//! The queue is re-read at the start of every pass through it, that is
//! whenever `position mod len == 0`. The position lives only as long as
//! the process, so a restart starts again from the top of the queue.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

use crate::composer::compose_with_limit;
use crate::content::ContentStore;
use crate::error::AutopostError;
use crate::media::MediaPool;
use crate::mentions::MentionRotator;
use crate::notify::Reporter;
use crate::platforms::Platform;
use crate::schedule::{DailySchedule, TimeSlot};
use crate::types::{ComposedPost, MediaFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    Loading,
    Composing,
    Uploading,
    Publishing,
    Advancing,
}

impl fmt::Display for CycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleStep::Loading => "loading",
            CycleStep::Composing => "composing",
            CycleStep::Uploading => "uploading",
            CycleStep::Publishing => "publishing",
            CycleStep::Advancing => "advancing",
        };
        write!(f, "{}", name)
    }
}

/// The step after `step`; `None` ends the cycle
pub fn next_step(step: CycleStep, succeeded: bool) -> Option<CycleStep> {
    use CycleStep::*;

    match (step, succeeded) {
        (Loading, true) => Some(Composing),
        (Composing, true) => Some(Uploading),
        (Uploading, true) => Some(Publishing),
        (Publishing, true) => Some(Advancing),
        (Uploading | Publishing, false) => Some(Advancing),
        (Loading | Composing, false) => None,
        (Advancing, _) => None,
    }
}

/// How a single cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The post went out; `position` is the one that was published
    Published {
        position: usize,
        post_id: Option<String>,
        url: Option<String>,
    },
    /// A remote step failed; the item was dropped and the position advanced
    Skipped {
        position: usize,
        step: CycleStep,
        reason: String,
    },
    /// Nothing could be posted; the position is unchanged
    Halted { step: CycleStep, reason: String },
}

impl CycleOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, CycleOutcome::Published { .. })
    }
}

/// Everything selected for the post at one position
#[derive(Debug, Clone)]
struct Draft {
    position: usize,
    post: ComposedPost,
    media: MediaFile,
}

/// What the steps of one cycle have produced so far
#[derive(Debug, Default)]
struct CycleState {
    draft: Option<Draft>,
    media_id: Option<String>,
    post_id: Option<String>,
    url: Option<String>,
    failure: Option<(CycleStep, String)>,
}

/// Mutable posting context: queue, cursor and collaborators
pub struct PostCycle {
    content: ContentStore,
    media: MediaPool,
    mentions: MentionRotator,
    platform: Box<dyn Platform>,
    reporter: Reporter,
    position: usize,
}

impl PostCycle {
    pub fn new(
        content: ContentStore,
        media: MediaPool,
        mentions: MentionRotator,
        platform: Box<dyn Platform>,
        reporter: Reporter,
    ) -> Self {
        Self {
            content,
            media,
            mentions,
            platform,
            reporter,
            position: 0,
        }
    }

    /// Start from `position` instead of the top of the queue
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = position;
        self
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    /// One daemon poll: run a cycle for every slot due at `now`, in time order
    ///
    /// Once `shutdown` is set no further cycle starts; the remaining due
    /// slots are dropped, not deferred.
    pub async fn run_due(
        &mut self,
        schedule: &mut DailySchedule,
        now: DateTime<Utc>,
        shutdown: &AtomicBool,
    ) -> Vec<(TimeSlot, CycleOutcome)> {
        let mut outcomes = Vec::new();
        for slot in schedule.take_due(now) {
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("Shutdown requested, not starting the post for {} UTC", slot);
                break;
            }
            tracing::info!("Running post scheduled for {} UTC", slot);
            let outcome = self.run().await;
            outcomes.push((slot, outcome));
        }
        outcomes
    }

    /// Run one cycle to completion
    pub async fn run(&mut self) -> CycleOutcome {
        let position = self.position;
        let mut state = CycleState::default();
        let mut step = Some(CycleStep::Loading);

        while let Some(current) = step {
            let succeeded = match self.execute(current, &mut state).await {
                Ok(()) => true,
                Err(reason) => {
                    state.failure = Some((current, reason));
                    false
                }
            };
            step = next_step(current, succeeded);
        }

        match state.failure {
            // Failures that never reach Advancing leave the position alone
            Some((step, reason)) if next_step(step, false).is_none() => {
                CycleOutcome::Halted { step, reason }
            }
            Some((step, reason)) => CycleOutcome::Skipped {
                position,
                step,
                reason,
            },
            None => CycleOutcome::Published {
                position,
                post_id: state.post_id,
                url: state.url,
            },
        }
    }

    async fn execute(&mut self, step: CycleStep, state: &mut CycleState) -> Result<(), String> {
        match step {
            CycleStep::Loading => self.load_if_needed().await,
            CycleStep::Composing => {
                let draft = self
                    .draft()
                    .ok_or_else(|| format!("No post available at position {}", self.position))?;
                let total = self.content.len();
                self.reporter
                    .info(format!(
                        "Preparing to post {}/{} with {}",
                        display_index(draft.position, total),
                        total,
                        draft.media.file_name()
                    ))
                    .await;
                state.draft = Some(draft);
                Ok(())
            }
            CycleStep::Uploading => {
                let draft = state.draft.as_ref().ok_or_else(missing_draft)?;
                match self.platform.upload_media(&draft.media).await {
                    Ok(id) => {
                        self.reporter
                            .info(format!(
                                "Media uploaded to {} (id {})",
                                self.platform.name(),
                                id
                            ))
                            .await;
                        state.media_id = Some(id);
                        Ok(())
                    }
                    Err(e) => Err(self.report_failure(step, draft, e).await),
                }
            }
            CycleStep::Publishing => {
                let draft = state.draft.as_ref().ok_or_else(missing_draft)?;
                let media_ids: Vec<String> = state.media_id.iter().cloned().collect();
                match self.platform.publish(&draft.post.text, &media_ids).await {
                    Ok(post_id) => {
                        let url = post_id.as_deref().and_then(|id| self.platform.post_url(id));
                        self.report_published(draft, post_id.as_deref(), url.as_deref())
                            .await;
                        state.post_id = post_id;
                        state.url = url;
                        Ok(())
                    }
                    Err(e) => Err(self.report_failure(step, draft, e).await),
                }
            }
            CycleStep::Advancing => {
                self.advance().await;
                Ok(())
            }
        }
    }

    /// Re-read the queue at the start of each pass
    async fn load_if_needed(&mut self) -> Result<(), String> {
        let len = self.content.len();
        if len > 0 && self.position % len != 0 {
            return Ok(());
        }

        match self.content.load() {
            Ok(0) => {
                let reason = format!(
                    "No posts found in {}. Nothing to publish",
                    self.content.describe()
                );
                self.reporter.warn(&reason).await;
                Err(reason)
            }
            Ok(count) => {
                self.reporter
                    .info(format!("Loaded {} post(s) from {}", count, self.content.describe()))
                    .await;
                Ok(())
            }
            Err(e) => {
                let reason = format!("Could not load posts: {}", e);
                self.reporter.error(&reason).await;
                Err(reason)
            }
        }
    }

    fn draft(&self) -> Option<Draft> {
        let position = self.position;
        let text = self.content.get(position)?;
        let mentions = self.mentions.window(position);

        Some(Draft {
            position,
            post: compose_with_limit(text, &mentions, self.platform.character_limit()),
            media: self.media.select(position).clone(),
        })
    }

    async fn report_published(&self, draft: &Draft, post_id: Option<&str>, url: Option<&str>) {
        let Some(id) = post_id else {
            self.reporter
                .warn("Post published but the response carried no post id")
                .await;
            return;
        };

        let total = self.content.len();
        self.reporter
            .info(format!(
                "Post {}/{} published on {}: {}",
                display_index(draft.position, total),
                total,
                self.platform.name(),
                draft.post.text
            ))
            .await;
        self.reporter
            .info(format!("Link: {}", url.unwrap_or(id)))
            .await;
    }

    /// Report a failed remote step and return the reason
    async fn report_failure(&self, step: CycleStep, draft: &Draft, error: AutopostError) -> String {
        let reason = error.to_string();
        let message = match step {
            CycleStep::Uploading => format!(
                "Failed to upload {} to {}: {}. Skipping this post",
                draft.media.file_name(),
                self.platform.name(),
                reason
            ),
            _ => format!(
                "Failed to publish post to {}: {}. Skipping to the next one",
                self.platform.name(),
                reason
            ),
        };
        self.reporter.error(message).await;

        if error.is_authentication() {
            self.diagnose_credentials().await;
        }
        reason
    }

    /// Distinguish bad keys from rejected content after an auth failure
    async fn diagnose_credentials(&self) {
        self.reporter
            .info(format!(
                "Checking whether the {} credentials are still valid...",
                self.platform.name()
            ))
            .await;

        match self.platform.verify_credentials().await {
            Ok(username) => {
                self.reporter
                    .warn(format!(
                        "Credentials are valid (authenticated as @{}). \
                         The rejection points at missing write permission, duplicate content \
                         or account restrictions",
                        username
                    ))
                    .await;
            }
            Err(e) => {
                self.reporter
                    .error(format!(
                        "Credential check failed: {}. The API keys or access tokens are \
                         likely invalid or expired",
                        e
                    ))
                    .await;
            }
        }
    }

    async fn advance(&mut self) {
        self.position += 1;
        let len = self.content.len();
        if len > 0 && self.position % len == 0 {
            self.reporter
                .info("Reached the end of the post list. It will be reloaded before the next post")
                .await;
        }
    }
}

fn missing_draft() -> String {
    "no post was composed for this cycle".to_string()
}

/// 1-based index within the queue, for messages
fn display_index(position: usize, total: usize) -> usize {
    if total == 0 {
        return position + 1;
    }
    position % total + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_index_wraps() {
        assert_eq!(display_index(0, 2), 1);
        assert_eq!(display_index(1, 2), 2);
        assert_eq!(display_index(2, 2), 1);
        assert_eq!(display_index(5, 0), 6);
    }

    #[test]
    fn test_successful_steps_run_in_order() {
        let mut order = vec![CycleStep::Loading];
        let mut step = CycleStep::Loading;
        while let Some(next) = next_step(step, true) {
            order.push(next);
            step = next;
        }

        assert_eq!(
            order,
            vec![
                CycleStep::Loading,
                CycleStep::Composing,
                CycleStep::Uploading,
                CycleStep::Publishing,
                CycleStep::Advancing,
            ]
        );
    }

    #[test]
    fn test_remote_failures_still_advance() {
        assert_eq!(next_step(CycleStep::Uploading, false), Some(CycleStep::Advancing));
        assert_eq!(next_step(CycleStep::Publishing, false), Some(CycleStep::Advancing));
        assert_eq!(next_step(CycleStep::Advancing, false), None);
    }

    #[test]
    fn test_local_failures_end_the_cycle() {
        assert_eq!(next_step(CycleStep::Loading, false), None);
        assert_eq!(next_step(CycleStep::Composing, false), None);
    }

    #[test]
    fn test_outcome_is_published() {
        assert!(CycleOutcome::Published {
            position: 0,
            post_id: None,
            url: None
        }
        .is_published());
        assert!(!CycleOutcome::Halted {
            step: CycleStep::Loading,
            reason: "empty".to_string()
        }
        .is_published());
    }

    #[test]
    fn test_step_display() {
        assert_eq!(CycleStep::Uploading.to_string(), "uploading");
        assert_eq!(CycleStep::Publishing.to_string(), "publishing");
        assert_eq!(CycleStep::Advancing.to_string(), "advancing");
    }
}
