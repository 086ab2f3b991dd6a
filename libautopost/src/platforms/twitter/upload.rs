//! Chunked media upload
//!
//! The v1.1 upload endpoint takes media in four steps:
//!
//! 1. `INIT` declares size and type and returns a media id
//! 2. `APPEND` sends the bytes in fixed-size segments, indexed from 0
//! 3. `FINALIZE` closes the upload; video may come back still processing
//! 4. `STATUS` is polled until processing leaves `pending`/`in_progress`
//!
//! Each request is signed on its own. Any failed step abandons the upload;
//! nothing is retried here.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::ops::Range;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::oauth::OAuthSigner;
use super::{check_status, map_transport_error};
use crate::error::{MediaError, PlatformError, Result};
use crate::types::MediaFile;

/// Wait used when the service does not say how long to back off
pub const DEFAULT_CHECK_AFTER_SECS: u64 = 5;

/// Byte ranges of each APPEND segment; the last one may be short
pub fn segment_ranges(total_bytes: usize, chunk_size: usize) -> Vec<Range<usize>> {
    assert!(chunk_size > 0, "chunk size must be positive");
    (0..total_bytes)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(total_bytes))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Pending,
    InProgress,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl ProcessingState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingInfo {
    pub state: ProcessingState,
    #[serde(default)]
    pub check_after_secs: Option<u64>,
    #[serde(default)]
    pub progress_percent: Option<u8>,
    #[serde(default)]
    pub error: Option<ProcessingErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl std::fmt::Display for ProcessingErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.name.as_deref().unwrap_or("error");
        match (&self.message, self.code) {
            (Some(message), Some(code)) => write!(f, "{} ({}): {}", name, code, message),
            (Some(message), None) => write!(f, "{}: {}", name, message),
            (None, Some(code)) => write!(f, "{} ({})", name, code),
            (None, None) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InitResponse {
    media_id_string: String,
}

#[derive(Debug, Deserialize)]
struct ProcessingResponse {
    #[serde(default)]
    processing_info: Option<ProcessingInfo>,
}

/// Where an upload currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Init,
    Appending { segment: usize },
    Finalize,
    Processing,
    Finalized,
}

/// Transient state of one upload
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub media_id: String,
    pub total_bytes: usize,
    pub bytes_sent: usize,
    pub phase: UploadPhase,
    pub processing_state: Option<ProcessingState>,
}

impl UploadSession {
    /// Every byte was appended and the service accepted the media
    pub fn is_complete(&self) -> bool {
        self.phase == UploadPhase::Finalized && self.bytes_sent == self.total_bytes
    }
}

/// Runs the INIT / APPEND / FINALIZE / STATUS handshake
#[derive(Debug, Clone)]
pub struct MediaUploader {
    http: reqwest::Client,
    signer: OAuthSigner,
    upload_url: String,
    chunk_size: usize,
}

impl MediaUploader {
    pub fn new(
        http: reqwest::Client,
        signer: OAuthSigner,
        upload_url: impl Into<String>,
        chunk_size: usize,
    ) -> Self {
        Self {
            http,
            signer,
            upload_url: upload_url.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Upload a file and return the finished session
    ///
    /// On success the session is [`UploadPhase::Finalized`] and carries the
    /// last processing state reported for video.
    pub async fn upload(&self, media: &MediaFile) -> Result<UploadSession> {
        let bytes = tokio::fs::read(&media.path)
            .await
            .map_err(|source| MediaError::Read {
                path: media.path.display().to_string(),
                source,
            })?;

        let mut session = self.init(media, bytes.len()).await?;
        match self.transfer(&mut session, media, &bytes).await {
            Ok(()) => {
                session.phase = UploadPhase::Finalized;
                Ok(session)
            }
            Err(e) => {
                warn!(
                    media_id = %session.media_id,
                    phase = ?session.phase,
                    processing_state = ?session.processing_state,
                    bytes_sent = session.bytes_sent,
                    total_bytes = session.total_bytes,
                    "Upload abandoned: {}",
                    e
                );
                Err(e)
            }
        }
    }

    async fn transfer(
        &self,
        session: &mut UploadSession,
        media: &MediaFile,
        bytes: &[u8],
    ) -> Result<()> {
        for (segment, range) in segment_ranges(bytes.len(), self.chunk_size)
            .into_iter()
            .enumerate()
        {
            session.phase = UploadPhase::Appending { segment };
            self.append(session, media, segment, &bytes[range]).await?;
        }

        session.phase = UploadPhase::Finalize;
        let processing = self.finalize(session).await?;

        match processing {
            Some(info) if media.kind.is_video() => self.await_processing(session, info).await,
            _ => Ok(()),
        }
    }

    async fn init(&self, media: &MediaFile, total_bytes: usize) -> Result<UploadSession> {
        let total = total_bytes.to_string();
        let params = [
            ("command", "INIT"),
            ("total_bytes", total.as_str()),
            ("media_type", media.kind.mime_type()),
            ("media_category", media.kind.media_category()),
        ];
        let signed = self.signer.sign("POST", &self.upload_url, &params);

        let response = self
            .http
            .post(&self.upload_url)
            .header(reqwest::header::AUTHORIZATION, signed.authorization)
            .form(&params)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "media upload INIT"))?;
        let response = check_status(response, "media upload INIT", PlatformError::Upload).await?;

        let body: InitResponse = response.json().await.map_err(|e| {
            PlatformError::Upload(format!("media upload INIT returned an unreadable body: {}", e))
        })?;

        info!(
            media_id = %body.media_id_string,
            total_bytes,
            media_type = media.kind.mime_type(),
            "Media upload INIT successful"
        );

        Ok(UploadSession {
            media_id: body.media_id_string,
            total_bytes,
            bytes_sent: 0,
            phase: UploadPhase::Init,
            processing_state: None,
        })
    }

    async fn append(
        &self,
        session: &mut UploadSession,
        media: &MediaFile,
        segment: usize,
        chunk: &[u8],
    ) -> Result<()> {
        let context = format!("media upload APPEND segment {}", segment);

        // Multipart bodies are not part of the OAuth signature
        let signed = self.signer.sign("POST", &self.upload_url, &[]);

        let part = Part::bytes(chunk.to_vec())
            .file_name("media")
            .mime_str(media.kind.mime_type())
            .map_err(|e| PlatformError::Upload(format!("{}: {}", context, e)))?;
        let form = Form::new()
            .text("command", "APPEND")
            .text("media_id", session.media_id.clone())
            .text("segment_index", segment.to_string())
            .part("media", part);

        let response = self
            .http
            .post(&self.upload_url)
            .header(reqwest::header::AUTHORIZATION, signed.authorization)
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_transport_error(e, &context))?;
        check_status(response, &context, PlatformError::Upload).await?;

        session.bytes_sent += chunk.len();
        debug!(
            media_id = %session.media_id,
            segment,
            bytes_sent = session.bytes_sent,
            total_bytes = session.total_bytes,
            "Media upload APPEND successful"
        );
        Ok(())
    }

    async fn finalize(&self, session: &mut UploadSession) -> Result<Option<ProcessingInfo>> {
        let params = [("command", "FINALIZE"), ("media_id", session.media_id.as_str())];
        let signed = self.signer.sign("POST", &self.upload_url, &params);

        let response = self
            .http
            .post(&self.upload_url)
            .header(reqwest::header::AUTHORIZATION, signed.authorization)
            .form(&params)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "media upload FINALIZE"))?;
        let response =
            check_status(response, "media upload FINALIZE", PlatformError::Upload).await?;

        let body: ProcessingResponse = response.json().await.map_err(|e| {
            PlatformError::Upload(format!(
                "media upload FINALIZE returned an unreadable body: {}",
                e
            ))
        })?;

        info!(media_id = %session.media_id, "Media upload FINALIZE successful");
        session.processing_state = body.processing_info.as_ref().map(|p| p.state);
        Ok(body.processing_info)
    }

    async fn status(&self, session: &UploadSession) -> Result<Option<ProcessingInfo>> {
        let params = [("command", "STATUS"), ("media_id", session.media_id.as_str())];
        let signed = self.signer.sign("GET", &self.upload_url, &params);

        let response = self
            .http
            .get(&self.upload_url)
            .header(reqwest::header::AUTHORIZATION, signed.authorization)
            .query(&params)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "media upload STATUS"))?;
        let response =
            check_status(response, "media upload STATUS", PlatformError::Upload).await?;

        let body: ProcessingResponse = response.json().await.map_err(|e| {
            PlatformError::Upload(format!(
                "media upload STATUS returned an unreadable body: {}",
                e
            ))
        })?;
        Ok(body.processing_info)
    }

    /// Poll STATUS until the service is done with the media
    async fn await_processing(
        &self,
        session: &mut UploadSession,
        initial: ProcessingInfo,
    ) -> Result<()> {
        session.phase = UploadPhase::Processing;
        let mut info = initial;

        loop {
            session.processing_state = Some(info.state);
            match info.state {
                ProcessingState::Succeeded => {
                    info!(media_id = %session.media_id, "Video processing completed successfully");
                    return Ok(());
                }
                ProcessingState::Failed => {
                    let reason = info
                        .error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "no error details returned".to_string());
                    return Err(PlatformError::Processing(format!(
                        "media {} failed processing: {}",
                        session.media_id, reason
                    ))
                    .into());
                }
                ProcessingState::Unknown => {
                    warn!(
                        media_id = %session.media_id,
                        "Unrecognised processing state, treating media as ready"
                    );
                    return Ok(());
                }
                ProcessingState::Pending | ProcessingState::InProgress => {
                    let wait = info.check_after_secs.unwrap_or(DEFAULT_CHECK_AFTER_SECS);
                    info!(
                        media_id = %session.media_id,
                        progress = info.progress_percent.unwrap_or(0),
                        "Video processing in progress, checking again in {}s",
                        wait
                    );
                    tokio::time::sleep(Duration::from_secs(wait)).await;

                    match self.status(session).await? {
                        Some(next) => info = next,
                        None => return Ok(()),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_ranges_cover_file_exactly() {
        const MIB: usize = 1024 * 1024;
        for (size, chunk) in [
            (0usize, 4 * MIB),
            (1, 4 * MIB),
            (4 * MIB - 1, 4 * MIB),
            (4 * MIB, 4 * MIB),
            (4 * MIB + 1, 4 * MIB),
            (10 * MIB + 123, 4 * MIB),
            (17, 5),
        ] {
            let ranges = segment_ranges(size, chunk);

            let total: usize = ranges.iter().map(|r| r.len()).sum();
            assert_eq!(total, size, "size={}", size);
            assert_eq!(ranges.len(), size.div_ceil(chunk), "size={}", size);

            let mut expected_start = 0;
            for range in &ranges {
                assert_eq!(range.start, expected_start);
                assert!(range.len() <= chunk && !range.is_empty());
                expected_start = range.end;
            }
        }
    }

    #[test]
    fn test_processing_state_parsing() {
        let info: ProcessingInfo =
            serde_json::from_str(r#"{"state":"in_progress","check_after_secs":10,"progress_percent":8}"#)
                .unwrap();
        assert_eq!(info.state, ProcessingState::InProgress);
        assert_eq!(info.check_after_secs, Some(10));
        assert!(info.state.is_active());

        let info: ProcessingInfo = serde_json::from_str(
            r#"{"state":"failed","error":{"code":1,"name":"InvalidMedia","message":"Unsupported video format"}}"#,
        )
        .unwrap();
        assert_eq!(info.state, ProcessingState::Failed);
        assert_eq!(
            info.error.unwrap().to_string(),
            "InvalidMedia (1): Unsupported video format"
        );

        let info: ProcessingInfo = serde_json::from_str(r#"{"state":"queued"}"#).unwrap();
        assert_eq!(info.state, ProcessingState::Unknown);
        assert!(!info.state.is_active());
    }

    #[test]
    fn test_finalize_without_processing_info() {
        let body: ProcessingResponse =
            serde_json::from_str(r#"{"media_id_string":"710511363345354753","size":11065}"#).unwrap();
        assert!(body.processing_info.is_none());
    }
}
