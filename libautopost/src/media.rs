//! Local media pool
//!
//! The pool is scanned once at startup. Files are ordered by name so that
//! `position mod len` picks the same file across restarts.

use std::path::{Path, PathBuf};

use crate::error::{MediaError, Result};
use crate::types::MediaFile;

#[derive(Debug, Clone)]
pub struct MediaPool {
    folder: PathBuf,
    files: Vec<MediaFile>,
}

impl MediaPool {
    /// Scan `folder` for eligible media, requiring at least `min_files`
    pub fn scan(folder: &Path, min_files: usize) -> Result<Self> {
        if !folder.is_dir() {
            return Err(MediaError::FolderMissing(folder.display().to_string()).into());
        }

        let entries = std::fs::read_dir(folder).map_err(|source| MediaError::Read {
            path: folder.display().to_string(),
            source,
        })?;

        let mut files: Vec<MediaFile> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| MediaError::Read {
                path: folder.display().to_string(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(file) = MediaFile::from_path(path) {
                files.push(file);
            }
        }
        files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

        if files.len() < min_files {
            return Err(MediaError::Insufficient {
                folder: folder.display().to_string(),
                found: files.len(),
                required: min_files,
            }
            .into());
        }

        tracing::debug!(
            "Found {} media file(s) in {}",
            files.len(),
            folder.display()
        );

        Ok(Self {
            folder: folder.to_path_buf(),
            files,
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn files(&self) -> &[MediaFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The file paired with the post at `position`
    pub fn select(&self, position: usize) -> &MediaFile {
        &self.files[position % self.files.len()]
    }
}

/// Create the media folder if needed; returns true when it had to be created
pub fn ensure_folder(folder: &Path) -> Result<bool> {
    if folder.is_dir() {
        return Ok(false);
    }
    std::fs::create_dir_all(folder).map_err(|source| MediaError::Read {
        path: folder.display().to_string(),
        source,
    })?;
    Ok(true)
}
