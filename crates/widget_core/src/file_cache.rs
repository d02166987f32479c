//! Attachment staging: a file picked by the user is validated, read and
//! base64 encoded up front, then held until submission.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    form::{FieldId, FormState},
    MAX_ATTACHMENT_BYTES,
};

pub const OVERSIZE_MESSAGE: &str = "File size must not exceed 10MB.";
pub const READ_FAILED_MESSAGE: &str = "Failed to read file.";

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// A file handle as delivered by a file input.
#[async_trait]
pub trait SelectedFile: Send + Sync {
    fn name(&self) -> &str;
    /// Size as reported by the handle, checked before any read.
    fn size(&self) -> u64;
    fn mime_type(&self) -> Option<String> {
        mime_guess::from_path(self.name())
            .first()
            .map(|mime| mime.essence_str().to_string())
    }
    async fn read_all(&self) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    name: String,
    size: u64,
}

impl LocalFile {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path)
            .await
            .with_context(|| format!("failed to stat '{}'", path.display()))?;
        if !metadata.is_file() {
            return Err(anyhow!("'{}' is not a regular file", path.display()));
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("'{}' has no file name", path.display()))?;
        Ok(Self {
            path,
            name,
            size: metadata.len(),
        })
    }
}

#[async_trait]
impl SelectedFile for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn read_all(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read '{}'", self.path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct MemoryFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
impl SelectedFile for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    async fn read_all(&self) -> Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// A staged file: handle metadata and encoded payload travel together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAttachment {
    pub filename: String,
    pub size_bytes: u64,
    pub mime_type: Option<String>,
    pub payload_b64: String,
}

#[derive(Debug, Error)]
pub enum FileCacheError {
    #[error("file '{filename}' is {size_bytes} bytes, limit is {limit} bytes")]
    TooLarge {
        filename: String,
        size_bytes: u64,
        limit: u64,
    },
    #[error("failed to read '{filename}': {source}")]
    Read {
        filename: String,
        source: anyhow::Error,
    },
}

#[derive(Debug)]
pub enum FileSelection {
    Cleared,
    Cached { filename: String, size_bytes: u64 },
    Rejected(FileCacheError),
}

#[derive(Debug, Default)]
pub struct FileCache {
    slot: Option<CachedAttachment>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attachment(&self) -> Option<&CachedAttachment> {
        self.slot.as_ref()
    }

    /// True when a file is staged with a non-empty payload.
    pub fn is_ready(&self) -> bool {
        self.slot
            .as_ref()
            .is_some_and(|attachment| !attachment.payload_b64.is_empty())
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// Handles a change of the attachment input. All inline errors are
    /// cleared first; problems with the new file are reported on the
    /// attachment field and returned, never propagated.
    pub async fn on_file_selected(
        &mut self,
        selection: Option<&dyn SelectedFile>,
        form: &mut FormState,
        min_display: Duration,
    ) -> FileSelection {
        form.clear_errors();

        let Some(file) = selection else {
            debug!("attachment selection cleared");
            self.clear();
            form.clear_attachment_input();
            return FileSelection::Cleared;
        };

        form.set_attachment_input(Some(file.name().to_string()));
        form.show_progress();

        let size_bytes = file.size();
        if size_bytes > MAX_ATTACHMENT_BYTES {
            warn!(
                filename = file.name(),
                size_bytes,
                limit = MAX_ATTACHMENT_BYTES,
                "attachment rejected: too large"
            );
            self.clear();
            form.show_error(FieldId::Attachment, OVERSIZE_MESSAGE);
            form.clear_attachment_input();
            form.hide_progress();
            return FileSelection::Rejected(FileCacheError::TooLarge {
                filename: file.name().to_string(),
                size_bytes,
                limit: MAX_ATTACHMENT_BYTES,
            });
        }

        let bytes = match file.read_all().await {
            Ok(bytes) => bytes,
            Err(source) => {
                error!(filename = file.name(), "error caching file: {source:#}");
                self.clear();
                form.hide_progress();
                form.show_error(FieldId::Attachment, READ_FAILED_MESSAGE);
                return FileSelection::Rejected(FileCacheError::Read {
                    filename: file.name().to_string(),
                    source,
                });
            }
        };

        let mime_type = file.mime_type();
        let data_url = encode_data_url(mime_type.as_deref(), &bytes);
        let payload_b64 = data_url_payload(&data_url).to_string();

        self.slot = Some(CachedAttachment {
            filename: file.name().to_string(),
            size_bytes,
            mime_type,
            payload_b64,
        });
        info!(filename = file.name(), size_bytes, "attachment staged");

        tokio::time::sleep(min_display).await;
        form.hide_progress();

        FileSelection::Cached {
            filename: file.name().to_string(),
            size_bytes,
        }
    }
}

pub fn encode_data_url(mime_type: Option<&str>, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type.unwrap_or(FALLBACK_MIME_TYPE),
        STANDARD.encode(bytes)
    )
}

/// Payload segment after the first comma; the descriptor prefix is dropped.
pub fn data_url_payload(data_url: &str) -> &str {
    data_url
        .split_once(',')
        .map(|(_, payload)| payload)
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "tests/file_cache_tests.rs"]
mod tests;
