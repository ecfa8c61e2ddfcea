//! Contract with the external host that owns uploaded media.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::domain::entities::MediaRef;

/// One file received from a client, tagged with the media slot it belongs to.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub slot: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl MediaUpload {
    pub fn new(slot: impl Into<String>, file_name: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            slot: slot.into(),
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media host rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("media host unreachable: {0}")]
    Transport(String),
    #[error("media storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid media reference `{0}`")]
    InvalidReference(String),
    #[error("uploaded file is empty")]
    EmptyPayload,
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Creates a durable remote object under `folder`.
    async fn upload(&self, upload: &MediaUpload, folder: &str) -> Result<MediaRef, MediaError>;

    /// Removes a remote object. Deleting an object that is already gone succeeds.
    async fn delete(&self, external_ref: &str) -> Result<(), MediaError>;
}
