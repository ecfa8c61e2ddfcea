//! Filesystem-backed media host for development and single-node deployments.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use slug::slugify;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

use crate::application::media::{MediaError, MediaHost, MediaUpload};
use crate::domain::entities::MediaRef;

#[derive(Debug)]
pub struct LocalMediaHost {
    root: PathBuf,
    public_base_url: String,
}

impl LocalMediaHost {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf, public_base_url: impl Into<String>) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, external_ref: &str) -> Result<PathBuf, MediaError> {
        let relative = Path::new(external_ref);
        if external_ref.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(MediaError::InvalidReference(external_ref.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaHost for LocalMediaHost {
    async fn upload(&self, upload: &MediaUpload, folder: &str) -> Result<MediaRef, MediaError> {
        if upload.bytes.is_empty() {
            return Err(MediaError::EmptyPayload);
        }

        let folder = folder.trim_matches('/');
        let external_ref = format!(
            "{folder}/{}-{}",
            Uuid::new_v4(),
            sanitize_filename(&upload.file_name)
        );
        let absolute = self.resolve(&external_ref)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        if let Err(err) = file.write_all(&upload.bytes).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(err.into());
        }
        file.flush().await?;

        debug!(
            target = "fortview::media",
            external_ref = %external_ref,
            size = upload.bytes.len(),
            "stored media file"
        );

        Ok(MediaRef {
            url: format!("{}/{external_ref}", self.public_base_url),
            external_ref,
        })
    }

    async fn delete(&self, external_ref: &str) -> Result<(), MediaError> {
        let absolute = self.resolve(external_ref)?;
        match fs::remove_file(&absolute).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(MediaError::Io(err)),
        }
    }
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("upload");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "upload".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}
