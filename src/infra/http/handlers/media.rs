//! Static serving for files kept by the local media host.

use std::path::{Component, Path as FsPath, PathBuf};

use axum::extract::{Extension, Path};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::infra::http::error::ApiError;

/// Root directory the local media host writes into.
#[derive(Debug, Clone)]
pub struct MediaRoot(pub PathBuf);

pub async fn serve_media(
    Extension(MediaRoot(root)): Extension<MediaRoot>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let relative = FsPath::new(&path);
    let safe = !path.is_empty()
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if !safe {
        return Err(ApiError::not_found("Media not found"));
    }

    let full = root.join(relative);
    let bytes = match tokio::fs::read(&full).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("Media not found"));
        }
        Err(err) => {
            warn!(
                target = "fortview::http::media",
                path = %full.display(),
                error = %err,
                "Failed to read media file"
            );
            return Err(ApiError::internal("infra::http::media", &err));
        }
    };

    let mime = mime_guess::from_path(&full).first_or_octet_stream();
    let mut response = bytes.into_response();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400"),
    );
    Ok(response)
}
