//! Request body decoding for resource writes.
//!
//! Admin clients send `multipart/form-data` when files are attached and may send a
//! flat JSON object otherwise. Both collapse into the same [`RawFields`] plus uploads.

use axum::Json;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header;
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::application::media::MediaUpload;
use crate::domain::raw_fields::RawFields;

use super::error::ApiError;

#[derive(Debug, Default)]
pub struct FormPayload {
    pub fields: RawFields,
    pub uploads: Vec<MediaUpload>,
}

impl<S> FromRequest<S> for FormPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state).await.map_err(|err| {
                ApiError::bad_request("invalid multipart payload").with_hint(err.body_text())
            })?;
            return collect_multipart(multipart).await;
        }

        if content_type.starts_with("application/json") {
            let Json(object) = Json::<Map<String, Value>>::from_request(req, state)
                .await
                .map_err(|err| {
                    ApiError::bad_request("invalid JSON payload").with_hint(err.body_text())
                })?;
            return Ok(FormPayload {
                fields: fields_from_json(object),
                uploads: Vec::new(),
            });
        }

        Err(ApiError::bad_request(
            "expected multipart/form-data or application/json",
        ))
    }
}

async fn collect_multipart(mut multipart: Multipart) -> Result<FormPayload, ApiError> {
    let mut payload = FormPayload::default();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        ApiError::bad_request("invalid multipart payload").with_hint(err.body_text())
    })? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field.content_type().map(str::to_string);
            let bytes: Bytes = field.bytes().await.map_err(|err| {
                ApiError::bad_request("failed to read upload").with_hint(err.body_text())
            })?;
            // Browsers submit untouched file inputs as an empty, unnamed part.
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            let mut upload = MediaUpload::new(slot_name(&name), file_name, bytes);
            if let Some(content_type) = content_type {
                upload = upload.with_content_type(content_type);
            }
            payload.uploads.push(upload);
        } else {
            let text = field.text().await.map_err(|err| {
                ApiError::bad_request("failed to read form field").with_hint(err.body_text())
            })?;
            payload.fields.push(name, text);
        }
    }

    Ok(payload)
}

/// `images[]` and `images[3]` both name the `images` slot.
fn slot_name(name: &str) -> String {
    match name.find('[') {
        Some(index) if name.ends_with(']') => name[..index].to_string(),
        _ => name.to_string(),
    }
}

fn fields_from_json(object: Map<String, Value>) -> RawFields {
    let mut fields = RawFields::new();
    for (name, value) in object {
        let text = match value {
            Value::String(text) => text,
            other => other.to_string(),
        };
        fields.push(name, text);
    }
    fields
}
