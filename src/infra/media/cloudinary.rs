//! Cloudinary media host using signed upload and destroy calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, multipart};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::application::media::{MediaError, MediaHost, MediaUpload};
use crate::config::CloudinarySettings;
use crate::domain::entities::MediaRef;
use crate::infra::error::InfraError;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";
const SIGNATURE_ALGORITHM: &str = "sha256";
/// Destroy is scoped by resource type; gallery entries may be either.
const DESTROY_RESOURCE_TYPES: [&str; 2] = ["image", "video"];

pub struct CloudinaryHost {
    client: Client,
    settings: CloudinarySettings,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl CloudinaryHost {
    pub fn new(settings: CloudinarySettings, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fortview/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| InfraError::media(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            settings,
            api_base: API_BASE.to_string(),
        })
    }

    /// Points the client at another API root, e.g. a local stub.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, resource_type: &str, action: &str) -> String {
        format!(
            "{}/{}/{resource_type}/{action}",
            self.api_base, self.settings.cloud_name
        )
    }

    fn timestamp() -> String {
        OffsetDateTime::now_utc().unix_timestamp().to_string()
    }

    async fn destroy(&self, public_id: &str, resource_type: &str) -> Result<bool, MediaError> {
        let timestamp = Self::timestamp();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            &self.settings.api_secret,
        );
        let form = multipart::Form::new()
            .text("public_id", public_id.to_string())
            .text("timestamp", timestamp)
            .text("api_key", self.settings.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", SIGNATURE_ALGORITHM);

        let response = self
            .client
            .post(self.endpoint(resource_type, "destroy"))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;
        if !status.is_success() {
            return Err(rejected(status.as_u16(), &body));
        }

        let parsed: DestroyResponse = serde_json::from_slice(&body)
            .map_err(|err| MediaError::Transport(format!("unreadable destroy response: {err}")))?;
        match parsed.result.as_str() {
            "ok" => Ok(true),
            "not found" => Ok(false),
            other => Err(MediaError::Rejected {
                status: status.as_u16(),
                message: format!("destroy returned `{other}`"),
            }),
        }
    }
}

#[async_trait]
impl MediaHost for CloudinaryHost {
    async fn upload(&self, upload: &MediaUpload, folder: &str) -> Result<MediaRef, MediaError> {
        if upload.bytes.is_empty() {
            return Err(MediaError::EmptyPayload);
        }

        let timestamp = Self::timestamp();
        let signature = sign(
            &[("folder", folder), ("timestamp", timestamp.as_str())],
            &self.settings.api_secret,
        );

        let mut part =
            multipart::Part::bytes(upload.bytes.to_vec()).file_name(upload.file_name.clone());
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|err| MediaError::Transport(format!("invalid content type: {err}")))?;
        }
        let form = multipart::Form::new()
            .part("file", part)
            .text("folder", folder.to_string())
            .text("timestamp", timestamp)
            .text("api_key", self.settings.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", SIGNATURE_ALGORITHM);

        let response = self
            .client
            .post(self.endpoint("auto", "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;
        if !status.is_success() {
            return Err(rejected(status.as_u16(), &body));
        }

        let parsed: UploadResponse = serde_json::from_slice(&body)
            .map_err(|err| MediaError::Transport(format!("unreadable upload response: {err}")))?;
        debug!(
            target = "fortview::media",
            public_id = %parsed.public_id,
            folder,
            "uploaded media to cloudinary"
        );

        Ok(MediaRef {
            url: parsed.secure_url,
            external_ref: parsed.public_id,
        })
    }

    async fn delete(&self, external_ref: &str) -> Result<(), MediaError> {
        if external_ref.trim().is_empty() {
            return Err(MediaError::InvalidReference(external_ref.to_string()));
        }

        for resource_type in DESTROY_RESOURCE_TYPES {
            if self.destroy(external_ref, resource_type).await? {
                return Ok(());
            }
        }

        warn!(
            target = "fortview::media",
            public_id = external_ref,
            "cloudinary reported media as already gone"
        );
        Ok(())
    }
}

/// Hex SHA-256 over `k=v` pairs sorted by key and joined with `&`, followed by the secret.
fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let payload = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn transport(err: reqwest::Error) -> MediaError {
    MediaError::Transport(err.to_string())
}

fn rejected(status: u16, body: &[u8]) -> MediaError {
    let message = serde_json::from_slice::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());
    MediaError::Rejected { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_sorts_params_and_appends_secret() {
        let signature = sign(
            &[("timestamp", "1700000000"), ("folder", "fortview/events")],
            "secret",
        );

        let mut hasher = Sha256::new();
        hasher.update(b"folder=fortview/events&timestamp=1700000000secret");
        assert_eq!(signature, hex::encode(hasher.finalize()));
        assert_eq!(signature.len(), 64);
    }

    #[test]
    fn rejected_prefers_structured_error_message() {
        let err = rejected(400, br#"{"error":{"message":"Invalid Signature"}}"#);
        assert!(matches!(
            err,
            MediaError::Rejected { status: 400, ref message } if message == "Invalid Signature"
        ));

        let err = rejected(502, b"bad gateway");
        assert!(matches!(
            err,
            MediaError::Rejected { ref message, .. } if message == "bad gateway"
        ));
    }

    #[test]
    fn endpoint_uses_cloud_name_and_resource_type() {
        let host = CloudinaryHost::new(
            CloudinarySettings {
                cloud_name: "demo".into(),
                api_key: "key".into(),
                api_secret: "secret".into(),
            },
            Duration::from_secs(5),
        )
        .expect("client")
        .with_api_base("http://localhost:9999/");

        assert_eq!(
            host.endpoint("auto", "upload"),
            "http://localhost:9999/demo/auto/upload"
        );
    }
}
