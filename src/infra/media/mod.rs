//! Media host adapters.

mod cloudinary;
mod local;

pub use cloudinary::CloudinaryHost;
pub use local::LocalMediaHost;

use std::sync::Arc;

use crate::application::media::MediaHost;
use crate::config::{MediaProvider, MediaSettings};

use super::error::InfraError;

/// Builds the host selected by `media.provider`.
pub fn from_settings(settings: &MediaSettings) -> Result<Arc<dyn MediaHost>, InfraError> {
    match &settings.provider {
        MediaProvider::Local {
            directory,
            public_base_url,
        } => {
            let host = LocalMediaHost::new(directory.clone(), public_base_url.clone())?;
            Ok(Arc::new(host))
        }
        MediaProvider::Cloudinary(cloudinary) => {
            let host = CloudinaryHost::new(cloudinary.clone(), settings.request_timeout)?;
            Ok(Arc::new(host))
        }
    }
}
