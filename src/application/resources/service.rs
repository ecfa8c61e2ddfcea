use std::sync::Arc;

use futures::future::join_all;
use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::application::media::MediaHost;
use crate::application::repos::{ResourcesRepo, ResourcesWriteRepo};
use crate::cache::{CacheConfig, ResponseCache};
use crate::domain::resources::ResourceKind;

pub const METRIC_MEDIA_UPLOAD_FAILED: &str = "fortview_media_upload_failed_total";
pub const METRIC_MEDIA_DELETE_FAILED: &str = "fortview_media_delete_failed_total";

const DEFAULT_FOLDER_PREFIX: &str = "fortview";

/// Ordered-resource lifecycle shared by every kind.
#[derive(Clone)]
pub struct ResourceService {
    pub(crate) reader: Arc<dyn ResourcesRepo>,
    pub(crate) writer: Arc<dyn ResourcesWriteRepo>,
    pub(crate) media: Arc<dyn MediaHost>,
    pub(crate) cache: Option<Arc<ResponseCache>>,
    pub(crate) cache_config: CacheConfig,
    /// One lock per kind, held across read-max and insert when assigning `order`.
    pub(crate) order_locks: Arc<[Mutex<()>]>,
    pub(crate) folder_prefix: String,
}

impl ResourceService {
    pub fn new(
        reader: Arc<dyn ResourcesRepo>,
        writer: Arc<dyn ResourcesWriteRepo>,
        media: Arc<dyn MediaHost>,
    ) -> Self {
        Self {
            reader,
            writer,
            media,
            cache: None,
            cache_config: CacheConfig::default(),
            order_locks: ResourceKind::ALL.iter().map(|_| Mutex::new(())).collect(),
            folder_prefix: DEFAULT_FOLDER_PREFIX.to_string(),
        }
    }

    pub fn with_cache(self, cache: Arc<ResponseCache>, config: CacheConfig) -> Self {
        self.with_cache_opt(Some(cache), config)
    }

    /// Attach the response cache; `None` or a disabled config leaves reads uncached.
    pub fn with_cache_opt(mut self, cache: Option<Arc<ResponseCache>>, config: CacheConfig) -> Self {
        self.cache = cache.filter(|_| config.enabled);
        self.cache_config = config;
        self
    }

    pub fn with_folder_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.folder_prefix = prefix.into();
        self
    }

    pub(crate) fn folder(&self, kind: ResourceKind) -> String {
        let prefix = self.folder_prefix.trim_matches('/');
        if prefix.is_empty() {
            kind.media_folder().to_string()
        } else {
            format!("{prefix}/{}", kind.media_folder())
        }
    }

    pub(crate) fn order_lock(&self, kind: ResourceKind) -> &Mutex<()> {
        &self.order_locks[kind.index()]
    }

    pub(crate) fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.cache.as_ref()?.get_json(key)
    }

    pub(crate) fn remember<T: Serialize>(&self, kind: ResourceKind, key: String, value: &T) {
        if let Some(cache) = &self.cache {
            let ttl = self.cache_config.ttl_for(kind.cache_namespace());
            cache.set_json(key, value, ttl);
        }
    }

    /// Drops every cached list and detail entry of `kind`.
    pub(crate) fn invalidate(&self, kind: ResourceKind) {
        if let Some(cache) = &self.cache {
            let removed = cache.delete_pattern(&format!("{}:*", kind.cache_namespace()));
            debug!(
                target = "fortview::resources",
                kind = %kind,
                removed,
                "Invalidated cached responses"
            );
        }
    }

    /// Best-effort removal of external objects. Failures are logged and counted.
    pub(crate) async fn discard_media(&self, kind: ResourceKind, refs: &[String], op: &'static str) {
        if refs.is_empty() {
            return;
        }
        let results = join_all(refs.iter().map(|external_ref| self.media.delete(external_ref))).await;
        for (external_ref, result) in refs.iter().zip(results) {
            if let Err(err) = result {
                counter!(METRIC_MEDIA_DELETE_FAILED).increment(1);
                warn!(
                    target = "fortview::resources",
                    kind = %kind,
                    op,
                    external_ref = %external_ref,
                    error = %err,
                    "Failed to remove media; object left on host"
                );
            }
        }
    }
}
