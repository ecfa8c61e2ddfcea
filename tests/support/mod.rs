#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use fortview::application::contact::ContactService;
use fortview::application::media::{MediaError, MediaHost, MediaUpload};
use fortview::application::pagination::PageRequest;
use fortview::application::repos::{
    ContactsRepo, ContactsWriteRepo, CreateResourceParams, RepoError, ResourceQueryFilter,
    ResourcesRepo, ResourcesWriteRepo, UpdateResourceParams,
};
use fortview::application::resources::ResourceService;
use fortview::cache::{CacheConfig, ManualClock, ResponseCache};
use fortview::domain::contact::NewInquiry;
use fortview::domain::entities::{
    ContactRecord, GroupCount, MediaRef, ResourceRecord, ResourceStats,
};
use fortview::domain::resources::ResourceKind;
use fortview::infra::error::InfraError;
use fortview::infra::http::{AdminTokens, ApiRateLimiter, HealthCheck, HttpState};

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Resource store backed by a map, with switches to fail the next write.
#[derive(Default)]
pub struct MemoryResources {
    records: Mutex<HashMap<Uuid, ResourceRecord>>,
    pub fail_next_insert: AtomicBool,
    pub fail_next_update: AtomicBool,
    pub list_calls: AtomicUsize,
}

impl MemoryResources {
    pub async fn snapshot(&self, id: Uuid) -> Option<ResourceRecord> {
        self.records.lock().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    fn matching(
        records: &HashMap<Uuid, ResourceRecord>,
        kind: ResourceKind,
        filter: &ResourceQueryFilter,
    ) -> Vec<ResourceRecord> {
        let schema = kind.schema();
        let mut items: Vec<ResourceRecord> = records
            .values()
            .filter(|record| record.kind == kind && filter.matches(record))
            .cloned()
            .collect();
        items.sort_by(|a, b| schema.compare(a, b));
        items
    }
}

#[async_trait]
impl ResourcesRepo for MemoryResources {
    async fn list_resources(
        &self,
        kind: ResourceKind,
        filter: &ResourceQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<ResourceRecord>, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().await;
        Ok(Self::matching(&records, kind, filter)
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn count_resources(
        &self,
        kind: ResourceKind,
        filter: &ResourceQueryFilter,
    ) -> Result<u64, RepoError> {
        let records = self.records.lock().await;
        Ok(Self::matching(&records, kind, filter).len() as u64)
    }

    async fn list_all(&self, kind: ResourceKind) -> Result<Vec<ResourceRecord>, RepoError> {
        let records = self.records.lock().await;
        Ok(Self::matching(
            &records,
            kind,
            &ResourceQueryFilter::default(),
        ))
    }

    async fn find_by_id(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<Option<ResourceRecord>, RepoError> {
        let records = self.records.lock().await;
        Ok(records.get(&id).filter(|record| record.kind == kind).cloned())
    }

    async fn max_order(&self, kind: ResourceKind) -> Result<Option<i32>, RepoError> {
        let records = self.records.lock().await;
        Ok(records
            .values()
            .filter(|record| record.kind == kind)
            .map(|record| record.order)
            .max())
    }

    async fn resource_stats(
        &self,
        kind: ResourceKind,
        group_by: &[&'static str],
    ) -> Result<ResourceStats, RepoError> {
        let records = self.records.lock().await;
        let of_kind: Vec<&ResourceRecord> =
            records.values().filter(|record| record.kind == kind).collect();

        let mut stats = ResourceStats {
            total: of_kind.len() as u64,
            active: of_kind.iter().filter(|record| record.is_active).count() as u64,
            ..ResourceStats::default()
        };
        stats.inactive = stats.total - stats.active;

        for &field in group_by {
            let mut counts: BTreeMap<Option<String>, u64> = BTreeMap::new();
            for record in &of_kind {
                let value = record.fields.get(field).and_then(|value| match value {
                    Value::Null => None,
                    Value::String(text) => Some(text.clone()),
                    other => Some(other.to_string()),
                });
                *counts.entry(value).or_default() += 1;
            }
            let mut buckets: Vec<GroupCount> = counts
                .into_iter()
                .map(|(value, count)| GroupCount { value, count })
                .collect();
            GroupCount::sort(&mut buckets);
            stats.groups.insert(field.to_string(), buckets);
        }
        Ok(stats)
    }
}

#[async_trait]
impl ResourcesWriteRepo for MemoryResources {
    async fn create_resource(
        &self,
        params: CreateResourceParams,
    ) -> Result<ResourceRecord, RepoError> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(RepoError::from_persistence("insert rejected"));
        }

        // Distinct timestamps keep created_at ordering deterministic.
        tokio::time::sleep(Duration::from_millis(2)).await;
        let now = OffsetDateTime::now_utc();
        let record = ResourceRecord {
            id: Uuid::new_v4(),
            kind: params.kind,
            fields: params.fields,
            media: params.media,
            is_active: params.is_active,
            order: params.order,
            created_at: now,
            updated_at: now,
        };
        self.records.lock().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_resource(
        &self,
        params: UpdateResourceParams,
    ) -> Result<ResourceRecord, RepoError> {
        if self.fail_next_update.swap(false, Ordering::SeqCst) {
            return Err(RepoError::from_persistence("update rejected"));
        }

        let mut records = self.records.lock().await;
        let record = records
            .get_mut(&params.id)
            .filter(|record| record.kind == params.kind)
            .ok_or(RepoError::NotFound)?;

        for (name, value) in params.set {
            record.fields.insert(name, value);
        }
        for name in &params.clear {
            record.fields.remove(name);
        }
        record.media = record.media.merged(&params.media);
        if let Some(active) = params.is_active {
            record.is_active = active;
        }
        if let Some(order) = params.order {
            record.order = order;
        }
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }

    async fn set_order(&self, kind: ResourceKind, id: Uuid, order: i32) -> Result<(), RepoError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(&id)
            .filter(|record| record.kind == kind)
            .ok_or(RepoError::NotFound)?;
        record.order = order;
        Ok(())
    }

    async fn toggle_active(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<ResourceRecord, RepoError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(&id)
            .filter(|record| record.kind == kind)
            .ok_or(RepoError::NotFound)?;
        record.is_active = !record.is_active;
        Ok(record.clone())
    }

    async fn delete_resource(&self, kind: ResourceKind, id: Uuid) -> Result<(), RepoError> {
        let mut records = self.records.lock().await;
        match records.get(&id) {
            Some(record) if record.kind == kind => {
                records.remove(&id);
                Ok(())
            }
            _ => Err(RepoError::NotFound),
        }
    }
}

#[derive(Default)]
pub struct MemoryContacts {
    records: Mutex<Vec<ContactRecord>>,
}

#[async_trait]
impl ContactsRepo for MemoryContacts {
    async fn list_inquiries(&self, page: PageRequest) -> Result<Vec<ContactRecord>, RepoError> {
        let records = self.records.lock().await;
        let mut items = records.clone();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(items
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn count_inquiries(&self) -> Result<u64, RepoError> {
        Ok(self.records.lock().await.len() as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContactRecord>, RepoError> {
        let records = self.records.lock().await;
        Ok(records.iter().find(|record| record.id == id).cloned())
    }
}

#[async_trait]
impl ContactsWriteRepo for MemoryContacts {
    async fn create_inquiry(&self, inquiry: NewInquiry) -> Result<ContactRecord, RepoError> {
        tokio::time::sleep(Duration::from_millis(2)).await;
        let now = OffsetDateTime::now_utc();
        let record = ContactRecord {
            id: Uuid::new_v4(),
            name: inquiry.name,
            email: inquiry.email,
            mobile: inquiry.mobile,
            message: inquiry.message,
            created_at: now,
            updated_at: now,
        };
        self.records.lock().await.push(record.clone());
        Ok(record)
    }

    async fn delete_inquiry(&self, id: Uuid) -> Result<(), RepoError> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

/// Media host that remembers live objects.
///
/// Uploads whose file name starts with `fail` are rejected, as are deletes of refs
/// listed in `undeletable`.
#[derive(Default)]
pub struct FakeMediaHost {
    live: std::sync::Mutex<HashSet<String>>,
    deleted: std::sync::Mutex<Vec<String>>,
    pub undeletable: std::sync::Mutex<HashSet<String>>,
    uploads: AtomicUsize,
}

impl FakeMediaHost {
    pub fn live(&self) -> HashSet<String> {
        self.live.lock().map(|live| live.clone()).unwrap_or_default()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().map(|deleted| deleted.clone()).unwrap_or_default()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn refuse_delete(&self, external_ref: &str) {
        if let Ok(mut refs) = self.undeletable.lock() {
            refs.insert(external_ref.to_string());
        }
    }
}

#[async_trait]
impl MediaHost for FakeMediaHost {
    async fn upload(&self, upload: &MediaUpload, folder: &str) -> Result<MediaRef, MediaError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if upload.file_name.starts_with("fail") {
            return Err(MediaError::Rejected {
                status: 400,
                message: "unsupported file".to_string(),
            });
        }

        let external_ref = format!("{folder}/{}", Uuid::new_v4());
        self.live
            .lock()
            .expect("media lock")
            .insert(external_ref.clone());
        Ok(MediaRef {
            url: format!("https://media.test/{external_ref}"),
            external_ref,
        })
    }

    async fn delete(&self, external_ref: &str) -> Result<(), MediaError> {
        if self.undeletable.lock().expect("media lock").contains(external_ref) {
            return Err(MediaError::Transport("connection reset".to_string()));
        }
        self.live.lock().expect("media lock").remove(external_ref);
        self.deleted
            .lock()
            .expect("media lock")
            .push(external_ref.to_string());
        Ok(())
    }
}

pub struct StaticHealth(pub bool);

#[async_trait]
impl HealthCheck for StaticHealth {
    async fn check(&self) -> Result<(), InfraError> {
        if self.0 {
            Ok(())
        } else {
            Err(InfraError::database("connection refused"))
        }
    }
}

pub struct Harness {
    pub resources: Arc<MemoryResources>,
    pub contacts: Arc<MemoryContacts>,
    pub media: Arc<FakeMediaHost>,
    pub cache: Arc<ResponseCache>,
    pub clock: Arc<ManualClock>,
    pub service: Arc<ResourceService>,
    pub contact_service: Arc<ContactService>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_cache_enabled(true)
    }

    pub fn with_cache_enabled(enabled: bool) -> Self {
        let resources = Arc::new(MemoryResources::default());
        let contacts = Arc::new(MemoryContacts::default());
        let media = Arc::new(FakeMediaHost::default());
        let clock = Arc::new(ManualClock::new(OffsetDateTime::now_utc()));
        let cache = Arc::new(ResponseCache::new(clock.clone()));

        let config = CacheConfig {
            enabled,
            ..CacheConfig::default()
        };
        let service = ResourceService::new(resources.clone(), resources.clone(), media.clone())
            .with_cache(cache.clone(), config);
        let contact_service = ContactService::new(contacts.clone(), contacts.clone());

        Self {
            resources,
            contacts,
            media,
            cache,
            clock,
            service: Arc::new(service),
            contact_service: Arc::new(contact_service),
        }
    }

    pub fn http_state(&self, rate_limit: u32) -> HttpState {
        HttpState {
            resources: self.service.clone(),
            contacts: self.contact_service.clone(),
            health: Arc::new(StaticHealth(true)),
            admin_tokens: Arc::new(AdminTokens::from_plain([ADMIN_TOKEN])),
            rate_limiter: Arc::new(ApiRateLimiter::new(Duration::from_secs(900), rate_limit)),
        }
    }
}

pub fn image(name: &str) -> MediaUpload {
    MediaUpload::new("image", name, Bytes::from_static(b"\x89PNG fake"))
        .with_content_type("image/png")
}
