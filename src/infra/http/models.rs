//! Response bodies.
//!
//! Resources are rendered flat: domain fields and media slots sit beside `id`,
//! `order` and `is_active`, which is the shape the site front end consumes.

use std::collections::BTreeMap;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{PageInfo, Paginated};
use crate::application::resources::OrphanedMedia;
use crate::domain::entities::{FieldMap, GroupCount, ResourceMedia, ResourceRecord, ResourceStats};

#[derive(Debug, Serialize)]
pub struct ResourceView<'a> {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: &'a FieldMap,
    #[serde(flatten)]
    pub media: &'a ResourceMedia,
    pub is_active: bool,
    pub order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl<'a> From<&'a ResourceRecord> for ResourceView<'a> {
    fn from(record: &'a ResourceRecord) -> Self {
        Self {
            id: record.id,
            fields: &record.fields,
            media: &record.media,
            is_active: record.is_active,
            order: record.order,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

pub fn views(records: &[ResourceRecord]) -> Vec<ResourceView<'_>> {
    records.iter().map(ResourceView::from).collect()
}

/// Stats body: `total`, `active`, `inactive` and one `by_<field>` array per group.
#[derive(Debug, Serialize)]
pub struct StatsView<'a> {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    #[serde(flatten)]
    pub groups: BTreeMap<String, &'a [GroupCount]>,
}

impl<'a> From<&'a ResourceStats> for StatsView<'a> {
    fn from(stats: &'a ResourceStats) -> Self {
        Self {
            total: stats.total,
            active: stats.active,
            inactive: stats.inactive,
            groups: stats
                .groups
                .iter()
                .map(|(field, buckets)| (format!("by_{field}"), buckets.as_slice()))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListEnvelope<T> {
    pub success: bool,
    pub count: usize,
    pub data: Vec<T>,
    pub pagination: PageInfo,
}

impl<'a> ListEnvelope<ResourceView<'a>> {
    pub fn resources(page: &'a Paginated<ResourceRecord>) -> Self {
        Self {
            success: true,
            count: page.items.len(),
            data: views(&page.items),
            pagination: page.pagination,
        }
    }
}

impl<T> ListEnvelope<T> {
    pub fn from_page(page: Paginated<T>) -> Self {
        Self {
            success: true,
            count: page.items.len(),
            data: page.items,
            pagination: page.pagination,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DataEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Warnings>,
}

impl<T> DataEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
            warnings: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Serialize)]
pub struct MessageEnvelope {
    pub success: bool,
    pub message: String,
}

impl MessageEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Warnings {
    pub orphaned_media: Vec<OrphanedMediaView>,
}

#[derive(Debug, Serialize)]
pub struct OrphanedMediaView {
    pub external_ref: String,
    pub error: String,
}

impl Warnings {
    pub fn orphaned(orphaned: &[OrphanedMedia]) -> Option<Self> {
        (!orphaned.is_empty()).then(|| Self {
            orphaned_media: orphaned
                .iter()
                .map(|item| OrphanedMediaView {
                    external_ref: item.external_ref.clone(),
                    error: item.error.to_string(),
                })
                .collect(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}
