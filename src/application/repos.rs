//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{PageRequest, PaginationError};
use crate::domain::contact::NewInquiry;
use crate::domain::entities::{
    ContactRecord, FieldMap, ResourceMedia, ResourceRecord, ResourceStats,
};
use crate::domain::resources::ResourceKind;
use crate::domain::schema::FieldFilter;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Sparse predicate set for resource listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceQueryFilter {
    pub active: Option<bool>,
    pub fields: Vec<FieldFilter>,
}

impl ResourceQueryFilter {
    pub fn matches(&self, record: &ResourceRecord) -> bool {
        self.active.is_none_or(|active| record.is_active == active)
            && self.fields.iter().all(|filter| filter.matches(&record.fields))
    }
}

#[derive(Debug, Clone)]
pub struct CreateResourceParams {
    pub kind: ResourceKind,
    pub fields: FieldMap,
    pub media: ResourceMedia,
    pub is_active: bool,
    pub order: i32,
}

/// Partial update. Only the parts that are set are written.
#[derive(Debug, Clone)]
pub struct UpdateResourceParams {
    pub kind: ResourceKind,
    pub id: Uuid,
    pub set: FieldMap,
    pub clear: Vec<String>,
    /// Media slots to overwrite; other slots keep their stored value.
    pub media: ResourceMedia,
    pub is_active: Option<bool>,
    pub order: Option<i32>,
}

#[async_trait]
pub trait ResourcesRepo: Send + Sync {
    /// One page of a kind, in the kind's display order.
    async fn list_resources(
        &self,
        kind: ResourceKind,
        filter: &ResourceQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<ResourceRecord>, RepoError>;

    async fn count_resources(
        &self,
        kind: ResourceKind,
        filter: &ResourceQueryFilter,
    ) -> Result<u64, RepoError>;

    /// Every resource of a kind, in display order.
    async fn list_all(&self, kind: ResourceKind) -> Result<Vec<ResourceRecord>, RepoError>;

    async fn find_by_id(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<Option<ResourceRecord>, RepoError>;

    async fn max_order(&self, kind: ResourceKind) -> Result<Option<i32>, RepoError>;

    /// Total, active and inactive counts plus value buckets for each of `group_by`.
    async fn resource_stats(
        &self,
        kind: ResourceKind,
        group_by: &[&'static str],
    ) -> Result<ResourceStats, RepoError>;
}

#[async_trait]
pub trait ResourcesWriteRepo: Send + Sync {
    async fn create_resource(
        &self,
        params: CreateResourceParams,
    ) -> Result<ResourceRecord, RepoError>;

    /// Fails with [`RepoError::NotFound`] when the id does not resolve.
    async fn update_resource(
        &self,
        params: UpdateResourceParams,
    ) -> Result<ResourceRecord, RepoError>;

    /// Fails with [`RepoError::NotFound`] when the id does not resolve.
    async fn set_order(&self, kind: ResourceKind, id: Uuid, order: i32) -> Result<(), RepoError>;

    /// Flips the active flag in one statement and returns the stored result.
    async fn toggle_active(&self, kind: ResourceKind, id: Uuid)
    -> Result<ResourceRecord, RepoError>;

    async fn delete_resource(&self, kind: ResourceKind, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ContactsRepo: Send + Sync {
    /// Newest first.
    async fn list_inquiries(&self, page: PageRequest) -> Result<Vec<ContactRecord>, RepoError>;

    async fn count_inquiries(&self) -> Result<u64, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContactRecord>, RepoError>;
}

#[async_trait]
pub trait ContactsWriteRepo: Send + Sync {
    async fn create_inquiry(&self, inquiry: NewInquiry) -> Result<ContactRecord, RepoError>;

    async fn delete_inquiry(&self, id: Uuid) -> Result<(), RepoError>;
}
