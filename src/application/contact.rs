//! Visitor contact inquiries: public submission, admin listing and removal.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::pagination::{PageRequest, Paginated, PaginationError};
use crate::application::repos::{ContactsRepo, ContactsWriteRepo, RepoError};
use crate::domain::contact::InquiryForm;
use crate::domain::entities::ContactRecord;
use crate::domain::error::ValidationErrors;

#[derive(Debug, Error)]
pub enum ContactError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("inquiry `{0}` not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct ContactService {
    reader: Arc<dyn ContactsRepo>,
    writer: Arc<dyn ContactsWriteRepo>,
}

impl ContactService {
    pub fn new(reader: Arc<dyn ContactsRepo>, writer: Arc<dyn ContactsWriteRepo>) -> Self {
        Self { reader, writer }
    }

    pub async fn submit(&self, form: &InquiryForm) -> Result<ContactRecord, ContactError> {
        let inquiry = form.validate()?;
        let record = self.writer.create_inquiry(inquiry).await?;
        info!(
            target = "fortview::contact",
            id = %record.id,
            "Contact inquiry received"
        );
        Ok(record)
    }

    pub async fn list(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Paginated<ContactRecord>, ContactError> {
        let page = PageRequest::new(page, limit)?;
        let (items, total) = tokio::try_join!(
            self.reader.list_inquiries(page),
            self.reader.count_inquiries()
        )?;
        Ok(Paginated::new(items, page, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<ContactRecord, ContactError> {
        self.reader
            .find_by_id(id)
            .await?
            .ok_or(ContactError::NotFound(id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ContactError> {
        match self.writer.delete_inquiry(id).await {
            Ok(()) => {
                info!(target = "fortview::contact", id = %id, "Contact inquiry deleted");
                Ok(())
            }
            Err(RepoError::NotFound) => Err(ContactError::NotFound(id)),
            Err(err) => Err(err.into()),
        }
    }
}
