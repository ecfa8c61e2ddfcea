use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::pagination::PageRequest,
    application::repos::{ContactsRepo, ContactsWriteRepo, RepoError},
    domain::contact::NewInquiry,
    domain::entities::ContactRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ContactRow {
    id: Uuid,
    name: String,
    email: String,
    mobile: String,
    message: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ContactRow> for ContactRecord {
    fn from(row: ContactRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            mobile: row.mobile,
            message: row.message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ContactsRepo for PostgresRepositories {
    async fn list_inquiries(&self, page: PageRequest) -> Result<Vec<ContactRecord>, RepoError> {
        let offset = Self::convert_offset(page.offset())?;
        let rows = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, name, email, mobile, message, created_at, updated_at
            FROM contact_inquiries
            ORDER BY created_at DESC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(page.limit))
        .bind(offset)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ContactRecord::from).collect())
    }

    async fn count_inquiries(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_inquiries")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContactRecord>, RepoError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, name, email, mobile, message, created_at, updated_at
            FROM contact_inquiries
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ContactRecord::from))
    }
}

#[async_trait]
impl ContactsWriteRepo for PostgresRepositories {
    async fn create_inquiry(&self, inquiry: NewInquiry) -> Result<ContactRecord, RepoError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r#"
            INSERT INTO contact_inquiries (id, name, email, mobile, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, mobile, message, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(inquiry.name)
        .bind(inquiry.email)
        .bind(inquiry.mobile)
        .bind(inquiry.message)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_inquiry(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM contact_inquiries WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
