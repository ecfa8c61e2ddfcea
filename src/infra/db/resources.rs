use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, types::Json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::pagination::PageRequest,
    application::repos::{
        CreateResourceParams, RepoError, ResourceQueryFilter, ResourcesRepo, ResourcesWriteRepo,
        UpdateResourceParams,
    },
    domain::entities::{FieldMap, GroupCount, ResourceMedia, ResourceRecord, ResourceStats},
    domain::resources::ResourceKind,
    domain::schema::{SortDirection, SortField, SortKey},
};

use super::{PostgresRepositories, map_sqlx_error};

const RESOURCE_COLUMNS: &str =
    "id, kind, fields, media, is_active, sort_order, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ResourceRow {
    id: Uuid,
    kind: String,
    fields: Json<FieldMap>,
    media: Json<ResourceMedia>,
    is_active: bool,
    sort_order: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<ResourceRow> for ResourceRecord {
    type Error = RepoError;

    fn try_from(row: ResourceRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<ResourceKind>()
            .map_err(|err| RepoError::Integrity {
                message: err.to_string(),
            })?;
        Ok(Self {
            id: row.id,
            kind,
            fields: row.fields.0,
            media: row.media.0,
            is_active: row.is_active,
            order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_records(rows: Vec<ResourceRow>) -> Result<Vec<ResourceRecord>, RepoError> {
    rows.into_iter().map(ResourceRecord::try_from).collect()
}

impl PostgresRepositories {
    fn select_resources<'q>() -> QueryBuilder<'q, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(RESOURCE_COLUMNS);
        qb.push(" FROM resources");
        qb
    }

    fn apply_resource_filter<'q>(
        qb: &mut QueryBuilder<'q, Postgres>,
        kind: ResourceKind,
        filter: &ResourceQueryFilter,
    ) {
        qb.push(" WHERE kind = ");
        qb.push_bind(kind.as_str());

        if let Some(active) = filter.active {
            qb.push(" AND is_active = ");
            qb.push_bind(active);
        }

        for field in &filter.fields {
            qb.push(" AND fields @> ");
            qb.push_bind(Json(field.containment_document()));
        }
    }

    fn push_display_order<'q>(qb: &mut QueryBuilder<'q, Postgres>, sort: &'static [SortKey]) {
        qb.push(" ORDER BY ");
        for key in sort {
            match key.field {
                SortField::Order => {
                    qb.push("sort_order");
                }
                SortField::CreatedAt => {
                    qb.push("created_at");
                }
                SortField::Field(name) => {
                    qb.push("NULLIF(fields -> ");
                    qb.push_bind(name);
                    qb.push(", 'null'::jsonb)");
                }
            }
            match key.direction {
                SortDirection::Asc => qb.push(" ASC NULLS LAST, "),
                SortDirection::Desc => qb.push(" DESC NULLS LAST, "),
            };
        }
        qb.push("id ASC");
    }
}

#[async_trait]
impl ResourcesRepo for PostgresRepositories {
    async fn list_resources(
        &self,
        kind: ResourceKind,
        filter: &ResourceQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<ResourceRecord>, RepoError> {
        let offset = Self::convert_offset(page.offset())?;

        let mut qb = Self::select_resources();
        Self::apply_resource_filter(&mut qb, kind, filter);
        Self::push_display_order(&mut qb, kind.schema().sort);
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(page.limit));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<ResourceRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        into_records(rows)
    }

    async fn count_resources(
        &self,
        kind: ResourceKind,
        filter: &ResourceQueryFilter,
    ) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM resources");
        Self::apply_resource_filter(&mut qb, kind, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn list_all(&self, kind: ResourceKind) -> Result<Vec<ResourceRecord>, RepoError> {
        let mut qb = Self::select_resources();
        Self::apply_resource_filter(&mut qb, kind, &ResourceQueryFilter::default());
        Self::push_display_order(&mut qb, kind.schema().sort);

        let rows = qb
            .build_query_as::<ResourceRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        into_records(rows)
    }

    async fn find_by_id(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<Option<ResourceRecord>, RepoError> {
        let mut qb = Self::select_resources();
        qb.push(" WHERE kind = ");
        qb.push_bind(kind.as_str());
        qb.push(" AND id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<ResourceRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(ResourceRecord::try_from).transpose()
    }

    async fn max_order(&self, kind: ResourceKind) -> Result<Option<i32>, RepoError> {
        sqlx::query_scalar::<_, Option<i32>>(
            "SELECT MAX(sort_order) FROM resources WHERE kind = $1",
        )
        .bind(kind.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn resource_stats(
        &self,
        kind: ResourceKind,
        group_by: &[&'static str],
    ) -> Result<ResourceStats, RepoError> {
        let (total, active) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM resources WHERE kind = $1",
        )
        .bind(kind.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let total = Self::convert_count(total)?;
        let active = Self::convert_count(active)?;

        let mut groups = BTreeMap::new();
        for &field in group_by {
            let rows = sqlx::query_as::<_, (Option<String>, i64)>(
                r#"
                SELECT fields ->> $2, COUNT(*)
                FROM resources
                WHERE kind = $1
                GROUP BY 1
                ORDER BY 2 DESC, 1 ASC NULLS LAST
                "#,
            )
            .bind(kind.as_str())
            .bind(field)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

            let buckets = rows
                .into_iter()
                .map(|(value, count)| {
                    Ok(GroupCount {
                        value,
                        count: Self::convert_count(count)?,
                    })
                })
                .collect::<Result<Vec<_>, RepoError>>()?;
            groups.insert(field.to_string(), buckets);
        }

        Ok(ResourceStats {
            total,
            active,
            inactive: total.saturating_sub(active),
            groups,
        })
    }
}

#[async_trait]
impl ResourcesWriteRepo for PostgresRepositories {
    async fn create_resource(
        &self,
        params: CreateResourceParams,
    ) -> Result<ResourceRecord, RepoError> {
        let CreateResourceParams {
            kind,
            fields,
            media,
            is_active,
            order,
        } = params;

        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO resources (id, kind, fields, media, is_active, sort_order) VALUES (",
        );
        let mut values = qb.separated(", ");
        values.push_bind(Uuid::new_v4());
        values.push_bind(kind.as_str());
        values.push_bind(Json(fields));
        values.push_bind(Json(media));
        values.push_bind(is_active);
        values.push_bind(order);
        qb.push(") RETURNING ");
        qb.push(RESOURCE_COLUMNS);

        let row = qb
            .build_query_as::<ResourceRow>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.try_into()
    }

    async fn update_resource(
        &self,
        params: UpdateResourceParams,
    ) -> Result<ResourceRecord, RepoError> {
        let UpdateResourceParams {
            kind,
            id,
            set,
            clear,
            media,
            is_active,
            order,
        } = params;

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE resources SET fields = (fields || ");
        qb.push_bind(Json(set));
        qb.push(") - ");
        qb.push_bind(clear);
        qb.push("::text[], media = media || ");
        qb.push_bind(Json(media));
        if let Some(is_active) = is_active {
            qb.push(", is_active = ");
            qb.push_bind(is_active);
        }
        if let Some(order) = order {
            qb.push(", sort_order = ");
            qb.push_bind(order);
        }
        qb.push(", updated_at = now() WHERE kind = ");
        qb.push_bind(kind.as_str());
        qb.push(" AND id = ");
        qb.push_bind(id);
        qb.push(" RETURNING ");
        qb.push(RESOURCE_COLUMNS);

        let row = qb
            .build_query_as::<ResourceRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        row.try_into()
    }

    async fn set_order(&self, kind: ResourceKind, id: Uuid, order: i32) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE resources SET sort_order = $1, updated_at = now() WHERE kind = $2 AND id = $3",
        )
        .bind(order)
        .bind(kind.as_str())
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn toggle_active(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<ResourceRecord, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "UPDATE resources SET is_active = NOT is_active, updated_at = now() WHERE kind = ",
        );
        qb.push_bind(kind.as_str());
        qb.push(" AND id = ");
        qb.push_bind(id);
        qb.push(" RETURNING ");
        qb.push(RESOURCE_COLUMNS);

        let row = qb
            .build_query_as::<ResourceRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        row.try_into()
    }

    async fn delete_resource(&self, kind: ResourceKind, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM resources WHERE kind = $1 AND id = $2")
            .bind(kind.as_str())
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
