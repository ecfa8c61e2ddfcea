//! Ordered resource handlers, shared by every kind.

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use crate::application::resources::{CreateResource, ListQuery, UpdateResource};
use crate::domain::resources::ResourceKind;

use super::{parse_id, parse_u32};
use crate::infra::http::error::ApiError;
use crate::infra::http::form::FormPayload;
use crate::infra::http::models::{
    DataEnvelope, ListEnvelope, ResourceView, StatsView, Warnings, views,
};
use crate::infra::http::state::HttpState;

const ACTIVE_PARAMS: [&str; 3] = ["active", "is_active", "isActive"];

pub async fn list_resources(
    State(state): State<HttpState>,
    Extension(kind): Extension<ResourceKind>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let query = list_query(params)?;
    let page = state.resources.list(kind, &query).await?;
    Ok(Json(ListEnvelope::resources(&page)).into_response())
}

pub async fn list_active_resources(
    State(state): State<HttpState>,
    Extension(kind): Extension<ResourceKind>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let mut query = list_query(params)?;
    query.active = Some(true);
    let page = state.resources.list(kind, &query).await?;
    Ok(Json(ListEnvelope::resources(&page)).into_response())
}

pub async fn resource_stats(
    State(state): State<HttpState>,
    Extension(kind): Extension<ResourceKind>,
) -> Result<Response, ApiError> {
    let stats = state.resources.stats(kind).await?;
    Ok(Json(DataEnvelope::new(StatsView::from(&stats))).into_response())
}

pub async fn get_resource(
    State(state): State<HttpState>,
    Extension(kind): Extension<ResourceKind>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let record = state.resources.get(kind, id).await?;
    Ok(Json(DataEnvelope::new(ResourceView::from(&record))).into_response())
}

pub async fn create_resource(
    State(state): State<HttpState>,
    Extension(kind): Extension<ResourceKind>,
    form: FormPayload,
) -> Result<Response, ApiError> {
    let record = state
        .resources
        .create(
            kind,
            CreateResource {
                fields: form.fields,
                uploads: form.uploads,
            },
        )
        .await?;

    let body = DataEnvelope::new(ResourceView::from(&record))
        .with_message(format!("{kind} created successfully"));
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn update_resource(
    State(state): State<HttpState>,
    Extension(kind): Extension<ResourceKind>,
    Path(id): Path<String>,
    form: FormPayload,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let record = state
        .resources
        .update(
            kind,
            id,
            UpdateResource {
                fields: form.fields,
                uploads: form.uploads,
            },
        )
        .await?;

    let body = DataEnvelope::new(ResourceView::from(&record))
        .with_message(format!("{kind} updated successfully"));
    Ok(Json(body).into_response())
}

pub async fn delete_resource(
    State(state): State<HttpState>,
    Extension(kind): Extension<ResourceKind>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let outcome = state.resources.delete(kind, id).await?;

    let mut body = DataEnvelope::new(ResourceView::from(&outcome.record))
        .with_message(format!("{kind} deleted successfully"));
    body.warnings = Warnings::orphaned(&outcome.orphaned);
    Ok(Json(body).into_response())
}

pub async fn reorder_resources(
    State(state): State<HttpState>,
    Extension(kind): Extension<ResourceKind>,
    Json(payload): Json<Value>,
) -> Result<Response, ApiError> {
    let items = payload.get("items").unwrap_or(&Value::Null);
    let records = state.resources.reorder(kind, items).await?;

    let body = DataEnvelope::new(views(&records))
        .with_message(format!("{kind} order updated successfully"));
    Ok(Json(body).into_response())
}

pub async fn toggle_resource(
    State(state): State<HttpState>,
    Extension(kind): Extension<ResourceKind>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let record = state.resources.toggle_active(kind, id).await?;

    let status = if record.is_active {
        "activated"
    } else {
        "deactivated"
    };
    let body =
        DataEnvelope::new(ResourceView::from(&record)).with_message(format!("{kind} {status}"));
    Ok(Json(body).into_response())
}

fn list_query(params: Vec<(String, String)>) -> Result<ListQuery, ApiError> {
    let mut query = ListQuery::default();
    for (name, raw) in params {
        match name.as_str() {
            "page" => query.page = parse_u32("page", &raw)?,
            "limit" => query.limit = parse_u32("limit", &raw)?,
            name if ACTIVE_PARAMS.contains(&name) => {
                query.active = match raw.trim() {
                    "" => None,
                    "true" | "1" => Some(true),
                    "false" | "0" => Some(false),
                    _ => {
                        return Err(ApiError::invalid_input(format!(
                            "{name} must be true or false"
                        )));
                    }
                };
            }
            _ => query.filters.push((name, raw)),
        }
    }
    Ok(query)
}
