use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::domain::contact::InquiryForm;
use crate::domain::raw_fields::RawFields;

use super::{parse_id, parse_u32};
use crate::infra::http::error::ApiError;
use crate::infra::http::form::FormPayload;
use crate::infra::http::models::{DataEnvelope, ListEnvelope, MessageEnvelope};
use crate::infra::http::state::HttpState;

#[derive(Debug, Default, Deserialize)]
pub struct ContactListParams {
    #[serde(default)]
    page: Option<String>,
    #[serde(default)]
    limit: Option<String>,
}

pub async fn submit_contact(
    State(state): State<HttpState>,
    form: FormPayload,
) -> Result<Response, ApiError> {
    let inquiry = inquiry_from_fields(&form.fields);
    let record = state.contacts.submit(&inquiry).await?;
    let body = DataEnvelope::new(record).with_message("Inquiry submitted successfully");
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn list_contacts(
    State(state): State<HttpState>,
    Query(params): Query<ContactListParams>,
) -> Result<Response, ApiError> {
    let page = params
        .page
        .as_deref()
        .map(|raw| parse_u32("page", raw))
        .transpose()?
        .flatten();
    let limit = params
        .limit
        .as_deref()
        .map(|raw| parse_u32("limit", raw))
        .transpose()?
        .flatten();

    let page = state.contacts.list(page, limit).await?;
    Ok(Json(ListEnvelope::from_page(page)).into_response())
}

pub async fn get_contact(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let record = state.contacts.get(id).await?;
    Ok(Json(DataEnvelope::new(record)).into_response())
}

pub async fn delete_contact(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    state.contacts.delete(id).await?;
    Ok(Json(MessageEnvelope::new("Inquiry deleted successfully")).into_response())
}

fn inquiry_from_fields(fields: &RawFields) -> InquiryForm {
    let text = |name: &str| fields.scalar(name).map(str::to_string);
    InquiryForm {
        name: text("name"),
        email: text("email"),
        mobile: text("mobile"),
        message: text("message"),
    }
}
