use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use time::OffsetDateTime;

use crate::application::error::AppError;
use crate::infra::http::models::HealthBody;
use crate::infra::http::state::HttpState;

/// Liveness plus a database round trip; an unreachable store answers 503.
pub async fn health(State(state): State<HttpState>) -> Response {
    match state.health.check().await {
        Ok(()) => Json(HealthBody {
            status: "ok",
            timestamp: OffsetDateTime::now_utc(),
        })
        .into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
