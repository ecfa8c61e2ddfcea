//! JSON error envelope for the public API.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::contact::ContactError;
use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use crate::application::resources::ResourceError;
use crate::domain::error::FieldViolation;

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const DUPLICATE: &str = "duplicate";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const MEDIA_UPLOAD_FAILED: &str = "media_upload_failed";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const INTERNAL: &str = "internal_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    hint: Option<String>,
    details: Option<Vec<FieldViolation>>,
    report: ErrorReport,
    retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        let report = ErrorReport::from_message("infra::http", status, format!("{code}: {message}"));
        Self {
            status,
            code,
            message,
            hint: None,
            details: None,
            report,
            retry_after: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn with_report(mut self, source: &'static str, error: &dyn std::error::Error) -> Self {
        self.report = ErrorReport::from_error(source, self.status, error);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::INVALID_INPUT, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, codes::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message)
    }

    pub fn internal(source: &'static str, error: &dyn std::error::Error) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL,
            "Unexpected error occurred",
        )
        .with_report(source, error)
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        let mut error = Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            codes::RATE_LIMITED,
            "Too many requests from this client, please try again later",
        )
        .with_hint(format!("Retry after {retry_after} seconds"));
        error.retry_after = Some(retry_after);
        error
    }

    fn from_repo(source: &'static str, err: &RepoError) -> Self {
        let error = match err {
            RepoError::NotFound => Self::not_found("Resource not found"),
            RepoError::Duplicate { constraint } => {
                Self::new(StatusCode::CONFLICT, codes::DUPLICATE, "Duplicate record")
                    .with_hint(constraint.clone())
            }
            RepoError::InvalidInput { message } => Self::invalid_input(message.clone()),
            RepoError::Pagination(inner) => Self::invalid_input(inner.to_string()),
            RepoError::Timeout => Self::new(
                StatusCode::GATEWAY_TIMEOUT,
                codes::DB_TIMEOUT,
                "Database timeout",
            ),
            RepoError::Integrity { .. } | RepoError::Persistence(_) => {
                return Self::internal(source, err);
            }
        };
        error.with_report(source, err)
    }
}

impl From<ResourceError> for ApiError {
    fn from(err: ResourceError) -> Self {
        const SOURCE: &str = "application::resources";
        match &err {
            ResourceError::Validation(errors) => {
                let mut api = Self::new(
                    StatusCode::BAD_REQUEST,
                    codes::VALIDATION_FAILED,
                    "Validation failed",
                )
                .with_report(SOURCE, &err);
                api.details = Some(errors.violations.clone());
                api
            }
            ResourceError::NotFound { kind, .. } => {
                Self::not_found(format!("{kind} not found")).with_report(SOURCE, &err)
            }
            ResourceError::InvalidInput(message) => {
                Self::invalid_input(message.clone()).with_report(SOURCE, &err)
            }
            ResourceError::MediaUpload(inner) => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::MEDIA_UPLOAD_FAILED,
                "Media upload failed",
            )
            .with_hint(inner.to_string())
            .with_report(SOURCE, &err),
            ResourceError::Repo(repo) => Self::from_repo(SOURCE, repo),
        }
    }
}

impl From<ContactError> for ApiError {
    fn from(err: ContactError) -> Self {
        const SOURCE: &str = "application::contact";
        match &err {
            ContactError::Validation(errors) => {
                let mut api = Self::new(
                    StatusCode::BAD_REQUEST,
                    codes::VALIDATION_FAILED,
                    "Validation failed",
                )
                .with_report(SOURCE, &err);
                api.details = Some(errors.violations.clone());
                api
            }
            ContactError::NotFound(_) => {
                Self::not_found("Inquiry not found").with_report(SOURCE, &err)
            }
            ContactError::Pagination(inner) => {
                Self::invalid_input(inner.to_string()).with_report(SOURCE, &err)
            }
            ContactError::Repo(repo) => Self::from_repo(SOURCE, repo),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code,
                message: self.message,
                hint: self.hint,
                details: self.details,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(retry_after) = self.retry_after
            && let Ok(value) = HeaderValue::from_str(&retry_after.to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        self.report.attach(&mut response);
        response
    }
}
