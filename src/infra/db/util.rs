use sqlx::error::ErrorKind;

use crate::application::repos::RepoError;

/// Maps driver errors onto repository errors.
///
/// Check constraints declared in `migrations/` surface as `InvalidInput` with a
/// field-level message: `resources.sort_order >= 0` and the length limits on
/// `contact_inquiries`. Primary-key clashes on either table become `Duplicate`.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation => RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            },
            ErrorKind::CheckViolation => RepoError::InvalidInput {
                message: check_violation_message(db.constraint(), db.message()),
            },
            ErrorKind::NotNullViolation | ErrorKind::ForeignKeyViolation => {
                RepoError::Integrity {
                    message: db.message().to_string(),
                }
            }
            _ if db.message().contains("invalid input syntax") => RepoError::InvalidInput {
                message: db.message().to_string(),
            },
            _ if db
                .message()
                .contains("canceling statement due to user request") =>
            {
                RepoError::Timeout
            }
            _ => RepoError::from_persistence(sqlx::Error::Database(db)),
        },
        other => RepoError::from_persistence(other),
    }
}

/// Postgres names inline column checks `<table>_<column>_check`.
fn check_violation_message(constraint: Option<&str>, fallback: &str) -> String {
    let message = match constraint {
        Some("resources_sort_order_check") => "order must be zero or greater",
        Some("contact_inquiries_name_check") => "name must be at most 100 characters",
        Some("contact_inquiries_email_check") => "email must be at most 120 characters",
        Some("contact_inquiries_mobile_check") => "mobile must be at most 20 characters",
        Some("contact_inquiries_message_check") => "message must be at most 2000 characters",
        _ => fallback,
    };
    message.to_string()
}
