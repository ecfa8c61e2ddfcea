use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::application::media::{MediaError, MediaUpload};
use crate::application::pagination::PaginationError;
use crate::application::repos::RepoError;
use crate::domain::entities::ResourceRecord;
use crate::domain::error::ValidationErrors;
use crate::domain::raw_fields::RawFields;
use crate::domain::resources::ResourceKind;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{kind} `{id}` not found")]
    NotFound { kind: ResourceKind, id: Uuid },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("media upload failed")]
    MediaUpload(#[source] MediaError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl ResourceError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Maps a repository failure for an operation addressed to one resource.
    pub(crate) fn for_id(kind: ResourceKind, id: Uuid) -> impl FnOnce(RepoError) -> Self {
        move |err| match err {
            RepoError::NotFound => Self::NotFound { kind, id },
            RepoError::InvalidInput { message } => Self::InvalidInput(message),
            other => Self::Repo(other),
        }
    }
}

impl From<PaginationError> for ResourceError {
    fn from(err: PaginationError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Public listing parameters as they arrive from a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub active: Option<bool>,
    /// `(field, raw value)` pairs checked against the kind's filterable fields.
    pub filters: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateResource {
    pub fields: RawFields,
    pub uploads: Vec<MediaUpload>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateResource {
    pub fields: RawFields,
    pub uploads: Vec<MediaUpload>,
}

/// External object that could not be removed while its resource was deleted.
#[derive(Debug)]
pub struct OrphanedMedia {
    pub external_ref: String,
    pub error: MediaError,
}

#[derive(Debug)]
pub struct DeleteOutcome {
    pub record: ResourceRecord,
    pub orphaned: Vec<OrphanedMedia>,
}

impl DeleteOutcome {
    pub fn is_clean(&self) -> bool {
        self.orphaned.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderItem {
    pub id: Uuid,
    pub order: i32,
}

/// Parses a reorder payload.
///
/// Anything but an array is rejected, as is an entry without a non-negative integer
/// `order`. Entries whose `id` is missing or not a UUID are skipped.
pub fn parse_reorder_items(items: &Value) -> Result<Vec<ReorderItem>, ResourceError> {
    let Value::Array(entries) = items else {
        return Err(ResourceError::invalid_input("items must be an array"));
    };

    let mut parsed = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let Value::Object(entry) = entry else {
            return Err(ResourceError::invalid_input(format!(
                "items[{index}] must be an object"
            )));
        };

        let order = entry
            .get("order")
            .and_then(order_value)
            .ok_or_else(|| {
                ResourceError::invalid_input(format!(
                    "items[{index}].order must be a non-negative integer"
                ))
            })?;

        let id = entry
            .get("id")
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok());
        if let Some(id) = id {
            parsed.push(ReorderItem { id, order });
        }
    }
    Ok(parsed)
}

fn order_value(value: &Value) -> Option<i32> {
    let order = match value {
        Value::Number(number) => number.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(text) => text.trim().parse::<i32>().ok(),
        _ => None,
    };
    order.filter(|order| *order >= 0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn non_array_payload_is_invalid_input() {
        for payload in [json!(null), json!({ "id": "x" }), json!("[]")] {
            assert!(matches!(
                parse_reorder_items(&payload),
                Err(ResourceError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn entries_with_unusable_ids_are_skipped() {
        let id = Uuid::new_v4();
        let payload = json!([
            { "id": id.to_string(), "order": 3 },
            { "id": "missingId", "order": 5 },
            { "order": 1 },
        ]);
        let items = parse_reorder_items(&payload).unwrap();
        assert_eq!(items, vec![ReorderItem { id, order: 3 }]);
    }

    #[test]
    fn bad_order_values_are_rejected() {
        let id = Uuid::new_v4().to_string();
        for order in [json!(-1), json!(1.5), json!("two"), json!(null)] {
            let payload = json!([{ "id": id, "order": order }]);
            assert!(parse_reorder_items(&payload).is_err(), "{order}");
        }
    }

    #[test]
    fn numeric_strings_are_accepted_as_order() {
        let id = Uuid::new_v4();
        let payload = json!([{ "id": id.to_string(), "order": "7" }]);
        assert_eq!(parse_reorder_items(&payload).unwrap()[0].order, 7);
    }
}
