use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::resources::ResourceKind;

/// Validated domain fields of a resource, keyed by field name.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Handle to an object owned by the external media host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    pub external_ref: String,
}

/// Contents of one media slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaValue {
    One(MediaRef),
    Many(Vec<MediaRef>),
}

impl MediaValue {
    pub fn refs(&self) -> Vec<&MediaRef> {
        match self {
            MediaValue::One(media) => vec![media],
            MediaValue::Many(items) => items.iter().collect(),
        }
    }
}

/// Media slots held by a resource, keyed by slot name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceMedia(pub BTreeMap<String, MediaValue>);

impl ResourceMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: &str) -> Option<&MediaValue> {
        self.0.get(slot)
    }

    pub fn insert(&mut self, slot: impl Into<String>, value: MediaValue) {
        self.0.insert(slot.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every external reference across all slots.
    pub fn refs(&self) -> Vec<&MediaRef> {
        self.0.values().flat_map(MediaValue::refs).collect()
    }

    /// Overlays `other` slot by slot.
    pub fn merged(&self, other: &ResourceMedia) -> ResourceMedia {
        let mut merged = self.clone();
        for (slot, value) in &other.0 {
            merged.0.insert(slot.clone(), value.clone());
        }
        merged
    }
}

/// Headline counts for one kind plus per-field value buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    /// Buckets per grouped field, largest count first. A `None` value counts
    /// resources that do not set the field.
    pub groups: BTreeMap<String, Vec<GroupCount>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub value: Option<String>,
    pub count: u64,
}

impl GroupCount {
    /// Largest count first, then by value with unset values last.
    pub fn sort(buckets: &mut [GroupCount]) {
        buckets.sort_by(|a, b| {
            b.count.cmp(&a.count).then_with(|| match (&a.value, &b.value) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: Uuid,
    pub kind: ResourceKind,
    pub fields: FieldMap,
    pub media: ResourceMedia,
    pub is_active: bool,
    pub order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(tag: &str) -> MediaRef {
        MediaRef {
            url: format!("https://cdn.test/{tag}.jpg"),
            external_ref: format!("fortview/test/{tag}"),
        }
    }

    #[test]
    fn refs_flatten_single_and_many_slots() {
        let mut slots = ResourceMedia::new();
        slots.insert("image", MediaValue::One(media("a")));
        slots.insert("images", MediaValue::Many(vec![media("b"), media("c")]));

        let refs: Vec<_> = slots.refs().into_iter().map(|m| m.external_ref.as_str()).collect();
        assert_eq!(refs, vec!["fortview/test/a", "fortview/test/b", "fortview/test/c"]);
    }

    #[test]
    fn untagged_media_value_deserializes_both_shapes() {
        let one: MediaValue =
            serde_json::from_str(r#"{"url":"u","external_ref":"r"}"#).unwrap();
        assert!(matches!(one, MediaValue::One(_)));

        let many: MediaValue =
            serde_json::from_str(r#"[{"url":"u","external_ref":"r"}]"#).unwrap();
        assert!(matches!(many, MediaValue::Many(ref items) if items.len() == 1));
    }

    #[test]
    fn merged_replaces_only_supplied_slots() {
        let mut base = ResourceMedia::new();
        base.insert("desktop_image", MediaValue::One(media("d1")));
        base.insert("mobile_image", MediaValue::One(media("m1")));

        let mut patch = ResourceMedia::new();
        patch.insert("mobile_image", MediaValue::One(media("m2")));

        let merged = base.merged(&patch);
        assert_eq!(merged.get("desktop_image"), Some(&MediaValue::One(media("d1"))));
        assert_eq!(merged.get("mobile_image"), Some(&MediaValue::One(media("m2"))));
    }
}
