//! Declarative resource schemas and the validation engine driven by them.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::Value;
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};

use super::entities::{FieldMap, ResourceRecord};
use super::error::ValidationErrors;
use super::list_input::ListInput;
use super::raw_fields::{NULL_LITERAL, RawFields};
use super::resources::ResourceKind;

pub const ORDER_FIELD: &str = "order";
pub const ACTIVE_FIELD: &str = "is_active";
/// Prefix of the list field naming which refs of a multi-file slot survive an update.
pub const RETAIN_MEDIA_PREFIX: &str = "existing_";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text {
        max: usize,
    },
    Integer {
        min: i64,
        max: i64,
    },
    /// Calendar year between `min` and next year inclusive.
    Year {
        min: i64,
    },
    Number {
        min: f64,
        max: Option<f64>,
    },
    Boolean,
    Choice(&'static [&'static str]),
    TextList {
        item_max: usize,
        choices: Option<&'static [&'static str]>,
    },
    /// ISO calendar date, stored as `YYYY-MM-DD`.
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Disabled,
    Equals,
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Bool(bool),
    List(&'static [&'static str]),
}

impl FieldDefault {
    fn to_value(self) -> Value {
        match self {
            FieldDefault::Bool(value) => Value::Bool(value),
            FieldDefault::List(items) => Value::Array(
                items.iter().map(|item| Value::String((*item).to_string())).collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<FieldDefault>,
    pub filter: FilterMode,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            filter: FilterMode::Disabled,
        }
    }

    pub const fn text(name: &'static str, max: usize) -> Self {
        Self::new(name, FieldKind::Text { max })
    }

    pub const fn list(name: &'static str, item_max: usize) -> Self {
        Self::new(
            name,
            FieldKind::TextList {
                item_max,
                choices: None,
            },
        )
    }

    pub const fn choice(name: &'static str, choices: &'static [&'static str]) -> Self {
        Self::new(name, FieldKind::Choice(choices))
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn with_default(self, default: FieldDefault) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }

    pub const fn filter_eq(self) -> Self {
        Self {
            filter: FilterMode::Equals,
            ..self
        }
    }

    pub const fn filter_contains(self) -> Self {
        Self {
            filter: FilterMode::Contains,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCardinality {
    Single,
    Many,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaSlot {
    pub name: &'static str,
    pub cardinality: MediaCardinality,
    pub required: bool,
}

impl MediaSlot {
    pub const fn single(name: &'static str) -> Self {
        Self {
            name,
            cardinality: MediaCardinality::Single,
            required: true,
        }
    }

    pub const fn many(name: &'static str) -> Self {
        Self {
            name,
            cardinality: MediaCardinality::Many,
            required: false,
        }
    }

    pub const fn optional(self) -> Self {
        Self {
            required: false,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Order,
    CreatedAt,
    Field(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    pub const fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub const fn desc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }
}

/// Display order shared by every kind unless its schema overrides it.
pub const DEFAULT_SORT: &[SortKey] = &[
    SortKey::asc(SortField::Order),
    SortKey::desc(SortField::CreatedAt),
];

#[derive(Debug)]
pub struct ResourceSchema {
    pub kind: ResourceKind,
    pub fields: &'static [FieldSpec],
    pub media: &'static [MediaSlot],
    pub sort: &'static [SortKey],
}

/// Output of create-time validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDraft {
    pub fields: FieldMap,
    pub is_active: Option<bool>,
    pub order: Option<i32>,
}

/// Output of update-time validation. Only the fields a client sent appear here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPatch {
    pub set: FieldMap,
    pub clear: Vec<String>,
    pub is_active: Option<bool>,
    pub order: Option<i32>,
    /// External refs to keep per multi-file slot, when the client named them.
    pub retained_media: BTreeMap<String, Vec<String>>,
}

impl FieldPatch {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.clear.is_empty()
            && self.is_active.is_none()
            && self.order.is_none()
            && self.retained_media.is_empty()
    }
}

/// Equality or containment predicate over one domain field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: &'static str,
    pub mode: FilterMode,
    pub value: Value,
}

impl FieldFilter {
    /// JSON document usable with a `@>` containment test against the stored fields.
    pub fn containment_document(&self) -> Value {
        let value = match self.mode {
            FilterMode::Contains => Value::Array(vec![self.value.clone()]),
            FilterMode::Equals | FilterMode::Disabled => self.value.clone(),
        };
        let mut document = serde_json::Map::new();
        document.insert(self.field.to_string(), value);
        Value::Object(document)
    }

    pub fn matches(&self, fields: &FieldMap) -> bool {
        match (self.mode, fields.get(self.field)) {
            (FilterMode::Contains, Some(Value::Array(items))) => items.contains(&self.value),
            (FilterMode::Equals, Some(value)) => value == &self.value,
            _ => false,
        }
    }
}

enum FieldInput {
    Absent,
    Null,
    Value(Value),
    Invalid(String),
}

impl ResourceSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn media_slot(&self, name: &str) -> Option<&MediaSlot> {
        self.media.iter().find(|slot| slot.name == name)
    }

    /// Validates a complete submission. `upload_slots` holds one slot name per file.
    pub fn validate_create(
        &self,
        raw: &RawFields,
        upload_slots: &[&str],
    ) -> Result<ResourceDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut fields = FieldMap::new();

        for spec in self.fields {
            match decode_field(spec, raw) {
                FieldInput::Value(value) => {
                    fields.insert(spec.name.to_string(), value);
                }
                FieldInput::Absent | FieldInput::Null => {
                    if let Some(default) = spec.default {
                        fields.insert(spec.name.to_string(), default.to_value());
                    } else if spec.required {
                        errors.push(spec.name, "is required");
                    }
                }
                FieldInput::Invalid(message) => errors.push(spec.name, message),
            }
        }

        let (is_active, order) = decode_common(raw, &mut errors);
        self.check_uploads(upload_slots, true, &mut errors);

        errors.into_result(ResourceDraft {
            fields,
            is_active,
            order,
        })
    }

    /// Validates a partial update. Absent fields stay untouched, `null` clears a field.
    pub fn validate_patch(
        &self,
        raw: &RawFields,
        upload_slots: &[&str],
    ) -> Result<FieldPatch, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut patch = FieldPatch::default();

        for spec in self.fields {
            match decode_field(spec, raw) {
                FieldInput::Absent => {}
                FieldInput::Null if spec.required => errors.push(spec.name, "cannot be cleared"),
                FieldInput::Null => patch.clear.push(spec.name.to_string()),
                FieldInput::Value(value) => {
                    patch.set.insert(spec.name.to_string(), value);
                }
                FieldInput::Invalid(message) => errors.push(spec.name, message),
            }
        }

        let (is_active, order) = decode_common(raw, &mut errors);
        patch.is_active = is_active;
        patch.order = order;

        for slot in self.media {
            if slot.cardinality != MediaCardinality::Many {
                continue;
            }
            let key = format!("{RETAIN_MEDIA_PREFIX}{}", slot.name);
            if let Some(input) = ListInput::from_raw(raw, &key) {
                patch
                    .retained_media
                    .insert(slot.name.to_string(), input.decode());
            }
        }

        self.check_uploads(upload_slots, false, &mut errors);
        errors.into_result(patch)
    }

    /// Parses one query-string filter against this schema.
    pub fn parse_filter(&self, name: &str, raw: &str) -> Result<FieldFilter, String> {
        let spec = self
            .field(name)
            .filter(|spec| spec.filter != FilterMode::Disabled)
            .ok_or_else(|| format!("`{name}` is not a filterable field of {}", self.kind))?;

        let value = match spec.kind {
            FieldKind::TextList { item_max, choices } => {
                let item = raw.trim();
                check_list_item(item, item_max, choices)?;
                Value::String(item.to_string())
            }
            kind => match coerce_scalar(kind, raw.trim()) {
                Ok(value) => value,
                Err(message) => return Err(format!("`{name}` {message}")),
            },
        };

        Ok(FieldFilter {
            field: spec.name,
            mode: spec.filter,
            value,
        })
    }

    /// In-memory equivalent of the ordering applied by the document store.
    pub fn compare(&self, a: &ResourceRecord, b: &ResourceRecord) -> Ordering {
        for key in self.sort {
            let ordering = match key.field {
                SortField::Order => directed(a.order.cmp(&b.order), key.direction),
                SortField::CreatedAt => directed(a.created_at.cmp(&b.created_at), key.direction),
                SortField::Field(name) => {
                    compare_json(a.fields.get(name), b.fields.get(name), key.direction)
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.id.cmp(&b.id)
    }

    fn check_uploads(&self, upload_slots: &[&str], creating: bool, errors: &mut ValidationErrors) {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for slot in upload_slots {
            *counts.entry(slot).or_default() += 1;
        }

        for (name, count) in &counts {
            match self.media_slot(name) {
                None => errors.push(*name, "is not a media field of this resource"),
                Some(slot) if slot.cardinality == MediaCardinality::Single && *count > 1 => {
                    errors.push(*name, "accepts a single file")
                }
                Some(_) => {}
            }
        }

        if creating {
            for slot in self.media {
                if slot.required && !counts.contains_key(slot.name) {
                    errors.push(slot.name, "is required");
                }
            }
        }
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Missing values sort last in either direction.
fn compare_json(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ordering = match (a, b) {
                (Value::Number(x), Value::Number(y)) => x
                    .as_f64()
                    .partial_cmp(&y.as_f64())
                    .unwrap_or(Ordering::Equal),
                (Value::String(x), Value::String(y)) => x.cmp(y),
                (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                _ => a.to_string().cmp(&b.to_string()),
            };
            directed(ordering, direction)
        }
    }
}

fn decode_common(raw: &RawFields, errors: &mut ValidationErrors) -> (Option<bool>, Option<i32>) {
    let is_active = match raw.scalar(ACTIVE_FIELD).map(str::trim) {
        None | Some("") => None,
        Some(value) => match parse_bool(value) {
            Some(flag) => Some(flag),
            None => {
                errors.push(ACTIVE_FIELD, "must be true or false");
                None
            }
        },
    };

    let order = match raw.scalar(ORDER_FIELD).map(str::trim) {
        None | Some("") => None,
        Some(value) => match value.parse::<i32>() {
            Ok(order) if order >= 0 => Some(order),
            Ok(_) => {
                errors.push(ORDER_FIELD, "cannot be negative");
                None
            }
            Err(_) => {
                errors.push(ORDER_FIELD, "must be an integer");
                None
            }
        },
    };

    (is_active, order)
}

fn decode_field(spec: &FieldSpec, raw: &RawFields) -> FieldInput {
    if let FieldKind::TextList { item_max, choices } = spec.kind {
        let Some(input) = ListInput::from_raw(raw, spec.name) else {
            return FieldInput::Absent;
        };
        if matches!(&input, ListInput::RawString(text) if text.trim() == NULL_LITERAL) {
            return FieldInput::Null;
        }
        let items = input.decode();
        for item in &items {
            if let Err(message) = check_list_item(item, item_max, choices) {
                return FieldInput::Invalid(message);
            }
        }
        if spec.required && items.is_empty() {
            return FieldInput::Invalid("must contain at least one item".to_string());
        }
        return FieldInput::Value(Value::Array(items.into_iter().map(Value::String).collect()));
    }

    let Some(text) = raw.scalar(spec.name) else {
        return FieldInput::Absent;
    };
    let text = text.trim();
    if text.is_empty() || text == NULL_LITERAL {
        return FieldInput::Null;
    }

    match coerce_scalar(spec.kind, text) {
        Ok(value) => FieldInput::Value(value),
        Err(message) => FieldInput::Invalid(message),
    }
}

fn check_list_item(
    item: &str,
    item_max: usize,
    choices: Option<&'static [&'static str]>,
) -> Result<(), String> {
    if item.chars().count() > item_max {
        return Err(format!("items must be at most {item_max} characters"));
    }
    if let Some(choices) = choices
        && !choices.contains(&item)
    {
        return Err(format!("items must be one of: {}", choices.join(", ")));
    }
    Ok(())
}

fn coerce_scalar(kind: FieldKind, text: &str) -> Result<Value, String> {
    match kind {
        FieldKind::Text { max } => {
            if text.chars().count() > max {
                Err(format!("must be at most {max} characters"))
            } else {
                Ok(Value::String(text.to_string()))
            }
        }
        FieldKind::Integer { min, max } => {
            let value = text
                .parse::<i64>()
                .map_err(|_| "must be an integer".to_string())?;
            check_range(value, min, max)?;
            Ok(Value::from(value))
        }
        FieldKind::Year { min } => {
            let value = text
                .parse::<i64>()
                .map_err(|_| "must be a year".to_string())?;
            let max = i64::from(OffsetDateTime::now_utc().year()) + 1;
            check_range(value, min, max)?;
            Ok(Value::from(value))
        }
        FieldKind::Number { min, max } => {
            let value = text
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| "must be a number".to_string())?;
            if value < min {
                return Err(format!("must be at least {min}"));
            }
            if let Some(max) = max
                && value > max
            {
                return Err(format!("must be at most {max}"));
            }
            serde_json::Number::from_f64(value)
                .map(Value::Number)
                .ok_or_else(|| "must be a number".to_string())
        }
        FieldKind::Boolean => parse_bool(text)
            .map(Value::Bool)
            .ok_or_else(|| "must be true or false".to_string()),
        FieldKind::Choice(choices) => {
            if choices.contains(&text) {
                Ok(Value::String(text.to_string()))
            } else {
                Err(format!("must be one of: {}", choices.join(", ")))
            }
        }
        FieldKind::Date => parse_date(text)
            .map(|date| Value::String(date.to_string()))
            .ok_or_else(|| "must be a date (YYYY-MM-DD)".to_string()),
        FieldKind::TextList { .. } => Err("must be a list".to_string()),
    }
}

fn check_range(value: i64, min: i64, max: i64) -> Result<(), String> {
    if value < min {
        Err(format!("must be at least {min}"))
    } else if value > max {
        Err(format!("must be at most {max}"))
    } else {
        Ok(())
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<Date> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .ok()
        .or_else(|| OffsetDateTime::parse(text, &Rfc3339).ok().map(|dt| dt.date()))
}
