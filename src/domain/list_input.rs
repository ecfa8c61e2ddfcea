//! Normalizing decoder for list-valued form fields.
//!
//! Clients encode lists three ways: a single text part holding JSON, repeated parts
//! under one name, or indexed parts such as `features[0]`, `features[1]`. All of them
//! decode to the same ordered `Vec<String>`.

use serde_json::Value;

use super::raw_fields::RawFields;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListInput {
    RawString(String),
    RawArray(Vec<String>),
    IndexedFields(Vec<(usize, String)>),
}

impl ListInput {
    /// Picks the wire encoding used for `name`, or `None` when the field was not sent.
    ///
    /// Indexed parts win over plain ones when a client mixes both.
    pub fn from_raw(raw: &RawFields, name: &str) -> Option<Self> {
        let indexed = raw.indexed(name);
        if !indexed.is_empty() {
            return Some(ListInput::IndexedFields(indexed));
        }

        let mut values = raw.values(name);
        match values.len() {
            0 => None,
            1 => values.pop().map(|v| ListInput::RawString(v.to_string())),
            _ => Some(ListInput::RawArray(
                values.into_iter().map(str::to_string).collect(),
            )),
        }
    }

    pub fn decode(self) -> Vec<String> {
        let items = match self {
            ListInput::RawString(text) => decode_text(&text),
            ListInput::RawArray(items) => items,
            ListInput::IndexedFields(mut items) => {
                items.sort_by_key(|(index, _)| *index);
                items.into_iter().map(|(_, value)| value).collect()
            }
        };

        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }
}

fn decode_text(text: &str) -> Vec<String> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Array(items)) => items.into_iter().filter_map(scalar_to_string).collect(),
        Ok(Value::String(item)) => vec![item],
        _ => vec![text.to_string()],
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
