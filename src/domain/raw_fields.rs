//! Untyped text parts collected from a form submission.

/// Form text parts in arrival order. A name may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    parts: Vec<(String, String)>,
}

/// Literal sent by clients to clear a field during a partial update.
pub const NULL_LITERAL: &str = "null";

impl RawFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parts.push((name.into(), value.into()));
    }

    /// Builder form of [`RawFields::push`], mostly for tests.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// All values sent under exactly `name`, plus `name[]`.
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.parts
            .iter()
            .filter(|(key, _)| key == name || is_bracket_append(key, name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Values sent as `name[0]`, `name[1]`, ... with their parsed index.
    pub fn indexed(&self, name: &str) -> Vec<(usize, String)> {
        self.parts
            .iter()
            .filter_map(|(key, value)| {
                let index = key
                    .strip_prefix(name)?
                    .strip_prefix('[')?
                    .strip_suffix(']')?
                    .parse::<usize>()
                    .ok()?;
                Some((index, value.clone()))
            })
            .collect()
    }

    /// Single scalar value for `name`; the last one wins when repeated.
    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.parts
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.values(name).is_empty() || !self.indexed(name).is_empty()
    }
}

fn is_bracket_append(key: &str, name: &str) -> bool {
    key.strip_prefix(name) == Some("[]")
}

impl<K, V> FromIterator<(K, V)> for RawFields
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = RawFields::new();
        for (name, value) in iter {
            fields.push(name, value);
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_parts_ignore_unrelated_prefixes() {
        let raw = RawFields::new()
            .with("features[1]", "b")
            .with("features[0]", "a")
            .with("featuresx[2]", "nope")
            .with("features[abc]", "nope");
        assert_eq!(
            raw.indexed("features"),
            vec![(1, "b".to_string()), (0, "a".to_string())]
        );
    }

    #[test]
    fn values_include_bracket_append_form() {
        let raw = RawFields::new()
            .with("tags[]", "a")
            .with("tags", "b")
            .with("tagsx", "c");
        assert_eq!(raw.values("tags"), vec!["a", "b"]);
    }

    #[test]
    fn scalar_prefers_the_last_value() {
        let raw = RawFields::new().with("title", "one").with("title", "two");
        assert_eq!(raw.scalar("title"), Some("two"));
        assert!(raw.contains("title"));
        assert!(!raw.contains("missing"));
    }
}
