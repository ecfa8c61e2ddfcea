//! Cache key generation and wildcard patterns.

use regex::Regex;

/// Builds a deterministic key from a namespace and a set of parameters.
///
/// Parameters are sorted by name and absent values are dropped, so equal parameter
/// sets always produce the same key regardless of insertion order. Separators inside
/// names and values are backslash-escaped so distinct parameter sets never share a key.
///
/// ```
/// use fortview::cache::generate_key;
///
/// let key = generate_key(
///     "events:items",
///     [("page", Some("2".to_string())), ("category", None), ("limit", Some("10".to_string()))],
/// );
/// assert_eq!(key, "events:items:limit:10|page:2");
/// ```
pub fn generate_key<I, K>(namespace: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, Option<String>)>,
    K: Into<String>,
{
    let mut present: Vec<(String, String)> = params
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name.into(), value)))
        .collect();
    if present.is_empty() {
        return namespace.to_string();
    }
    present.sort();

    let joined = present
        .iter()
        .map(|(name, value)| format!("{}:{}", escape(name), escape(value)))
        .collect::<Vec<_>>()
        .join("|");
    format!("{namespace}:{joined}")
}

fn escape(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for ch in part.chars() {
        if matches!(ch, '\\' | '|' | ':') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Glob over cache keys where `*` matches any substring, anchored at both ends.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    regex: Regex,
}

impl KeyPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        Ok(Self {
            regex: Regex::new(&format!("^{body}$"))?,
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn key_is_invariant_under_param_order() {
        let a = generate_key("awards:items", [("page", some("1")), ("year", some("2024"))]);
        let b = generate_key("awards:items", [("year", some("2024")), ("page", some("1"))]);
        assert_eq!(a, b);
        assert_eq!(a, "awards:items:page:1|year:2024");
    }

    #[test]
    fn absent_params_are_omitted() {
        let key = generate_key("games:items", [("category", None), ("page", some("3"))]);
        assert_eq!(key, "games:items:page:3");
        assert!(!key.contains("None"));
    }

    #[test]
    fn no_params_yields_namespace() {
        let key = generate_key::<_, &str>("offers:items", []);
        assert_eq!(key, "offers:items");
    }

    #[test]
    fn separators_in_values_cannot_forge_another_param_set() {
        let two = generate_key(
            "activities:items",
            [("category", some("a")), ("difficulty", some("Hard"))],
        );
        let one = generate_key("activities:items", [("category", some("a|difficulty:Hard"))]);
        assert_ne!(one, two);
        assert_eq!(one, r"activities:items:category:a\|difficulty\:Hard");
    }

    #[test]
    fn backslashes_are_escaped_too() {
        let a = generate_key("events:items", [("category", some(r"x\"))]);
        let b = generate_key("events:items", [("category", some(r"x\\"))]);
        assert_ne!(a, b);
    }

    #[test]
    fn pattern_matches_prefix_only() {
        let pattern = KeyPattern::new("foo*").unwrap();
        assert!(pattern.matches("foo"));
        assert!(pattern.matches("foo:items:page:1"));
        assert!(!pattern.matches("xfoo"));
        assert!(!pattern.matches("bar:foo"));
    }

    #[test]
    fn pattern_treats_other_characters_literally() {
        let pattern = KeyPattern::new("a.b|c*").unwrap();
        assert!(pattern.matches("a.b|c:1"));
        assert!(!pattern.matches("axb|c:1"));
    }

    #[test]
    fn inner_wildcards_match_substrings() {
        let pattern = KeyPattern::new("events:*:page:1").unwrap();
        assert!(pattern.matches("events:items:page:1"));
        assert!(!pattern.matches("events:items:page:12"));
    }
}
