//! Selectors and path resolution
//!
//! A selector names a location in the input as one key or a sequence of keys.
//! [`PathResolver`] precomputes the walk once per field so repeated transforms
//! do not re-derive it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Location of a field's source data.
///
/// When deserialized, keys may be strings or unsigned integers, so YAML such
/// as `[items, 0, name]` addresses the first element of `items`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged, from = "SelectorRepr")]
pub enum Selector {
    /// A single key.
    Key(String),

    /// An ordered sequence of keys; empty means the whole input.
    Path(Vec<String>),
}

/// A key as written in a config document.
#[derive(Deserialize)]
#[serde(untagged)]
enum KeyRepr {
    Text(String),
    Index(u64),
}

impl From<KeyRepr> for String {
    fn from(key: KeyRepr) -> Self {
        match key {
            KeyRepr::Text(text) => text,
            KeyRepr::Index(idx) => idx.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SelectorRepr {
    Key(KeyRepr),
    Path(Vec<KeyRepr>),
}

impl From<SelectorRepr> for Selector {
    fn from(repr: SelectorRepr) -> Self {
        match repr {
            SelectorRepr::Key(key) => Self::Key(key.into()),
            SelectorRepr::Path(keys) => Self::Path(keys.into_iter().map(String::from).collect()),
        }
    }
}

impl Selector {
    /// Selector that resolves to the entire input.
    #[must_use]
    pub fn whole() -> Self {
        Self::Path(Vec::new())
    }

    /// The keys walked by this selector, in order.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        match self {
            Self::Key(key) => std::slice::from_ref(key),
            Self::Path(keys) => keys,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keys().join("."))
    }
}

impl From<&str> for Selector {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for Selector {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<Vec<String>> for Selector {
    fn from(keys: Vec<String>) -> Self {
        Self::Path(keys)
    }
}

impl From<Vec<&str>> for Selector {
    fn from(keys: Vec<&str>) -> Self {
        Self::Path(keys.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Selector {
    fn from(keys: [&str; N]) -> Self {
        Self::Path(keys.iter().map(|k| (*k).to_string()).collect())
    }
}

/// One precomputed step of a path walk.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    key: String,
    /// Position used when the current value is a sequence.
    index: Option<usize>,
}

impl Step {
    fn new(key: &str) -> Self {
        // Only canonical decimal keys address sequence positions ("01" does not).
        let index = key
            .parse::<usize>()
            .ok()
            .filter(|idx| idx.to_string() == key);
        Self {
            key: key.to_string(),
            index,
        }
    }
}

/// Resolves a selector against arbitrary nested input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    steps: Vec<Step>,
}

impl PathResolver {
    /// Build a resolver for `selector`.
    #[must_use]
    pub fn new(selector: &Selector) -> Self {
        Self {
            steps: selector.keys().iter().map(|key| Step::new(key)).collect(),
        }
    }

    /// Build the resolver for a field, defaulting the selector to `[name]`.
    #[must_use]
    pub fn for_field(name: &str, selector: Option<&Selector>) -> Self {
        match selector {
            Some(selector) => Self::new(selector),
            None => Self {
                steps: vec![Step::new(name)],
            },
        }
    }

    /// True when the resolver returns its input unchanged.
    #[must_use]
    pub fn is_whole_input(&self) -> bool {
        self.steps.is_empty()
    }

    /// Walk `input` and return the value found, borrowing from `input`.
    ///
    /// Returns `None` as soon as a step is missing or lands on something that
    /// cannot be indexed (including `null`). A `null` reached by the final step
    /// is a real value.
    #[must_use]
    pub fn resolve<'a>(&self, input: &'a Value) -> Option<&'a Value> {
        let mut current = input;
        for step in &self.steps {
            current = match current {
                Value::Object(map) => map.get(&step.key)?,
                Value::Array(items) => items.get(step.index?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for PathResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.steps.iter().map(|s| s.key.as_str()).collect();
        write!(f, "{}", keys.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_key() {
        let resolver = PathResolver::new(&Selector::from("foo"));
        let input = json!({"foo": "asd", "cnt": 2});
        assert_eq!(resolver.resolve(&input), Some(&json!("asd")));
    }

    #[test]
    fn test_nested_path() {
        let resolver = PathResolver::new(&Selector::from(["fields", "sprint", "startDate"]));
        let input = json!({"fields": {"sprint": {"startDate": "2017-05-01"}}});
        assert_eq!(resolver.resolve(&input), Some(&json!("2017-05-01")));
    }

    #[test]
    fn test_missing_segments_yield_none() {
        let resolver = PathResolver::new(&Selector::from(["a", "b", "c"]));

        assert_eq!(resolver.resolve(&json!({})), None);
        assert_eq!(resolver.resolve(&json!({"a": null})), None);
        assert_eq!(resolver.resolve(&json!({"a": {"b": 5}})), None);
        assert_eq!(resolver.resolve(&json!("scalar")), None);
    }

    #[test]
    fn test_final_null_is_a_value() {
        let resolver = PathResolver::new(&Selector::from("a"));
        assert_eq!(resolver.resolve(&json!({"a": null})), Some(&Value::Null));
    }

    #[test]
    fn test_empty_path_is_whole_input() {
        let resolver = PathResolver::new(&Selector::whole());
        let input = json!({"x": 1});
        assert!(resolver.is_whole_input());
        assert!(std::ptr::eq(resolver.resolve(&input).unwrap(), &input));
    }

    #[test]
    fn test_numeric_keys_index_sequences() {
        let resolver = PathResolver::new(&Selector::from(["items", "1", "a"]));
        let input = json!({"items": [{"a": 1}, {"a": 2}]});
        assert_eq!(resolver.resolve(&input), Some(&json!(2)));

        let padded = PathResolver::new(&Selector::from(["items", "01"]));
        assert_eq!(padded.resolve(&input), None);

        let out_of_range = PathResolver::new(&Selector::from(["items", "5"]));
        assert_eq!(out_of_range.resolve(&input), None);
    }

    #[test]
    fn test_numeric_keys_still_match_object_keys() {
        let resolver = PathResolver::new(&Selector::from("0"));
        assert_eq!(resolver.resolve(&json!({"0": true})), Some(&json!(true)));
    }

    #[test]
    fn test_field_name_is_default_selector() {
        let resolver = PathResolver::for_field("count", None);
        assert_eq!(resolver.resolve(&json!({"count": 3})), Some(&json!(3)));
        assert_eq!(resolver.to_string(), "count");
    }

    #[test]
    fn test_selector_deserializes_from_string_or_list() {
        let key: Selector = serde_json::from_value(json!("foo")).unwrap();
        let path: Selector = serde_json::from_value(json!(["a", "b"])).unwrap();
        let empty: Selector = serde_json::from_value(json!([])).unwrap();

        assert_eq!(key, Selector::from("foo"));
        assert_eq!(path.to_string(), "a.b");
        assert_eq!(empty, Selector::whole());
    }

    #[test]
    fn test_selector_deserializes_integer_keys() {
        let path: Selector = serde_json::from_value(json!(["items", 0, "a"])).unwrap();
        let key: Selector = serde_json::from_value(json!(2)).unwrap();

        assert_eq!(path, Selector::from(["items", "0", "a"]));
        assert_eq!(key, Selector::from("2"));
        assert!(serde_json::from_value::<Selector>(json!(["items", -1])).is_err());

        let input = json!({"items": [{"a": "first"}]});
        assert_eq!(PathResolver::new(&path).resolve(&input), Some(&json!("first")));
    }
}
