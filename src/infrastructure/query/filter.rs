// Filter - declarative document predicates shared by store lookups and `Match` stages

use serde_json::Value;

use crate::core::document::{collect_path, values_equal};

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    In(String, Vec<Value>),
    Exists(String, bool),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(path: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(path.to_string(), value.into())
    }

    pub fn is_in<V: Into<Value>>(path: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(path.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn exists(path: &str) -> Self {
        Filter::Exists(path.to_string(), true)
    }

    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, other) => other,
            (first, Filter::All) => first,
            (Filter::And(mut parts), other) => {
                parts.push(other);
                Filter::And(parts)
            }
            (first, other) => Filter::And(vec![first, other]),
        }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    /// Evaluate the predicate against a document.
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(path, expected) => path_equals(doc, path, expected),
            Filter::In(path, candidates) => candidates
                .iter()
                .any(|candidate| path_equals(doc, path, candidate)),
            Filter::Exists(path, wanted) => {
                let present = collect_path(doc, path).iter().any(|v| !v.is_null());
                present == *wanted
            }
            Filter::And(parts) => parts.iter().all(|f| f.matches(doc)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(doc)),
        }
    }
}

fn path_equals(doc: &Value, path: &str, expected: &Value) -> bool {
    let found = collect_path(doc, path);
    if found.is_empty() {
        return expected.is_null();
    }

    found.into_iter().any(|value| match value {
        Value::Array(items) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        other => values_equal(other, expected),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn video() -> Value {
        json!({
            "_id": "v1",
            "owner": "u1",
            "isPublished": true,
            "tags": ["rust", "async"],
            "thumbnail": {"url": "http://cdn/t.png"}
        })
    }

    #[test]
    fn test_equality_and_arrays() {
        let doc = video();
        assert!(Filter::eq("owner", "u1").matches(&doc));
        assert!(!Filter::eq("owner", "u2").matches(&doc));
        assert!(Filter::eq("tags", "rust").matches(&doc));
        assert!(Filter::eq("thumbnail.url", "http://cdn/t.png").matches(&doc));
        assert!(Filter::eq("missing", Value::Null).matches(&doc));
    }

    #[test]
    fn test_combinators() {
        let doc = video();
        let filter = Filter::All
            .and(Filter::eq("owner", "u1"))
            .and(Filter::eq("isPublished", true));
        assert!(matches!(filter, Filter::And(ref parts) if parts.len() == 2));
        assert_eq!(Filter::eq("owner", "u1").and(Filter::All), Filter::eq("owner", "u1"));
        assert!(filter.matches(&doc));

        let either = Filter::or(vec![Filter::eq("owner", "nobody"), Filter::exists("thumbnail")]);
        assert!(either.matches(&doc));
        assert!(Filter::is_in("_id", ["v0", "v1"]).matches(&doc));
        assert!(!Filter::exists("videoFile").matches(&doc));
    }
}
