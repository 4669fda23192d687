// Document helpers - dotted path access and value ordering over JSON documents

use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Fetch the value at a dotted path without descending into arrays.
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Collect every value reachable at a dotted path, fanning out through arrays
/// the way a document store resolves `field.sub` against an array of objects.
pub fn collect_path<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    collect_segments(doc, &segments, &mut out);
    out
}

fn collect_segments<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };

    match value {
        Value::Object(map) => {
            if let Some(next) = map.get(*head) {
                collect_segments(next, rest, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_segments(item, segments, out);
            }
        }
        _ => {}
    }
}

/// Set the value at a dotted path, creating intermediate objects as needed.
/// Non-object intermediates are replaced.
pub fn set_path(doc: &mut Value, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = doc;

    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };

        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Remove the value at a dotted path, returning it when present.
pub fn remove_path(doc: &mut Value, path: &str) -> Option<Value> {
    let (parent, last) = match path.rsplit_once('.') {
        Some((parent, last)) => (get_path_mut(doc, parent)?, last),
        None => (doc, path),
    };
    parent.as_object_mut()?.remove(last)
}

pub fn get_path_mut<'a>(doc: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    Some(current)
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order over JSON values: null < numbers < strings < objects < arrays < booleans.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let ord = compare_values(left, right);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            for ((lk, lv), (rk, rv)) in x.iter().zip(y.iter()) {
                let ord = lk.cmp(rk).then_with(|| compare_values(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Equality that treats 1 and 1.0 as the same number.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Ordering::Equal && type_rank(a) == type_rank(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_and_collect() {
        let doc = json!({
            "owner": {"username": "ana"},
            "videos": [{"views": 3}, {"views": 4}, {"title": "no views"}]
        });
        assert_eq!(get_path(&doc, "owner.username"), Some(&json!("ana")));
        assert_eq!(get_path(&doc, "videos.views"), None);

        let views: Vec<_> = collect_path(&doc, "videos.views").into_iter().cloned().collect();
        assert_eq!(views, vec![json!(3), json!(4)]);
    }

    #[test]
    fn test_set_and_remove() {
        let mut doc = json!({"title": "a"});
        set_path(&mut doc, "thumbnail.url", json!("http://x/y.png"));
        assert_eq!(doc, json!({"title": "a", "thumbnail": {"url": "http://x/y.png"}}));

        assert_eq!(remove_path(&mut doc, "thumbnail.url"), Some(json!("http://x/y.png")));
        assert_eq!(remove_path(&mut doc, "missing"), None);
        assert_eq!(doc, json!({"title": "a", "thumbnail": {}}));
    }

    #[test]
    fn test_ordering() {
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&Value::Null, &json!(0)), Ordering::Less);
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(!values_equal(&json!(false), &Value::Null));
    }
}
