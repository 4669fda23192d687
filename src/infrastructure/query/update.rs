// Update - field-level mutations applied to a single document

use serde_json::Value;

use crate::core::document::{get_path, get_path_mut, remove_path, set_path, values_equal};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Set(String, Value),
    Unset(String),
    /// Flip a boolean field; a missing field counts as `false`.
    Toggle(String),
    Inc(String, i64),
    /// Append unless an equal element is already present.
    AddToSet(String, Value),
    /// Remove every element equal to the value.
    Pull(String, Value),
}

impl Update {
    pub fn set(path: &str, value: impl Into<Value>) -> Self {
        Update::Set(path.to_string(), value.into())
    }

    pub fn unset(path: &str) -> Self {
        Update::Unset(path.to_string())
    }

    pub fn toggle(path: &str) -> Self {
        Update::Toggle(path.to_string())
    }

    pub fn inc(path: &str, by: i64) -> Self {
        Update::Inc(path.to_string(), by)
    }

    pub fn add_to_set(path: &str, value: impl Into<Value>) -> Self {
        Update::AddToSet(path.to_string(), value.into())
    }

    pub fn pull(path: &str, value: impl Into<Value>) -> Self {
        Update::Pull(path.to_string(), value.into())
    }

    pub fn apply(&self, doc: &mut Value) -> AppResult<()> {
        match self {
            Update::Set(path, value) => set_path(doc, path, value.clone()),
            Update::Unset(path) => {
                remove_path(doc, path);
            }
            Update::Toggle(path) => {
                let current = match get_path(doc, path) {
                    None | Some(Value::Null) => false,
                    Some(Value::Bool(b)) => *b,
                    Some(_) => {
                        return Err(AppError::Internal(format!("cannot toggle non-boolean field {}", path)))
                    }
                };
                set_path(doc, path, Value::Bool(!current));
            }
            Update::Inc(path, by) => {
                let current = match get_path(doc, path) {
                    None | Some(Value::Null) => 0,
                    Some(value) => value.as_i64().ok_or_else(|| {
                        AppError::Internal(format!("cannot increment non-integer field {}", path))
                    })?,
                };
                set_path(doc, path, Value::from(current.saturating_add(*by)));
            }
            Update::AddToSet(path, value) => match get_path_mut(doc, path) {
                Some(Value::Array(items)) => {
                    if !items.iter().any(|item| values_equal(item, value)) {
                        items.push(value.clone());
                    }
                }
                None | Some(Value::Null) => set_path(doc, path, Value::Array(vec![value.clone()])),
                Some(_) => {
                    return Err(AppError::Internal(format!("cannot add to non-array field {}", path)))
                }
            },
            Update::Pull(path, value) => {
                if let Some(Value::Array(items)) = get_path_mut(doc, path) {
                    items.retain(|item| !values_equal(item, value));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_toggle_twice_restores_state() {
        let mut doc = json!({"isPublished": false});
        Update::toggle("isPublished").apply(&mut doc).unwrap();
        assert_eq!(doc["isPublished"], json!(true));
        Update::toggle("isPublished").apply(&mut doc).unwrap();
        assert_eq!(doc["isPublished"], json!(false));

        let mut missing = json!({});
        Update::toggle("isPublished").apply(&mut missing).unwrap();
        assert_eq!(missing["isPublished"], json!(true));
    }

    #[test]
    fn test_set_semantics() {
        let mut doc = json!({"videos": []});
        Update::add_to_set("videos", "v1").apply(&mut doc).unwrap();
        Update::add_to_set("videos", "v2").apply(&mut doc).unwrap();
        Update::add_to_set("videos", "v1").apply(&mut doc).unwrap();
        assert_eq!(doc["videos"], json!(["v1", "v2"]));

        Update::pull("videos", "v1").apply(&mut doc).unwrap();
        assert_eq!(doc["videos"], json!(["v2"]));
    }

    #[test]
    fn test_inc_and_unset() {
        let mut doc = json!({"views": 4, "refreshToken": "abc"});
        Update::inc("views", 1).apply(&mut doc).unwrap();
        Update::unset("refreshToken").apply(&mut doc).unwrap();
        assert_eq!(doc, json!({"views": 5}));

        let mut busy = json!({"views": i64::MAX});
        Update::inc("views", 1).apply(&mut busy).unwrap();
        assert_eq!(busy["views"], json!(i64::MAX));

        let mut bad = json!({"views": "many"});
        assert!(Update::inc("views", 1).apply(&mut bad).is_err());
    }
}
