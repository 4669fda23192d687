// Pipeline executor - evaluates aggregation stages over in-memory documents.
// The store loads the source documents and the records each lookup can join
// against, then hands them here.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use super::pipeline::{Accumulator, Expr, Lookup, Projection, SortOrder, Stage};
use crate::core::document::{collect_path, compare_values, get_path, remove_path, set_path, values_equal};
use crate::error::{AppError, AppResult};

/// Snapshot of the collections a pipeline may join against.
#[derive(Debug, Default)]
pub struct Collections {
    docs: HashMap<String, Vec<Value>>,
}

impl Collections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, docs: Vec<Value>) {
        self.docs.insert(name.to_string(), docs);
    }

    fn get(&self, name: &str) -> AppResult<&[Value]> {
        self.docs
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| AppError::Internal(format!("collection {} was not loaded for lookup", name)))
    }
}

pub fn execute(mut docs: Vec<Value>, stages: &[Stage], collections: &Collections) -> AppResult<Vec<Value>> {
    for stage in stages {
        docs = match stage {
            Stage::Search { query, paths } => search(docs, query, paths),
            Stage::Match(filter) => docs.into_iter().filter(|d| filter.matches(d)).collect(),
            Stage::Sort(keys) => {
                sort(&mut docs, keys);
                docs
            }
            Stage::Lookup(lookup) => self::lookup(docs, lookup, collections)?,
            Stage::Unwind { path, preserve_empty } => unwind(docs, path, *preserve_empty),
            Stage::AddFields(fields) => {
                for doc in docs.iter_mut() {
                    for (path, expr) in fields {
                        let value = evaluate(doc, expr);
                        set_path(doc, path, value);
                    }
                }
                docs
            }
            Stage::Group { key, fields } => group(docs, key.as_deref(), fields),
            Stage::Project(projection) => docs.iter().map(|d| project(d, projection)).collect(),
        };
    }
    Ok(docs)
}

fn search(docs: Vec<Value>, query: &str, paths: &[String]) -> Vec<Value> {
    let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if terms.is_empty() {
        return docs;
    }

    docs.into_iter()
        .filter(|doc| {
            let haystack: String = paths
                .iter()
                .flat_map(|path| collect_path(doc, path))
                .filter_map(Value::as_str)
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
                .join(" ");
            terms.iter().any(|term| haystack.contains(term.as_str()))
        })
        .collect()
}

fn sort(docs: &mut [Value], keys: &[(String, SortOrder)]) {
    docs.sort_by(|a, b| {
        for (path, order) in keys {
            let left = get_path(a, path).unwrap_or(&Value::Null);
            let right = get_path(b, path).unwrap_or(&Value::Null);
            let ord = match order {
                SortOrder::Ascending => compare_values(left, right),
                SortOrder::Descending => compare_values(right, left),
            };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });
}

fn lookup(docs: Vec<Value>, lookup: &Lookup, collections: &Collections) -> AppResult<Vec<Value>> {
    let foreign = collections.get(&lookup.from)?;
    let mut out = Vec::with_capacity(docs.len());

    for mut doc in docs {
        let locals: Vec<Value> = match get_path(&doc, &lookup.local_field) {
            Some(Value::Array(items)) => items.clone(),
            Some(value) => vec![value.clone()],
            None => vec![Value::Null],
        };

        // Joined records follow the order of the local values.
        let mut taken = vec![false; foreign.len()];
        let mut joined = Vec::new();
        for local in &locals {
            for (idx, candidate) in foreign.iter().enumerate() {
                if taken[idx] {
                    continue;
                }
                let foreign_value = get_path(candidate, &lookup.foreign_field).unwrap_or(&Value::Null);
                if values_equal(foreign_value, local) {
                    taken[idx] = true;
                    joined.push(candidate.clone());
                }
            }
        }

        let joined = execute(joined, &lookup.pipeline, collections)?;
        set_path(&mut doc, &lookup.as_field, Value::Array(joined));
        out.push(doc);
    }

    Ok(out)
}

fn unwind(docs: Vec<Value>, path: &str, preserve_empty: bool) -> Vec<Value> {
    let mut out = Vec::new();
    for mut doc in docs {
        match get_path(&doc, path).cloned() {
            Some(Value::Array(items)) if !items.is_empty() => {
                for item in items {
                    let mut copy = doc.clone();
                    set_path(&mut copy, path, item);
                    out.push(copy);
                }
            }
            Some(Value::Array(_)) | Some(Value::Null) | None => {
                if preserve_empty {
                    remove_path(&mut doc, path);
                    out.push(doc);
                }
            }
            Some(_) => out.push(doc),
        }
    }
    out
}

fn evaluate(doc: &Value, expr: &Expr) -> Value {
    match expr {
        Expr::Size(path) => match get_path(doc, path) {
            Some(Value::Array(items)) => Value::from(items.len() as u64),
            _ => Value::from(0u64),
        },
        Expr::Sum(path) => sum_numbers(collect_path(doc, path)),
        Expr::First(path) => match get_path(doc, path) {
            Some(Value::Array(items)) => items.first().cloned().unwrap_or(Value::Null),
            Some(other) => other.clone(),
            None => Value::Null,
        },
        Expr::Contains(path, needle) => Value::Bool(
            collect_path(doc, path)
                .into_iter()
                .any(|candidate| values_equal(candidate, needle)),
        ),
    }
}

fn sum_numbers<'a>(values: impl IntoIterator<Item = &'a Value>) -> Value {
    let mut int_total: i64 = 0;
    let mut float_total: f64 = 0.0;
    let mut saw_float = false;

    for value in values {
        if let Some(i) = value.as_i64() {
            int_total = int_total.saturating_add(i);
        } else if let Some(f) = value.as_f64() {
            float_total += f;
            saw_float = true;
        }
    }

    if saw_float {
        Value::from(float_total + int_total as f64)
    } else {
        Value::from(int_total)
    }
}

fn group(docs: Vec<Value>, key: Option<&str>, fields: &[(String, Accumulator)]) -> Vec<Value> {
    let mut groups: Vec<(Value, Vec<Value>)> = Vec::new();
    for doc in docs {
        let group_key = key
            .and_then(|k| get_path(&doc, k).cloned())
            .unwrap_or(Value::Null);
        match groups.iter_mut().find(|(k, _)| values_equal(k, &group_key)) {
            Some((_, members)) => members.push(doc),
            None => groups.push((group_key, vec![doc])),
        }
    }

    // A keyless group over nothing still reports its accumulators.
    if groups.is_empty() && key.is_none() {
        groups.push((Value::Null, Vec::new()));
    }

    groups
        .into_iter()
        .map(|(group_key, members)| {
            let mut out = Map::new();
            out.insert("_id".to_string(), group_key);
            for (name, acc) in fields {
                let value = match acc {
                    Accumulator::Count => Value::from(members.len() as u64),
                    Accumulator::Sum(path) => {
                        sum_numbers(members.iter().flat_map(|m| collect_path(m, path)))
                    }
                };
                out.insert(name.clone(), value);
            }
            Value::Object(out)
        })
        .collect()
}

#[derive(Debug, Default)]
struct ProjectionTree {
    children: BTreeMap<String, ProjectionTree>,
}

impl ProjectionTree {
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn insert(&mut self, path: &str) {
        let mut node = self;
        for segment in path.split('.') {
            node = node.children.entry(segment.to_string()).or_default();
        }
    }
}

fn project(doc: &Value, projection: &Projection) -> Value {
    let mut tree = ProjectionTree::default();
    if !projection.exclude_id {
        tree.insert("_id");
    }
    for path in &projection.include {
        tree.insert(path);
    }
    project_node(doc, &tree).unwrap_or_else(|| Value::Object(Map::new()))
}

fn project_node(value: &Value, tree: &ProjectionTree) -> Option<Value> {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, child) in map {
                let Some(subtree) = tree.children.get(key) else {
                    continue;
                };
                if subtree.is_leaf() {
                    out.insert(key.clone(), child.clone());
                } else if let Some(projected) = project_node(child, subtree) {
                    out.insert(key.clone(), projected);
                }
            }
            Some(Value::Object(out))
        }
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .filter(|item| item.is_object() || item.is_array())
                .filter_map(|item| project_node(item, tree))
                .collect(),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::query::{Filter, Pipeline};
    use serde_json::json;

    fn users() -> Vec<Value> {
        vec![
            json!({"_id": "u1", "username": "ana", "fullName": "Ana", "password": "secret", "avatar": "a.png"}),
            json!({"_id": "u2", "username": "bo", "fullName": "Bo", "password": "secret", "avatar": "b.png"}),
        ]
    }

    fn videos() -> Vec<Value> {
        vec![
            json!({"_id": "v1", "owner": "u1", "title": "Rust ownership", "description": "borrowing", "views": 10, "isPublished": true}),
            json!({"_id": "v2", "owner": "u2", "title": "Cooking pasta", "description": "al dente", "views": 3, "isPublished": false}),
            json!({"_id": "v3", "owner": "ghost", "title": "Orphan", "description": "no owner", "views": 7, "isPublished": true}),
        ]
    }

    fn collections() -> Collections {
        let mut c = Collections::new();
        c.insert("users", users());
        c.insert("videos", videos());
        c
    }

    #[test]
    fn test_search_matches_title_or_description() {
        let out = execute(
            videos(),
            &Pipeline::new().search("RUST dente", &["title", "description"]).stages,
            &collections(),
        )
        .unwrap();
        let ids: Vec<_> = out.iter().map(|d| d["_id"].clone()).collect();
        assert_eq!(ids, vec![json!("v1"), json!("v2")]);
    }

    #[test]
    fn test_lookup_unwind_drops_missing_join_targets() {
        let pipeline = Pipeline::new()
            .lookup(
                Lookup::new("users", "owner", "_id", "ownerDetails")
                    .pipeline(Pipeline::new().project(Projection::include(["username", "avatar"]))),
            )
            .unwind("ownerDetails");
        let out = execute(videos(), &pipeline.stages, &collections()).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["ownerDetails"], json!({"_id": "u1", "username": "ana", "avatar": "a.png"}));
        assert!(out.iter().all(|d| d["ownerDetails"].get("password").is_none()));
    }

    #[test]
    fn test_lookup_array_keeps_local_order_and_aggregates() {
        let playlist = json!({"_id": "p1", "name": "mix", "videos": ["v3", "v1", "v2"]});
        let pipeline = Pipeline::new()
            .lookup(
                Lookup::new("videos", "videos", "_id", "videos")
                    .pipeline(Pipeline::new().matching(Filter::eq("isPublished", true))),
            )
            .add_fields(vec![
                ("totalVideos", Expr::Size("videos".into())),
                ("totalViews", Expr::Sum("videos.views".into())),
            ]);
        let out = execute(vec![playlist], &pipeline.stages, &collections()).unwrap();

        let ids: Vec<_> = out[0]["videos"].as_array().unwrap().iter().map(|v| v["_id"].clone()).collect();
        assert_eq!(ids, vec![json!("v3"), json!("v1")]);
        assert_eq!(out[0]["totalVideos"], json!(2));
        assert_eq!(out[0]["totalViews"], json!(17));
    }

    #[test]
    fn test_projection_is_a_whitelist_through_arrays() {
        let doc = json!({
            "_id": "p1",
            "secret": "x",
            "videos": [
                {"_id": "v1", "title": "t", "videoFile": {"url": "u", "public_id": "pid"}},
                "not-a-document"
            ]
        });
        let projection = Projection::include(["videos._id", "videos.videoFile.url"]).without_id();
        let out = project(&doc, &projection);
        assert_eq!(out, json!({"videos": [{"_id": "v1", "videoFile": {"url": "u"}}]}));
    }

    #[test]
    fn test_sort_and_group() {
        let stages = Pipeline::new().sort("views", SortOrder::Descending).stages;
        let out = execute(videos(), &stages, &collections()).unwrap();
        let views: Vec<_> = out.iter().map(|d| d["views"].as_i64().unwrap()).collect();
        assert_eq!(views, vec![10, 7, 3]);

        let stages = Pipeline::new()
            .group(None, vec![("total", Accumulator::Count), ("views", Accumulator::Sum("views".into()))])
            .stages;
        let out = execute(videos(), &stages, &collections()).unwrap();
        assert_eq!(out, vec![json!({"_id": null, "total": 3, "views": 20})]);

        let out = execute(Vec::new(), &stages, &collections()).unwrap();
        assert_eq!(out, vec![json!({"_id": null, "total": 0, "views": 0})]);
    }

    #[test]
    fn test_sum_saturates_instead_of_overflowing() {
        let docs = vec![json!({"views": i64::MAX}), json!({"views": 5})];
        let stages = Pipeline::new()
            .group(None, vec![("views", Accumulator::Sum("views".into()))])
            .stages;
        let out = execute(docs, &stages, &collections()).unwrap();
        assert_eq!(out[0]["views"], json!(i64::MAX));
    }

    #[test]
    fn test_contains_flags_membership() {
        let doc = json!({"_id": "t1", "likes": [{"likedBy": "u1"}, {"likedBy": "u2"}]});
        let stages = Pipeline::new()
            .add_fields(vec![
                ("isLiked", Expr::Contains("likes.likedBy".into(), json!("u2"))),
                ("isLikedByGhost", Expr::Contains("likes.likedBy".into(), json!("ghost"))),
            ])
            .stages;
        let out = execute(vec![doc], &stages, &collections()).unwrap();
        assert_eq!(out[0]["isLiked"], json!(true));
        assert_eq!(out[0]["isLikedByGhost"], json!(false));
    }
}
