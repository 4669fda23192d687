// Aggregation pipeline - ordered, declarative read stages executed by the document store

use serde_json::Value;

use super::filter::Filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// "asc" selects ascending; any other token sorts descending.
    pub fn from_token(token: &str) -> Self {
        if token.trim().eq_ignore_ascii_case("asc") {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        }
    }
}

/// Computed field expressions for `AddFields`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Length of the array at the path, 0 when absent.
    Size(String),
    /// Sum of every number reachable at the path (fans out through arrays).
    Sum(String),
    /// First element of the array at the path, null when empty.
    First(String),
    /// Whether any value reachable at the path equals the given value.
    Contains(String, Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Count,
    Sum(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    pub as_field: String,
    pub pipeline: Vec<Stage>,
}

impl Lookup {
    pub fn new(from: &str, local_field: &str, foreign_field: &str, as_field: &str) -> Self {
        Self {
            from: from.to_string(),
            local_field: local_field.to_string(),
            foreign_field: foreign_field.to_string(),
            as_field: as_field.to_string(),
            pipeline: Vec::new(),
        }
    }

    /// Stages run against the joined records of each document.
    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline.stages;
        self
    }
}

/// Include-only field whitelist.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub include: Vec<String>,
    pub exclude_id: bool,
}

impl Projection {
    pub fn include<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: paths.into_iter().map(Into::into).collect(),
            exclude_id: false,
        }
    }

    pub fn without_id(mut self) -> Self {
        self.exclude_id = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Search { query: String, paths: Vec<String> },
    Match(Filter),
    Sort(Vec<(String, SortOrder)>),
    Lookup(Lookup),
    Unwind { path: String, preserve_empty: bool },
    AddFields(Vec<(String, Expr)>),
    Group { key: Option<String>, fields: Vec<(String, Accumulator)> },
    Project(Projection),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn search(self, query: &str, paths: &[&str]) -> Self {
        self.push(Stage::Search {
            query: query.to_string(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
        })
    }

    pub fn matching(self, filter: Filter) -> Self {
        self.push(Stage::Match(filter))
    }

    pub fn sort(self, path: &str, order: SortOrder) -> Self {
        self.push(Stage::Sort(vec![(path.to_string(), order)]))
    }

    pub fn lookup(self, lookup: Lookup) -> Self {
        self.push(Stage::Lookup(lookup))
    }

    pub fn unwind(self, path: &str) -> Self {
        self.push(Stage::Unwind {
            path: path.to_string(),
            preserve_empty: false,
        })
    }

    pub fn add_fields(self, fields: Vec<(&str, Expr)>) -> Self {
        self.push(Stage::AddFields(
            fields.into_iter().map(|(k, e)| (k.to_string(), e)).collect(),
        ))
    }

    pub fn group(self, key: Option<&str>, fields: Vec<(&str, Accumulator)>) -> Self {
        self.push(Stage::Group {
            key: key.map(str::to_string),
            fields: fields.into_iter().map(|(k, a)| (k.to_string(), a)).collect(),
        })
    }

    pub fn project(self, projection: Projection) -> Self {
        self.push(Stage::Project(projection))
    }
}
