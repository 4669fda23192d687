// Database Interface - document store operations consumed by entities and feeds
// Documents are JSON objects grouped into named collections.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::core::DocId;
use crate::error::AppResult;
use crate::infrastructure::query::{paginate, Filter, Page, PageRequest, Pipeline, Update};

/// One delete-by-filter step of a cascading delete.
#[derive(Debug, Clone)]
pub struct DeleteOp {
    pub collection: String,
    pub filter: Filter,
}

impl DeleteOp {
    pub fn new(collection: &str, filter: Filter) -> Self {
        Self {
            collection: collection.to_string(),
            filter,
        }
    }
}

/// Document store interface.
///
/// `insert` stamps `_id`, `createdAt` and `updatedAt` when the document does
/// not carry them; updates refresh `updatedAt`. Unique keys are opaque strings
/// scoped to a collection, and inserting a duplicate fails with a conflict.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: &str, doc: Value, unique_keys: &[String]) -> AppResult<Value>;

    async fn find_by_id(&self, collection: &str, id: DocId) -> AppResult<Option<Value>>;
    async fn find_one(&self, collection: &str, filter: &Filter) -> AppResult<Option<Value>>;
    async fn find(&self, collection: &str, filter: &Filter) -> AppResult<Vec<Value>>;
    async fn count(&self, collection: &str, filter: &Filter) -> AppResult<u64>;

    async fn exists(&self, collection: &str, filter: &Filter) -> AppResult<bool> {
        Ok(self.count(collection, filter).await? > 0)
    }

    /// Atomically apply `updates` to the first document matching `filter` and
    /// return the new version. The filter is re-evaluated against the state
    /// the updates are applied to, so a field flip happens exactly once per
    /// call even under concurrent writers. `replace_keys` swaps the
    /// document's unique keys in the same transaction.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        updates: &[Update],
        replace_keys: Option<Vec<String>>,
    ) -> AppResult<Option<Value>>;

    async fn delete_one(&self, collection: &str, filter: &Filter) -> AppResult<Option<Value>>;
    async fn delete_many(&self, collection: &str, filter: &Filter) -> AppResult<u64>;

    /// Run several deletes inside one transaction: either all of them apply
    /// or none does. Returns the number of documents removed per step.
    async fn delete_cascade(&self, ops: &[DeleteOp]) -> AppResult<Vec<u64>>;

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> AppResult<Vec<Value>>;

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        updates: &[Update],
    ) -> AppResult<Option<Value>> {
        self.update_one(collection, filter, updates, None).await
    }

    /// Run the pipeline, then slice the result into a page.
    async fn aggregate_paginate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
        page: PageRequest,
    ) -> AppResult<Page> {
        let docs = self.aggregate(collection, pipeline).await?;
        Ok(paginate(docs, page))
    }

    async fn health_check(&self) -> AppResult<()>;
}

pub type Store = Arc<dyn DocumentStore>;
