use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    sqlite::{
        Sqlite, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    },
    Executor, Row,
};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::core::document::get_path;
use crate::core::{DocId, Timestamp};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{DeleteOp, DocumentStore};
use crate::infrastructure::query::{executor, Collections, Filter, Pipeline, Stage, Update};

/// Attempts made by `update_one` before giving up on a contended document.
const MAX_UPDATE_ATTEMPTS: usize = 8;

/// Largest value list pushed into an SQL `IN (...)`; longer lists are
/// filtered in memory instead.
const MAX_BOUND_VALUES: usize = 500;

/// Join targets loaded for one aggregation, keyed by collection then rowid.
type JoinedRows = HashMap<String, BTreeMap<i64, Value>>;

/// SQLite implementation of the document store. Each document is a JSON text
/// column keyed by (collection, id) with a version counter used for
/// compare-and-swap updates.
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

struct StoredRow {
    rowid: i64,
    id: String,
    version: i64,
    doc: Value,
}

impl SqliteDocumentStore {
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::ConfigurationError(format!("Invalid DATABASE_URL: {}", e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        if let Some(parent) = options.clone().get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::ConfigurationError(format!("Cannot create database directory: {}", e))
                })?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to SQLite: {}", e)))?;

        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    /// Private in-memory database, used by tests. A single connection keeps
    /// every query on the same memory database.
    pub async fn new_in_memory() -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to connect to in-memory SQLite: {}", e))
            })?;

        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    /// Create the document tables if they do not exist yet
    pub async fn initialize(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create documents table: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS document_keys (
                collection TEXT NOT NULL,
                unique_key TEXT NOT NULL,
                id TEXT NOT NULL,
                PRIMARY KEY (collection, unique_key)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to create document keys table: {}", e))
        })?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_document_keys_id ON document_keys(collection, id)")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create document keys index: {}", e)))?;

        Ok(())
    }

    /// Rows of `collection` matching `filter`, in insertion order. The SQL
    /// narrows what it can and the filter is re-checked on every decoded row.
    async fn load_matching<'e, E>(
        executor: E,
        collection: &str,
        filter: &Filter,
        first_only: bool,
    ) -> AppResult<Vec<StoredRow>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let narrowed = SqlFilter::new(filter);
        let mut sql = format!(
            "SELECT rowid, id, version, data FROM documents WHERE {} ORDER BY rowid",
            narrowed.where_clause()
        );
        if first_only && narrowed.exact {
            sql.push_str(" LIMIT 1");
        }

        let mut query = sqlx::query(&sql).bind(collection);
        for value in &narrowed.binds {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(executor)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to scan {}: {}", collection, e)))?;

        let mut out = Vec::new();
        for row in rows {
            let row = stored_row(row)?;
            if filter.matches(&row.doc) {
                out.push(row);
                if first_only {
                    break;
                }
            }
        }
        Ok(out)
    }

    async fn first_match(&self, collection: &str, filter: &Filter) -> AppResult<Option<StoredRow>> {
        Ok(Self::load_matching(&self.pool, collection, filter, true)
            .await?
            .into_iter()
            .next())
    }

    /// Load the foreign records every lookup in `stages` can join against,
    /// given the documents entering those stages. Nested lookups are seeded
    /// with the records their parent lookup loaded.
    fn load_join_targets<'a>(
        &'a self,
        stages: &'a [Stage],
        seed: &'a [Value],
        joined: &'a mut JoinedRows,
    ) -> Pin<Box<dyn Future<Output = AppResult<()>> + Send + 'a>> {
        Box::pin(async move {
            for (idx, stage) in stages.iter().enumerate() {
                let Stage::Lookup(lookup) = stage else {
                    continue;
                };

                let filter = if keeps_field(&stages[..idx], &lookup.local_field) {
                    join_keys(seed, &lookup.local_field)
                        .map(|keys| Filter::In(lookup.foreign_field.clone(), keys))
                        .unwrap_or(Filter::All)
                } else {
                    Filter::All
                };

                let rows = Self::load_matching(&self.pool, &lookup.from, &filter, false).await?;
                let targets: Vec<Value> = rows.iter().map(|row| row.doc.clone()).collect();
                joined
                    .entry(lookup.from.clone())
                    .or_default()
                    .extend(rows.into_iter().map(|row| (row.rowid, row.doc)));

                self.load_join_targets(&lookup.pipeline, &targets, joined).await?;
            }
            Ok(())
        })
    }

    async fn insert_key<'e, E>(
        executor: E,
        collection: &str,
        id: &str,
        key: &str,
    ) -> AppResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("INSERT INTO document_keys (collection, unique_key, id) VALUES (?, ?, ?)")
            .bind(collection)
            .bind(key)
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| map_unique_violation(e, collection))?;
        Ok(())
    }
}

fn stored_row(row: SqliteRow) -> AppResult<StoredRow> {
    let data: String = row.get("data");
    Ok(StoredRow {
        rowid: row.get("rowid"),
        id: row.get("id"),
        version: row.get("version"),
        doc: serde_json::from_str(&data)?,
    })
}

/// SQL narrowing of a `Filter`. The clauses select a superset of the
/// matching rows, and exactly the matching rows when `exact` is set.
#[derive(Debug)]
struct SqlFilter {
    clauses: Vec<String>,
    binds: Vec<String>,
    exact: bool,
}

impl SqlFilter {
    fn new(filter: &Filter) -> Self {
        let mut narrowed = Self {
            clauses: vec!["collection = ?".to_string()],
            binds: Vec::new(),
            exact: true,
        };
        narrowed.push(filter);
        narrowed
    }

    fn where_clause(&self) -> String {
        self.clauses.join(" AND ")
    }

    fn push(&mut self, filter: &Filter) {
        match filter {
            Filter::All => {}
            Filter::And(parts) => parts.iter().for_each(|part| self.push(part)),
            Filter::Eq(path, value) => self.push_strings(path, std::slice::from_ref(value)),
            Filter::In(path, values) => self.push_strings(path, values),
            Filter::Exists(..) | Filter::Or(_) => self.exact = false,
        }
    }

    fn push_strings(&mut self, path: &str, values: &[Value]) {
        let Some(strings) = values.iter().map(Value::as_str).collect::<Option<Vec<_>>>() else {
            self.exact = false;
            return;
        };
        if strings.is_empty() {
            self.clauses.push("0".to_string());
            return;
        }
        if strings.len() > MAX_BOUND_VALUES {
            self.exact = false;
            return;
        }

        let placeholders = vec!["?"; strings.len()].join(", ");
        if path == "_id" {
            self.clauses.push(format!("id IN ({})", placeholders));
        } else if is_plain_field(path) {
            // A string field equals the value, or an array field holds it.
            self.clauses.push(format!(
                "json_type(documents.data, ?) IN ('text', 'array') AND EXISTS (\
                 SELECT 1 FROM json_each(documents.data, ?) AS item \
                 WHERE item.type = 'text' AND item.value IN ({}))",
                placeholders
            ));
            let json_path = format!("$.{}", path);
            self.binds.push(json_path.clone());
            self.binds.push(json_path);
        } else {
            self.exact = false;
            return;
        }
        self.binds.extend(strings.into_iter().map(str::to_string));
    }
}

fn is_plain_field(path: &str) -> bool {
    !path.is_empty() && path.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `field` still holds what it held on entry after `stages` ran.
fn keeps_field(stages: &[Stage], field: &str) -> bool {
    stages.iter().all(|stage| match stage {
        Stage::Search { .. } | Stage::Match(_) | Stage::Sort(_) => true,
        Stage::Lookup(lookup) => lookup.as_field != field,
        _ => false,
    })
}

/// Distinct string join keys found at `field` across `docs`. `None` when a
/// document lacks the field or holds a non-string there, since the join then
/// compares against values SQL narrowing does not cover.
fn join_keys(docs: &[Value], field: &str) -> Option<Vec<Value>> {
    let mut keys = std::collections::BTreeSet::new();
    for doc in docs {
        match get_path(doc, field)? {
            Value::String(key) => {
                keys.insert(key.clone());
            }
            Value::Array(items) => {
                for item in items {
                    keys.insert(item.as_str()?.to_string());
                }
            }
            _ => return None,
        }
    }
    Some(keys.into_iter().map(Value::String).collect())
}

fn map_unique_violation(err: sqlx::Error, collection: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(format!("Duplicate key in {}", collection))
        }
        _ => AppError::DatabaseError(err.to_string()),
    }
}

fn stamp_new_document(doc: &mut Value) -> AppResult<String> {
    let Value::Object(map) = doc else {
        return Err(AppError::Internal("documents must be JSON objects".to_string()));
    };

    let now = Timestamp::now().to_document_string();
    let id = match map.get("_id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => {
            let id = DocId::new().to_string();
            map.insert("_id".to_string(), Value::String(id.clone()));
            id
        }
    };
    map.entry("createdAt").or_insert_with(|| Value::String(now.clone()));
    map.entry("updatedAt").or_insert_with(|| Value::String(now));
    Ok(id)
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn insert(&self, collection: &str, mut doc: Value, unique_keys: &[String]) -> AppResult<Value> {
        let id = stamp_new_document(&mut doc)?;
        let created_at = doc["createdAt"].as_str().unwrap_or_default().to_string();
        let updated_at = doc["updatedAt"].as_str().unwrap_or_default().to_string();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO documents (collection, id, data, version, created_at, updated_at) VALUES (?, ?, ?, 1, ?, ?)",
        )
        .bind(collection)
        .bind(&id)
        .bind(serde_json::to_string(&doc)?)
        .bind(&created_at)
        .bind(&updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, collection))?;

        for key in unique_keys {
            Self::insert_key(&mut *tx, collection, &id, key).await?;
        }

        tx.commit().await?;
        debug!(collection, id = %id, "inserted document");
        Ok(doc)
    }

    async fn find_by_id(&self, collection: &str, id: DocId) -> AppResult<Option<Value>> {
        Ok(self
            .first_match(collection, &Filter::eq("_id", id))
            .await?
            .map(|row| row.doc))
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> AppResult<Option<Value>> {
        Ok(self.first_match(collection, filter).await?.map(|row| row.doc))
    }

    async fn find(&self, collection: &str, filter: &Filter) -> AppResult<Vec<Value>> {
        Ok(Self::load_matching(&self.pool, collection, filter, false)
            .await?
            .into_iter()
            .map(|row| row.doc)
            .collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> AppResult<u64> {
        let narrowed = SqlFilter::new(filter);
        if !narrowed.exact {
            return Ok(Self::load_matching(&self.pool, collection, filter, false)
                .await?
                .len() as u64);
        }

        let sql = format!("SELECT COUNT(*) FROM documents WHERE {}", narrowed.where_clause());
        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(collection);
        for value in &narrowed.binds {
            query = query.bind(value);
        }
        let count = query.fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn exists(&self, collection: &str, filter: &Filter) -> AppResult<bool> {
        Ok(self.first_match(collection, filter).await?.is_some())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        updates: &[Update],
        replace_keys: Option<Vec<String>>,
    ) -> AppResult<Option<Value>> {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let Some(StoredRow { id, version, mut doc, .. }) = self.first_match(collection, filter).await? else {
                return Ok(None);
            };

            for update in updates {
                update.apply(&mut doc)?;
            }
            let now = Timestamp::now().to_document_string();
            doc["updatedAt"] = Value::String(now.clone());

            let mut tx = self.pool.begin().await?;
            let result = sqlx::query(
                "UPDATE documents SET data = ?, version = version + 1, updated_at = ? WHERE collection = ? AND id = ? AND version = ?",
            )
            .bind(serde_json::to_string(&doc)?)
            .bind(&now)
            .bind(collection)
            .bind(&id)
            .bind(version)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                warn!(collection, id = %id, attempt, "document changed underneath update, retrying");
                continue;
            }

            if let Some(keys) = &replace_keys {
                sqlx::query("DELETE FROM document_keys WHERE collection = ? AND id = ?")
                    .bind(collection)
                    .bind(&id)
                    .execute(&mut *tx)
                    .await?;
                for key in keys {
                    Self::insert_key(&mut *tx, collection, &id, key).await?;
                }
            }

            tx.commit().await?;
            return Ok(Some(doc));
        }

        Err(AppError::Conflict(format!(
            "Document in {} is being modified concurrently, please retry",
            collection
        )))
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> AppResult<Option<Value>> {
        let Some(row) = self.first_match(collection, filter).await? else {
            return Ok(None);
        };

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(&row.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM document_keys WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(&row.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok((result.rows_affected() > 0).then_some(row.doc))
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> AppResult<u64> {
        let counts = self
            .delete_cascade(&[DeleteOp::new(collection, filter.clone())])
            .await?;
        Ok(counts.into_iter().sum())
    }

    async fn delete_cascade(&self, ops: &[DeleteOp]) -> AppResult<Vec<u64>> {
        let mut tx = self.pool.begin().await?;
        let mut counts = Vec::with_capacity(ops.len());

        for op in ops {
            let ids: Vec<String> = Self::load_matching(&mut *tx, &op.collection, &op.filter, false)
                .await?
                .into_iter()
                .map(|row| row.id)
                .collect();

            let mut removed = 0;
            for id in &ids {
                removed += sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
                    .bind(&op.collection)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
                sqlx::query("DELETE FROM document_keys WHERE collection = ? AND id = ?")
                    .bind(&op.collection)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            counts.push(removed);
        }

        // Dropping the transaction on an early return above rolls it back.
        tx.commit().await?;
        Ok(counts)
    }

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> AppResult<Vec<Value>> {
        let all = Filter::All;
        let (source_filter, stages) = match pipeline.stages.split_first() {
            Some((Stage::Match(filter), rest)) => (filter, rest),
            _ => (&all, pipeline.stages.as_slice()),
        };

        let docs: Vec<Value> = Self::load_matching(&self.pool, collection, source_filter, false)
            .await?
            .into_iter()
            .map(|row| row.doc)
            .collect();

        let mut joined = JoinedRows::new();
        self.load_join_targets(stages, &docs, &mut joined).await?;
        debug!(
            collection,
            source = docs.len(),
            joined = joined.values().map(BTreeMap::len).sum::<usize>(),
            "running pipeline"
        );

        let mut collections = Collections::new();
        for (name, rows) in joined {
            collections.insert(&name, rows.into_values().collect());
        }

        executor::execute(docs, stages, &collections)
    }

    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Database health check failed: {}", e)))?;
        Ok(())
    }
}
