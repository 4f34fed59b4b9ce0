//! SQLite-backed document store.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, trace};

use super::{DocumentStore, Fields, StoreFailure};

/// Schema applied on open.
const SCHEMA: &str = include_str!("../../migrations/001_documents.sql");

/// Row type returned by document listing queries.
type DocumentRow = (String, String, String);

/// A stored document as read back for history views.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Document id.
    pub id: String,
    /// Document fields.
    pub fields: Value,
    /// ISO-8601 creation time assigned by SQLite.
    pub created_at: String,
}

/// Document store over a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the store at `path` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory, database, or schema cannot
    /// be created.
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!("failed to create store directory {}: {e}", parent.display())
            })?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let db = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| anyhow::anyhow!("failed to open store at {}: {e}", path.display()))?;
        let store = Self::from_pool(db).await?;
        info!(path = %path.display(), "document store opened");
        Ok(store)
    }

    /// Open a private in-memory store.
    ///
    /// The pool holds one connection that is never recycled, since closing it
    /// drops the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool or schema cannot be created.
    pub async fn open_in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::from_pool(db).await
    }

    /// Wrap an existing pool, applying the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub async fn from_pool(db: SqlitePool) -> anyhow::Result<Self> {
        sqlx::raw_sql(SCHEMA)
            .execute(&db)
            .await
            .map_err(|e| anyhow::anyhow!("failed to apply store schema: {e}"))?;
        Ok(Self { db })
    }

    /// List documents in `collection` in insertion order, newest last.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFailure`] on SQLite failure or corrupt JSON.
    pub async fn list_documents(
        &self,
        collection: &str,
        limit: usize,
    ) -> Result<Vec<StoredDocument>, StoreFailure> {
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<DocumentRow> = sqlx::query_as(
            "SELECT id, fields, created_at FROM ( \
                 SELECT rowid, id, fields, created_at FROM documents \
                 WHERE collection = ?1 ORDER BY rowid DESC LIMIT ?2 \
             ) ORDER BY rowid ASC",
        )
        .bind(collection)
        .bind(limit_i64)
        .fetch_all(&self.db)
        .await
        .map_err(to_failure)?;

        rows.into_iter()
            .map(|(id, fields, created_at)| {
                let fields = serde_json::from_str(&fields)
                    .map_err(|e| StoreFailure::with_code("corrupt", e.to_string()))?;
                Ok(StoredDocument {
                    id,
                    fields,
                    created_at,
                })
            })
            .collect()
    }

    /// Load one document, if present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFailure`] on SQLite failure or corrupt JSON.
    pub async fn get_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Option<Value>, StoreFailure> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT fields FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(collection)
                .bind(document_id)
                .fetch_optional(&self.db)
                .await
                .map_err(to_failure)?;
        row.map(|(fields,)| {
            serde_json::from_str(&fields)
                .map_err(|e| StoreFailure::with_code("corrupt", e.to_string()))
        })
        .transpose()
    }
}

fn to_failure(err: sqlx::Error) -> StoreFailure {
    let code = match &err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    };
    StoreFailure {
        code,
        message: err.to_string(),
    }
}

fn encode(fields: &Fields) -> Result<String, StoreFailure> {
    serde_json::to_string(fields).map_err(|e| StoreFailure::with_code("encode", e.to_string()))
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn append_document(
        &self,
        collection: &str,
        fields: Fields,
    ) -> Result<String, StoreFailure> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO documents (collection, id, fields) VALUES (?1, ?2, ?3)")
            .bind(collection)
            .bind(&id)
            .bind(encode(&fields)?)
            .execute(&self.db)
            .await
            .map_err(to_failure)?;
        trace!(collection, id = %id, "document appended");
        Ok(id)
    }

    async fn set_document(
        &self,
        collection: &str,
        document_id: &str,
        fields: Fields,
    ) -> Result<(), StoreFailure> {
        sqlx::query(
            "INSERT INTO documents (collection, id, fields) VALUES (?1, ?2, ?3) \
             ON CONFLICT(collection, id) DO UPDATE SET fields = excluded.fields, \
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        )
        .bind(collection)
        .bind(document_id)
        .bind(encode(&fields)?)
        .execute(&self.db)
        .await
        .map_err(to_failure)?;
        trace!(collection, id = document_id, "document set");
        Ok(())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
