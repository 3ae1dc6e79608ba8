//! Postgres-backed document store.
//!
//! All documents live in one `documents` table keyed by `(collection, key)`, with
//! the fields stored as JSONB. Conditional writes are single statements guarded by
//! `revision = $n`, so the compare and the write cannot be interleaved by another
//! writer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use pantry_core::ExpectedRevision;

use super::r#trait::{Document, DocumentStore, DocumentStoreError, Fields};
use crate::config::StoreConfig;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection  TEXT        NOT NULL,
    key         TEXT        NOT NULL,
    fields      JSONB       NOT NULL,
    revision    BIGINT      NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (collection, key)
)
"#;

/// Postgres document store.
///
/// ## Thread Safety
///
/// Uses the SQLx connection pool, which is `Send + Sync` and cheap to clone.
pub struct PostgresDocumentStore {
    pool: Arc<PgPool>,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    ///
    /// Every connection gets a server-side `statement_timeout` shorter than the
    /// client timeout, so a statement the client gave up on is cancelled and
    /// rolled back by Postgres instead of committing later.
    pub async fn connect(database_url: &str, config: &StoreConfig) -> Result<Self, DocumentStoreError> {
        let statement_timeout_ms = statement_timeout_ms(config.timeout);
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.timeout)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    let set = format!("SET statement_timeout = {statement_timeout_ms}");
                    sqlx::query(&set).execute(&mut *conn).await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the `documents` table if it does not exist.
    pub async fn migrate(&self) -> Result<(), DocumentStoreError> {
        sqlx::query(CREATE_TABLE)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

/// Server-side budget for one statement: 80% of the client timeout, at least 1 ms.
fn statement_timeout_ms(client_timeout: Duration) -> u64 {
    let ms = u64::try_from(client_timeout.as_millis()).unwrap_or(u64::MAX);
    (ms / 5 * 4).max(1)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DocumentStoreError {
    tracing::warn!(operation, error = %err, "postgres document store error");
    DocumentStoreError::Unavailable(format!("{operation}: {err}"))
}

fn revision_param(key: &str, revision: u64) -> Result<i64, DocumentStoreError> {
    i64::try_from(revision).map_err(|_| DocumentStoreError::InvalidDocument {
        key: key.to_string(),
        reason: format!("revision {revision} out of range"),
    })
}

fn row_to_document(row: &PgRow) -> Result<Document, DocumentStoreError> {
    let key: String = row.try_get("key").map_err(|e| DocumentStoreError::InvalidDocument {
        key: String::new(),
        reason: e.to_string(),
    })?;

    let invalid = |reason: String| DocumentStoreError::InvalidDocument {
        key: key.clone(),
        reason,
    };

    let Json(fields): Json<Fields> = row.try_get("fields").map_err(|e| invalid(e.to_string()))?;
    let revision: i64 = row.try_get("revision").map_err(|e| invalid(e.to_string()))?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(|e| invalid(e.to_string()))?;
    let revision = u64::try_from(revision).map_err(|_| invalid(format!("negative revision {revision}")))?;

    Ok(Document {
        key,
        fields,
        revision,
        updated_at,
    })
}

fn conflict(collection: &str, key: &str, expected: ExpectedRevision) -> DocumentStoreError {
    DocumentStoreError::Conflict(format!("{collection}/{key}: expected {expected:?}"))
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, DocumentStoreError> {
        let row = sqlx::query(
            r#"
            SELECT key, fields, revision, updated_at
            FROM documents
            WHERE collection = $1 AND key = $2
            "#,
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn put(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
        expected: ExpectedRevision,
    ) -> Result<Document, DocumentStoreError> {
        let row = match expected {
            ExpectedRevision::Any => sqlx::query(
                r#"
                INSERT INTO documents (collection, key, fields, revision)
                VALUES ($1, $2, $3, 1)
                ON CONFLICT (collection, key)
                DO UPDATE SET
                    fields = EXCLUDED.fields,
                    revision = documents.revision + 1,
                    updated_at = NOW()
                RETURNING key, fields, revision, updated_at
                "#,
            )
            .bind(collection)
            .bind(key)
            .bind(Json(&fields))
            .fetch_optional(&*self.pool)
            .await,
            ExpectedRevision::Absent => sqlx::query(
                r#"
                INSERT INTO documents (collection, key, fields, revision)
                VALUES ($1, $2, $3, 1)
                ON CONFLICT (collection, key) DO NOTHING
                RETURNING key, fields, revision, updated_at
                "#,
            )
            .bind(collection)
            .bind(key)
            .bind(Json(&fields))
            .fetch_optional(&*self.pool)
            .await,
            ExpectedRevision::Exact(revision) => sqlx::query(
                r#"
                UPDATE documents
                SET fields = $3, revision = revision + 1, updated_at = NOW()
                WHERE collection = $1 AND key = $2 AND revision = $4
                RETURNING key, fields, revision, updated_at
                "#,
            )
            .bind(collection)
            .bind(key)
            .bind(Json(&fields))
            .bind(revision_param(key, revision)?)
            .fetch_optional(&*self.pool)
            .await,
        }
        .map_err(|e| map_sqlx_error("put", e))?;

        match row {
            Some(row) => row_to_document(&row),
            None => Err(conflict(collection, key, expected)),
        }
    }

    async fn delete(
        &self,
        collection: &str,
        key: &str,
        expected: ExpectedRevision,
    ) -> Result<(), DocumentStoreError> {
        match expected {
            ExpectedRevision::Any => {
                sqlx::query("DELETE FROM documents WHERE collection = $1 AND key = $2")
                    .bind(collection)
                    .bind(key)
                    .execute(&*self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("delete", e))?;
                Ok(())
            }
            // Nothing to delete; succeed only if there really is nothing there.
            ExpectedRevision::Absent => match self.get(collection, key).await? {
                None => Ok(()),
                Some(_) => Err(conflict(collection, key, expected)),
            },
            ExpectedRevision::Exact(revision) => {
                let result = sqlx::query(
                    "DELETE FROM documents WHERE collection = $1 AND key = $2 AND revision = $3",
                )
                .bind(collection)
                .bind(key)
                .bind(revision_param(key, revision)?)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("delete", e))?;

                if result.rows_affected() == 0 {
                    return Err(conflict(collection, key, expected));
                }
                Ok(())
            }
        }
    }

    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, DocumentStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT key, fields, revision, updated_at
            FROM documents
            WHERE collection = $1
            "#,
        )
        .bind(collection)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_all", e))?;

        rows.iter().map(row_to_document).collect()
    }
}
