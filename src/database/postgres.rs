//! PostgreSQL document store: one database per partition, one table per
//! collection. Documents live in a JSONB column next to an optional BYTEA
//! payload.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgArguments, postgres::PgRow, PgPool, Row};
use std::time::{Duration, Instant};

use crate::config::DatabaseConfig;
use crate::database::manager::DatabaseError;
use crate::database::store::{Document, DocumentStore};
use crate::filter::{DocumentFilter, SqlParam, SqlResult};
use crate::types::Collection;

pub struct PgDocumentStore {
    partition: String,
    pool: PgPool,
    query_logging: bool,
    slow_query_threshold: Option<Duration>,
}

impl PgDocumentStore {
    pub fn new(partition: impl Into<String>, pool: PgPool, config: &DatabaseConfig) -> Self {
        Self {
            partition: partition.into(),
            pool,
            query_logging: config.enable_query_logging,
            slow_query_threshold: config
                .enable_slow_query_warning
                .then(|| Duration::from_millis(config.slow_query_threshold_ms)),
        }
    }

    /// Create the collection tables when they are missing
    pub async fn ensure_collections(
        &self,
        collections: &[Collection],
    ) -> Result<(), DatabaseError> {
        for collection in collections {
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (
                    \"uid\" TEXT PRIMARY KEY,
                    \"doc\" JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                    \"payload\" BYTEA,
                    \"created_at\" TIMESTAMPTZ NOT NULL DEFAULT now(),
                    \"updated_at\" TIMESTAMPTZ NOT NULL DEFAULT now()
                )",
                collection.table_name()
            );
            sqlx::query(&ddl).execute(&self.pool).await?;
        }
        tracing::debug!("[{}] collections ready: {:?}", self.partition, collections);
        Ok(())
    }

    fn observe(&self, collection: Collection, sql: &str, started: Instant) {
        let elapsed = started.elapsed();
        if self.query_logging {
            tracing::debug!("[{}.{}] {} ({:?})", self.partition, collection, sql, elapsed);
        }
        if let Some(threshold) = self.slow_query_threshold {
            if elapsed > threshold {
                tracing::warn!(
                    "[{}.{}] slow query took {:?} (threshold {:?}): {}",
                    self.partition,
                    collection,
                    elapsed,
                    threshold,
                    sql
                );
            }
        }
    }

    async fn select(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, DatabaseError> {
        let SqlResult { query, params } = filter.to_sql(collection.table_name())?;
        let started = Instant::now();
        let mut q = sqlx::query(&query);
        for p in params.iter() {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        self.observe(collection, &query, started);
        rows.iter().map(row_to_document).collect()
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_one(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<Document>, DatabaseError> {
        let filter = filter.clone().limit(1, filter.offset_value())?;
        Ok(self.select(collection, &filter).await?.into_iter().next())
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, DatabaseError> {
        if filter.is_unsatisfiable() {
            return Ok(vec![]);
        }
        self.select(collection, filter).await
    }

    async fn insert(
        &self,
        collection: Collection,
        document: Document,
    ) -> Result<Document, DatabaseError> {
        let uid = document.require_uid()?.to_string();
        let sql = format!(
            "INSERT INTO \"{}\" (\"uid\", \"doc\", \"payload\") VALUES ($1, $2, $3)
             ON CONFLICT (\"uid\") DO NOTHING RETURNING \"uid\"",
            collection.table_name()
        );
        let started = Instant::now();
        let inserted = sqlx::query(&sql)
            .bind(&uid)
            .bind(Value::Object(document.fields.clone()))
            .bind(document.binary.as_deref())
            .fetch_optional(&self.pool)
            .await?;
        self.observe(collection, &sql, started);

        match inserted {
            Some(_) => Ok(document),
            None => {
                let message = format!("{} '{}' already exists", collection, uid);
                Err(DatabaseError::Conflict(message))
            }
        }
    }

    async fn replace(
        &self,
        collection: Collection,
        uid: &str,
        document: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        let sql = format!(
            "UPDATE \"{}\" SET \"doc\" = $2, \"payload\" = $3, \"updated_at\" = now()
             WHERE \"uid\" = $1 RETURNING \"uid\"",
            collection.table_name()
        );
        let started = Instant::now();
        let updated = sqlx::query(&sql)
            .bind(uid)
            .bind(Value::Object(document.fields.clone()))
            .bind(document.binary.as_deref())
            .fetch_optional(&self.pool)
            .await?;
        self.observe(collection, &sql, started);
        Ok(updated.map(|_| document))
    }

    async fn delete(
        &self,
        collection: Collection,
        uid: &str,
    ) -> Result<Option<Document>, DatabaseError> {
        let sql = format!(
            "DELETE FROM \"{}\" WHERE \"uid\" = $1 RETURNING \"uid\", \"doc\", \"payload\"",
            collection.table_name()
        );
        let started = Instant::now();
        let row = sqlx::query(&sql).bind(uid).fetch_optional(&self.pool).await?;
        self.observe(collection, &sql, started);
        row.as_ref().map(row_to_document).transpose()
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn row_to_document(row: &PgRow) -> Result<Document, DatabaseError> {
    let doc: Value = row.try_get("doc")?;
    let payload: Option<Vec<u8>> = row.try_get("payload")?;
    let uid: String = row.try_get("uid")?;

    let mut document = Document::from_value(doc)
        .ok_or_else(|| DatabaseError::Decode(format!("document '{}' is not a JSON object", uid)))?;
    // The column is authoritative for the identifier
    document.fields.insert("uid".to_string(), Value::String(uid));
    Ok(document.with_binary(payload))
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    p: &'q SqlParam,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match p {
        SqlParam::Text(s) => q.bind(s),
        SqlParam::TextArray(values) => q.bind(values),
        SqlParam::Json(v) => q.bind(v),
    }
}
