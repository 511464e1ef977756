use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::DatabaseConfig;

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid partition database name: {0}")]
    InvalidPartitionName(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Malformed document: {0}")]
    Decode(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<crate::filter::FilterError> for DatabaseError {
    fn from(err: crate::filter::FilterError) -> Self {
        DatabaseError::QueryError(err.to_string())
    }
}

/// Connection pool registry for the partition databases.
///
/// Constructed explicitly at startup and handed to whoever needs pools; there is
/// no process-wide instance.
pub struct DatabaseManager {
    config: DatabaseConfig,
    pools: RwLock<HashMap<String, PgPool>>,
}

impl DatabaseManager {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            pools: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Get the pool for a partition database, connecting on first use.
    /// `fallback_url` overrides the configured fallback for this partition.
    pub async fn partition_pool(
        &self,
        database_name: &str,
        fallback_url: Option<&str>,
    ) -> Result<PgPool, DatabaseError> {
        if !Self::is_valid_db_name(database_name) {
            return Err(DatabaseError::InvalidPartitionName(database_name.to_string()));
        }

        // Fast path: try read lock
        {
            let pools = self.pools.read().await;
            if let Some(pool) = pools.get(database_name) {
                return Ok(pool.clone());
            }
        }

        let pool = self.connect_with_fallback(database_name, fallback_url).await?;

        {
            let mut pools = self.pools.write().await;
            pools.insert(database_name.to_string(), pool.clone());
        }

        info!("Created database pool for: {}", database_name);
        Ok(pool)
    }

    /// Try the primary URL first, then the fallback. Only the last failure is returned.
    async fn connect_with_fallback(
        &self,
        database_name: &str,
        fallback_url: Option<&str>,
    ) -> Result<PgPool, DatabaseError> {
        let primary = self
            .config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let fallback = fallback_url.or(self.config.fallback_url.as_deref());

        info!("[{}] Attempting primary connection...", database_name);
        match self.connect(primary, database_name).await {
            Ok(pool) => {
                info!("[{}] Connected via primary URL", database_name);
                Ok(pool)
            }
            Err(err) => match fallback {
                Some(fallback) => {
                    warn!(
                        "[{}] Primary connection failed ({}), trying fallback...",
                        database_name, err
                    );
                    let pool = self.connect(fallback, database_name).await?;
                    info!("[{}] Connected via fallback URL", database_name);
                    Ok(pool)
                }
                None => Err(err),
            },
        }
    }

    async fn connect(&self, base_url: &str, database_name: &str) -> Result<PgPool, DatabaseError> {
        let connection_string = Self::build_connection_string(base_url, database_name)?;
        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(Duration::from_secs(self.config.connection_timeout))
            .connect(&connection_string)
            .await?;
        Ok(pool)
    }

    fn build_connection_string(base: &str, database_name: &str) -> Result<String, DatabaseError> {
        let mut url = url::Url::parse(base).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        // Replace the path to the database name (ensure leading slash)
        url.set_path(&format!("/{}", database_name));
        Ok(url.into())
    }

    /// Close and remove all pools (e.g., on shutdown)
    pub async fn close_all(&self) {
        let mut pools = self.pools.write().await;
        for (name, pool) in pools.drain() {
            pool.close().await;
            info!("Closed database pool: {}", name);
        }
    }

    /// Partition names are interpolated into connection URLs; keep them to [A-Za-z0-9_]
    fn is_valid_db_name(name: &str) -> bool {
        !name.is_empty()
            && name.len() <= 63
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}
