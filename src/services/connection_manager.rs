use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::utils::error::{ApiError, ApiResult};

/// Process-wide singleton holding the one DB client. Expensive to
/// construct, safe to share read-mostly once initialized.
///
/// `MySQLPoolManager` keys pools by cluster id with a `DashMap`; this
/// service has exactly one key, so it collapses to a single
/// `Mutex<Option<PgPool>>` guarding the idempotent-initialize path,
/// keeping the same double-checked-locking semantics while allowing the
/// pool to be cleared again for `reset`.
#[derive(Clone)]
pub struct ConnectionManager {
    pool: Arc<Mutex<Option<PgPool>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self { pool: Arc::new(Mutex::new(None)) }
    }

    /// Idempotent. A concurrent caller observing the pool already set
    /// returns immediately without reconnecting.
    pub async fn initialize(&self, database_url: &str, connect_timeout_secs: u64) -> ApiResult<()> {
        let mut guard = self.pool.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| ApiError::internal_error(format!("failed to connect to database: {e}")))?;

        // A failed test query does not block initialization, only logs a
        // warning: the pool may still serve requests once the backing
        // store recovers.
        if let Err(e) = sqlx::query("SELECT 1").execute(&pool).await {
            tracing::warn!("post-connect test query failed: {e}");
        }

        *guard = Some(pool);
        tracing::info!("database connection pool initialized");
        Ok(())
    }

    pub async fn get_client(&self) -> ApiResult<PgPool> {
        self.pool.lock().await.clone().ok_or_else(|| ApiError::internal_error("connection manager not initialized"))
    }

    pub async fn is_initialized(&self) -> bool {
        self.pool.lock().await.is_some()
    }

    pub async fn close(&self) {
        if let Some(pool) = self.pool.lock().await.take() {
            pool.close().await;
            tracing::info!("database connection pool closed");
        }
    }

    /// Clears the held pool so a test can reinitialize against a fresh
    /// database. Not meant for production lifecycle use.
    #[cfg(test)]
    pub async fn reset(&self) {
        *self.pool.lock().await = None;
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_client_before_init_errors() {
        let manager = ConnectionManager::new();
        assert!(manager.get_client().await.is_err());
        assert!(!manager.is_initialized().await);
    }

    #[tokio::test]
    async fn reset_clears_the_pool_for_reinitialization() {
        let manager = ConnectionManager::new();
        manager.reset().await;
        assert!(!manager.is_initialized().await);
    }
}
