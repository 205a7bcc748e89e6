//! Database handle factory.
//!
//! `configure` validates a [`ConnectionConfig`], then returns the cached
//! handle for it or opens a new one. Handles live for the cache TTL; stale
//! ones are closed on the next access.

use super::{ConnectionConfig, HandleCache};
use crate::db::{DatabaseHandle, MySqlClient, SqliteClient};
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Opens database handles. The factory only decides when to open.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens the local file read-only.
    async fn open_local(&self, path: &Path) -> Result<DatabaseHandle>;

    /// Connects to a remote server. `display` is a password-free label.
    async fn open_remote(&self, url: &str, display: &str) -> Result<DatabaseHandle>;
}

/// Connector backed by the sqlx clients.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlxConnector;

#[async_trait]
impl Connector for SqlxConnector {
    async fn open_local(&self, path: &Path) -> Result<DatabaseHandle> {
        let client = SqliteClient::open_read_only(path).await?;
        Ok(Arc::new(client))
    }

    async fn open_remote(&self, url: &str, display: &str) -> Result<DatabaseHandle> {
        let client = MySqlClient::connect(url, display).await?;
        Ok(Arc::new(client))
    }
}

/// Produces database handles, memoized per connection config.
pub struct HandleFactory {
    local_path: PathBuf,
    connector: Arc<dyn Connector>,
    cache: Mutex<HandleCache>,
}

impl HandleFactory {
    pub fn new(local_path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self::with_connector(local_path, ttl, Arc::new(SqlxConnector))
    }

    pub fn with_connector(
        local_path: impl Into<PathBuf>,
        ttl: Duration,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            local_path: local_path.into(),
            connector,
            cache: Mutex::new(HandleCache::new(ttl)),
        }
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Returns a handle for `config`, reusing a cached one opened less than
    /// one TTL ago.
    pub async fn configure(&self, config: &ConnectionConfig) -> Result<DatabaseHandle> {
        self.configure_at(config, Instant::now()).await
    }

    /// Same as [`configure`](Self::configure) with an explicit clock reading.
    pub async fn configure_at(
        &self,
        config: &ConnectionConfig,
        now: Instant,
    ) -> Result<DatabaseHandle> {
        config.validate()?;

        let mut cache = self.cache.lock().await;

        for stale in cache.evict_expired(now) {
            debug!("Closing expired database handle");
            if let Err(e) = stale.close().await {
                warn!(error = %e, "Failed to close expired handle");
            }
        }

        if let Some(handle) = cache.get(config, now) {
            debug!(connection = %config.display_string(), "Database handle cache hit");
            return Ok(handle);
        }

        let handle = match config {
            ConnectionConfig::Local => self.connector.open_local(&self.local_path).await?,
            ConnectionConfig::Remote(remote) => {
                let url = remote.connection_url()?;
                self.connector
                    .open_remote(&url, &remote.display_string())
                    .await?
            }
        };

        info!(
            connection = %config.display_string(),
            backend = handle.backend().as_str(),
            "Opened database handle"
        );
        cache.insert(config.clone(), handle.clone(), now);

        Ok(handle)
    }

    /// Number of cached handles.
    pub async fn cached(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Closes every cached handle.
    pub async fn shutdown(&self) {
        let handles = self.cache.lock().await.drain();
        for handle in handles {
            if let Err(e) = handle.close().await {
                warn!(error = %e, "Failed to close database handle");
            }
        }
    }
}
