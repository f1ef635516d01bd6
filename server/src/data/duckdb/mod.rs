//! DuckDB query service
//!
//! Embedded backend for compiled record queries. Holds a single connection
//! behind a mutex; every call runs on the blocking pool with a timeout.

pub mod error;
mod query;
pub mod sql_types;

pub use error::DuckdbError;
pub use query::DuckdbQueryBackend;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use duckdb::Connection;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::core::config::DatabaseConfig;
use crate::core::constants::DUCKDB_DB_FILENAME;
use crate::core::storage::{AppStorage, DataSubdir};
use crate::utils::file::expand_path;

/// DuckDB service
pub struct DuckdbService {
    conn: Mutex<Option<Connection>>,
    path: PathBuf,
    query_timeout_secs: u64,
}

impl Drop for DuckdbService {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.get_mut().take()
            && let Err((_, e)) = conn.close()
        {
            tracing::warn!("DuckDB connection close failed during drop: {}", e);
        }
    }
}

impl DuckdbService {
    /// Open the configured database, defaulting to the data directory
    pub async fn init(storage: &AppStorage, config: &DatabaseConfig) -> Result<Self, DuckdbError> {
        let path = match &config.duckdb_path {
            Some(p) => expand_path(p),
            None => storage.subdir(DataSubdir::Duckdb).join(DUCKDB_DB_FILENAME),
        };
        Self::open(&path, config.query_timeout_secs).await
    }

    /// Open a database file
    pub async fn open(path: &Path, query_timeout_secs: u64) -> Result<Self, DuckdbError> {
        let db_path = path.to_path_buf();
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute_batch(
                "SET autoinstall_known_extensions = false;
                 SET autoload_known_extensions = false;
                 PRAGMA enable_checkpoint_on_shutdown;",
            )?;
            Ok::<_, duckdb::Error>(conn)
        })
        .await
        .map_err(|e| DuckdbError::Io(std::io::Error::other(e)))??;

        tracing::debug!(path = %path.display(), "DuckdbService initialized");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: path.to_path_buf(),
            query_timeout_secs,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get exclusive access to the connection
    pub fn conn(&self) -> Result<MappedMutexGuard<'_, Connection>, DuckdbError> {
        MutexGuard::try_map(self.conn.lock(), |opt| opt.as_mut()).map_err(|_| DuckdbError::Closed)
    }

    /// Check if the connection is still open
    pub fn is_open(&self) -> bool {
        self.conn.lock().is_some()
    }

    /// Run a blocking DuckDB call with the configured timeout
    pub async fn run_query<T, F>(&self, f: F) -> Result<T, DuckdbError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let timeout_secs = self.query_timeout_secs;
        tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            tokio::task::spawn_blocking(f),
        )
        .await
        .map_err(|_| {
            tracing::warn!("DuckDB query timed out after {}s", timeout_secs);
            DuckdbError::Timeout { timeout_secs }
        })?
        .map_err(|e| {
            tracing::error!(error = %e, "DuckDB query task failed");
            DuckdbError::Io(std::io::Error::other(format!(
                "Query execution failed: {}",
                e
            )))
        })
    }

    /// Close the DuckDB connection gracefully
    pub async fn close(self: Arc<Self>) -> Result<(), DuckdbError> {
        tokio::task::spawn_blocking(move || {
            let mut conn_guard = self.conn.lock();
            if let Some(conn) = conn_guard.take() {
                conn.close().map_err(|(_, e)| DuckdbError::Database(e))?;
                tracing::debug!("DuckDB connection closed");
            }
            Ok(())
        })
        .await
        .map_err(|e| DuckdbError::Io(std::io::Error::other(e)))?
    }
}
