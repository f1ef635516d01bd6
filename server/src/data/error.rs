//! Unified error type for the data layer

use thiserror::Error;

/// Error raised by a query backend
#[derive(Error, Debug)]
pub enum DataError {
    /// DuckDB database error
    #[error("DuckDB error: {0}")]
    Duckdb(#[from] duckdb::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Query timeout
    #[error("Query timeout after {timeout_secs}s on {backend}")]
    Timeout {
        backend: &'static str,
        timeout_secs: u64,
    },

    /// Backend not available
    #[error("Backend {backend} is not available: {reason}")]
    BackendUnavailable {
        backend: &'static str,
        reason: String,
    },
}

impl DataError {
    /// Create a timeout error
    pub fn timeout(backend: &'static str, timeout_secs: u64) -> Self {
        Self::Timeout {
            backend,
            timeout_secs,
        }
    }

    /// Create a backend unavailable error
    pub fn backend_unavailable(backend: &'static str, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend,
            reason: reason.into(),
        }
    }

    /// Get the backend name that generated this error
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Duckdb(_) => "duckdb",
            Self::Timeout { backend, .. } => backend,
            Self::BackendUnavailable { backend, .. } => backend,
            Self::Io(_) => "unknown",
        }
    }
}

impl From<crate::data::duckdb::DuckdbError> for DataError {
    fn from(e: crate::data::duckdb::DuckdbError) -> Self {
        match e {
            crate::data::duckdb::DuckdbError::Database(e) => Self::Duckdb(e),
            crate::data::duckdb::DuckdbError::Io(e) => Self::Io(e),
            crate::data::duckdb::DuckdbError::Timeout { timeout_secs } => Self::Timeout {
                backend: "duckdb",
                timeout_secs,
            },
            crate::data::duckdb::DuckdbError::Closed => {
                Self::backend_unavailable("duckdb", "connection closed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error_display() {
        let err = DataError::timeout("duckdb", 30);
        assert_eq!(err.to_string(), "Query timeout after 30s on duckdb");
    }

    #[test]
    fn test_backend_unavailable_error_display() {
        let err = DataError::backend_unavailable("duckdb", "connection closed");
        assert_eq!(
            err.to_string(),
            "Backend duckdb is not available: connection closed"
        );
    }

    #[test]
    fn test_backend_method() {
        assert_eq!(DataError::timeout("duckdb", 30).backend(), "duckdb");
        assert_eq!(
            DataError::Io(std::io::Error::other("disk")).backend(),
            "unknown"
        );
    }

    #[test]
    fn test_from_duckdb_error() {
        let err = DataError::from(crate::data::duckdb::DuckdbError::Timeout { timeout_secs: 5 });
        assert!(matches!(
            err,
            DataError::Timeout {
                backend: "duckdb",
                timeout_secs: 5
            }
        ));

        let err = DataError::from(crate::data::duckdb::DuckdbError::Closed);
        assert_eq!(err.backend(), "duckdb");
    }
}
