//! Error types for index construction, search, and configuration.
//!
//! Only misuse by the host surfaces here. Search-quality problems (blank
//! queries, no matches, malformed regex patterns, an index that never got
//! built) are reported to the agent as text instead.

use thiserror::Error;

/// Crate result type.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors raised by the search subsystem.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The catalog exceeds the hard cap on indexed tools.
    #[error("tool catalog has {count} tools, more than the maximum of {max}")]
    CatalogTooLarge { count: usize, max: usize },

    /// A regex search pattern exceeds the maximum pattern length.
    #[error("search pattern is {len} characters long, more than the maximum of {max}")]
    PatternTooLong { len: usize, max: usize },

    /// Invalid policy configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A catalog file could not be interpreted.
    #[error("failed to load tool catalog: {0}")]
    CatalogLoad(String),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    /// Whether this error indicates host misconfiguration rather than an
    /// environmental failure (I/O, malformed files).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SearchError::CatalogTooLarge { .. }
                | SearchError::PatternTooLong { .. }
                | SearchError::InvalidConfig(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_too_large_message_names_both_counts() {
        let err = SearchError::CatalogTooLarge {
            count: 10_001,
            max: 10_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("10001"));
        assert!(msg.contains("10000"));
        assert!(err.is_configuration());
    }

    #[test]
    fn io_errors_are_not_configuration_errors() {
        let err: SearchError = std::io::Error::other("disk gone").into();
        assert!(!err.is_configuration());
    }
}
