//! Cache-related error types

use std::path::PathBuf;

use thiserror::Error;

/// Cache operation errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// A stored representation does not belong to the key it was looked up with.
    ///
    /// This means the engine's bookkeeping is corrupt; it is never retried.
    #[error("Key mismatch: expected {expected}, stored representation belongs to {found}")]
    KeyMismatch { expected: String, found: String },

    /// The storage backend does not implement this operation
    #[error("Operation '{operation}' is not supported by {storage} storage")]
    NotSupported {
        operation: &'static str,
        storage: String,
    },

    /// File read/write/delete failed
    #[error("IO error on {path} ({operation}): {source}")]
    Io {
        path: PathBuf,
        operation: IoOperation,
        source: std::io::Error,
    },

    /// Invalid cache configuration
    #[error("Invalid configuration value for {field}: {message}")]
    InvalidConfig { field: String, message: String },
}

/// IO operation type for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOperation {
    Read,
    Write,
    Delete,
    CreateDir,
    Metadata,
}

impl std::fmt::Display for IoOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoOperation::Read => write!(f, "read"),
            IoOperation::Write => write!(f, "write"),
            IoOperation::Delete => write!(f, "delete"),
            IoOperation::CreateDir => write!(f, "create dir"),
            IoOperation::Metadata => write!(f, "metadata"),
        }
    }
}

impl CacheError {
    /// Create a key mismatch error from the two offending keys
    pub fn key_mismatch(expected: &impl std::fmt::Debug, found: &impl std::fmt::Debug) -> Self {
        CacheError::KeyMismatch {
            expected: format!("{:?}", expected),
            found: format!("{:?}", found),
        }
    }

    /// Create a not-supported error
    pub fn not_supported(operation: &'static str, storage: impl Into<String>) -> Self {
        CacheError::NotSupported {
            operation,
            storage: storage.into(),
        }
    }

    /// Create an IO error
    pub fn io_error(path: PathBuf, operation: IoOperation, source: std::io::Error) -> Self {
        CacheError::Io {
            path,
            operation,
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        CacheError::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this error wraps a file-not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CacheError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

/// Re-export commonly used Result type
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mismatch_formats_both_keys() {
        let err = CacheError::key_mismatch(&"a", &"b");
        assert_eq!(
            err.to_string(),
            "Key mismatch: expected \"a\", stored representation belongs to \"b\""
        );
    }

    #[test]
    fn test_is_not_found() {
        let err = CacheError::io_error(
            PathBuf::from("/tmp/missing"),
            IoOperation::Delete,
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.is_not_found());

        let err = CacheError::io_error(
            PathBuf::from("/tmp/denied"),
            IoOperation::Delete,
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("(delete)"));
    }
}
