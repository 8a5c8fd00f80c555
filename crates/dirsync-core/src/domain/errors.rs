//! Domain error types
//!
//! Recoverable errors are represented as distinct variants so handler code
//! can match on them and decide whether to re-queue, drop, or escalate.

use thiserror::Error;

/// Errors that can occur in domain operations (path validation, config).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Path is not absolute, or escapes its root via `..`
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A path was asked about that does not descend from the expected root
    #[error("path not under root: {path} (root: {root})")]
    NotUnderRoot { path: String, root: String },

    /// `start` was called with two equal roots, or a root that doesn't exist
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidPath("relative/path".to_string());
        assert_eq!(err.to_string(), "invalid path: relative/path");
    }

    #[test]
    fn test_not_under_root_display() {
        let err = DomainError::NotUnderRoot {
            path: "/tmp/b/x".to_string(),
            root: "/tmp/a".to_string(),
        };
        assert!(err.to_string().contains("/tmp/b/x"));
        assert!(err.to_string().contains("/tmp/a"));
    }

    #[test]
    fn test_error_equality() {
        let a = DomainError::Config("root_a == root_b".to_string());
        let b = DomainError::Config("root_a == root_b".to_string());
        assert_eq!(a, b);
    }
}
