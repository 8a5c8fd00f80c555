//! Error types for the binary-diff sidecar

use thiserror::Error;

/// Errors raised while computing or applying a binary patch.
#[derive(Debug, Error)]
pub enum PatchError {
    /// Diff/patch computation itself failed (corrupt patch, bsdiff internal
    /// error). Never expected in normal operation since patches are always
    /// generated and consumed by this crate.
    #[error("patch computation failed: {0}")]
    Compute(#[source] std::io::Error),

    /// Reading or writing one of the files involved failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
