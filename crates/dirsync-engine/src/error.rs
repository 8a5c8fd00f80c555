//! Error types for the replication engine
//!
//! Two taxonomies: [`ActionError`] is internal to the dispatch loop
//! (re-queue, drop, or log — never surfaces to the caller); [`EngineError`]
//! covers lifecycle and configuration failures, which are the only ones
//! allowed to propagate out of [`start`](crate::engine::Engine::start).

use std::path::PathBuf;

use dirsync_core::domain::DomainError;
use thiserror::Error;

/// Errors raised by a single replication action.
///
/// These never escape the dispatch loop: each variant maps to a policy
/// (re-queue, drop, recreate-and-retry, or surface-to-status) applied by the
/// caller, not by unwinding.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Permission denied, sharing violation, or the file is still being
    /// written by another process. The caller re-queues via the debounce
    /// table; the next stability tick retries.
    #[error("transient I/O error on {path}: {source}")]
    Transient {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source path disappeared between the event firing and the action
    /// running. Dropped silently.
    #[error("source missing: {0}")]
    MissingSource(PathBuf),

    /// The sidecar directory was removed out from under a running engine.
    /// The caller recreates it and re-queues the triggering event.
    #[error("sidecar directory missing: {0}")]
    MissingSidecar(PathBuf),

    /// The path mapper was asked about a path outside its source root.
    #[error(transparent)]
    NotUnderRoot(#[from] DomainError),

    /// Any other I/O failure (disk full, unmount). Logged and dropped; the
    /// next modification on the path will retry.
    #[error("fatal I/O error on {path}: {source}")]
    Fatal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that propagate out of the engine's lifecycle operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `start` was called on an already-running engine.
    #[error("engine is already running")]
    AlreadyRunning,

    /// `stop` was called (or an operation requiring a running engine) while
    /// idle. `stop` itself is idempotent and does not raise this; it is used
    /// by operations that require the engine to be up.
    #[error("engine is not running")]
    NotRunning,

    /// The supplied configuration was invalid (equal roots, non-absolute
    /// paths) or a root does not exist.
    #[error("invalid configuration: {0}")]
    Config(#[from] DomainError),

    /// The underlying watcher could not be created or attached to a root.
    #[error("failed to start filesystem watcher: {0}")]
    Watcher(#[source] notify::Error),

    /// A sidecar directory could not be created or removed.
    #[error("sidecar directory error: {0}")]
    Sidecar(#[source] std::io::Error),
}
