//! Domain types shared across the sync engine crates.

pub mod config;
pub mod errors;
pub mod event;
pub mod path;

pub use config::{Mode, SyncConfig, DEFAULT_MIRROR_DEBOUNCE_MS, DEFAULT_ONEWAY_DEBOUNCE_MS, DEFAULT_SIDECAR_NAME};
pub use errors::DomainError;
pub use event::{Event, EventKind};
pub use path::AbsPath;
