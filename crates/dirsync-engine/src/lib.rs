//! dirsync-engine - Event-driven replication engine
//!
//! Turns filesystem notifications on one or two watched roots into
//! replication actions on the other side. Provides:
//! - `adapter`: watches roots via `notify`, normalizes and tags events
//! - `mapper`: translates a path from one root's namespace into the other's
//! - `debounce`: waits for a changed file's size to settle before acting
//! - `actions`: the concrete filesystem operations a replication performs
//! - `oneway`: drives a single source -> destination replication
//! - `mirror`: drives bidirectional replication with echo suppression
//! - `engine`: ties the above together behind start/stop/status

pub mod actions;
pub mod adapter;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod mirror;
pub mod oneway;
pub mod sidecar;
pub mod size;
pub mod suppression;

pub use adapter::{EventAdapter, Side, SidedEvent};
pub use engine::{Engine, Status};
pub use error::{ActionError, EngineError};
pub use mirror::MirrorHandler;
pub use oneway::OneWayHandler;
