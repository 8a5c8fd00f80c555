//! Event source adapter
//!
//! Wraps `notify::RecommendedWatcher`, normalizing its output straight into
//! [`dirsync_core::domain::Event`] and tagging every event with which
//! watched root it came from so the mirror handler can tell source side
//! from destination side without re-deriving it from the path.
//!
//! Runs the watcher callback (which `notify` invokes on its own thread) and
//! forwards into an unbounded `tokio::sync::mpsc` channel: a slow consumer
//! backs up the channel rather than blocking the watcher thread. A stop
//! signal closes the watcher and drops the sender, which closes the channel
//! for the consumer.

use std::path::Path;

use dirsync_core::domain::{AbsPath, Event};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind as NotifyEventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::error::EngineError;

/// Which watched root an event originated from. In one-way mode only `A` is
/// used (the destination side never needs a watch); in mirror mode both
/// sides are watched concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

/// An [`Event`] tagged with the side that produced it.
#[derive(Debug, Clone)]
pub struct SidedEvent {
    pub side: Side,
    pub event: Event,
}

/// Adapter over one or two recursively-watched roots.
///
/// `notify`'s event callback is fixed at watcher-construction time and
/// carries no per-path state, so tagging events by [`Side`] means running
/// one `RecommendedWatcher` per side, both feeding the same channel. In
/// one-way mode only `A` is ever added; in mirror mode both are.
pub struct EventAdapter {
    tx: mpsc::UnboundedSender<SidedEvent>,
    watchers: Vec<RecommendedWatcher>,
}

impl EventAdapter {
    /// Creates an adapter with no roots watched yet, and the receiving half
    /// of its event channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SidedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel::<SidedEvent>();
        (
            Self {
                tx,
                watchers: Vec::new(),
            },
            rx,
        )
    }

    /// Starts recursively watching `root`, tagging every event it produces
    /// with `side`.
    pub fn add(&mut self, side: Side, root: &AbsPath) -> Result<(), EngineError> {
        let tx = self.tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| forward(side, res, &tx),
            notify::Config::default(),
        )
        .map_err(EngineError::Watcher)?;

        watcher
            .watch(root.as_path(), RecursiveMode::Recursive)
            .map_err(EngineError::Watcher)?;

        self.watchers.push(watcher);
        Ok(())
    }
}

fn forward(
    side: Side,
    res: Result<notify::Event, notify::Error>,
    tx: &mpsc::UnboundedSender<SidedEvent>,
) {
    match res {
        Ok(raw) => {
            if let Some(event) = map_notify_event(&raw) {
                if tx.send(SidedEvent { side, event }).is_err() {
                    warn!("event receiver dropped, discarding watcher event");
                }
            }
        }
        Err(err) => error!(error = %err, "filesystem watcher error"),
    }
}

/// Converts a raw `notify::Event` into a normalized [`Event`], or `None` for
/// event kinds the engine does not act on (only create, modify, delete, and
/// rename at any depth are forwarded).
fn map_notify_event(event: &notify::Event) -> Option<Event> {
    let paths = &event.paths;

    match &event.kind {
        NotifyEventKind::Create(kind) => {
            let path = to_abs(paths.first()?)?;
            let is_directory = matches!(kind, notify::event::CreateKind::Folder)
                || stat_is_dir(path.as_path());
            debug!(path = %path, is_directory, "mapped create event");
            Some(Event::created(path, is_directory))
        }

        NotifyEventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => {
            let old = to_abs(&paths[0])?;
            let new = to_abs(&paths[1])?;
            let is_directory = stat_is_dir(new.as_path());
            debug!(old = %old, new = %new, is_directory, "mapped rename event");
            Some(Event::moved(old, new, is_directory))
        }

        NotifyEventKind::Modify(ModifyKind::Data(_)) => {
            let path = to_abs(paths.first()?)?;
            let is_directory = stat_is_dir(path.as_path());
            debug!(path = %path, "mapped modify(data) event");
            Some(Event::modified(path, is_directory))
        }

        NotifyEventKind::Modify(_) => {
            let path = to_abs(paths.first()?)?;
            let is_directory = stat_is_dir(path.as_path());
            debug!(path = %path, kind = ?event.kind, "mapped other modify event");
            Some(Event::modified(path, is_directory))
        }

        NotifyEventKind::Remove(kind) => {
            let path = to_abs(paths.first()?)?;
            let is_directory = matches!(kind, notify::event::RemoveKind::Folder);
            debug!(path = %path, is_directory, "mapped remove event");
            Some(Event::deleted(path, is_directory))
        }

        _ => None,
    }
}

fn to_abs(path: &Path) -> Option<AbsPath> {
    AbsPath::new(path.to_path_buf()).ok()
}

/// Best-effort directory check used when `notify` doesn't tell us the kind
/// directly (data modifications, renames). Defaults to `false` (file) if the
/// path can no longer be stat'd; directory `modified` events are ignored by
/// the handlers regardless, so misclassifying a vanished directory as a
/// file here has no observable effect.
fn stat_is_dir(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_map_create_file_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"x").unwrap();

        let event = notify::Event {
            kind: NotifyEventKind::Create(notify::event::CreateKind::File),
            paths: vec![path.clone()],
            attrs: Default::default(),
        };
        let mapped = map_notify_event(&event).unwrap();
        assert!(!mapped.is_directory);
        assert_eq!(mapped.src.as_path(), path);
    }

    #[test]
    fn test_map_create_folder_event() {
        let path = PathBuf::from("/tmp/does-not-need-to-exist-for-this-kind");
        let event = notify::Event {
            kind: NotifyEventKind::Create(notify::event::CreateKind::Folder),
            paths: vec![path],
            attrs: Default::default(),
        };
        let mapped = map_notify_event(&event).unwrap();
        assert!(mapped.is_directory);
    }

    #[test]
    fn test_map_rename_event_both_paths() {
        let dir = tempfile::tempdir().unwrap();
        let new_path = dir.path().join("new.txt");
        std::fs::write(&new_path, b"x").unwrap();
        let old_path = dir.path().join("old.txt");

        let event = notify::Event {
            kind: NotifyEventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            paths: vec![old_path.clone(), new_path.clone()],
            attrs: Default::default(),
        };
        let mapped = map_notify_event(&event).unwrap();
        assert_eq!(mapped.src.as_path(), old_path);
        assert_eq!(mapped.dst.unwrap().as_path(), new_path);
    }

    #[test]
    fn test_map_remove_event() {
        let path = PathBuf::from("/tmp/already-gone.txt");
        let event = notify::Event {
            kind: NotifyEventKind::Remove(notify::event::RemoveKind::File),
            paths: vec![path.clone()],
            attrs: Default::default(),
        };
        let mapped = map_notify_event(&event).unwrap();
        assert_eq!(mapped.src.as_path(), path);
        assert!(!mapped.is_directory);
    }

    #[test]
    fn test_map_access_event_ignored() {
        let event = notify::Event {
            kind: NotifyEventKind::Access(notify::event::AccessKind::Read),
            paths: vec![PathBuf::from("/tmp/a.txt")],
            attrs: Default::default(),
        };
        assert!(map_notify_event(&event).is_none());
    }

    #[test]
    fn test_map_event_no_paths_ignored() {
        let event = notify::Event {
            kind: NotifyEventKind::Create(notify::event::CreateKind::File),
            paths: vec![],
            attrs: Default::default(),
        };
        assert!(map_notify_event(&event).is_none());
    }
}
