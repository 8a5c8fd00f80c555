//! Debounce table
//!
//! Poll-driven coalescing keyed by path, with a size-stability requirement
//! layered on top: a path is not considered settled just because it has
//! been quiet for the debounce interval, it must also have stopped growing.
//! Size sampling touches the filesystem and is async, so it is kept out of
//! this type; [`DebounceTable`] itself is a plain, synchronous data
//! structure the dispatch loop drives.
//!
//! Firing is synchronous with removal: once an entry is due and its sampled
//! size confirms stability, [`DebounceTable::confirm_stable`] removes it and
//! hands the pending kind back to the caller in the same call. That means an
//! `observe()` call can never witness "the timer already fired" for a path
//! that still has an entry — if it fired, the entry is gone, and a fresh
//! `observe()` just inserts it again as new. This collapses what would
//! otherwise be a distinct "already fired" branch into the ordinary
//! absent-entry case.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use dirsync_core::domain::EventKind;

/// The two event kinds the debounce table tracks: only `created` and
/// `modified` events on files are observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    Created,
    Modified,
}

impl PendingKind {
    /// Converts a normalized [`EventKind`], returning `None` for kinds the
    /// debounce table never tracks directly (`deleted`, `moved`).
    #[must_use]
    pub fn from_event_kind(kind: EventKind) -> Option<Self> {
        match kind {
            EventKind::Created => Some(Self::Created),
            EventKind::Modified => Some(Self::Modified),
            EventKind::Deleted | EventKind::Moved => None,
        }
    }
}

struct Entry {
    last_seen_size: u64,
    pending_kind: PendingKind,
    due_at: Instant,
}

/// Per-path table of in-flight files awaiting size stability.
///
/// Owned exclusively by the dispatch loop, which holds all debounce entries
/// and timers as local state rather than sharing them behind a lock.
/// Nothing here spawns a
/// timer; the dispatch loop polls on its own schedule and asks this table
/// which paths are [`due`](DebounceTable::due).
pub struct DebounceTable {
    pending: HashMap<PathBuf, Entry>,
    interval: Duration,
}

impl DebounceTable {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            interval,
        }
    }

    /// Records an observed `created` or `modified` event together with the
    /// file's size as sampled at event time.
    ///
    /// - First observation for a path: inserts a new entry due one interval
    ///   from now.
    /// - Size differs from what's on record: updates the size and re-arms
    ///   the due time (the file is still being written).
    /// - Size matches and the event is `modified` while an entry already
    ///   exists: a no-op other than re-arming, per the tie-break in spec
    ///   section 4.3 — a `created` entry is never downgraded to `modified`.
    pub fn observe(&mut self, path: PathBuf, kind: PendingKind, current_size: u64) {
        match self.pending.get_mut(&path) {
            None => {
                self.pending.insert(
                    path,
                    Entry {
                        last_seen_size: current_size,
                        pending_kind: kind,
                        due_at: Instant::now() + self.interval,
                    },
                );
            }
            Some(entry) => {
                entry.due_at = Instant::now() + self.interval;
                entry.last_seen_size = current_size;
                // A created-then-modified burst collapses to `created`; keep
                // whatever kind was first observed.
            }
        }
    }

    /// Removes any entry for `path` (spec: called on `deleted` and `moved`
    /// for the source side).
    pub fn cancel(&mut self, path: &PathBuf) {
        self.pending.remove(path);
    }

    /// Whether `path` already has a pending entry.
    #[must_use]
    pub fn contains(&self, path: &PathBuf) -> bool {
        self.pending.contains_key(path)
    }

    /// Returns the set of paths whose debounce interval has elapsed and are
    /// candidates for a stability check.
    #[must_use]
    pub fn due(&self, now: Instant) -> Vec<PathBuf> {
        self.pending
            .iter()
            .filter(|(_, entry)| entry.due_at <= now)
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Resolves a due path against a freshly-sampled size.
    ///
    /// If the size matches what was last recorded, the file is stable: the
    /// entry is removed and its pending kind returned for dispatch. If the
    /// size has grown, the entry is updated and re-armed, and `None` is
    /// returned.
    pub fn confirm_stable(&mut self, path: &PathBuf, current_size: u64) -> Option<PendingKind> {
        let entry = self.pending.get_mut(path)?;
        if entry.last_seen_size == current_size {
            let kind = entry.pending_kind;
            self.pending.remove(path);
            Some(kind)
        } else {
            entry.last_seen_size = current_size;
            entry.due_at = Instant::now() + self.interval;
            None
        }
    }

    /// Cancels all timers and empties the table (spec: called on `stop`).
    pub fn drain(&mut self) {
        self.pending.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_inserts_new_entry() {
        let mut table = DebounceTable::new(Duration::from_millis(50));
        table.observe(PathBuf::from("/a.txt"), PendingKind::Created, 5);
        assert_eq!(table.pending_count(), 1);
    }

    #[test]
    fn test_created_then_modified_collapses_to_created() {
        let mut table = DebounceTable::new(Duration::from_millis(0));
        let path = PathBuf::from("/a.txt");
        table.observe(path.clone(), PendingKind::Created, 5);
        table.observe(path.clone(), PendingKind::Modified, 5);

        let kind = table.confirm_stable(&path, 5);
        assert_eq!(kind, Some(PendingKind::Created));
    }

    #[test]
    fn test_confirm_stable_matching_size_dispatches() {
        let mut table = DebounceTable::new(Duration::from_millis(0));
        let path = PathBuf::from("/a.txt");
        table.observe(path.clone(), PendingKind::Modified, 10);

        let result = table.confirm_stable(&path, 10);
        assert_eq!(result, Some(PendingKind::Modified));
        assert!(table.is_empty());
    }

    #[test]
    fn test_confirm_stable_growing_size_rearms() {
        let mut table = DebounceTable::new(Duration::from_millis(50));
        let path = PathBuf::from("/big.bin");
        table.observe(path.clone(), PendingKind::Created, 1024);

        let result = table.confirm_stable(&path, 2048);
        assert_eq!(result, None);
        assert_eq!(table.pending_count(), 1);
    }

    #[test]
    fn test_contains_reflects_pending_state() {
        let mut table = DebounceTable::new(Duration::from_millis(50));
        let path = PathBuf::from("/a.txt");
        assert!(!table.contains(&path));
        table.observe(path.clone(), PendingKind::Created, 5);
        assert!(table.contains(&path));
        table.cancel(&path);
        assert!(!table.contains(&path));
    }

    #[test]
    fn test_cancel_removes_entry() {
        let mut table = DebounceTable::new(Duration::from_millis(50));
        let path = PathBuf::from("/a.txt");
        table.observe(path.clone(), PendingKind::Created, 5);
        table.cancel(&path);
        assert!(table.is_empty());
    }

    #[test]
    fn test_drain_clears_everything() {
        let mut table = DebounceTable::new(Duration::from_millis(50));
        table.observe(PathBuf::from("/a.txt"), PendingKind::Created, 5);
        table.observe(PathBuf::from("/b.txt"), PendingKind::Modified, 7);
        table.drain();
        assert!(table.is_empty());
    }

    #[test]
    fn test_due_reports_elapsed_entries_only() {
        let mut table = DebounceTable::new(Duration::from_millis(50));
        table.observe(PathBuf::from("/a.txt"), PendingKind::Created, 5);

        assert!(table.due(Instant::now()).is_empty());
        let later = Instant::now() + Duration::from_millis(60);
        assert_eq!(table.due(later).len(), 1);
    }

    #[test]
    fn test_confirm_stable_unknown_path_returns_none() {
        let mut table = DebounceTable::new(Duration::from_millis(50));
        let result = table.confirm_stable(&PathBuf::from("/missing.txt"), 0);
        assert_eq!(result, None);
    }

    #[test]
    fn test_from_event_kind_maps_created_and_modified_only() {
        assert_eq!(
            PendingKind::from_event_kind(EventKind::Created),
            Some(PendingKind::Created)
        );
        assert_eq!(
            PendingKind::from_event_kind(EventKind::Modified),
            Some(PendingKind::Modified)
        );
        assert_eq!(PendingKind::from_event_kind(EventKind::Deleted), None);
        assert_eq!(PendingKind::from_event_kind(EventKind::Moved), None);
    }
}
