//! Echo-suppression set for mirror mode
//!
//! Every write the mirror handler makes to one side is, moments later, going
//! to be reported back by that side's own watcher. Without this set that
//! echo would be replicated right back to the side it came from, forever.
//! This is an addition beyond one-way replication, which has no need to
//! distinguish self-caused changes (echoes) from genuine user edits since
//! it only ever watches the source side.
//!
//! The shape here follows the same "expiring marker table" idiom as
//! [`crate::debounce::DebounceTable`] — a plain synchronous structure the
//! dispatch loop consults, not a self-driving timer — with a TTL at least
//! as long as the debounce interval, since an echo cannot arrive back from
//! the other side's watcher before its own debounce settles.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Tracks destination paths the mirror handler itself just wrote, so the
/// watcher event that write produces can be told apart from a genuine edit.
pub struct SuppressionSet {
    entries: HashMap<PathBuf, Instant>,
    ttl: Duration,
}

impl SuppressionSet {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Marks `path` as just written by the handler, armed for one `ttl`.
    pub fn mark(&mut self, path: PathBuf) {
        self.entries.insert(path, Instant::now() + self.ttl);
    }

    /// Checks whether `path` is a live echo. If so, consumes the marker (an
    /// echo is only ever suppressed once) and returns `true`; otherwise
    /// returns `false` without modifying the set.
    pub fn consume(&mut self, path: &PathBuf, now: Instant) -> bool {
        match self.entries.get(path) {
            Some(expires_at) if *expires_at >= now => {
                self.entries.remove(path);
                true
            }
            Some(_) => {
                self.entries.remove(path);
                false
            }
            None => false,
        }
    }

    /// Drops expired markers. Called periodically by the dispatch loop so
    /// the set doesn't grow unbounded when a marked path's echo never
    /// arrives (e.g. the write failed after all).
    pub fn sweep(&mut self, now: Instant) {
        self.entries.retain(|_, expires_at| *expires_at >= now);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_then_consume_suppresses_once() {
        let mut set = SuppressionSet::new(Duration::from_millis(100));
        let path = PathBuf::from("/b/file.txt");
        set.mark(path.clone());

        assert!(set.consume(&path, Instant::now()));
        assert!(!set.consume(&path, Instant::now()), "a marker is consumed only once");
    }

    #[test]
    fn test_consume_unmarked_path_is_false() {
        let mut set = SuppressionSet::new(Duration::from_millis(100));
        assert!(!set.consume(&PathBuf::from("/b/other.txt"), Instant::now()));
    }

    #[test]
    fn test_consume_after_ttl_expired_is_false() {
        let mut set = SuppressionSet::new(Duration::from_millis(0));
        let path = PathBuf::from("/b/file.txt");
        set.mark(path.clone());

        let later = Instant::now() + Duration::from_millis(5);
        assert!(!set.consume(&path, later));
    }

    #[test]
    fn test_sweep_drops_expired_only() {
        let mut set = SuppressionSet::new(Duration::from_millis(0));
        set.mark(PathBuf::from("/b/old.txt"));
        let later = Instant::now() + Duration::from_millis(10);
        set.sweep(later);
        assert!(set.is_empty());
    }

    #[test]
    fn test_clear_empties_set() {
        let mut set = SuppressionSet::new(Duration::from_millis(100));
        set.mark(PathBuf::from("/b/file.txt"));
        set.clear();
        assert!(set.is_empty());
    }
}
