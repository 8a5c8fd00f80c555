//! Mirror handler
//!
//! Two-way extension of the one-way handler: either root can be the
//! source of a change, so every action needs to pick its destination roots
//! based on which side produced the event. [`crate::adapter::EventAdapter`]
//! already tags each event with its originating [`Side`] (one watcher per
//! root), so the handler never has to re-derive source from the path
//! itself — the tagging happens upstream in the event adapter.
//!
//! The hard part two-way sync adds is echo suppression: a write this
//! handler makes to B will be reported right back by B's own watcher.
//! [`SuppressionSet`] breaks that loop by remembering, for a short TTL, the
//! exact destination path this handler itself just wrote, so the resulting
//! watcher event can be recognized and dropped instead of bounced back to A.

use std::path::PathBuf;
use std::time::Instant;

use dirsync_core::domain::{AbsPath, Event, EventKind};
use tracing::debug;

use crate::actions;
use crate::adapter::{Side, SidedEvent};
use crate::debounce::{DebounceTable, PendingKind};
use crate::error::ActionError;
use crate::mapper;
use crate::size::{self, SizeSample};
use crate::suppression::SuppressionSet;

/// What the mirror handler did with an event or a due debounce entry.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Dispatched(PathBuf),
    Queued,
    /// Dropped: a sidecar path, a suppressed echo, a directory `modified`,
    /// or a no-op size match (the "modified, same size" shortcut).
    Ignored,
}

/// Bidirectional replication between `root_a` and `root_b`.
pub struct MirrorHandler {
    root_a: AbsPath,
    root_b: AbsPath,
    sidecar_a: AbsPath,
    sidecar_b: AbsPath,
    sidecar_name: String,
}

impl MirrorHandler {
    #[must_use]
    pub fn new(
        root_a: AbsPath,
        root_b: AbsPath,
        sidecar_a: AbsPath,
        sidecar_b: AbsPath,
        sidecar_name: String,
    ) -> Self {
        Self {
            root_a,
            root_b,
            sidecar_a,
            sidecar_b,
            sidecar_name,
        }
    }

    /// Source root and destination root, selected by which side an event
    /// came from.
    fn roots(&self, side: Side) -> (&AbsPath, &AbsPath) {
        match side {
            Side::A => (&self.root_a, &self.root_b),
            Side::B => (&self.root_b, &self.root_a),
        }
    }

    /// The sidecar directory under the destination root for `side`'s
    /// traffic, used to stage patch files when the debounce entry resolves.
    fn dst_sidecar(&self, side: Side) -> &AbsPath {
        match side {
            Side::A => &self.sidecar_b,
            Side::B => &self.sidecar_a,
        }
    }

    pub async fn handle_event(
        &self,
        sided: &SidedEvent,
        debounce: &mut DebounceTable,
        suppression: &mut SuppressionSet,
    ) -> Result<Outcome, ActionError> {
        let event = &sided.event;

        if event.src.has_component(&self.sidecar_name) {
            debug!(path = %event.src, "ignoring event inside sidecar directory");
            return Ok(Outcome::Ignored);
        }

        // Directory events are cheap to replay (mkdir/rmdir are idempotent)
        // and are never suppressed.
        if !event.is_directory
            && suppression.consume(&event.src.as_path().to_path_buf(), Instant::now())
        {
            debug!(path = %event.src, side = ?sided.side, "dropping self-caused echo");
            return Ok(Outcome::Ignored);
        }

        let (src_root, dst_root) = self.roots(sided.side);

        match event.kind {
            EventKind::Created if event.is_directory => {
                let dst = actions::create_directory(src_root, &event.src, dst_root).await?;
                Ok(Outcome::Dispatched(dst.as_path().to_path_buf()))
            }

            EventKind::Created => {
                self.queue(event.src.as_path().to_path_buf(), PendingKind::Created, debounce)
                    .await;
                Ok(Outcome::Queued)
            }

            EventKind::Modified if event.is_directory => Ok(Outcome::Ignored),

            EventKind::Modified => {
                let path = event.src.as_path().to_path_buf();
                if debounce.contains(&path) {
                    return Ok(Outcome::Ignored);
                }
                if self.same_size_as_destination(src_root, dst_root, &event.src).await {
                    debug!(path = %event.src, "destination already matches source size, skipping");
                    return Ok(Outcome::Ignored);
                }
                self.queue(path, PendingKind::Modified, debounce).await;
                Ok(Outcome::Queued)
            }

            EventKind::Deleted => {
                debounce.cancel(&event.src.as_path().to_path_buf());
                let dst = mapper::map(src_root, dst_root, &event.src)?;
                suppression.mark(dst.as_path().to_path_buf());
                let dst = actions::delete(src_root, &event.src, dst_root).await?;
                Ok(Outcome::Dispatched(dst.as_path().to_path_buf()))
            }

            EventKind::Moved => {
                debounce.cancel(&event.src.as_path().to_path_buf());
                let new_src = event
                    .dst
                    .as_ref()
                    .expect("moved event always carries a destination path");
                let new_dst = mapper::map(src_root, dst_root, new_src)?;
                suppression.mark(new_dst.as_path().to_path_buf());
                let dst = actions::rename(src_root, &event.src, new_src, dst_root).await?;
                Ok(Outcome::Dispatched(dst.as_path().to_path_buf()))
            }
        }
    }

    async fn queue(&self, path: PathBuf, kind: PendingKind, debounce: &mut DebounceTable) {
        let size = match size::sample_size(&path).await {
            SizeSample::Present(n) => n,
            SizeSample::StillInFlight | SizeSample::Gone => 0,
        };
        debounce.observe(path, kind, size);
    }

    async fn same_size_as_destination(
        &self,
        src_root: &AbsPath,
        dst_root: &AbsPath,
        src_path: &AbsPath,
    ) -> bool {
        let Ok(dst_path) = mapper::map(src_root, dst_root, src_path) else {
            return false;
        };
        let (src_size, dst_size) = (
            size::sample_size(src_path.as_path()).await,
            size::sample_size(dst_path.as_path()).await,
        );
        matches!((src_size, dst_size), (SizeSample::Present(a), SizeSample::Present(b)) if a == b)
    }

    /// Resolves a path the debounce table reported as due for `side`.
    pub async fn handle_due(
        &self,
        path: &PathBuf,
        side: Side,
        debounce: &mut DebounceTable,
        suppression: &mut SuppressionSet,
    ) -> Result<Option<PathBuf>, ActionError> {
        let sample = size::sample_size(path).await;
        let current_size = match sample {
            SizeSample::Present(n) => n,
            SizeSample::StillInFlight => return Ok(None),
            SizeSample::Gone => {
                debounce.cancel(path);
                return Ok(None);
            }
        };

        let Some(kind) = debounce.confirm_stable(path, current_size) else {
            return Ok(None);
        };

        let (src_root, dst_root) = self.roots(side);
        let dst_sidecar = self.dst_sidecar(side);
        let src_path = AbsPath::new(path.clone())?;
        let dst_path = mapper::map(src_root, dst_root, &src_path)?;
        suppression.mark(dst_path.as_path().to_path_buf());

        let dst = match kind {
            PendingKind::Created => actions::create_file(src_root, &src_path, dst_root).await?,
            PendingKind::Modified => {
                actions::patch(src_root, &src_path, dst_root, dst_sidecar).await?
            }
        };
        Ok(Some(dst.as_path().to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn root(dir: &tempfile::TempDir) -> AbsPath {
        AbsPath::new(dir.path().to_path_buf()).unwrap()
    }

    fn handler(
        a: &tempfile::TempDir,
        b: &tempfile::TempDir,
        sidecar_a: &tempfile::TempDir,
        sidecar_b: &tempfile::TempDir,
    ) -> MirrorHandler {
        MirrorHandler::new(
            root(a),
            root(b),
            root(sidecar_a),
            root(sidecar_b),
            ".syncdog".to_string(),
        )
    }

    #[tokio::test]
    async fn test_event_from_b_replicates_to_a() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let sa = tempfile::tempdir().unwrap();
        let sb = tempfile::tempdir().unwrap();
        let h = handler(&a, &b, &sa, &sb);
        let mut debounce = DebounceTable::new(Duration::from_millis(50));
        let mut suppression = SuppressionSet::new(Duration::from_millis(200));

        let sub = b.path().join("sub");
        tokio::fs::create_dir_all(&sub).await.unwrap();
        let sided = SidedEvent {
            side: Side::B,
            event: Event::created(AbsPath::new(sub).unwrap(), true),
        };

        let outcome = h
            .handle_event(&sided, &mut debounce, &mut suppression)
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Dispatched(_)));
        assert!(a.path().join("sub").is_dir());
    }

    #[tokio::test]
    async fn test_suppressed_echo_is_dropped() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let sa = tempfile::tempdir().unwrap();
        let sb = tempfile::tempdir().unwrap();
        let h = handler(&a, &b, &sa, &sb);
        let mut debounce = DebounceTable::new(Duration::from_millis(50));
        let mut suppression = SuppressionSet::new(Duration::from_millis(200));

        let echoed_path = b.path().join("mirrored.txt");
        tokio::fs::write(&echoed_path, b"x").await.unwrap();
        suppression.mark(echoed_path.clone());

        let sided = SidedEvent {
            side: Side::B,
            event: Event::created(AbsPath::new(echoed_path).unwrap(), false),
        };
        let outcome = h
            .handle_event(&sided, &mut debounce, &mut suppression)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Ignored);
        assert!(debounce.is_empty());
    }

    #[tokio::test]
    async fn test_modify_same_size_as_destination_is_skipped() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let sa = tempfile::tempdir().unwrap();
        let sb = tempfile::tempdir().unwrap();
        let h = handler(&a, &b, &sa, &sb);
        let mut debounce = DebounceTable::new(Duration::from_millis(50));
        let mut suppression = SuppressionSet::new(Duration::from_millis(200));

        tokio::fs::write(a.path().join("same.txt"), b"12345").await.unwrap();
        tokio::fs::write(b.path().join("same.txt"), b"67890").await.unwrap();

        let sided = SidedEvent {
            side: Side::A,
            event: Event::modified(AbsPath::new(a.path().join("same.txt")).unwrap(), false),
        };
        let outcome = h
            .handle_event(&sided, &mut debounce, &mut suppression)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Ignored);
        assert!(debounce.is_empty());
    }

    #[tokio::test]
    async fn test_sidecar_event_is_ignored_on_either_side() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let sa = tempfile::tempdir().unwrap();
        let sb = tempfile::tempdir().unwrap();
        let h = handler(&a, &b, &sa, &sb);
        let mut debounce = DebounceTable::new(Duration::from_millis(50));
        let mut suppression = SuppressionSet::new(Duration::from_millis(200));

        let path = b.path().join(".syncdog").join("x.patch");
        let sided = SidedEvent {
            side: Side::B,
            event: Event::created(AbsPath::new(path).unwrap(), false),
        };
        let outcome = h
            .handle_event(&sided, &mut debounce, &mut suppression)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Ignored);
    }

    #[tokio::test]
    async fn test_handle_due_marks_suppression_before_dispatch() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let sa = tempfile::tempdir().unwrap();
        let sb = tempfile::tempdir().unwrap();
        let h = handler(&a, &b, &sa, &sb);
        let mut debounce = DebounceTable::new(Duration::from_millis(0));
        let mut suppression = SuppressionSet::new(Duration::from_millis(200));

        let src_file = a.path().join("fresh.txt");
        tokio::fs::write(&src_file, b"hello").await.unwrap();
        debounce.observe(src_file.clone(), PendingKind::Created, 5);

        let dispatched = h
            .handle_due(&src_file, Side::A, &mut debounce, &mut suppression)
            .await
            .unwrap();
        assert!(dispatched.is_some());
        let dst_path = b.path().join("fresh.txt");
        assert!(!suppression.is_empty());
        assert!(suppression.consume(&dst_path, Instant::now()));
    }
}
