//! One-way handler
//!
//! Turns a raw [`Event`] from one watched root into either an immediate
//! action (directories, deletes, renames) or a debounce-table entry that the
//! dispatch loop resolves once the underlying file stops growing.
//!
//! Paths inside the sidecar directory are never acted on here — its own
//! churn must not be mistaken for user content.

use std::path::PathBuf;

use dirsync_core::domain::{AbsPath, Event, EventKind};
use tracing::debug;

use crate::actions;
use crate::debounce::{DebounceTable, PendingKind};
use crate::error::ActionError;
use crate::size::{self, SizeSample};

/// What a one-way handler call did with an event, for the dispatch loop's
/// bookkeeping and tests.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// An action ran immediately and wrote `dst`.
    Dispatched(PathBuf),
    /// The event was filed in the debounce table, awaiting stability.
    Queued,
    /// The event was a no-op: a sidecar path, a directory `modified`, or a
    /// `modified` on a path already being watched for stability.
    Ignored,
}

/// Replicates `src_root` onto `dst_root`, writing transient patch data under
/// `sidecar_root`.
pub struct OneWayHandler {
    src_root: AbsPath,
    dst_root: AbsPath,
    sidecar_root: AbsPath,
    sidecar_name: String,
}

impl OneWayHandler {
    #[must_use]
    pub fn new(
        src_root: AbsPath,
        dst_root: AbsPath,
        sidecar_root: AbsPath,
        sidecar_name: String,
    ) -> Self {
        Self {
            src_root,
            dst_root,
            sidecar_root,
            sidecar_name,
        }
    }

    /// Handles one event observed on the source root.
    pub async fn handle_event(
        &self,
        event: &Event,
        debounce: &mut DebounceTable,
    ) -> Result<Outcome, ActionError> {
        if event.src.has_component(&self.sidecar_name) {
            debug!(path = %event.src, "ignoring event inside sidecar directory");
            return Ok(Outcome::Ignored);
        }

        match event.kind {
            EventKind::Created if event.is_directory => {
                let dst = actions::create_directory(&self.src_root, &event.src, &self.dst_root)
                    .await?;
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
                    debug!(path = %event.src, "modify on already-pending path, no-op");
                    return Ok(Outcome::Ignored);
                }
                self.queue(path, PendingKind::Modified, debounce).await;
                Ok(Outcome::Queued)
            }

            EventKind::Deleted => {
                debounce.cancel(&event.src.as_path().to_path_buf());
                let dst = actions::delete(&self.src_root, &event.src, &self.dst_root).await?;
                Ok(Outcome::Dispatched(dst.as_path().to_path_buf()))
            }

            EventKind::Moved => {
                debounce.cancel(&event.src.as_path().to_path_buf());
                let new_src = event
                    .dst
                    .as_ref()
                    .expect("moved event always carries a destination path");
                let dst =
                    actions::rename(&self.src_root, &event.src, new_src, &self.dst_root).await?;
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

    /// Resolves a path the debounce table reported as due. Returns `Ok(None)`
    /// if the file is still growing (re-armed internally) or has vanished.
    pub async fn handle_due(
        &self,
        path: &PathBuf,
        debounce: &mut DebounceTable,
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

        let src_path = AbsPath::new(path.clone())?;
        let dst = match kind {
            PendingKind::Created => {
                actions::create_file(&self.src_root, &src_path, &self.dst_root).await?
            }
            PendingKind::Modified => {
                actions::patch(
                    &self.src_root,
                    &src_path,
                    &self.dst_root,
                    &self.sidecar_root,
                )
                .await?
            }
        };
        Ok(Some(dst.as_path().to_path_buf()))
    }
}
