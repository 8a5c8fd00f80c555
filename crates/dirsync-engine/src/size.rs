//! File-size sampling for the debounce table's stability check: open the
//! file for read-only, seek to end, read the position, close.
//!
//! This is deliberately an open-and-seek rather than a `metadata().len()`
//! call: a metadata stat succeeds even while another process holds the file
//! open exclusively, whereas attempting to open it surfaces sharing
//! violations a plain stat would miss.

use std::io::SeekFrom;
use std::path::Path;

use tokio::io::AsyncSeekExt;

/// Outcome of sampling a path's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSample {
    /// The file is readable; carries its current size in bytes.
    Present(u64),
    /// The open failed with a permission or sharing error — the file is
    /// presumed to still be in flight.
    StillInFlight,
    /// The path no longer exists.
    Gone,
}

/// Samples the current size of `path` by opening and seeking to end.
pub async fn sample_size(path: &Path) -> SizeSample {
    let mut file = match tokio::fs::OpenOptions::new().read(true).open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return SizeSample::Gone,
        Err(e)
            if e.kind() == std::io::ErrorKind::PermissionDenied
                || e.kind() == std::io::ErrorKind::WouldBlock =>
        {
            return SizeSample::StillInFlight
        }
        Err(_) => return SizeSample::Gone,
    };

    match file.seek(SeekFrom::End(0)).await {
        Ok(pos) => SizeSample::Present(pos),
        Err(_) => SizeSample::StillInFlight,
    }
}
