//! dirsync-patch: binary diff/apply for the differential sync path.
//!
//! Computes a binary patch from a stale destination to a fresh source,
//! writes it to a sidecar `.patch` file, then applies that patch back onto
//! the destination in place. This narrow concern lives in its own crate
//! rather than inlined into the engine, the way other single-purpose
//! filesystem concerns here are kept separable and independently testable.
//!
//! `qbsdiff` does the actual bsdiff/bspatch work; this crate only adds the
//! file-level plumbing (reading both sides, writing the patch to its
//! sidecar path, applying it, all off the async runtime's worker pool since
//! `qbsdiff` is synchronous and CPU-bound).

pub mod error;

use std::path::{Path, PathBuf};

use qbsdiff::{Bsdiff, Bspatch};
use tracing::debug;

pub use error::PatchError;

/// Computes a binary patch that transforms `old_bytes` into `new_bytes`.
///
/// Runs on a blocking thread since `bsdiff` compression is CPU-bound.
pub async fn diff(old_bytes: Vec<u8>, new_bytes: Vec<u8>) -> Result<Vec<u8>, PatchError> {
    tokio::task::spawn_blocking(move || diff_blocking(&old_bytes, &new_bytes))
        .await
        .expect("diff worker thread panicked")
}

/// Applies `patch_bytes` to `old_bytes`, returning the patched content.
///
/// Runs on a blocking thread for the same reason as [`diff`].
pub async fn apply(old_bytes: Vec<u8>, patch_bytes: Vec<u8>) -> Result<Vec<u8>, PatchError> {
    tokio::task::spawn_blocking(move || apply_blocking(&old_bytes, &patch_bytes))
        .await
        .expect("apply worker thread panicked")
}

fn diff_blocking(old_bytes: &[u8], new_bytes: &[u8]) -> Result<Vec<u8>, PatchError> {
    let mut patch = Vec::new();
    Bsdiff::new(old_bytes, new_bytes)
        .compare(std::io::Cursor::new(&mut patch))
        .map_err(PatchError::Compute)?;
    Ok(patch)
}

fn apply_blocking(old_bytes: &[u8], patch_bytes: &[u8]) -> Result<Vec<u8>, PatchError> {
    let mut out = Vec::new();
    let patcher = Bspatch::new(patch_bytes).map_err(PatchError::Compute)?;
    patcher
        .apply(old_bytes, std::io::Cursor::new(&mut out))
        .map_err(PatchError::Compute)?;
    Ok(out)
}

/// File-level convenience wrapper mirroring `bsdiff4.file_diff` /
/// `bsdiff4.file_patch`: reads `old_path` and `new_path`, computes the
/// patch, and writes it to `patch_path` (creating parent directories as the
/// sidecar layout requires).
///
/// # Errors
/// Returns [`PatchError::Io`] if any of the three files cannot be read or
/// written, [`PatchError::Compute`] if the diff itself fails.
pub async fn diff_files(
    old_path: &Path,
    new_path: &Path,
    patch_path: &Path,
) -> Result<(), PatchError> {
    let old_bytes = read(old_path).await?;
    let new_bytes = read(new_path).await?;

    debug!(
        old = %old_path.display(),
        new = %new_path.display(),
        patch = %patch_path.display(),
        "computing binary patch"
    );

    let patch_bytes = diff(old_bytes, new_bytes).await?;

    if let Some(parent) = patch_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_err(parent, e))?;
    }
    tokio::fs::write(patch_path, &patch_bytes)
        .await
        .map_err(|e| io_err(patch_path, e))
}

/// File-level convenience wrapper applying `patch_path` to `old_path` and
/// overwriting `old_path` in place with the result, mirroring
/// `bsdiff4.file_patch(src_path=dest, dst_path=dest, patch_path=diff_file)`.
///
/// # Errors
/// Returns [`PatchError::Io`] if the files cannot be read or written,
/// [`PatchError::Compute`] if applying the patch fails.
pub async fn apply_file_in_place(old_path: &Path, patch_path: &Path) -> Result<(), PatchError> {
    let old_bytes = read(old_path).await?;
    let patch_bytes = read(patch_path).await?;

    let patched = apply(old_bytes, patch_bytes).await?;

    let tmp_path = tmp_path_for(old_path);
    tokio::fs::write(&tmp_path, &patched)
        .await
        .map_err(|e| io_err(&tmp_path, e))?;
    tokio::fs::rename(&tmp_path, old_path)
        .await
        .map_err(|e| io_err(old_path, e))?;

    debug!(path = %old_path.display(), "applied binary patch in place");
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".tmp");
    PathBuf::from(p)
}

async fn read(path: &Path) -> Result<Vec<u8>, PatchError> {
    tokio::fs::read(path).await.map_err(|e| io_err(path, e))
}

fn io_err(path: &Path, source: std::io::Error) -> PatchError {
    PatchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_diff_apply_roundtrip() {
        let old = b"the quick brown fox jumps over the lazy dog".to_vec();
        let new = b"the quick brown fox leaps over the lazy dog, twice".to_vec();

        let patch = diff(old.clone(), new.clone()).await.unwrap();
        let applied = apply(old, patch).await.unwrap();

        assert_eq!(applied, new);
    }

    #[tokio::test]
    async fn test_identity_patch_is_noop() {
        let bytes = b"unchanged content".to_vec();
        let patch = diff(bytes.clone(), bytes.clone()).await.unwrap();
        let applied = apply(bytes.clone(), patch).await.unwrap();
        assert_eq!(applied, bytes);
    }

    #[tokio::test]
    async fn test_diff_files_and_apply_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest.bin");
        let src = dir.path().join("src.bin");
        let patch = dir.path().join(".syncdog").join("dest.patch");

        tokio::fs::write(&dest, b"version one").await.unwrap();
        tokio::fs::write(&src, b"version two, longer").await.unwrap();

        diff_files(&dest, &src, &patch).await.unwrap();
        assert!(patch.exists());

        apply_file_in_place(&dest, &patch).await.unwrap();

        let result = tokio::fs::read(&dest).await.unwrap();
        assert_eq!(result, b"version two, longer");
    }
}
