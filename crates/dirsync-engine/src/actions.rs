//! Replication actions
//!
//! Stateless procedures over `(src_root, src_path, dst_root, sidecar_root)`
//! implementing the atomic-write, recursive-delete, and binary-patch idioms
//! the dispatch loop drives.
//!
//! Every action returns the destination [`AbsPath`] it wrote (or would have
//! written, for the rename no-op case) so that callers — the mirror handler
//! in particular — can register it in the echo-suppression set.

use std::io::ErrorKind;
use std::path::Path;

use dirsync_core::domain::AbsPath;
use filetime::FileTime;
use tracing::{debug, warn};

use crate::error::ActionError;
use crate::mapper;

/// Copies `src_path` to its mapped location under `dst_root`, creating
/// parent directories as needed and preserving the source's modification
/// time.
///
/// Fails soft ([`ActionError::Transient`]) on permission errors so the
/// caller re-queues; fails hard ([`ActionError::Fatal`]) on anything else
/// unexpected.
pub async fn create_file(
    src_root: &AbsPath,
    src_path: &AbsPath,
    dst_root: &AbsPath,
) -> Result<AbsPath, ActionError> {
    let dst = mapper::map(src_root, dst_root, src_path)?;

    let data = read_source(src_path.as_path()).await?;
    let src_mtime = mtime_of(src_path.as_path()).await?;

    if let Some(parent) = dst.as_path().parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| classify(parent, e))?;
    }

    write_atomic(dst.as_path(), &data).await?;
    set_mtime(dst.as_path(), src_mtime)?;

    debug!(src = %src_path, dst = %dst, bytes = data.len(), "created file");
    Ok(dst)
}

/// `mkdir -p` on the mapped path. Idempotent.
pub async fn create_directory(
    src_root: &AbsPath,
    src_path: &AbsPath,
    dst_root: &AbsPath,
) -> Result<AbsPath, ActionError> {
    let dst = mapper::map(src_root, dst_root, src_path)?;
    tokio::fs::create_dir_all(dst.as_path())
        .await
        .map_err(|e| classify(dst.as_path(), e))?;
    debug!(dst = %dst, "created directory");
    Ok(dst)
}

/// Removes the mapped path: a file is unlinked, a directory removed
/// recursively, a missing path is a no-op.
pub async fn delete(
    src_root: &AbsPath,
    src_path: &AbsPath,
    dst_root: &AbsPath,
) -> Result<AbsPath, ActionError> {
    let dst = mapper::map(src_root, dst_root, src_path)?;

    match tokio::fs::metadata(dst.as_path()).await {
        Ok(meta) if meta.is_dir() => {
            tokio::fs::remove_dir_all(dst.as_path())
                .await
                .map_err(|e| classify(dst.as_path(), e))?;
            debug!(dst = %dst, "deleted directory");
        }
        Ok(_) => {
            tokio::fs::remove_file(dst.as_path())
                .await
                .map_err(|e| classify(dst.as_path(), e))?;
            debug!(dst = %dst, "deleted file");
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(dst = %dst, "delete target already absent, no-op");
        }
        Err(e) => return Err(classify(dst.as_path(), e)),
    }

    Ok(dst)
}

/// Moves the path mapped from `old_src` to the path mapped from `new_src`.
///
/// If the new destination already exists, the remote side is assumed to
/// already be consistent and the rename is skipped. Falls back to
/// copy-then-delete when a plain rename fails across a filesystem boundary.
pub async fn rename(
    src_root: &AbsPath,
    old_src: &AbsPath,
    new_src: &AbsPath,
    dst_root: &AbsPath,
) -> Result<AbsPath, ActionError> {
    let old_dst = mapper::map(src_root, dst_root, old_src)?;
    let new_dst = mapper::map(src_root, dst_root, new_src)?;

    if tokio::fs::try_exists(new_dst.as_path())
        .await
        .unwrap_or(false)
    {
        debug!(dst = %new_dst, "rename target already present, skipping");
        return Ok(new_dst);
    }

    if let Some(parent) = new_dst.as_path().parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| classify(parent, e))?;
    }

    portable_move(old_dst.as_path(), new_dst.as_path()).await?;
    debug!(old = %old_dst, new = %new_dst, "renamed");
    Ok(new_dst)
}

/// The differential sync path: binary-diffs the destination against the
/// fresh source, applies the patch in place. Falls back to [`create_file`]
/// when the destination is missing or looks truncated relative to the
/// source.
pub async fn patch(
    src_root: &AbsPath,
    src_path: &AbsPath,
    dst_root: &AbsPath,
    sidecar_root: &AbsPath,
) -> Result<AbsPath, ActionError> {
    let dst = mapper::map(src_root, dst_root, src_path)?;

    let src_meta = tokio::fs::metadata(src_path.as_path())
        .await
        .map_err(|e| classify(src_path.as_path(), e))?;

    let dst_meta = match tokio::fs::metadata(dst.as_path()).await {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(dst = %dst, "patch target missing, escalating to create_file");
            return create_file(src_root, src_path, dst_root).await;
        }
        Err(e) => return Err(classify(dst.as_path(), e)),
    };

    let patch_sidecar = mapper::patch_path(sidecar_root, src_root, src_path)?;

    if dst_meta.len() > src_meta.len() {
        debug!(
            dst = %dst,
            dst_size = dst_meta.len(),
            src_size = src_meta.len(),
            "destination larger than source, suspected truncation, rebuilding"
        );
        let _ = tokio::fs::remove_file(dst.as_path()).await;
        let _ = tokio::fs::remove_file(patch_sidecar.as_path()).await;
        return create_file(src_root, src_path, dst_root).await;
    }

    dirsync_patch::diff_files(dst.as_path(), src_path.as_path(), patch_sidecar.as_path())
        .await
        .map_err(|e| from_patch_error(e, sidecar_root))?;

    dirsync_patch::apply_file_in_place(dst.as_path(), patch_sidecar.as_path())
        .await
        .map_err(|e| from_patch_error(e, sidecar_root))?;

    let src_mtime = mtime_of(src_path.as_path()).await?;
    set_mtime(dst.as_path(), src_mtime)?;

    // The sidecar patch is transient: no `.patch` file should linger once
    // the destination matches the source.
    if let Err(e) = tokio::fs::remove_file(patch_sidecar.as_path()).await {
        warn!(patch = %patch_sidecar, error = %e, "failed to clean up patch sidecar file");
    }

    debug!(src = %src_path, dst = %dst, "patched file");
    Ok(dst)
}

async fn read_source(path: &Path) -> Result<Vec<u8>, ActionError> {
    tokio::fs::read(path).await.map_err(|e| classify(path, e))
}

async fn mtime_of(path: &Path) -> Result<FileTime, ActionError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| classify(path, e))?;
    Ok(FileTime::from_last_modification_time(&meta))
}

fn set_mtime(path: &Path, mtime: FileTime) -> Result<(), ActionError> {
    filetime::set_file_mtime(path, mtime).map_err(|e| classify(path, e))
}

async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), ActionError> {
    let tmp_path = {
        let mut p = path.as_os_str().to_owned();
        p.push(".tmp");
        std::path::PathBuf::from(p)
    };
    tokio::fs::write(&tmp_path, data)
        .await
        .map_err(|e| classify(&tmp_path, e))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| classify(path, e))
}

/// Renames `from` to `to`, falling back to a recursive copy-then-delete when
/// the plain rename fails because the paths cross a filesystem boundary.
async fn portable_move(from: &Path, to: &Path) -> Result<(), ActionError> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc_exdev()) => {
            debug!(from = %from.display(), to = %to.display(), "rename crosses filesystems, falling back to copy+delete");
            copy_then_delete(from, to).await
        }
        Err(e) => Err(classify(to, e)),
    }
}

/// The `EXDEV` errno value ("invalid cross-device link"), common to all
/// Unix-like targets this crate supports.
fn libc_exdev() -> i32 {
    18
}

async fn copy_then_delete(from: &Path, to: &Path) -> Result<(), ActionError> {
    let meta = tokio::fs::metadata(from)
        .await
        .map_err(|e| classify(from, e))?;

    if meta.is_dir() {
        copy_dir_recursive(from, to).await?;
        tokio::fs::remove_dir_all(from)
            .await
            .map_err(|e| classify(from, e))?;
    } else {
        tokio::fs::copy(from, to).await.map_err(|e| classify(to, e))?;
        tokio::fs::remove_file(from)
            .await
            .map_err(|e| classify(from, e))?;
    }
    Ok(())
}

fn copy_dir_recursive<'a>(
    from: &'a Path,
    to: &'a Path,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), ActionError>> + Send + 'a>> {
    Box::pin(async move {
        tokio::fs::create_dir_all(to)
            .await
            .map_err(|e| classify(to, e))?;

        let mut entries = tokio::fs::read_dir(from)
            .await
            .map_err(|e| classify(from, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| classify(from, e))?
        {
            let src_child = entry.path();
            let dst_child = to.join(entry.file_name());
            let file_type = entry.file_type().await.map_err(|e| classify(&src_child, e))?;

            if file_type.is_dir() {
                copy_dir_recursive(&src_child, &dst_child).await?;
            } else {
                tokio::fs::copy(&src_child, &dst_child)
                    .await
                    .map_err(|e| classify(&dst_child, e))?;
            }
        }

        Ok(())
    })
}

/// Classifies a raw I/O error into the action-error taxonomy: permission
/// and sharing errors are transient, a missing path is reported distinctly,
/// everything else is fatal.
fn classify(path: &Path, err: std::io::Error) -> ActionError {
    match err.kind() {
        ErrorKind::PermissionDenied | ErrorKind::WouldBlock => ActionError::Transient {
            path: path.to_path_buf(),
            source: err,
        },
        ErrorKind::NotFound => ActionError::MissingSource(path.to_path_buf()),
        _ => ActionError::Fatal {
            path: path.to_path_buf(),
            source: err,
        },
    }
}

fn from_patch_error(err: dirsync_patch::PatchError, sidecar_root: &AbsPath) -> ActionError {
    match err {
        dirsync_patch::PatchError::Io { path, source } => {
            if source.kind() == ErrorKind::NotFound && path.starts_with(sidecar_root.as_path()) {
                ActionError::MissingSidecar(sidecar_root.as_path().to_path_buf())
            } else {
                classify(&path, source)
            }
        }
        dirsync_patch::PatchError::Compute(source) => ActionError::Fatal {
            path: sidecar_root.as_path().to_path_buf(),
            source,
        },
    }
}
