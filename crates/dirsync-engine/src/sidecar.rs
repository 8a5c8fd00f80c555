//! Sidecar directory lifecycle
//!
//! The sidecar holds transient `.patch` files and must exist before the
//! watcher starts (so its own creation never surfaces as a user event) and
//! be gone after `stop()` returns, leaving no trace of a stopped engine on
//! either root.

use dirsync_core::domain::AbsPath;
use tracing::debug;

use crate::error::EngineError;

/// Creates the sidecar directory under `root` named `name`, returning its
/// path. Idempotent.
pub async fn create(root: &AbsPath, name: &str) -> Result<AbsPath, EngineError> {
    let sidecar = AbsPath::join(root, std::path::Path::new(name)).map_err(EngineError::Config)?;
    tokio::fs::create_dir_all(sidecar.as_path())
        .await
        .map_err(EngineError::Sidecar)?;
    debug!(sidecar = %sidecar, "sidecar directory ready");
    Ok(sidecar)
}

/// Removes the sidecar directory and everything transient inside it.
/// Tolerates it already being gone.
pub async fn remove(sidecar: &AbsPath) -> Result<(), EngineError> {
    match tokio::fs::remove_dir_all(sidecar.as_path()).await {
        Ok(()) => {
            debug!(sidecar = %sidecar, "sidecar directory removed");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EngineError::Sidecar(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let root = AbsPath::new(dir.path().to_path_buf()).unwrap();

        let sidecar = create(&root, ".syncdog").await.unwrap();
        assert!(sidecar.as_path().is_dir());

        remove(&sidecar).await.unwrap();
        assert!(!sidecar.as_path().exists());
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let root = AbsPath::new(dir.path().to_path_buf()).unwrap();
        let sidecar = AbsPath::join(&root, std::path::Path::new(".syncdog")).unwrap();

        assert!(remove(&sidecar).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = AbsPath::new(dir.path().to_path_buf()).unwrap();

        create(&root, ".syncdog").await.unwrap();
        let sidecar = create(&root, ".syncdog").await.unwrap();
        assert!(sidecar.as_path().is_dir());
    }
}
