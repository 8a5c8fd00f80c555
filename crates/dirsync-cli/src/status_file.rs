//! Status snapshot persistence
//!
//! `start` runs the engine in the foreground for as long as the process
//! lives; there is no daemon or IPC layer in this minimal driver. To let a
//! separate `dirsync status` invocation report something useful anyway, the
//! running process periodically writes its [`dirsync_engine::Status`] to a
//! small JSON file at a well-known path rather than holding it only in
//! memory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirsync_engine::Status;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub last_error: Option<String>,
    pub mode: String,
    pub root_a: String,
    pub root_b: String,
}

impl StatusSnapshot {
    #[must_use]
    pub fn from_status(status: &Status, mode: &str, root_a: &Path, root_b: &Path) -> Self {
        Self {
            running: status.running,
            last_error: status.last_error.clone(),
            mode: mode.to_string(),
            root_a: root_a.display().to_string(),
            root_b: root_b.display().to_string(),
        }
    }
}

/// Default location for the status file, under the OS temp directory so no
/// extra directory-permission setup is needed to exercise the CLI.
#[must_use]
pub fn default_path() -> PathBuf {
    std::env::temp_dir().join("dirsync").join("status.json")
}

pub async fn write(path: &Path, snapshot: &StatusSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating status directory {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(snapshot)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("writing status file {}", path.display()))
}

pub async fn read(path: &Path) -> Result<Option<StatusSnapshot>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading status file {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirsync_engine::Status;

    #[tokio::test]
    async fn test_read_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");
        assert!(read(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("status.json");

        let status = Status {
            running: true,
            last_error: None,
        };
        let snapshot = StatusSnapshot::from_status(
            &status,
            "Mirror",
            Path::new("/tmp/a"),
            Path::new("/tmp/b"),
        );

        write(&path, &snapshot).await.unwrap();
        let read_back = read(&path).await.unwrap().unwrap();
        assert!(read_back.running);
        assert_eq!(read_back.mode, "Mirror");
        assert_eq!(read_back.root_a, "/tmp/a");
    }
}
