//! Path mapper
//!
//! Pure functions translating a path under one root into the corresponding
//! path under another root, and into its patch-sidecar path. Never touches
//! the filesystem; the only way these fail is if asked about a path outside
//! the root they were given, which is the same shape of validation
//! `AbsPath::relative_to` already performs.

use std::path::Path;

use dirsync_core::domain::{AbsPath, DomainError};

/// Computes the path under `root_dst` that mirrors `p` (a descendant of
/// `root_src`).
///
/// # Errors
/// Returns [`DomainError::NotUnderRoot`] if `p` does not descend from
/// `root_src`.
pub fn map(root_src: &AbsPath, root_dst: &AbsPath, p: &AbsPath) -> Result<AbsPath, DomainError> {
    let relative = p.relative_to(root_src)?;
    AbsPath::join(root_dst, &relative)
}

/// Computes the sidecar path that would hold the binary patch for `p`.
///
/// # Errors
/// Returns [`DomainError::NotUnderRoot`] if `p` does not descend from
/// `root_src`.
pub fn patch_path(
    sidecar_root: &AbsPath,
    root_src: &AbsPath,
    p: &AbsPath,
) -> Result<AbsPath, DomainError> {
    let relative = p.relative_to(root_src)?;
    let with_ext = with_patch_extension(&relative);
    AbsPath::join(sidecar_root, &with_ext)
}

fn with_patch_extension(relative: &Path) -> std::path::PathBuf {
    relative.with_extension("patch")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> AbsPath {
        AbsPath::new(s).unwrap()
    }

    #[test]
    fn test_map_basic() {
        let src_root = p("/a");
        let dst_root = p("/b");
        let src = p("/a/dir/file.txt");
        let mapped = map(&src_root, &dst_root, &src).unwrap();
        assert_eq!(mapped.as_path(), Path::new("/b/dir/file.txt"));
    }

    #[test]
    fn test_map_rejects_outside_root() {
        let src_root = p("/a");
        let dst_root = p("/b");
        let outside = p("/elsewhere/file.txt");
        assert!(matches!(
            map(&src_root, &dst_root, &outside),
            Err(DomainError::NotUnderRoot { .. })
        ));
    }

    #[test]
    fn test_patch_path_replaces_extension() {
        let sidecar = p("/a/.syncdog");
        let src_root = p("/a");
        let src = p("/a/dir/file.txt");
        let patch = patch_path(&sidecar, &src_root, &src).unwrap();
        assert_eq!(patch.as_path(), Path::new("/a/.syncdog/dir/file.patch"));
    }

    #[test]
    fn test_patch_path_file_with_no_extension() {
        let sidecar = p("/a/.syncdog");
        let src_root = p("/a");
        let src = p("/a/README");
        let patch = patch_path(&sidecar, &src_root, &src).unwrap();
        assert_eq!(patch.as_path(), Path::new("/a/.syncdog/README.patch"));
    }
}
