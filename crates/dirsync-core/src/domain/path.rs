//! Absolute-path newtype
//!
//! `AbsPath` is the domain's representation of a point in one of the two
//! watched trees. Comparison and hashing are by normalized lexical form;
//! symlinks are never resolved.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path, PathBuf};

use super::errors::DomainError;

/// A validated absolute filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbsPath(PathBuf);

impl AbsPath {
    /// Creates an `AbsPath`, normalizing `.`/`..` components lexically.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidPath`] if `path` is not absolute or if
    /// normalization would escape the filesystem root via `..`.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(DomainError::InvalidPath(format!(
                "path must be absolute: {}",
                path.display()
            )));
        }
        Ok(Self(normalize(&path)?))
    }

    /// Returns the inner path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Returns true if `self` is `other` or a descendant of it.
    #[must_use]
    pub fn starts_with(&self, other: &AbsPath) -> bool {
        self.0.starts_with(&other.0)
    }

    /// Returns the path relative to `root`.
    ///
    /// # Errors
    /// Returns [`DomainError::NotUnderRoot`] if `self` does not descend from
    /// `root`.
    pub fn relative_to(&self, root: &AbsPath) -> Result<PathBuf, DomainError> {
        self.0
            .strip_prefix(&root.0)
            .map(PathBuf::from)
            .map_err(|_| DomainError::NotUnderRoot {
                path: self.to_string(),
                root: root.to_string(),
            })
    }

    /// Joins `root` with a relative path, producing a normalized `AbsPath`.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidPath`] if the resulting path is invalid.
    pub fn join(root: &AbsPath, relative: &Path) -> Result<Self, DomainError> {
        Self::new(root.0.join(relative))
    }

    /// True if any path component equals `name` (used to exclude sidecar
    /// directories from event processing).
    #[must_use]
    pub fn has_component(&self, name: &str) -> bool {
        self.0.components().any(|c| c.as_os_str() == name)
    }
}

impl Display for AbsPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for AbsPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl TryFrom<PathBuf> for AbsPath {
    type Error = DomainError;

    fn try_from(path: PathBuf) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

fn normalize(path: &Path) -> Result<PathBuf, DomainError> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => normalized.push(p.as_os_str()),
            Component::RootDir => normalized.push(std::path::MAIN_SEPARATOR_STR),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(DomainError::InvalidPath(
                        "path escapes filesystem root via ..".to_string(),
                    ));
                }
            }
            Component::Normal(c) => normalized.push(c),
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_relative_path() {
        assert!(AbsPath::new("relative/path").is_err());
    }

    #[test]
    fn test_normalizes_dot_components() {
        let p = AbsPath::new("/a/./b/../c").unwrap();
        assert_eq!(p.as_path(), Path::new("/a/c"));
    }

    #[test]
    fn test_escaping_root_is_invalid_path() {
        assert!(AbsPath::new("/../x").is_err());
    }

    #[test]
    fn test_relative_to() {
        let root = AbsPath::new("/home/user/a").unwrap();
        let child = AbsPath::new("/home/user/a/dir/file.txt").unwrap();
        assert_eq!(
            child.relative_to(&root).unwrap(),
            PathBuf::from("dir/file.txt")
        );
    }

    #[test]
    fn test_relative_to_not_under_root() {
        let root = AbsPath::new("/home/user/a").unwrap();
        let other = AbsPath::new("/home/user/b/file.txt").unwrap();
        assert!(matches!(
            other.relative_to(&root),
            Err(DomainError::NotUnderRoot { .. })
        ));
    }

    #[test]
    fn test_join() {
        let root = AbsPath::new("/home/user/a").unwrap();
        let joined = AbsPath::join(&root, Path::new("dir/file.txt")).unwrap();
        assert_eq!(joined.as_path(), Path::new("/home/user/a/dir/file.txt"));
    }

    #[test]
    fn test_has_component() {
        let p = AbsPath::new("/home/user/a/.syncdog/x.patch").unwrap();
        assert!(p.has_component(".syncdog"));
        let q = AbsPath::new("/home/user/a/notes.txt").unwrap();
        assert!(!q.has_component(".syncdog"));
    }

    #[test]
    fn test_starts_with() {
        let root = AbsPath::new("/home/user/a").unwrap();
        let child = AbsPath::new("/home/user/a/b").unwrap();
        let other = AbsPath::new("/home/user/b").unwrap();
        assert!(child.starts_with(&root));
        assert!(!other.starts_with(&root));
    }
}
