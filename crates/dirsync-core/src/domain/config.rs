//! Engine configuration
//!
//! `SyncConfig` is the immutable configuration record the engine is started
//! with. It is `Serialize`/`Deserialize` so `dirsync-cli` can build one
//! either from CLI flags or from a config file, even though only the
//! former is wired up today.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::path::AbsPath;

/// Default debounce interval for one-way modes.
pub const DEFAULT_ONEWAY_DEBOUNCE_MS: u64 = 500;

/// Default debounce interval for mirror mode.
pub const DEFAULT_MIRROR_DEBOUNCE_MS: u64 = 750;

/// Name of the hidden sidecar directory holding transient `.patch` files.
pub const DEFAULT_SIDECAR_NAME: &str = ".syncdog";

/// Which replication direction(s) the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Replicate changes from `root_a` to `root_b` only.
    AtoB,
    /// Replicate changes from `root_b` to `root_a` only.
    BtoA,
    /// Replicate changes in both directions, suppressing echoes.
    Mirror,
}

impl Mode {
    /// The default debounce interval for this mode, absent an explicit
    /// override.
    #[must_use]
    pub fn default_debounce(self) -> Duration {
        match self {
            Mode::AtoB | Mode::BtoA => Duration::from_millis(DEFAULT_ONEWAY_DEBOUNCE_MS),
            Mode::Mirror => Duration::from_millis(DEFAULT_MIRROR_DEBOUNCE_MS),
        }
    }

    #[must_use]
    pub fn is_mirror(self) -> bool {
        matches!(self, Mode::Mirror)
    }
}

/// Immutable engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub mode: Mode,
    pub root_a: PathBuf,
    pub root_b: PathBuf,
    #[serde(with = "duration_millis")]
    pub debounce_interval: Duration,
    pub sidecar_name: String,
}

impl SyncConfig {
    /// Builds a config with the mode's default debounce interval and the
    /// default sidecar name.
    ///
    /// # Errors
    /// Never fails by itself; validation of the roots happens at `start`
    /// time, since roots must be checked against the live filesystem and
    /// that is a lifecycle concern, not a construction one.
    pub fn new(mode: Mode, root_a: PathBuf, root_b: PathBuf) -> Self {
        Self {
            debounce_interval: mode.default_debounce(),
            mode,
            root_a,
            root_b,
            sidecar_name: DEFAULT_SIDECAR_NAME.to_string(),
        }
    }

    /// Overrides the debounce interval (builder-style).
    #[must_use]
    pub fn with_debounce_interval(mut self, interval: Duration) -> Self {
        self.debounce_interval = interval;
        self
    }

    /// Validates that the two roots are distinct and resolves them to
    /// [`AbsPath`]s. Existence of the roots on disk is checked by the
    /// engine at `start` time, not here, so this stays infallible with
    /// respect to the live filesystem.
    ///
    /// # Errors
    /// Returns [`DomainError::Config`] if the roots are equal, or
    /// [`DomainError::InvalidPath`] if either is not absolute.
    pub fn validated_roots(&self) -> Result<(AbsPath, AbsPath), DomainError> {
        let a = AbsPath::new(self.root_a.clone())?;
        let b = AbsPath::new(self.root_b.clone())?;
        if a == b {
            return Err(DomainError::Config(format!(
                "root_a and root_b must differ, both are {a}"
            )));
        }
        Ok((a, b))
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_debounce_per_mode() {
        assert_eq!(
            Mode::AtoB.default_debounce(),
            Duration::from_millis(DEFAULT_ONEWAY_DEBOUNCE_MS)
        );
        assert_eq!(
            Mode::Mirror.default_debounce(),
            Duration::from_millis(DEFAULT_MIRROR_DEBOUNCE_MS)
        );
    }

    #[test]
    fn test_validated_roots_rejects_equal() {
        let cfg = SyncConfig::new(Mode::Mirror, PathBuf::from("/tmp/a"), PathBuf::from("/tmp/a"));
        assert!(matches!(
            cfg.validated_roots(),
            Err(DomainError::Config(_))
        ));
    }

    #[test]
    fn test_validated_roots_accepts_distinct() {
        let cfg = SyncConfig::new(Mode::AtoB, PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b"));
        assert!(cfg.validated_roots().is_ok());
    }

    #[test]
    fn test_with_debounce_interval_overrides() {
        let cfg = SyncConfig::new(Mode::AtoB, PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b"))
            .with_debounce_interval(Duration::from_millis(50));
        assert_eq!(cfg.debounce_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_serde_roundtrip() {
        let cfg = SyncConfig::new(Mode::Mirror, PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b"));
        let json = serde_json::to_string(&cfg).unwrap();
        let back: SyncConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.debounce_interval, cfg.debounce_interval);
        assert_eq!(back.mode, cfg.mode);
    }
}
