//! dirsync-core: domain types for the directory-sync engine
//!
//! Provides:
//! - Validated path and event newtypes
//! - Engine configuration
//! - The domain error taxonomy

pub mod domain;
