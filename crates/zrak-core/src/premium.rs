//! Persisted premium-access flag.
//!
//! The entitlement itself is decided elsewhere; this module only stores the
//! outcome so that out-of-process consumers can read it next to the shared
//! payload.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use crate::error::Result;
use crate::publisher::write_atomic;
use crate::traits::PremiumAccessStore;

/// File name of the premium flag inside the shared directory.
pub const PREMIUM_FILENAME: &str = "premium_access.json";

/// On-disk form of the premium flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumAccess {
    /// Whether premium features are unlocked.
    pub is_premium_unlocked: bool,
    /// When the flag was last written.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Premium flag stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FilePremiumStore {
    path: PathBuf,
}

impl FilePremiumStore {
    /// Store at an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at [`PREMIUM_FILENAME`] inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(PREMIUM_FILENAME))
    }

    /// Path of the flag file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The full stored document, if present and readable.
    pub fn load(&self) -> Option<PremiumAccess> {
        let data = fs::read(&self.path).ok()?;
        serde_json::from_slice(&data).ok()
    }
}

impl PremiumAccessStore for FilePremiumStore {
    fn read(&self) -> bool {
        self.load().is_some_and(|access| access.is_premium_unlocked)
    }

    fn write(&self, unlocked: bool) -> Result<()> {
        let now = OffsetDateTime::now_utc();
        let access = PremiumAccess {
            is_premium_unlocked: unlocked,
            updated_at: now.replace_nanosecond(0).unwrap_or(now),
        };
        write_atomic(&self.path, &serde_json::to_vec(&access)?)?;
        debug!("Premium access set to {} in {:?}", unlocked, self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_false() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePremiumStore::in_dir(dir.path());
        assert!(!store.read());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePremiumStore::in_dir(dir.path());

        store.write(true).unwrap();
        assert!(store.read());

        store.write(false).unwrap();
        assert!(!store.read());
        assert!(store.path().ends_with(PREMIUM_FILENAME));
    }

    #[test]
    fn test_corrupt_file_reads_false() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePremiumStore::in_dir(dir.path());
        fs::write(store.path(), br#"{"isPremiumUnlocked": "yes"}"#).unwrap();
        assert!(!store.read());
    }

    #[test]
    fn test_reads_document_written_elsewhere() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePremiumStore::in_dir(dir.path());
        fs::write(
            store.path(),
            br#"{"isPremiumUnlocked":true,"updatedAt":"2024-01-15T10:00:00Z"}"#,
        )
        .unwrap();
        assert!(store.read());
        assert_eq!(
            store.load().unwrap().updated_at,
            time::macros::datetime!(2024-01-15 10:00 UTC)
        );
    }

    #[test]
    fn test_document_keys() {
        let access = PremiumAccess {
            is_premium_unlocked: true,
            updated_at: time::macros::datetime!(2024-01-15 10:00 UTC),
        };
        let json = serde_json::to_string(&access).unwrap();
        assert_eq!(
            json,
            r#"{"isPremiumUnlocked":true,"updatedAt":"2024-01-15T10:00:00Z"}"#
        );
    }
}
