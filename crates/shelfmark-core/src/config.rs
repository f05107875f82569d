//! Runtime settings consumed by the bookmark store.
//!
//! Settings are owned elsewhere (a server settings table in practice); this
//! crate only reads them. Jobs re-fetch a fresh [`Settings`] snapshot at the
//! start of every execution instead of caching one at construction, so a
//! toggle flipped between a bookmark being saved and its conversion job
//! running is honored.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Result;

/// File extension written by the conversion target format, with the dot.
pub const WEBP_EXTENSION: &str = ".webp";

/// Snapshot of the settings the bookmark store reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Absolute root directory for stored bookmark files.
    pub bookmark_directory: PathBuf,
    /// Absolute root directory for chapter cover files.
    pub cover_directory: PathBuf,
    /// Whether a freshly saved bookmark schedules a conversion job.
    ///
    /// Only gates the single-item job; the batch jobs are explicitly
    /// user-invoked and run regardless.
    pub convert_bookmark_on_save: bool,
}

/// Source of [`Settings`] snapshots.
///
/// Implementations back onto whatever owns the settings (database table,
/// config file). Each call returns the current values.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Fetch the current settings.
    async fn current(&self) -> Result<Settings>;
}

/// In-process settings holder with live-update support.
///
/// Suitable for tests and for embedders that manage settings themselves.
#[derive(Debug)]
pub struct StaticSettings {
    inner: RwLock<Settings>,
}

impl StaticSettings {
    /// Wrap an initial settings snapshot.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }

    /// Replace the held settings.
    pub async fn replace(&self, settings: Settings) {
        *self.inner.write().await = settings;
    }

    /// Toggle the convert-on-save flag.
    pub async fn set_convert_bookmark_on_save(&self, enabled: bool) {
        self.inner.write().await.convert_bookmark_on_save = enabled;
    }
}

#[async_trait]
impl SettingsProvider for StaticSettings {
    async fn current(&self) -> Result<Settings> {
        Ok(self.inner.read().await.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            bookmark_directory: PathBuf::from("/data/bookmarks"),
            cover_directory: PathBuf::from("/data/covers"),
            convert_bookmark_on_save: true,
        }
    }

    #[tokio::test]
    async fn snapshots_reflect_live_toggles() {
        let provider = StaticSettings::new(settings());
        assert!(provider.current().await.unwrap().convert_bookmark_on_save);

        provider.set_convert_bookmark_on_save(false).await;
        assert!(!provider.current().await.unwrap().convert_bookmark_on_save);
    }

    #[tokio::test]
    async fn replace_swaps_directories() {
        let provider = StaticSettings::new(settings());
        let mut updated = settings();
        updated.bookmark_directory = PathBuf::from("/elsewhere");
        provider.replace(updated).await;

        let current = provider.current().await.unwrap();
        assert_eq!(current.bookmark_directory, PathBuf::from("/elsewhere"));
    }
}
