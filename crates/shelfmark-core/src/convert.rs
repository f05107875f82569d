//! Single-artifact conversion and batch-job exclusivity.
//!
//! [`convert_one`] is the unit of work both batch jobs and the single-item
//! job share. It is deliberately infallible: any conversion that cannot
//! complete, whether the encoder refused the input or the path did not
//! resolve, degrades to [`ConvertOutcome::Unchanged`] so one bad file never
//! aborts a batch. The failure is logged; retrying is left to a later
//! manual run.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, TryLockError};
use tracing::{debug, error};

use crate::encode::ImageEncoder;
use crate::{Error, JobKind, Result, WEBP_EXTENSION, paths, store};

/// Result of attempting to convert one stored artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertOutcome {
    /// The file was rewritten; the record should adopt the new path.
    Converted {
        /// New relative file name of the converted artifact.
        file_name: String,
    },
    /// Conversion did not happen; the record keeps its original path.
    ///
    /// Not a batch failure; the item is simply picked up again by the
    /// next manual run.
    Unchanged {
        /// The artifact's unchanged relative file name.
        file_name: String,
    },
}

impl ConvertOutcome {
    /// The relative file name the record should carry after this attempt.
    #[must_use]
    pub fn file_name(&self) -> &str {
        match self {
            Self::Converted { file_name } | Self::Unchanged { file_name } => file_name,
        }
    }
}

/// Whether a stored file still needs conversion to the target format.
#[must_use]
pub fn needs_conversion(file_name: &str) -> bool {
    !file_name.to_ascii_lowercase().ends_with(WEBP_EXTENSION)
}

/// Convert the artifact at `current_relative` (under `root`) to WebP.
///
/// The converted file is written next to the source; on success the source
/// is deleted and the returned path joins `new_relative_dir` with the
/// converted file's base name. On any failure the original file is left
/// untouched and its path is returned unchanged.
pub async fn convert_one(
    encoder: &dyn ImageEncoder,
    root: &Path,
    current_relative: &str,
    new_relative_dir: &str,
) -> ConvertOutcome {
    match try_convert(encoder, root, current_relative, new_relative_dir).await {
        Ok(file_name) => {
            debug!("converted '{current_relative}' to '{file_name}'");
            ConvertOutcome::Converted { file_name }
        }
        Err(e) => {
            error!("could not convert '{current_relative}': {e}");
            ConvertOutcome::Unchanged {
                file_name: current_relative.to_string(),
            }
        }
    }
}

async fn try_convert(
    encoder: &dyn ImageEncoder,
    root: &Path,
    current_relative: &str,
    new_relative_dir: &str,
) -> Result<String> {
    let source = paths::resolve_under(root, current_relative);
    let source_dir = source
        .parent()
        .ok_or_else(|| Error::InvalidPath(format!("{} has no parent", source.display())))?;

    let converted = encoder.convert_to_webp(&source, source_dir).await?;
    let base_name = converted
        .file_name()
        .ok_or_else(|| Error::InvalidPath(format!("{} has no file name", converted.display())))?
        .to_string_lossy()
        .into_owned();

    store::delete_all([source]);
    Ok(paths::join_relative(new_relative_dir, &base_name))
}

/// Mutual exclusion for the batch conversion jobs, one slot per kind.
///
/// A second start while a job of the same kind is in flight is rejected
/// with [`Error::JobAlreadyRunning`], never queued. The returned guard
/// releases the slot when the job ends, however it ends.
#[derive(Debug, Clone, Default)]
pub struct JobLocks {
    bookmarks: Arc<Mutex<()>>,
    covers: Arc<Mutex<()>>,
}

impl JobLocks {
    /// Create an unlocked set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `kind`, or fail if a job of that kind is running.
    pub fn try_acquire(&self, kind: JobKind) -> Result<OwnedMutexGuard<()>> {
        let slot = match kind {
            JobKind::BookmarkConversion => Arc::clone(&self.bookmarks),
            JobKind::CoverConversion => Arc::clone(&self.covers),
        };
        slot.try_lock_owned()
            .map_err(|_: TryLockError| Error::JobAlreadyRunning(kind.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::fs;
    use std::path::PathBuf;

    /// Encoder that copies the source bytes into `<stem>.webp`.
    struct CopyEncoder;

    #[async_trait]
    impl ImageEncoder for CopyEncoder {
        async fn convert_to_webp(&self, source: &Path, target_dir: &Path) -> Result<PathBuf> {
            let stem = source.file_stem().unwrap().to_string_lossy();
            let target = target_dir.join(format!("{stem}.webp"));
            fs::copy(source, &target)?;
            Ok(target)
        }
    }

    /// Encoder that always refuses.
    struct RefusingEncoder;

    #[async_trait]
    impl ImageEncoder for RefusingEncoder {
        async fn convert_to_webp(&self, source: &Path, _target_dir: &Path) -> Result<PathBuf> {
            Err(Error::Encode {
                path: source.display().to_string(),
                reason: "refused".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn success_deletes_original_and_rewrites_relative_path() {
        let root = tempfile::tempdir().unwrap();
        let chapter_dir = root.path().join("7").join("3").join("9");
        fs::create_dir_all(&chapter_dir).unwrap();
        fs::write(chapter_dir.join("page.png"), b"bytes").unwrap();

        let outcome = convert_one(&CopyEncoder, root.path(), "7/3/9/page.png", "7/3/9").await;

        assert_eq!(
            outcome,
            ConvertOutcome::Converted {
                file_name: "7/3/9/page.webp".to_string()
            }
        );
        assert!(!chapter_dir.join("page.png").exists());
        assert!(chapter_dir.join("page.webp").exists());
    }

    #[tokio::test]
    async fn flat_target_directory_yields_bare_file_name() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("cover.png"), b"bytes").unwrap();

        let outcome = convert_one(&CopyEncoder, root.path(), "cover.png", "").await;
        assert_eq!(
            outcome,
            ConvertOutcome::Converted {
                file_name: "cover.webp".to_string()
            }
        );
    }

    #[tokio::test]
    async fn encoder_failure_degrades_to_unchanged_and_keeps_file() {
        let root = tempfile::tempdir().unwrap();
        let chapter_dir = root.path().join("7").join("3").join("9");
        fs::create_dir_all(&chapter_dir).unwrap();
        fs::write(chapter_dir.join("page.png"), b"bytes").unwrap();

        let outcome = convert_one(&RefusingEncoder, root.path(), "7/3/9/page.png", "7/3/9").await;

        assert_eq!(
            outcome,
            ConvertOutcome::Unchanged {
                file_name: "7/3/9/page.png".to_string()
            }
        );
        assert!(chapter_dir.join("page.png").exists());
    }

    #[test]
    fn needs_conversion_checks_extension_case_insensitively() {
        assert!(needs_conversion("7/3/9/page.png"));
        assert!(needs_conversion("7/3/9/page.jpeg"));
        assert!(!needs_conversion("7/3/9/page.webp"));
        assert!(!needs_conversion("7/3/9/PAGE.WEBP"));
    }

    #[test]
    fn second_acquisition_of_same_kind_is_rejected() {
        let locks = JobLocks::new();
        let guard = locks.try_acquire(JobKind::BookmarkConversion).unwrap();

        let err = locks
            .try_acquire(JobKind::BookmarkConversion)
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.category(), "job_already_running");

        // A different kind is unaffected.
        locks.try_acquire(JobKind::CoverConversion).unwrap();

        drop(guard);
        locks.try_acquire(JobKind::BookmarkConversion).unwrap();
    }
}
