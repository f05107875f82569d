//! The bookmark lifecycle façade.
//!
//! Coordinates the path resolver, file store, repositories, encoder and
//! notification sink so that every operation keeps one protocol: **the
//! database commit decides, the filesystem follows.**
//!
//! - `add` copies the file first, then commits the record; if the commit
//!   fails the copy is rolled back too, so no orphan file survives a
//!   failed add.
//! - `remove` commits the delete first and only then touches the
//!   filesystem; a crash in between leaves an orphaned file, never a
//!   record pointing at nothing.
//! - Conversion jobs commit each item independently, so a killed batch
//!   leaves every already-committed item converted and the rest eligible
//!   for the next manual run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::SettingsProvider;
use crate::convert::{self, ConvertOutcome, JobLocks};
use crate::encode::ImageEncoder;
use crate::events::{EventSink, PROGRESS_CHANNEL};
use crate::jobs::{JobQueue, JobRequest};
use crate::repo::{BookmarkRepository, CoverRepository};
use crate::{
    Bookmark, BookmarkId, BookmarkRequest, Error, JobKind, NewBookmark, ProgressEvent, Result,
    paths, store,
};

/// Façade implementing the bookmark lifecycle: add, remove, lookups, and
/// the three conversion job entry points.
pub struct BookmarkService {
    bookmarks: Arc<dyn BookmarkRepository>,
    covers: Arc<dyn CoverRepository>,
    encoder: Arc<dyn ImageEncoder>,
    settings: Arc<dyn SettingsProvider>,
    events: Arc<dyn EventSink>,
    jobs: Option<JobQueue>,
    locks: JobLocks,
}

impl BookmarkService {
    /// Assemble a service from its collaborators.
    #[must_use]
    pub fn new(
        bookmarks: Arc<dyn BookmarkRepository>,
        covers: Arc<dyn CoverRepository>,
        encoder: Arc<dyn ImageEncoder>,
        settings: Arc<dyn SettingsProvider>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            bookmarks,
            covers,
            encoder,
            settings,
            events,
            jobs: None,
            locks: JobLocks::new(),
        }
    }

    /// Attach the queue that receives fire-and-forget job requests.
    ///
    /// Without a queue, `add` still succeeds; the follow-up conversion is
    /// simply not scheduled.
    #[must_use]
    pub fn with_job_queue(mut self, queue: JobQueue) -> Self {
        self.jobs = Some(queue);
        self
    }

    /// Bookmark a page: copy the cached image into the bookmark store and
    /// persist the record.
    ///
    /// Adding a page that is already bookmarked is success, not an error:
    /// the existing record's id is returned and nothing is copied. On a
    /// persistence failure after the copy, the staged record is rolled
    /// back and the copied file is removed again, so the store holds no
    /// orphan.
    pub async fn add(
        &self,
        user_id: i64,
        request: BookmarkRequest,
        source_image: &Path,
    ) -> Result<BookmarkId> {
        if let Some(existing) = self
            .bookmarks
            .find_by_user_chapter_page(user_id, request.chapter_id, request.page)
            .await?
        {
            info!(
                "bookmark already exists for series {}, volume {}, chapter {}, page {}",
                request.series_id, request.volume_id, request.chapter_id, request.page
            );
            return Ok(existing.id);
        }

        let base_name = source_image
            .file_name()
            .ok_or_else(|| {
                Error::InvalidPath(format!("{} has no file name", source_image.display()))
            })?
            .to_string_lossy()
            .into_owned();

        let settings = self.settings.current().await?;
        let stem = paths::bookmark_stem(user_id, request.series_id, request.chapter_id);
        let target_dir = paths::resolve_under(&settings.bookmark_directory, &stem);
        let copied = store::copy_into(source_image, &target_dir).inspect_err(|e| {
            error!(
                "could not copy {} into the bookmark store: {e}",
                source_image.display()
            );
        })?;

        let persisted: Result<Bookmark> = async {
            let staged = self
                .bookmarks
                .add(NewBookmark {
                    user_id,
                    series_id: request.series_id,
                    volume_id: request.volume_id,
                    chapter_id: request.chapter_id,
                    page: request.page,
                    file_name: paths::join_relative(&stem, &base_name),
                })
                .await?;
            self.bookmarks.commit().await?;
            Ok(staged)
        }
        .await;

        let bookmark = match persisted {
            Ok(bookmark) => bookmark,
            Err(e) => {
                error!("could not persist bookmark for user {user_id}: {e}");
                if let Err(rollback_err) = self.bookmarks.rollback().await {
                    error!("rollback after failed bookmark save failed: {rollback_err}");
                }
                // The record never became durable, so the copy must not
                // outlive it either.
                store::delete_all([copied]);
                if let Err(prune_err) = store::prune_empty_dirs(&settings.bookmark_directory) {
                    warn!("could not prune bookmark directory: {prune_err}");
                }
                return Err(e);
            }
        };

        if settings.convert_bookmark_on_save {
            if let Some(jobs) = &self.jobs {
                jobs.enqueue(JobRequest::ConvertBookmark {
                    bookmark_id: bookmark.id,
                });
            }
        }

        Ok(bookmark.id)
    }

    /// Remove a bookmark: delete the record, then its file.
    ///
    /// Removing a page that is not bookmarked is success. The file is
    /// deleted only after the commit succeeds; if the commit fails the
    /// filesystem is left untouched.
    pub async fn remove(&self, user_id: i64, request: BookmarkRequest) -> Result<()> {
        let Some(bookmark) = self
            .bookmarks
            .find_by_user_chapter_page(user_id, request.chapter_id, request.page)
            .await?
        else {
            debug!(
                "no bookmark for user {user_id} chapter {} page {}, nothing to remove",
                request.chapter_id, request.page
            );
            return Ok(());
        };

        self.bookmarks.delete(bookmark.id).await?;
        if let Err(e) = self.bookmarks.commit().await {
            error!("could not delete bookmark {}: {e}", bookmark.id);
            if let Err(rollback_err) = self.bookmarks.rollback().await {
                error!("rollback after failed bookmark delete failed: {rollback_err}");
            }
            return Err(e);
        }

        self.delete_bookmark_files(&[bookmark]).await
    }

    /// Delete the stored files behind `bookmarks` and prune the stem
    /// directories they leave empty.
    ///
    /// Must only be called for records whose deletion has already been
    /// committed (or that never had one).
    pub async fn delete_bookmark_files(&self, bookmarks: &[Bookmark]) -> Result<()> {
        if bookmarks.is_empty() {
            return Ok(());
        }
        let settings = self.settings.current().await?;
        store::delete_all(
            bookmarks
                .iter()
                .map(|b| paths::resolve_under(&settings.bookmark_directory, &b.file_name)),
        );
        store::prune_empty_dirs(&settings.bookmark_directory)
    }

    /// Absolute file paths for the given bookmark ids. Pure lookup.
    pub async fn resolve_files_for_ids(&self, ids: &[BookmarkId]) -> Result<Vec<PathBuf>> {
        let settings = self.settings.current().await?;
        let bookmarks = self.bookmarks.list_by_ids(ids).await?;
        Ok(bookmarks
            .iter()
            .map(|b| paths::resolve_under(&settings.bookmark_directory, &b.file_name))
            .collect())
    }

    /// Long-running batch job: convert every stored bookmark file that is
    /// not yet WebP.
    ///
    /// At most one execution runs at a time; a second start is rejected
    /// with [`Error::JobAlreadyRunning`]. Each item commits independently,
    /// a failed encode keeps its item unchanged for the next run, and the
    /// job is never retried automatically.
    #[allow(clippy::cast_precision_loss)]
    pub async fn convert_all_bookmarks(&self) -> Result<()> {
        let _guard = self.locks.try_acquire(JobKind::BookmarkConversion)?;
        let settings = self.settings.current().await?;

        self.events
            .notify(
                PROGRESS_CHANNEL,
                ProgressEvent::started(JobKind::BookmarkConversion),
            )
            .await;

        let pending: Vec<Bookmark> = self
            .bookmarks
            .list_all()
            .await?
            .into_iter()
            .filter(|b| convert::needs_conversion(&b.file_name))
            .collect();
        let total = pending.len();
        let mut converted = 0usize;

        for (index, mut bookmark) in pending.into_iter().enumerate() {
            let stem =
                paths::bookmark_stem(bookmark.user_id, bookmark.series_id, bookmark.chapter_id);
            let outcome = convert::convert_one(
                self.encoder.as_ref(),
                &settings.bookmark_directory,
                &bookmark.file_name,
                &stem,
            )
            .await;

            if let ConvertOutcome::Converted { file_name } = outcome {
                bookmark.file_name = file_name;
                bookmark.last_modified = Utc::now();
                self.bookmarks.update(bookmark).await?;
                self.bookmarks.commit().await?;
                converted += 1;
            }

            self.events
                .notify(
                    PROGRESS_CHANNEL,
                    ProgressEvent::in_progress(
                        JobKind::BookmarkConversion,
                        (index + 1) as f32 / total as f32,
                    ),
                )
                .await;
        }

        self.events
            .notify(
                PROGRESS_CHANNEL,
                ProgressEvent::ended(JobKind::BookmarkConversion),
            )
            .await;

        info!("bookmark conversion finished, {converted}/{total} items converted");
        Ok(())
    }

    /// Long-running batch job: convert every chapter cover that is not yet
    /// WebP. Same guarantees as [`Self::convert_all_bookmarks`].
    #[allow(clippy::cast_precision_loss)]
    pub async fn convert_all_covers(&self) -> Result<()> {
        let _guard = self.locks.try_acquire(JobKind::CoverConversion)?;
        let settings = self.settings.current().await?;

        self.events
            .notify(
                PROGRESS_CHANNEL,
                ProgressEvent::started(JobKind::CoverConversion),
            )
            .await;

        let pending: Vec<_> = self
            .covers
            .list_all()
            .await?
            .into_iter()
            .filter(|c| convert::needs_conversion(&c.cover_file))
            .collect();
        let total = pending.len();
        let mut converted = 0usize;

        for (index, mut cover) in pending.into_iter().enumerate() {
            // Covers are stored flat, so the rewritten path is just the
            // converted file's base name.
            let outcome = convert::convert_one(
                self.encoder.as_ref(),
                &settings.cover_directory,
                &cover.cover_file,
                "",
            )
            .await;

            if let ConvertOutcome::Converted { file_name } = outcome {
                cover.cover_file = file_name;
                cover.last_modified = Utc::now();
                self.covers.update(cover).await?;
                self.covers.commit().await?;
                converted += 1;
            }

            self.events
                .notify(
                    PROGRESS_CHANNEL,
                    ProgressEvent::in_progress(
                        JobKind::CoverConversion,
                        (index + 1) as f32 / total as f32,
                    ),
                )
                .await;
        }

        self.events
            .notify(PROGRESS_CHANNEL, ProgressEvent::ended(JobKind::CoverConversion))
            .await;

        info!("cover conversion finished, {converted}/{total} items converted");
        Ok(())
    }

    /// Single-item job run after a bookmark is saved.
    ///
    /// Re-reads the settings (the toggle may have flipped since the save)
    /// and re-fetches the record by id (it may have been deleted since).
    /// Both cases are silent no-ops. No exclusivity: concurrent items only
    /// ever touch their own record.
    pub async fn convert_bookmark(&self, id: BookmarkId) -> Result<()> {
        let settings = self.settings.current().await?;
        if !settings.convert_bookmark_on_save {
            debug!("bookmark conversion disabled, skipping bookmark {id}");
            return Ok(());
        }

        let Some(mut bookmark) = self.bookmarks.get(id).await? else {
            debug!("bookmark {id} no longer exists, skipping conversion");
            return Ok(());
        };
        if !convert::needs_conversion(&bookmark.file_name) {
            return Ok(());
        }

        let stem = paths::bookmark_stem(bookmark.user_id, bookmark.series_id, bookmark.chapter_id);
        let outcome = convert::convert_one(
            self.encoder.as_ref(),
            &settings.bookmark_directory,
            &bookmark.file_name,
            &stem,
        )
        .await;

        if let ConvertOutcome::Converted { file_name } = outcome {
            bookmark.file_name = file_name;
            bookmark.last_modified = Utc::now();
            self.bookmarks.update(bookmark).await?;
            self.bookmarks.commit().await?;
        }
        Ok(())
    }
}
