//! Core data types: bookmark records, cover records, and progress events.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable identity of a bookmark record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BookmarkId(pub i64);

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A user-saved page image, materialized as a copied file plus this record.
///
/// `file_name` is the forward-slash-normalized path of the stored file
/// relative to the configured bookmark root, e.g. `"42/17/9/page003.webp"`
/// for user 42, series 17, chapter 9. At most one record exists per
/// `(user_id, chapter_id, page)`; the repository enforces this at commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    /// Record identity, assigned by the repository when staged.
    pub id: BookmarkId,
    /// Owning user.
    pub user_id: i64,
    /// Series the bookmarked page belongs to.
    pub series_id: i64,
    /// Volume the bookmarked page belongs to.
    pub volume_id: i64,
    /// Chapter the bookmarked page belongs to.
    pub chapter_id: i64,
    /// Zero-based page number within the chapter.
    pub page: i32,
    /// Stored file path relative to the bookmark root, `/`-separated.
    pub file_name: String,
    /// When the record was created.
    pub created: DateTime<Utc>,
    /// Last mutation time; bumped when a conversion rewrites `file_name`.
    pub last_modified: DateTime<Utc>,
}

/// The fields a caller supplies when creating a bookmark record.
///
/// The repository assigns identity and timestamps when the record is staged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBookmark {
    /// Owning user.
    pub user_id: i64,
    /// Series the bookmarked page belongs to.
    pub series_id: i64,
    /// Volume the bookmarked page belongs to.
    pub volume_id: i64,
    /// Chapter the bookmarked page belongs to.
    pub chapter_id: i64,
    /// Zero-based page number within the chapter.
    pub page: i32,
    /// Stored file path relative to the bookmark root, `/`-separated.
    pub file_name: String,
}

/// Location of a page a user wants to bookmark or un-bookmark.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BookmarkRequest {
    /// Series the page belongs to.
    pub series_id: i64,
    /// Volume the page belongs to.
    pub volume_id: i64,
    /// Chapter the page belongs to.
    pub chapter_id: i64,
    /// Zero-based page number within the chapter.
    pub page: i32,
}

/// A chapter's cover image record.
///
/// `cover_file` is a flat file name relative to the configured cover
/// directory; covers are not nested per user/series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterCover {
    /// Chapter the cover belongs to.
    pub chapter_id: i64,
    /// Cover file name relative to the cover directory.
    pub cover_file: String,
    /// Last mutation time; bumped when a conversion rewrites `cover_file`.
    pub last_modified: DateTime<Utc>,
}

/// The two batch conversion job kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    /// Converting stored bookmark pages.
    BookmarkConversion,
    /// Converting chapter covers.
    CoverConversion,
}

impl JobKind {
    /// Stable string tag used in progress payloads and log lines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BookmarkConversion => "bookmark-conversion",
            Self::CoverConversion => "cover-conversion",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage of a progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStage {
    /// Emitted once before the first item, at fraction 0.
    Started,
    /// Emitted once per completed item.
    InProgress,
    /// Emitted once after the last item, at fraction 1.
    Ended,
}

/// A fractional progress report for a long-running conversion job.
///
/// Ephemeral: emitted to the notification sink and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Report stage.
    pub stage: ProgressStage,
    /// Completion fraction in `[0.0, 1.0]`.
    pub fraction: f32,
    /// Which job emitted the report.
    pub kind: JobKind,
}

impl ProgressEvent {
    /// Report emitted before a job processes its first item.
    #[must_use]
    pub const fn started(kind: JobKind) -> Self {
        Self {
            stage: ProgressStage::Started,
            fraction: 0.0,
            kind,
        }
    }

    /// Report emitted after each completed item.
    #[must_use]
    pub const fn in_progress(kind: JobKind, fraction: f32) -> Self {
        Self {
            stage: ProgressStage::InProgress,
            fraction,
            kind,
        }
    }

    /// Report emitted once a job has processed every item.
    #[must_use]
    pub const fn ended(kind: JobKind) -> Self {
        Self {
            stage: ProgressStage::Ended,
            fraction: 1.0,
            kind,
        }
    }
}
