//! Repository interfaces the bookmark store is built against.
//!
//! The persistence engine itself lives elsewhere; this crate only defines
//! when its commit/rollback boundary must be crossed. Every mutation call
//! is staged; nothing becomes durable until [`BookmarkRepository::commit`]
//! succeeds, and [`BookmarkRepository::rollback`] discards whatever is
//! staged. That gives each lifecycle operation a single rollback point.
//!
//! The repository, not any in-process check, is the source of truth for
//! bookmark uniqueness: implementations must refuse to commit a second
//! record for the same `(user, chapter, page)` key.

use async_trait::async_trait;

use crate::{Bookmark, BookmarkId, ChapterCover, NewBookmark, Result};

pub mod memory;

/// Durable record set for bookmark artifacts.
#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// Look up the committed record for a `(user, chapter, page)` key.
    async fn find_by_user_chapter_page(
        &self,
        user_id: i64,
        chapter_id: i64,
        page: i32,
    ) -> Result<Option<Bookmark>>;

    /// Fetch a committed record by id.
    async fn get(&self, id: BookmarkId) -> Result<Option<Bookmark>>;

    /// Stage a new record and return it with its assigned identity.
    ///
    /// The identity is valid immediately (so follow-up work can reference
    /// the record) but the record only becomes durable at commit.
    async fn add(&self, bookmark: NewBookmark) -> Result<Bookmark>;

    /// Stage an update to an existing record.
    async fn update(&self, bookmark: Bookmark) -> Result<()>;

    /// Stage deletion of a record.
    async fn delete(&self, id: BookmarkId) -> Result<()>;

    /// Committed records for the given ids, in id order.
    async fn list_by_ids(&self, ids: &[BookmarkId]) -> Result<Vec<Bookmark>>;

    /// All committed records, in id order.
    async fn list_all(&self) -> Result<Vec<Bookmark>>;

    /// Make all staged mutations durable.
    ///
    /// Fails with [`crate::Error::Persistence`] on underlying failure; the
    /// staged mutations remain until rolled back.
    async fn commit(&self) -> Result<()>;

    /// Discard all staged mutations.
    async fn rollback(&self) -> Result<()>;
}

/// Durable record set for chapter cover images.
#[async_trait]
pub trait CoverRepository: Send + Sync {
    /// All committed cover records, in chapter order.
    async fn list_all(&self) -> Result<Vec<ChapterCover>>;

    /// Stage an update to a cover record.
    async fn update(&self, cover: ChapterCover) -> Result<()>;

    /// Make all staged mutations durable.
    async fn commit(&self) -> Result<()>;

    /// Discard all staged mutations.
    async fn rollback(&self) -> Result<()>;
}
