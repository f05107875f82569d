//! In-memory repositories with real staging and commit/rollback semantics.
//!
//! These back the crate's own tests and are usable by downstream test
//! suites. Commits apply staged operations transactionally: either every
//! staged operation applies, or (on a uniqueness violation or an injected
//! failure) none do and the staged set is preserved for rollback, matching
//! how a database transaction behaves.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{BookmarkRepository, CoverRepository};
use crate::{Bookmark, BookmarkId, ChapterCover, Error, NewBookmark, Result};

#[derive(Debug)]
enum StagedOp {
    Add(Bookmark),
    Update(Bookmark),
    Delete(BookmarkId),
}

#[derive(Debug, Default)]
struct BookmarkState {
    committed: BTreeMap<BookmarkId, Bookmark>,
    staged: Vec<StagedOp>,
    next_id: i64,
    failing_commits: u32,
}

/// In-memory [`BookmarkRepository`].
#[derive(Debug, Default)]
pub struct InMemoryBookmarkRepository {
    state: Mutex<BookmarkState>,
}

impl InMemoryBookmarkRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` commits fail with a persistence error.
    pub async fn fail_commits(&self, count: u32) {
        self.state.lock().await.failing_commits = count;
    }

    /// Number of currently staged, uncommitted operations.
    pub async fn staged_len(&self) -> usize {
        self.state.lock().await.staged.len()
    }
}

fn apply_bookmark_ops(
    committed: &BTreeMap<BookmarkId, Bookmark>,
    staged: &[StagedOp],
) -> Result<BTreeMap<BookmarkId, Bookmark>> {
    let mut next = committed.clone();
    for op in staged {
        match op {
            StagedOp::Add(bookmark) => {
                let duplicate = next.values().any(|existing| {
                    existing.user_id == bookmark.user_id
                        && existing.chapter_id == bookmark.chapter_id
                        && existing.page == bookmark.page
                });
                if duplicate {
                    return Err(Error::Persistence(format!(
                        "unique constraint violated for user {} chapter {} page {}",
                        bookmark.user_id, bookmark.chapter_id, bookmark.page
                    )));
                }
                next.insert(bookmark.id, bookmark.clone());
            }
            StagedOp::Update(bookmark) => {
                if !next.contains_key(&bookmark.id) {
                    return Err(Error::Persistence(format!(
                        "cannot update missing bookmark {}",
                        bookmark.id
                    )));
                }
                next.insert(bookmark.id, bookmark.clone());
            }
            StagedOp::Delete(id) => {
                next.remove(id);
            }
        }
    }
    Ok(next)
}

#[async_trait]
impl BookmarkRepository for InMemoryBookmarkRepository {
    async fn find_by_user_chapter_page(
        &self,
        user_id: i64,
        chapter_id: i64,
        page: i32,
    ) -> Result<Option<Bookmark>> {
        let state = self.state.lock().await;
        Ok(state
            .committed
            .values()
            .find(|b| b.user_id == user_id && b.chapter_id == chapter_id && b.page == page)
            .cloned())
    }

    async fn get(&self, id: BookmarkId) -> Result<Option<Bookmark>> {
        let state = self.state.lock().await;
        Ok(state.committed.get(&id).cloned())
    }

    async fn add(&self, bookmark: NewBookmark) -> Result<Bookmark> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let now = Utc::now();
        let record = Bookmark {
            id: BookmarkId(state.next_id),
            user_id: bookmark.user_id,
            series_id: bookmark.series_id,
            volume_id: bookmark.volume_id,
            chapter_id: bookmark.chapter_id,
            page: bookmark.page,
            file_name: bookmark.file_name,
            created: now,
            last_modified: now,
        };
        state.staged.push(StagedOp::Add(record.clone()));
        Ok(record)
    }

    async fn update(&self, bookmark: Bookmark) -> Result<()> {
        let mut state = self.state.lock().await;
        state.staged.push(StagedOp::Update(bookmark));
        Ok(())
    }

    async fn delete(&self, id: BookmarkId) -> Result<()> {
        let mut state = self.state.lock().await;
        state.staged.push(StagedOp::Delete(id));
        Ok(())
    }

    async fn list_by_ids(&self, ids: &[BookmarkId]) -> Result<Vec<Bookmark>> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.committed.get(id).cloned())
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Bookmark>> {
        let state = self.state.lock().await;
        Ok(state.committed.values().cloned().collect())
    }

    async fn commit(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            return Err(Error::Persistence("injected commit failure".to_string()));
        }
        let next = apply_bookmark_ops(&state.committed, &state.staged)?;
        state.committed = next;
        state.staged.clear();
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.staged.clear();
        Ok(())
    }
}

#[derive(Debug, Default)]
struct CoverState {
    committed: BTreeMap<i64, ChapterCover>,
    staged: Vec<ChapterCover>,
    failing_commits: u32,
}

/// In-memory [`CoverRepository`].
#[derive(Debug, Default)]
pub struct InMemoryCoverRepository {
    state: Mutex<CoverState>,
}

impl InMemoryCoverRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a committed cover record, bypassing staging.
    pub async fn insert(&self, cover: ChapterCover) {
        let mut state = self.state.lock().await;
        state.committed.insert(cover.chapter_id, cover);
    }

    /// Make the next `count` commits fail with a persistence error.
    pub async fn fail_commits(&self, count: u32) {
        self.state.lock().await.failing_commits = count;
    }
}

#[async_trait]
impl CoverRepository for InMemoryCoverRepository {
    async fn list_all(&self) -> Result<Vec<ChapterCover>> {
        let state = self.state.lock().await;
        Ok(state.committed.values().cloned().collect())
    }

    async fn update(&self, cover: ChapterCover) -> Result<()> {
        let mut state = self.state.lock().await;
        state.staged.push(cover);
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            return Err(Error::Persistence("injected commit failure".to_string()));
        }
        let staged = std::mem::take(&mut state.staged);
        for cover in staged {
            state.committed.insert(cover.chapter_id, cover);
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.staged.clear();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_bookmark(user_id: i64, chapter_id: i64, page: i32) -> NewBookmark {
        NewBookmark {
            user_id,
            series_id: 1,
            volume_id: 1,
            chapter_id,
            page,
            file_name: format!("{user_id}/1/{chapter_id}/page{page}.png"),
        }
    }

    #[tokio::test]
    async fn staged_records_are_invisible_until_commit() {
        let repo = InMemoryBookmarkRepository::new();
        let staged = repo.add(new_bookmark(1, 9, 0)).await.unwrap();

        assert!(repo.get(staged.id).await.unwrap().is_none());
        repo.commit().await.unwrap();
        assert!(repo.get(staged.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rollback_discards_staged_operations() {
        let repo = InMemoryBookmarkRepository::new();
        repo.add(new_bookmark(1, 9, 0)).await.unwrap();
        assert_eq!(repo.staged_len().await, 1);

        repo.rollback().await.unwrap();
        assert_eq!(repo.staged_len().await, 0);
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commit_enforces_key_uniqueness() {
        let repo = InMemoryBookmarkRepository::new();
        repo.add(new_bookmark(1, 9, 0)).await.unwrap();
        repo.commit().await.unwrap();

        // Same key staged again: commit must refuse and keep the committed
        // set untouched.
        repo.add(new_bookmark(1, 9, 0)).await.unwrap();
        let err = repo.commit().await.unwrap_err();
        assert_eq!(err.category(), "persistence");
        assert_eq!(repo.list_all().await.unwrap().len(), 1);

        repo.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn injected_commit_failure_preserves_staging() {
        let repo = InMemoryBookmarkRepository::new();
        repo.fail_commits(1).await;
        repo.add(new_bookmark(1, 9, 0)).await.unwrap();

        assert!(repo.commit().await.is_err());
        assert_eq!(repo.staged_len().await, 1);

        // The failure window has passed; the retry lands.
        repo.commit().await.unwrap();
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_by_ids_returns_committed_matches_in_order() {
        let repo = InMemoryBookmarkRepository::new();
        let a = repo.add(new_bookmark(1, 9, 0)).await.unwrap();
        let b = repo.add(new_bookmark(1, 9, 1)).await.unwrap();
        repo.commit().await.unwrap();

        let listed = repo
            .list_by_ids(&[a.id, BookmarkId(999), b.id])
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, a.id);
        assert_eq!(listed[1].id, b.id);
    }

    #[tokio::test]
    async fn cover_updates_stage_until_commit() {
        let repo = InMemoryCoverRepository::new();
        repo.insert(ChapterCover {
            chapter_id: 5,
            cover_file: "cover5.png".to_string(),
            last_modified: Utc::now(),
        })
        .await;

        repo.update(ChapterCover {
            chapter_id: 5,
            cover_file: "cover5.webp".to_string(),
            last_modified: Utc::now(),
        })
        .await
        .unwrap();

        let before = repo.list_all().await.unwrap();
        assert_eq!(before[0].cover_file, "cover5.png");

        repo.commit().await.unwrap();
        let after = repo.list_all().await.unwrap();
        assert_eq!(after[0].cover_file, "cover5.webp");
    }
}
