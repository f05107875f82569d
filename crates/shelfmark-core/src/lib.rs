//! # shelfmark-core
//!
//! Core bookmark artifact store: page images copied out of a transient
//! cache into a durable per-user store, each tracked by a database-backed
//! record, plus the asynchronous jobs that rewrite stored images as WebP.
//!
//! The interesting part is not the encoding, which sits behind the
//! [`ImageEncoder`] trait, but the consistency protocol between a
//! filesystem side effect and a database record. A copy, convert or delete
//! is never atomic with a commit, so every operation follows a fixed
//! ordering:
//!
//! - **Add**: copy the file, stage the record, commit. A failed commit
//!   rolls the staged record back *and* removes the copy.
//! - **Remove**: commit the record deletion first; only then delete the
//!   file and prune emptied directories. A crash in between leaves an
//!   orphaned file, never a record pointing at nothing.
//! - **Convert**: each item is encoded, committed and reported
//!   independently, so a batch killed halfway leaves converted items
//!   durable and the rest eligible for the next manual run.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::path::{Path, PathBuf};
//! use std::sync::Arc;
//!
//! use shelfmark_core::{
//!     BookmarkRequest, BookmarkService, JobQueue, NullSink, Settings, StaticSettings,
//!     WebpEncoder, jobs,
//!     repo::memory::{InMemoryBookmarkRepository, InMemoryCoverRepository},
//! };
//!
//! # async fn demo() -> shelfmark_core::Result<()> {
//! let settings = StaticSettings::new(Settings {
//!     bookmark_directory: PathBuf::from("/data/bookmarks"),
//!     cover_directory: PathBuf::from("/data/covers"),
//!     convert_bookmark_on_save: true,
//! });
//!
//! let (queue, requests) = JobQueue::unbounded();
//! let service = Arc::new(
//!     BookmarkService::new(
//!         Arc::new(InMemoryBookmarkRepository::new()),
//!         Arc::new(InMemoryCoverRepository::new()),
//!         Arc::new(WebpEncoder::new()),
//!         Arc::new(settings),
//!         Arc::new(NullSink),
//!     )
//!     .with_job_queue(queue),
//! );
//! let _worker = jobs::spawn_worker(Arc::clone(&service), requests);
//!
//! let request = BookmarkRequest { series_id: 3, volume_id: 2, chapter_id: 9, page: 3 };
//! service.add(7, request, Path::new("/cache/page003.png")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! All fallible operations return [`Result<T, Error>`]; failures inside
//! background jobs are logged and absorbed rather than surfaced, since no
//! caller is waiting on them.

/// Runtime settings snapshots and the provider trait.
pub mod config;
/// Single-artifact conversion and batch-job exclusivity.
pub mod convert;
/// Image encoder boundary and the default WebP implementation.
pub mod encode;
/// Error types and result alias.
pub mod error;
/// Progress notification boundary.
pub mod events;
/// Asynchronous job requests and the queue worker.
pub mod jobs;
/// Deterministic storage path derivation.
pub mod paths;
/// Repository interfaces and the in-memory reference implementation.
pub mod repo;
/// The bookmark lifecycle façade.
pub mod service;
/// Stateless filesystem operations under the storage roots.
pub mod store;
/// Core data types.
pub mod types;

// Re-export commonly used types
pub use config::{Settings, SettingsProvider, StaticSettings, WEBP_EXTENSION};
pub use convert::{ConvertOutcome, JobLocks, convert_one, needs_conversion};
pub use encode::{ImageEncoder, WebpEncoder};
pub use error::{Error, Result};
pub use events::{ChannelSink, EventSink, NullSink, PROGRESS_CHANNEL};
pub use jobs::{JobQueue, JobRequest};
pub use repo::{BookmarkRepository, CoverRepository};
pub use service::BookmarkService;
pub use types::*;
