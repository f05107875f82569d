//! Error types and handling for shelfmark-core operations.
//!
//! All public operations return [`Result<T, Error>`]. The variants map to the
//! failure domains of the bookmark store: file I/O, persistence commits,
//! image encoding, configuration, and job scheduling.
//!
//! Two failure classes deliberately do *not* surface as errors anywhere in
//! the crate: adding a bookmark that already exists, and removing one that
//! does not. Both are treated as success so the operations stay safe to
//! retry.

use thiserror::Error;

/// The main error type for shelfmark-core operations.
///
/// `Display` yields user-facing messages; the full chain is preserved via
/// `source()` for the I/O variant.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Covers file copies, deletions and directory walks under the bookmark
    /// and cover roots. The underlying `std::io::Error` is preserved.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A persistence commit (or staging call) failed.
    ///
    /// The caller is expected to roll back the staged mutations and leave
    /// the filesystem in whatever state the operation's ordering guarantees
    /// prescribe (see `BookmarkService::add` / `remove`).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The image encoder rejected or failed to convert a file.
    ///
    /// Inside batch conversion this is absorbed per item and never aborts
    /// the run; the item simply keeps its original file.
    #[error("Encoding error for '{path}': {reason}")]
    Encode {
        /// Path of the file that failed to convert.
        path: String,
        /// Reason reported by the encoder.
        reason: String,
    },

    /// Requested record or file was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A path could not be interpreted (no file name, no parent directory).
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A batch conversion job of this kind is already in flight.
    ///
    /// Batch jobs run with at most one execution per kind; a second start is
    /// rejected outright rather than queued.
    #[error("a {0} job is already running")]
    JobAlreadyRunning(String),
}

impl Error {
    /// Get the error category as a string identifier.
    ///
    /// Useful for grouping errors in logs and metrics.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Persistence(_) => "persistence",
            Self::Encode { .. } => "encode",
            Self::NotFound(_) => "not_found",
            Self::Config(_) => "config",
            Self::InvalidPath(_) => "invalid_path",
            Self::JobAlreadyRunning(_) => "job_already_running",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn display_includes_context() {
        let err = Error::Encode {
            path: "1/2/3/page.png".to_string(),
            reason: "unsupported format".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("1/2/3/page.png"));
        assert!(rendered.contains("unsupported format"));

        assert!(
            Error::JobAlreadyRunning("bookmark-conversion".to_string())
                .to_string()
                .contains("already running")
        );
    }

    #[test]
    fn io_errors_convert_and_keep_source() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert_eq!(err.category(), "io");

        let source = std::error::Error::source(&err);
        assert!(source.unwrap().to_string().contains("access denied"));
    }

    #[test]
    fn categories_are_stable() {
        let cases = [
            (Error::Persistence("commit failed".into()), "persistence"),
            (Error::NotFound("bookmark 9".into()), "not_found"),
            (Error::Config("missing root".into()), "config"),
            (Error::InvalidPath("..".into()), "invalid_path"),
            (
                Error::JobAlreadyRunning("cover-conversion".into()),
                "job_already_running",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.category(), expected);
        }
    }
}
