//! Asynchronous job requests and the worker that drains them.
//!
//! A lifecycle operation that wants follow-up work done (converting a
//! freshly saved bookmark) enqueues a [`JobRequest`] referencing the record
//! by durable id, never by in-memory state, since the job may run long
//! after the triggering request completed. Enqueueing is fire-and-forget:
//! the operation's success does not depend on the job ever running.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::BookmarkId;
use crate::service::BookmarkService;

/// A request for asynchronous follow-up work.
///
/// Serializable so a durable queue can ship it across process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "job")]
pub enum JobRequest {
    /// Convert the stored file of one bookmark to WebP.
    ConvertBookmark {
        /// Identity of the bookmark to convert.
        bookmark_id: BookmarkId,
    },
}

/// Sending half of the job queue.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<JobRequest>,
}

impl JobQueue {
    /// Create a queue and the receiver a worker will drain.
    #[must_use]
    pub fn unbounded() -> (Self, mpsc::UnboundedReceiver<JobRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue a request. Fire-and-forget: if no worker is listening the
    /// request is dropped with a log line, never an error.
    pub fn enqueue(&self, request: JobRequest) {
        if self.tx.send(request).is_err() {
            warn!("job worker is gone, dropping {request:?}");
        }
    }
}

/// Spawn the worker that executes queued requests against `service`.
///
/// Job failures are logged and absorbed (there is no caller waiting) and
/// the worker moves on to the next request. The task exits when every
/// [`JobQueue`] handle has been dropped.
pub fn spawn_worker(
    service: Arc<BookmarkService>,
    mut requests: mpsc::UnboundedReceiver<JobRequest>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            match request {
                JobRequest::ConvertBookmark { bookmark_id } => {
                    if let Err(e) = service.convert_bookmark(bookmark_id).await {
                        error!("conversion job for bookmark {bookmark_id} failed: {e}");
                    }
                }
            }
        }
        debug!("job queue closed, worker exiting");
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn requests_serialize_with_job_tag() {
        let request = JobRequest::ConvertBookmark {
            bookmark_id: BookmarkId(42),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"convert-bookmark\""));

        let back: JobRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }

    #[tokio::test]
    async fn enqueue_without_worker_does_not_error() {
        let (queue, rx) = JobQueue::unbounded();
        drop(rx);
        queue.enqueue(JobRequest::ConvertBookmark {
            bookmark_id: BookmarkId(1),
        });
    }
}
