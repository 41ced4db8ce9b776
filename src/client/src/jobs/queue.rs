use std::sync::Arc;
use std::time::Duration;

use crate::exporters::db::QueryExecutor;
use crate::exporters::uploader::BatchUploader;
use crate::jobs::{JobScheduler, UploadJobPayload};
use anyhow::Result;
use eventsink_common::constants::DEFAULT_MAX_CONCURRENT_UPLOADS;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

struct Inner<E> {
    uploader: BatchUploader<E>,
    tracker: TaskTracker,
    upload_permits: Semaphore,
}

/// In-process job queue: every job is a tokio task, delayed jobs sleep first.
///
/// At most `max_concurrent_uploads` jobs talk to the database at once; the
/// rest wait for a permit after their delay has elapsed. Not durable; jobs
/// still pending when the process exits are lost.
pub struct JobQueue<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for JobQueue<E> {
    fn clone(&self) -> Self {
        JobQueue {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: QueryExecutor + 'static> JobQueue<E> {
    pub fn new(uploader: BatchUploader<E>) -> Self {
        Self::with_max_concurrent_uploads(uploader, DEFAULT_MAX_CONCURRENT_UPLOADS)
    }

    pub fn with_max_concurrent_uploads(
        uploader: BatchUploader<E>,
        max_concurrent_uploads: usize,
    ) -> Self {
        let permits = max_concurrent_uploads.clamp(1, Semaphore::MAX_PERMITS);
        JobQueue {
            inner: Arc::new(Inner {
                uploader,
                tracker: TaskTracker::new(),
                upload_permits: Semaphore::new(permits),
            }),
        }
    }

    /// Jobs that are running, waiting for their delay, or not yet started.
    pub fn pending_jobs(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Waits for every job to finish, including retries scheduled meanwhile.
    pub async fn shutdown(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }

    fn spawn(&self, delay: Option<Duration>, payload: UploadJobPayload) {
        let queue = self.clone();
        self.inner.tracker.spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let _permit = match queue.inner.upload_permits.acquire().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(
                        "(Batch Id: {}) Upload permits unavailable: {}",
                        payload.batch_id, e
                    );
                    return;
                }
            };
            let outcome = queue.inner.uploader.upload(payload, &queue).await;
            debug!("Upload job finished: {:?}", outcome);
        });
    }
}

impl<E: QueryExecutor + 'static> JobScheduler for JobQueue<E> {
    fn run_now(&self, payload: UploadJobPayload) -> Result<()> {
        self.spawn(None, payload);
        Ok(())
    }

    fn run_in(&self, delay: Duration, payload: UploadJobPayload) -> Result<()> {
        self.spawn(Some(delay), payload);
        Ok(())
    }
}
