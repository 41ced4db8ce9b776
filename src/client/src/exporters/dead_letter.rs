use std::sync::atomic::{AtomicUsize, Ordering};

use crate::exporters::db::QueryError;
use crate::jobs::UploadJobPayload;
use tracing::warn;

/// Receives batches the retry engine gave up on.
pub trait DeadLetterSink: Send + Sync {
    fn accept(&self, payload: &UploadJobPayload, last_error: &QueryError);
}

/// Logs the dropped rows and keeps count of abandoned batches.
#[derive(Debug, Default)]
pub struct LogDeadLetter {
    abandoned: AtomicUsize,
}

impl LogDeadLetter {
    pub fn abandoned_batches(&self) -> usize {
        self.abandoned.load(Ordering::Relaxed)
    }
}

impl DeadLetterSink for LogDeadLetter {
    fn accept(&self, payload: &UploadJobPayload, last_error: &QueryError) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);

        let rows = serde_json::to_string(&payload.batch).unwrap_or_default();
        warn!(
            "(Batch Id: {}) Abandoned after {} retries ({}), rows: {}",
            payload.batch_id, payload.retries_performed_so_far, last_error, rows
        );
    }
}
