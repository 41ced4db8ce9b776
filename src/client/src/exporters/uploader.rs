use std::sync::Arc;
use std::time::Duration;

use crate::bootstrap::ExportState;
use crate::exporters::db::{QueryError, QueryExecutor};
use crate::exporters::dead_letter::DeadLetterSink;
use crate::exporters::statement::insert_statement;
use crate::jobs::{JobScheduler, UploadJobPayload};
use eventsink_common::config::ExporterConfig;
use eventsink_common::constants::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY_MS};
use tracing::{debug, error, info};

/// Exponential backoff: retry `k` (0-based) waits `base_delay * 2^k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ExporterConfig) -> Self {
        RetryPolicy {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    pub fn delay_for(&self, retries_performed_so_far: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retries_performed_so_far))
    }

    pub fn is_exhausted(&self, retries_performed_so_far: u32) -> bool {
        retries_performed_so_far >= self.max_retries
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Succeeded { rows_affected: u64 },
    RetryScheduled { delay: Duration },
    Abandoned,
}

/// Inserts one batch per job and reschedules itself on failure.
pub struct BatchUploader<E> {
    executor: E,
    state: Arc<ExportState>,
    policy: RetryPolicy,
    dead_letter: Option<Arc<dyn DeadLetterSink>>,
}

impl<E: QueryExecutor> BatchUploader<E> {
    pub fn new(executor: E, state: Arc<ExportState>, policy: RetryPolicy) -> Self {
        BatchUploader {
            executor,
            state,
            policy,
            dead_letter: None,
        }
    }

    pub fn with_dead_letter(mut self, sink: Arc<dyn DeadLetterSink>) -> Self {
        self.dead_letter = Some(sink);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub async fn upload<S: JobScheduler + ?Sized>(
        &self,
        payload: UploadJobPayload,
        scheduler: &S,
    ) -> UploadOutcome {
        let statement = insert_statement(&self.state.table_name, &payload.batch);

        info!(
            "(Batch Id: {}) Flushing {} event{} to {}",
            payload.batch_id,
            payload.batch.len(),
            if payload.batch.len() > 1 { "s" } else { "" },
            self.state.table_name
        );

        let error = match self.executor.execute(&statement).await {
            Ok(rows_affected) => {
                debug!(
                    "(Batch Id: {}) Inserted {} rows on attempt {}",
                    payload.batch_id,
                    rows_affected,
                    payload.retries_performed_so_far + 1
                );
                return UploadOutcome::Succeeded { rows_affected };
            }
            Err(e) => e,
        };

        error!(
            "(Batch Id: {}) Error uploading to Postgres: {}",
            payload.batch_id, error
        );

        if self.policy.is_exhausted(payload.retries_performed_so_far) {
            return self.abandon(&payload, &error);
        }

        let delay = self.policy.delay_for(payload.retries_performed_so_far);
        let retry = payload.next_attempt();

        match scheduler.run_in(delay, retry) {
            Ok(()) => {
                info!(
                    "Enqueued batch {} for retry in {}ms",
                    payload.batch_id,
                    delay.as_millis()
                );
                UploadOutcome::RetryScheduled { delay }
            }
            Err(e) => {
                error!(
                    "(Batch Id: {}) Failed to enqueue retry: {:#}",
                    payload.batch_id, e
                );
                self.abandon(&payload, &error)
            }
        }
    }

    fn abandon(&self, payload: &UploadJobPayload, last_error: &QueryError) -> UploadOutcome {
        error!(
            "(Batch Id: {}) Dropping {} events after {} retries",
            payload.batch_id,
            payload.batch.len(),
            payload.retries_performed_so_far
        );
        if let Some(sink) = &self.dead_letter {
            sink.accept(payload, last_error);
        }
        UploadOutcome::Abandoned
    }
}
