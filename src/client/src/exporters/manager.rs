use std::sync::Arc;

use crate::bootstrap::ExportState;
use crate::exporters::mapper::filter_and_map;
use crate::jobs::{JobScheduler, UploadJobPayload};
use anyhow::Context;
use eventsink_common::config::ExporterConfig;
use eventsink_common::constants::DEFAULT_MAX_ROWS_PER_BATCH;
use eventsink_common::event::RawEvent;
use tracing::debug;

/// Entry point for each chunk of events delivered by the host.
pub struct EventExporter {
    state: Arc<ExportState>,
    max_rows_per_batch: usize,
}

impl EventExporter {
    pub fn new(state: Arc<ExportState>) -> Self {
        EventExporter {
            state,
            max_rows_per_batch: DEFAULT_MAX_ROWS_PER_BATCH,
        }
    }

    pub fn from_config(state: Arc<ExportState>, config: &ExporterConfig) -> Self {
        Self::new(state).with_max_rows_per_batch(config.max_rows_per_batch)
    }

    /// Caps the rows per insert; values above the bind-parameter limit are clamped.
    pub fn with_max_rows_per_batch(mut self, max_rows_per_batch: usize) -> Self {
        self.max_rows_per_batch = max_rows_per_batch.clamp(1, DEFAULT_MAX_ROWS_PER_BATCH);
        self
    }

    pub fn state(&self) -> &Arc<ExportState> {
        &self.state
    }

    /// Filters and maps the chunk, then queues one upload job per batch.
    ///
    /// Returns the number of jobs queued; nothing is queued when no event
    /// passes the allow-list.
    pub fn export_events<S: JobScheduler + ?Sized>(
        &self,
        events: &[RawEvent],
        scheduler: &S,
    ) -> anyhow::Result<usize> {
        let mut data = filter_and_map(events, &self.state.events_to_insert);

        debug!(
            "{} of {} events passed the allow-list",
            data.len(),
            events.len()
        );

        let mut submitted = 0;
        while !data.is_empty() {
            let rest = data.split_off(data.len().min(self.max_rows_per_batch));
            let batch = std::mem::replace(&mut data, rest);

            let payload = UploadJobPayload::with_random_id(batch);
            let batch_id = payload.batch_id;
            scheduler
                .run_now(payload)
                .with_context(|| format!("Failed to enqueue upload job for batch {batch_id}"))?;
            submitted += 1;
        }

        Ok(submitted)
    }
}
