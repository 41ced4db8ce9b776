//! Upload jobs and the scheduler they are handed to.
//!
//! The exporter and the retry engine never sleep or recurse themselves: they
//! hand an [`UploadJobPayload`] to a [`JobScheduler`], either to run as soon as
//! possible or after a delay. [`queue::JobQueue`] is the in-process tokio
//! implementation; a host with a durable task queue implements the trait
//! over that instead.

pub mod queue;

use std::time::Duration;

use anyhow::Result;
use eventsink_common::constants::MAX_BATCH_ID;
use eventsink_common::event::ParsedRecord;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadJobPayload {
    pub batch: Vec<ParsedRecord>,
    /// Random, only used to correlate log lines. Collisions are possible.
    pub batch_id: u32,
    pub retries_performed_so_far: u32,
}

impl UploadJobPayload {
    pub fn new(batch: Vec<ParsedRecord>, batch_id: u32) -> Self {
        UploadJobPayload {
            batch,
            batch_id,
            retries_performed_so_far: 0,
        }
    }

    pub fn with_random_id(batch: Vec<ParsedRecord>) -> Self {
        Self::new(batch, rand::rng().random_range(0..MAX_BATCH_ID))
    }

    /// Same batch and id, one more retry on the counter.
    pub fn next_attempt(&self) -> Self {
        UploadJobPayload {
            retries_performed_so_far: self.retries_performed_so_far + 1,
            ..self.clone()
        }
    }
}

/// Accepts upload jobs. Both methods return once the job is queued, not
/// once it has run.
#[cfg_attr(test, automock)]
pub trait JobScheduler: Send + Sync {
    fn run_now(&self, payload: UploadJobPayload) -> Result<()>;

    fn run_in(&self, delay: Duration, payload: UploadJobPayload) -> Result<()>;
}
