//! Test doubles shared by the unit tests of this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::exporters::db::{QueryError, QueryExecutor, Statement};
use crate::jobs::{JobScheduler, UploadJobPayload};
use eventsink_common::constants::COLUMN_COUNT;
use eventsink_common::event::ParsedRecord;

pub fn sample_batch(rows: usize) -> Vec<ParsedRecord> {
    (0..rows)
        .map(|i| ParsedRecord {
            feedback_type: "feedback".to_string(),
            user_id: format!("\"u{i}\""),
            item_id: format!("\"i{i}\""),
            time_stamp: "2024-01-01T00:00:00.000Z".to_string(),
            comment: "{}".to_string(),
        })
        .collect()
}

/// Replays scripted results in order, then keeps returning `fallback`
/// (or success for every row once the script and fallback are exhausted).
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<Result<u64, QueryError>>>,
    fallback: Option<QueryError>,
    statements: Mutex<Vec<Statement>>,
}

impl ScriptedExecutor {
    pub fn new(script: Vec<Result<u64, QueryError>>) -> Self {
        ScriptedExecutor {
            script: Mutex::new(script.into()),
            fallback: None,
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: QueryError) -> Self {
        ScriptedExecutor {
            fallback: Some(error),
            ..Self::new(vec![])
        }
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }
}

impl QueryExecutor for ScriptedExecutor {
    async fn execute(&self, statement: &Statement) -> Result<u64, QueryError> {
        self.statements.lock().unwrap().push(statement.clone());

        let scripted = self.script.lock().unwrap().pop_front();
        match (scripted, &self.fallback) {
            (Some(result), _) => result,
            (None, Some(error)) => Err(error.clone()),
            (None, None) => Ok((statement.params.len() / COLUMN_COUNT) as u64),
        }
    }
}

/// Records submitted jobs instead of running them.
#[derive(Default)]
pub struct RecordingScheduler {
    jobs: Mutex<VecDeque<(Option<Duration>, UploadJobPayload)>>,
}

impl RecordingScheduler {
    pub fn pop(&self) -> Option<(Option<Duration>, UploadJobPayload)> {
        self.jobs.lock().unwrap().pop_front()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}

impl JobScheduler for RecordingScheduler {
    fn run_now(&self, payload: UploadJobPayload) -> anyhow::Result<()> {
        self.jobs.lock().unwrap().push_back((None, payload));
        Ok(())
    }

    fn run_in(&self, delay: Duration, payload: UploadJobPayload) -> anyhow::Result<()> {
        self.jobs.lock().unwrap().push_back((Some(delay), payload));
        Ok(())
    }
}

/// Succeeds after `latency`, tracking how many statements overlap.
pub struct SlowExecutor {
    latency: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
}

impl SlowExecutor {
    pub fn new(latency: Duration) -> Self {
        SlowExecutor {
            latency,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl QueryExecutor for SlowExecutor {
    async fn execute(&self, statement: &Statement) -> Result<u64, QueryError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok((statement.params.len() / COLUMN_COUNT) as u64)
    }
}
