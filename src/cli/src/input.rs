use std::path::Path;

use anyhow::{Context, Result};
use eventsink_common::event::RawEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::warn;

/// Reads JSON-lines events; blank lines are ignored and malformed ones skipped.
pub struct EventReader<R> {
    lines: Lines<R>,
    line_number: usize,
    skipped: usize,
}

impl<R: AsyncBufRead + Unpin> EventReader<R> {
    pub fn new(reader: R) -> Self {
        EventReader {
            lines: reader.lines(),
            line_number: 0,
            skipped: 0,
        }
    }

    /// Lines that were not valid events.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Up to `size` events, or `None` once the input is exhausted.
    pub async fn next_chunk(&mut self, size: usize) -> Result<Option<Vec<RawEvent>>> {
        let size = size.max(1);
        let mut chunk = Vec::with_capacity(size);
        let mut saw_line = false;

        while chunk.len() < size {
            let Some(line) = self
                .lines
                .next_line()
                .await
                .context("Failed to read events from input")?
            else {
                break;
            };
            saw_line = true;
            self.line_number += 1;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<RawEvent>(&line) {
                Ok(event) => chunk.push(event),
                Err(e) => {
                    self.skipped += 1;
                    warn!("Skipping line {}: not a valid event: {}", self.line_number, e);
                }
            }
        }

        Ok((saw_line || !chunk.is_empty()).then_some(chunk))
    }
}

pub type BoxedInput = BufReader<Box<dyn tokio::io::AsyncRead + Unpin + Send>>;

/// Opens `path`, or stdin when no path is given.
pub async fn open_input(path: Option<&Path>) -> Result<EventReader<BoxedInput>> {
    let source: Box<dyn tokio::io::AsyncRead + Unpin + Send> = match path {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input file {:?}", path))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    Ok(EventReader::new(BufReader::new(source)))
}
