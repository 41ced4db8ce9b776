use std::path::Path;
use std::sync::Arc;

use crate::commands::{Cli, Command};
use crate::input::open_input;
use crate::logging::setup_logging;
use anyhow::{Context, Result};
use clap::Parser;
use eventsink_client::exporters::db::PgExecutor;
use eventsink_client::exporters::dead_letter::LogDeadLetter;
use eventsink_client::exporters::uploader::{BatchUploader, RetryPolicy};
use eventsink_client::jobs::queue::JobQueue;
use eventsink_client::{setup, EventExporter};
use eventsink_common::config::{ConfigLoader, ExporterConfig};
use tracing::info;

/// Totals of one `export` run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub events_read: usize,
    pub lines_skipped: usize,
    pub batches_queued: usize,
    pub batches_abandoned: usize,
}

pub fn process_cli() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref(), cli.log_dir.as_deref())?;

    // Use the --config flag, if provided, when loading the configuration
    let config = ConfigLoader::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::CheckConfig => print_config(&config),
        command => tokio::runtime::Runtime::new()?.block_on(run_async_command(command, config)),
    }
}

pub async fn run_async_command(command: Command, config: ExporterConfig) -> Result<()> {
    match command {
        Command::Setup => {
            let executor = PgExecutor::try_new(&config)?;
            let state = setup(&config, &executor).await?;
            println!("Table public.{} is ready.", state.table_name);
            Ok(())
        }
        Command::Export { input, chunk_size } => {
            let summary = export(&config, input.as_deref(), chunk_size).await?;
            println!(
                "Read {} event(s), skipped {} line(s), queued {} batch(es).",
                summary.events_read, summary.lines_skipped, summary.batches_queued
            );
            if summary.batches_abandoned > 0 {
                anyhow::bail!(
                    "{} of {} batch(es) were dropped after exhausting their retries",
                    summary.batches_abandoned,
                    summary.batches_queued
                );
            }
            Ok(())
        }
        Command::CheckConfig => print_config(&config),
    }
}

pub fn print_config(config: &ExporterConfig) -> Result<()> {
    config.validate()?;
    let rendered = serde_json::to_string_pretty(&config.redacted())
        .context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}

/// Bootstraps, then streams the input through the exporter and waits for
/// every upload, retries included, before returning.
pub async fn export(
    config: &ExporterConfig,
    input: Option<&Path>,
    chunk_size: usize,
) -> Result<ExportSummary> {
    let executor = PgExecutor::try_new(config)?;
    let state = Arc::new(setup(config, &executor).await?);

    let dead_letter = Arc::new(LogDeadLetter::default());
    let exporter = EventExporter::from_config(state.clone(), config);
    let uploader = BatchUploader::new(executor, state, RetryPolicy::from_config(config))
        .with_dead_letter(dead_letter.clone());
    let queue = JobQueue::with_max_concurrent_uploads(uploader, config.max_concurrent_uploads);

    let mut reader = open_input(input).await?;
    let mut summary = ExportSummary::default();

    while let Some(chunk) = reader.next_chunk(chunk_size).await? {
        summary.events_read += chunk.len();
        summary.batches_queued += exporter.export_events(&chunk, &queue)?;
    }
    summary.lines_skipped = reader.skipped();

    info!(
        "Input exhausted, waiting for {} pending upload job(s)",
        queue.pending_jobs()
    );
    queue.shutdown().await;
    summary.batches_abandoned = dead_letter.abandoned_batches();

    Ok(summary)
}
