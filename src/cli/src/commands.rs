use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Events read from the input before they are handed to the exporter.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

#[derive(Parser, Clone, Debug)]
#[clap(
    name = "eventsink",
    about = "Exports allow-listed analytics events into a Postgres table",
    version
)]
pub struct Cli {
    /// TOML config file; EVENTSINK_* environment variables override it
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter such as `debug` or `eventsink_client=trace`; defaults to RUST_LOG, then `info`
    #[clap(long, global = true)]
    pub log_level: Option<String>,

    /// Write logs to `eventsink.log` in this directory instead of stderr
    #[clap(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Validate the config and create the export table if it does not exist
    Setup,

    /// Read JSON-lines events and export them, waiting for every upload and retry
    Export {
        /// File to read events from; stdin when omitted
        #[clap(long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Number of events handed to the exporter at a time; at least 1
        #[clap(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },

    /// Print the resolved configuration with passwords masked
    CheckConfig,
}
