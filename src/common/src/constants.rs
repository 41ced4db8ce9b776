pub const ENV_PREFIX: &str = "EVENTSINK";

pub const DEFAULT_MAX_RETRIES: u32 = 15;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 3000;

/// Postgres refuses statements with more bind parameters than this.
pub const BIND_LIMIT: usize = 65535;
pub const COLUMN_COUNT: usize = 5;
pub const DEFAULT_MAX_ROWS_PER_BATCH: usize = BIND_LIMIT / COLUMN_COUNT;

/// Batch ids are drawn from `0..MAX_BATCH_ID` and only used to correlate log lines.
pub const MAX_BATCH_ID: u32 = 1_000_000;

/// Upload jobs allowed to hold a database connection at the same time.
pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 8;

pub const EMPTY_JSON_OBJECT: &str = "{}";

pub const SELF_SIGNED_CERT_DEFAULT: &str = "No";
