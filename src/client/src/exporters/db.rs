use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Instant;

use eventsink_common::config::{ConfigError, ConnectionTarget, ExporterConfig};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::Connection;
use tracing::{debug, warn};

/// A SQL template plus its positional (`$1`, `$2`, ...) parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<String>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Statement {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

/// Failure captured while running a statement. Never raised as a panic,
/// always handed back to the caller to inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Connection options could not be built from the configuration
    InvalidOptions(String),

    /// Connecting to the database failed
    Connect(String),

    /// The database rejected or failed to run the statement
    Execute(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::InvalidOptions(e) => write!(f, "Invalid connection options: {}", e),
            QueryError::Connect(e) => write!(f, "Failed to connect: {}", e),
            QueryError::Execute(e) => write!(f, "Query failed: {}", e),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<ConfigError> for QueryError {
    fn from(err: ConfigError) -> Self {
        QueryError::InvalidOptions(err.to_string())
    }
}

/// Runs one statement and reports the number of affected rows.
pub trait QueryExecutor: Send + Sync {
    fn execute(
        &self,
        statement: &Statement,
    ) -> impl Future<Output = Result<u64, QueryError>> + Send;
}

/// Opens a fresh connection for every statement and closes it afterwards.
pub struct PgExecutor {
    options: PgConnectOptions,
}

impl PgExecutor {
    pub fn try_new(config: &ExporterConfig) -> Result<Self, QueryError> {
        Ok(PgExecutor {
            options: connect_options(config)?,
        })
    }
}

/// Builds connection options, preferring `database_url` over the discrete fields.
///
/// Certificates are verified unless the config allows a self-signed one, in
/// which case the connection is still encrypted but the chain is not checked.
pub fn connect_options(config: &ExporterConfig) -> Result<PgConnectOptions, QueryError> {
    let options = match config.connection_target()? {
        ConnectionTarget::Url(url) => PgConnectOptions::from_str(url)
            .map_err(|e| QueryError::InvalidOptions(e.to_string()))?,
        ConnectionTarget::Discrete {
            host,
            port,
            database,
            username,
            password,
        } => PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database)
            .username(username)
            .password(password),
    };

    let ssl_mode = if config.accepts_self_signed_cert() {
        PgSslMode::Require
    } else {
        PgSslMode::VerifyFull
    };

    Ok(options.ssl_mode(ssl_mode))
}

impl QueryExecutor for PgExecutor {
    async fn execute(&self, statement: &Statement) -> Result<u64, QueryError> {
        let now = Instant::now();

        let mut conn = PgConnection::connect_with(&self.options)
            .await
            .map_err(|e| QueryError::Connect(e.to_string()))?;

        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = query.bind(param.as_str());
        }

        let result = query.execute(&mut conn).await;

        // the connection is released whatever the outcome of the statement
        if let Err(e) = conn.close().await {
            warn!("Failed to close connection cleanly: {}", e);
        }

        let rows_affected = result
            .map_err(|e| QueryError::Execute(e.to_string()))?
            .rows_affected();

        debug!(
            "Statement with {} params affected {} rows, elapsed: {:?}",
            statement.params.len(),
            rows_affected,
            now.elapsed()
        );

        Ok(rows_affected)
    }
}
