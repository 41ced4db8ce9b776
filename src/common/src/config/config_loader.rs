use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::constants::{
    DEFAULT_MAX_CONCURRENT_UPLOADS, DEFAULT_MAX_RETRIES, DEFAULT_MAX_ROWS_PER_BATCH,
    DEFAULT_RETRY_BASE_DELAY_MS, ENV_PREFIX, SELF_SIGNED_CERT_DEFAULT,
};
use config::{Config as RConfig, Environment, File, FileFormat};

const REDACTED: &str = "********";

/// Whether the database presents a certificate that cannot be verified
/// against the system roots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum SelfSignedCert {
    Yes,
    #[default]
    No,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ExporterConfig {
    pub database_url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db_name: Option<String>,
    pub db_username: Option<String>,
    pub db_password: Option<String>,

    pub table_name: String,
    pub events_to_insert: Option<String>,
    pub has_self_signed_cert: SelfSignedCert,

    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub max_rows_per_batch: usize,
    pub max_concurrent_uploads: usize,
}

/// Where to connect, resolved from either the full URL or the discrete fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionTarget<'a> {
    Url(&'a str),
    Discrete {
        host: &'a str,
        port: u16,
        database: &'a str,
        username: &'a str,
        password: &'a str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither `database_url` nor the named discrete connection option was set
    MissingOption(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingOption(option) => {
                write!(f, "Required config option {} is missing!", option)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl ExporterConfig {
    /// A config pointing at `database_url` with every other option at its default.
    pub fn with_url(database_url: impl Into<String>, table_name: impl Into<String>) -> Self {
        ExporterConfig {
            database_url: Some(database_url.into()),
            host: None,
            port: None,
            db_name: None,
            db_username: None,
            db_password: None,
            table_name: table_name.into(),
            events_to_insert: None,
            has_self_signed_cert: SelfSignedCert::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            max_rows_per_batch: DEFAULT_MAX_ROWS_PER_BATCH,
            max_concurrent_uploads: DEFAULT_MAX_CONCURRENT_UPLOADS,
        }
    }

    /// Resolves the connection target, preferring the full URL.
    ///
    /// Without a URL every discrete option must be present; the first missing
    /// one (host, port, db_name, db_username, db_password) is reported.
    pub fn connection_target(&self) -> Result<ConnectionTarget<'_>, ConfigError> {
        if let Some(url) = non_blank(&self.database_url) {
            return Ok(ConnectionTarget::Url(url));
        }

        let host = non_blank(&self.host).ok_or(ConfigError::MissingOption("host"))?;
        let port = self.port.ok_or(ConfigError::MissingOption("port"))?;
        let database = non_blank(&self.db_name).ok_or(ConfigError::MissingOption("db_name"))?;
        let username =
            non_blank(&self.db_username).ok_or(ConfigError::MissingOption("db_username"))?;
        let password = self
            .db_password
            .as_deref()
            .ok_or(ConfigError::MissingOption("db_password"))?;

        Ok(ConnectionTarget::Discrete {
            host,
            port,
            database,
            username,
            password,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.connection_target().map(|_| ())
    }

    pub fn accepts_self_signed_cert(&self) -> bool {
        self.has_self_signed_cert == SelfSignedCert::Yes
    }

    /// Copy safe to print: passwords, including one embedded in the URL, are masked.
    pub fn redacted(&self) -> ExporterConfig {
        let mut config = self.clone();

        config.db_password = config.db_password.map(|_| REDACTED.to_string());
        config.database_url = config.database_url.map(|raw| match Url::parse(&raw) {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some(REDACTED));
                }
                url.to_string()
            }
            Err(_) => REDACTED.to_string(),
        });

        config
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Layers defaults, then the optional TOML file, then `EVENTSINK_*` variables.
    pub fn load_config(path: Option<&Path>) -> Result<ExporterConfig> {
        let mut builder = RConfig::builder();

        // set defaults
        builder = builder
            .set_default("events_to_insert", "")?
            .set_default("has_self_signed_cert", SELF_SIGNED_CERT_DEFAULT)?
            .set_default("max_retries", DEFAULT_MAX_RETRIES as u64)?
            .set_default("retry_base_delay_ms", DEFAULT_RETRY_BASE_DELAY_MS)?
            .set_default("max_rows_per_batch", DEFAULT_MAX_ROWS_PER_BATCH as u64)?
            .set_default("max_concurrent_uploads", DEFAULT_MAX_CONCURRENT_UPLOADS as u64)?;

        if let Some(path) = path {
            debug!("Loading config file {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX));

        let config: ExporterConfig = builder
            .build()?
            .try_deserialize()
            .context("failed to parse config file")?;

        Ok(config)
    }
}
