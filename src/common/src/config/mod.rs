mod config_loader;

pub use config_loader::{ConfigError, ConfigLoader, ConnectionTarget, ExporterConfig, SelfSignedCert};
