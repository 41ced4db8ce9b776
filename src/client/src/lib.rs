pub mod bootstrap;
pub mod exporters;
pub mod jobs;

#[cfg(test)]
pub(crate) mod testing;

pub use bootstrap::{setup, ExportState, SetupError};
pub use exporters::manager::EventExporter;
