pub mod config;
pub mod error;
pub mod file_load;
pub mod gps_load;

#[cfg(feature = "python")]
mod py_bindings;

pub use config::{FailurePolicy, FileSelection, ImportConfig, KeyTracking};
pub use error::ImportError;
pub use gps_load::importer::{run_import, Importer};
pub use gps_load::report::ImportReport;
