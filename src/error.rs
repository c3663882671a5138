use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::gps_load::KeyRange;

/// Everything that can go wrong while importing vehicle trace files
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("DuckDB error: {0}")]
    Duckdb(#[from] duckdb::Error),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Vehicle file not found: '{0}'")]
    MissingFile(PathBuf),

    #[error("Invalid CSV '{path}' at line {line}: {reason}")]
    InvalidCsv {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Vehicle {vehicle_id}: {inserted} rows inserted but key range {range} holds {found}")]
    KeyRangeMismatch {
        vehicle_id: u32,
        inserted: u64,
        found: u64,
        range: KeyRange,
    },

    #[error("Vehicle {vehicle_id}: only {enriched} of {inserted} rows in {range} were enriched")]
    EnrichmentIncomplete {
        vehicle_id: u32,
        inserted: u64,
        enriched: u64,
        range: KeyRange,
    },
}

impl ImportError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = ImportError> = std::result::Result<T, E>;
