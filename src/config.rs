use std::ops::RangeInclusive;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::{ImportError, Result};

pub const DEFAULT_POSTGIS_URI: &str = "dbname=gisruk";
pub const DEFAULT_SCHEMA: &str = "public";
pub const DEFAULT_TABLE: &str = "gpsdata";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_FILE_PREFIX: &str = "veh";
pub const DEFAULT_FIRST_VEHICLE: u32 = 101;
pub const DEFAULT_LAST_VEHICLE: u32 = 177;

/// Which vehicle files a run picks up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelection {
    /// `<prefix><N>.csv` for every N in the range, whether or not it exists
    Range(RangeInclusive<u32>),
    /// Every `<prefix><N>.csv` present in the data directory
    Discover,
}

/// What to do once a file fails to import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[default]
    Abort,
    Continue,
}

/// How the keys of a freshly loaded batch are worked out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyTracking {
    /// Read the table's maximum key before and after each load
    #[default]
    Captured,
    /// Assume keys are contiguous from `first_id`, carried between files
    Assumed,
}

#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub postgis_uri: String,
    pub schema: String,
    pub table: String,
    pub data_dir: PathBuf,
    pub file_prefix: String,
    pub selection: FileSelection,
    pub on_error: FailurePolicy,
    pub key_tracking: KeyTracking,
    pub first_id: i64,
    pub create_table: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            postgis_uri: DEFAULT_POSTGIS_URI.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
            table: DEFAULT_TABLE.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            selection: FileSelection::Range(DEFAULT_FIRST_VEHICLE..=DEFAULT_LAST_VEHICLE),
            on_error: FailurePolicy::default(),
            key_tracking: KeyTracking::default(),
            first_id: 1,
            create_table: false,
        }
    }
}

impl ImportConfig {
    /// Reject settings that would only fail later, once connected
    pub fn validate(&self) -> Result<()> {
        if let FileSelection::Range(range) = &self.selection {
            if range.start() > range.end() {
                return Err(ImportError::Config(format!(
                    "first vehicle {} is after last vehicle {}",
                    range.start(),
                    range.end()
                )));
            }
        }

        for (name, value) in [
            ("schema", &self.schema),
            ("table", &self.table),
            ("file prefix", &self.file_prefix),
            ("postgis uri", &self.postgis_uri),
        ] {
            if value.trim().is_empty() {
                return Err(ImportError::Config(format!("{} must not be empty", name)));
            }
        }

        if self.first_id < 1 {
            return Err(ImportError::Config(format!(
                "first id must be at least 1, got {}",
                self.first_id
            )));
        }

        Ok(())
    }
}
