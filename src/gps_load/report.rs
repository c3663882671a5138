use std::path::PathBuf;

use serde::Serialize;

use crate::config::{FailurePolicy, KeyTracking};
use crate::file_load::VehicleFile;
use crate::gps_load::KeyRange;

/// What a successfully imported file produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub csv_rows: u64,
    pub inserted: u64,
    pub keys: KeyRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileStatus {
    Imported(BatchSummary),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub vehicle_id: u32,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

/// Per-file results of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub policy: FailurePolicy,
    pub key_tracking: KeyTracking,
    pub files: Vec<FileOutcome>,
    /// Set when the abort policy cut the run short
    pub aborted: bool,
}

impl ImportReport {
    pub fn new(policy: FailurePolicy, key_tracking: KeyTracking) -> Self {
        Self {
            policy,
            key_tracking,
            files: Vec::new(),
            aborted: false,
        }
    }

    pub fn record_success(&mut self, file: &VehicleFile, summary: BatchSummary) {
        self.files.push(FileOutcome {
            vehicle_id: file.vehicle_id,
            path: file.path.clone(),
            status: FileStatus::Imported(summary),
        });
    }

    pub fn record_failure(&mut self, file: &VehicleFile, error: String) {
        self.files.push(FileOutcome {
            vehicle_id: file.vehicle_id,
            path: file.path.clone(),
            status: FileStatus::Failed { error },
        });
    }

    pub fn rows_inserted(&self) -> u64 {
        self.successes().map(|s| s.inserted).sum()
    }

    pub fn files_imported(&self) -> usize {
        self.successes().count()
    }

    pub fn files_failed(&self) -> usize {
        self.files.len() - self.files_imported()
    }

    pub fn is_success(&self) -> bool {
        self.files_failed() == 0
    }

    fn successes(&self) -> impl Iterator<Item = &BatchSummary> {
        self.files.iter().filter_map(|outcome| match &outcome.status {
            FileStatus::Imported(summary) => Some(summary),
            FileStatus::Failed { .. } => None,
        })
    }
}
