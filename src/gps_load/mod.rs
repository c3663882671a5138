use std::fmt;

use serde::Serialize;

pub mod importer;
pub mod observation_store;
pub mod postgis_store;
pub mod report;
pub mod sql;

/// Half-open range of observation keys, `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyRange {
    pub start: i64,
    pub end: i64,
}

impl KeyRange {
    /// `count` keys from `first_id` onwards
    pub fn starting_at(first_id: i64, count: u64) -> Self {
        Self {
            start: first_id,
            end: first_id + count as i64,
        }
    }

    /// Keys handed out between two readings of the table's maximum key.
    /// May be wider than the batch when the sequence skipped values.
    pub fn between_high_water_marks(before: i64, after: i64) -> Self {
        Self {
            start: before + 1,
            end: after.max(before) + 1,
        }
    }

    pub fn len(&self) -> u64 {
        (self.end - self.start).max(0) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
