use tracing::{error, info, info_span, warn};

use crate::config::{FailurePolicy, FileSelection, ImportConfig, KeyTracking};
use crate::error::{ImportError, Result};
use crate::file_load::{self, VehicleFile};
use crate::gps_load::observation_store::ObservationStore;
use crate::gps_load::postgis_store::PostgisStore;
use crate::gps_load::report::{BatchSummary, ImportReport};
use crate::gps_load::KeyRange;

/// Loads trace files one at a time and enriches each batch straight after its load
pub struct Importer<S> {
    store: S,
    policy: FailurePolicy,
    key_tracking: KeyTracking,
    // Next key assumed free, only used for KeyTracking::Assumed
    next_first_id: i64,
}

impl<S: ObservationStore> Importer<S> {
    pub fn new(store: S, policy: FailurePolicy, key_tracking: KeyTracking, first_id: i64) -> Self {
        Self {
            store,
            policy,
            key_tracking,
            next_first_id: first_id,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Import every file in order, recording an outcome per file
    pub fn run(&mut self, files: &[VehicleFile]) -> ImportReport {
        let mut report = ImportReport::new(self.policy, self.key_tracking);

        for file in files {
            let span = info_span!("vehicle", vehid = file.vehicle_id);
            let _guard = span.enter();

            match self.import_file(file) {
                Ok(summary) => {
                    info!(
                        "Imported {} rows from {} into keys {}",
                        summary.inserted,
                        file.path.display(),
                        summary.keys
                    );
                    report.record_success(file, summary);
                }
                Err(e) => {
                    error!("Failed to import {}: {}", file.path.display(), e);
                    report.record_failure(file, e.to_string());
                    if self.policy == FailurePolicy::Abort {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        info!(
            "Import finished: {} files imported, {} failed, {} rows inserted",
            report.files_imported(),
            report.files_failed(),
            report.rows_inserted()
        );
        report
    }

    /// Load one file, then give its rows their vehicle id, point and timestamp
    pub fn import_file(&mut self, file: &VehicleFile) -> Result<BatchSummary> {
        let csv = file_load::inspect_csv(&file.path)?;

        let before = match self.key_tracking {
            KeyTracking::Captured => Some(self.store.max_key()?),
            KeyTracking::Assumed => None,
        };

        let inserted = self.store.bulk_load(file)?;
        if inserted != csv.data_rows {
            warn!(
                "{} has {} data rows but {} were inserted",
                file.path.display(),
                csv.data_rows,
                inserted
            );
        }

        let keys = match before {
            Some(before) => {
                let after = self.store.max_key()?;
                let keys = KeyRange::between_high_water_marks(before, after);
                // Sequences skip values, so count the rows rather than the span
                let found = self.store.count_keys(&keys)?;
                if found != inserted {
                    return Err(ImportError::KeyRangeMismatch {
                        vehicle_id: file.vehicle_id,
                        inserted,
                        found,
                        range: keys,
                    });
                }
                keys
            }
            None => {
                let keys = KeyRange::starting_at(self.next_first_id, inserted);
                self.next_first_id = keys.end;
                keys
            }
        };

        if inserted > 0 {
            self.store.enrich(file.vehicle_id, &keys)?;

            let enriched = self.store.count_enriched(file.vehicle_id, &keys)?;
            if enriched != inserted {
                return Err(ImportError::EnrichmentIncomplete {
                    vehicle_id: file.vehicle_id,
                    inserted,
                    enriched,
                    range: keys,
                });
            }
        }

        Ok(BatchSummary {
            csv_rows: csv.data_rows,
            inserted,
            keys,
        })
    }
}

/// Resolve the files a config selects
pub fn select_files(config: &ImportConfig) -> Result<Vec<VehicleFile>> {
    match &config.selection {
        FileSelection::Range(range) => Ok(file_load::vehicle_files_in_range(
            &config.data_dir,
            &config.file_prefix,
            range.clone(),
        )),
        FileSelection::Discover => {
            let files = file_load::discover_vehicle_files(&config.data_dir, &config.file_prefix)?;
            info!(
                "Discovered {} vehicle files in {}",
                files.len(),
                config.data_dir.display()
            );
            Ok(files)
        }
    }
}

/// Run a whole import against PostGIS. Errors here are setup failures;
/// per-file failures end up in the report.
pub fn run_import(config: &ImportConfig) -> Result<ImportReport> {
    config.validate()?;
    let files = select_files(config)?;

    let store = PostgisStore::connect(&config.postgis_uri, &config.schema, &config.table)?;
    if config.create_table {
        store.ensure_table()?;
    }

    info!(
        "Importing {} files into {} ({:?} keys, {:?} on error)",
        files.len(),
        store.table().schema_qualified(),
        config.key_tracking,
        config.on_error
    );

    let mut importer = Importer::new(store, config.on_error, config.key_tracking, config.first_id);
    Ok(importer.run(&files))
}
