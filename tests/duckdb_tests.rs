use duckdb::Connection;
use gps_postgis_import::file_load::{self, VehicleFile};
use gps_postgis_import::gps_load::observation_store::ObservationStore;
use gps_postgis_import::gps_load::postgis_store::PostgisStore;
use gps_postgis_import::gps_load::sql::{self, TableRef};
use gps_postgis_import::gps_load::KeyRange;
use gps_postgis_import::ImportError;
use std::fs;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

// Same shape as the PostGIS table minus the geometry column
fn local_store() -> PostgisStore {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE SEQUENCE obs_seq START 1;
        CREATE TABLE gpsdata (
            obsid BIGINT DEFAULT nextval('obs_seq') PRIMARY KEY,
            vehid INTEGER,
            obstimei BIGINT,
            obstime TIMESTAMPTZ,
            lat DOUBLE,
            lng DOUBLE,
            spd DOUBLE
        );",
    )
    .unwrap();
    PostgisStore::with_connection(conn, TableRef::local("main", "gpsdata"))
}

fn trace_file(dir: &TempDir, vehicle_id: u32, body: &str) -> VehicleFile {
    let file = VehicleFile::new(dir.path(), "veh", vehicle_id);
    fs::write(&file.path, format!("obstimei,lat,lng,spd\n{}", body)).unwrap();
    file
}

#[cfg(test)]
mod file_selection_tests {
    use super::*;

    #[test]
    fn test_vehicle_id_parsing() {
        assert_eq!(file_load::parse_vehicle_id("veh101.csv", "veh"), Some(101));
        assert_eq!(file_load::parse_vehicle_id("veh.csv", "veh"), None);
        assert_eq!(file_load::parse_vehicle_id("veh10a.csv", "veh"), None);
        assert_eq!(file_load::parse_vehicle_id("veh101.csv.bak", "veh"), None);
        assert_eq!(file_load::parse_vehicle_id("car7.csv", "veh"), None);
    }

    #[test]
    fn test_range_follows_naming_convention() {
        let dir = TempDir::new().unwrap();
        let files = file_load::vehicle_files_in_range(dir.path(), "veh", 101..=103);

        assert_eq!(files.len(), 3);
        assert_eq!(files[0].vehicle_id, 101);
        assert_eq!(files[2].path, dir.path().join("veh103.csv"));
    }

    #[test]
    fn test_discovery_orders_by_vehicle_number() {
        let dir = TempDir::new().unwrap();
        for name in ["veh120.csv", "veh9.csv", "veh101.csv", "notes.txt", "vehX.csv"] {
            fs::write(dir.path().join(name), "obstimei,lat,lng,spd\n").unwrap();
        }
        fs::create_dir(dir.path().join("veh5.csv")).unwrap();

        let files = file_load::discover_vehicle_files(dir.path(), "veh").unwrap();
        let ids: Vec<u32> = files.iter().map(|f| f.vehicle_id).collect();

        assert_eq!(ids, vec![9, 101, 120]);
    }

    #[test]
    fn test_discovery_in_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let result = file_load::discover_vehicle_files(&dir.path().join("absent"), "veh");
        assert!(matches!(result, Err(ImportError::Io { .. })));
    }
}

#[cfg(test)]
mod csv_inspection_tests {
    use super::*;

    #[test]
    fn test_valid_trace_counts_rows() {
        let mut temp_file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(temp_file, "obstimei,lat,lng,spd").unwrap();
        writeln!(temp_file, "1700000000,51.5,-0.1,12.3").unwrap();
        writeln!(temp_file, "1700000005,51.5001,-0.1002,11.9").unwrap();

        let summary = file_load::inspect_csv(temp_file.path()).unwrap();
        assert_eq!(summary.data_rows, 2);
    }

    #[test]
    fn test_fractional_epoch_is_rejected() {
        let mut temp_file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(temp_file, "obstimei,lat,lng,spd").unwrap();
        writeln!(temp_file, "1700000000,51.5,-0.1,12.3").unwrap();
        writeln!(temp_file, "1700000000.5,51.5,-0.1,12.3").unwrap();

        match file_load::inspect_csv(temp_file.path()) {
            Err(ImportError::InvalidCsv { line, reason, .. }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("not an integer"));
            }
            other => panic!("expected invalid csv, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_column_count_is_rejected() {
        let mut temp_file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(temp_file, "obstimei,lat,lng").unwrap();
        writeln!(temp_file, "1700000000,51.5,-0.1").unwrap();

        let result = file_load::inspect_csv(temp_file.path());
        assert!(matches!(result, Err(ImportError::InvalidCsv { line: 1, .. })));

        let mut short_row = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(short_row, "obstimei,lat,lng,spd").unwrap();
        writeln!(short_row, "1700000000,51.5,-0.1").unwrap();

        let result = file_load::inspect_csv(short_row.path());
        assert!(matches!(result, Err(ImportError::InvalidCsv { line: 2, .. })));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = file_load::inspect_csv(&dir.path().join("veh177.csv"));
        assert!(matches!(result, Err(ImportError::MissingFile(_))));
    }
}

#[cfg(test)]
mod duckdb_load_tests {
    use super::*;

    #[test]
    fn test_bulk_load_fills_source_columns_only() {
        let dir = TempDir::new().unwrap();
        let file = trace_file(&dir, 101, "1700000000,51.5,-0.1,12.3\n");
        let store = local_store();

        assert_eq!(store.max_key().unwrap(), 0);
        assert_eq!(store.bulk_load(&file).unwrap(), 1);
        assert_eq!(store.max_key().unwrap(), 1);

        let (obsid, vehid, obstimei, lat, lng, spd): (i64, Option<i32>, i64, f64, f64, f64) = store
            .conn()
            .query_row(
                "SELECT obsid, vehid, obstimei, lat, lng, spd FROM main.gpsdata",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .unwrap();

        assert_eq!(obsid, 1);
        assert_eq!(vehid, None);
        assert_eq!(obstimei, 1_700_000_000);
        assert_eq!((lat, lng, spd), (51.5, -0.1, 12.3));
    }

    #[test]
    fn test_consecutive_loads_take_adjacent_keys() {
        let dir = TempDir::new().unwrap();
        let first = trace_file(&dir, 101, "1,51.0,-0.1,1.0\n2,51.1,-0.1,2.0\n3,51.2,-0.1,3.0\n");
        let second = trace_file(&dir, 102, "4,52.0,-1.0,4.0\n5,52.1,-1.0,5.0\n");
        let store = local_store();

        let before = store.max_key().unwrap();
        let inserted = store.bulk_load(&first).unwrap();
        let first_keys = KeyRange::between_high_water_marks(before, store.max_key().unwrap());
        assert_eq!(first_keys.len(), inserted);

        let before = store.max_key().unwrap();
        let inserted = store.bulk_load(&second).unwrap();
        let second_keys = KeyRange::between_high_water_marks(before, store.max_key().unwrap());
        assert_eq!(second_keys.len(), inserted);

        assert_eq!(first_keys, KeyRange { start: 1, end: 4 });
        assert_eq!(second_keys, KeyRange { start: 4, end: 6 });
    }

    #[test]
    fn test_burnt_sequence_values_leave_batch_countable() {
        let dir = TempDir::new().unwrap();
        let file = trace_file(&dir, 101, "1,51.0,-0.1,1.0\n2,51.1,-0.1,2.0\n");
        let store = local_store();
        store
            .conn()
            .execute_batch("SELECT nextval('obs_seq') FROM range(9);")
            .unwrap();

        let before = store.max_key().unwrap();
        let inserted = store.bulk_load(&file).unwrap();
        let keys = KeyRange::between_high_water_marks(before, store.max_key().unwrap());

        assert_eq!(keys, KeyRange { start: 1, end: 12 });
        assert_eq!(keys.len(), 11);
        assert_eq!(store.count_keys(&keys).unwrap(), inserted);
    }

    #[test]
    fn test_timestamp_and_key_predicate_on_duckdb() {
        let dir = TempDir::new().unwrap();
        let first = trace_file(&dir, 101, "1700000000,51.5,-0.1,12.3\n1700000060,51.6,-0.2,9.0\n");
        let second = trace_file(&dir, 102, "1700000120,52.0,-1.0,4.0\n");
        let store = local_store();
        store.bulk_load(&first).unwrap();
        store.bulk_load(&second).unwrap();

        let batch = KeyRange { start: 1, end: 3 };
        let update = format!(
            "UPDATE {} SET vehid = 101, obstime = {} WHERE {};",
            store.table().duckdb_name(),
            sql::OBSTIME_EXPR,
            sql::in_key_range(&batch)
        );
        store.conn().execute_batch(&update).unwrap();

        let mut stmt = store
            .conn()
            .prepare(
                "SELECT obsid, vehid, CAST(epoch(obstime) AS BIGINT) \
                 FROM main.gpsdata ORDER BY obsid",
            )
            .unwrap();
        let rows: Vec<(i64, Option<i32>, Option<i64>)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap()
            .map(|row| row.unwrap())
            .collect();

        assert_eq!(
            rows,
            vec![
                (1, Some(101), Some(1_700_000_000)),
                (2, Some(101), Some(1_700_000_060)),
                (3, None, None),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_is_refused() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(OsStr::from_bytes(b"veh\xff101.csv"));
        fs::write(&path, "obstimei,lat,lng,spd\n1,51.0,-0.1,1.0\n").unwrap();
        let file = VehicleFile {
            vehicle_id: 101,
            path,
        };

        let store = local_store();
        let result = store.bulk_load(&file);
        assert!(matches!(result, Err(ImportError::Config(reason)) if reason.contains("UTF-8")));
        assert_eq!(store.max_key().unwrap(), 0);
    }

    #[test]
    fn test_enrichment_needs_attached_postgis() {
        let store = local_store();
        let result = store.enrich(101, &KeyRange { start: 1, end: 2 });
        assert!(matches!(result, Err(ImportError::Config(_))));
    }
}
