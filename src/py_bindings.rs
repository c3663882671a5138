use std::path::PathBuf;

use pyo3::prelude::*;

use crate::config::{FileSelection, ImportConfig};
use crate::gps_load::importer::run_import;

/// Import vehicle trace files, returning (rows inserted, files failed)
#[pyfunction]
#[pyo3(signature = (
    postgis_uri,
    data_dir,
    first,
    last,
    schema_name = "public",
    table_name = "gpsdata"
))]
fn import_vehicle_files(
    postgis_uri: &str,
    data_dir: &str,
    first: u32,
    last: u32,
    schema_name: &str,
    table_name: &str,
) -> PyResult<(u64, usize)> {
    let config = ImportConfig {
        postgis_uri: postgis_uri.to_string(),
        schema: schema_name.to_string(),
        table: table_name.to_string(),
        data_dir: PathBuf::from(data_dir),
        selection: FileSelection::Range(first..=last),
        ..ImportConfig::default()
    };

    let report = run_import(&config)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(e.to_string()))?;
    Ok((report.rows_inserted(), report.files_failed()))
}

#[pymodule]
#[pyo3(name = "gps_postgis_import")]
fn gps_postgis_import(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(import_vehicle_files, m)?)?;
    Ok(())
}
