use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use gps_postgis_import::config::{
    DEFAULT_DATA_DIR, DEFAULT_FILE_PREFIX, DEFAULT_FIRST_VEHICLE, DEFAULT_LAST_VEHICLE,
    DEFAULT_POSTGIS_URI, DEFAULT_SCHEMA, DEFAULT_TABLE,
};
use gps_postgis_import::{run_import, FailurePolicy, FileSelection, ImportConfig, KeyTracking};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gps-postgis-import")]
#[command(about = "Bulk import vehicle GPS trace CSV files into PostGIS", long_about = None)]
struct Cli {
    /// libpq connection string for the PostGIS database
    #[arg(long, env = "GPS_IMPORT_POSTGIS_URI", default_value = DEFAULT_POSTGIS_URI)]
    postgis_uri: String,
    #[arg(long, default_value = DEFAULT_SCHEMA)]
    schema: String,
    #[arg(long, default_value = DEFAULT_TABLE)]
    table: String,
    /// Directory holding the <prefix><N>.csv trace files
    #[arg(long, env = "GPS_IMPORT_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    #[arg(long, default_value = DEFAULT_FILE_PREFIX)]
    prefix: String,
    /// First vehicle number to import
    #[arg(long, default_value_t = DEFAULT_FIRST_VEHICLE, conflicts_with = "discover")]
    first: u32,
    /// Last vehicle number to import, inclusive
    #[arg(long, default_value_t = DEFAULT_LAST_VEHICLE, conflicts_with = "discover")]
    last: u32,
    /// Import every trace file found in the data directory instead of a range
    #[arg(long)]
    discover: bool,
    #[arg(long, value_enum, default_value_t = FailurePolicy::Abort)]
    on_error: FailurePolicy,
    #[arg(long, value_enum, default_value_t = KeyTracking::Captured)]
    key_tracking: KeyTracking,
    /// Key of the first inserted row when keys are assumed
    #[arg(long, default_value_t = 1)]
    first_id: i64,
    /// Create the postgis extension, schema and table if they don't exist
    #[arg(long)]
    create_table: bool,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn into_config(self) -> ImportConfig {
        let selection = if self.discover {
            FileSelection::Discover
        } else {
            FileSelection::Range(self.first..=self.last)
        };

        ImportConfig {
            postgis_uri: self.postgis_uri,
            schema: self.schema,
            table: self.table,
            data_dir: self.data_dir,
            file_prefix: self.prefix,
            selection,
            on_error: self.on_error,
            key_tracking: self.key_tracking,
            first_id: self.first_id,
            create_table: self.create_table,
        }
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;
    let config = cli.into_config();

    let report = run_import(&config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} files imported, {} failed, {} rows inserted{}",
            report.files_imported(),
            report.files_failed(),
            report.rows_inserted(),
            if report.aborted { " (aborted)" } else { "" }
        );
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
