use std::fs;

use duckdb::Connection;
use tracing::{debug, info};

use crate::error::{ImportError, Result};
use crate::file_load::VehicleFile;
use crate::gps_load::observation_store::ObservationStore;
use crate::gps_load::sql::{self, TableRef};
use crate::gps_load::KeyRange;

/// Observation table in PostGIS, driven through an in-memory DuckDB connection.
/// Trace files are read by DuckDB on this machine, so the database server never needs
/// access to the data directory. The connection closes when the store is dropped.
pub struct PostgisStore {
    conn: Connection,
    table: TableRef,
}

impl PostgisStore {
    /// Open DuckDB, load the postgres extension and attach the target database
    pub fn connect(postgis_uri: &str, schema: &str, table: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        // Geometry and timestamps are computed by PostGIS itself, so spatial isn't needed here
        conn.execute_batch("INSTALL postgres; LOAD postgres;")?;
        conn.execute_batch(&sql::attach(postgis_uri))?;
        info!("Attached PostGIS database as {}", sql::ATTACHED_DB);

        Ok(Self {
            conn,
            table: TableRef::attached(schema, table),
        })
    }

    /// Wrap an existing connection. Bulk loading and key reads work against any
    /// DuckDB table; enrichment needs the attached PostGIS database.
    pub fn with_connection(conn: Connection, table: TableRef) -> Self {
        Self { conn, table }
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Create the postgis extension, schema and observation table if missing
    pub fn ensure_table(&self) -> Result<()> {
        self.conn
            .execute_batch(&sql::remote_execute(&sql::create_table(&self.table)))?;
        // DuckDB caches the attached catalog, so drop it to see the new table
        self.conn.execute_batch("CALL pg_clear_cache();")?;
        info!("Table {} is ready", self.table.schema_qualified());
        Ok(())
    }

    fn require_attached(&self) -> Result<()> {
        if self.table.catalog.is_none() {
            return Err(ImportError::Config(format!(
                "table {} is not in an attached PostGIS database",
                self.table.duckdb_name()
            )));
        }
        Ok(())
    }
}

impl ObservationStore for PostgisStore {
    fn max_key(&self) -> Result<i64> {
        let max = self
            .conn
            .query_row(&sql::max_key(&self.table), [], |row| row.get::<_, i64>(0))?;
        Ok(max)
    }

    fn bulk_load(&self, file: &VehicleFile) -> Result<u64> {
        // Absolute path, the same file whatever DuckDB's working directory is
        let absolute =
            fs::canonicalize(&file.path).map_err(|e| ImportError::io(&file.path, e))?;
        // read_csv takes the path as SQL text, a lossy conversion would name another file
        let path = absolute.to_str().ok_or_else(|| {
            ImportError::Config(format!("path '{}' is not valid UTF-8", absolute.display()))
        })?;
        let query = sql::bulk_load(&self.table, path);
        debug!("Bulk load query: {}", query);

        let inserted = self.conn.execute(&query, [])?;
        Ok(inserted as u64)
    }

    fn count_keys(&self, range: &KeyRange) -> Result<u64> {
        let query = sql::count_keys(&self.table, range);
        let count = self.conn.query_row(&query, [], |row| row.get::<_, i64>(0))?;
        Ok(count.max(0) as u64)
    }

    fn enrich(&self, vehicle_id: u32, range: &KeyRange) -> Result<()> {
        self.require_attached()?;
        let update = sql::enrich(&self.table, vehicle_id, range);
        debug!("Enrich query: {}", update);
        self.conn.execute_batch(&sql::remote_execute(&update))?;
        Ok(())
    }

    fn count_enriched(&self, vehicle_id: u32, range: &KeyRange) -> Result<u64> {
        self.require_attached()?;
        let query = sql::remote_query(&sql::count_enriched(&self.table, vehicle_id, range));
        let enriched = self.conn.query_row(&query, [], |row| row.get::<_, i64>(0))?;
        Ok(enriched.max(0) as u64)
    }
}
