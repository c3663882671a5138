// SQL text for the import. Statements run through DuckDB; the ones PostGIS has to
// evaluate are wrapped in postgres_execute / postgres_query for the attached database.

use crate::gps_load::KeyRange;

/// WGS84 lon/lat
pub const SRID: i32 = 4326;

/// Name the PostGIS database is attached under in DuckDB
pub const ATTACHED_DB: &str = "gps_db";

/// Columns a trace file fills, in file order
pub const SOURCE_COLUMNS: [&str; 4] = ["obstimei", "lat", "lng", "spd"];

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Observation table, optionally inside an attached catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub catalog: Option<String>,
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn attached(schema: &str, table: &str) -> Self {
        Self {
            catalog: Some(ATTACHED_DB.to_string()),
            schema: schema.to_string(),
            table: table.to_string(),
        }
    }

    pub fn local(schema: &str, table: &str) -> Self {
        Self {
            catalog: None,
            schema: schema.to_string(),
            table: table.to_string(),
        }
    }

    /// Name as DuckDB resolves it
    pub fn duckdb_name(&self) -> String {
        match &self.catalog {
            Some(catalog) => format!("{}.{}", catalog, self.schema_qualified()),
            None => self.schema_qualified(),
        }
    }

    /// Name as PostgreSQL resolves it
    pub fn schema_qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

pub fn attach(postgis_uri: &str) -> String {
    format!(
        "ATTACH {} AS {} (TYPE POSTGRES);",
        quote_literal(postgis_uri),
        ATTACHED_DB
    )
}

/// Run a statement inside the attached PostgreSQL database
pub fn remote_execute(statement: &str) -> String {
    format!(
        "CALL postgres_execute({}, {});",
        quote_literal(ATTACHED_DB),
        quote_literal(statement)
    )
}

/// Select from a query evaluated by the attached PostgreSQL database
pub fn remote_query(query: &str) -> String {
    format!(
        "SELECT * FROM postgres_query({}, {});",
        quote_literal(ATTACHED_DB),
        quote_literal(query)
    )
}

pub fn bulk_load(table: &TableRef, csv_path: &str) -> String {
    let columns = SOURCE_COLUMNS.join(", ");
    format!(
        "INSERT INTO {} ({}) SELECT {} FROM read_csv({}, header = true, delim = ',', \
         columns = {{'obstimei': 'BIGINT', 'lat': 'DOUBLE', 'lng': 'DOUBLE', 'spd': 'DOUBLE'}});",
        table.duckdb_name(),
        columns,
        columns,
        quote_literal(csv_path)
    )
}

/// `obstime` derived from the epoch seconds column
pub const OBSTIME_EXPR: &str = "to_timestamp(obstimei)";

pub fn in_key_range(range: &KeyRange) -> String {
    format!("obsid >= {} AND obsid < {}", range.start, range.end)
}

// Aggregates over an attached table go to PostgreSQL as a whole, DuckDB's
// postgres scanner would otherwise pull every key across to compute them
fn aggregate(table: &TableRef, select: &str, filter: Option<String>) -> String {
    let name = match table.catalog {
        Some(_) => table.schema_qualified(),
        None => table.duckdb_name(),
    };
    let query = match filter {
        Some(filter) => format!("SELECT {} FROM {} WHERE {}", select, name, filter),
        None => format!("SELECT {} FROM {}", select, name),
    };
    match table.catalog {
        Some(_) => remote_query(&query),
        None => format!("{};", query),
    }
}

pub fn max_key(table: &TableRef) -> String {
    aggregate(table, "CAST(COALESCE(MAX(obsid), 0) AS BIGINT)", None)
}

/// Rows present in the range, however sparse its keys
pub fn count_keys(table: &TableRef, range: &KeyRange) -> String {
    aggregate(table, "CAST(count(*) AS BIGINT)", Some(in_key_range(range)))
}

/// PostgreSQL UPDATE deriving vehid, latlng and obstime for one batch
pub fn enrich(table: &TableRef, vehicle_id: u32, range: &KeyRange) -> String {
    format!(
        "UPDATE {} SET vehid = {}, latlng = ST_SetSRID(ST_MakePoint(lng, lat), {}), \
         obstime = {} WHERE {};",
        table.schema_qualified(),
        vehicle_id,
        SRID,
        OBSTIME_EXPR,
        in_key_range(range)
    )
}

pub fn count_enriched(table: &TableRef, vehicle_id: u32, range: &KeyRange) -> String {
    format!(
        "SELECT count(*)::bigint AS enriched FROM {} WHERE vehid = {} \
         AND latlng IS NOT NULL AND obstime IS NOT NULL AND {}",
        table.schema_qualified(),
        vehicle_id,
        in_key_range(range)
    )
}

/// PostgreSQL statements bootstrapping the observation table
pub fn create_table(table: &TableRef) -> String {
    format!(
        "CREATE EXTENSION IF NOT EXISTS postgis;
        CREATE SCHEMA IF NOT EXISTS {};
        CREATE TABLE IF NOT EXISTS {} (
            obsid serial PRIMARY KEY,
            vehid integer,
            obstimei bigint,
            obstime timestamptz,
            lat double precision,
            lng double precision,
            spd double precision,
            latlng geometry(Point, {})
        );",
        quote_ident(&table.schema),
        table.schema_qualified(),
        SRID
    )
}
