use crate::error::Result;
use crate::file_load::VehicleFile;
use crate::gps_load::KeyRange;

/// Storage the importer writes observations into.
/// The PostGIS store is the real one; anything offering bulk load, a keyed update,
/// point construction and epoch conversion can stand in.
pub trait ObservationStore {
    /// Largest observation key in the table, 0 when it is empty
    fn max_key(&self) -> Result<i64>;

    /// Append every row of the file, filling only obstimei, lat, lng and spd.
    /// Returns the number of rows inserted.
    fn bulk_load(&self, file: &VehicleFile) -> Result<u64>;

    /// Rows whose key falls in the range
    fn count_keys(&self, range: &KeyRange) -> Result<u64>;

    /// Set vehid, latlng and obstime on every row in the range
    fn enrich(&self, vehicle_id: u32, range: &KeyRange) -> Result<()>;

    /// Rows in the range carrying this vehid with latlng and obstime filled in
    fn count_enriched(&self, vehicle_id: u32, range: &KeyRange) -> Result<u64>;
}
