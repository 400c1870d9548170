use anyhow::Result;

use crate::record::Record;

pub mod csv;
pub mod geojson;
pub mod geojsonl;

pub use self::csv::CsvSink;
pub use self::geojson::GeoJsonSink;
pub use self::geojsonl::GeoJsonlSink;

/// Destination for matched records.
pub trait DataSink: Send {
    fn add_record(&mut self, record: &Record) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}
