use super::DataSink;
use crate::record::Record;
use anyhow::Result;
use geojson::GeoJson;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One GeoJSON feature per line.
pub struct GeoJsonlSink {
    writer: BufWriter<Box<dyn Write + Send>>,
}

impl GeoJsonlSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(Box::new(file)))
    }

    pub fn stdout() -> Result<Self> {
        Ok(Self::from_writer(Box::new(std::io::stdout())))
    }

    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }
}

impl DataSink for GeoJsonlSink {
    fn add_record(&mut self, record: &Record) -> Result<()> {
        let geojson = GeoJson::Feature(record.to_feature());
        serde_json::to_writer(&mut self.writer, &geojson)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
