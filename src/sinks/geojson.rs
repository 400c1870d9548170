use super::DataSink;
use crate::record::Record;
use anyhow::Result;
use geojson::GeoJson;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes a single FeatureCollection, one feature per line.
pub struct GeoJsonSink {
    writer: BufWriter<File>,
    first_feature: bool,
}

impl GeoJsonSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "{{")?;
        writeln!(writer, "  \"type\": \"FeatureCollection\",")?;
        writeln!(writer, "  \"features\": [")?;

        Ok(Self {
            writer,
            first_feature: true,
        })
    }
}

impl DataSink for GeoJsonSink {
    fn add_record(&mut self, record: &Record) -> Result<()> {
        if !self.first_feature {
            writeln!(self.writer, ",")?;
        }
        self.first_feature = false;

        let geojson = GeoJson::Feature(record.to_feature());
        serde_json::to_writer(&mut self.writer, &geojson)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        writeln!(self.writer)?;
        writeln!(self.writer, "  ]")?;
        writeln!(self.writer, "}}")?;
        self.writer.flush()?;
        Ok(())
    }
}
