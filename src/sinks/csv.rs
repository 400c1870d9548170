use super::DataSink;
use crate::record::Record;
use anyhow::Result;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Attribute table as CSV. The header comes from the first record's fields;
/// later records are written in that column order, with blanks for missing
/// fields.
pub struct CsvSink {
    writer: ::csv::Writer<Box<dyn Write + Send>>,
    header: Option<Vec<String>>,
}

impl CsvSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(Box::new(file)))
    }

    pub fn stdout() -> Result<Self> {
        Ok(Self::from_writer(Box::new(std::io::stdout())))
    }

    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: ::csv::Writer::from_writer(writer),
            header: None,
        }
    }
}

impl DataSink for CsvSink {
    fn add_record(&mut self, record: &Record) -> Result<()> {
        if self.header.is_none() {
            let names: Vec<String> = record.attributes().keys().cloned().collect();
            self.writer.write_record(&names)?;
            self.header = Some(names);
        }

        let header = self.header.as_deref().unwrap_or_default();
        let row = header
            .iter()
            .map(|field| record.get(field).map(|v| v.to_string()).unwrap_or_default());
        self.writer.write_record(row)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;
    use tempfile::NamedTempFile;

    fn write_all(records: &[Record]) -> String {
        let temp_file = NamedTempFile::with_suffix(".csv").unwrap();
        let mut sink = CsvSink::new(temp_file.path()).unwrap();
        for record in records {
            sink.add_record(record).unwrap();
        }
        sink.finish().unwrap();
        std::fs::read_to_string(temp_file.path()).unwrap()
    }

    #[test]
    fn test_writes_header_then_rows() {
        let mut cadiz = Record::new();
        cadiz.insert("nombre", "Cadiz");
        cadiz.insert("poblacion", 1245960.0);
        let mut malaga = Record::new();
        malaga.insert("nombre", "Malaga, capital");
        malaga.insert("poblacion", Value::Null);

        let content = write_all(&[cadiz, malaga]);
        assert_eq!(
            content,
            "nombre,poblacion\nCadiz,1245960\n\"Malaga, capital\",\n"
        );
    }

    #[test]
    fn test_later_records_follow_first_header() {
        let first: Record = [("a", "1"), ("b", "2")].into_iter().collect();
        let second: Record = [("b", "3"), ("c", "4")].into_iter().collect();
        let content = write_all(&[first, second]);
        assert_eq!(content, "a,b\n1,2\n,3\n");
    }

    #[test]
    fn test_nothing_written_without_records() {
        assert_eq!(write_all(&[]), "");
    }
}
