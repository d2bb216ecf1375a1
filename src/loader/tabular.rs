use std::path::Path;

use serde_json::{Map, Value};

use crate::error::LoadError;
use crate::models::ClassificationRecord;

use super::{parse_record, ClassificationSource, Loaded};

/// Classification rows exported as CSV with a header row, the format the
/// JSON dataset is usually converted from.
pub struct CsvSource;

impl CsvSource {
    pub fn new() -> Self {
        Self
    }
}

impl ClassificationSource for CsvSource {
    fn read(&self, path: &Path) -> Result<Loaded<ClassificationRecord>, LoadError> {
        let csv_err = |source: csv::Error| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_path(path)
            .map_err(csv_err)?;
        let headers = reader.headers().map_err(csv_err)?.clone();

        let mut loaded = Loaded::default();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(csv_err)?;
            let row: Map<String, Value> = headers
                .iter()
                .zip(record.iter())
                .map(|(h, cell)| (h.to_string(), Value::String(cell.to_string())))
                .collect();
            let record = parse_record(path, index, &row, &mut loaded.warnings)?;
            loaded.items.push(record);
        }
        Ok(loaded)
    }
}
