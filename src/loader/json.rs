use std::path::Path;

use serde_json::Value;

use crate::error::LoadError;
use crate::models::ClassificationRecord;

use super::{parse_record, ClassificationSource, Loaded};

/// Classification rows stored as a JSON array of objects, one per
/// municipality (pandas `orient="records"`).
pub struct JsonSource;

impl JsonSource {
    pub fn new() -> Self {
        Self
    }
}

impl ClassificationSource for JsonSource {
    fn read(&self, path: &Path) -> Result<Loaded<ClassificationRecord>, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let json: Value = serde_json::from_str(&content).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let malformed = || LoadError::Malformed {
            path: path.to_path_buf(),
            expected: "JSON array of classification records".to_string(),
        };
        let rows = json.as_array().ok_or_else(malformed)?;

        let mut loaded = Loaded::default();
        for (index, row) in rows.iter().enumerate() {
            let row = row.as_object().ok_or_else(malformed)?;
            let record = parse_record(path, index, row, &mut loaded.warnings)?;
            loaded.items.push(record);
        }
        Ok(loaded)
    }
}
