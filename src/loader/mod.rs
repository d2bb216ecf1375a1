//! Readers for the two input datasets.
//!
//! - [`json`] / [`tabular`]: the classification dataset, picked by file
//!   extension through [`ClassificationSource`].
//! - [`boundaries`]: the municipal boundary feature collection.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{DataQualityWarning, LoadError};
use crate::models::{
    ClassificationRecord, RiskLabel, FIELD_DROPOUT, FIELD_EFFICIENCY, FIELD_NAME, FIELD_RISK,
};
use crate::normalize::normalize_name;

pub mod boundaries;
pub mod json;
pub mod tabular;

/// Items read from a dataset plus the non-fatal problems found on the way.
#[derive(Debug)]
pub struct Loaded<T> {
    pub items: Vec<T>,
    pub warnings: Vec<DataQualityWarning>,
}

// Manual impl: a derive would require `T: Default`.
impl<T> Default for Loaded<T> {
    fn default() -> Self {
        Loaded {
            items: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

pub trait ClassificationSource {
    fn read(&self, path: &Path) -> Result<Loaded<ClassificationRecord>, LoadError>;
}

/// Pick a reader by extension: `.csv` is tabular, anything else is JSON records.
pub fn source_for(path: &Path) -> Box<dyn ClassificationSource> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        Box::new(tabular::CsvSource::new())
    } else {
        Box::new(json::JsonSource::new())
    }
}

/// Read the classification dataset at `path` with the matching reader.
pub fn load_classification(path: &Path) -> Result<Loaded<ClassificationRecord>, LoadError> {
    let loaded = source_for(path).read(path)?;
    tracing::info!(
        "loaded {} classification rows from {}",
        loaded.items.len(),
        path.display()
    );
    Ok(loaded)
}

/// Turn one row (already keyed by column name) into a record.
///
/// Shared by both readers, so a CSV cell and a JSON value go through the same
/// rules: the name is required, numeric cells may be numbers, numeric strings,
/// empty or null, and the risk label is optional.
pub(crate) fn parse_record(
    path: &Path,
    index: usize,
    row: &Map<String, Value>,
    warnings: &mut Vec<DataQualityWarning>,
) -> Result<ClassificationRecord, LoadError> {
    let raw_name = row
        .get(FIELD_NAME)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| LoadError::MissingField {
            path: path.to_path_buf(),
            kind: "record",
            index,
            field: FIELD_NAME.to_string(),
        })?;

    let dropout_rate = numeric_field(path, index, row, FIELD_DROPOUT)?;
    let terminal_efficiency = numeric_field(path, index, row, FIELD_EFFICIENCY)?;

    let risk = match row.get(FIELD_RISK) {
        Some(Value::String(s)) if !s.trim().is_empty() => match RiskLabel::parse(s) {
            Some(RiskLabel::NoData) => None,
            Some(label) => Some(label),
            None => {
                warnings.push(DataQualityWarning::UnknownRiskLabel {
                    name: raw_name.to_string(),
                    value: s.clone(),
                });
                None
            }
        },
        _ => None,
    };

    Ok(ClassificationRecord {
        name: normalize_name(raw_name),
        raw_name: raw_name.to_string(),
        dropout_rate,
        terminal_efficiency,
        risk,
    })
}

fn numeric_field(
    path: &Path,
    index: usize,
    row: &Map<String, Value>,
    field: &str,
) -> Result<Option<f64>, LoadError> {
    let not_numeric = |value: String| LoadError::NotNumeric {
        path: path.to_path_buf(),
        index,
        field: field.to_string(),
        value,
    };

    match row.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<f64>().map(Some).map_err(|_| not_numeric(s.to_string()))
        }
        Some(other) => Err(not_numeric(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_loaded_default_is_empty() {
        let records: Loaded<ClassificationRecord> = Loaded::default();
        assert!(records.items.is_empty() && records.warnings.is_empty());
        let features: Loaded<crate::models::GeoFeature> = Loaded::default();
        assert!(features.items.is_empty());
    }

    #[test]
    fn test_parse_record_normalizes_name() {
        let mut warnings = Vec::new();
        let rec = parse_record(
            Path::new("x.json"),
            0,
            &row(json!({
                "NOMBRE MUNICIPIO": " Tlajomulco de Zúñiga ",
                "DESERCION INTRACURRICULAR": 2.5,
                "RIESGO": "Riesgo Moderado",
                "EFICIENCIA TERMINAL": "88.1"
            })),
            &mut warnings,
        )
        .unwrap();
        assert_eq!(rec.name, "tlajomulco de zuniga");
        assert_eq!(rec.raw_name, "Tlajomulco de Zúñiga");
        assert_eq!(rec.dropout_rate, Some(2.5));
        assert_eq!(rec.terminal_efficiency, Some(88.1));
        assert_eq!(rec.risk, Some(RiskLabel::Moderate));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_values_are_allowed() {
        let mut warnings = Vec::new();
        let rec = parse_record(
            Path::new("x.json"),
            0,
            &row(json!({ "NOMBRE MUNICIPIO": "Tala", "DESERCION INTRACURRICULAR": null, "EFICIENCIA TERMINAL": "" })),
            &mut warnings,
        )
        .unwrap();
        assert_eq!(rec.dropout_rate, None);
        assert_eq!(rec.terminal_efficiency, None);
        assert_eq!(rec.risk, None);
    }

    #[test]
    fn test_unknown_risk_label_warns() {
        let mut warnings = Vec::new();
        let rec = parse_record(
            Path::new("x.json"),
            3,
            &row(json!({ "NOMBRE MUNICIPIO": "Tala", "RIESGO": "Medio" })),
            &mut warnings,
        )
        .unwrap();
        assert_eq!(rec.risk, None);
        assert_eq!(
            warnings,
            vec![DataQualityWarning::UnknownRiskLabel {
                name: "Tala".to_string(),
                value: "Medio".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_name_is_fatal() {
        let mut warnings = Vec::new();
        let err = parse_record(
            Path::new("x.json"),
            7,
            &row(json!({ "RIESGO": "Alto Riesgo" })),
            &mut warnings,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::MissingField { index: 7, .. }));
    }

    #[test]
    fn test_non_numeric_is_fatal() {
        let mut warnings = Vec::new();
        let err = parse_record(
            Path::new("x.json"),
            0,
            &row(json!({ "NOMBRE MUNICIPIO": "Tala", "DESERCION INTRACURRICULAR": "alto" })),
            &mut warnings,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::NotNumeric { .. }));
    }
}
