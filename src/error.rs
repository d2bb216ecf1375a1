use std::path::PathBuf;

use thiserror::Error;

/// Fatal failure while reading one of the two input datasets.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} is not a valid {expected}", path.display())]
    Malformed { path: PathBuf, expected: String },

    #[error("{}: {kind} #{index} is missing field `{field}`", path.display())]
    MissingField {
        path: PathBuf,
        kind: &'static str,
        index: usize,
        field: String,
    },

    #[error("{}: record #{index} has a non-numeric `{field}` value {value:?}", path.display())]
    NotNumeric {
        path: PathBuf,
        index: usize,
        field: String,
        value: String,
    },
}

/// Non-fatal data problem, resolved by dropping a feature or writing sentinels.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataQualityWarning {
    #[error("feature #{index} has no coordinate payload and was dropped")]
    MissingGeometry { index: usize },

    #[error("geometry of `{municipality}` is malformed; centroid falls back to the default center")]
    MalformedCoordinates { municipality: String },

    #[error("no classification row matches `{municipality}`")]
    NoMatch { municipality: String },

    #[error("duplicate classification row for `{name}` at #{index}; keeping the first one")]
    DuplicateRecord { name: String, index: usize },

    #[error("unknown risk label {value:?} for `{name}`")]
    UnknownRiskLabel { name: String, value: String },
}

impl DataQualityWarning {
    /// Emit the warning through `tracing`. Dropped features are routine in
    /// boundary files, so they only show at debug level.
    pub fn log(&self) {
        match self {
            DataQualityWarning::MissingGeometry { .. } => tracing::debug!("{self}"),
            _ => tracing::warn!("{self}"),
        }
    }
}
