use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::geometry::Shape;

/// Column names of the classification dataset.
pub const FIELD_NAME: &str = "NOMBRE MUNICIPIO";
pub const FIELD_DROPOUT: &str = "DESERCION INTRACURRICULAR";
pub const FIELD_RISK: &str = "RIESGO";
pub const FIELD_EFFICIENCY: &str = "EFICIENCIA TERMINAL";

/// Property names read from boundary features.
pub const PROP_REGION: &str = "NAME_1";
pub const PROP_MUNICIPALITY: &str = "NAME_2";

/// Property names written onto boundary features.
pub const PROP_DROPOUT: &str = "DESERCION";
pub const PROP_RISK: &str = "RIESGO";
pub const PROP_EFFICIENCY: &str = "EFICIENCIA";
pub const PROP_CENTROID: &str = "centroide";

pub const NO_DATA: &str = "N/D";

/// One row of the classification dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationRecord {
    /// Normalized join key.
    pub name: String,
    /// Name as written in the dataset, trimmed.
    pub raw_name: String,
    pub dropout_rate: Option<f64>,
    pub terminal_efficiency: Option<f64>,
    pub risk: Option<RiskLabel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLabel {
    #[serde(rename = "Bajo Riesgo")]
    Low,
    #[serde(rename = "Riesgo Moderado")]
    Moderate,
    #[serde(rename = "Alto Riesgo")]
    High,
    #[serde(rename = "Sin datos")]
    NoData,
}

impl RiskLabel {
    pub const ALL: [RiskLabel; 4] = [
        RiskLabel::Low,
        RiskLabel::Moderate,
        RiskLabel::High,
        RiskLabel::NoData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Low => "Bajo Riesgo",
            RiskLabel::Moderate => "Riesgo Moderado",
            RiskLabel::High => "Alto Riesgo",
            RiskLabel::NoData => "Sin datos",
        }
    }

    /// Parse a dataset label, ignoring accents, case and outer whitespace.
    /// `"Sin datos"` is accepted and maps to [`RiskLabel::NoData`].
    pub fn parse(raw: &str) -> Option<RiskLabel> {
        let key = crate::normalize::normalize_name(raw);
        RiskLabel::ALL
            .into_iter()
            .find(|label| crate::normalize::normalize_name(label.as_str()) == key)
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A derived percentage, or the `"N/D"` sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Value(f64),
    NoData,
}

impl Metric {
    /// Round to two decimals; a missing input becomes `NoData`.
    pub fn rounded(value: Option<f64>) -> Metric {
        match value {
            Some(v) if v.is_finite() => Metric::Value((v * 100.0).round() / 100.0),
            _ => Metric::NoData,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(*v),
            Metric::NoData => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Metric::Value(v) => json!(v),
            Metric::NoData => json!(NO_DATA),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{:.2}", v),
            Metric::NoData => write!(f, "{}", NO_DATA),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Value(v) => serializer.serialize_f64(*v),
            Metric::NoData => serializer.serialize_str(NO_DATA),
        }
    }
}

/// Derived fields attached to a boundary feature by the enricher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enrichment {
    pub dropout: Metric,
    pub efficiency: Metric,
    pub risk: RiskLabel,
    /// `[lat, lon]`
    pub centroid: [f64; 2],
    pub matched: bool,
}

impl Enrichment {
    /// Sentinel values for a feature without a classification row.
    pub fn no_data(centroid: [f64; 2]) -> Self {
        Enrichment {
            dropout: Metric::NoData,
            efficiency: Metric::NoData,
            risk: RiskLabel::NoData,
            centroid,
            matched: false,
        }
    }

    /// Write all four derived properties at once.
    pub fn write_into(&self, properties: &mut Map<String, Value>) {
        properties.insert(PROP_DROPOUT.to_string(), self.dropout.to_json());
        properties.insert(PROP_RISK.to_string(), json!(self.risk.as_str()));
        properties.insert(PROP_EFFICIENCY.to_string(), self.efficiency.to_json());
        properties.insert(PROP_CENTROID.to_string(), json!(self.centroid));
    }
}

/// One municipality boundary from the feature collection.
#[derive(Debug, Clone)]
pub struct GeoFeature {
    pub municipality_name: String,
    /// `None` when the payload could not be classified.
    pub shape: Option<Shape>,
    pub properties: Map<String, Value>,
    pub enrichment: Option<Enrichment>,
}

impl GeoFeature {
    /// Join key of this feature.
    pub fn key(&self) -> String {
        crate::normalize::normalize_name(&self.municipality_name)
    }

    /// Risk used for filtering and coloring; unenriched features count as no data.
    pub fn risk(&self) -> RiskLabel {
        self.enrichment
            .as_ref()
            .map(|e| e.risk)
            .unwrap_or(RiskLabel::NoData)
    }
}
