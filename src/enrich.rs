use std::collections::HashMap;

use serde::Serialize;

use crate::error::DataQualityWarning;
use crate::models::{ClassificationRecord, Enrichment, GeoFeature, Metric, RiskLabel};

/// Counts and data-quality findings of one enrichment pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EnrichReport {
    pub matched: usize,
    pub unmatched: usize,
    /// Features whose centroid fell back to the default center.
    pub fallback_centroids: usize,
    #[serde(skip)]
    pub warnings: Vec<DataQualityWarning>,
}

/// Joins boundary features to classification rows by normalized name.
///
/// When the dataset lists a municipality more than once, the first row in
/// dataset order is used and each later row is reported once as a
/// [`DataQualityWarning::DuplicateRecord`].
pub struct Enricher<'a> {
    records: &'a [ClassificationRecord],
    by_key: HashMap<&'a str, usize>,
    default_center: [f64; 2],
    duplicates: Vec<DataQualityWarning>,
}

impl<'a> Enricher<'a> {
    pub fn new(records: &'a [ClassificationRecord], default_center: [f64; 2]) -> Self {
        let mut by_key: HashMap<&'a str, usize> = HashMap::with_capacity(records.len());
        let mut duplicates = Vec::new();
        for (index, record) in records.iter().enumerate() {
            if by_key.contains_key(record.name.as_str()) {
                duplicates.push(DataQualityWarning::DuplicateRecord {
                    name: record.raw_name.clone(),
                    index,
                });
            } else {
                by_key.insert(record.name.as_str(), index);
            }
        }
        Enricher {
            records,
            by_key,
            default_center,
            duplicates,
        }
    }

    pub fn lookup(&self, key: &str) -> Option<&'a ClassificationRecord> {
        let records = self.records;
        self.by_key.get(key).map(|&i| &records[i])
    }

    /// Compute the derived fields of `feature` and write them into its
    /// properties. Re-running on an enriched feature rewrites the same values.
    pub fn enrich_feature(&self, feature: &mut GeoFeature) -> Vec<DataQualityWarning> {
        let mut warnings = Vec::new();

        let centroid = match feature.shape.as_ref().and_then(|s| s.vertex_centroid()) {
            Some(c) => c,
            None => {
                warnings.push(DataQualityWarning::MalformedCoordinates {
                    municipality: feature.municipality_name.clone(),
                });
                self.default_center
            }
        };

        let enrichment = match self.lookup(&feature.key()) {
            Some(record) => Enrichment {
                dropout: Metric::rounded(record.dropout_rate),
                efficiency: Metric::rounded(record.terminal_efficiency),
                risk: record.risk.unwrap_or(RiskLabel::NoData),
                centroid,
                matched: true,
            },
            None => {
                warnings.push(DataQualityWarning::NoMatch {
                    municipality: feature.municipality_name.clone(),
                });
                Enrichment::no_data(centroid)
            }
        };

        enrichment.write_into(&mut feature.properties);
        feature.enrichment = Some(enrichment);
        warnings
    }

    /// Enrich every feature, calling `on_feature` after each one.
    pub fn enrich_all(
        &self,
        features: &mut [GeoFeature],
        mut on_feature: impl FnMut(),
    ) -> EnrichReport {
        let mut report = EnrichReport {
            warnings: self.duplicates.clone(),
            ..EnrichReport::default()
        };

        for feature in features.iter_mut() {
            let warnings = self.enrich_feature(feature);
            if feature.enrichment.as_ref().is_some_and(|e| e.matched) {
                report.matched += 1;
            } else {
                report.unmatched += 1;
            }
            if warnings
                .iter()
                .any(|w| matches!(w, DataQualityWarning::MalformedCoordinates { .. }))
            {
                report.fallback_centroids += 1;
            }
            report.warnings.extend(warnings);
            on_feature();
        }

        for warning in &report.warnings {
            warning.log();
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    use crate::geometry::Shape;
    use crate::models::{PROP_CENTROID, PROP_DROPOUT, PROP_EFFICIENCY, PROP_RISK};
    use crate::normalize::normalize_name;

    const CENTER: [f64; 2] = [20.6597, -102.0];

    fn record(name: &str, dropout: Option<f64>, risk: Option<RiskLabel>, eff: Option<f64>) -> ClassificationRecord {
        ClassificationRecord {
            name: normalize_name(name),
            raw_name: name.to_string(),
            dropout_rate: dropout,
            terminal_efficiency: eff,
            risk,
        }
    }

    fn feature(name: &str, coordinates: Value) -> GeoFeature {
        let mut properties = Map::new();
        properties.insert("NAME_1".to_string(), json!("Jalisco"));
        properties.insert("NAME_2".to_string(), json!(name));
        GeoFeature {
            municipality_name: name.to_string(),
            shape: Shape::from_json(&coordinates),
            properties,
            enrichment: None,
        }
    }

    fn square() -> Value {
        json!([[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]])
    }

    #[test]
    fn test_matched_feature() {
        let records = vec![record("Guadalajara", Some(5.0), Some(RiskLabel::Low), Some(95.0))];
        let enricher = Enricher::new(&records, CENTER);
        let mut f = feature("Guadalajara", square());
        let warnings = enricher.enrich_feature(&mut f);

        assert!(warnings.is_empty());
        assert_eq!(f.properties[PROP_DROPOUT], json!(5.0));
        assert_eq!(f.properties[PROP_RISK], json!("Bajo Riesgo"));
        assert_eq!(f.properties[PROP_EFFICIENCY], json!(95.0));
        assert_eq!(f.properties[PROP_CENTROID], json!([1.0, 1.0]));
        assert!(f.enrichment.unwrap().matched);
    }

    #[test]
    fn test_unmatched_feature_gets_sentinels() {
        let records = vec![record("Guadalajara", Some(5.0), Some(RiskLabel::Low), Some(95.0))];
        let enricher = Enricher::new(&records, CENTER);
        let mut f = feature("Ciudad Fantasma", square());
        let warnings = enricher.enrich_feature(&mut f);

        assert_eq!(f.properties[PROP_DROPOUT], json!("N/D"));
        assert_eq!(f.properties[PROP_RISK], json!("Sin datos"));
        assert_eq!(f.properties[PROP_EFFICIENCY], json!("N/D"));
        assert_eq!(
            warnings,
            vec![DataQualityWarning::NoMatch {
                municipality: "Ciudad Fantasma".to_string()
            }]
        );
    }

    #[test]
    fn test_accents_and_case_still_join() {
        let records = vec![record("TLAQUEPAQUE ", Some(4.444), Some(RiskLabel::Moderate), Some(80.005))];
        let enricher = Enricher::new(&records, CENTER);
        let mut f = feature("Tláquepaque", square());
        enricher.enrich_feature(&mut f);
        let e = f.enrichment.unwrap();
        assert_eq!(e.dropout, Metric::Value(4.44));
        assert_eq!(e.risk, RiskLabel::Moderate);
    }

    #[test]
    fn test_matched_row_with_missing_values() {
        let records = vec![record("Tala", None, None, Some(70.0))];
        let enricher = Enricher::new(&records, CENTER);
        let mut f = feature("Tala", square());
        enricher.enrich_feature(&mut f);
        assert_eq!(f.properties[PROP_DROPOUT], json!("N/D"));
        assert_eq!(f.properties[PROP_RISK], json!("Sin datos"));
        assert_eq!(f.properties[PROP_EFFICIENCY], json!(70.0));
        assert!(f.enrichment.unwrap().matched);
    }

    #[test]
    fn test_duplicates_first_wins() {
        let records = vec![
            record("Tala", Some(1.0), Some(RiskLabel::Low), None),
            record("tala", Some(9.0), Some(RiskLabel::High), None),
        ];
        let enricher = Enricher::new(&records, CENTER);
        assert_eq!(enricher.duplicates.len(), 1);
        let mut f = feature("Tala", square());
        enricher.enrich_feature(&mut f);
        assert_eq!(f.enrichment.unwrap().risk, RiskLabel::Low);
    }

    #[test]
    fn test_malformed_geometry_uses_default_center() {
        let records: Vec<ClassificationRecord> = vec![];
        let enricher = Enricher::new(&records, CENTER);
        let mut f = feature("Tala", json!([]));
        let warnings = enricher.enrich_feature(&mut f);
        assert_eq!(f.properties[PROP_CENTROID], json!(CENTER));
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_enrich_all_populates_every_feature_and_is_idempotent() {
        let records = vec![
            record("Zapopan", Some(3.0), Some(RiskLabel::Low), Some(91.0)),
            record("Bolaños", Some(12.0), Some(RiskLabel::High), Some(60.0)),
        ];
        let enricher = Enricher::new(&records, CENTER);
        let mut features = vec![
            feature("Zapopan", square()),
            feature("Bolaños", square()),
            feature("Ciudad Fantasma", json!("broken")),
        ];

        let mut calls = 0;
        let report = enricher.enrich_all(&mut features, || calls += 1);
        assert_eq!(calls, 3);
        assert_eq!(report.matched, 2);
        assert_eq!(report.unmatched, 1);
        assert_eq!(report.fallback_centroids, 1);

        for f in &features {
            for key in [PROP_DROPOUT, PROP_RISK, PROP_EFFICIENCY, PROP_CENTROID] {
                assert!(
                    f.properties.get(key).is_some_and(|v| !v.is_null()),
                    "{} missing {}",
                    f.municipality_name,
                    key
                );
            }
        }

        let before: Vec<_> = features.iter().map(|f| f.properties.clone()).collect();
        enricher.enrich_all(&mut features, || {});
        let after: Vec<_> = features.iter().map(|f| f.properties.clone()).collect();
        assert_eq!(before, after);
    }
}
