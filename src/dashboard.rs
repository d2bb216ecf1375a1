use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::config::Config;
use crate::enrich::{EnrichReport, Enricher};
use crate::error::{DataQualityWarning, LoadError};
use crate::filter::{self, View, ViewSelection};
use crate::loader::{self, boundaries, Loaded};
use crate::models::{ClassificationRecord, GeoFeature, RiskLabel};
use crate::normalize::title_case;

/// Both datasets, loaded and enriched once. Views borrow from here and never
/// modify it, so one `Dashboard` serves any number of selections.
pub struct Dashboard {
    pub config: Config,
    pub records: Vec<ClassificationRecord>,
    pub features: Vec<GeoFeature>,
    pub report: EnrichReport,
}

/// Counts over the features of a view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewSummary {
    pub total: usize,
    pub by_risk: BTreeMap<RiskLabel, usize>,
    /// Mean dropout over features that have one.
    pub mean_dropout: Option<f64>,
}

impl Dashboard {
    /// Read both datasets and enrich the boundaries.
    pub fn load(
        config: Config,
        data_path: &Path,
        geojson_path: &Path,
        show_progress: bool,
    ) -> Result<Self, LoadError> {
        let records = loader::load_classification(data_path)?;
        let features = boundaries::load_features(geojson_path, &config.region.name)?;

        let pb = if show_progress {
            let pb = ProgressBar::new(features.items.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb.set_message("joining municipalities");
            Some(pb)
        } else {
            None
        };

        let dashboard = Self::build(config, records, features, pb.as_ref());

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        Ok(dashboard)
    }

    /// Enrich already-loaded datasets. Load-time warnings are logged and kept
    /// in the report next to the join warnings.
    pub fn build(
        config: Config,
        records: Loaded<ClassificationRecord>,
        features: Loaded<GeoFeature>,
        progress: Option<&ProgressBar>,
    ) -> Self {
        let mut load_warnings: Vec<DataQualityWarning> = records.warnings;
        load_warnings.extend(features.warnings);
        for warning in &load_warnings {
            warning.log();
        }

        let records = records.items;
        let mut features = features.items;

        let mut report = {
            let enricher = Enricher::new(&records, config.region.center);
            enricher.enrich_all(&mut features, || {
                if let Some(pb) = progress {
                    pb.inc(1);
                }
            })
        };
        load_warnings.append(&mut report.warnings);
        report.warnings = load_warnings;

        Dashboard {
            config,
            records,
            features,
            report,
        }
    }

    /// Apply a selection to the cached collection.
    pub fn view(&self, selection: &ViewSelection) -> View<'_> {
        filter::apply(&self.features, selection, self.config.view.on_empty)
    }

    /// Municipality names for pickers: normalized, de-duplicated, title-cased
    /// and sorted.
    pub fn municipality_options(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.name.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(title_case)
            .collect()
    }

    /// Records ordered by normalized name, for the detail table.
    pub fn records_by_name(&self) -> Vec<&ClassificationRecord> {
        let mut rows: Vec<&ClassificationRecord> = self.records.iter().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows
    }
}

/// Summarize the features of a view.
pub fn summarize(features: &[&GeoFeature]) -> ViewSummary {
    let mut summary = ViewSummary {
        total: features.len(),
        ..ViewSummary::default()
    };
    let mut dropout_sum = 0.0;
    let mut dropout_n = 0usize;
    for feature in features {
        *summary.by_risk.entry(feature.risk()).or_insert(0) += 1;
        if let Some(v) = feature.enrichment.as_ref().and_then(|e| e.dropout.value()) {
            dropout_sum += v;
            dropout_n += 1;
        }
    }
    if dropout_n > 0 {
        summary.mean_dropout = Some(dropout_sum / dropout_n as f64);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    use crate::filter::ViewMode;
    use crate::models::{PROP_DROPOUT, PROP_EFFICIENCY, PROP_RISK};

    fn fixtures() -> (NamedTempFile, NamedTempFile) {
        let mut data = NamedTempFile::new().unwrap();
        write!(
            data,
            r#"[
  {{"NOMBRE MUNICIPIO": "Guadalajara", "DESERCION INTRACURRICULAR": 5.0, "RIESGO": "Bajo Riesgo", "EFICIENCIA TERMINAL": 95.0}},
  {{"NOMBRE MUNICIPIO": "BOLAÑOS", "DESERCION INTRACURRICULAR": 12.346, "RIESGO": "Alto Riesgo", "EFICIENCIA TERMINAL": 60.0}},
  {{"NOMBRE MUNICIPIO": "Zapopan", "DESERCION INTRACURRICULAR": 3.0, "RIESGO": "Bajo Riesgo", "EFICIENCIA TERMINAL": 91.0}}
]"#
        )
        .unwrap();

        let square = r#"{"type": "Polygon", "coordinates": [[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]]}"#;
        let mut geo = NamedTempFile::new().unwrap();
        write!(
            geo,
            r#"{{"type": "FeatureCollection", "features": [
  {{"type": "Feature", "properties": {{"NAME_1": "Jalisco", "NAME_2": "Guadalajara"}}, "geometry": {square}}},
  {{"type": "Feature", "properties": {{"NAME_1": "Jalisco", "NAME_2": "Bolaños"}}, "geometry": {square}}},
  {{"type": "Feature", "properties": {{"NAME_1": "Jalisco", "NAME_2": "Ciudad Fantasma"}}, "geometry": {square}}},
  {{"type": "Feature", "properties": {{"NAME_1": "Colima", "NAME_2": "Manzanillo"}}, "geometry": {square}}},
  {{"type": "Feature", "properties": {{"NAME_1": "Jalisco", "NAME_2": "Tala"}}, "geometry": null}}
]}}"#
        )
        .unwrap();
        (data, geo)
    }

    #[test]
    fn test_load_and_enrich_end_to_end() {
        let (data, geo) = fixtures();
        let dash = Dashboard::load(Config::default(), data.path(), geo.path(), false).unwrap();

        assert_eq!(dash.features.len(), 3);
        assert_eq!(dash.report.matched, 2);
        assert_eq!(dash.report.unmatched, 1);

        let gdl = &dash.features[0];
        assert_eq!(gdl.properties[PROP_DROPOUT], serde_json::json!(5.0));
        assert_eq!(gdl.properties[PROP_RISK], serde_json::json!("Bajo Riesgo"));
        assert_eq!(gdl.properties[PROP_EFFICIENCY], serde_json::json!(95.0));

        let bolanos = &dash.features[1];
        assert_eq!(bolanos.properties[PROP_DROPOUT], serde_json::json!(12.35));

        let ghost = &dash.features[2];
        assert_eq!(ghost.properties[PROP_RISK], serde_json::json!("Sin datos"));
    }

    #[test]
    fn test_views_do_not_touch_the_cache() {
        let (data, geo) = fixtures();
        let dash = Dashboard::load(Config::default(), data.path(), geo.path(), false).unwrap();
        let before: Vec<_> = dash.features.iter().map(|f| f.properties.clone()).collect();

        let compare = ViewSelection {
            mode: ViewMode::Compare(vec!["Bolaños".to_string(), "Guadalajara".to_string()]),
            risks: ViewSelection::default_risks(),
        };
        assert_eq!(dash.view(&compare).features().len(), 2);
        assert_eq!(dash.view(&ViewSelection::all()).features().len(), 2);

        let after: Vec<_> = dash.features.iter().map(|f| f.properties.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_municipality_options() {
        let (data, geo) = fixtures();
        let dash = Dashboard::load(Config::default(), data.path(), geo.path(), false).unwrap();
        assert_eq!(
            dash.municipality_options(),
            vec!["Bolanos", "Guadalajara", "Zapopan"]
        );
        let sorted: Vec<_> = dash.records_by_name().iter().map(|r| r.raw_name.as_str()).collect();
        assert_eq!(sorted, vec!["BOLAÑOS", "Guadalajara", "Zapopan"]);
    }

    #[test]
    fn test_summarize() {
        let (data, geo) = fixtures();
        let dash = Dashboard::load(Config::default(), data.path(), geo.path(), false).unwrap();
        let all: Vec<&GeoFeature> = dash.features.iter().collect();
        let summary = summarize(&all);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_risk.get(&RiskLabel::Low), Some(&1));
        assert_eq!(summary.by_risk.get(&RiskLabel::NoData), Some(&1));
        assert_eq!(summary.mean_dropout, Some((5.0 + 12.35) / 2.0));
    }
}
