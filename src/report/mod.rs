//! Renderers for an enriched view.
//!
//! - [`terminal`]: colored summary, legend, tables and an ASCII bar chart.
//! - [`json`]: the view as a JSON document.
//! - [`geojson`]: the view as a styled feature collection for web maps.
//! - [`map`] / [`chart`]: PNG choropleth and bar chart drawn with `plotters`.
//! - [`pdf`]: cover, map, chart and table pages.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::config::PaletteConfig;
use crate::filter::{View, ViewSelection};
use crate::models::{GeoFeature, Metric, RiskLabel};

pub mod chart;
pub mod geojson;
pub mod json;
pub mod map;
pub mod pdf;
mod raster;
pub mod terminal;

/// Column headers shared by every tabular rendering.
pub const HEADERS: [&str; 4] = ["Municipio", "Deserción (%)", "Riesgo", "Eficiencia (%)"];

/// One feature of a view, flattened for tables and JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub municipio: String,
    pub desercion: Metric,
    pub riesgo: RiskLabel,
    pub eficiencia: Metric,
    /// `[lat, lon]`
    pub centroide: [f64; 2],
}

pub fn rows(features: &[&GeoFeature]) -> Vec<FeatureRow> {
    features
        .iter()
        .filter_map(|f| {
            let e = f.enrichment.as_ref()?;
            Some(FeatureRow {
                municipio: f.municipality_name.clone(),
                desercion: e.dropout,
                riesgo: e.risk,
                eficiencia: e.efficiency,
                centroide: e.centroid,
            })
        })
        .collect()
}

/// Write the optional PNG map and chart. An image with nothing to show is
/// skipped with a warning, so an empty view still succeeds.
pub fn write_images(
    view: &View<'_>,
    selection: &ViewSelection,
    palette: &PaletteConfig,
    map_png: Option<&Path>,
    chart_png: Option<&Path>,
) -> Result<()> {
    if matches!(view, View::NoResults) {
        for path in map_png.into_iter().chain(chart_png) {
            tracing::warn!("no results for this selection; {} not written", path.display());
        }
        return Ok(());
    }
    let features = view.features();

    if let Some(path) = map_png {
        if features.iter().any(|f| f.shape.is_some()) {
            map::render_png(features, palette, path)?;
        } else {
            tracing::warn!("no municipality in the view has geometry; {} not written", path.display());
        }
    }

    if let Some(path) = chart_png {
        let bar_chart = chart::bar_chart(features, selection);
        if bar_chart.bars.is_empty() {
            tracing::warn!("no values to chart; {} not written", path.display());
        } else {
            chart::render_png(&bar_chart, palette, path)?;
        }
    }
    Ok(())
}
