use std::path::Path;

use anyhow::Result;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde_json::json;

use crate::config::{Config, PaletteConfig};
use crate::filter::View;
use crate::models::GeoFeature;

pub const STROKE: &str = "#000000";
pub const STROKE_WIDTH: f64 = 0.5;
pub const FILL_OPACITY: f64 = 0.6;

/// Copy of the feature properties with the simplestyle keys added.
fn styled_properties(feature: &GeoFeature, palette: &PaletteConfig) -> JsonObject {
    let mut props = feature.properties.clone();
    props.insert("fill".to_string(), json!(palette.hex(feature.risk())));
    props.insert("fill-opacity".to_string(), json!(FILL_OPACITY));
    props.insert("stroke".to_string(), json!(STROKE));
    props.insert("stroke-width".to_string(), json!(STROKE_WIDTH));
    props
}

/// The view as a feature collection. `center` (`[lat, lon]`) and `zoom` are
/// written as foreign members for web map viewers, next to `no_results` and
/// `unfiltered` so an empty selection is distinguishable from an empty region.
pub fn collection(view: &View<'_>, config: &Config) -> FeatureCollection {
    let features = view
        .features()
        .iter()
        .map(|f| Feature {
            bbox: None,
            geometry: f.shape.as_ref().map(|s| Geometry::new(s.to_geojson())),
            id: None,
            properties: Some(styled_properties(f, &config.palette)),
            foreign_members: None,
        })
        .collect();

    let mut members = JsonObject::new();
    members.insert("center".to_string(), json!(config.region.center));
    members.insert("zoom".to_string(), json!(config.region.zoom));
    members.insert("no_results".to_string(), json!(matches!(view, View::NoResults)));
    members.insert(
        "unfiltered".to_string(),
        json!(matches!(view, View::Features { unfiltered: true, .. })),
    );

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(members),
    }
}

pub fn render(view: &View<'_>, config: &Config, output: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(&collection(view, config))?;
    super::json::write_or_print(&text, output)
}
