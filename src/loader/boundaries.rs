use std::path::Path;

use serde_json::Value;

use crate::error::{DataQualityWarning, LoadError};
use crate::geometry::Shape;
use crate::models::{GeoFeature, PROP_MUNICIPALITY, PROP_REGION};

use super::Loaded;

/// Load the boundary feature collection, keeping only features of `region`
/// that carry a `coordinates` payload.
///
/// Every feature must have `properties.NAME_1`; retained features must also
/// have `properties.NAME_2`. A feature without geometry is dropped with a
/// [`DataQualityWarning::MissingGeometry`]. A payload that is present but
/// malformed is kept, with `shape` left empty.
pub fn load_features(path: &Path, region: &str) -> Result<Loaded<GeoFeature>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let json: Value = serde_json::from_str(&content).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let loaded = collect_features(path, &json, region)?;
    tracing::info!(
        "kept {} {} features from {}",
        loaded.items.len(),
        region,
        path.display()
    );
    Ok(loaded)
}

fn collect_features(path: &Path, json: &Value, region: &str) -> Result<Loaded<GeoFeature>, LoadError> {
    let features = json
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| LoadError::Malformed {
            path: path.to_path_buf(),
            expected: "GeoJSON feature collection".to_string(),
        })?;

    let missing = |index: usize, field: &str| LoadError::MissingField {
        path: path.to_path_buf(),
        kind: "feature",
        index,
        field: field.to_string(),
    };

    let mut loaded = Loaded::default();
    for (index, feature) in features.iter().enumerate() {
        let properties = feature
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| missing(index, "properties"))?;
        let region_name = properties
            .get(PROP_REGION)
            .and_then(Value::as_str)
            .ok_or_else(|| missing(index, PROP_REGION))?;

        if region_name != region {
            continue;
        }

        // `"geometry": null` has no coordinates either
        let Some(coordinates) = feature.get("geometry").and_then(|g| g.get("coordinates")) else {
            loaded
                .warnings
                .push(DataQualityWarning::MissingGeometry { index });
            continue;
        };

        let municipality_name = properties
            .get(PROP_MUNICIPALITY)
            .and_then(Value::as_str)
            .ok_or_else(|| missing(index, PROP_MUNICIPALITY))?;

        loaded.items.push(GeoFeature {
            municipality_name: municipality_name.to_string(),
            shape: Shape::from_json(coordinates),
            properties: properties.clone(),
            enrichment: None,
        });
    }
    Ok(loaded)
}
