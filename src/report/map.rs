use std::path::Path;

use anyhow::{anyhow, Result};
use plotters::prelude::*;

use crate::config::PaletteConfig;
use crate::geometry::{bounds, Shape};
use crate::models::GeoFeature;

use super::raster::save_png;

/// Width of the PNG map; the height follows the region's aspect ratio.
pub const MAP_WIDTH: u32 = 1000;
const OUTLINE_WIDTH: u32 = 1;
const FILL_ALPHA: f64 = 0.6;
const POINT_RADIUS: u32 = 4;

/// Draw a choropleth of `features` colored by risk label and save it as PNG.
///
/// Only shapes are drawn, no text, so it renders without system fonts. Points
/// become dots. Features without a parsed shape are skipped.
pub fn render_png(features: &[&GeoFeature], palette: &PaletteConfig, path: &Path) -> Result<()> {
    let shapes: Vec<_> = features.iter().filter_map(|f| f.shape.as_ref()).collect();
    let (min_lon, min_lat, max_lon, max_lat) =
        bounds(shapes.iter().copied()).ok_or_else(|| anyhow!("nothing to draw: no feature has geometry"))?;

    let pad_lon = ((max_lon - min_lon) * 0.02).max(1e-6);
    let pad_lat = ((max_lat - min_lat) * 0.02).max(1e-6);
    let (x0, x1) = (min_lon - pad_lon, max_lon + pad_lon);
    let (y0, y1) = (min_lat - pad_lat, max_lat + pad_lat);

    // Degrees of longitude shrink with latitude; keep the map from stretching.
    let mid_lat = ((y0 + y1) / 2.0).to_radians();
    let aspect = (y1 - y0) / ((x1 - x0) * mid_lat.cos().max(0.1));
    let width = MAP_WIDTH;
    let height = ((width as f64 * aspect).round() as u32).clamp(200, 2000);

    let mut buf = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| anyhow!("failed to draw map: {e}"))?;

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(|e| anyhow!("failed to draw map: {e}"))?;

        for feature in features {
            let Some(shape) = &feature.shape else {
                continue;
            };
            let (r, g, b) = palette.rgb(feature.risk());
            let fill = RGBColor(r, g, b).mix(FILL_ALPHA).filled();
            if let Shape::Point([lon, lat]) = shape {
                chart
                    .draw_series(std::iter::once(Circle::new((*lon, *lat), POINT_RADIUS, fill)))
                    .map_err(|e| anyhow!("failed to draw map: {e}"))?;
                continue;
            }
            for ring in shape.rings() {
                let points: Vec<(f64, f64)> = ring.iter().map(|p| (p[0], p[1])).collect();
                let mut outline = points.clone();
                if let Some(first) = points.first() {
                    outline.push(*first);
                }
                chart
                    .draw_series(std::iter::once(Polygon::new(points, fill)))
                    .map_err(|e| anyhow!("failed to draw map: {e}"))?;
                chart
                    .draw_series(std::iter::once(PathElement::new(
                        outline,
                        BLACK.stroke_width(OUTLINE_WIDTH),
                    )))
                    .map_err(|e| anyhow!("failed to draw map: {e}"))?;
            }
        }

        root.present().map_err(|e| anyhow!("failed to draw map: {e}"))?;
    }

    save_png(buf, width, height, path)?;
    tracing::info!("map written to {}", path.display());
    Ok(())
}
