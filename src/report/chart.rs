use std::path::Path;

use anyhow::{anyhow, Result};
use plotters::prelude::*;
use serde::Serialize;

use crate::config::PaletteConfig;
use crate::filter::ViewSelection;
use crate::models::{GeoFeature, RiskLabel};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    /// Decides the bar color.
    pub risk: RiskLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub unit: &'static str,
    pub bars: Vec<Bar>,
}

/// Bars for a view.
///
/// In comparison mode each selected municipality gets a bar with its dropout
/// rate (municipalities without data are left out). Otherwise there is one
/// bar per selected risk category counting its municipalities.
pub fn bar_chart(features: &[&GeoFeature], selection: &ViewSelection) -> BarChart {
    if selection.is_compare() {
        let bars = features
            .iter()
            .filter_map(|f| {
                let e = f.enrichment.as_ref()?;
                Some(Bar {
                    label: f.municipality_name.clone(),
                    value: e.dropout.value()?,
                    risk: e.risk,
                })
            })
            .collect();
        return BarChart {
            title: "Deserción intracurricular".to_string(),
            unit: "%",
            bars,
        };
    }

    let bars = RiskLabel::ALL
        .into_iter()
        .filter(|risk| selection.risks.contains(risk))
        .map(|risk| Bar {
            label: risk.to_string(),
            value: features.iter().filter(|f| f.risk() == risk).count() as f64,
            risk,
        })
        .collect();
    BarChart {
        title: "Municipios por nivel de riesgo".to_string(),
        unit: "municipios",
        bars,
    }
}

impl BarChart {
    pub fn max_value(&self) -> f64 {
        self.bars.iter().map(|b| b.value).fold(0.0, f64::max)
    }
}

const CHART_W: u32 = 900;
const CHART_H: u32 = 520;

/// Draw the chart to a PNG file. Axis labels and the caption need a system
/// sans-serif font.
pub fn render_png(chart: &BarChart, palette: &PaletteConfig, path: &Path) -> Result<()> {
    if chart.bars.is_empty() {
        return Err(anyhow!("nothing to chart: the view has no values"));
    }
    let y_max = (chart.max_value() * 1.15).max(1.0);
    let n = chart.bars.len();

    let mut buf = vec![0u8; (CHART_W * CHART_H * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (CHART_W, CHART_H)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| anyhow!("failed to draw chart: {e}"))?;

        let mut ctx = ChartBuilder::on(&root)
            .caption(format!("{} ({})", chart.title, chart.unit), ("sans-serif", 24))
            .margin(16)
            .x_label_area_size(60)
            .y_label_area_size(56)
            .build_cartesian_2d((0..n).into_segmented(), 0f64..y_max)
            .map_err(|e| anyhow!("failed to draw chart: {e}"))?;

        ctx.configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|x| match x {
                SegmentValue::CenterOf(i) => chart
                    .bars
                    .get(*i)
                    .map(|b| b.label.clone())
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .y_desc(chart.unit)
            .draw()
            .map_err(|e| anyhow!("failed to draw chart: {e}"))?;

        ctx.draw_series(chart.bars.iter().enumerate().map(|(i, bar)| {
            let (r, g, b) = palette.rgb(bar.risk);
            let mut rect = Rectangle::new(
                [
                    (SegmentValue::Exact(i), 0.0),
                    (SegmentValue::Exact(i + 1), bar.value),
                ],
                RGBColor(r, g, b).filled(),
            );
            rect.set_margin(0, 0, 8, 8);
            rect
        }))
        .map_err(|e| anyhow!("failed to draw chart: {e}"))?;

        root.present().map_err(|e| anyhow!("failed to draw chart: {e}"))?;
    }

    super::raster::save_png(buf, CHART_W, CHART_H, path)?;
    tracing::info!("chart written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    use crate::filter::ViewMode;
    use crate::models::{Enrichment, Metric};

    fn feature(name: &str, dropout: Metric, risk: RiskLabel) -> GeoFeature {
        GeoFeature {
            municipality_name: name.to_string(),
            shape: None,
            properties: Map::new(),
            enrichment: Some(Enrichment {
                dropout,
                efficiency: Metric::NoData,
                risk,
                centroid: [0.0, 0.0],
                matched: true,
            }),
        }
    }

    #[test]
    fn test_compare_chart_uses_dropout() {
        let a = feature("Zapopan", Metric::Value(3.1), RiskLabel::Low);
        let b = feature("Bolaños", Metric::Value(12.0), RiskLabel::High);
        let c = feature("Tala", Metric::NoData, RiskLabel::NoData);
        let selection = ViewSelection {
            mode: ViewMode::Compare(vec!["Zapopan".into(), "Bolaños".into(), "Tala".into()]),
            risks: RiskLabel::ALL.to_vec(),
        };
        let chart = bar_chart(&[&a, &b, &c], &selection);
        assert_eq!(chart.unit, "%");
        assert_eq!(chart.bars.len(), 2);
        assert_eq!(chart.bars[1].label, "Bolaños");
        assert_eq!(chart.max_value(), 12.0);
    }

    #[test]
    fn test_overview_chart_counts_selected_risks() {
        let a = feature("Zapopan", Metric::Value(3.1), RiskLabel::Low);
        let b = feature("Tonalá", Metric::Value(2.0), RiskLabel::Low);
        let c = feature("Bolaños", Metric::Value(12.0), RiskLabel::High);
        let chart = bar_chart(&[&a, &b, &c], &ViewSelection::all());
        let values: Vec<(String, f64)> = chart.bars.iter().map(|b| (b.label.clone(), b.value)).collect();
        assert_eq!(
            values,
            vec![
                ("Bajo Riesgo".to_string(), 2.0),
                ("Riesgo Moderado".to_string(), 0.0),
                ("Alto Riesgo".to_string(), 1.0),
            ]
        );
    }

    #[test]
    fn test_empty_chart_is_not_rendered() {
        let chart = BarChart {
            title: "x".to_string(),
            unit: "%",
            bars: Vec::new(),
        };
        let out = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        assert!(render_png(&chart, &PaletteConfig::default(), out.path()).is_err());
    }
}
