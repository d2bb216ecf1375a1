use anyhow::Result;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::config::PaletteConfig;
use crate::dashboard::{summarize, Dashboard, ViewSummary};
use crate::filter::{View, ViewMode, ViewSelection};
use crate::models::{ClassificationRecord, Metric, RiskLabel};

use super::chart::{bar_chart, BarChart};
use super::{rows, HEADERS};

const BAR_WIDTH: usize = 40;

/// Render a colored terminal report of one view.
pub fn render(
    dashboard: &Dashboard,
    selection: &ViewSelection,
    view: &View<'_>,
    verbose: bool,
    quiet: bool,
) -> Result<()> {
    let features = view.features();
    let summary = summarize(features);
    let palette = &dashboard.config.palette;

    if quiet {
        println!("{}", quiet_line(&summary));
        return Ok(());
    }

    println!(
        "\n {} v{}",
        format!("Deserción Escolar en {}", dashboard.config.region.name).bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(" Vista: {}\n", describe(selection));

    // Summary box
    let report = &dashboard.report;
    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<49} │", "RESUMEN".bold());
    println!(" │  {:<49} │", format!("Municipios en la vista : {:>4}", summary.total));
    for risk in RiskLabel::ALL {
        let count = summary.by_risk.get(&risk).copied().unwrap_or(0);
        println!(
            " │  {} {:<47} │",
            swatch(palette, risk),
            format!("{:<21}: {:>4}", risk.as_str(), count)
        );
    }
    let mean = summary
        .mean_dropout
        .map(|m| format!("{:.2} %", m))
        .unwrap_or_else(|| "N/D".to_string());
    println!(" │  {:<49} │", format!("Deserción promedio     : {}", mean));
    println!(
        " │  {:<49} │",
        format!(
            "Cruce de datos         : {} con datos, {} sin datos",
            report.matched, report.unmatched
        )
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    print_legend(palette);

    match view {
        View::NoResults => {
            println!(
                " {} Ningún municipio coincide con los filtros seleccionados.\n",
                "[SIN RESULTADOS]".yellow().bold()
            );
        }
        View::Features { unfiltered, .. } => {
            if *unfiltered {
                println!(
                    " {} La selección no coincide; se muestran todos los municipios.\n",
                    "[AVISO]".yellow().bold()
                );
            }
            render_view_table(view, palette);
            println!();

            let chart = bar_chart(features, selection);
            println!(" {} ({})\n", chart.title.bold(), chart.unit);
            for line in ascii_chart(&chart, BAR_WIDTH) {
                println!(" {}", line);
            }
            println!();
        }
    }

    if !report.warnings.is_empty() {
        println!(" {} {}\n", "[DATOS]".cyan().bold(), warnings_hint(report.warnings.len()));
    }

    if verbose {
        println!(" {}\n", "Datos Detallados".bold());
        render_records_table(&dashboard.records_by_name());
        println!();
    }

    Ok(())
}

fn describe(selection: &ViewSelection) -> String {
    let risks: Vec<&str> = selection.risks.iter().map(|r| r.as_str()).collect();
    let who = match &selection.mode {
        ViewMode::All => "todos los municipios".to_string(),
        ViewMode::Single(name) => name.clone(),
        ViewMode::Compare(names) => format!("comparación de {}", names.join(", ")),
    };
    format!("{} [{}]", who, risks.join(", "))
}

// Dropped features log at debug level, so only RUST_LOG=debug shows every warning.
fn warnings_hint(count: usize) -> String {
    format!(
        "{} avisos de calidad de datos (ejecute con RUST_LOG=debug para verlos todos)",
        count
    )
}

fn quiet_line(summary: &ViewSummary) -> String {
    let count = |risk: RiskLabel| summary.by_risk.get(&risk).copied().unwrap_or(0);
    format!(
        "Total: {}  Bajo: {}  Moderado: {}  Alto: {}  Sin datos: {}",
        summary.total,
        count(RiskLabel::Low),
        count(RiskLabel::Moderate),
        count(RiskLabel::High),
        count(RiskLabel::NoData),
    )
}

fn swatch(palette: &PaletteConfig, risk: RiskLabel) -> ColoredString {
    let (r, g, b) = palette.rgb(risk);
    "■".truecolor(r, g, b)
}

fn print_legend(palette: &PaletteConfig) {
    let items: Vec<String> = RiskLabel::ALL
        .into_iter()
        .map(|risk| format!("{} {}", swatch(palette, risk), risk))
        .collect();
    println!(" Nivel de Riesgo: {}\n", items.join("   "));
}

fn risk_cell(palette: &PaletteConfig, risk: RiskLabel) -> Cell {
    let (r, g, b) = palette.rgb(risk);
    Cell::new(risk.as_str()).fg(Color::Rgb { r, g, b })
}

fn metric_cell(metric: Metric) -> Cell {
    let cell = Cell::new(metric.to_string()).set_alignment(CellAlignment::Right);
    match metric {
        Metric::Value(_) => cell,
        Metric::NoData => cell.fg(Color::DarkGrey),
    }
}

fn header(extra: &[&str]) -> Vec<Cell> {
    HEADERS
        .iter()
        .chain(extra)
        .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
        .collect()
}

fn render_view_table(view: &View<'_>, palette: &PaletteConfig) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["Centroide"]));

    for row in rows(view.features()) {
        table.add_row(vec![
            Cell::new(&row.municipio),
            metric_cell(row.desercion),
            risk_cell(palette, row.riesgo),
            metric_cell(row.eficiencia),
            Cell::new(format!("{:.4}, {:.4}", row.centroide[0], row.centroide[1])),
        ]);
    }

    println!("{}", table);
}

fn render_records_table(records: &[&ClassificationRecord]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&[]));

    for record in records {
        let risk = record.risk.unwrap_or(RiskLabel::NoData);
        table.add_row(vec![
            Cell::new(&record.raw_name),
            metric_cell(Metric::rounded(record.dropout_rate)),
            Cell::new(risk.as_str()),
            metric_cell(Metric::rounded(record.terminal_efficiency)),
        ]);
    }

    println!("{}", table);
}

/// Horizontal bars scaled so the largest value spans `width` cells.
pub fn ascii_chart(chart: &BarChart, width: usize) -> Vec<String> {
    if chart.bars.is_empty() {
        return vec!["(sin valores)".to_string()];
    }
    let max = chart.max_value();
    let label_w = chart
        .bars
        .iter()
        .map(|b| b.label.chars().count())
        .max()
        .unwrap_or(0);

    chart
        .bars
        .iter()
        .map(|bar| {
            let len = if max > 0.0 {
                ((bar.value / max) * width as f64).round() as usize
            } else {
                0
            };
            let pad = label_w - bar.label.chars().count();
            format!(
                "{}{} │{} {}",
                bar.label,
                " ".repeat(pad),
                "█".repeat(len),
                format_value(bar.value)
            )
        })
        .collect()
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::chart::Bar;

    fn chart(values: &[(&str, f64)]) -> BarChart {
        BarChart {
            title: "t".to_string(),
            unit: "%",
            bars: values
                .iter()
                .map(|(label, value)| Bar {
                    label: label.to_string(),
                    value: *value,
                    risk: RiskLabel::Low,
                })
                .collect(),
        }
    }

    #[test]
    fn test_ascii_chart_scales_to_width() {
        let lines = ascii_chart(&chart(&[("Tala", 5.0), ("Bolaños", 10.0)]), 10);
        assert_eq!(lines[0], format!("Tala    │{} 5", "█".repeat(5)));
        assert_eq!(lines[1], format!("Bolaños │{} 10", "█".repeat(10)));
    }

    #[test]
    fn test_ascii_chart_zero_and_empty() {
        let lines = ascii_chart(&chart(&[("Alto Riesgo", 0.0)]), 10);
        assert_eq!(lines, vec!["Alto Riesgo │ 0".to_string()]);
        assert_eq!(ascii_chart(&chart(&[]), 10), vec!["(sin valores)".to_string()]);
    }

    #[test]
    fn test_warnings_hint_points_to_debug_level() {
        let hint = warnings_hint(3);
        assert!(hint.starts_with("3 avisos"));
        assert!(hint.contains("RUST_LOG=debug"));
        assert!(!hint.contains("-v"));
    }

    #[test]
    fn test_quiet_line() {
        let mut summary = ViewSummary {
            total: 3,
            ..ViewSummary::default()
        };
        summary.by_risk.insert(RiskLabel::Low, 2);
        summary.by_risk.insert(RiskLabel::High, 1);
        assert_eq!(
            quiet_line(&summary),
            "Total: 3  Bajo: 2  Moderado: 0  Alto: 1  Sin datos: 0"
        );
    }

    #[test]
    fn test_describe_selection() {
        let selection = ViewSelection {
            mode: ViewMode::Compare(vec!["Tala".into(), "Zapopan".into()]),
            risks: vec![RiskLabel::High],
        };
        assert_eq!(describe(&selection), "comparación de Tala, Zapopan [Alto Riesgo]");
    }
}
