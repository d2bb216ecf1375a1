//! `desercion-map`: join school dropout classifications to municipal
//! boundaries and report them by risk level.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]).
//! 2. Load config ([`config::load_config`]).
//! 3. Load both datasets and enrich the boundaries once ([`dashboard::Dashboard::load`]).
//! 4. Build a [`filter::ViewSelection`] from the flags and apply it.
//! 5. Render the requested report ([`report`]) plus optional PNG files.
//! 6. Exit `0`, including for an empty view, or `1` on a load or config error.

mod cli;
mod config;
mod dashboard;
mod enrich;
mod error;
mod filter;
mod geometry;
mod loader;
mod models;
mod normalize;
mod report;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, ReportFormat};
use config::load_config;
use dashboard::Dashboard;
use filter::{ViewMode, ViewSelection};
use models::RiskLabel;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let work_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut config = load_config(&work_dir, cli.config.as_deref())?;
    if let Some(region) = &cli.region {
        config = config.with_region(region)?;
    }

    let dashboard = Dashboard::load(config, &cli.data, &cli.geojson, !cli.quiet)?;
    tracing::info!(
        matched = dashboard.report.matched,
        unmatched = dashboard.report.unmatched,
        "enriched {} features",
        dashboard.features.len()
    );

    if cli.list_municipios {
        for name in dashboard.municipality_options() {
            println!("{}", name);
        }
        return Ok(());
    }

    let selection = selection_from(&cli);
    for name in filter::unknown_names(&dashboard.features, &selection) {
        tracing::warn!("municipality `{}` is not in {}", name, dashboard.config.region.name);
    }
    let view = dashboard.view(&selection);

    // --pdf implies PDF format
    let report_format = match &cli.pdf {
        Some(_) => ReportFormat::Pdf,
        None => cli.report.clone(),
    };
    let pdf_path = cli
        .pdf
        .clone()
        .unwrap_or_else(|| PathBuf::from("desercion-report.pdf"));

    match report_format {
        ReportFormat::Terminal => {
            report::terminal::render(&dashboard, &selection, &view, cli.verbose, cli.quiet)?;
        }
        ReportFormat::Json => {
            report::json::render(&dashboard, &selection, &view, cli.output.as_deref())?;
        }
        ReportFormat::Geojson => {
            report::geojson::render(&view, &dashboard.config, cli.output.as_deref())?;
        }
        ReportFormat::Pdf => {
            report::pdf::render(&dashboard, &selection, &view, &pdf_path)?;
        }
    }

    report::write_images(
        &view,
        &selection,
        &dashboard.config.palette,
        cli.map_png.as_deref(),
        cli.chart_png.as_deref(),
    )?;

    Ok(())
}

/// Logs go to stderr so json/geojson output on stdout stays clean.
/// `RUST_LOG` wins over `-v`/`-q`.
fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn selection_from(cli: &Cli) -> ViewSelection {
    let risks: Vec<RiskLabel> = if cli.riesgo.is_empty() {
        ViewSelection::default_risks()
    } else {
        let mut risks: Vec<RiskLabel> = Vec::new();
        for risk in cli.riesgo.iter().copied().map(RiskLabel::from) {
            if !risks.contains(&risk) {
                risks.push(risk);
            }
        }
        risks
    };

    let mode = match cli.municipio.as_slice() {
        [] => ViewMode::All,
        [one] if !cli.compare => ViewMode::Single(one.clone()),
        many => ViewMode::Compare(many.to_vec()),
    };

    ViewSelection { mode, risks }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_from_flags() {
        let cli = Cli::parse_from(["desercion-map"]);
        assert_eq!(selection_from(&cli), ViewSelection::all());

        let cli = Cli::parse_from(["desercion-map", "--municipio", "Tala"]);
        assert_eq!(selection_from(&cli).mode, ViewMode::Single("Tala".to_string()));

        let cli = Cli::parse_from(["desercion-map", "--municipio", "Tala", "--compare"]);
        assert!(selection_from(&cli).is_compare());

        let cli = Cli::parse_from([
            "desercion-map", "--municipio", "Tala", "--municipio", "Zapopan", "--riesgo", "alto",
        ]);
        let selection = selection_from(&cli);
        assert_eq!(
            selection.mode,
            ViewMode::Compare(vec!["Tala".to_string(), "Zapopan".to_string()])
        );
        assert_eq!(selection.risks, vec![RiskLabel::High]);
    }
}
