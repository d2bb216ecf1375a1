use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::dashboard::{summarize, Dashboard, ViewSummary};
use crate::enrich::EnrichReport;
use crate::filter::{View, ViewSelection};

use super::{rows, FeatureRow};

#[derive(Debug, Serialize)]
pub struct ViewDocument<'a> {
    pub region: &'a str,
    pub selection: &'a ViewSelection,
    pub no_results: bool,
    /// The selection matched nothing and the whole collection is listed.
    pub unfiltered: bool,
    pub summary: ViewSummary,
    pub join: &'a EnrichReport,
    pub municipios: Vec<FeatureRow>,
}

pub fn document<'a>(
    dashboard: &'a Dashboard,
    selection: &'a ViewSelection,
    view: &View<'_>,
) -> ViewDocument<'a> {
    let features = view.features();
    ViewDocument {
        region: &dashboard.config.region.name,
        selection,
        no_results: matches!(view, View::NoResults),
        unfiltered: matches!(view, View::Features { unfiltered: true, .. }),
        summary: summarize(features),
        join: &dashboard.report,
        municipios: rows(features),
    }
}

/// Serialize the view; written to `output` when given, stdout otherwise.
pub fn render(
    dashboard: &Dashboard,
    selection: &ViewSelection,
    view: &View<'_>,
    output: Option<&Path>,
) -> Result<()> {
    let text = serde_json::to_string_pretty(&document(dashboard, selection, view))?;
    write_or_print(&text, output)
}

pub(crate) fn write_or_print(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}
