use serde::Serialize;

use crate::config::EmptyViewPolicy;
use crate::models::{GeoFeature, RiskLabel};
use crate::normalize::normalize_name;

/// Which municipalities the user is looking at.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "municipios", rename_all = "lowercase")]
pub enum ViewMode {
    /// Every municipality of the region.
    All,
    /// One municipality.
    Single(String),
    /// Several municipalities side by side, in the order given.
    Compare(Vec<String>),
}

/// The filters applied to the enriched collection before rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSelection {
    pub mode: ViewMode,
    pub risks: Vec<RiskLabel>,
}

impl ViewSelection {
    /// Risk categories shown when none are chosen: the three real labels.
    pub fn default_risks() -> Vec<RiskLabel> {
        vec![RiskLabel::Low, RiskLabel::Moderate, RiskLabel::High]
    }

    #[cfg(test)]
    pub fn all() -> Self {
        ViewSelection {
            mode: ViewMode::All,
            risks: Self::default_risks(),
        }
    }

    /// Normalized names selected by the mode; empty for [`ViewMode::All`].
    pub fn selected_keys(&self) -> Vec<String> {
        match &self.mode {
            ViewMode::All => Vec::new(),
            ViewMode::Single(name) => vec![normalize_name(name)],
            ViewMode::Compare(names) => names.iter().map(|n| normalize_name(n)).collect(),
        }
    }

    pub fn is_compare(&self) -> bool {
        matches!(self.mode, ViewMode::Compare(_))
    }
}

/// Result of applying a selection.
#[derive(Debug)]
pub enum View<'a> {
    Features {
        features: Vec<&'a GeoFeature>,
        /// Set when the selection matched nothing and the whole collection is
        /// shown instead ([`EmptyViewPolicy::ShowAll`]).
        unfiltered: bool,
    },
    NoResults,
}

impl<'a> View<'a> {
    pub fn features(&self) -> &[&'a GeoFeature] {
        match self {
            View::Features { features, .. } => features,
            View::NoResults => &[],
        }
    }
}

/// Filter `features` by `selection`. The collection is only read.
pub fn apply<'a>(
    features: &'a [GeoFeature],
    selection: &ViewSelection,
    on_empty: EmptyViewPolicy,
) -> View<'a> {
    let keys = selection.selected_keys();

    let mut selected: Vec<(usize, &'a GeoFeature)> = features
        .iter()
        .filter(|f| selection.risks.contains(&f.risk()))
        .filter_map(|f| {
            if keys.is_empty() {
                return Some((0, f));
            }
            let key = f.key();
            keys.iter().position(|k| *k == key).map(|rank| (rank, f))
        })
        .collect();
    // stable: collection order is kept within one selected name
    selected.sort_by_key(|(rank, _)| *rank);

    if !selected.is_empty() {
        return View::Features {
            features: selected.into_iter().map(|(_, f)| f).collect(),
            unfiltered: false,
        };
    }

    match on_empty {
        EmptyViewPolicy::NoResults => View::NoResults,
        EmptyViewPolicy::ShowAll if features.is_empty() => View::NoResults,
        EmptyViewPolicy::ShowAll => {
            tracing::warn!("selection matched no municipality; showing the full collection");
            View::Features {
                features: features.iter().collect(),
                unfiltered: true,
            }
        }
    }
}

/// Selected names that match no feature of the collection.
pub fn unknown_names(features: &[GeoFeature], selection: &ViewSelection) -> Vec<String> {
    let names = match &selection.mode {
        ViewMode::All => return Vec::new(),
        ViewMode::Single(name) => std::slice::from_ref(name),
        ViewMode::Compare(names) => names.as_slice(),
    };
    names
        .iter()
        .filter(|name| {
            let key = normalize_name(name);
            !features.iter().any(|f| f.key() == key)
        })
        .cloned()
        .collect()
}
