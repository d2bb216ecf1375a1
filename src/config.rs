use std::path::Path;
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;

use crate::models::RiskLabel;

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid regex"));

/// Root configuration structure, deserialized from `.desercion-map/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub region: RegionConfig,
    pub palette: PaletteConfig,
    pub view: ViewConfig,
}

/// The state being mapped.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Value of `NAME_1` that features must carry to be kept.
    pub name: String,
    /// `[lat, lon]` used to center maps and as the fallback centroid.
    pub center: [f64; 2],
    /// Suggested zoom for web maps, exported with the GeoJSON.
    pub zoom: u8,
}

impl Default for RegionConfig {
    fn default() -> Self {
        RegionConfig {
            name: "Jalisco".to_string(),
            center: [20.6597, -102.0],
            zoom: 7,
        }
    }
}

/// Fill colors per risk label, as `#rrggbb`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    pub low: String,
    pub moderate: String,
    pub high: String,
    pub no_data: String,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        PaletteConfig {
            low: "#2ecc71".to_string(),
            moderate: "#f1c40f".to_string(),
            high: "#e74c3c".to_string(),
            no_data: "#95a5a6".to_string(),
        }
    }
}

impl PaletteConfig {
    pub fn hex(&self, risk: RiskLabel) -> &str {
        match risk {
            RiskLabel::Low => &self.low,
            RiskLabel::Moderate => &self.moderate,
            RiskLabel::High => &self.high,
            RiskLabel::NoData => &self.no_data,
        }
    }

    /// Color as 8-bit RGB. Colors are validated on load, so a bad value here
    /// only happens for hand-built configs and falls back to grey.
    pub fn rgb(&self, risk: RiskLabel) -> (u8, u8, u8) {
        parse_hex(self.hex(risk)).unwrap_or((0x95, 0xa5, 0xa6))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub on_empty: EmptyViewPolicy,
}

/// What to show when a selection matches no feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyViewPolicy {
    /// Report an explicit "no results" state.
    #[default]
    NoResults,
    /// Show the whole unfiltered collection instead.
    ShowAll,
}

impl Config {
    /// Replace the region name (`--region`) and re-check the config.
    pub fn with_region(mut self, name: &str) -> Result<Self> {
        self.region.name = name.to_string();
        self.validate()
    }

    fn validate(self) -> Result<Self> {
        for risk in RiskLabel::ALL {
            let hex = self.palette.hex(risk);
            if !HEX_COLOR.is_match(hex) {
                bail!("palette color for {} must look like #rrggbb, got {:?}", risk, hex);
            }
        }
        if self.region.name.trim().is_empty() {
            bail!("region.name must not be empty");
        }
        Ok(self)
    }
}

pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    if !HEX_COLOR.is_match(hex) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(1)?, channel(3)?, channel(5)?))
}

/// Load the configuration, searching in order:
///
/// 1. `config_override`: path passed via `--config`
/// 2. `./.desercion-map/config.toml`
/// 3. `~/.config/desercion-map/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(work_dir: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let local_config = work_dir.join(".desercion-map").join("config.toml");
    if local_config.exists() {
        return read_config(&local_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("desercion-map")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    tracing::info!("using config {}", path.display());
    config.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.region.name, "Jalisco");
        assert_eq!(cfg.region.center, [20.6597, -102.0]);
        assert_eq!(cfg.palette.hex(RiskLabel::High), "#e74c3c");
        assert_eq!(cfg.view.on_empty, EmptyViewPolicy::NoResults);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut f = NamedTempFile::new().unwrap();
        write!(
            f,
            r##"
[region]
name = "Colima"

[view]
on_empty = "show-all"
"##
        )
        .unwrap();
        let cfg = load_config(Path::new("/nonexistent"), Some(f.path())).unwrap();
        assert_eq!(cfg.region.name, "Colima");
        assert_eq!(cfg.region.zoom, 7);
        assert_eq!(cfg.palette.low, "#2ecc71");
        assert_eq!(cfg.view.on_empty, EmptyViewPolicy::ShowAll);
    }

    #[test]
    fn test_invalid_color_is_rejected() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "[palette]\nhigh = \"red\"\n").unwrap();
        let err = load_config(Path::new("/nonexistent"), Some(f.path())).unwrap_err();
        assert!(err.to_string().contains("#rrggbb"));
    }

    #[test]
    fn test_region_override_is_validated() {
        let cfg = Config::default().with_region("Colima").unwrap();
        assert_eq!(cfg.region.name, "Colima");
        let err = Config::default().with_region("  ").unwrap_err();
        assert!(err.to_string().contains("region.name"));
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#2ecc71"), Some((0x2e, 0xcc, 0x71)));
        assert_eq!(parse_hex("2ecc71"), None);
        assert_eq!(PaletteConfig::default().rgb(RiskLabel::Moderate), (0xf1, 0xc4, 0x0f));
    }
}
