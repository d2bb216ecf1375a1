use std::path::PathBuf;

use clap::Parser;

use crate::models::RiskLabel;

#[derive(Parser, Debug)]
#[command(
    name = "desercion-map",
    about = "Join school dropout classifications to municipal boundaries and report them by risk level",
    version
)]
pub struct Cli {
    /// Classification dataset (JSON array of records, or .csv)
    #[arg(long, value_name = "FILE", default_value = "clasificacion_municipios.json")]
    pub data: PathBuf,

    /// Municipal boundaries feature collection
    #[arg(long, value_name = "FILE", default_value = "Jalisco.json")]
    pub geojson: PathBuf,

    /// Config file [default: ./.desercion-map/config.toml, fallback ~/.config/desercion-map/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Region (NAME_1) to keep; overrides the config
    #[arg(long, value_name = "NAME")]
    pub region: Option<String>,

    /// Municipality to show (repeatable; more than one implies --compare)
    #[arg(long, value_name = "NAME")]
    pub municipio: Vec<String>,

    /// Compare the selected municipalities side by side
    #[arg(long)]
    pub compare: bool,

    /// Risk level to include (repeatable) [default: bajo, moderado, alto]
    #[arg(long, value_name = "LEVEL")]
    pub riesgo: Vec<RiskArg>,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// PDF output path; use without value to default to desercion-report.pdf
    #[arg(long, value_name = "FILE", num_args = 0..=1, default_missing_value = "desercion-report.pdf")]
    pub pdf: Option<PathBuf>,

    /// Output file for json/geojson reports (stdout otherwise)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Also draw the choropleth map to a PNG file
    #[arg(long, value_name = "FILE")]
    pub map_png: Option<PathBuf>,

    /// Also draw the bar chart to a PNG file
    #[arg(long, value_name = "FILE")]
    pub chart_png: Option<PathBuf>,

    /// Print the municipality names of the dataset and exit
    #[arg(long)]
    pub list_municipios: bool,

    /// Show the full data table and info-level logs
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print summary line
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
    Geojson,
    Pdf,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum RiskArg {
    Bajo,
    Moderado,
    Alto,
    SinDatos,
}

impl From<RiskArg> for RiskLabel {
    fn from(arg: RiskArg) -> Self {
        match arg {
            RiskArg::Bajo => RiskLabel::Low,
            RiskArg::Moderado => RiskLabel::Moderate,
            RiskArg::Alto => RiskLabel::High,
            RiskArg::SinDatos => RiskLabel::NoData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["desercion-map"]);
        assert_eq!(cli.data, PathBuf::from("clasificacion_municipios.json"));
        assert_eq!(cli.geojson, PathBuf::from("Jalisco.json"));
        assert!(cli.municipio.is_empty());
        assert!(matches!(cli.report, ReportFormat::Terminal));
        assert!(cli.pdf.is_none());
    }

    #[test]
    fn test_selection_flags() {
        let cli = Cli::parse_from([
            "desercion-map",
            "--municipio",
            "Zapopan",
            "--municipio",
            "Bolaños",
            "--riesgo",
            "alto",
            "--riesgo",
            "sin-datos",
            "--pdf",
        ]);
        assert_eq!(cli.municipio, vec!["Zapopan", "Bolaños"]);
        let risks: Vec<RiskLabel> = cli.riesgo.into_iter().map(Into::into).collect();
        assert_eq!(risks, vec![RiskLabel::High, RiskLabel::NoData]);
        assert_eq!(cli.pdf, Some(PathBuf::from("desercion-report.pdf")));
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["desercion-map", "-v", "-q"]).is_err());
    }
}
