//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.covidview.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data source settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Figure settings.
    #[serde(default)]
    pub charts: ChartsConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Data source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory the raw CSVs are downloaded to / read from.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Base URL of the Johns Hopkins time-series directory.
    #[serde(default = "default_jhu_base_url")]
    pub jhu_base_url: String,

    /// Full URL of the OWID comprehensive CSV.
    #[serde(default = "default_owid_url")]
    pub owid_url: String,

    /// Skip downloads and use whatever is on disk.
    #[serde(default)]
    pub offline: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            jhu_base_url: default_jhu_base_url(),
            owid_url: default_owid_url(),
            offline: false,
        }
    }
}

fn default_data_dir() -> String {
    "data/raw".to_string()
}

fn default_jhu_base_url() -> String {
    "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/"
        .to_string()
}

fn default_owid_url() -> String {
    "https://raw.githubusercontent.com/owid/covid-19-data/master/public/data/owid-covid-data.csv"
        .to_string()
}

/// Analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Top-N country count for rankings and bar charts.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Moving-average window in days.
    #[serde(default = "default_ma_window")]
    pub ma_window: usize,

    /// Countries for the vaccination chart. Empty means "pick the most
    /// populous locations automatically".
    #[serde(default)]
    pub countries: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            ma_window: default_ma_window(),
            countries: Vec::new(),
        }
    }
}

fn default_top_n() -> usize {
    10
}

fn default_ma_window() -> usize {
    7
}

/// Figure settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartsConfig {
    /// Directory the SVG figures are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// How many country lines the top-countries trend panel draws.
    #[serde(default = "default_trend_series")]
    pub trend_series: usize,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            trend_series: default_trend_series(),
        }
    }
}

fn default_output_dir() -> String {
    "output/plots".to_string()
}

fn default_trend_series() -> usize {
    5
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report output path.
    #[serde(default = "default_report_output")]
    pub output: String,

    /// Include the vaccination section when OWID data is available.
    #[serde(default = "default_true")]
    pub include_vaccination: bool,

    /// Include the correlation section when OWID data is available.
    #[serde(default = "default_true")]
    pub include_correlation: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: default_report_output(),
            include_vaccination: true,
            include_correlation: true,
        }
    }
}

fn default_report_output() -> String {
    "output/covid_report.md".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".covidview.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Paths and tuning knobs - only override if explicitly provided
        if let Some(ref data_dir) = args.data_dir {
            self.data.data_dir = data_dir.display().to_string();
        }
        if let Some(ref output_dir) = args.output_dir {
            self.charts.output_dir = output_dir.display().to_string();
        }
        if let Some(ref report) = args.report {
            self.report.output = report.display().to_string();
        }
        if let Some(top) = args.top {
            self.analysis.top_n = top;
        }
        if let Some(window) = args.window {
            self.analysis.ma_window = window;
        }

        // Flags override when set
        if args.offline {
            self.data.offline = true;
        }

        // Optional settings - only override if provided
        if let Some(ref countries) = args.countries {
            self.analysis.countries = countries.iter().map(|c| c.trim().to_string()).collect();
        }
    }

    /// Generate a default configuration file content.
    ///
    /// The template carries a comment per key and parses back to
    /// `Config::default()`.
    pub fn default_toml() -> String {
        r#"# CovidView configuration.
# Every key is optional; command-line flags override these values.

[data]
# Directory the raw CSVs are downloaded to / read from.
data_dir = "data/raw"
# Base URL of the Johns Hopkins time-series directory.
jhu_base_url = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/"
# Full URL of the OWID comprehensive CSV.
owid_url = "https://raw.githubusercontent.com/owid/covid-19-data/master/public/data/owid-covid-data.csv"
# Skip downloads and use whatever is on disk.
offline = false

[analysis]
# Top-N country count for rankings and bar charts.
top_n = 10
# Moving-average window in days.
ma_window = 7
# Countries for the vaccination chart. Empty picks the most populous
# locations automatically.
countries = []

[charts]
# Directory the SVG figures are written to.
output_dir = "output/plots"
# How many country lines the top-countries trend panel draws.
trend_series = 5

[report]
# Report output path.
output = "output/covid_report.md"
# Include the vaccination and correlation sections when OWID data is
# available.
include_vaccination = true
include_correlation = true
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, ReportFormat};
    use std::path::PathBuf;

    fn blank_args() -> Args {
        Args {
            data_dir: None,
            output_dir: None,
            report: None,
            format: ReportFormat::Markdown,
            offline: false,
            top: None,
            window: None,
            countries: None,
            metrics: None,
            config: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data.data_dir, "data/raw");
        assert!(config.data.jhu_base_url.contains("CSSEGISandData"));
        assert!(config.data.owid_url.ends_with("owid-covid-data.csv"));
        assert_eq!(config.analysis.top_n, 10);
        assert_eq!(config.analysis.ma_window, 7);
        assert_eq!(config.charts.trend_series, 5);
        assert!(config.report.include_correlation);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[data]
data_dir = "cache/covid"
offline = true

[analysis]
top_n = 5
countries = ["India", "Brazil"]

[report]
output = "summary.md"
include_vaccination = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.data.data_dir, "cache/covid");
        assert!(config.data.offline);
        assert_eq!(config.analysis.top_n, 5);
        assert_eq!(config.analysis.ma_window, 7);
        assert_eq!(config.analysis.countries, vec!["India", "Brazil"]);
        assert_eq!(config.report.output, "summary.md");
        assert!(!config.report.include_vaccination);
    }

    #[test]
    fn test_merge_keeps_config_values_without_flags() {
        let mut config: Config = toml::from_str(
            r#"
[data]
data_dir = "archive/raw"

[analysis]
top_n = 5
ma_window = 3

[charts]
output_dir = "figs"

[report]
output = "covid.md"
"#,
        )
        .unwrap();

        config.merge_with_args(&blank_args());

        assert_eq!(config.data.data_dir, "archive/raw");
        assert_eq!(config.analysis.top_n, 5);
        assert_eq!(config.analysis.ma_window, 3);
        assert_eq!(config.charts.output_dir, "figs");
        assert_eq!(config.report.output, "covid.md");
    }

    #[test]
    fn test_merge_prefers_explicit_flags() {
        let mut config = Config::default();
        config.analysis.top_n = 5;

        let mut args = blank_args();
        args.data_dir = Some(PathBuf::from("elsewhere"));
        args.top = Some(15);
        args.window = Some(14);
        args.offline = true;
        args.countries = Some(vec![" India ".to_string(), "Brazil".to_string()]);

        config.merge_with_args(&args);

        assert_eq!(config.data.data_dir, "elsewhere");
        assert_eq!(config.analysis.top_n, 15);
        assert_eq!(config.analysis.ma_window, 14);
        assert!(config.data.offline);
        assert_eq!(config.analysis.countries, vec!["India", "Brazil"]);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.starts_with('#'));
        assert!(toml_str.contains("[data]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(toml_str.contains("[charts]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.data.data_dir, defaults.data.data_dir);
        assert_eq!(parsed.data.jhu_base_url, defaults.data.jhu_base_url);
        assert_eq!(parsed.data.owid_url, defaults.data.owid_url);
        assert!(!parsed.data.offline);
        assert_eq!(parsed.analysis.top_n, defaults.analysis.top_n);
        assert_eq!(parsed.analysis.ma_window, defaults.analysis.ma_window);
        assert!(parsed.analysis.countries.is_empty());
        assert_eq!(parsed.charts.output_dir, defaults.charts.output_dir);
        assert_eq!(parsed.charts.trend_series, defaults.charts.trend_series);
        assert_eq!(parsed.report.output, defaults.report.output);
        assert!(parsed.report.include_vaccination);
        assert!(parsed.report.include_correlation);
    }
}
