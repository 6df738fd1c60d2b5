//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// CovidView - COVID-19 data analysis and visualization
///
/// Downloads public COVID-19 datasets (Johns Hopkins CSSE, Our World in
/// Data), computes per-country and global trend metrics, and renders SVG
/// figures plus a Markdown/JSON summary report. Running with no arguments
/// performs the complete analysis with defaults.
///
/// Examples:
///   covidview
///   covidview --offline --data-dir data/raw
///   covidview --top 15 --window 14
///   covidview --countries "India,China,Brazil" --format json
///   covidview --dry-run
///   covidview --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory holding the raw dataset CSVs
    ///
    /// Downloads land here; with --offline the files are expected to
    /// already exist. Default: from config or data/raw.
    #[arg(long, value_name = "DIR", env = "COVIDVIEW_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory the SVG figures are written to
    ///
    /// Default: from config or output/plots.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output file path for the summary report
    ///
    /// Default: from config or output/covid_report.md.
    #[arg(short, long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Report format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: ReportFormat,

    /// Skip the download step and use whatever CSVs are on disk
    #[arg(long)]
    pub offline: bool,

    /// Number of countries in the top-N rankings and bar charts
    ///
    /// Default: from config or 10.
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Moving-average window in days
    ///
    /// Default: from config or 7.
    #[arg(long, value_name = "DAYS")]
    pub window: Option<usize>,

    /// Countries for the vaccination chart (comma-separated)
    ///
    /// Defaults to the ten most populous locations reported by OWID.
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub countries: Option<Vec<String>>,

    /// Johns Hopkins metrics to process (comma-separated)
    ///
    /// Example: --metrics confirmed,deaths
    #[arg(long, value_name = "METRICS", value_delimiter = ',')]
    pub metrics: Option<Vec<MetricArg>>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .covidview.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Download and load the datasets, print the inventory, then exit
    ///
    /// No processing, figures, or report.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .covidview.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the summary report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Metric selector for --metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MetricArg {
    Confirmed,
    Deaths,
    Recovered,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Validate tuning knobs if provided
        if let Some(top) = self.top {
            if top == 0 {
                return Err("Top-N count must be at least 1".to_string());
            }
        }

        if let Some(window) = self.window {
            if window == 0 {
                return Err("Moving-average window must be at least 1 day".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref countries) = self.countries {
            if countries.iter().any(|c| c.trim().is_empty()) {
                return Err("Country names must not be empty".to_string());
            }
        }

        // With --offline an explicitly given data directory must exist.
        // When the directory comes from config it is resolved after this.
        if self.offline {
            if let Some(ref data_dir) = self.data_dir {
                if !data_dir.is_dir() {
                    return Err(format!(
                        "Offline mode, but data directory does not exist: {}",
                        data_dir.display()
                    ));
                }
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
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
    fn test_validation_zero_top() {
        let mut args = make_args();
        args.top = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_window() {
        let mut args = make_args();
        args.window = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_offline_data_dir() {
        let mut args = make_args();
        args.offline = true;
        // Without an explicit --data-dir the directory comes from config
        assert!(args.validate().is_ok());

        args.data_dir = Some(PathBuf::from("definitely/not/here"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_empty_country() {
        let mut args = make_args();
        args.countries = Some(vec!["India".to_string(), "  ".to_string()]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_skipped_for_init_config() {
        let mut args = make_args();
        args.top = Some(0);
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
