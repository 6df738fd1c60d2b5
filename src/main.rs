//! CovidView - COVID-19 data analysis and visualization
//!
//! A CLI tool that downloads public COVID-19 datasets (Johns Hopkins
//! CSSE, Our World in Data), computes trend metrics, and renders SVG
//! figures plus a summary report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (download, filesystem, config failure, etc.)
//!   2 - No datasets could be loaded

mod analysis;
mod charts;
mod cli;
mod config;
mod data;
mod models;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, MetricArg, ReportFormat};
use config::Config;
use models::{AnalysisReport, GlobalSeries, Metric, MetricTable, MetricTopList, RunMetadata};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// The dashboard ranking panels always show ten countries, independent
/// of the `--top` setting used for the standalone figures.
const DASHBOARD_TOP_N: usize = 10;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("CovidView v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the analysis pipeline
    match run_analysis(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .covidview.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".covidview.toml");

    if path.exists() {
        eprintln!("⚠️  .covidview.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .covidview.toml")?;

    println!("✅ Created .covidview.toml with default settings.");
    println!("   Edit it to customize data sources, analysis windows, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete analysis workflow. Returns exit code (0 or 2).
async fn run_analysis(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let metrics = requested_metrics(&args);
    let data_dir = PathBuf::from(&config.data.data_dir);
    let output_dir = PathBuf::from(&config.charts.output_dir);

    println!("🦠 COVID-19 Data Visualization Project");
    println!("{}", "=".repeat(50));

    // Step 1: Download data
    if config.data.offline {
        println!("\n📥 Step 1: Skipping downloads (offline mode)");
        info!("Offline mode, reading files under {}", data_dir.display());
    } else {
        println!("\n📥 Step 1: Downloading COVID-19 data...");
        let options = data::DownloadOptions {
            jhu_base_url: config.data.jhu_base_url.clone(),
            owid_url: config.data.owid_url.clone(),
            data_dir: data_dir.clone(),
            metrics: metrics.clone(),
            show_progress: !args.quiet,
        };
        let download = data::download_datasets(&options).await?;
        if !download.is_complete() {
            warn!(
                "{} download(s) failed; continuing with what is on disk",
                download.failed.len()
            );
        }
    }

    // Step 2: Load data
    println!("\n📊 Step 2: Loading datasets...");
    let datasets = data::load_datasets(&data_dir, &metrics);
    println!("Loaded {} datasets", datasets.len());

    if datasets.is_empty() {
        println!("❌ No datasets loaded. Exiting...");
        return Ok(2);
    }

    // Handle --dry-run: print the inventory and stop
    if args.dry_run {
        return handle_dry_run(&datasets);
    }

    // Step 3: Process data
    println!("\n🔄 Step 3: Processing data...");
    let mut tables: Vec<MetricTable> = Vec::new();
    for raw in &datasets.jhu {
        let mut table = analysis::aggregate_by_country(raw);
        analysis::compute_daily_changes(&mut table);
        analysis::compute_moving_average(&mut table, config.analysis.ma_window);
        tables.push(table);
    }

    let processed: Vec<&str> = tables.iter().map(|t| t.metric.label()).collect();
    println!("Processed datasets: {:?}", processed);

    // Step 4: Create visualizations
    println!("\n📈 Step 4: Creating visualizations...");
    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    })?;

    let globals: Vec<GlobalSeries> = tables.iter().map(analysis::global_summary).collect();
    let confirmed_global = globals.iter().find(|g| g.metric == Metric::Confirmed);
    let deaths_global = globals.iter().find(|g| g.metric == Metric::Deaths);
    let case_fatality = match (confirmed_global, deaths_global) {
        (Some(confirmed), Some(deaths)) => analysis::case_fatality_series(confirmed, deaths),
        _ => Vec::new(),
    };

    let confirmed_table = tables.iter().find(|t| t.metric == Metric::Confirmed);
    let stats = match (confirmed_table, confirmed_global, deaths_global) {
        (Some(table), Some(confirmed), Some(deaths)) => {
            analysis::report_stats(table, confirmed, deaths)
        }
        _ => None,
    };

    let mut figures: Vec<String> = Vec::new();
    let mut top_lists: Vec<MetricTopList> = Vec::new();

    if !tables.is_empty() {
        // Global trends
        println!("Creating global trends visualization...");
        let path = output_dir.join(charts::GLOBAL_TRENDS_FILE);
        charts::plot_global_trends(&path, &globals, &case_fatality)?;
        figures.push(charts::GLOBAL_TRENDS_FILE.to_string());

        // Top countries, one figure per loaded metric
        for table in &tables {
            println!(
                "Creating top countries analysis for {}...",
                table.metric.label()
            );
            let top = analysis::top_countries(table, config.analysis.top_n, None);
            let file_name = charts::top_countries_file_name(table.metric);
            charts::plot_top_countries(
                &output_dir.join(&file_name),
                table,
                &top,
                config.charts.trend_series,
            )?;
            figures.push(file_name);
            top_lists.push(MetricTopList {
                metric: table.metric,
                entries: top,
            });
        }

        // Comprehensive dashboard
        println!("Creating comprehensive dashboard...");
        let deaths_table = tables.iter().find(|t| t.metric == Metric::Deaths);
        let top_confirmed = confirmed_table
            .map(|t| analysis::top_countries(t, DASHBOARD_TOP_N, None))
            .unwrap_or_default();
        let top_deaths = deaths_table
            .map(|t| analysis::top_countries(t, DASHBOARD_TOP_N, None))
            .unwrap_or_default();

        let dashboard = charts::DashboardData {
            confirmed_global,
            deaths_global,
            top_confirmed: &top_confirmed,
            top_deaths: &top_deaths,
            case_fatality: &case_fatality,
            stats: stats.as_ref(),
        };
        charts::render_dashboard(&output_dir.join(charts::DASHBOARD_FILE), &dashboard)?;
        figures.push(charts::DASHBOARD_FILE.to_string());
    }

    // OWID-specific visualizations
    let mut correlation = None;
    let mut vaccination = Vec::new();
    if let Some(ref owid) = datasets.owid {
        if config.report.include_correlation {
            println!("Creating correlation heatmap...");
            let matrix = analysis::correlation_matrix(owid);
            if matrix.is_usable() {
                let path = output_dir.join(charts::CORRELATION_FILE);
                charts::plot_correlation_heatmap(&path, &matrix)?;
                figures.push(charts::CORRELATION_FILE.to_string());
                correlation = Some(matrix);
            } else {
                println!("Insufficient numeric columns for correlation analysis");
            }
        } else {
            debug!("Correlation section disabled in config");
        }

        if config.report.include_vaccination {
            println!("Creating vaccination progress chart...");
            if owid.has_vaccination_data() {
                let countries = if config.analysis.countries.is_empty() {
                    analysis::top_locations_by_population(owid, DASHBOARD_TOP_N)
                } else {
                    config.analysis.countries.clone()
                };
                let series = analysis::vaccination_series(owid, &countries);
                let path = output_dir.join(charts::VACCINATION_FILE);
                charts::plot_vaccination_progress(&path, &series)?;
                figures.push(charts::VACCINATION_FILE.to_string());
                vaccination = analysis::vaccination_snapshots(&series);
            } else {
                println!("Vaccination data not available");
            }
        } else {
            debug!("Vaccination section disabled in config");
        }
    }

    // Step 5: Write the report
    println!("\n📝 Step 5: Writing report...");

    let duration = start_time.elapsed().as_secs_f64();
    let analysis_report = AnalysisReport {
        metadata: RunMetadata {
            generated_at: Utc::now(),
            datasets_loaded: datasets.names(),
            duration_seconds: duration,
            data_dir: config.data.data_dir.clone(),
            output_dir: config.charts.output_dir.clone(),
        },
        stats,
        top_countries: top_lists,
        vaccination,
        correlation,
        figures,
    };

    let output = match args.format {
        ReportFormat::Json => report::generate_json_report(&analysis_report)?,
        ReportFormat::Markdown => report::generate_markdown_report(&analysis_report),
    };

    let report_path = Path::new(&config.report.output);
    if let Some(parent) = report_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create report directory: {}", parent.display())
            })?;
        }
    }
    std::fs::write(report_path, &output)
        .with_context(|| format!("Failed to write report to {}", report_path.display()))?;

    // Print summary
    println!("\n✅ Analysis complete!");
    println!("📁 All visualizations saved to: {}/", config.charts.output_dir);
    println!("🎯 Generated visualizations:");
    for file in list_figures(&output_dir) {
        println!("   • {}", file);
    }
    println!("📊 Report saved to: {}", config.report.output);
    println!("   Duration: {:.1}s", duration);

    Ok(0)
}

/// Handle --dry-run: print what loaded, then stop before processing.
fn handle_dry_run(datasets: &data::Datasets) -> Result<i32> {
    println!("\n🔍 Dry run: dataset inventory (no processing)...\n");

    for (name, rows) in datasets.inventory() {
        println!("   📄 {} ({} rows)", name, rows);
    }
    println!("\n   Total: {} datasets", datasets.len());

    println!("\n✅ Dry run complete. No figures or report were written.");
    Ok(0)
}

/// Metrics selected with --metrics, or all of them.
fn requested_metrics(args: &Args) -> Vec<Metric> {
    match args.metrics {
        Some(ref picked) => picked.iter().map(|m| metric_from_arg(*m)).collect(),
        None => Metric::ALL.to_vec(),
    }
}

/// Convert the clap value enum to the model type.
fn metric_from_arg(arg: MetricArg) -> Metric {
    match arg {
        MetricArg::Confirmed => Metric::Confirmed,
        MetricArg::Deaths => Metric::Deaths,
        MetricArg::Recovered => Metric::Recovered,
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .covidview.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// SVG files currently in the output directory, sorted by name.
fn list_figures(output_dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    if let Ok(entries) = std::fs::read_dir(output_dir) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".svg") {
                names.push(name);
            }
        }
    }
    names.sort();
    names
}
