//! COVID-19 dataset downloading.
//!
//! This module fetches the Johns Hopkins time-series CSVs and the OWID
//! comprehensive dataset over HTTPS and streams them into the raw data
//! directory.

use anyhow::{Context, Result};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::models::Metric;

/// Johns Hopkins CSSE time-series base URL.
pub const JHU_BASE_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/";

/// Our World in Data comprehensive dataset URL.
pub const OWID_URL: &str =
    "https://raw.githubusercontent.com/owid/covid-19-data/master/public/data/owid-covid-data.csv";

/// File name the OWID dataset is stored under.
pub const OWID_FILE_NAME: &str = "owid-covid-data.csv";

/// Per-request timeout. The OWID file is large, so this is generous.
const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Options for fetching the source datasets.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Base URL for the Johns Hopkins time-series files.
    pub jhu_base_url: String,
    /// URL of the OWID comprehensive dataset.
    pub owid_url: String,
    /// Directory the raw CSVs are written to.
    pub data_dir: PathBuf,
    /// Which Johns Hopkins metrics to fetch.
    pub metrics: Vec<Metric>,
    /// Whether to show per-file progress bars.
    pub show_progress: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            jhu_base_url: JHU_BASE_URL.to_string(),
            owid_url: OWID_URL.to_string(),
            data_dir: PathBuf::from("data/raw"),
            metrics: Metric::ALL.to_vec(),
            show_progress: true,
        }
    }
}

/// Outcome of one download pass.
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// File names written successfully.
    pub fetched: Vec<String>,
    /// File names skipped after a download error.
    pub failed: Vec<String>,
}

impl DownloadReport {
    /// Whether every requested file was fetched.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Download all requested datasets into `options.data_dir`.
///
/// A failure on one file is logged and skipped; the loader later works
/// with whatever subset landed on disk.
pub async fn download_datasets(options: &DownloadOptions) -> Result<DownloadReport> {
    tokio::fs::create_dir_all(&options.data_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create data directory: {}",
                options.data_dir.display()
            )
        })?;

    let client = Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .build()
        .context("Failed to build HTTP client")?;

    let mut report = DownloadReport::default();

    for metric in &options.metrics {
        let file_name = metric.jhu_file_name();
        let url = jhu_url(&options.jhu_base_url, *metric);
        let dest = options.data_dir.join(file_name);
        println!("Downloading {} data...", metric.label());
        match download_file(&client, &url, &dest, options.show_progress).await {
            Ok(bytes) => {
                debug!("Fetched {} ({} bytes)", file_name, bytes);
                println!("✓ Downloaded {}", file_name);
                report.fetched.push(file_name.to_string());
            }
            Err(e) => {
                warn!("Download of {} failed: {:#}", file_name, e);
                println!("✗ Error downloading {}: {}", file_name, e);
                report.failed.push(file_name.to_string());
            }
        }
    }

    let dest = options.data_dir.join(OWID_FILE_NAME);
    println!("Downloading OWID comprehensive data...");
    match download_file(&client, &options.owid_url, &dest, options.show_progress).await {
        Ok(bytes) => {
            debug!("Fetched {} ({} bytes)", OWID_FILE_NAME, bytes);
            println!("✓ Downloaded OWID data");
            report.fetched.push(OWID_FILE_NAME.to_string());
        }
        Err(e) => {
            warn!("Download of {} failed: {:#}", OWID_FILE_NAME, e);
            println!("✗ Error downloading OWID data: {}", e);
            report.failed.push(OWID_FILE_NAME.to_string());
        }
    }

    info!(
        "Download pass finished: {} fetched, {} failed",
        report.fetched.len(),
        report.failed.len()
    );

    Ok(report)
}

/// Build the full URL of one Johns Hopkins time-series file.
pub fn jhu_url(base: &str, metric: Metric) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, metric.jhu_file_name())
    } else {
        format!("{}/{}", base, metric.jhu_file_name())
    }
}

/// Stream one file to disk, returning the number of bytes written.
///
/// The body goes into a sibling `.part` file that is renamed over
/// `dest` only after the transfer completes. A failed download leaves
/// an existing `dest` untouched and removes the partial file.
async fn download_file(
    client: &Client,
    url: &str,
    dest: &Path,
    show_progress: bool,
) -> Result<u64> {
    let part = part_path(dest);

    let written = match stream_to_file(client, url, &part, show_progress).await {
        Ok(written) => written,
        Err(e) => {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&part, dest).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(e)
            .with_context(|| format!("Failed to move download into {}", dest.display()));
    }

    Ok(written)
}

/// Sibling path an in-progress download is written to.
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Stream the response body for `url` into `path`.
async fn stream_to_file(
    client: &Client,
    url: &str,
    path: &Path,
    show_progress: bool,
) -> Result<u64> {
    debug!("GET {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request to {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Server rejected {}", url))?;

    let progress_bar = if show_progress {
        let pb = match response.content_length() {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                )
                .unwrap()
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("Transfer from {} interrupted", url))?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written += chunk.len() as u64;
        if let Some(ref pb) = progress_bar {
            pb.inc(chunk.len() as u64);
        }
    }

    file.flush()
        .await
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    Ok(written)
}
