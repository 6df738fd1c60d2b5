//! CSV parsing for the saved COVID-19 datasets.
//!
//! The Johns Hopkins files are wide-format (one column per date) and are
//! kept that way here; `analysis::timeseries` melts them into per-country
//! series. The OWID file is long-format and deserializes straight into
//! typed records.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::data::downloader::OWID_FILE_NAME;
use crate::models::{JhuRow, Metric, OwidRecord, OwidTable, RawJhuData};

/// Date format of the Johns Hopkins column headers (e.g. `1/22/20`).
const JHU_DATE_FORMAT: &str = "%m/%d/%y";

/// Number of fixed leading columns before the date columns
/// (Province/State, Country/Region, Lat, Long).
const JHU_FIXED_COLUMNS: usize = 4;

/// Errors raised while parsing a saved dataset file.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("{path}: expected Johns Hopkins time-series columns, got '{found}'")]
    UnexpectedHeader { path: String, found: String },

    #[error("{path}: no date columns found")]
    NoDateColumns { path: String },

    #[error("{path}: bad date header '{value}': {source}")]
    BadDateHeader {
        path: String,
        value: String,
        source: chrono::ParseError,
    },

    #[error("{path} line {line}: missing country name")]
    MissingCountry { path: String, line: usize },

    #[error("{path} line {line}: bad count '{value}'")]
    BadCount {
        path: String,
        line: usize,
        value: String,
    },

    #[error("{path}: no rows could be parsed")]
    NoValidRows { path: String },
}

/// Everything the load step produced.
#[derive(Debug, Default)]
pub struct Datasets {
    /// Johns Hopkins raw tables, in requested metric order (loaded subset).
    pub jhu: Vec<RawJhuData>,
    /// OWID comprehensive table, when present.
    pub owid: Option<OwidTable>,
}

impl Datasets {
    /// Number of datasets that loaded.
    pub fn len(&self) -> usize {
        self.jhu.len() + usize::from(self.owid.is_some())
    }

    /// Whether nothing loaded at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short names of the loaded datasets (e.g. `confirmed`, `owid`).
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .jhu
            .iter()
            .map(|d| d.metric.label().to_string())
            .collect();
        if self.owid.is_some() {
            names.push("owid".to_string());
        }
        names
    }

    /// Name and row count of each loaded dataset, for the dry-run inventory.
    pub fn inventory(&self) -> Vec<(String, usize)> {
        let mut out: Vec<(String, usize)> = self
            .jhu
            .iter()
            .map(|d| (d.metric.label().to_string(), d.row_count()))
            .collect();
        if let Some(ref owid) = self.owid {
            out.push(("owid".to_string(), owid.len()));
        }
        out
    }
}

/// Load every requested dataset found under `data_dir`.
///
/// Missing or unreadable files are reported and skipped; the caller
/// decides what to do with an empty result.
pub fn load_datasets(data_dir: &Path, metrics: &[Metric]) -> Datasets {
    let mut datasets = Datasets::default();

    for metric in metrics {
        let path = data_dir.join(metric.jhu_file_name());
        if !path.exists() {
            warn!("Missing dataset file: {}", path.display());
            println!("⚠️  File not found: {}", metric.jhu_file_name());
            continue;
        }
        match load_jhu_table(&path, *metric) {
            Ok(raw) => {
                println!("✓ Loaded {} data: {} rows", metric.label(), raw.row_count());
                datasets.jhu.push(raw);
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
                println!("✗ Error loading {}: {}", metric.jhu_file_name(), e);
            }
        }
    }

    let owid_path = data_dir.join(OWID_FILE_NAME);
    if owid_path.exists() {
        match load_owid_table(&owid_path) {
            Ok(table) => {
                println!("✓ Loaded OWID data: {} rows", table.len());
                datasets.owid = Some(table);
            }
            Err(e) => {
                warn!("Failed to load {}: {}", owid_path.display(), e);
                println!("✗ Error loading OWID data: {}", e);
            }
        }
    } else {
        warn!("Missing dataset file: {}", owid_path.display());
        println!("⚠️  OWID data file not found");
    }

    datasets
}

/// Parse one wide-format Johns Hopkins time-series CSV.
pub fn load_jhu_table(path: &Path, metric: Metric) -> Result<RawJhuData, DataError> {
    let path_str = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|source| DataError::Csv {
        path: path_str.clone(),
        source,
    })?;

    let headers = reader
        .headers()
        .map_err(|source| DataError::Csv {
            path: path_str.clone(),
            source,
        })?
        .clone();

    if headers.get(1) != Some("Country/Region") {
        return Err(DataError::UnexpectedHeader {
            path: path_str,
            found: headers.get(1).unwrap_or_default().to_string(),
        });
    }
    if headers.len() <= JHU_FIXED_COLUMNS {
        return Err(DataError::NoDateColumns { path: path_str });
    }

    let mut dates = Vec::with_capacity(headers.len() - JHU_FIXED_COLUMNS);
    for header in headers.iter().skip(JHU_FIXED_COLUMNS) {
        let date = chrono::NaiveDate::parse_from_str(header, JHU_DATE_FORMAT).map_err(
            |source| DataError::BadDateHeader {
                path: path_str.clone(),
                value: header.to_string(),
                source,
            },
        )?;
        dates.push(date);
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // header is line 1, first record is line 2
        let line = idx + 2;
        let record = result.map_err(|source| DataError::Csv {
            path: path_str.clone(),
            source,
        })?;

        let province = match record.get(0) {
            Some("") | None => None,
            Some(p) => Some(p.to_string()),
        };
        let country = match record.get(1) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => {
                return Err(DataError::MissingCountry {
                    path: path_str,
                    line,
                })
            }
        };

        let mut values = Vec::with_capacity(dates.len());
        for col in 0..dates.len() {
            let raw = record.get(JHU_FIXED_COLUMNS + col).unwrap_or("");
            let value = parse_count(raw).ok_or_else(|| DataError::BadCount {
                path: path_str.clone(),
                line,
                value: raw.to_string(),
            })?;
            values.push(value);
        }

        rows.push(JhuRow {
            province,
            country,
            values,
        });
    }

    debug!(
        "Parsed {}: {} rows x {} dates",
        path_str,
        rows.len(),
        dates.len()
    );

    Ok(RawJhuData {
        metric,
        dates,
        rows,
    })
}

/// Parse the long-format OWID comprehensive CSV.
///
/// Individual malformed rows are skipped; the file as a whole fails only
/// when nothing at all deserializes.
pub fn load_owid_table(path: &Path) -> Result<OwidTable, DataError> {
    let path_str = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|source| DataError::Csv {
        path: path_str.clone(),
        source,
    })?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in reader.deserialize::<OwidRecord>() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                debug!("Skipping malformed OWID row: {}", e);
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed rows in {}", skipped, path_str);
    }
    if rows.is_empty() && skipped > 0 {
        return Err(DataError::NoValidRows { path: path_str });
    }

    Ok(OwidTable { rows })
}

/// Parse a cumulative count cell. Empty cells count as zero, fractional
/// values round, negative corrections clamp to zero.
fn parse_count(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0);
    }
    if let Ok(v) = raw.parse::<u64>() {
        return Some(v);
    }
    raw.parse::<f64>()
        .ok()
        .map(|v| if v < 0.0 { 0 } else { v.round() as u64 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    fn fixtures_dir() -> std::path::PathBuf {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn write_temp_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_jhu_confirmed_fixture() {
        let path = fixtures_dir().join("time_series_covid19_confirmed_global.csv");
        let raw = load_jhu_table(&path, Metric::Confirmed).unwrap();

        assert_eq!(raw.metric, Metric::Confirmed);
        assert_eq!(raw.row_count(), 4);
        assert_eq!(raw.dates.len(), 5);
        assert_eq!(raw.dates[0], date(2020, 1, 22));
        assert_eq!(raw.dates[4], date(2020, 1, 26));

        let afghanistan = &raw.rows[0];
        assert_eq!(afghanistan.country, "Afghanistan");
        assert!(afghanistan.province.is_none());
        assert_eq!(afghanistan.values, vec![0, 0, 1, 1, 2]);

        let act = &raw.rows[1];
        assert_eq!(act.country, "Australia");
        assert_eq!(act.province.as_deref(), Some("Australian Capital Territory"));
    }

    #[test]
    fn test_load_owid_fixture() {
        let path = fixtures_dir().join("owid-covid-data.csv");
        let table = load_owid_table(&path).unwrap();

        assert_eq!(table.len(), 6);
        assert!(table.has_vaccination_data());

        let first = &table.rows[0];
        assert_eq!(first.location, "Afghanistan");
        assert_eq!(first.date, date(2021, 1, 1));
        assert_eq!(first.total_cases, Some(51526.0));
        // blank vaccination cells deserialize to None
        assert!(first.people_fully_vaccinated.is_none());

        let world_rows: Vec<_> = table.rows_for("World").collect();
        assert_eq!(world_rows.len(), 2);
    }

    #[test]
    fn test_load_jhu_rejects_bad_header() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_temp_csv(
            &dir,
            "bad.csv",
            "Province/State,Somewhere,Lat,Long,1/22/20\n,Afghanistan,0,0,1\n",
        );
        let err = load_jhu_table(&path, Metric::Confirmed).unwrap_err();
        assert!(matches!(err, DataError::UnexpectedHeader { .. }));
    }

    #[test]
    fn test_load_jhu_rejects_bad_date_header() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_temp_csv(
            &dir,
            "bad_date.csv",
            "Province/State,Country/Region,Lat,Long,not-a-date\n,Afghanistan,0,0,1\n",
        );
        let err = load_jhu_table(&path, Metric::Confirmed).unwrap_err();
        assert!(matches!(err, DataError::BadDateHeader { .. }));
    }

    #[test]
    fn test_load_jhu_rejects_missing_dates() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_temp_csv(
            &dir,
            "no_dates.csv",
            "Province/State,Country/Region,Lat,Long\n,Afghanistan,0,0\n",
        );
        let err = load_jhu_table(&path, Metric::Confirmed).unwrap_err();
        assert!(matches!(err, DataError::NoDateColumns { .. }));
    }

    #[test]
    fn test_load_datasets_skips_missing_files() {
        // The fixtures directory has confirmed and deaths but no recovered
        // file, and carries the OWID sample.
        let datasets = load_datasets(&fixtures_dir(), &Metric::ALL);

        assert_eq!(datasets.jhu.len(), 2);
        assert!(datasets.owid.is_some());
        assert_eq!(datasets.len(), 3);
        assert_eq!(datasets.names(), vec!["confirmed", "deaths", "owid"]);
    }

    #[test]
    fn test_load_datasets_empty_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let datasets = load_datasets(dir.path(), &Metric::ALL);
        assert!(datasets.is_empty());
        assert!(datasets.names().is_empty());
    }

    #[test]
    fn test_parse_count_variants() {
        assert_eq!(parse_count(""), Some(0));
        assert_eq!(parse_count("42"), Some(42));
        assert_eq!(parse_count("42.0"), Some(42));
        assert_eq!(parse_count("-3"), Some(0));
        assert_eq!(parse_count("junk"), None);
    }
}
