//! Data models for the COVID-19 analysis pipeline.
//!
//! This module contains the core data structures used throughout the
//! application: the Johns Hopkins metrics and their per-country time
//! series, the OWID record type, and the headline statistics that feed
//! the dashboard and the report.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cumulative case metric tracked by the Johns Hopkins dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Confirmed cases
    Confirmed,
    /// Deaths
    Deaths,
    /// Recoveries (sparsely reported in later data)
    Recovered,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Confirmed => write!(f, "Confirmed"),
            Metric::Deaths => write!(f, "Deaths"),
            Metric::Recovered => write!(f, "Recovered"),
        }
    }
}

impl Metric {
    /// All metrics, in the order the original dataset publishes them.
    pub const ALL: [Metric; 3] = [Metric::Confirmed, Metric::Deaths, Metric::Recovered];

    /// Lowercase label used in file names and log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Confirmed => "confirmed",
            Metric::Deaths => "deaths",
            Metric::Recovered => "recovered",
        }
    }

    /// File name of the corresponding Johns Hopkins time-series CSV.
    pub fn jhu_file_name(&self) -> &'static str {
        match self {
            Metric::Confirmed => "time_series_covid19_confirmed_global.csv",
            Metric::Deaths => "time_series_covid19_deaths_global.csv",
            Metric::Recovered => "time_series_covid19_recovered_global.csv",
        }
    }
}

/// One day of a country's series for a single metric.
///
/// `daily_new` and `smoothed` start at their raw defaults and are filled
/// in by the processing stage (see `analysis::timeseries`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    /// Reporting date.
    pub date: NaiveDate,
    /// Cumulative count as published.
    pub cumulative: u64,
    /// Change versus the previous day, negative corrections clipped to 0.
    pub daily_new: u64,
    /// Rolling mean of the cumulative series.
    pub smoothed: f64,
}

impl DataPoint {
    /// Creates a raw point with no derived values yet.
    pub fn new(date: NaiveDate, cumulative: u64) -> Self {
        Self {
            date,
            cumulative,
            daily_new: 0,
            smoothed: cumulative as f64,
        }
    }
}

/// A single country's date-ascending series for one metric.
///
/// Province-level rows from the source data are already summed into the
/// country total by the time a `CountrySeries` exists.
#[derive(Debug, Clone)]
pub struct CountrySeries {
    /// Country/region name as published (e.g. "Korea, South").
    pub country: String,
    /// Points in strictly ascending date order.
    pub points: Vec<DataPoint>,
}

impl CountrySeries {
    /// The most recent point, if any.
    pub fn latest(&self) -> Option<&DataPoint> {
        self.points.last()
    }

    /// Point on a specific date, if reported.
    pub fn point_on(&self, date: NaiveDate) -> Option<&DataPoint> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| &self.points[idx])
    }

    /// Cumulative value on a specific date.
    #[allow(dead_code)] // Utility for future use
    pub fn value_on(&self, date: NaiveDate) -> Option<u64> {
        self.point_on(date).map(|p| p.cumulative)
    }
}

/// All per-country series for one metric, sorted by country name.
#[derive(Debug, Clone)]
pub struct MetricTable {
    /// Which metric this table holds.
    pub metric: Metric,
    /// One entry per country, sorted by name.
    pub series: Vec<CountrySeries>,
}

impl MetricTable {
    /// Number of countries in the table.
    pub fn country_count(&self) -> usize {
        self.series.len()
    }

    /// Total number of (country, date) observations.
    pub fn row_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }

    /// Whether the table holds any observations at all.
    #[allow(dead_code)] // Utility for future use
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }

    /// Look up a country's series by name.
    pub fn get(&self, country: &str) -> Option<&CountrySeries> {
        self.series
            .binary_search_by(|s| s.country.as_str().cmp(country))
            .ok()
            .map(|idx| &self.series[idx])
    }

    /// Latest date reported by any country in the table.
    #[allow(dead_code)] // Utility for future use
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.series
            .iter()
            .filter_map(|s| s.latest().map(|p| p.date))
            .max()
    }
}

/// Global (all-country) cumulative value on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalPoint {
    /// Reporting date.
    pub date: NaiveDate,
    /// Sum of cumulative counts across all countries.
    pub value: u64,
}

/// Global curve for one metric, date-ascending.
#[derive(Debug, Clone)]
pub struct GlobalSeries {
    /// Which metric this curve sums.
    pub metric: Metric,
    /// Points in strictly ascending date order.
    pub points: Vec<GlobalPoint>,
}

impl GlobalSeries {
    /// The most recent global value, if any.
    pub fn latest(&self) -> Option<&GlobalPoint> {
        self.points.last()
    }
}

/// A percentage value on one date (used for the case-fatality curve).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatePoint {
    /// Reporting date.
    pub date: NaiveDate,
    /// Rate in percent.
    pub percent: f64,
}

/// A country's standing at its latest reported date.
#[derive(Debug, Clone, Serialize)]
pub struct CountrySnapshot {
    /// Country/region name.
    pub country: String,
    /// Date of the latest observation.
    pub date: NaiveDate,
    /// Cumulative count at that date.
    pub cumulative: u64,
    /// Daily new count at that date.
    pub daily_new: u64,
}

/// Raw wide-format Johns Hopkins data for one metric, as read from disk.
///
/// One row per CSV line (a country, or one of its provinces); the
/// aggregation into per-country series happens in `analysis::timeseries`.
#[derive(Debug, Clone)]
pub struct RawJhuData {
    /// Which metric the file holds.
    pub metric: Metric,
    /// Parsed date headers, in column order.
    pub dates: Vec<NaiveDate>,
    /// One entry per CSV data row.
    pub rows: Vec<JhuRow>,
}

impl RawJhuData {
    /// Number of CSV data rows (matches the original "Loaded … rows" count).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// One wide-format CSV row.
#[derive(Debug, Clone)]
pub struct JhuRow {
    /// Province/state, when the country reports at that granularity.
    pub province: Option<String>,
    /// Country/region name.
    pub country: String,
    /// Cumulative counts aligned with `RawJhuData::dates`.
    pub values: Vec<u64>,
}

/// A single row of the OWID comprehensive dataset, restricted to the
/// columns the analysis consumes. Unknown columns in the CSV are ignored,
/// empty numeric cells deserialize to `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwidRecord {
    /// Location name (countries plus OWID aggregates such as "World").
    pub location: String,
    /// Reporting date (ISO 8601 in the source).
    pub date: NaiveDate,
    #[serde(default)]
    pub total_cases: Option<f64>,
    #[serde(default)]
    pub new_cases: Option<f64>,
    #[serde(default)]
    pub total_deaths: Option<f64>,
    #[serde(default)]
    pub new_deaths: Option<f64>,
    #[serde(default)]
    pub total_cases_per_million: Option<f64>,
    #[serde(default)]
    pub new_cases_per_million: Option<f64>,
    #[serde(default)]
    pub total_deaths_per_million: Option<f64>,
    #[serde(default)]
    pub new_deaths_per_million: Option<f64>,
    #[serde(default)]
    pub population: Option<f64>,
    #[serde(default)]
    pub total_vaccinations: Option<f64>,
    #[serde(default)]
    pub people_vaccinated: Option<f64>,
    #[serde(default)]
    pub people_fully_vaccinated: Option<f64>,
}

impl OwidRecord {
    /// Number of numeric measures considered for correlation analysis.
    pub const MEASURE_COUNT: usize = 11;

    /// Names of the case/death/vaccination measures, in fixed column order.
    ///
    /// `population` is deliberately absent: it feeds country selection,
    /// not the correlation matrix.
    pub const MEASURE_NAMES: [&'static str; Self::MEASURE_COUNT] = [
        "total_cases",
        "new_cases",
        "total_deaths",
        "new_deaths",
        "total_cases_per_million",
        "new_cases_per_million",
        "total_deaths_per_million",
        "new_deaths_per_million",
        "total_vaccinations",
        "people_vaccinated",
        "people_fully_vaccinated",
    ];

    /// Measure values, aligned with `MEASURE_NAMES`.
    pub fn measure_values(&self) -> [Option<f64>; Self::MEASURE_COUNT] {
        [
            self.total_cases,
            self.new_cases,
            self.total_deaths,
            self.new_deaths,
            self.total_cases_per_million,
            self.new_cases_per_million,
            self.total_deaths_per_million,
            self.new_deaths_per_million,
            self.total_vaccinations,
            self.people_vaccinated,
            self.people_fully_vaccinated,
        ]
    }
}

/// All OWID rows that survived parsing.
#[derive(Debug, Clone, Default)]
pub struct OwidTable {
    /// Rows in file order.
    pub rows: Vec<OwidRecord>,
}

impl OwidTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows.
    #[allow(dead_code)] // Keeps the len/is_empty pair complete
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows belonging to one location, in file order.
    pub fn rows_for<'a>(&'a self, location: &'a str) -> impl Iterator<Item = &'a OwidRecord> {
        self.rows.iter().filter(move |r| r.location == location)
    }

    /// Whether any row carries a `people_fully_vaccinated` value.
    pub fn has_vaccination_data(&self) -> bool {
        self.rows.iter().any(|r| r.people_fully_vaccinated.is_some())
    }
}

/// Headline statistics for the dashboard text panel and the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportStats {
    /// Global cumulative confirmed cases at the as-of date.
    pub total_confirmed: u64,
    /// Global cumulative deaths at the as-of date.
    pub total_deaths: u64,
    /// Case-fatality rate in percent (0 when no cases).
    pub case_fatality_rate: f64,
    /// Number of countries with confirmed-case data.
    pub countries_affected: usize,
    /// Latest date in the confirmed dataset.
    pub as_of: NaiveDate,
}

/// Metadata about one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    /// When the run finished.
    pub generated_at: DateTime<Utc>,
    /// Datasets that loaded successfully (e.g. "confirmed", "owid").
    pub datasets_loaded: Vec<String>,
    /// Wall-clock duration of the run in seconds.
    pub duration_seconds: f64,
    /// Directory the raw CSVs were read from.
    pub data_dir: String,
    /// Directory the figures were written to.
    pub output_dir: String,
}

/// Pairwise Pearson correlations between OWID measures.
///
/// `values[i][j]` is the coefficient between `labels[i]` and `labels[j]`,
/// or `None` when fewer than two complete pairs exist or one side has
/// zero variance.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    /// Measure names, in matrix order.
    pub labels: Vec<&'static str>,
    /// Row-major coefficient grid, `labels.len()` square.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// A heatmap needs at least two measures to say anything.
    pub fn is_usable(&self) -> bool {
        self.labels.len() >= 2
    }

    /// Coefficient at (row, col), if computed.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row).and_then(|r| r.get(col).copied().flatten())
    }
}

/// One country's vaccination curve (dates with a reported
/// `people_fully_vaccinated` value only).
#[derive(Debug, Clone, Serialize)]
pub struct VaccinationSeries {
    pub country: String,
    pub points: Vec<(NaiveDate, f64)>,
}

impl VaccinationSeries {
    /// Most recent reported point.
    pub fn latest(&self) -> Option<&(NaiveDate, f64)> {
        self.points.last()
    }
}

/// Latest vaccination standing of one country, for the report table.
#[derive(Debug, Clone, Serialize)]
pub struct VaccinationSnapshot {
    pub country: String,
    pub date: NaiveDate,
    pub people_fully_vaccinated: f64,
}

/// Ranked top-N country list for one metric.
#[derive(Debug, Clone, Serialize)]
pub struct MetricTopList {
    pub metric: Metric,
    pub entries: Vec<CountrySnapshot>,
}

/// Everything a finished run reports, in one serializable bundle.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub metadata: RunMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ReportStats>,
    pub top_countries: Vec<MetricTopList>,
    pub vaccination: Vec<VaccinationSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation: Option<CorrelationMatrix>,
    /// File names of the figures written this run.
    pub figures: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_metric_display_and_label() {
        assert_eq!(Metric::Confirmed.to_string(), "Confirmed");
        assert_eq!(Metric::Deaths.label(), "deaths");
        assert_eq!(
            Metric::Recovered.jhu_file_name(),
            "time_series_covid19_recovered_global.csv"
        );
    }

    #[test]
    fn test_country_series_lookup() {
        let series = CountrySeries {
            country: "Testland".to_string(),
            points: vec![
                DataPoint::new(date(2020, 3, 1), 10),
                DataPoint::new(date(2020, 3, 2), 15),
                DataPoint::new(date(2020, 3, 3), 20),
            ],
        };

        assert_eq!(series.latest().map(|p| p.cumulative), Some(20));
        assert_eq!(series.value_on(date(2020, 3, 2)), Some(15));
        assert_eq!(series.value_on(date(2020, 3, 4)), None);
    }

    #[test]
    fn test_metric_table_accessors() {
        let table = MetricTable {
            metric: Metric::Confirmed,
            series: vec![
                CountrySeries {
                    country: "Aland".to_string(),
                    points: vec![DataPoint::new(date(2020, 3, 1), 1)],
                },
                CountrySeries {
                    country: "Bland".to_string(),
                    points: vec![
                        DataPoint::new(date(2020, 3, 1), 2),
                        DataPoint::new(date(2020, 3, 2), 3),
                    ],
                },
            ],
        };

        assert_eq!(table.country_count(), 2);
        assert_eq!(table.row_count(), 3);
        assert!(!table.is_empty());
        assert_eq!(table.latest_date(), Some(date(2020, 3, 2)));
        assert!(table.get("Bland").is_some());
        assert!(table.get("Cland").is_none());
    }

    #[test]
    fn test_owid_measures_exclude_population() {
        let record = OwidRecord {
            location: "Testland".to_string(),
            date: date(2021, 1, 1),
            total_cases: Some(100.0),
            new_cases: None,
            total_deaths: Some(2.0),
            new_deaths: None,
            total_cases_per_million: None,
            new_cases_per_million: None,
            total_deaths_per_million: None,
            new_deaths_per_million: None,
            population: Some(1_000_000.0),
            total_vaccinations: None,
            people_vaccinated: None,
            people_fully_vaccinated: Some(10.0),
        };

        let values = record.measure_values();
        assert_eq!(values.len(), OwidRecord::MEASURE_COUNT);
        assert_eq!(values[0], Some(100.0));
        assert!(OwidRecord::MEASURE_NAMES.iter().all(|name| *name != "population"));
        assert!(OwidRecord::MEASURE_NAMES.iter().all(|name| {
            name.contains("cases") || name.contains("deaths") || name.contains("vaccin")
        }));
    }

    #[test]
    fn test_owid_table_vaccination_lookup() {
        let mut table = OwidTable::default();
        assert!(!table.has_vaccination_data());

        table.rows.push(OwidRecord {
            location: "Testland".to_string(),
            date: date(2021, 1, 1),
            total_cases: None,
            new_cases: None,
            total_deaths: None,
            new_deaths: None,
            total_cases_per_million: None,
            new_cases_per_million: None,
            total_deaths_per_million: None,
            new_deaths_per_million: None,
            population: None,
            total_vaccinations: None,
            people_vaccinated: None,
            people_fully_vaccinated: Some(5.0),
        });

        assert!(table.has_vaccination_data());
        assert_eq!(table.rows_for("Testland").count(), 1);
        assert_eq!(table.rows_for("Elsewhere").count(), 0);
    }
}
