//! Time-series processing for the Johns Hopkins tables.
//!
//! Mirrors the original analysis pipeline: melt the wide per-province
//! rows into per-country series, derive daily changes and a rolling
//! mean, and produce the global and top-N summaries the charts plot.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::models::{
    CountrySeries, CountrySnapshot, DataPoint, GlobalPoint, GlobalSeries, MetricTable, RawJhuData,
};

/// Aggregate province-level rows into one date-ascending series per
/// country. Countries come out sorted by name.
pub fn aggregate_by_country(raw: &RawJhuData) -> MetricTable {
    let mut totals: BTreeMap<String, BTreeMap<NaiveDate, u64>> = BTreeMap::new();

    for row in &raw.rows {
        let entry = totals.entry(row.country.clone()).or_default();
        for (date, value) in raw.dates.iter().zip(row.values.iter()) {
            *entry.entry(*date).or_insert(0) += value;
        }
    }

    let series = totals
        .into_iter()
        .map(|(country, by_date)| CountrySeries {
            country,
            points: by_date
                .into_iter()
                .map(|(date, cumulative)| DataPoint::new(date, cumulative))
                .collect(),
        })
        .collect();

    let table = MetricTable {
        metric: raw.metric,
        series,
    };
    debug!(
        "Aggregated {}: {} countries, {} observations",
        raw.metric.label(),
        table.country_count(),
        table.row_count()
    );
    table
}

/// Fill in `daily_new` for every series: the day-over-day difference of
/// the cumulative count, with negative corrections clipped to zero. The
/// first day of each series is zero.
pub fn compute_daily_changes(table: &mut MetricTable) {
    for series in &mut table.series {
        let mut previous: Option<u64> = None;
        for point in &mut series.points {
            point.daily_new = match previous {
                Some(prev) => point.cumulative.saturating_sub(prev),
                None => 0,
            };
            previous = Some(point.cumulative);
        }
    }
}

/// Fill in `smoothed` for every series: a trailing rolling mean of the
/// cumulative count. Windows at the head of a series shrink to the
/// points available, so the smoothed curve starts on day one.
pub fn compute_moving_average(table: &mut MetricTable, window: usize) {
    let window = window.max(1);
    for series in &mut table.series {
        let mut running: f64 = 0.0;
        for i in 0..series.points.len() {
            running += series.points[i].cumulative as f64;
            if i >= window {
                running -= series.points[i - window].cumulative as f64;
            }
            let count = (i + 1).min(window);
            series.points[i].smoothed = running / count as f64;
        }
    }
}

/// Sum the cumulative counts of every country per date.
pub fn global_summary(table: &MetricTable) -> GlobalSeries {
    let mut totals: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for series in &table.series {
        for point in &series.points {
            *totals.entry(point.date).or_insert(0) += point.cumulative;
        }
    }

    GlobalSeries {
        metric: table.metric,
        points: totals
            .into_iter()
            .map(|(date, value)| GlobalPoint { date, value })
            .collect(),
    }
}

/// The `n` countries with the highest cumulative count, either at their
/// latest reported date (`on = None`) or on a specific date. Ties break
/// by country name, matching the stable ordering of the source tables.
pub fn top_countries(table: &MetricTable, n: usize, on: Option<NaiveDate>) -> Vec<CountrySnapshot> {
    let mut snapshots: Vec<CountrySnapshot> = table
        .series
        .iter()
        .filter_map(|series| {
            let point = match on {
                Some(date) => series.point_on(date),
                None => series.latest(),
            }?;
            Some(CountrySnapshot {
                country: series.country.clone(),
                date: point.date,
                cumulative: point.cumulative,
                daily_new: point.daily_new,
            })
        })
        .collect();

    snapshots.sort_by(|a, b| {
        b.cumulative
            .cmp(&a.cumulative)
            .then_with(|| a.country.cmp(&b.country))
    });
    snapshots.truncate(n);
    snapshots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JhuRow, Metric};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    fn raw_fixture() -> RawJhuData {
        RawJhuData {
            metric: Metric::Confirmed,
            dates: (22..=26).map(date).collect(),
            rows: vec![
                JhuRow {
                    province: None,
                    country: "Afghanistan".to_string(),
                    values: vec![0, 0, 1, 1, 2],
                },
                JhuRow {
                    province: Some("Australian Capital Territory".to_string()),
                    country: "Australia".to_string(),
                    values: vec![0, 1, 1, 2, 3],
                },
                JhuRow {
                    province: Some("New South Wales".to_string()),
                    country: "Australia".to_string(),
                    values: vec![0, 3, 4, 4, 6],
                },
                JhuRow {
                    province: None,
                    country: "Albania".to_string(),
                    values: vec![0, 0, 0, 2, 2],
                },
            ],
        }
    }

    fn table_from(countries: &[(&str, &[u64])]) -> MetricTable {
        let mut series: Vec<CountrySeries> = countries
            .iter()
            .map(|(country, values)| CountrySeries {
                country: country.to_string(),
                points: values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| DataPoint::new(date(22 + i as u32), *v))
                    .collect(),
            })
            .collect();
        series.sort_by(|a, b| a.country.cmp(&b.country));
        MetricTable {
            metric: Metric::Confirmed,
            series,
        }
    }

    #[test]
    fn test_aggregate_sums_provinces() {
        let table = aggregate_by_country(&raw_fixture());

        assert_eq!(table.country_count(), 3);
        let names: Vec<_> = table.series.iter().map(|s| s.country.as_str()).collect();
        assert_eq!(names, vec!["Afghanistan", "Albania", "Australia"]);

        let australia = table.get("Australia").unwrap();
        let values: Vec<u64> = australia.points.iter().map(|p| p.cumulative).collect();
        assert_eq!(values, vec![0, 4, 5, 6, 9]);
    }

    #[test]
    fn test_daily_changes_first_day_zero() {
        let mut table = table_from(&[("A", &[5, 7, 7, 12])]);
        compute_daily_changes(&mut table);

        let daily: Vec<u64> = table.series[0].points.iter().map(|p| p.daily_new).collect();
        assert_eq!(daily, vec![0, 2, 0, 5]);
    }

    #[test]
    fn test_daily_changes_clip_negative_corrections() {
        let mut table = table_from(&[("A", &[5, 3, 9])]);
        compute_daily_changes(&mut table);

        let daily: Vec<u64> = table.series[0].points.iter().map(|p| p.daily_new).collect();
        assert_eq!(daily, vec![0, 0, 6]);
    }

    #[test]
    fn test_moving_average_shrinks_at_head() {
        let mut table = table_from(&[("A", &[0, 10, 20, 30])]);
        compute_moving_average(&mut table, 2);

        let smoothed: Vec<f64> = table.series[0].points.iter().map(|p| p.smoothed).collect();
        assert_eq!(smoothed, vec![0.0, 5.0, 15.0, 25.0]);
    }

    #[test]
    fn test_moving_average_window_longer_than_series() {
        let mut table = table_from(&[("A", &[3, 6, 9])]);
        compute_moving_average(&mut table, 7);

        let smoothed: Vec<f64> = table.series[0].points.iter().map(|p| p.smoothed).collect();
        assert_eq!(smoothed, vec![3.0, 4.5, 6.0]);
    }

    #[test]
    fn test_moving_average_window_one_is_identity() {
        let mut table = table_from(&[("A", &[3, 6, 9])]);
        compute_moving_average(&mut table, 1);

        let smoothed: Vec<f64> = table.series[0].points.iter().map(|p| p.smoothed).collect();
        assert_eq!(smoothed, vec![3.0, 6.0, 9.0]);
    }

    #[test]
    fn test_global_summary_sums_countries() {
        let table = aggregate_by_country(&raw_fixture());
        let global = global_summary(&table);

        assert_eq!(global.points.len(), 5);
        let values: Vec<u64> = global.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![0, 4, 6, 9, 13]);
        assert_eq!(global.latest().unwrap().value, 13);
    }

    #[test]
    fn test_top_countries_ranks_and_breaks_ties_by_name() {
        let mut table = table_from(&[("B", &[1, 9]), ("C", &[2, 9]), ("A", &[0, 4])]);
        compute_daily_changes(&mut table);

        let top = top_countries(&table, 2, None);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].country, "B");
        assert_eq!(top[1].country, "C");
        assert_eq!(top[0].cumulative, 9);
        assert_eq!(top[0].daily_new, 8);
    }

    #[test]
    fn test_top_countries_on_specific_date() {
        let table = table_from(&[("A", &[10, 1]), ("B", &[2, 20])]);

        let top = top_countries(&table, 1, Some(date(22)));
        assert_eq!(top[0].country, "A");
        assert_eq!(top[0].cumulative, 10);

        let top = top_countries(&table, 1, Some(date(23)));
        assert_eq!(top[0].country, "B");
        assert_eq!(top[0].cumulative, 20);
    }

    #[test]
    fn test_top_countries_more_than_available() {
        let table = table_from(&[("A", &[1, 2])]);
        let top = top_countries(&table, 10, None);
        assert_eq!(top.len(), 1);
    }
}
