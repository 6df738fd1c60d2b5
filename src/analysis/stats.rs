//! Cross-dataset statistics.
//!
//! Pearson correlations over the OWID measures, the case-fatality
//! curve, vaccination series selection, and the headline numbers shown
//! on the dashboard and in the report.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::models::{
    CorrelationMatrix, GlobalSeries, MetricTable, OwidRecord, OwidTable, RatePoint, ReportStats,
    VaccinationSeries, VaccinationSnapshot,
};

/// Cap on the number of countries drawn on the vaccination chart.
const VACCINATION_SERIES_CAP: usize = 10;

/// Pairwise Pearson correlations over the OWID measures.
///
/// Measures that never appear in the file are dropped, and each pair is
/// computed over pairwise-complete observations: only the rows where
/// both sides hold a value.
pub fn correlation_matrix(owid: &OwidTable) -> CorrelationMatrix {
    let mut columns: Vec<Vec<Option<f64>>> =
        vec![Vec::with_capacity(owid.len()); OwidRecord::MEASURE_COUNT];
    for row in &owid.rows {
        for (col, value) in row.measure_values().into_iter().enumerate() {
            columns[col].push(value);
        }
    }

    let present: Vec<usize> = (0..OwidRecord::MEASURE_COUNT)
        .filter(|&i| columns[i].iter().any(|v| v.is_some()))
        .collect();
    let labels: Vec<&'static str> = present
        .iter()
        .map(|&i| OwidRecord::MEASURE_NAMES[i])
        .collect();

    let mut values = vec![vec![None; labels.len()]; labels.len()];
    for (a, &i) in present.iter().enumerate() {
        for (b, &j) in present.iter().enumerate() {
            if b < a {
                // the matrix is symmetric
                values[a][b] = values[b][a];
            } else {
                values[a][b] = pairwise_pearson(&columns[i], &columns[j]);
            }
        }
    }

    debug!("Correlation matrix over {} measures", labels.len());
    CorrelationMatrix { labels, values }
}

/// Pearson coefficient over the positions where both columns hold a
/// value. `None` with fewer than two complete pairs or zero variance.
pub fn pairwise_pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys.iter())
        .filter_map(|(x, y)| match (x, y) {
            (Some(a), Some(b)) => Some((*a, *b)),
            _ => None,
        })
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    let mut variance_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        variance_x += dx * dx;
        variance_y += dy * dy;
    }
    if variance_x == 0.0 || variance_y == 0.0 {
        return None;
    }

    Some(covariance / (variance_x.sqrt() * variance_y.sqrt()))
}

/// Case-fatality curve: global deaths as a percentage of global
/// confirmed cases, on every date where both are reported and the
/// confirmed count is non-zero.
pub fn case_fatality_series(confirmed: &GlobalSeries, deaths: &GlobalSeries) -> Vec<RatePoint> {
    let deaths_by_date: BTreeMap<NaiveDate, u64> =
        deaths.points.iter().map(|p| (p.date, p.value)).collect();

    confirmed
        .points
        .iter()
        .filter_map(|p| {
            if p.value == 0 {
                return None;
            }
            let deaths = deaths_by_date.get(&p.date)?;
            Some(RatePoint {
                date: p.date,
                percent: *deaths as f64 / p.value as f64 * 100.0,
            })
        })
        .collect()
}

/// Headline statistics for the dashboard text panel and the report.
/// Needs both global curves to be non-empty.
pub fn report_stats(
    confirmed_table: &MetricTable,
    confirmed: &GlobalSeries,
    deaths: &GlobalSeries,
) -> Option<ReportStats> {
    let latest_confirmed = confirmed.latest()?;
    let latest_deaths = deaths.latest()?;

    let case_fatality_rate = if latest_confirmed.value > 0 {
        latest_deaths.value as f64 / latest_confirmed.value as f64 * 100.0
    } else {
        0.0
    };

    Some(ReportStats {
        total_confirmed: latest_confirmed.value,
        total_deaths: latest_deaths.value,
        case_fatality_rate,
        countries_affected: confirmed_table.country_count(),
        as_of: latest_confirmed.date,
    })
}

/// Locations ranked by their maximum reported population, used as the
/// default vaccination-chart selection. OWID aggregate rows ("World",
/// continents, income groups) rank alongside countries, as they do in
/// the source data; pass an explicit country list to avoid them.
pub fn top_locations_by_population(owid: &OwidTable, n: usize) -> Vec<String> {
    let mut max_population: BTreeMap<&str, f64> = BTreeMap::new();
    for row in &owid.rows {
        if let Some(population) = row.population {
            max_population
                .entry(row.location.as_str())
                .and_modify(|m| *m = m.max(population))
                .or_insert(population);
        }
    }

    let mut ranked: Vec<(&str, f64)> = max_population.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    ranked.truncate(n);
    ranked.into_iter().map(|(name, _)| name.to_string()).collect()
}

/// Build the per-country vaccination curves for the chart: the requested
/// countries in order, capped at ten series as in the original layout,
/// skipping any country without a reported value.
pub fn vaccination_series(owid: &OwidTable, countries: &[String]) -> Vec<VaccinationSeries> {
    let mut out = Vec::new();
    for country in countries.iter().take(VACCINATION_SERIES_CAP) {
        let mut points: Vec<(NaiveDate, f64)> = owid
            .rows_for(country)
            .filter_map(|r| r.people_fully_vaccinated.map(|v| (r.date, v)))
            .collect();
        if points.is_empty() {
            warn!("No vaccination data for {}", country);
            continue;
        }
        points.sort_by_key(|(date, _)| *date);
        out.push(VaccinationSeries {
            country: country.clone(),
            points,
        });
    }
    out
}

/// Latest standing per country, for the report table.
pub fn vaccination_snapshots(series: &[VaccinationSeries]) -> Vec<VaccinationSnapshot> {
    series
        .iter()
        .filter_map(|s| {
            s.latest().map(|(date, value)| VaccinationSnapshot {
                country: s.country.clone(),
                date: *date,
                people_fully_vaccinated: *value,
            })
        })
        .collect()
}
