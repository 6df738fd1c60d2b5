//! Figure generation using plotters (SVG output).
//!
//! The SVG backend keeps the binary free of system font dependencies.
//! Every figure degrades to a short placeholder message when its input
//! is empty, so a partial download still produces a full set of files.

use std::path::Path;

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters_svg::SVGBackend;

use super::series_color;
use crate::models::{
    CorrelationMatrix, CountrySnapshot, GlobalSeries, Metric, MetricTable, RatePoint, ReportStats,
    VaccinationSeries,
};

/// Data behind the six dashboard panels.
pub struct DashboardData<'a> {
    pub confirmed_global: Option<&'a GlobalSeries>,
    pub deaths_global: Option<&'a GlobalSeries>,
    pub top_confirmed: &'a [CountrySnapshot],
    pub top_deaths: &'a [CountrySnapshot],
    pub case_fatality: &'a [RatePoint],
    pub stats: Option<&'a ReportStats>,
}

/// Plot the global curves, one panel per metric plus the case-fatality
/// rate. A single loaded metric gets a one-row layout, more get 2x2.
pub fn plot_global_trends(
    path: &Path,
    globals: &[GlobalSeries],
    case_fatality: &[RatePoint],
) -> Result<()> {
    let root = SVGBackend::new(path, (1200, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    if globals.iter().all(|g| g.points.is_empty()) && case_fatality.is_empty() {
        root.draw(&Text::new(
            "No global data available",
            (480, 390),
            ("sans-serif", 20).into_font().color(&BLACK),
        ))?;
        root.present()?;
        return Ok(());
    }

    let root = root.titled("Global COVID-19 Trends Over Time", ("sans-serif", 24))?;
    let panels = if globals.len() <= 1 {
        root.split_evenly((1, 2))
    } else {
        root.split_evenly((2, 2))
    };

    let mut plot_idx = 0;
    for series in globals {
        if series.points.is_empty() || plot_idx >= panels.len() {
            continue;
        }
        let (title, y_desc, color) = match series.metric {
            Metric::Confirmed => ("Total Confirmed Cases", "Cases", series_color(0)),
            Metric::Deaths => ("Total Deaths", "Deaths", series_color(1)),
            Metric::Recovered => ("Total Recovered", "Recovered", series_color(2)),
        };
        let points: Vec<(NaiveDate, f64)> = series
            .points
            .iter()
            .map(|p| (p.date, p.value as f64))
            .collect();
        draw_line_panel(&panels[plot_idx], title, y_desc, &points, color, 2)?;
        plot_idx += 1;
    }

    if !case_fatality.is_empty() && plot_idx < panels.len() {
        let points: Vec<(NaiveDate, f64)> = case_fatality
            .iter()
            .map(|p| (p.date, p.percent))
            .collect();
        draw_line_panel(
            &panels[plot_idx],
            "Case Fatality Rate (%)",
            "CFR (%)",
            &points,
            series_color(3),
            2,
        )?;
    }

    root.present()?;
    Ok(())
}

/// Plot the top countries for one metric: a horizontal bar ranking on
/// the left, the leading countries' full curves on the right.
pub fn plot_top_countries(
    path: &Path,
    table: &MetricTable,
    top: &[CountrySnapshot],
    trend_series: usize,
) -> Result<()> {
    let root = SVGBackend::new(path, (1200, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    if top.is_empty() {
        root.draw(&Text::new(
            "No country data available",
            (480, 240),
            ("sans-serif", 20).into_font().color(&BLACK),
        ))?;
        root.present()?;
        return Ok(());
    }

    let halves = root.split_evenly((1, 2));

    draw_bar_panel(
        &halves[0],
        &format!("Top {} Countries - {}", top.len(), table.metric),
        &format!("Total {}", table.metric),
        top,
    )?;

    let shown: Vec<_> = top
        .iter()
        .take(trend_series)
        .filter_map(|snap| table.get(&snap.country))
        .filter(|s| !s.points.is_empty())
        .collect();

    if let Some((first, last)) =
        date_range(shown.iter().flat_map(|s| s.points.iter().map(|p| p.date)))
    {
        let last = pad_degenerate(first, last);
        let max_value = shown
            .iter()
            .flat_map(|s| s.points.iter())
            .map(|p| p.cumulative as f64)
            .fold(0.0f64, f64::max)
            .max(1.0);

        let mut chart = ChartBuilder::on(&halves[1])
            .caption(
                format!("{} Trends - Top {} Countries", table.metric, shown.len()),
                ("sans-serif", 16),
            )
            .margin(10)
            .x_label_area_size(35)
            .y_label_area_size(70)
            .build_cartesian_2d(first..last, 0f64..max_value * 1.05)?;

        chart
            .configure_mesh()
            .x_labels(5)
            .x_desc("Date")
            .y_desc(table.metric.to_string())
            .draw()?;

        for (idx, series) in shown.iter().enumerate() {
            let color = series_color(idx);
            chart
                .draw_series(LineSeries::new(
                    series.points.iter().map(|p| (p.date, p.cumulative as f64)),
                    color.stroke_width(2),
                ))?
                .label(series.country.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    } else {
        halves[1].draw(&Text::new(
            "No data",
            (30, 30),
            ("sans-serif", 16).into_font().color(&BLACK),
        ))?;
    }

    root.present()?;
    Ok(())
}

/// Plot the lower triangle of the correlation matrix as colored,
/// annotated cells. Row names run down the left axis; the bottom axis
/// numbers the columns in the same order.
pub fn plot_correlation_heatmap(path: &Path, matrix: &CorrelationMatrix) -> Result<()> {
    let root = SVGBackend::new(path, (960, 640)).into_drawing_area();
    root.fill(&WHITE)?;

    if !matrix.is_usable() {
        root.draw(&Text::new(
            "Insufficient correlation data",
            (380, 310),
            ("sans-serif", 20).into_font().color(&BLACK),
        ))?;
        root.present()?;
        return Ok(());
    }

    let n = matrix.labels.len();
    let mut chart = ChartBuilder::on(&root)
        .caption("COVID-19 Metrics Correlation Heatmap", ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(190)
        .build_cartesian_2d(0..n, 0..n)?;

    chart
        .configure_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| (x + 1).to_string())
        .x_desc("Measure (row order)")
        .y_labels(n)
        .y_label_formatter(&|y| {
            matrix
                .labels
                .get(*y)
                .map(|l| l.to_string())
                .unwrap_or_default()
        })
        .draw()?;

    for row in 0..n {
        for col in 0..row {
            let Some(value) = matrix.get(row, col) else {
                continue;
            };
            chart.draw_series(std::iter::once(Rectangle::new(
                [(col, row), (col + 1, row + 1)],
                correlation_color(value).filled(),
            )))?;
            chart.draw_series(std::iter::once(
                EmptyElement::at((col, row))
                    + Text::new(
                        format!("{:.2}", value),
                        (8, 16),
                        ("sans-serif", 12).into_font().color(&BLACK),
                    ),
            ))?;
        }
    }

    root.present()?;
    Ok(())
}

/// Plot each country's people-fully-vaccinated curve.
pub fn plot_vaccination_progress(path: &Path, series: &[VaccinationSeries]) -> Result<()> {
    let root = SVGBackend::new(path, (1100, 650)).into_drawing_area();
    root.fill(&WHITE)?;

    let Some((first, last)) =
        date_range(series.iter().flat_map(|s| s.points.iter().map(|(d, _)| *d)))
    else {
        root.draw(&Text::new(
            "No vaccination data available",
            (430, 310),
            ("sans-serif", 20).into_font().color(&BLACK),
        ))?;
        root.present()?;
        return Ok(());
    };

    let last = pad_degenerate(first, last);
    let max_value = series
        .iter()
        .flat_map(|s| s.points.iter())
        .map(|(_, v)| *v)
        .fold(0.0f64, f64::max)
        .max(1.0);

    let mut chart = ChartBuilder::on(&root)
        .caption("COVID-19 Vaccination Progress by Country", ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(first..last, 0f64..max_value * 1.05)?;

    chart
        .configure_mesh()
        .x_labels(6)
        .x_desc("Date")
        .y_desc("People Fully Vaccinated")
        .draw()?;

    for (idx, s) in series.iter().enumerate() {
        let color = series_color(idx);
        chart
            .draw_series(LineSeries::new(
                s.points.iter().copied(),
                color.stroke_width(2),
            ))?
            .label(s.country.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Render the six-panel summary dashboard.
pub fn render_dashboard(path: &Path, data: &DashboardData<'_>) -> Result<()> {
    let root = SVGBackend::new(path, (1600, 960)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("COVID-19 Global Dashboard", ("sans-serif", 28))?;
    let panels = root.split_evenly((3, 2));

    let confirmed_points: Vec<(NaiveDate, f64)> = data
        .confirmed_global
        .map(|s| s.points.iter().map(|p| (p.date, p.value as f64)).collect())
        .unwrap_or_default();
    draw_line_panel(
        &panels[0],
        "Global Confirmed Cases Over Time",
        "Confirmed Cases",
        &confirmed_points,
        series_color(0),
        3,
    )?;

    let deaths_points: Vec<(NaiveDate, f64)> = data
        .deaths_global
        .map(|s| s.points.iter().map(|p| (p.date, p.value as f64)).collect())
        .unwrap_or_default();
    draw_line_panel(
        &panels[1],
        "Global Deaths Over Time",
        "Deaths",
        &deaths_points,
        series_color(1),
        3,
    )?;

    draw_bar_panel(&panels[2], "Top 10 Countries by Total Cases", "", data.top_confirmed)?;
    draw_bar_panel(&panels[3], "Top 10 Countries by Total Deaths", "", data.top_deaths)?;

    let cfr_points: Vec<(NaiveDate, f64)> = data
        .case_fatality
        .iter()
        .map(|p| (p.date, p.percent))
        .collect();
    draw_line_panel(
        &panels[4],
        "Global Case Fatality Rate Over Time",
        "CFR (%)",
        &cfr_points,
        series_color(3),
        2,
    )?;

    draw_summary_panel(&panels[5], data.stats)?;

    root.present()?;
    Ok(())
}

/// One dated line chart inside a panel.
fn draw_line_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    caption: &str,
    y_desc: &str,
    points: &[(NaiveDate, f64)],
    color: RGBColor,
    stroke: u32,
) -> Result<()> {
    if points.is_empty() {
        area.draw(&Text::new(
            "No data",
            (30, 30),
            ("sans-serif", 16).into_font().color(&BLACK),
        ))?;
        return Ok(());
    }

    let first = points[0].0;
    let last = pad_degenerate(first, points[points.len() - 1].0);
    let max_value = points
        .iter()
        .map(|(_, v)| *v)
        .fold(0.0f64, f64::max)
        .max(1.0);

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 16))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(70)
        .build_cartesian_2d(first..last, 0f64..max_value * 1.05)?;

    chart.configure_mesh().x_labels(5).y_desc(y_desc).draw()?;

    chart.draw_series(LineSeries::new(
        points.iter().copied(),
        color.stroke_width(stroke),
    ))?;
    Ok(())
}

/// One horizontal bar ranking inside a panel.
fn draw_bar_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    caption: &str,
    x_desc: &str,
    entries: &[CountrySnapshot],
) -> Result<()> {
    if entries.is_empty() {
        area.draw(&Text::new(
            "No data",
            (30, 30),
            ("sans-serif", 16).into_font().color(&BLACK),
        ))?;
        return Ok(());
    }

    let max_value = entries
        .iter()
        .map(|e| e.cumulative)
        .max()
        .unwrap_or(1)
        .max(1) as f64;

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 16))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(130)
        .build_cartesian_2d(0f64..max_value * 1.1, (0..entries.len()).into_segmented())?;

    // The formatter must outlive the mesh that borrows it.
    let country_label = |y: &SegmentValue<usize>| match y {
        SegmentValue::CenterOf(idx) if *idx < entries.len() => entries[*idx].country.clone(),
        _ => String::new(),
    };
    let mut mesh = chart.configure_mesh();
    mesh.y_labels(entries.len()).y_label_formatter(&country_label);
    if !x_desc.is_empty() {
        mesh.x_desc(x_desc);
    }
    mesh.draw()?;

    chart.draw_series(entries.iter().enumerate().map(|(idx, entry)| {
        Rectangle::new(
            [
                (0.0, SegmentValue::Exact(idx)),
                (entry.cumulative as f64, SegmentValue::Exact(idx + 1)),
            ],
            series_color(idx).filled(),
        )
    }))?;
    Ok(())
}

/// The dashboard's text panel with the headline numbers.
fn draw_summary_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    stats: Option<&ReportStats>,
) -> Result<()> {
    area.draw(&Text::new(
        "COVID-19 Global Summary",
        (60, 50),
        ("sans-serif", 22).into_font().color(&BLACK),
    ))?;

    let Some(stats) = stats else {
        area.draw(&Text::new(
            "No summary available",
            (60, 100),
            ("sans-serif", 16).into_font().color(&BLACK),
        ))?;
        return Ok(());
    };

    let lines = [
        format!("Total Confirmed Cases: {}", format_count(stats.total_confirmed)),
        format!("Total Deaths: {}", format_count(stats.total_deaths)),
        format!("Case Fatality Rate: {:.2}%", stats.case_fatality_rate),
        format!("Countries Affected: {}", stats.countries_affected),
        String::new(),
        format!("Data as of: {}", stats.as_of),
    ];
    for (i, line) in lines.iter().enumerate() {
        area.draw(&Text::new(
            line.as_str(),
            (60, 100 + i as i32 * 30),
            ("sans-serif", 16).into_font().color(&BLACK),
        ))?;
    }
    Ok(())
}

/// Smallest and largest date produced by the iterator.
fn date_range(dates: impl Iterator<Item = NaiveDate>) -> Option<(NaiveDate, NaiveDate)> {
    let mut range: Option<(NaiveDate, NaiveDate)> = None;
    for date in dates {
        range = Some(match range {
            None => (date, date),
            Some((lo, hi)) => (lo.min(date), hi.max(date)),
        });
    }
    range
}

/// A one-day axis span for single-date series, so the coordinate range
/// stays non-empty.
fn pad_degenerate(first: NaiveDate, last: NaiveDate) -> NaiveDate {
    if last > first {
        last
    } else {
        first + Duration::days(1)
    }
}

/// Map a correlation in [-1, 1] to a blue-white-red ramp.
fn correlation_color(value: f64) -> RGBColor {
    let v = (value.clamp(-1.0, 1.0) + 1.0) / 2.0;
    if v < 0.5 {
        let t = v * 2.0;
        RGBColor((255.0 * t) as u8, (255.0 * t) as u8, 255)
    } else {
        let t = (v - 0.5) * 2.0;
        RGBColor(255, (255.0 * (1.0 - t)) as u8, (255.0 * (1.0 - t)) as u8)
    }
}

/// Group digits with commas, e.g. `1234567` to `1,234,567`.
pub(crate) fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
