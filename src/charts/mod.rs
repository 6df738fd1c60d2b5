//! Chart rendering modules.
//!
//! All figures are drawn with the plotters SVG backend, laid out and
//! titled after the original dashboard set: global trends, per-metric
//! top-country comparisons, a correlation heatmap, vaccination progress,
//! and the combined summary dashboard.

pub mod figures;

pub use figures::{
    plot_correlation_heatmap, plot_global_trends, plot_top_countries, plot_vaccination_progress,
    render_dashboard, DashboardData,
};

use plotters::style::RGBColor;

use crate::models::Metric;

/// File name of the global trends figure.
pub const GLOBAL_TRENDS_FILE: &str = "global_trends.svg";
/// File name of the summary dashboard figure.
pub const DASHBOARD_FILE: &str = "covid_dashboard.svg";
/// File name of the correlation heatmap figure.
pub const CORRELATION_FILE: &str = "correlation_heatmap.svg";
/// File name of the vaccination progress figure.
pub const VACCINATION_FILE: &str = "vaccination_progress.svg";

/// File name of the per-metric top-countries figure.
pub fn top_countries_file_name(metric: Metric) -> String {
    format!("top_countries_{}.svg", metric.label())
}

/// Ten-color cycle approximating the original husl palette.
const PALETTE: [RGBColor; 10] = [
    RGBColor(247, 113, 137),
    RGBColor(220, 137, 50),
    RGBColor(174, 157, 49),
    RGBColor(119, 171, 49),
    RGBColor(51, 176, 122),
    RGBColor(54, 173, 164),
    RGBColor(56, 169, 197),
    RGBColor(110, 155, 244),
    RGBColor(204, 122, 244),
    RGBColor(245, 101, 204),
];

/// Color for the `idx`-th series, cycling through the palette.
pub(crate) fn series_color(idx: usize) -> RGBColor {
    PALETTE[idx % PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_color_cycles() {
        assert_eq!(series_color(0), series_color(10));
        assert_eq!(series_color(3), series_color(13));
    }

    #[test]
    fn test_top_countries_file_name() {
        assert_eq!(
            top_countries_file_name(Metric::Confirmed),
            "top_countries_confirmed.svg"
        );
        assert_eq!(top_countries_file_name(Metric::Deaths), "top_countries_deaths.svg");
    }
}
