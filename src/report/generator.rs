//! Markdown report generation.
//!
//! This module renders the analysis results as a Markdown summary with
//! the headline numbers, the per-metric country rankings, and pointers
//! to the generated figures.

use anyhow::Result;

use crate::charts::figures::format_count;
use crate::models::{
    AnalysisReport, CorrelationMatrix, MetricTopList, ReportStats, RunMetadata,
    VaccinationSnapshot,
};

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AnalysisReport) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# COVID-19 Analysis Report\n\n");

    // Metadata section
    output.push_str(&generate_metadata_section(&report.metadata));

    // Headline numbers
    output.push_str(&generate_summary_section(report.stats.as_ref()));

    // Country rankings per metric
    output.push_str(&generate_top_countries_section(&report.top_countries));

    // Vaccination standing
    output.push_str(&generate_vaccination_section(&report.vaccination));

    // Correlation matrix
    output.push_str(&generate_correlation_section(report.correlation.as_ref()));

    // Generated figures
    output.push_str(&generate_figures_section(&report.figures));

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &RunMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Datasets Loaded:** {}\n",
        if metadata.datasets_loaded.is_empty() {
            "none".to_string()
        } else {
            metadata.datasets_loaded.join(", ")
        }
    ));
    section.push_str(&format!("- **Data Directory:** `{}`\n", metadata.data_dir));
    section.push_str(&format!(
        "- **Figures Directory:** `{}`\n",
        metadata.output_dir
    ));
    section.push_str(&format!(
        "- **Run Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push_str("\n");

    section
}

/// Generate the global summary section.
fn generate_summary_section(stats: Option<&ReportStats>) -> String {
    let mut section = String::new();

    section.push_str("## Global Summary\n\n");

    let Some(stats) = stats else {
        section.push_str(
            "Global totals are unavailable; the confirmed and deaths datasets did not both load.\n\n",
        );
        return section;
    };

    section.push_str("| Metric | Value |\n");
    section.push_str("|:---|---:|\n");
    section.push_str(&format!(
        "| Total Confirmed Cases | {} |\n",
        format_count(stats.total_confirmed)
    ));
    section.push_str(&format!(
        "| Total Deaths | {} |\n",
        format_count(stats.total_deaths)
    ));
    section.push_str(&format!(
        "| Case Fatality Rate | {:.2}% |\n",
        stats.case_fatality_rate
    ));
    section.push_str(&format!(
        "| Countries Affected | {} |\n",
        stats.countries_affected
    ));
    section.push_str(&format!("| Data As Of | {} |\n", stats.as_of));
    section.push_str("\n");

    section
}

/// Generate one ranking table per metric.
fn generate_top_countries_section(lists: &[MetricTopList]) -> String {
    if lists.iter().all(|l| l.entries.is_empty()) {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Top Countries\n\n");

    for list in lists {
        if list.entries.is_empty() {
            continue;
        }
        section.push_str(&format!("### {}\n\n", list.metric));
        section.push_str("| Rank | Country | Total | Daily New |\n");
        section.push_str("|---:|:---|---:|---:|\n");
        for (i, entry) in list.entries.iter().enumerate() {
            section.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                i + 1,
                entry.country,
                format_count(entry.cumulative),
                format_count(entry.daily_new)
            ));
        }
        section.push_str("\n");
    }

    section
}

/// Generate the vaccination standing table.
fn generate_vaccination_section(snapshots: &[VaccinationSnapshot]) -> String {
    if snapshots.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Vaccination Progress\n\n");
    section.push_str("| Country | People Fully Vaccinated | As Of |\n");
    section.push_str("|:---|---:|:---|\n");
    for snapshot in snapshots {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            snapshot.country,
            format_count(snapshot.people_fully_vaccinated.round() as u64),
            snapshot.date
        ));
    }
    section.push_str("\n");

    section
}

/// Generate the correlation table (lower triangle with unit diagonal).
fn generate_correlation_section(matrix: Option<&CorrelationMatrix>) -> String {
    let Some(matrix) = matrix else {
        return String::new();
    };
    if !matrix.is_usable() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Metric Correlations\n\n");
    section.push_str("Pearson correlations between the OWID measures, computed pairwise over the dates where both sides are reported:\n\n");

    let n = matrix.labels.len();
    section.push_str("| |");
    for col in 1..=n {
        section.push_str(&format!(" {} |", col));
    }
    section.push_str("\n|:---|");
    for _ in 0..n {
        section.push_str("---:|");
    }
    section.push_str("\n");

    for row in 0..n {
        section.push_str(&format!("| {}. {} |", row + 1, matrix.labels[row]));
        for col in 0..n {
            if col > row {
                section.push_str(" |");
                continue;
            }
            match matrix.get(row, col) {
                Some(value) => section.push_str(&format!(" {:.2} |", value)),
                None => section.push_str(" |"),
            }
        }
        section.push_str("\n");
    }
    section.push_str("\n");

    section
}

/// Generate the figure listing.
fn generate_figures_section(figures: &[String]) -> String {
    if figures.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Generated Figures\n\n");
    for figure in figures {
        section.push_str(&format!("- `{}`\n", figure));
    }
    section.push_str("\n");

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by covidview*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CountrySnapshot, Metric};
    use chrono::{NaiveDate, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_report() -> AnalysisReport {
        let metadata = RunMetadata {
            generated_at: Utc::now(),
            datasets_loaded: vec!["confirmed".to_string(), "deaths".to_string(), "owid".to_string()],
            duration_seconds: 12.5,
            data_dir: "data/raw".to_string(),
            output_dir: "output/plots".to_string(),
        };

        AnalysisReport {
            metadata,
            stats: Some(ReportStats {
                total_confirmed: 704_753_890,
                total_deaths: 7_010_681,
                case_fatality_rate: 0.99,
                countries_affected: 201,
                as_of: date(2023, 3, 9),
            }),
            top_countries: vec![MetricTopList {
                metric: Metric::Confirmed,
                entries: vec![
                    CountrySnapshot {
                        country: "US".to_string(),
                        date: date(2023, 3, 9),
                        cumulative: 103_802_702,
                        daily_new: 0,
                    },
                    CountrySnapshot {
                        country: "India".to_string(),
                        date: date(2023, 3, 9),
                        cumulative: 44_690_738,
                        daily_new: 126,
                    },
                ],
            }],
            vaccination: vec![VaccinationSnapshot {
                country: "India".to_string(),
                date: date(2023, 3, 1),
                people_fully_vaccinated: 950_000_000.0,
            }],
            correlation: Some(CorrelationMatrix {
                labels: vec!["total_cases", "total_deaths"],
                values: vec![
                    vec![Some(1.0), Some(0.87)],
                    vec![Some(0.87), Some(1.0)],
                ],
            }),
            figures: vec![
                "global_trends.svg".to_string(),
                "covid_dashboard.svg".to_string(),
            ],
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# COVID-19 Analysis Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Global Summary"));
        assert!(markdown.contains("## Top Countries"));
        assert!(markdown.contains("## Vaccination Progress"));
        assert!(markdown.contains("## Metric Correlations"));
        assert!(markdown.contains("## Generated Figures"));
        assert!(markdown.contains("| Total Confirmed Cases | 704,753,890 |"));
        assert!(markdown.contains("| 1 | US | 103,802,702 | 0 |"));
        assert!(markdown.contains("`global_trends.svg`"));
    }

    #[test]
    fn test_summary_section_without_stats() {
        let section = generate_summary_section(None);
        assert!(section.contains("## Global Summary"));
        assert!(section.contains("unavailable"));
    }

    #[test]
    fn test_correlation_section_lower_triangle() {
        let matrix = CorrelationMatrix {
            labels: vec!["total_cases", "new_cases"],
            values: vec![
                vec![Some(1.0), Some(0.5)],
                vec![Some(0.5), Some(1.0)],
            ],
        };
        let section = generate_correlation_section(Some(&matrix));

        assert!(section.contains("| 1. total_cases | 1.00 | |"));
        assert!(section.contains("| 2. new_cases | 0.50 | 1.00 |"));
    }

    #[test]
    fn test_correlation_section_skipped_when_unusable() {
        let matrix = CorrelationMatrix {
            labels: vec!["total_cases"],
            values: vec![vec![Some(1.0)]],
        };
        assert!(generate_correlation_section(Some(&matrix)).is_empty());
        assert!(generate_correlation_section(None).is_empty());
    }

    #[test]
    fn test_vaccination_section_skipped_when_empty() {
        assert!(generate_vaccination_section(&[]).is_empty());
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"top_countries\""));
        assert!(json.contains("\"figures\""));
        assert!(json.contains("\"total_confirmed\": 704753890"));
    }
}
