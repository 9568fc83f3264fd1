//! Output formatting and persistence for cleaned tables and analysis reports.
//!
//! Supports pretty-printing, JSON serialization and CSV tables.

use std::fs;
use std::path::Path;

use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::analyzer::AnalysisReport;
use crate::cleaning::types::{CleanDataset, DISTRICT_COLUMN, DatasetKind};
use crate::error::Result;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes flat rows to a CSV file, replacing any existing file.
///
/// Headers come from the row type's field names. An empty slice produces an
/// empty file.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "CSV table written");
    Ok(())
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes a cleaned dataset with its derived feature and total columns.
///
/// Numeric columns differ per dataset kind, so the header is built from the
/// table's schema.
pub fn write_clean_dataset(path: &Path, dataset: &CleanDataset) -> Result<()> {
    let with_district = dataset.has_column(DISTRICT_COLUMN);
    let total_column = dataset.kind.total_column();
    // a source total is superseded by the recomputed one
    let metrics: Vec<&str> = dataset
        .metric_columns()
        .into_iter()
        .filter(|c| *c != total_column)
        .collect();

    let mut header = vec!["date", "state"];
    if with_district {
        header.push(DISTRICT_COLUMN);
    }
    header.push("pincode");
    header.extend(metrics.iter().copied());
    header.extend([
        "year",
        "month",
        "quarter",
        "day_of_week",
        "month_name",
        "week",
        total_column,
    ]);

    let mut writer = WriterBuilder::new().from_path(path)?;
    writer.write_record(&header)?;

    for record in &dataset.records {
        let f = &record.features;
        let mut row = vec![record.date.to_string(), record.state.clone()];
        if with_district {
            row.push(record.district.clone().unwrap_or_default());
        }
        row.push(record.pincode.clone());
        row.extend(
            metrics
                .iter()
                .map(|c| cell(record.values.get(*c).copied().flatten())),
        );
        row.extend([
            f.year.to_string(),
            f.month.to_string(),
            f.quarter.to_string(),
            f.day_of_week.to_string(),
            f.month_name.to_string(),
            f.week.to_string(),
            record.total.to_string(),
        ]);
        writer.write_record(&row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = dataset.len(), "Cleaned dataset written");
    Ok(())
}

/// Writes every table of `report` as CSV plus `summary.json` into `dir`.
#[tracing::instrument(skip_all, fields(dir = %dir.display()))]
pub fn write_report(dir: &Path, report: &AnalysisReport) -> Result<()> {
    fs::create_dir_all(dir)?;

    for kind in DatasetKind::ALL {
        let name = kind.name();
        write_table(
            &dir.join(format!("{name}_trends.csv")),
            report.trends.get(kind),
        )?;
        write_table(
            &dir.join(format!("{name}_anomalies.csv")),
            report.anomalies.get(kind),
        )?;
        write_table(
            &dir.join(format!("{name}_states.csv")),
            report.state_totals.get(kind),
        )?;
    }

    write_table(&dir.join("enrolment_districts.csv"), &report.district_totals)?;
    write_table(&dir.join("district_deep_dive.csv"), &report.deep_dive)?;
    write_table(&dir.join("hotspots.csv"), &report.hotspots.spots)?;
    write_table(&dir.join("coldspots.csv"), &report.coldspots.spots)?;
    write_table(&dir.join("state_comparison.csv"), &report.comparison)?;
    write_table(&dir.join("youth_transition.csv"), &report.youth_transition)?;
    write_table(&dir.join("age_groups.csv"), &report.age_groups)?;
    write_table(&dir.join("monthly_totals.csv"), &report.monthly.totals)?;
    write_table(&dir.join("monthly_averages.csv"), &report.monthly.averages)?;
    write_table(&dir.join("weekday_pattern.csv"), &report.weekdays)?;

    let summary = serde_json::to_string_pretty(&report.summary())?;
    fs::write(dir.join("summary.json"), summary)?;

    info!("Report written");
    Ok(())
}
