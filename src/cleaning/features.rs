//! Temporal features and recomputed totals.

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::cleaning::types::{
    AGE_COLUMNS, CleanDataset, CleanRecord, Dataset, Record, TemporalFeatures,
};
use crate::error::{PipelineError, Result};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[(month.clamp(1, 12) - 1) as usize]
}

impl TemporalFeatures {
    pub fn from_date(date: NaiveDate) -> Self {
        let month = date.month();
        TemporalFeatures {
            year: date.year(),
            month,
            quarter: (month - 1) / 3 + 1,
            day_of_week: date.weekday().num_days_from_monday(),
            month_name: month_name(month),
            week: date.iso_week().week(),
        }
    }
}

/// The source columns summed into a dataset's total.
///
/// # Errors
///
/// Enrolment tables must carry all three age brackets; update tables must
/// carry at least one column with their category prefix.
pub fn total_components(dataset: &Dataset) -> Result<Vec<String>> {
    match dataset.kind.update_prefix() {
        None => {
            for column in AGE_COLUMNS {
                if !dataset.has_column(column) {
                    return Err(PipelineError::missing_column(dataset.kind, column));
                }
            }
            Ok(AGE_COLUMNS.iter().map(|c| c.to_string()).collect())
        }
        Some(prefix) => {
            let columns: Vec<String> = dataset
                .columns
                .iter()
                .filter(|c| c.starts_with(prefix))
                .cloned()
                .collect();
            if columns.is_empty() {
                return Err(PipelineError::missing_column(
                    dataset.kind,
                    format!("{prefix}*"),
                ));
            }
            Ok(columns)
        }
    }
}

fn derive_record(record: &Record, components: &[String]) -> Option<CleanRecord> {
    let date = record.date?;
    let total = components
        .iter()
        .map(|c| record.values.get(c).copied().flatten().unwrap_or(0.0))
        .sum();

    Some(CleanRecord {
        date,
        state: record.state.clone()?,
        district: record.district.clone(),
        pincode: record.pincode.clone()?,
        values: record.values.clone(),
        features: TemporalFeatures::from_date(date),
        total,
    })
}

/// Derives calendar features and the dataset total for validated rows.
///
/// Any precomputed total in the source is ignored. Rows still lacking a date,
/// state or PIN are skipped.
pub fn derive_features(dataset: &Dataset) -> Result<CleanDataset> {
    let components = total_components(dataset)?;
    debug!(
        dataset = %dataset.kind,
        total_column = dataset.kind.total_column(),
        components = ?components,
        "Deriving features"
    );

    let records = dataset
        .records
        .iter()
        .filter_map(|r| derive_record(r, &components))
        .collect();

    Ok(CleanDataset {
        kind: dataset.kind,
        columns: dataset.columns.clone(),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::types::DatasetKind;
    use std::collections::BTreeMap;

    fn record(values: &[(&str, Option<f64>)]) -> Record {
        Record {
            date: NaiveDate::from_ymd_opt(2025, 3, 9),
            state: Some("Bihar".to_string()),
            district: Some("Patna".to_string()),
            pincode: Some("800001".to_string()),
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn dataset(kind: DatasetKind, columns: &[&str], records: Vec<Record>) -> Dataset {
        let mut all = vec!["date", "state", "district", "pincode"];
        all.extend_from_slice(columns);
        Dataset {
            kind,
            columns: all.into_iter().map(str::to_string).collect(),
            records,
        }
    }

    #[test]
    fn test_temporal_features() {
        // 2025-03-09 is a Sunday in ISO week 10
        let f = TemporalFeatures::from_date(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
        assert_eq!(f.year, 2025);
        assert_eq!(f.month, 3);
        assert_eq!(f.quarter, 1);
        assert_eq!(f.day_of_week, 6);
        assert_eq!(f.month_name, "March");
        assert_eq!(f.week, 10);
    }

    #[test]
    fn test_iso_week_at_year_boundary() {
        // 2024-12-30 is the Monday of ISO week 1 of 2025
        let f = TemporalFeatures::from_date(NaiveDate::from_ymd_opt(2024, 12, 30).unwrap());
        assert_eq!(f.week, 1);
        assert_eq!(f.day_of_week, 0);
        assert_eq!(f.quarter, 4);
        assert_eq!(f.year, 2024);
    }

    #[test]
    fn test_enrolment_total_ignores_source_total() {
        let ds = dataset(
            DatasetKind::Enrolment,
            &["age_0_5", "age_5_17", "age_18_greater", "total_enrolments"],
            vec![record(&[
                ("age_0_5", Some(3.0)),
                ("age_5_17", Some(4.0)),
                ("age_18_greater", None),
                ("total_enrolments", Some(999.0)),
            ])],
        );

        let clean = derive_features(&ds).unwrap();
        assert_eq!(clean.records[0].total, 7.0);
    }

    #[test]
    fn test_update_total_sums_prefixed_columns() {
        let ds = dataset(
            DatasetKind::Biometric,
            &["bio_age_5_17", "bio_age_17_", "total_updates"],
            vec![record(&[
                ("bio_age_5_17", Some(10.0)),
                ("bio_age_17_", Some(5.0)),
                ("total_updates", Some(1.0)),
            ])],
        );

        let clean = derive_features(&ds).unwrap();
        assert_eq!(clean.records[0].total, 15.0);
    }

    #[test]
    fn test_missing_age_column_is_schema_error() {
        let ds = dataset(DatasetKind::Enrolment, &["age_0_5", "age_5_17"], vec![]);
        let err = derive_features(&ds).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingColumn { ref column, .. } if column == "age_18_greater"
        ));
    }

    #[test]
    fn test_update_table_without_prefix_columns_is_schema_error() {
        let ds = dataset(DatasetKind::Demographic, &["bio_age_5_17"], vec![]);
        assert!(derive_features(&ds).is_err());
    }

    #[test]
    fn test_month_name_lookup() {
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(12), "December");
    }
}
