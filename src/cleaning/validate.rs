//! Required-field filter.

use crate::cleaning::types::{
    DATE_COLUMN, DISTRICT_COLUMN, Dataset, PINCODE_COLUMN, Record, STATE_COLUMN,
};

/// Columns that must be non-null when the schema carries them.
pub const REQUIRED_COLUMNS: [&str; 4] = [DATE_COLUMN, STATE_COLUMN, DISTRICT_COLUMN, PINCODE_COLUMN];

/// Required columns actually present in this table's schema.
pub fn required_columns(dataset: &Dataset) -> Vec<&'static str> {
    REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| dataset.has_column(c))
        .collect()
}

fn has_value(record: &Record, column: &str) -> bool {
    match column {
        DATE_COLUMN => record.date.is_some(),
        STATE_COLUMN => record.state.is_some(),
        DISTRICT_COLUMN => record.district.is_some(),
        PINCODE_COLUMN => record.pincode.is_some(),
        _ => true,
    }
}

/// Drops rows with a null in any required column present in the schema.
pub fn remove_invalid_records(dataset: &Dataset) -> Dataset {
    let required = required_columns(dataset);
    dataset.filtered(|r| required.iter().all(|c| has_value(r, c)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::types::DatasetKind;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn record(date: bool, state: bool, district: bool, pincode: bool) -> Record {
        Record {
            date: date.then(|| NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()),
            state: state.then(|| "Kerala".to_string()),
            district: district.then(|| "Ernakulam".to_string()),
            pincode: pincode.then(|| "682001".to_string()),
            values: BTreeMap::new(),
        }
    }

    #[test]
    fn test_drops_rows_missing_any_required_field() {
        let ds = Dataset {
            kind: DatasetKind::Enrolment,
            columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            records: vec![
                record(true, true, true, true),
                record(false, true, true, true),
                record(true, false, true, true),
                record(true, true, false, true),
                record(true, true, true, false),
            ],
        };

        let valid = remove_invalid_records(&ds);
        assert_eq!(valid.len(), 1);
        assert_eq!(ds.len(), 5);
    }

    #[test]
    fn test_only_checks_columns_in_schema() {
        let ds = Dataset {
            kind: DatasetKind::Biometric,
            columns: vec!["date".into(), "state".into(), "pincode".into()],
            records: vec![record(true, true, false, true), record(true, false, false, true)],
        };

        assert_eq!(required_columns(&ds), vec!["date", "state", "pincode"]);
        let valid = remove_invalid_records(&ds);
        assert_eq!(valid.len(), 1);
        assert!(valid.records[0].district.is_none());
    }
}
