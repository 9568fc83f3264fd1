use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::cleaning::types::{
    DATE_COLUMN, DISTRICT_COLUMN, PINCODE_COLUMN, RawDataset, RawRecord, STATE_COLUMN,
};

/// Completeness and duplication figures for a raw table, taken before cleaning.
#[derive(Debug, Default, Serialize)]
pub struct DataQualityReport {
    pub name: String,
    pub total_rows: usize,
    pub total_columns: usize,

    // per-column completeness, keyed by column name
    pub missing_values: BTreeMap<String, usize>,
    pub missing_pct: BTreeMap<String, f64>,

    /// Rows identical to an earlier row in every column.
    pub duplicates: usize,
}

fn is_missing(record: &RawRecord, column: &str) -> bool {
    match column {
        DATE_COLUMN => record.date.is_none(),
        STATE_COLUMN => record.state.is_none(),
        DISTRICT_COLUMN => record.district.is_none(),
        PINCODE_COLUMN => record.pincode.is_none(),
        other => !matches!(record.values.get(other), Some(Some(_))),
    }
}

impl DataQualityReport {
    pub fn from_dataset(raw: &RawDataset) -> Self {
        let mut s = DataQualityReport {
            name: raw.kind.name().to_string(),
            total_rows: raw.len(),
            total_columns: raw.columns.len(),
            ..Default::default()
        };

        for column in &raw.columns {
            let missing = raw.records.iter().filter(|r| is_missing(r, column)).count();
            s.missing_values.insert(column.clone(), missing);
            s.missing_pct
                .insert(column.clone(), Self::pct(missing, s.total_rows));
        }

        let mut seen = HashSet::with_capacity(raw.len());
        s.duplicates = raw
            .records
            .iter()
            .filter(|r| !seen.insert(r.row_key()))
            .count();

        s
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Total missing cells across all columns.
    pub fn missing_cells(&self) -> usize {
        self.missing_values.values().sum()
    }
}

/// Quality figures for `raw`, named after its dataset kind.
pub fn quality_report(raw: &RawDataset) -> DataQualityReport {
    DataQualityReport::from_dataset(raw)
}
