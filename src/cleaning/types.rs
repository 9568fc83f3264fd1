//! Table and record types flowing through the cleaning stages.
//!
//! Each stage consumes one of these tables by reference and returns a new one:
//! [`RawDataset`] (strings as loaded) -> [`Dataset`] (dates parsed) ->
//! [`CleanDataset`] (validated, normalized, features derived).

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub const DATE_COLUMN: &str = "date";
pub const STATE_COLUMN: &str = "state";
pub const DISTRICT_COLUMN: &str = "district";
pub const PINCODE_COLUMN: &str = "pincode";

/// Age-bracket columns summed into `total_enrolments`.
pub const AGE_COLUMNS: [&str; 3] = ["age_0_5", "age_5_17", "age_18_greater"];

/// The three published dataset families.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Enrolment,
    Demographic,
    Biometric,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 3] = [
        DatasetKind::Enrolment,
        DatasetKind::Demographic,
        DatasetKind::Biometric,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::Enrolment => "enrolment",
            DatasetKind::Demographic => "demographic",
            DatasetKind::Biometric => "biometric",
        }
    }

    /// Name of the derived total column for this kind.
    pub fn total_column(&self) -> &'static str {
        match self {
            DatasetKind::Enrolment => "total_enrolments",
            DatasetKind::Demographic | DatasetKind::Biometric => "total_updates",
        }
    }

    /// Column prefix grouping the update counts, `None` for enrolment.
    pub fn update_prefix(&self) -> Option<&'static str> {
        match self {
            DatasetKind::Enrolment => None,
            DatasetKind::Demographic => Some("demo"),
            DatasetKind::Biometric => Some("bio"),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A row exactly as read from the source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub date: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub pincode: Option<String>,
    pub values: BTreeMap<String, Option<f64>>,
}

impl RawRecord {
    /// Stable textual key over every field, used for duplicate detection.
    pub fn row_key(&self) -> String {
        let mut key = String::new();
        for field in [&self.date, &self.state, &self.district, &self.pincode] {
            key.push_str(field.as_deref().unwrap_or("\u{0}"));
            key.push('\u{1f}');
        }
        for (column, value) in &self.values {
            key.push_str(column);
            key.push('=');
            match value {
                Some(v) => key.push_str(&v.to_string()),
                None => key.push('\u{0}'),
            }
            key.push('\u{1f}');
        }
        key
    }
}

/// One dataset kind as loaded, before any cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDataset {
    pub kind: DatasetKind,
    /// Column names in source order.
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl RawDataset {
    pub fn new(kind: DatasetKind, columns: Vec<String>, records: Vec<RawRecord>) -> Self {
        RawDataset {
            kind,
            columns,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Concatenates tables of the same kind, unioning their columns in
    /// first-seen order.
    pub fn concat(kind: DatasetKind, parts: Vec<RawDataset>) -> Result<Self> {
        let mut columns: Vec<String> = Vec::new();
        let mut records = Vec::new();

        for part in parts {
            if part.kind != kind {
                return Err(PipelineError::WrongDatasetKind {
                    expected: kind,
                    found: part.kind,
                });
            }
            for column in part.columns {
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
            records.extend(part.records);
        }

        Ok(RawDataset::new(kind, columns, records))
    }
}

/// A row after date parsing. Any field may still be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub date: Option<NaiveDate>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub pincode: Option<String>,
    pub values: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub kind: DatasetKind,
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Returns a new table holding the records that pass `keep`.
    pub fn filtered(&self, keep: impl Fn(&Record) -> bool) -> Dataset {
        Dataset {
            kind: self.kind,
            columns: self.columns.clone(),
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

/// Calendar features derived from a record's date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemporalFeatures {
    pub year: i32,
    pub month: u32,
    pub quarter: u32,
    /// 0 = Monday .. 6 = Sunday.
    pub day_of_week: u32,
    pub month_name: &'static str,
    /// ISO week number.
    pub week: u32,
}

/// A fully validated row with derived features.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    pub date: NaiveDate,
    pub state: String,
    /// Present whenever the source schema has a district column.
    pub district: Option<String>,
    pub pincode: String,
    pub values: BTreeMap<String, Option<f64>>,
    pub features: TemporalFeatures,
    /// `total_enrolments` or `total_updates`, recomputed from sub-columns.
    pub total: f64,
}

impl CleanRecord {
    /// Value of a metric column, treating a missing cell as zero.
    pub fn metric(&self, column: &str) -> f64 {
        self.values.get(column).copied().flatten().unwrap_or(0.0)
    }
}

/// A numeric column selected for aggregation, resolved against a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueColumn {
    Total,
    Metric(String),
}

impl ValueColumn {
    pub fn get(&self, record: &CleanRecord) -> f64 {
        match self {
            ValueColumn::Total => record.total,
            ValueColumn::Metric(column) => record.metric(column),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanDataset {
    pub kind: DatasetKind,
    /// Source columns, as loaded.
    pub columns: Vec<String>,
    pub records: Vec<CleanRecord>,
}

impl CleanDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Numeric source columns, excluding the geography and date fields.
    pub fn metric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|c| ![DATE_COLUMN, STATE_COLUMN, DISTRICT_COLUMN, PINCODE_COLUMN].contains(c))
            .collect()
    }

    /// Resolves `column` to something aggregations can read.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingColumn`] when the column is neither the
    /// derived total nor a numeric source column.
    pub fn column(&self, column: &str) -> Result<ValueColumn> {
        if column == self.kind.total_column() {
            Ok(ValueColumn::Total)
        } else if self.metric_columns().contains(&column) {
            Ok(ValueColumn::Metric(column.to_string()))
        } else {
            Err(PipelineError::missing_column(self.kind, column))
        }
    }

    pub fn require_kind(&self, expected: DatasetKind) -> Result<()> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(PipelineError::WrongDatasetKind {
                expected,
                found: self.kind,
            })
        }
    }

    pub fn require_district(&self) -> Result<()> {
        if self.has_column(DISTRICT_COLUMN) {
            Ok(())
        } else {
            Err(PipelineError::missing_column(self.kind, DISTRICT_COLUMN))
        }
    }
}

/// Rows discarded during cleaning, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiscardTally {
    pub invalid_date: usize,
    pub invalid_pincode: usize,
    pub non_geographic_state: usize,
    pub missing_field: usize,
}

impl DiscardTally {
    pub fn total(&self) -> usize {
        self.invalid_date + self.invalid_pincode + self.non_geographic_state + self.missing_field
    }
}

/// Output of the cleaning pipeline for one raw table.
#[derive(Debug, Clone, PartialEq)]
pub struct CleaningResult {
    pub dataset: CleanDataset,
    pub raw_rows: usize,
    pub discards: DiscardTally,
}

impl CleaningResult {
    pub fn discarded(&self) -> usize {
        self.discards.total()
    }
}
