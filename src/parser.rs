//! CSV reader for enrolment and update extracts.

use std::io::Read;

use tracing::debug;

use crate::cleaning::types::{
    DATE_COLUMN, DISTRICT_COLUMN, DatasetKind, PINCODE_COLUMN, RawDataset, RawRecord,
    STATE_COLUMN,
};
use crate::error::{PipelineError, Result};

/// Columns every extract must carry. `district` is optional.
pub const KEY_COLUMNS: [&str; 3] = [DATE_COLUMN, STATE_COLUMN, PINCODE_COLUMN];

fn text_cell(cell: &str) -> Option<String> {
    (!cell.is_empty()).then(|| cell.to_string())
}

fn numeric_cell(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Reads one CSV table of `kind`.
///
/// Empty cells become missing values. Every column other than the key
/// columns is read as a number; cells that do not parse are missing.
///
/// # Errors
///
/// Returns an error if the CSV is malformed or a key column is absent.
pub fn parse_table<R: Read>(kind: DatasetKind, reader: R) -> Result<RawDataset> {
    let mut rdr = csv::ReaderBuilder::new().flexible(false).from_reader(reader);
    let columns: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    for key in KEY_COLUMNS {
        if !columns.iter().any(|c| c == key) {
            return Err(PipelineError::missing_column(kind, key));
        }
    }

    let mut records = Vec::new();
    let mut unparsed = 0usize;
    for row in rdr.records() {
        let row = row?;
        let mut record = RawRecord::default();
        for (column, cell) in columns.iter().zip(row.iter()) {
            match column.as_str() {
                DATE_COLUMN => record.date = text_cell(cell),
                STATE_COLUMN => record.state = text_cell(cell),
                DISTRICT_COLUMN => record.district = text_cell(cell),
                PINCODE_COLUMN => record.pincode = text_cell(cell),
                other => {
                    let value = numeric_cell(cell);
                    if value.is_none() && !cell.trim().is_empty() {
                        unparsed += 1;
                    }
                    record.values.insert(other.to_string(), value);
                }
            }
        }
        records.push(record);
    }

    debug!(
        dataset = %kind,
        rows = records.len(),
        columns = columns.len(),
        unparsed,
        "CSV table parsed"
    );
    Ok(RawDataset::new(kind, columns, records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_body_keeps_header() {
        let raw = parse_table(
            DatasetKind::Enrolment,
            "date,state,district,pincode,age_0_5\n".as_bytes(),
        )
        .unwrap();
        assert!(raw.is_empty());
        assert_eq!(raw.columns.len(), 5);
        assert!(raw.has_column("district"));
    }

    #[test]
    fn test_parse_rows_with_missing_cells() {
        let csv = "date,state,district,pincode,demo_age_5_17,demo_age_17_\n\
                   01-03-2025,Goa,North Goa,403001,4,6\n\
                   ,Goa,,403001,,x\n";
        let raw = parse_table(DatasetKind::Demographic, csv.as_bytes()).unwrap();

        assert_eq!(raw.len(), 2);
        let first = &raw.records[0];
        assert_eq!(first.date.as_deref(), Some("01-03-2025"));
        assert_eq!(first.district.as_deref(), Some("North Goa"));
        assert_eq!(first.values["demo_age_17_"], Some(6.0));

        let second = &raw.records[1];
        assert_eq!(second.date, None);
        assert_eq!(second.district, None);
        assert_eq!(second.values["demo_age_5_17"], None);
        assert_eq!(second.values["demo_age_17_"], None);
    }

    #[test]
    fn test_text_cells_are_not_trimmed() {
        let csv = "date,state,pincode,bio_age_5_17\n01-03-2025, Goa ,403001 ,2\n";
        let raw = parse_table(DatasetKind::Biometric, csv.as_bytes()).unwrap();
        assert_eq!(raw.records[0].state.as_deref(), Some(" Goa "));
        assert_eq!(raw.records[0].pincode.as_deref(), Some("403001 "));
    }

    #[test]
    fn test_missing_key_column_is_schema_error() {
        let err = parse_table(DatasetKind::Enrolment, "date,district\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingColumn { ref column, .. } if column == "state"
        ));
    }

    #[test]
    fn test_ragged_row_is_an_error() {
        let csv = "date,state,pincode\n01-03-2025,Goa\n";
        assert!(matches!(
            parse_table(DatasetKind::Biometric, csv.as_bytes()),
            Err(PipelineError::Csv(_))
        ));
    }
}
