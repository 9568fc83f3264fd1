//! Per-column cleaning rules: dates, PIN codes and state names.

use chrono::NaiveDate;
use tracing::debug;

use crate::cleaning::aliases::StateAliases;
use crate::cleaning::types::{Dataset, RawDataset, Record};

/// Source date layout, `DD-MM-YYYY`.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Parses a `DD-MM-YYYY` date. Anything else, including `YYYY/MM/DD` and
/// impossible calendar dates, yields `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[2] == b'-'
        && bytes[5] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
    if !shape_ok {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

/// Converts every raw date string, nulling the ones that do not parse.
pub fn parse_dates(raw: &RawDataset) -> Dataset {
    let records: Vec<Record> = raw
        .records
        .iter()
        .map(|r| Record {
            date: r.date.as_deref().and_then(parse_date),
            state: r.state.clone(),
            district: r.district.clone(),
            pincode: r.pincode.clone(),
            values: r.values.clone(),
        })
        .collect();

    debug!(
        dataset = %raw.kind,
        rows = records.len(),
        nulled = records.iter().filter(|r| r.date.is_none()).count(),
        "Dates parsed"
    );

    Dataset {
        kind: raw.kind,
        columns: raw.columns.clone(),
        records,
    }
}

/// Number of rows whose date is present but not in the expected layout.
pub fn count_unparseable_dates(raw: &RawDataset) -> usize {
    raw.records
        .iter()
        .filter(|r| matches!(r.date.as_deref(), Some(d) if parse_date(d).is_none()))
        .count()
}

/// True when the trimmed value is exactly six ASCII digits.
pub fn is_valid_pincode(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.len() == 6 && trimmed.bytes().all(|b| b.is_ascii_digit())
}

/// Keeps only rows with a valid PIN code, storing the trimmed value.
///
/// This is a row filter: downstream geography needs a real PIN.
pub fn validate_pincode(dataset: &Dataset) -> Dataset {
    let records = dataset
        .records
        .iter()
        .filter_map(|r| {
            let pin = r.pincode.as_deref()?;
            is_valid_pincode(pin).then(|| Record {
                pincode: Some(pin.trim().to_string()),
                ..r.clone()
            })
        })
        .collect();

    Dataset {
        kind: dataset.kind,
        columns: dataset.columns.clone(),
        records,
    }
}

/// Sentinel tokens like `"100000"` that carry no geography.
pub fn is_numeric_token(raw: &str) -> bool {
    !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit())
}

/// Upper-cases the first letter of every alphabetic run and lower-cases the rest.
///
/// `"andhra pradesh"` becomes `"Andhra Pradesh"`, `"WestBENGAL"` becomes
/// `"Westbengal"`, and `"o'neil"` becomes `"O'Neil"`.
///
/// Runs are split on any non-alphabetic character, not on uncased ones. A
/// letter after an uncased alphabetic character such as a CJK ideograph stays
/// lower-case, so `"東京tokyo"` is left as is where a cased-character rule
/// would give `"東京Tokyo"`.
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_alpha = false;
    for c in raw.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Canonical spelling of a raw state token, or `None` for numeric garbage.
///
/// The alias table is consulted before and after title-casing. Both passes
/// matter: some keys only match the raw spelling, others only the
/// title-cased one.
pub fn canonical_state(raw: &str, aliases: &StateAliases) -> Option<String> {
    if is_numeric_token(raw) {
        return None;
    }
    let first = aliases.resolve(raw.trim().to_string());
    Some(aliases.resolve(title_case(&first)))
}

/// Drops numeric state tokens and canonicalizes the rest.
pub fn normalize_state_names(dataset: &Dataset, aliases: &StateAliases) -> Dataset {
    let records = dataset
        .records
        .iter()
        .filter_map(|r| {
            let state = canonical_state(r.state.as_deref()?, aliases)?;
            Some(Record {
                state: Some(state),
                ..r.clone()
            })
        })
        .collect();

    Dataset {
        kind: dataset.kind,
        columns: dataset.columns.clone(),
        records,
    }
}
