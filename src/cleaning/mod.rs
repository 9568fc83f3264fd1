//! Cleaning pipeline: date parsing, required-field validation, PIN
//! validation, state normalization and feature derivation.
//!
//! Every stage takes a table by reference and returns a new one, so stages
//! can be run and tested independently. [`clean`] chains them and keeps the
//! discard tally.

pub mod aliases;
pub mod features;
pub mod normalize;
pub mod types;
pub mod validate;

use tracing::{info, warn};

use crate::cleaning::aliases::StateAliases;
use crate::cleaning::types::{CleaningResult, DiscardTally, RawDataset};
use crate::error::Result;

/// Runs the full cleaning pipeline over one raw table.
///
/// Row-level defects are dropped and counted, never returned as errors.
///
/// # Errors
///
/// Fails when the table lacks the columns its dataset kind needs to compute
/// totals.
#[tracing::instrument(skip_all, fields(dataset = %raw.kind, rows = raw.len()))]
pub fn clean(raw: &RawDataset, aliases: &StateAliases) -> Result<CleaningResult> {
    let invalid_date = normalize::count_unparseable_dates(raw);

    let parsed = normalize::parse_dates(raw);
    let valid = validate::remove_invalid_records(&parsed);
    let dropped_by_validator = parsed.len() - valid.len();

    let pinned = normalize::validate_pincode(&valid);
    let invalid_pincode = valid.len() - pinned.len();

    let normalized = normalize::normalize_state_names(&pinned, aliases);
    let non_geographic_state = pinned.len() - normalized.len();

    let dataset = features::derive_features(&normalized)?;

    let discards = DiscardTally {
        invalid_date,
        invalid_pincode,
        non_geographic_state,
        missing_field: dropped_by_validator.saturating_sub(invalid_date),
    };

    if discards.total() > 0 {
        warn!(
            invalid_date = discards.invalid_date,
            invalid_pincode = discards.invalid_pincode,
            non_geographic_state = discards.non_geographic_state,
            missing_field = discards.missing_field,
            "Rows discarded during cleaning"
        );
    }
    info!(kept = dataset.len(), discarded = discards.total(), "Dataset cleaned");

    Ok(CleaningResult {
        dataset,
        raw_rows: raw.len(),
        discards,
    })
}
