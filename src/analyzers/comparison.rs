//! Cross-dataset joins on state name.

use std::collections::BTreeMap;

use tracing::debug;

use crate::analyzers::types::{StateComparison, YouthTransition};
use crate::analyzers::utility::{by_total_desc, ratio};
use crate::cleaning::types::{CleanDataset, DatasetKind};
use crate::error::Result;

fn sums_by_state(dataset: &CleanDataset, column: &str) -> Result<BTreeMap<String, f64>> {
    let value = dataset.column(column)?;
    let mut sums = BTreeMap::new();
    for record in &dataset.records {
        *sums.entry(record.state.clone()).or_default() += value.get(record);
    }
    Ok(sums)
}

/// Outer-joins per-state totals of several tables. A slot is `None` when the
/// state is absent from that table.
fn outer_join<const N: usize>(
    sides: [BTreeMap<String, f64>; N],
) -> BTreeMap<String, [Option<f64>; N]> {
    let mut joined: BTreeMap<String, [Option<f64>; N]> = BTreeMap::new();
    for (i, side) in sides.into_iter().enumerate() {
        for (state, total) in side {
            joined.entry(state).or_insert([None; N])[i] = Some(total);
        }
    }
    joined
}

/// Ratio against a zero-filled denominator; undefined when the numerator
/// table has no rows for the state or the denominator is zero.
fn joined_ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    ratio(numerator?, denominator.unwrap_or(0.0))
}

/// Per-state enrolments against demographic and biometric updates.
///
/// Missing totals are zero-filled. Ratios are undefined for states with no
/// enrolments and for states absent from the update table. Sorted by total
/// activity, largest first.
///
/// # Errors
///
/// Fails when a table is passed in the wrong position.
#[tracing::instrument(skip_all)]
pub fn comparative_state_metrics(
    enrolment: &CleanDataset,
    demographic: &CleanDataset,
    biometric: &CleanDataset,
) -> Result<Vec<StateComparison>> {
    enrolment.require_kind(DatasetKind::Enrolment)?;
    demographic.require_kind(DatasetKind::Demographic)?;
    biometric.require_kind(DatasetKind::Biometric)?;

    let joined = outer_join([
        sums_by_state(enrolment, DatasetKind::Enrolment.total_column())?,
        sums_by_state(demographic, DatasetKind::Demographic.total_column())?,
        sums_by_state(biometric, DatasetKind::Biometric.total_column())?,
    ]);

    let mut rows: Vec<StateComparison> = joined
        .into_iter()
        .map(|(state, [enrol, demo, bio])| {
            let enrolments = enrol.unwrap_or(0.0);
            let demo_updates = demo.unwrap_or(0.0);
            let bio_updates = bio.unwrap_or(0.0);
            StateComparison {
                state,
                enrolments,
                demo_updates,
                bio_updates,
                demo_to_enrol_ratio: joined_ratio(demo, enrol),
                bio_to_enrol_ratio: joined_ratio(bio, enrol),
                total_activity: enrolments + demo_updates + bio_updates,
            }
        })
        .collect();

    rows.sort_by(|a, b| by_total_desc((a.total_activity, a.state.as_str()), (b.total_activity, b.state.as_str())));
    debug!(states = rows.len(), "State comparison built");
    Ok(rows)
}

/// School-age enrolments against school-age biometric updates per state.
///
/// Missing counts are zero-filled, so the ratio is undefined only for states
/// without school-age enrolments. Sorted by transition ratio descending;
/// states without a ratio go last.
pub fn youth_transition_analysis(
    enrolment: &CleanDataset,
    biometric: &CleanDataset,
) -> Result<Vec<YouthTransition>> {
    enrolment.require_kind(DatasetKind::Enrolment)?;
    biometric.require_kind(DatasetKind::Biometric)?;

    let joined = outer_join([
        sums_by_state(enrolment, "age_5_17")?,
        sums_by_state(biometric, "bio_age_5_17")?,
    ]);

    let mut rows: Vec<YouthTransition> = joined
        .into_iter()
        .map(|(state, [enrol, bio])| {
            let youth_enrolments = enrol.unwrap_or(0.0);
            let youth_bio_updates = bio.unwrap_or(0.0);
            YouthTransition {
                state,
                youth_enrolments,
                youth_bio_updates,
                transition_ratio: ratio(youth_bio_updates, youth_enrolments),
            }
        })
        .collect();

    rows.sort_by(|a, b| match (a.transition_ratio, b.transition_ratio) {
        (Some(x), Some(y)) => y.total_cmp(&x).then_with(|| a.state.cmp(&b.state)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.state.cmp(&b.state),
    });
    Ok(rows)
}
