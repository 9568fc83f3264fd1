//! State and district rollups, Pareto shares and hotspot selection.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::analyzers::types::{GroupTotal, Spot, SpotSelection};
use crate::analyzers::utility::{average_ranks, by_total_desc, percent, quantile};
use crate::cleaning::types::CleanDataset;
use crate::error::{PipelineError, Result};

type GroupKey = (String, Option<String>);

/// Sorts group sums descending, assigns dense ranks and Pareto percentages.
fn rank_groups(sums: BTreeMap<GroupKey, f64>) -> Vec<GroupTotal> {
    let mut groups: Vec<(GroupKey, f64)> = sums.into_iter().collect();
    groups.sort_by(|a, b| {
        by_total_desc((a.1, a.0.0.as_str()), (b.1, b.0.0.as_str())).then_with(|| a.0.1.cmp(&b.0.1))
    });

    let grand_total: f64 = groups.iter().map(|(_, t)| t).sum();
    let mut rank = 0;
    let mut previous: Option<f64> = None;
    let mut cumulative = 0.0;

    groups
        .into_iter()
        .map(|((state, district), total)| {
            if previous != Some(total) {
                rank += 1;
                previous = Some(total);
            }
            let pct_of_total = percent(total, grand_total);
            cumulative += pct_of_total.unwrap_or(0.0);
            GroupTotal {
                state,
                district,
                total,
                rank,
                pct_of_total,
                cumulative_pct: pct_of_total.map(|_| cumulative),
            }
        })
        .collect()
}

/// Sums `column` per state, ranked descending with Pareto shares.
pub fn state_aggregations(dataset: &CleanDataset, column: &str) -> Result<Vec<GroupTotal>> {
    let value = dataset.column(column)?;
    let mut sums: BTreeMap<GroupKey, f64> = BTreeMap::new();
    for record in &dataset.records {
        *sums.entry((record.state.clone(), None)).or_default() += value.get(record);
    }
    debug!(dataset = %dataset.kind, states = sums.len(), "State totals computed");
    Ok(rank_groups(sums))
}

/// Sums `column` per (state, district), ranked descending with Pareto shares.
///
/// # Errors
///
/// Fails when the dataset has no district column.
pub fn district_aggregations(dataset: &CleanDataset, column: &str) -> Result<Vec<GroupTotal>> {
    district_totals(dataset, column, |_| true)
}

/// District rollup limited to `states`, e.g. the weakest coldspots.
pub fn district_deep_dive(
    dataset: &CleanDataset,
    column: &str,
    states: &[String],
) -> Result<Vec<GroupTotal>> {
    let wanted: HashSet<&str> = states.iter().map(String::as_str).collect();
    district_totals(dataset, column, |state| wanted.contains(state))
}

fn district_totals(
    dataset: &CleanDataset,
    column: &str,
    include: impl Fn(&str) -> bool,
) -> Result<Vec<GroupTotal>> {
    dataset.require_district()?;
    let value = dataset.column(column)?;

    let mut sums: BTreeMap<GroupKey, f64> = BTreeMap::new();
    for record in dataset.records.iter().filter(|r| include(&r.state)) {
        *sums
            .entry((record.state.clone(), record.district.clone()))
            .or_default() += value.get(record);
    }
    debug!(dataset = %dataset.kind, districts = sums.len(), "District totals computed");
    Ok(rank_groups(sums))
}

fn check_percentile(percentile: f64) -> Result<()> {
    if (0.0..=100.0).contains(&percentile) {
        Ok(())
    } else {
        Err(PipelineError::InvalidParameter(format!(
            "percentile must be within 0..=100, got {percentile}"
        )))
    }
}

fn select_spots(
    groups: &[GroupTotal],
    percentile: f64,
    keep: impl Fn(f64, f64) -> bool,
    ascending: bool,
) -> Result<SpotSelection> {
    check_percentile(percentile)?;
    let totals: Vec<f64> = groups.iter().map(|g| g.total).collect();
    let Some(threshold) = quantile(&totals, percentile / 100.0) else {
        return Ok(SpotSelection {
            percentile,
            threshold: None,
            spots: Vec::new(),
        });
    };

    let selected: Vec<&GroupTotal> = groups.iter().filter(|g| keep(g.total, threshold)).collect();
    let selected_totals: Vec<f64> = selected.iter().map(|g| g.total).collect();
    let ranks = average_ranks(&selected_totals, ascending);

    let mut spots: Vec<Spot> = selected
        .into_iter()
        .zip(ranks)
        .map(|(g, spot_rank)| Spot {
            state: g.state.clone(),
            district: g.district.clone(),
            total: g.total,
            spot_rank,
        })
        .collect();
    spots.sort_by(|a, b| {
        a.spot_rank
            .total_cmp(&b.spot_rank)
            .then_with(|| a.state.cmp(&b.state))
            .then_with(|| a.district.cmp(&b.district))
    });

    Ok(SpotSelection {
        percentile,
        threshold: Some(threshold),
        spots,
    })
}

/// Groups at or above the `percentile`-th percentile of totals, largest first.
pub fn identify_hotspots(groups: &[GroupTotal], percentile: f64) -> Result<SpotSelection> {
    select_spots(groups, percentile, |total, threshold| total >= threshold, false)
}

/// Groups at or below the `percentile`-th percentile of totals, smallest first.
pub fn identify_coldspots(groups: &[GroupTotal], percentile: f64) -> Result<SpotSelection> {
    select_spots(groups, percentile, |total, threshold| total <= threshold, true)
}
