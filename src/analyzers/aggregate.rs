use std::collections::BTreeMap;

use chrono::{Datelike, Days, Months, NaiveDate};
use tracing::debug;

use crate::analyzers::types::{Granularity, TrendPoint};
use crate::analyzers::utility::{mean, percent};
use crate::cleaning::types::CleanDataset;
use crate::error::Result;

/// Trailing window lengths, in buckets, for the two rolling means.
const SHORT_WINDOW: usize = 7;
const LONG_WINDOW: usize = 30;

/// First day of the bucket containing `date`.
pub fn bucket_start(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    match granularity {
        Granularity::Day => date,
        Granularity::Week => {
            date - Days::new(u64::from(date.weekday().num_days_from_monday()))
        }
        Granularity::Month => date.with_day(1).unwrap_or(date),
    }
}

fn next_bucket(bucket: NaiveDate, granularity: Granularity) -> Option<NaiveDate> {
    match granularity {
        Granularity::Day => bucket.checked_add_days(Days::new(1)),
        Granularity::Week => bucket.checked_add_days(Days::new(7)),
        Granularity::Month => bucket.checked_add_months(Months::new(1)),
    }
}

/// Last day of the bucket starting at `bucket`.
pub fn bucket_end(bucket: NaiveDate, granularity: Granularity) -> NaiveDate {
    next_bucket(bucket, granularity)
        .and_then(|next| next.pred_opt())
        .unwrap_or(bucket)
}

/// Mean of the last `window` values ending at `idx`, using as many as exist.
fn trailing_mean(values: &[f64], idx: usize, window: usize) -> f64 {
    let start = (idx + 1).saturating_sub(window);
    mean(&values[start..=idx])
}

/// Derives rolling means, percent change and running total for bucket sums.
///
/// `buckets` must be sorted by time with no duplicates.
pub fn build_series(buckets: &[(NaiveDate, f64)]) -> Vec<TrendPoint> {
    let totals: Vec<f64> = buckets.iter().map(|(_, t)| *t).collect();
    let mut cumulative = 0.0;

    buckets
        .iter()
        .enumerate()
        .map(|(i, &(bucket, total))| {
            cumulative += total;
            let pct_change = if i == 0 {
                None
            } else {
                percent(total - totals[i - 1], totals[i - 1])
            };
            TrendPoint {
                bucket,
                total,
                rolling_7d: trailing_mean(&totals, i, SHORT_WINDOW),
                rolling_30d: trailing_mean(&totals, i, LONG_WINDOW),
                pct_change,
                cumulative,
            }
        })
        .collect()
}

/// Sums `column` per time bucket and derives the trend columns.
///
/// Buckets between the first and last observed ones are present with a zero
/// total when nothing happened in them.
///
/// # Errors
///
/// Fails when `column` is not a numeric column of the dataset.
#[tracing::instrument(skip(dataset), fields(dataset = %dataset.kind))]
pub fn temporal_trends(
    dataset: &CleanDataset,
    column: &str,
    granularity: Granularity,
) -> Result<Vec<TrendPoint>> {
    let value = dataset.column(column)?;

    let mut sums: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in &dataset.records {
        *sums
            .entry(bucket_start(record.date, granularity))
            .or_default() += value.get(record);
    }

    let (Some(&first), Some(&last)) = (sums.keys().next(), sums.keys().next_back()) else {
        return Ok(Vec::new());
    };

    let mut buckets = Vec::with_capacity(sums.len());
    let mut cursor = Some(first);
    while let Some(bucket) = cursor.filter(|b| *b <= last) {
        buckets.push((bucket, sums.get(&bucket).copied().unwrap_or(0.0)));
        cursor = next_bucket(bucket, granularity);
    }

    debug!(
        observed = sums.len(),
        buckets = buckets.len(),
        first = %first,
        last = %last,
        "Temporal buckets built"
    );

    Ok(build_series(&buckets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::types::{CleanRecord, DatasetKind, TemporalFeatures};
    use crate::error::PipelineError;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn record(date: NaiveDate, total: f64) -> CleanRecord {
        CleanRecord {
            date,
            state: "Goa".to_string(),
            district: None,
            pincode: "403001".to_string(),
            values: [("age_0_5".to_string(), Some(total))].into_iter().collect(),
            features: TemporalFeatures::from_date(date),
            total,
        }
    }

    fn dataset(records: Vec<CleanRecord>) -> CleanDataset {
        CleanDataset {
            kind: DatasetKind::Enrolment,
            columns: ["date", "state", "pincode", "age_0_5", "age_5_17", "age_18_greater"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            records,
        }
    }

    #[test]
    fn test_daily_sums_are_ordered_and_zero_filled() {
        let ds = dataset(vec![
            record(day(3), 5.0),
            record(day(1), 10.0),
            record(day(1), 2.0),
        ]);

        let series = temporal_trends(&ds, "total_enrolments", Granularity::Day).unwrap();
        let buckets: Vec<_> = series.iter().map(|p| (p.bucket, p.total)).collect();

        assert_eq!(buckets, vec![(day(1), 12.0), (day(2), 0.0), (day(3), 5.0)]);
    }

    #[test]
    fn test_trend_columns() {
        let series = build_series(&[(day(1), 10.0), (day(2), 20.0), (day(3), 0.0), (day(4), 5.0)]);

        assert_eq!(series[0].pct_change, None);
        assert_eq!(series[1].pct_change, Some(100.0));
        assert_eq!(series[2].pct_change, Some(-100.0));
        // previous bucket was zero
        assert_eq!(series[3].pct_change, None);

        assert_eq!(series[0].rolling_7d, 10.0);
        assert_eq!(series[1].rolling_7d, 15.0);
        assert_eq!(series[3].rolling_30d, 8.75);
        assert_eq!(series[3].cumulative, 35.0);
    }

    #[test]
    fn test_rolling_window_is_trailing() {
        let buckets: Vec<_> = (1..=8).map(|d| (day(d), d as f64)).collect();
        let series = build_series(&buckets);
        // last 7 of 1..=8 is 2..=8
        assert_eq!(series[7].rolling_7d, 5.0);
        assert_eq!(series[7].rolling_30d, 4.5);
    }

    #[test]
    fn test_weekly_and_monthly_buckets() {
        // 2025-01-01 is a Wednesday
        assert_eq!(bucket_start(day(1), Granularity::Week), NaiveDate::from_ymd_opt(2024, 12, 30).unwrap());
        assert_eq!(bucket_start(day(19), Granularity::Month), day(1));

        let ds = dataset(vec![
            record(day(2), 1.0),
            record(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(), 4.0),
        ]);
        let series = temporal_trends(&ds, "total_enrolments", Granularity::Month).unwrap();
        let totals: Vec<_> = series.iter().map(|p| p.total).collect();
        assert_eq!(totals, vec![1.0, 0.0, 4.0]);
        assert_eq!(series[1].bucket, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
    }

    #[test]
    fn test_bucket_end() {
        assert_eq!(bucket_end(day(6), Granularity::Day), day(6));
        assert_eq!(bucket_end(day(6), Granularity::Week), day(12));
        assert_eq!(
            bucket_end(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), Granularity::Month),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn test_metric_column_and_unknown_column() {
        let ds = dataset(vec![record(day(1), 3.0)]);
        let series = temporal_trends(&ds, "age_0_5", Granularity::Day).unwrap();
        assert_eq!(series[0].total, 3.0);

        let err = temporal_trends(&ds, "total_updates", Granularity::Day).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { .. }));
    }

    #[test]
    fn test_empty_dataset_gives_empty_series() {
        let series = temporal_trends(&dataset(vec![]), "total_enrolments", Granularity::Day).unwrap();
        assert!(series.is_empty());
    }
}
