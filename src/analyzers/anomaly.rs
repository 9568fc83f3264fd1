//! Outlier flags for a single numeric column of a series.
//!
//! Two independent methods are offered. They routinely disagree, so callers
//! pick one per analysis through [`AnomalyMethod`]; results are never merged.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::analyzers::aggregate::bucket_end;
use crate::analyzers::types::{
    AnnotatedPoint, AnomalyCategory, AnomalyFlag, AnomalySummary, Granularity, TrendPoint,
};
use crate::analyzers::utility::{mean, quantile, stddev};

pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 3.0;

/// Detection method and its tuning parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum AnomalyMethod {
    Iqr { multiplier: f64 },
    ZScore { threshold: f64 },
}

impl Default for AnomalyMethod {
    fn default() -> Self {
        AnomalyMethod::Iqr {
            multiplier: DEFAULT_IQR_MULTIPLIER,
        }
    }
}

/// Quartiles and the fences derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IqrOutcome {
    /// `None` when the column has no values.
    pub bounds: Option<IqrBounds>,
    pub flags: Vec<AnomalyFlag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZScoreOutcome {
    pub mean: f64,
    pub std_dev: f64,
    pub flags: Vec<AnomalyFlag>,
}

/// Flags values outside `[Q1 - m*IQR, Q3 + m*IQR]`.
///
/// Quartiles use linear interpolation between order statistics and ignore
/// missing values; a missing value is always `normal`.
pub fn detect_iqr(values: &[Option<f64>], multiplier: f64) -> IqrOutcome {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let (Some(q1), Some(q3)) = (quantile(&present, 0.25), quantile(&present, 0.75)) else {
        return IqrOutcome {
            bounds: None,
            flags: values.iter().map(|_| AnomalyFlag::normal(None)).collect(),
        };
    };

    let iqr = q3 - q1;
    let bounds = IqrBounds {
        q1,
        q3,
        iqr,
        lower: q1 - multiplier * iqr,
        upper: q3 + multiplier * iqr,
    };

    let flags = values
        .iter()
        .map(|value| match value {
            Some(v) if *v < bounds.lower => AnomalyFlag {
                is_anomaly: true,
                category: AnomalyCategory::Low,
                score: None,
            },
            Some(v) if *v > bounds.upper => AnomalyFlag {
                is_anomaly: true,
                category: AnomalyCategory::High,
                score: None,
            },
            _ => AnomalyFlag::normal(None),
        })
        .collect();

    IqrOutcome {
        bounds: Some(bounds),
        flags,
    }
}

/// Flags values whose absolute z-score exceeds `threshold`.
///
/// Missing values are scored as zero rather than skipped. On sparse series
/// this drags the mean down and inflates scores for the observed values, so
/// treat flags on gappy input with care.
///
/// A zero-variance column has no defined z-scores and yields no anomalies.
pub fn detect_zscore(values: &[Option<f64>], threshold: f64) -> ZScoreOutcome {
    let filled: Vec<f64> = values.iter().map(|v| v.unwrap_or(0.0)).collect();
    let m = mean(&filled);
    let sd = stddev(&filled, m);
    let constant = filled.windows(2).all(|w| w[0] == w[1]);

    let flags = filled
        .iter()
        .map(|v| {
            if constant || sd == 0.0 {
                return AnomalyFlag::normal(None);
            }
            let z = (v - m) / sd;
            if z.abs() > threshold {
                AnomalyFlag {
                    is_anomaly: true,
                    category: if z < 0.0 {
                        AnomalyCategory::Low
                    } else {
                        AnomalyCategory::High
                    },
                    score: Some(z.abs()),
                }
            } else {
                AnomalyFlag::normal(Some(z.abs()))
            }
        })
        .collect();

    ZScoreOutcome {
        mean: m,
        std_dev: sd,
        flags,
    }
}

/// Runs the chosen method over `values`.
pub fn detect(values: &[Option<f64>], method: AnomalyMethod) -> Vec<AnomalyFlag> {
    match method {
        AnomalyMethod::Iqr { multiplier } => detect_iqr(values, multiplier).flags,
        AnomalyMethod::ZScore { threshold } => detect_zscore(values, threshold).flags,
    }
}

/// Flags the bucket totals of a temporal series.
pub fn annotate_trends(series: &[TrendPoint], method: AnomalyMethod) -> Vec<AnnotatedPoint> {
    let values: Vec<Option<f64>> = series.iter().map(|p| Some(p.total)).collect();
    series
        .iter()
        .zip(detect(&values, method))
        .map(|(point, flag)| AnnotatedPoint {
            bucket: point.bucket,
            total: point.total,
            is_anomaly: flag.is_anomaly,
            category: flag.category,
            score: flag.score,
        })
        .collect()
}

/// Counts flagged buckets by direction and how many cover a month end.
///
/// A bucket covers a month end when its last day closes a month or the bucket
/// spans into the next month. Every monthly bucket does; a weekly one does when
/// it straddles the boundary.
pub fn summarize_anomalies(
    points: &[AnnotatedPoint],
    granularity: Granularity,
) -> AnomalySummary {
    let mut summary = AnomalySummary::default();
    for point in points.iter().filter(|p| p.is_anomaly) {
        summary.total_anomalies += 1;
        match point.category {
            AnomalyCategory::High => summary.high += 1,
            AnomalyCategory::Low => summary.low += 1,
            AnomalyCategory::Normal => {}
        }
        let is_month_end = bucket_end(point.bucket, granularity)
            .succ_opt()
            .is_some_and(|next| next.month() != point.bucket.month());
        if is_month_end {
            summary.month_end_count += 1;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::aggregate::build_series;
    use chrono::NaiveDate;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_iqr_flags_single_spike() {
        let outcome = detect_iqr(&some(&[10.0, 10.0, 10.0, 10.0, 10.0, 100.0]), 1.5);

        let categories: Vec<_> = outcome.flags.iter().map(|f| f.category).collect();
        assert_eq!(
            categories,
            vec![
                AnomalyCategory::Normal,
                AnomalyCategory::Normal,
                AnomalyCategory::Normal,
                AnomalyCategory::Normal,
                AnomalyCategory::Normal,
                AnomalyCategory::High,
            ]
        );
        assert!(outcome.flags[5].is_anomaly);
        let bounds = outcome.bounds.unwrap();
        assert_eq!((bounds.q1, bounds.q3, bounds.iqr), (10.0, 10.0, 0.0));
    }

    #[test]
    fn test_iqr_bounds_use_linear_interpolation() {
        let outcome = detect_iqr(&some(&[1.0, 2.0, 3.0, 4.0, -20.0, 30.0]), 1.5);
        let bounds = outcome.bounds.unwrap();
        // sorted: -20 1 2 3 4 30; Q1 at 1.25 -> 1.25, Q3 at 3.75 -> 3.75
        assert_eq!(bounds.q1, 1.25);
        assert_eq!(bounds.q3, 3.75);
        assert_eq!(bounds.lower, -2.5);
        assert_eq!(bounds.upper, 7.5);
        assert_eq!(outcome.flags[4].category, AnomalyCategory::Low);
        assert_eq!(outcome.flags[5].category, AnomalyCategory::High);
        assert_eq!(outcome.flags[0].category, AnomalyCategory::Normal);
    }

    #[test]
    fn test_iqr_missing_values_are_normal() {
        let values = [Some(1.0), None, Some(1.0), Some(1.0), Some(1.0), Some(50.0)];
        let outcome = detect_iqr(&values, 1.5);
        assert_eq!(outcome.flags.len(), 6);
        assert!(!outcome.flags[1].is_anomaly);
        assert!(outcome.flags[5].is_anomaly);
    }

    #[test]
    fn test_empty_series_gives_empty_result() {
        let iqr = detect_iqr(&[], 1.5);
        assert!(iqr.flags.is_empty());
        assert!(iqr.bounds.is_none());
        assert!(detect_zscore(&[], 3.0).flags.is_empty());
        assert!(annotate_trends(&[], AnomalyMethod::default()).is_empty());
    }

    #[test]
    fn test_zscore_constant_column_has_no_anomalies() {
        for threshold in [0.0, 0.5, 3.0] {
            let outcome = detect_zscore(&some(&[0.1, 0.1, 0.1, 0.1]), threshold);
            assert!(outcome.flags.iter().all(|f| !f.is_anomaly));
            assert!(outcome.flags.iter().all(|f| f.score.is_none()));
        }
    }

    #[test]
    fn test_zscore_flags_outlier() {
        let mut values = vec![10.0; 20];
        values.push(1000.0);
        let outcome = detect_zscore(&some(&values), 3.0);

        assert!(outcome.flags[20].is_anomaly);
        assert_eq!(outcome.flags[20].category, AnomalyCategory::High);
        assert!(outcome.flags[..20].iter().all(|f| !f.is_anomaly));
        assert!(outcome.flags[0].score.unwrap() < 1.0);
    }

    #[test]
    fn test_zscore_treats_missing_as_zero() {
        let outcome = detect_zscore(&[Some(4.0), None, Some(4.0), None], 3.0);
        assert_eq!(outcome.mean, 2.0);
        assert_eq!(outcome.std_dev, 2.0);
        assert_eq!(outcome.flags[1].score, Some(1.0));
    }

    #[test]
    fn test_methods_are_selected_not_merged() {
        let values = some(&[10.0, 10.0, 10.0, 10.0, 10.0, 100.0]);
        let iqr = detect(&values, AnomalyMethod::Iqr { multiplier: 1.5 });
        let z = detect(&values, AnomalyMethod::ZScore { threshold: 3.0 });
        // |z| of the spike is sqrt(5) ~ 2.24, below 3
        assert!(iqr[5].is_anomaly);
        assert!(!z[5].is_anomaly);
    }

    #[test]
    fn test_annotate_and_summarize() {
        let day = |d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap();
        let mut buckets: Vec<_> = (1..=31).map(|d| (day(d), 10.0)).collect();
        buckets[30].1 = 500.0;
        buckets[14].1 = 400.0;

        let points = annotate_trends(&build_series(&buckets), AnomalyMethod::default());
        let summary = summarize_anomalies(&points, Granularity::Day);

        assert_eq!(summary.total_anomalies, 2);
        assert_eq!(summary.high, 2);
        assert_eq!(summary.low, 0);
        assert_eq!(summary.month_end_count, 1);
        assert!(points[30].is_anomaly);
    }

    #[test]
    fn test_month_end_uses_last_day_of_bucket() {
        let month = |m| NaiveDate::from_ymd_opt(2025, m, 1).unwrap();
        let mut buckets: Vec<_> = (1..=8).map(|m| (month(m), 10.0)).collect();
        buckets[3].1 = 500.0;
        let points = annotate_trends(&build_series(&buckets), AnomalyMethod::default());
        assert_eq!(summarize_anomalies(&points, Granularity::Month).month_end_count, 1);

        // Monday buckets from 3 March; the 24 March week ends inside March,
        // the 31 March week runs into April
        let first = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let weekly = |spike: usize| {
            let buckets: Vec<_> = (0..8)
                .map(|i| {
                    let total = if i == spike { 500.0 } else { 10.0 };
                    (first + chrono::Days::new(7 * i as u64), total)
                })
                .collect();
            let points = annotate_trends(&build_series(&buckets), AnomalyMethod::default());
            assert!(points[spike].is_anomaly);
            summarize_anomalies(&points, Granularity::Week)
        };
        assert_eq!(weekly(4).month_end_count, 1);
        assert_eq!(weekly(3).month_end_count, 0);
    }
}
