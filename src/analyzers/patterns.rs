//! Seasonality, weekday, age-band and growth summaries.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::analyzers::types::{
    AgeGroupShare, GrowthRates, MonthAverage, MonthlyPatterns, MonthlyTotal, TrendPoint,
    WeekdayPattern,
};
use crate::analyzers::utility::{mean, percent};
use crate::cleaning::features::{WEEKDAY_NAMES, month_name};
use crate::cleaning::types::{AGE_COLUMNS, CleanDataset, DatasetKind};
use crate::error::Result;

const AGE_GROUP_LABELS: [&str; 3] = ["0-5 years", "5-17 years", "18+ years"];

/// Share of enrolments in each age bracket.
pub fn age_group_analysis(enrolment: &CleanDataset) -> Result<Vec<AgeGroupShare>> {
    enrolment.require_kind(DatasetKind::Enrolment)?;

    let mut totals = [0.0; 3];
    for (total, column) in totals.iter_mut().zip(AGE_COLUMNS) {
        let value = enrolment.column(column)?;
        *total = enrolment.records.iter().map(|r| value.get(r)).sum();
    }
    let grand_total: f64 = totals.iter().sum();

    Ok(AGE_GROUP_LABELS
        .into_iter()
        .zip(totals)
        .map(|(age_group, total)| AgeGroupShare {
            age_group,
            total,
            percentage: percent(total, grand_total),
        })
        .collect())
}

/// Totals per (year, month) and the average per-record value per calendar month.
pub fn monthly_patterns(dataset: &CleanDataset, column: &str) -> Result<MonthlyPatterns> {
    let value = dataset.column(column)?;

    let mut by_year_month: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    let mut by_month: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for record in &dataset.records {
        let v = value.get(record);
        let f = &record.features;
        *by_year_month.entry((f.year, f.month)).or_default() += v;
        by_month.entry(f.month).or_default().push(v);
    }

    let totals = by_year_month
        .into_iter()
        .filter_map(|((year, month), total)| {
            Some(MonthlyTotal {
                year,
                month,
                year_month: NaiveDate::from_ymd_opt(year, month, 1)?,
                total,
            })
        })
        .collect();

    let averages = by_month
        .into_iter()
        .map(|(month, values)| MonthAverage {
            month,
            month_name: month_name(month),
            avg_value: mean(&values),
        })
        .collect();

    Ok(MonthlyPatterns { totals, averages })
}

/// Sum, mean and count per ISO weekday, Monday first.
pub fn weekly_pattern_analysis(
    dataset: &CleanDataset,
    column: &str,
) -> Result<Vec<WeekdayPattern>> {
    let value = dataset.column(column)?;

    let mut by_day: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for record in &dataset.records {
        by_day
            .entry(record.features.day_of_week)
            .or_default()
            .push(value.get(record));
    }

    Ok(by_day
        .into_iter()
        .map(|(day_of_week, values)| WeekdayPattern {
            day_of_week,
            day_name: WEEKDAY_NAMES[day_of_week as usize % 7],
            sum: values.iter().sum(),
            mean: mean(&values),
            count: values.len(),
        })
        .collect())
}

fn growth_pct(from: f64, to: f64) -> Option<f64> {
    percent(to - from, from)
}

/// Growth over the whole series and over its last 7 and 30 buckets.
///
/// Returns `None` for an empty series. A window growth figure is `None` when
/// the series is shorter than the window or the base bucket is zero.
pub fn growth_rate_analysis(series: &[TrendPoint]) -> Option<GrowthRates> {
    let first = series.first()?;
    let last = series.last()?;
    let totals: Vec<f64> = series.iter().map(|p| p.total).collect();
    let window = |n: usize| {
        (totals.len() >= n)
            .then(|| growth_pct(totals[totals.len() - n], last.total))
            .flatten()
    };

    Some(GrowthRates {
        total_growth_pct: growth_pct(first.total, last.total),
        weekly_growth_pct: window(7),
        monthly_growth_pct: window(30),
        avg_daily: mean(&totals),
        max_daily: totals.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        min_daily: totals.iter().copied().fold(f64::INFINITY, f64::min),
    })
}
