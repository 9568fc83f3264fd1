//! Data types used by the aggregation and anomaly pipeline.
//!
//! Every row type is flat so it can be written straight to CSV.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Width of a temporal aggregation bucket.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Week,
    Month,
}

/// One bucket of a temporal series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    /// First day of the bucket.
    pub bucket: NaiveDate,
    pub total: f64,
    pub rolling_7d: f64,
    pub rolling_30d: f64,
    /// Change from the previous bucket in percent; undefined for the first
    /// bucket and after an empty bucket.
    pub pct_change: Option<f64>,
    pub cumulative: f64,
}

/// A state (or state + district) total with its Pareto position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub state: String,
    pub district: Option<String>,
    pub total: f64,
    pub rank: usize,
    pub pct_of_total: Option<f64>,
    pub cumulative_pct: Option<f64>,
}

/// A group selected as a hotspot or coldspot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spot {
    pub state: String,
    pub district: Option<String>,
    pub total: f64,
    pub spot_rank: f64,
}

/// Hotspots or coldspots together with the threshold that selected them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotSelection {
    pub percentile: f64,
    pub threshold: Option<f64>,
    pub spots: Vec<Spot>,
}

/// Per-state activity across the three datasets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateComparison {
    pub state: String,
    pub enrolments: f64,
    pub demo_updates: f64,
    pub bio_updates: f64,
    pub demo_to_enrol_ratio: Option<f64>,
    pub bio_to_enrol_ratio: Option<f64>,
    pub total_activity: f64,
}

/// Child enrolments against biometric updates in the same age band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YouthTransition {
    pub state: String,
    pub youth_enrolments: f64,
    pub youth_bio_updates: f64,
    pub transition_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeGroupShare {
    pub age_group: &'static str,
    pub total: f64,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    pub year: i32,
    pub month: u32,
    pub year_month: NaiveDate,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthAverage {
    pub month: u32,
    pub month_name: &'static str,
    pub avg_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPatterns {
    pub totals: Vec<MonthlyTotal>,
    pub averages: Vec<MonthAverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayPattern {
    pub day_of_week: u32,
    pub day_name: &'static str,
    pub sum: f64,
    pub mean: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthRates {
    pub total_growth_pct: Option<f64>,
    pub weekly_growth_pct: Option<f64>,
    pub monthly_growth_pct: Option<f64>,
    pub avg_daily: f64,
    pub max_daily: f64,
    pub min_daily: f64,
}

/// Which side of the bounds a value fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyCategory {
    Low,
    High,
    Normal,
}

/// Outlier verdict for one row of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnomalyFlag {
    pub is_anomaly: bool,
    pub category: AnomalyCategory,
    /// Absolute z-score for the z-score method; `None` when undefined or for IQR.
    pub score: Option<f64>,
}

impl AnomalyFlag {
    pub fn normal(score: Option<f64>) -> Self {
        AnomalyFlag {
            is_anomaly: false,
            category: AnomalyCategory::Normal,
            score,
        }
    }
}

/// A trend bucket annotated with its anomaly verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedPoint {
    pub bucket: NaiveDate,
    pub total: f64,
    pub is_anomaly: bool,
    pub category: AnomalyCategory,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnomalySummary {
    pub total_anomalies: usize,
    pub high: usize,
    pub low: usize,
    /// Flagged buckets covering the last day of a month.
    pub month_end_count: usize,
}
