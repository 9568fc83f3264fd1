use serde::Serialize;
use tracing::{info, warn};

use crate::analyzers::aggregate::temporal_trends;
use crate::analyzers::anomaly::{annotate_trends, summarize_anomalies};
use crate::analyzers::comparison::{comparative_state_metrics, youth_transition_analysis};
use crate::analyzers::geographic::{
    district_aggregations, district_deep_dive, identify_coldspots, identify_hotspots,
    state_aggregations,
};
use crate::analyzers::patterns::{
    age_group_analysis, growth_rate_analysis, monthly_patterns, weekly_pattern_analysis,
};
use crate::analyzers::types::{
    AgeGroupShare, AnnotatedPoint, AnomalySummary, Granularity, GroupTotal, GrowthRates,
    MonthlyPatterns, SpotSelection, StateComparison, TrendPoint, WeekdayPattern,
    YouthTransition,
};
use crate::cleaning::clean;
use crate::cleaning::types::{
    CleanDataset, CleaningResult, DISTRICT_COLUMN, DatasetKind, DiscardTally, RawDataset,
};
use crate::config::{AnalysisConfig, MethodKind};
use crate::error::{PipelineError, Result};
use crate::stats::{DataQualityReport, quality_report};

/// Number of weakest coldspot states given a district breakdown.
const DEEP_DIVE_STATES: usize = 5;

/// One value per dataset kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerDataset<T> {
    pub enrolment: T,
    pub demographic: T,
    pub biometric: T,
}

impl<T> PerDataset<T> {
    pub fn get(&self, kind: DatasetKind) -> &T {
        match kind {
            DatasetKind::Enrolment => &self.enrolment,
            DatasetKind::Demographic => &self.demographic,
            DatasetKind::Biometric => &self.biometric,
        }
    }

    fn try_map<'a, U>(&'a self, f: impl Fn(&'a T) -> Result<U>) -> Result<PerDataset<U>> {
        Ok(PerDataset {
            enrolment: f(&self.enrolment)?,
            demographic: f(&self.demographic)?,
            biometric: f(&self.biometric)?,
        })
    }

    fn map<'a, U>(&'a self, f: impl Fn(&'a T) -> U) -> PerDataset<U> {
        PerDataset {
            enrolment: f(&self.enrolment),
            demographic: f(&self.demographic),
            biometric: f(&self.biometric),
        }
    }
}

/// Row counts and quality figures for one dataset.
#[derive(Debug, Serialize)]
pub struct DatasetOverview {
    pub quality: DataQualityReport,
    pub raw_rows: usize,
    pub clean_rows: usize,
    pub discards: DiscardTally,
}

/// Everything a run produces, ready to be written out.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub config: AnalysisConfig,
    pub overview: PerDataset<DatasetOverview>,
    pub trends: PerDataset<Vec<TrendPoint>>,
    pub growth: PerDataset<Option<GrowthRates>>,
    pub state_totals: PerDataset<Vec<GroupTotal>>,
    /// Enrolment by district; empty when the extract has no district column.
    pub district_totals: Vec<GroupTotal>,
    pub hotspots: SpotSelection,
    pub coldspots: SpotSelection,
    /// Districts of the weakest coldspot states.
    pub deep_dive: Vec<GroupTotal>,
    pub comparison: Vec<StateComparison>,
    pub youth_transition: Vec<YouthTransition>,
    pub age_groups: Vec<AgeGroupShare>,
    pub monthly: MonthlyPatterns,
    pub weekdays: Vec<WeekdayPattern>,
    pub anomalies: PerDataset<Vec<AnnotatedPoint>>,
    pub anomaly_summary: PerDataset<AnomalySummary>,
}

/// Headline figures written to `summary.json`.
#[derive(Debug, Serialize)]
pub struct ReportSummary<'a> {
    pub method: MethodKind,
    pub granularity: Granularity,
    pub overview: &'a PerDataset<DatasetOverview>,
    pub growth: &'a PerDataset<Option<GrowthRates>>,
    pub anomaly_summary: &'a PerDataset<AnomalySummary>,
    pub age_groups: &'a [AgeGroupShare],
    pub hotspot_states: Vec<&'a str>,
    pub coldspot_states: Vec<&'a str>,
    pub hotspot_threshold: Option<f64>,
    pub coldspot_threshold: Option<f64>,
}

impl AnalysisReport {
    pub fn summary(&self) -> ReportSummary<'_> {
        ReportSummary {
            method: self.config.method,
            granularity: self.config.granularity,
            overview: &self.overview,
            growth: &self.growth,
            anomaly_summary: &self.anomaly_summary,
            age_groups: &self.age_groups,
            hotspot_states: self.hotspots.spots.iter().map(|s| s.state.as_str()).collect(),
            coldspot_states: self.coldspots.spots.iter().map(|s| s.state.as_str()).collect(),
            hotspot_threshold: self.hotspots.threshold,
            coldspot_threshold: self.coldspots.threshold,
        }
    }
}

fn check_kind(raw: &RawDataset, expected: DatasetKind) -> Result<()> {
    if raw.kind == expected {
        Ok(())
    } else {
        Err(PipelineError::WrongDatasetKind {
            expected,
            found: raw.kind,
        })
    }
}

fn total_column(dataset: &CleanDataset) -> &'static str {
    dataset.kind.total_column()
}

/// Cleans the three raw tables and runs every analysis over them.
///
/// # Errors
///
/// Fails on an invalid config, on tables passed in the wrong position, and
/// on tables missing the columns an analysis needs.
#[tracing::instrument(skip_all, fields(
    enrolment = enrolment.len(),
    demographic = demographic.len(),
    biometric = biometric.len(),
))]
pub fn run_analysis(
    enrolment: &RawDataset,
    demographic: &RawDataset,
    biometric: &RawDataset,
    config: &AnalysisConfig,
) -> Result<AnalysisReport> {
    config.validate()?;
    check_kind(enrolment, DatasetKind::Enrolment)?;
    check_kind(demographic, DatasetKind::Demographic)?;
    check_kind(biometric, DatasetKind::Biometric)?;

    let raw = PerDataset {
        enrolment,
        demographic,
        biometric,
    };
    let cleaned: PerDataset<CleaningResult> =
        raw.try_map(|table| clean(table, &config.state_aliases))?;
    let clean_tables = cleaned.map(|c| &c.dataset);

    let overview = PerDataset {
        enrolment: dataset_overview(enrolment, &cleaned.enrolment),
        demographic: dataset_overview(demographic, &cleaned.demographic),
        biometric: dataset_overview(biometric, &cleaned.biometric),
    };

    let trends =
        clean_tables.try_map(|ds| temporal_trends(ds, total_column(ds), config.granularity))?;
    let growth = trends.map(|series| growth_rate_analysis(series));
    let state_totals = clean_tables.try_map(|ds| state_aggregations(ds, total_column(ds)))?;

    let enrol = clean_tables.enrolment;
    let enrol_column = total_column(enrol);
    let hotspots = identify_hotspots(&state_totals.enrolment, config.hotspot_percentile)?;
    let coldspots = identify_coldspots(&state_totals.enrolment, config.coldspot_percentile)?;

    let (district_totals, deep_dive) = if enrol.has_column(DISTRICT_COLUMN) {
        let bottom: Vec<String> = coldspots
            .spots
            .iter()
            .take(DEEP_DIVE_STATES)
            .map(|s| s.state.clone())
            .collect();
        (
            district_aggregations(enrol, enrol_column)?,
            district_deep_dive(enrol, enrol_column, &bottom)?,
        )
    } else {
        warn!("Enrolment extract has no district column, skipping district analyses");
        (Vec::new(), Vec::new())
    };

    let method = config.anomaly_method();
    let anomalies = trends.map(|series| annotate_trends(series, method));
    let anomaly_summary =
        anomalies.map(|points| summarize_anomalies(points, config.granularity));

    let report = AnalysisReport {
        config: config.clone(),
        comparison: comparative_state_metrics(
            clean_tables.enrolment,
            clean_tables.demographic,
            clean_tables.biometric,
        )?,
        youth_transition: youth_transition_analysis(enrol, clean_tables.biometric)?,
        age_groups: age_group_analysis(enrol)?,
        monthly: monthly_patterns(enrol, enrol_column)?,
        weekdays: weekly_pattern_analysis(enrol, enrol_column)?,
        overview,
        trends,
        growth,
        state_totals,
        district_totals,
        hotspots,
        coldspots,
        deep_dive,
        anomalies,
        anomaly_summary,
    };

    info!(
        states = report.comparison.len(),
        hotspots = report.hotspots.spots.len(),
        coldspots = report.coldspots.spots.len(),
        enrolment_anomalies = report.anomaly_summary.enrolment.total_anomalies,
        "Analysis complete"
    );
    Ok(report)
}

fn dataset_overview(raw: &RawDataset, cleaned: &CleaningResult) -> DatasetOverview {
    DatasetOverview {
        quality: quality_report(raw),
        raw_rows: cleaned.raw_rows,
        clean_rows: cleaned.dataset.len(),
        discards: cleaned.discards,
    }
}
