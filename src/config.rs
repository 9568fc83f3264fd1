//! Analysis settings, loadable from a TOML file.
//!
//! ```toml
//! granularity = "week"
//! method = "zscore"
//! zscore_threshold = 2.5
//!
//! [state_aliases]
//! "Orissa" = "Odisha"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analyzers::anomaly::{AnomalyMethod, DEFAULT_IQR_MULTIPLIER, DEFAULT_ZSCORE_THRESHOLD};
use crate::analyzers::types::Granularity;
use crate::cleaning::aliases::StateAliases;
use crate::error::{PipelineError, Result};

/// Which anomaly detector a run uses.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    #[default]
    Iqr,
    Zscore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub granularity: Granularity,
    pub method: MethodKind,
    pub iqr_multiplier: f64,
    pub zscore_threshold: f64,
    pub hotspot_percentile: f64,
    pub coldspot_percentile: f64,
    /// Replaces the built-in alias table when present in the file.
    pub state_aliases: StateAliases,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            granularity: Granularity::Day,
            method: MethodKind::Iqr,
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
            zscore_threshold: DEFAULT_ZSCORE_THRESHOLD,
            hotspot_percentile: 90.0,
            coldspot_percentile: 10.0,
            state_aliases: StateAliases::default(),
        }
    }
}

impl AnalysisConfig {
    /// Reads a config file, or returns the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(AnalysisConfig::default());
        };
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        debug!(path = %path.display(), aliases = config.state_aliases.len(), "Config loaded");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// The detector chosen for this run with its parameter.
    pub fn anomaly_method(&self) -> AnomalyMethod {
        match self.method {
            MethodKind::Iqr => AnomalyMethod::Iqr {
                multiplier: self.iqr_multiplier,
            },
            MethodKind::Zscore => AnomalyMethod::ZScore {
                threshold: self.zscore_threshold,
            },
        }
    }

    /// Rejects parameters no analysis can run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.iqr_multiplier.is_finite() && self.iqr_multiplier >= 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "iqr_multiplier must be a non-negative number, got {}",
                self.iqr_multiplier
            )));
        }
        if !(self.zscore_threshold.is_finite() && self.zscore_threshold > 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "zscore_threshold must be positive, got {}",
                self.zscore_threshold
            )));
        }
        for (name, value) in [
            ("hotspot_percentile", self.hotspot_percentile),
            ("coldspot_percentile", self.coldspot_percentile),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(PipelineError::InvalidParameter(format!(
                    "{name} must be within 0..=100, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.granularity, Granularity::Day);
        assert_eq!(config.anomaly_method(), AnomalyMethod::Iqr { multiplier: 1.5 });
        assert_eq!(config.hotspot_percentile, 90.0);
        assert_eq!(config.coldspot_percentile, 10.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = AnalysisConfig::from_toml(
            "granularity = \"month\"\nmethod = \"zscore\"\nzscore_threshold = 2.5\n",
        )
        .unwrap();

        assert_eq!(config.granularity, Granularity::Month);
        assert_eq!(config.anomaly_method(), AnomalyMethod::ZScore { threshold: 2.5 });
        assert_eq!(config.iqr_multiplier, 1.5);
        assert_eq!(config.state_aliases, StateAliases::default());
    }

    #[test]
    fn test_alias_table_replaces_defaults() {
        let config =
            AnalysisConfig::from_toml("[state_aliases]\n\"Bombay\" = \"Maharashtra\"\n").unwrap();
        assert_eq!(config.state_aliases.len(), 1);
        assert_eq!(config.state_aliases.lookup("Orissa"), None);
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let bad = [
            AnalysisConfig {
                iqr_multiplier: -1.0,
                ..Default::default()
            },
            AnalysisConfig {
                zscore_threshold: 0.0,
                ..Default::default()
            },
            AnalysisConfig {
                hotspot_percentile: 101.0,
                ..Default::default()
            },
            AnalysisConfig {
                coldspot_percentile: -5.0,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(PipelineError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "hotspot_percentile = 75.0").unwrap();

        let config = AnalysisConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.hotspot_percentile, 75.0);
        assert_eq!(AnalysisConfig::load(None).unwrap(), AnalysisConfig::default());
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(matches!(
            AnalysisConfig::from_toml("granularity = \"fortnight\""),
            Err(PipelineError::Toml(_))
        ));
    }
}
