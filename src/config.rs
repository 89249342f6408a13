//! Analytics thresholds.
//!
//! Every field defaults to the fixed constant the dashboard has always used,
//! so an empty `{}` config file (or no file at all) reproduces the standard
//! behaviour. A JSON file can override individual values.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::types::LifecycleStage;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsConfig {
    pub trends: TrendThresholds,
    pub scoring: ScoringConfig,
    pub recommendations: RecommendationThresholds,
}

/// Velocity classification of a product's transition history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrendThresholds {
    /// Last gap below `first × factor` means accelerating.
    pub acceleration_factor: f64,
    /// Last gap above `first × factor` means slowing.
    pub slowing_factor: f64,
    /// A single transition older than this many days means stagnant.
    pub stagnation_days: i64,
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self {
            acceleration_factor: 0.8,
            slowing_factor: 1.2,
            stagnation_days: 180,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringConfig {
    pub innovation_window_months: u32,
    /// Portfolio size at which market penetration stops blending toward neutral.
    pub full_confidence_size: usize,
    pub neutral_penetration: f64,
    pub ideal_distribution: BTreeMap<LifecycleStage, f64>,
    /// Ideal dwell days keyed `From-To`.
    pub ideal_transition_days: BTreeMap<String, f64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            innovation_window_months: 6,
            full_confidence_size: 10,
            neutral_penetration: 40.0,
            ideal_distribution: BTreeMap::from([
                (LifecycleStage::Introduction, 0.2),
                (LifecycleStage::Growth, 0.3),
                (LifecycleStage::Maturity, 0.4),
                (LifecycleStage::Decline, 0.1),
            ]),
            ideal_transition_days: BTreeMap::from([
                ("Introduction-Growth".to_string(), 180.0),
                ("Growth-Maturity".to_string(), 365.0),
                ("Maturity-Decline".to_string(), 730.0),
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendationThresholds {
    /// Percentage above which a stage gets an extra warning record.
    pub stage_warning_percent: BTreeMap<LifecycleStage, u32>,
    pub dominance_percent: u32,
    pub gap_percent: u32,
    /// Gap warnings only apply to portfolios larger than this.
    pub gap_min_total: usize,
    pub limited_portfolio_size: usize,
    pub overextended_size: usize,
    pub early_stage_share: f64,
    pub top_performer_limit: usize,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            stage_warning_percent: BTreeMap::from([
                (LifecycleStage::Introduction, 30),
                (LifecycleStage::Growth, 40),
                (LifecycleStage::Maturity, 50),
                (LifecycleStage::Decline, 20),
            ]),
            dominance_percent: 50,
            gap_percent: 10,
            gap_min_total: 5,
            limited_portfolio_size: 3,
            overextended_size: 20,
            early_stage_share: 0.7,
            top_performer_limit: 5,
        }
    }
}

/// Load a config file. Missing keys fall back to defaults.
pub fn load_config(path: &Path) -> Result<AnalyticsConfig, AnalyticsError> {
    let content = fs::read_to_string(path).map_err(|e| AnalyticsError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let config: AnalyticsConfig = serde_json::from_str(&content)
        .map_err(|e| AnalyticsError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    validate_config(&config)?;
    log::debug!("Loaded analytics config from {}", path.display());
    Ok(config)
}

pub fn validate_config(config: &AnalyticsConfig) -> Result<(), AnalyticsError> {
    let trends = &config.trends;
    if trends.acceleration_factor <= 0.0 || trends.slowing_factor <= 0.0 {
        return Err(AnalyticsError::Config(
            "Trend factors must be positive".into(),
        ));
    }
    if trends.acceleration_factor >= trends.slowing_factor {
        return Err(AnalyticsError::Config(format!(
            "accelerationFactor ({}) must be below slowingFactor ({})",
            trends.acceleration_factor, trends.slowing_factor
        )));
    }

    let scoring = &config.scoring;
    let share: f64 = scoring.ideal_distribution.values().sum();
    if (share - 1.0).abs() > 0.001 {
        return Err(AnalyticsError::Config(format!(
            "idealDistribution must sum to 1.0, got {:.3}",
            share
        )));
    }
    if let Some((key, days)) = scoring
        .ideal_transition_days
        .iter()
        .find(|(_, days)| **days <= 0.0)
    {
        return Err(AnalyticsError::Config(format!(
            "Ideal transition days for {} must be positive, got {}",
            key, days
        )));
    }
    if scoring.full_confidence_size == 0 {
        return Err(AnalyticsError::Config(
            "fullConfidenceSize must be at least 1".into(),
        ));
    }

    let share = config.recommendations.early_stage_share;
    if !(0.0..=1.0).contains(&share) {
        return Err(AnalyticsError::Config(format!(
            "earlyStageShare must be within 0..=1, got {}",
            share
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AnalyticsConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "{{}}").unwrap();
        let config = load_config(file.path()).expect("empty config should load");
        assert_eq!(config, AnalyticsConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{ "trends": {{ "stagnationDays": 90 }} }}"#).unwrap();
        let config = load_config(file.path()).expect("partial config should load");
        assert_eq!(config.trends.stagnation_days, 90);
        assert_eq!(config.trends.acceleration_factor, 0.8);
        assert_eq!(config.recommendations.top_performer_limit, 5);
    }

    #[test]
    fn test_stage_keyed_override() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{ "recommendations": {{ "stageWarningPercent": {{ "Growth": 60 }} }} }}"#
        )
        .unwrap();
        let config = load_config(file.path()).expect("stage map should load");
        let warn = &config.recommendations.stage_warning_percent;
        assert_eq!(warn.get(&LifecycleStage::Growth), Some(&60));
        assert_eq!(warn.get(&LifecycleStage::Decline), None);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/analytics.json")).unwrap_err();
        assert!(matches!(err, AnalyticsError::Io { .. }));
    }

    #[test]
    fn test_rejects_unbalanced_ideal_distribution() {
        let mut config = AnalyticsConfig::default();
        config
            .scoring
            .ideal_distribution
            .insert(LifecycleStage::Decline, 0.5);
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("idealDistribution"));
    }

    #[test]
    fn test_rejects_inverted_trend_factors() {
        let mut config = AnalyticsConfig::default();
        config.trends.acceleration_factor = 1.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_ideal_days() {
        let mut config = AnalyticsConfig::default();
        config
            .scoring
            .ideal_transition_days
            .insert("Growth-Maturity".into(), 0.0);
        assert!(validate_config(&config).is_err());
    }
}
