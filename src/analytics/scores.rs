//! Portfolio score engine.
//!
//! Five independent heuristics, each mapping a snapshot onto a 0–100 scale.
//! Every score returns `DEFAULT_SCORE` when there is nothing to measure so
//! the dashboard always has a value to show.

use chrono::{DateTime, Months, Utc};
use serde::Serialize;

use crate::analytics::distribution::stage_distribution;
use crate::analytics::ledger::{average_dwell_times, dwell_times, group_by_product};
use crate::config::{AnalyticsConfig, ScoringConfig};
use crate::error::{AnalyticsError, ComputationFailure};
use crate::types::{DerivedMetric, LifecycleHistoryRecord, LifecycleStage, Product};

pub const DEFAULT_SCORE: f64 = 50.0;

/// Stage weights for the health index. Decline is additionally scored on a
/// 50-point basis instead of 100.
const HEALTH_WEIGHTS: [(LifecycleStage, f64, f64); 4] = [
    (LifecycleStage::Introduction, 0.3, 100.0),
    (LifecycleStage::Growth, 0.4, 100.0),
    (LifecycleStage::Maturity, 0.2, 100.0),
    (LifecycleStage::Decline, 0.1, 50.0),
];
const HEALTH_SCALE: f64 = 1.2;

const INNOVATION_INTRO_WEIGHT: f64 = 0.6;
const INNOVATION_TRANSITION_WEIGHT: f64 = 0.4;

fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Overall portfolio health from the weighted stage mix.
pub fn portfolio_health_index(products: &[Product]) -> f64 {
    if products.is_empty() {
        return DEFAULT_SCORE;
    }
    let dist = stage_distribution(products);
    let weighted: f64 = HEALTH_WEIGHTS
        .iter()
        .map(|(stage, weight, basis)| dist.proportion(*stage) * weight * basis)
        .sum();
    clamp_score(weighted * HEALTH_SCALE)
}

/// Blend of the share of products in Introduction and how many
/// Introduction→Growth moves happened inside the recent window.
///
/// The window starts `innovation_window_months` calendar months before
/// `now`, boundary included.
pub fn innovation_rate(
    products: &[Product],
    history: &[LifecycleHistoryRecord],
    now: DateTime<Utc>,
    scoring: &ScoringConfig,
) -> Result<f64, AnalyticsError> {
    if products.is_empty() {
        return Ok(DEFAULT_SCORE);
    }

    let introduction = products
        .iter()
        .filter(|p| p.is_in(LifecycleStage::Introduction))
        .count();

    let cutoff = now
        .checked_sub_months(Months::new(scoring.innovation_window_months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut recent_transitions = 0usize;
    for record in history.iter().filter(|r| {
        r.previous_stage == Some(LifecycleStage::Introduction)
            && r.new_stage == LifecycleStage::Growth
    }) {
        if record.changed_at()? >= cutoff {
            recent_transitions += 1;
        }
    }

    let introduction_score = introduction as f64 / products.len() as f64 * 100.0;
    let transition_score = recent_transitions as f64 / introduction.max(1) as f64 * 100.0;

    Ok(clamp_score(
        introduction_score * INNOVATION_INTRO_WEIGHT
            + transition_score * INNOVATION_TRANSITION_WEIGHT,
    ))
}

/// Share of products in Growth or Maturity, blended toward a neutral value
/// while the portfolio is too small to be representative.
pub fn market_penetration(products: &[Product], scoring: &ScoringConfig) -> f64 {
    if products.is_empty() {
        return DEFAULT_SCORE;
    }
    let total = products.len() as f64;
    let established = products
        .iter()
        .filter(|p| p.is_in(LifecycleStage::Growth) || p.is_in(LifecycleStage::Maturity))
        .count() as f64;

    let base = established / total * 100.0;
    let scale = (total / scoring.full_confidence_size as f64).min(1.0);
    clamp_score(base * scale + scoring.neutral_penetration * (1.0 - scale))
}

/// Closeness of the stage mix to the ideal distribution. A total absolute
/// deviation of 2.0 (completely disjoint) scores 0.
pub fn portfolio_balance(products: &[Product], scoring: &ScoringConfig) -> f64 {
    if products.is_empty() {
        return DEFAULT_SCORE;
    }
    let dist = stage_distribution(products);
    let deviation: f64 = LifecycleStage::ALL
        .iter()
        .map(|stage| {
            let ideal = scoring.ideal_distribution.get(stage).copied().unwrap_or(0.0);
            (ideal - dist.proportion(*stage)).abs()
        })
        .sum();
    clamp_score(100.0 - deviation * 50.0)
}

/// How close average dwell times are to the ideal stage durations.
///
/// Each ideal key with a positive observed average scores
/// `100 − relative deviation × 100` (floored at 0); the result is the mean
/// over those keys.
pub fn transition_efficiency(
    history: &[LifecycleHistoryRecord],
    scoring: &ScoringConfig,
) -> Result<f64, AnalyticsError> {
    if history.is_empty() {
        return Ok(DEFAULT_SCORE);
    }
    let grouped = group_by_product(history)?;
    let averages = average_dwell_times(&dwell_times(&grouped));

    let scores: Vec<f64> = averages
        .iter()
        .filter(|(_, actual)| **actual > 0.0)
        .filter_map(|(key, actual)| {
            let ideal = *scoring.ideal_transition_days.get(&key.to_string())?;
            let deviation = (actual - ideal).abs() / ideal;
            Some((100.0 - deviation * 100.0).max(0.0))
        })
        .collect();

    if scores.is_empty() {
        return Ok(DEFAULT_SCORE);
    }
    Ok(scores.iter().sum::<f64>() / scores.len() as f64)
}

// ─────────────────────────────────────────────────────────────────────
// Score card
// ─────────────────────────────────────────────────────────────────────

pub const PORTFOLIO_HEALTH: &str = "Portfolio Health Index";
pub const INNOVATION_RATE: &str = "Innovation Rate";
pub const MARKET_PENETRATION: &str = "Market Penetration";
pub const PORTFOLIO_BALANCE: &str = "Portfolio Balance";
pub const TRANSITION_EFFICIENCY: &str = "Transition Efficiency";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCard {
    pub metrics: Vec<DerivedMetric>,
    pub failures: Vec<ComputationFailure>,
}

impl ScoreCard {
    pub fn get(&self, name: &str) -> Option<&DerivedMetric> {
        self.metrics.iter().find(|m| m.name == name)
    }
}

/// Evaluate all five scores. A score that fails is listed under `failures`
/// and the rest are still reported.
pub fn score_card(
    products: &[Product],
    history: &[LifecycleHistoryRecord],
    now: DateTime<Utc>,
    config: &AnalyticsConfig,
) -> ScoreCard {
    let scoring = &config.scoring;
    let evaluated: [(&str, &str, Result<f64, AnalyticsError>); 5] = [
        (
            PORTFOLIO_HEALTH,
            "Overall health of the product portfolio",
            Ok(portfolio_health_index(products)),
        ),
        (
            INNOVATION_RATE,
            "Innovation based on new products and recent transitions",
            innovation_rate(products, history, now, scoring),
        ),
        (
            MARKET_PENETRATION,
            "Estimated market penetration from lifecycle stages",
            Ok(market_penetration(products, scoring)),
        ),
        (
            PORTFOLIO_BALANCE,
            "Balance of the portfolio across lifecycle stages",
            Ok(portfolio_balance(products, scoring)),
        ),
        (
            TRANSITION_EFFICIENCY,
            "Efficiency of transitions between lifecycle stages",
            transition_efficiency(history, scoring),
        ),
    ];

    let mut card = ScoreCard {
        metrics: Vec::with_capacity(5),
        failures: Vec::new(),
    };
    for (name, description, result) in evaluated {
        match result {
            Ok(value) => card.metrics.push(DerivedMetric::new(name, value, description)),
            Err(e) => card.failures.push(ComputationFailure::new(name, &e)),
        }
    }
    card
}
