//! Portfolio lifecycle analytics.
//!
//! Every computation is a pure function of a product snapshot, a history
//! snapshot and an injected `now`. `compute_snapshot` runs them all and
//! isolates the ones that can fail on malformed history.

pub mod distribution;
pub mod filter;
pub mod insights;
pub mod ledger;
pub mod recommend;
pub mod report;
pub mod scores;
pub mod timeline;

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, ComputationFailure};
use crate::types::{DerivedMetric, LifecycleHistoryRecord, LifecycleStage, Product, Segment};

use distribution::{SegmentDistribution, StageDistribution};
use filter::SnapshotFilter;
use insights::{ProductInsights, TransitionPrediction};
use ledger::{
    ProductHistories, TransitionCount, TransitionKey, TransitionStats, TransitionTrends,
};
use recommend::RecommendationSet;
use report::PortfolioReport;
use timeline::LaunchMonth;

/// Everything the dashboard shows for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioAnalytics {
    pub stage_distribution: StageDistribution,
    pub segment_distribution: SegmentDistribution,
    pub segment_stages: BTreeMap<Segment, BTreeMap<LifecycleStage, usize>>,
    pub price_by_stage: BTreeMap<LifecycleStage, f64>,
    pub scores: Vec<DerivedMetric>,
    pub trends: TransitionTrends,
    pub average_dwell_days: BTreeMap<TransitionKey, f64>,
    pub recommendations: RecommendationSet,
    pub insights: ProductInsights,
    pub predictions: Vec<TransitionPrediction>,
    pub transition_stats: TransitionStats,
    pub transition_heatmap: Vec<TransitionCount>,
    pub transition_flow: Vec<TransitionCount>,
    pub segment_transitions: BTreeMap<Segment, BTreeMap<LifecycleStage, usize>>,
    pub history_by_date: BTreeMap<NaiveDate, BTreeMap<LifecycleStage, usize>>,
    pub launches_by_month: BTreeMap<String, LaunchMonth>,
    pub report: PortfolioReport,
    pub failures: Vec<ComputationFailure>,
    pub generated_at: DateTime<Utc>,
}

fn isolate<T: Default>(
    component: &str,
    result: Result<T, AnalyticsError>,
    failures: &mut Vec<ComputationFailure>,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            failures.push(ComputationFailure::new(component, &e));
            T::default()
        }
    }
}

/// Run every analytics component over one snapshot.
///
/// A component that fails (a history record without a date, for instance)
/// is recorded in `failures` and its output left empty; the others still run.
pub fn compute_snapshot(
    products: &[Product],
    history: &[LifecycleHistoryRecord],
    now: DateTime<Utc>,
    config: &AnalyticsConfig,
) -> PortfolioAnalytics {
    let mut failures = Vec::new();

    let stage_dist = distribution::stage_distribution(products);
    let card = scores::score_card(products, history, now, config);
    failures.extend(card.failures.iter().cloned());

    let (trends, average_dwell_days, product_insights, predictions) =
        match ledger::group_by_product(history) {
            Ok(grouped) => (
                ledger::classify_trends(&grouped, now, &config.trends),
                ledger::average_dwell_times(&ledger::dwell_times(&grouped)),
                insights::product_insights(products, &grouped, now),
                insights::transition_predictions(products, &grouped, now),
            ),
            Err(e) => {
                failures.push(ComputationFailure::new("Transition ledger", &e));
                // Launch dates still give a stage entry date.
                let ungrouped = ProductHistories::new();
                (
                    TransitionTrends::default(),
                    BTreeMap::new(),
                    insights::product_insights(products, &ungrouped, now),
                    Vec::new(),
                )
            }
        };

    let recommendations = recommend::generate_recommendations(
        &stage_dist,
        &trends,
        products,
        &config.recommendations,
    );
    let history_by_date = isolate(
        "History timeline",
        timeline::history_by_date(history),
        &mut failures,
    );
    let report = report::portfolio_report(products, &card.metrics, &recommendations, now, config);

    log::debug!(
        "Computed analytics for {} products and {} history records ({} failures)",
        products.len(),
        history.len(),
        failures.len()
    );

    PortfolioAnalytics {
        segment_distribution: distribution::segment_distribution(products),
        segment_stages: distribution::segment_stage_matrix(products),
        price_by_stage: distribution::price_by_stage(products),
        stage_distribution: stage_dist,
        scores: card.metrics,
        trends,
        average_dwell_days,
        recommendations,
        insights: product_insights,
        predictions,
        transition_stats: ledger::transition_stats(history),
        transition_heatmap: ledger::transition_heatmap(history),
        transition_flow: ledger::transition_flow(history),
        segment_transitions: ledger::segment_transition_matrix(history),
        history_by_date,
        launches_by_month: timeline::launches_by_month(products),
        report,
        failures,
        generated_at: now,
    }
}

/// Narrow the snapshot with `filter`, then run [`compute_snapshot`] on what
/// is left.
pub fn compute_filtered_snapshot(
    products: &[Product],
    history: &[LifecycleHistoryRecord],
    filter: &SnapshotFilter,
    now: DateTime<Utc>,
    config: &AnalyticsConfig,
) -> PortfolioAnalytics {
    if filter.is_empty() {
        return compute_snapshot(products, history, now, config);
    }
    let products = filter.products(products, now);
    let history = filter.history(history, now);
    log::debug!(
        "Filter kept {} products and {} history records",
        products.len(),
        history.len()
    );
    compute_snapshot(&products, &history, now, config)
}
