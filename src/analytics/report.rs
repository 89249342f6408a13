//! Report assembly: product, lifecycle, performance and combined portfolio
//! reports built from the snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analytics::distribution::stage_distribution;
use crate::analytics::recommend::RecommendationSet;
use crate::analytics::scores::{score_card, ScoreCard};
use crate::config::AnalyticsConfig;
use crate::types::{DerivedMetric, LifecycleHistoryRecord, LifecycleStage, Product, ProductId};

const UNCATEGORIZED: &str = "Uncategorized";

/// Compact product reference used in performer lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub stage: Option<LifecycleStage>,
    pub category: Option<String>,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        ProductSummary {
            id: product.id,
            name: product.name.clone(),
            stage: product.lifecycle_stage,
            category: product.category.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReport {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_stage: BTreeMap<LifecycleStage, usize>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleReport {
    pub total: usize,
    pub by_stage: BTreeMap<LifecycleStage, usize>,
    pub notes: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub score_card: ScoreCard,
    pub top_performers: Vec<ProductSummary>,
    pub under_performers: Vec<ProductSummary>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioReport {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_stage: BTreeMap<LifecycleStage, usize>,
    pub top_performers: Vec<ProductSummary>,
    pub under_performers: Vec<ProductSummary>,
    pub metrics: Vec<DerivedMetric>,
    pub recommendations: RecommendationSet,
    pub generated_at: DateTime<Utc>,
}

/// Product counts per category. Products without a category are counted
/// under "Uncategorized".
pub fn category_counts(products: &[Product]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for product in products {
        let category = product
            .category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(UNCATEGORIZED);
        *counts.entry(category.to_string()).or_insert(0) += 1;
    }
    counts
}

/// The first `limit` products in Growth or Maturity, in input order.
pub fn top_performers(products: &[Product], limit: usize) -> Vec<ProductSummary> {
    products
        .iter()
        .filter(|p| p.is_in(LifecycleStage::Growth) || p.is_in(LifecycleStage::Maturity))
        .take(limit)
        .map(ProductSummary::from)
        .collect()
}

/// Every product in Decline, in input order.
pub fn under_performers(products: &[Product]) -> Vec<ProductSummary> {
    products
        .iter()
        .filter(|p| p.is_in(LifecycleStage::Decline))
        .map(ProductSummary::from)
        .collect()
}

pub fn product_report(products: &[Product], now: DateTime<Utc>) -> ProductReport {
    ProductReport {
        total: products.len(),
        by_category: category_counts(products),
        by_stage: stage_distribution(products).counts,
        generated_at: now,
    }
}

/// Stage counts with the two headline lifecycle notes: more products being
/// introduced than growing, and any products in decline.
pub fn lifecycle_report(products: &[Product], now: DateTime<Utc>) -> LifecycleReport {
    let distribution = stage_distribution(products);
    let introduction = distribution.count(LifecycleStage::Introduction);
    let growth = distribution.count(LifecycleStage::Growth);
    let decline = distribution.count(LifecycleStage::Decline);

    let mut notes = Vec::new();
    if introduction > growth {
        notes.push(
            "Consider focusing on growth strategies for introduction-stage products".to_string(),
        );
    }
    if decline > 0 {
        notes.push(format!("{} products in decline stage need attention", decline));
    }

    LifecycleReport {
        total: products.len(),
        by_stage: distribution.counts,
        notes,
        generated_at: now,
    }
}

pub fn performance_report(
    products: &[Product],
    history: &[LifecycleHistoryRecord],
    now: DateTime<Utc>,
    config: &AnalyticsConfig,
) -> PerformanceReport {
    PerformanceReport {
        score_card: score_card(products, history, now, config),
        top_performers: top_performers(products, config.recommendations.top_performer_limit),
        under_performers: under_performers(products),
        generated_at: now,
    }
}

/// Combined report over already-computed metrics and recommendations.
pub fn portfolio_report(
    products: &[Product],
    metrics: &[DerivedMetric],
    recommendations: &RecommendationSet,
    now: DateTime<Utc>,
    config: &AnalyticsConfig,
) -> PortfolioReport {
    PortfolioReport {
        total: products.len(),
        by_category: category_counts(products),
        by_stage: stage_distribution(products).counts,
        top_performers: top_performers(products, config.recommendations.top_performer_limit),
        under_performers: under_performers(products),
        metrics: metrics.to_vec(),
        recommendations: recommendations.clone(),
        generated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::scores::{PORTFOLIO_BALANCE, TRANSITION_EFFICIENCY};
    use crate::analytics::test_support::{at, portfolio};
    use LifecycleStage::*;

    #[test]
    fn test_product_report_categories() {
        let mut products = portfolio(1, 1, 1, 0);
        products[0].category = Some("Metering".into());
        products[1].category = Some("Metering".into());
        products[2].category = Some("  ".into());

        let report = product_report(&products, at(2025, 1, 1));
        assert_eq!(report.total, 3);
        assert_eq!(report.by_category["Metering"], 2);
        assert_eq!(report.by_category[UNCATEGORIZED], 1);
        assert_eq!(report.by_stage[&Growth], 1);
        assert_eq!(report.by_stage[&Decline], 0);
        assert_eq!(report.generated_at, at(2025, 1, 1));
    }

    #[test]
    fn test_lifecycle_notes() {
        let report = lifecycle_report(&portfolio(3, 1, 0, 2), at(2025, 1, 1));
        assert_eq!(report.notes.len(), 2);
        assert!(report.notes[0].contains("growth strategies"));
        assert_eq!(report.notes[1], "2 products in decline stage need attention");

        let quiet = lifecycle_report(&portfolio(1, 1, 1, 0), at(2025, 1, 1));
        assert!(quiet.notes.is_empty());
    }

    #[test]
    fn test_performers_keep_input_order() {
        // Ids 1..=7 are Growth, 8 Maturity, 9 and 10 Decline.
        let products = portfolio(0, 7, 1, 2);
        let report =
            performance_report(&products, &[], at(2025, 1, 1), &AnalyticsConfig::default());

        let top: Vec<ProductId> = report.top_performers.iter().map(|p| p.id).collect();
        assert_eq!(top, vec![1, 2, 3, 4, 5]);
        let under: Vec<ProductId> = report.under_performers.iter().map(|p| p.id).collect();
        assert_eq!(under, vec![9, 10]);
        assert_eq!(report.score_card.metrics.len(), 5);
        assert_eq!(
            report.score_card.get(TRANSITION_EFFICIENCY).map(|m| m.value),
            Some(50.0)
        );
    }

    #[test]
    fn test_portfolio_report_carries_inputs() {
        let products = portfolio(3, 4, 2, 1);
        let config = AnalyticsConfig::default();
        let card = score_card(&products, &[], at(2025, 1, 1), &config);
        let recommendations = RecommendationSet::default();

        let report = portfolio_report(
            &products,
            &card.metrics,
            &recommendations,
            at(2025, 1, 1),
            &config,
        );
        assert_eq!(report.total, 10);
        assert_eq!(report.by_stage[&Introduction], 3);
        assert_eq!(report.top_performers.len(), 5);
        assert_eq!(report.under_performers.len(), 1);
        let balance = report
            .metrics
            .iter()
            .find(|m| m.name == PORTFOLIO_BALANCE)
            .map(|m| m.value);
        assert!(balance.is_some_and(|v| (v - 80.0).abs() < 1e-9));
    }
}
