//! Rule-based strategic recommendations.
//!
//! Three independent rule families: per-stage advice, velocity-trend
//! follow-ups, and whole-portfolio shape warnings. Rules never short-circuit;
//! every rule whose condition holds contributes its record.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analytics::distribution::StageDistribution;
use crate::analytics::ledger::TransitionTrends;
use crate::config::RecommendationThresholds;
use crate::types::{
    LifecycleStage, Product, ProductId, Recommendation, RecommendationCategory,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSet {
    pub stage: BTreeMap<LifecycleStage, Vec<Recommendation>>,
    pub trend: Vec<Recommendation>,
    pub portfolio: Vec<Recommendation>,
}

impl RecommendationSet {
    pub fn len(&self) -> usize {
        self.stage.values().map(Vec::len).sum::<usize>() + self.trend.len() + self.portfolio.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn generate_recommendations(
    distribution: &StageDistribution,
    trends: &TransitionTrends,
    products: &[Product],
    thresholds: &RecommendationThresholds,
) -> RecommendationSet {
    let set = RecommendationSet {
        stage: stage_recommendations(distribution, thresholds),
        trend: trend_recommendations(trends, products),
        portfolio: portfolio_recommendations(distribution, thresholds),
    };
    log::debug!("Generated {} recommendations", set.len());
    set
}

// ─────────────────────────────────────────────────────────────────────
// Stage rules
// ─────────────────────────────────────────────────────────────────────

pub fn stage_recommendations(
    distribution: &StageDistribution,
    thresholds: &RecommendationThresholds,
) -> BTreeMap<LifecycleStage, Vec<Recommendation>> {
    let mut out = BTreeMap::new();
    for stage in LifecycleStage::ALL {
        let count = distribution.count(stage);
        if count == 0 {
            out.insert(stage, Vec::new());
            continue;
        }
        let percent = distribution.percent(stage);
        let mut recs = stage_playbook(stage, count);
        let over_threshold = thresholds
            .stage_warning_percent
            .get(&stage)
            .is_some_and(|limit| percent > *limit);
        if over_threshold {
            recs.push(stage_warning(stage, percent));
        }
        out.insert(stage, recs);
    }
    out
}

fn stage_playbook(stage: LifecycleStage, count: usize) -> Vec<Recommendation> {
    let cat = RecommendationCategory::from(stage);
    match stage {
        LifecycleStage::Introduction => vec![
            Recommendation::new(
                cat,
                "Market Penetration Strategy",
                format!(
                    "Focus on the {} products in Introduction by building awareness and educating the market.",
                    count
                ),
                "Step up marketing and education to introduce the products to a wider target market.",
            ),
            Recommendation::new(
                cat,
                "Feature Development",
                "Collect early feedback and prioritise the features the market needs most.",
                "Run user surveys and competitor analysis to identify which features to prioritise.",
            ),
        ],
        LifecycleStage::Growth => vec![
            Recommendation::new(
                cat,
                "Scalability Optimisation",
                format!(
                    "Make sure the {} products in Growth can scale to meet rising demand.",
                    count
                ),
                "Review infrastructure and production processes to confirm they can absorb higher volume.",
            ),
            Recommendation::new(
                cat,
                "Market Expansion",
                "Identify new market segments and geographic expansion opportunities.",
                "Run a market analysis to find promising new segments or regions.",
            ),
        ],
        LifecycleStage::Maturity => vec![
            Recommendation::new(
                cat,
                "Product Differentiation",
                format!(
                    "Keep the {} products in Maturity relevant through incremental innovation.",
                    count
                ),
                "Refresh features and design to set the products apart from competitors.",
            ),
            Recommendation::new(
                cat,
                "Margin Optimisation",
                "Focus on operational efficiency and cost optimisation to maximise profitability.",
                "Review the supply chain and production processes for cost-reduction opportunities.",
            ),
        ],
        LifecycleStage::Decline => vec![
            Recommendation::new(
                cat,
                "Harvesting Strategy",
                format!(
                    "Maximise the remaining value of the {} products in Decline.",
                    count
                ),
                "Cut marketing investment and focus on the loyal customers still using the products.",
            ),
            Recommendation::new(
                cat,
                "Discontinuation Review",
                "Identify products that are no longer profitable and should be retired.",
                "Run a profitability analysis and set a retirement timeline for unprofitable products.",
            ),
        ],
    }
}

fn stage_warning(stage: LifecycleStage, percent: u32) -> Recommendation {
    let cat = RecommendationCategory::from(stage);
    match stage {
        LifecycleStage::Introduction => Recommendation::new(
            cat,
            "Portfolio Warning",
            format!(
                "{}% of the portfolio is in Introduction, which carries high risk.",
                percent
            ),
            "Rebalance by launching fewer new products and concentrating on the most promising ones.",
        ),
        LifecycleStage::Growth => Recommendation::new(
            cat,
            "Investment Focus",
            format!(
                "With {}% of products in Growth, allocate resources to maximise that growth.",
                percent
            ),
            "Raise the marketing and development budget for Growth-stage products.",
        ),
        LifecycleStage::Maturity => Recommendation::new(
            cat,
            "Innovation Warning",
            format!(
                "With {}% of products in Maturity, the portfolio risks losing relevance.",
                percent
            ),
            "Increase R&D investment to develop innovative new products.",
        ),
        LifecycleStage::Decline => Recommendation::new(
            cat,
            "Revenue Warning",
            format!(
                "With {}% of products in Decline, future revenue is at significant risk.",
                percent
            ),
            "Accelerate new product development and acquisitions to replace declining revenue.",
        ),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Trend rules
// ─────────────────────────────────────────────────────────────────────

/// Current stages of the given products, in lifecycle order, as a
/// comma-separated list.
fn affected_stages(ids: &[ProductId], products: &[Product]) -> String {
    LifecycleStage::ALL
        .iter()
        .filter(|stage| {
            products
                .iter()
                .any(|p| p.is_in(**stage) && ids.contains(&p.id))
        })
        .map(LifecycleStage::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn trend_recommendations(
    trends: &TransitionTrends,
    products: &[Product],
) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if !trends.accelerating.is_empty() {
        recs.push(Recommendation::new(
            RecommendationCategory::Trend,
            "Fast-Cycling Products",
            format!(
                "{} products are moving between lifecycle stages faster than before.",
                trends.accelerating.len()
            ),
            format!(
                "Prepare for earlier stage changes, especially for products in {}.",
                affected_stages(&trends.accelerating, products)
            ),
        ));
    }

    if !trends.slowing.is_empty() {
        recs.push(Recommendation::new(
            RecommendationCategory::Trend,
            "Slowing Products",
            format!(
                "{} products are taking longer to move between lifecycle stages.",
                trends.slowing.len()
            ),
            format!(
                "Find what is holding them back and intervene for products in {}.",
                affected_stages(&trends.slowing, products)
            ),
        ));
    }

    if !trends.stagnant.is_empty() {
        recs.push(Recommendation::new(
            RecommendationCategory::Trend,
            "Stagnant Products",
            format!(
                "{} products have stayed in their current stage for more than 6 months.",
                trends.stagnant.len()
            ),
            format!(
                "Review the stagnant products in {} and decide whether they need intervention or a move to the next stage.",
                affected_stages(&trends.stagnant, products)
            ),
        ));
    }

    recs
}

// ─────────────────────────────────────────────────────────────────────
// Portfolio rules
// ─────────────────────────────────────────────────────────────────────

/// Stage with the highest (or lowest) percentage. Ties go to the later
/// stage in lifecycle order.
fn extreme_stage(distribution: &StageDistribution, highest: bool) -> LifecycleStage {
    LifecycleStage::ALL
        .into_iter()
        .reduce(|a, b| {
            let (pa, pb) = (distribution.percent(a), distribution.percent(b));
            let keep_a = if highest { pa > pb } else { pa < pb };
            if keep_a {
                a
            } else {
                b
            }
        })
        .unwrap_or(LifecycleStage::Introduction)
}

pub fn portfolio_recommendations(
    distribution: &StageDistribution,
    thresholds: &RecommendationThresholds,
) -> Vec<Recommendation> {
    let mut recs = Vec::new();
    let total = distribution.total;

    let highest = extreme_stage(distribution, true);
    let highest_pct = distribution.percent(highest);
    if highest_pct > thresholds.dominance_percent {
        let remedy = match highest {
            LifecycleStage::Introduction | LifecycleStage::Growth => {
                "developing more stable products"
            }
            LifecycleStage::Maturity | LifecycleStage::Decline => {
                "increasing innovation and new products"
            }
        };
        recs.push(Recommendation::new(
            RecommendationCategory::Portfolio,
            "Portfolio Imbalance",
            format!(
                "The portfolio is dominated by {} products ({}%).",
                highest, highest_pct
            ),
            format!("Diversify the portfolio by {}.", remedy),
        ));
    }

    let lowest = extreme_stage(distribution, false);
    let lowest_pct = distribution.percent(lowest);
    if lowest_pct < thresholds.gap_percent && total > thresholds.gap_min_total {
        let remedy = match lowest {
            LifecycleStage::Introduction => "Increase innovation and new product development",
            LifecycleStage::Growth => "Focus on growth strategies for promising products",
            LifecycleStage::Maturity => "Stabilise the products that are currently growing",
            LifecycleStage::Decline => "Review the products nearing the end of their lifecycle",
        };
        recs.push(Recommendation::new(
            RecommendationCategory::Portfolio,
            "Portfolio Gap",
            format!(
                "The portfolio has very few products in {} ({}%).",
                lowest, lowest_pct
            ),
            format!("{}.", remedy),
        ));
    }

    let early = distribution.count(LifecycleStage::Introduction)
        + distribution.count(LifecycleStage::Growth);
    if total < thresholds.limited_portfolio_size {
        recs.push(Recommendation::new(
            RecommendationCategory::Portfolio,
            "Limited Portfolio",
            format!(
                "The portfolio has only {} products, which concentrates business risk.",
                total
            ),
            "Consider developing or acquiring new products to spread the risk.",
        ));
    } else if total > thresholds.overextended_size
        && early as f64 > total as f64 * thresholds.early_stage_share
    {
        recs.push(Recommendation::new(
            RecommendationCategory::Portfolio,
            "Overextended Portfolio",
            format!(
                "The portfolio has too many early-stage products ({} of {}).",
                early, total
            ),
            "Prioritise the most promising products and consider stopping low-prospect projects.",
        ));
    }

    recs
}
