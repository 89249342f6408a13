//! Stage and segment distribution statistics.
//!
//! Products whose stage or segment falls outside the fixed sets are simply
//! not counted; `total` always reflects the full input length.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{LifecycleStage, Product, Segment};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDistribution {
    pub counts: BTreeMap<LifecycleStage, usize>,
    pub percentages: BTreeMap<LifecycleStage, u32>,
    pub total: usize,
}

impl StageDistribution {
    pub fn count(&self, stage: LifecycleStage) -> usize {
        self.counts.get(&stage).copied().unwrap_or(0)
    }

    pub fn percent(&self, stage: LifecycleStage) -> u32 {
        self.percentages.get(&stage).copied().unwrap_or(0)
    }

    /// Share of the full portfolio in `stage`, 0.0 when empty.
    pub fn proportion(&self, stage: LifecycleStage) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(stage) as f64 / self.total as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDistribution {
    pub counts: BTreeMap<Segment, usize>,
    pub percentages: BTreeMap<Segment, u32>,
    pub total: usize,
}

pub fn stage_distribution(products: &[Product]) -> StageDistribution {
    let mut counts: BTreeMap<LifecycleStage, usize> =
        LifecycleStage::ALL.iter().map(|s| (*s, 0)).collect();
    for stage in products.iter().filter_map(|p| p.lifecycle_stage) {
        *counts.entry(stage).or_insert(0) += 1;
    }
    let total = products.len();
    let percentages = percentages_of(&counts, total);
    StageDistribution {
        counts,
        percentages,
        total,
    }
}

pub fn segment_distribution(products: &[Product]) -> SegmentDistribution {
    let mut counts: BTreeMap<Segment, usize> = Segment::ALL.iter().map(|s| (*s, 0)).collect();
    for segment in products.iter().filter_map(Product::segment_tag) {
        *counts.entry(segment).or_insert(0) += 1;
    }
    let total = products.len();
    let percentages = percentages_of(&counts, total);
    SegmentDistribution {
        counts,
        percentages,
        total,
    }
}

fn percentages_of<K: Ord + Copy>(counts: &BTreeMap<K, usize>, total: usize) -> BTreeMap<K, u32> {
    counts
        .iter()
        .map(|(key, count)| {
            let pct = if total > 0 {
                (*count as f64 / total as f64 * 100.0).round() as u32
            } else {
                0
            };
            (*key, pct)
        })
        .collect()
}

/// Per-segment stage counts for the segment comparison view. Every known
/// segment appears, with all four stages zero-filled.
pub fn segment_stage_matrix(
    products: &[Product],
) -> BTreeMap<Segment, BTreeMap<LifecycleStage, usize>> {
    let mut matrix: BTreeMap<Segment, BTreeMap<LifecycleStage, usize>> = Segment::ALL
        .iter()
        .map(|seg| (*seg, LifecycleStage::ALL.iter().map(|s| (*s, 0)).collect()))
        .collect();
    for product in products {
        if let (Some(segment), Some(stage)) = (product.segment_tag(), product.lifecycle_stage) {
            if let Some(row) = matrix.get_mut(&segment) {
                *row.entry(stage).or_insert(0) += 1;
            }
        }
    }
    matrix
}

/// Sum of list prices per stage.
pub fn price_by_stage(products: &[Product]) -> BTreeMap<LifecycleStage, f64> {
    let mut totals: BTreeMap<LifecycleStage, f64> =
        LifecycleStage::ALL.iter().map(|s| (*s, 0.0)).collect();
    for product in products {
        if let (Some(stage), Some(price)) = (product.lifecycle_stage, product.price) {
            *totals.entry(stage).or_insert(0.0) += price;
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::portfolio;

    #[test]
    fn test_counts_and_percentages() {
        let products = portfolio(3, 4, 2, 1);
        let dist = stage_distribution(&products);
        assert_eq!(dist.total, 10);
        assert_eq!(dist.count(LifecycleStage::Growth), 4);
        assert_eq!(dist.percent(LifecycleStage::Introduction), 30);
        assert_eq!(dist.percent(LifecycleStage::Decline), 10);
        assert!((dist.proportion(LifecycleStage::Maturity) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let dist = stage_distribution(&[]);
        assert_eq!(dist.total, 0);
        assert_eq!(dist.counts.len(), 4);
        assert!(dist.counts.values().all(|c| *c == 0));
        assert!(dist.percentages.values().all(|p| *p == 0));
        assert_eq!(dist.proportion(LifecycleStage::Growth), 0.0);
    }

    #[test]
    fn test_unrecognized_stage_is_not_counted() {
        let mut products = portfolio(1, 1, 0, 0);
        let mut odd = Product::new(99, "Odd", LifecycleStage::Growth);
        odd.lifecycle_stage = None;
        products.push(odd);

        let dist = stage_distribution(&products);
        let counted: usize = dist.counts.values().sum();
        assert_eq!(dist.total, 3);
        assert_eq!(counted, 2);
        assert!(counted <= products.len());
    }

    #[test]
    fn test_percentages_sum_close_to_hundred() {
        for (i, g, m, d) in [(1, 1, 1, 0), (2, 3, 1, 1), (5, 0, 0, 2), (1, 1, 1, 1)] {
            let dist = stage_distribution(&portfolio(i, g, m, d));
            let sum: u32 = dist.percentages.values().sum();
            assert!((98..=102).contains(&sum), "sum {} for {:?}", sum, (i, g, m, d));
        }
    }

    #[test]
    fn test_segment_distribution_skips_unknown() {
        let mut products = portfolio(2, 1, 0, 0);
        products[0].segment = Some("Pembangkitan".into());
        products[1].segment = Some("generation".into());
        products[2].segment = Some("Retail".into());

        let dist = segment_distribution(&products);
        assert_eq!(dist.total, 3);
        assert_eq!(dist.counts[&Segment::Generation], 2);
        assert_eq!(dist.percentages[&Segment::Generation], 67);
        assert_eq!(dist.counts.values().sum::<usize>(), 2);
    }

    #[test]
    fn test_segment_stage_matrix() {
        let mut products = portfolio(1, 2, 0, 0);
        products[0].segment = Some("Korporat".into());
        products[1].segment = Some("Korporat".into());
        products[2].segment = None;

        let matrix = segment_stage_matrix(&products);
        assert_eq!(matrix.len(), 5);
        assert_eq!(matrix[&Segment::Corporate][&LifecycleStage::Introduction], 1);
        assert_eq!(matrix[&Segment::Corporate][&LifecycleStage::Growth], 1);
        assert_eq!(matrix[&Segment::Generation][&LifecycleStage::Growth], 0);
    }

    #[test]
    fn test_price_by_stage() {
        let mut products = portfolio(2, 0, 1, 0);
        products[0].price = Some(100.0);
        products[1].price = Some(50.5);
        products[2].price = None;

        let totals = price_by_stage(&products);
        assert_eq!(totals[&LifecycleStage::Introduction], 150.5);
        assert_eq!(totals[&LifecycleStage::Maturity], 0.0);
    }
}
