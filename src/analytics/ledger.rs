//! Transition ledger: per-product history trajectories and what can be
//! derived from them (dwell times, velocity trends, transition matrices).
//!
//! Dwell times are keyed by the stage the product arrived in at the earlier
//! record paired with the stage it arrived in at the later record, so the
//! key names the stage the product was sitting in and where it went next.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::config::TrendThresholds;
use crate::error::AnalyticsError;
use crate::types::{LifecycleHistoryRecord, LifecycleStage, ProductId, Segment};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// History records grouped per product, each group in ascending
/// `change_date` order.
pub type ProductHistories<'a> = BTreeMap<ProductId, Vec<&'a LifecycleHistoryRecord>>;

/// Ordered stage pair, rendered as `From-To`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransitionKey {
    pub from: LifecycleStage,
    pub to: LifecycleStage,
}

impl TransitionKey {
    pub fn new(from: LifecycleStage, to: LifecycleStage) -> Self {
        Self { from, to }
    }
}

impl std::fmt::Display for TransitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

impl Serialize for TransitionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionTrends {
    pub accelerating: Vec<ProductId>,
    pub slowing: Vec<ProductId>,
    pub stagnant: Vec<ProductId>,
}

impl TransitionTrends {
    pub fn is_empty(&self) -> bool {
        self.accelerating.is_empty() && self.slowing.is_empty() && self.stagnant.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────
// Grouping and dwell times
// ─────────────────────────────────────────────────────────────────────

/// Group records by product and sort each group chronologically.
///
/// Fails if any record lacks a `change_date`; no partial grouping is
/// returned because every consumer depends on the ordering.
pub fn group_by_product(
    history: &[LifecycleHistoryRecord],
) -> Result<ProductHistories<'_>, AnalyticsError> {
    let mut grouped: ProductHistories<'_> = BTreeMap::new();
    for record in history {
        record.changed_at()?;
        grouped.entry(record.product_id).or_default().push(record);
    }
    for records in grouped.values_mut() {
        records.sort_by_key(|r| r.change_date);
    }
    Ok(grouped)
}

fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Consecutive record pairs of one trajectory with the fractional days
/// between them.
fn gaps<'a>(
    records: &'a [&'a LifecycleHistoryRecord],
) -> impl Iterator<Item = (TransitionKey, f64)> + 'a {
    records.windows(2).filter_map(|pair| {
        let (prev, curr) = (pair[0], pair[1]);
        let days = days_between(prev.change_date?, curr.change_date?);
        Some((TransitionKey::new(prev.new_stage, curr.new_stage), days))
    })
}

pub fn dwell_times(grouped: &ProductHistories<'_>) -> BTreeMap<TransitionKey, Vec<f64>> {
    let mut dwell: BTreeMap<TransitionKey, Vec<f64>> = BTreeMap::new();
    for records in grouped.values() {
        for (key, days) in gaps(records) {
            dwell.entry(key).or_default().push(days);
        }
    }
    dwell
}

/// Mean dwell per key. Keys with no samples are omitted.
pub fn average_dwell_times(dwell: &BTreeMap<TransitionKey, Vec<f64>>) -> BTreeMap<TransitionKey, f64> {
    dwell
        .iter()
        .filter(|(_, samples)| !samples.is_empty())
        .map(|(key, samples)| (*key, samples.iter().sum::<f64>() / samples.len() as f64))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────
// Velocity trends
// ─────────────────────────────────────────────────────────────────────

/// Bucket products by how their transition pace is changing.
///
/// Gaps are whole days. A product needs at least two gaps (three records)
/// to be accelerating or slowing; a product with a single record is
/// stagnant once it has sat for longer than `stagnation_days`.
pub fn classify_trends(
    grouped: &ProductHistories<'_>,
    now: DateTime<Utc>,
    thresholds: &TrendThresholds,
) -> TransitionTrends {
    let mut trends = TransitionTrends::default();

    for (product_id, records) in grouped {
        match records.len() {
            0 => {}
            1 => {
                let Some(at) = records[0].change_date else {
                    continue;
                };
                let days_since = days_between(at, now).round() as i64;
                if days_since > thresholds.stagnation_days {
                    trends.stagnant.push(*product_id);
                }
            }
            _ => {
                let day_gaps: Vec<f64> = gaps(records).map(|(_, days)| days.round()).collect();
                if day_gaps.len() < 2 {
                    continue;
                }
                let first = day_gaps[0];
                let last = day_gaps[day_gaps.len() - 1];
                if last < first * thresholds.acceleration_factor {
                    trends.accelerating.push(*product_id);
                } else if last > first * thresholds.slowing_factor {
                    trends.slowing.push(*product_id);
                }
            }
        }
    }

    log::debug!(
        "Trend buckets: {} accelerating, {} slowing, {} stagnant",
        trends.accelerating.len(),
        trends.slowing.len(),
        trends.stagnant.len()
    );
    trends
}

// ─────────────────────────────────────────────────────────────────────
// Transition matrices
// ─────────────────────────────────────────────────────────────────────

/// Count of records moving from `from` (none for a first entry) to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionCount {
    pub from: Option<LifecycleStage>,
    pub to: LifecycleStage,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionStats {
    pub total: usize,
    pub most_common: Option<TransitionCount>,
    /// Share of transitions that were forward moves into Growth or Maturity.
    pub success_rate: u32,
}

/// Record counts per `(previous_stage, new_stage)`, in first-seen order.
pub fn transition_counts(history: &[LifecycleHistoryRecord]) -> Vec<TransitionCount> {
    let mut counts: Vec<TransitionCount> = Vec::new();
    for record in history {
        match counts
            .iter_mut()
            .find(|c| c.from == record.previous_stage && c.to == record.new_stage)
        {
            Some(existing) => existing.count += 1,
            None => counts.push(TransitionCount {
                from: record.previous_stage,
                to: record.new_stage,
                count: 1,
            }),
        }
    }
    counts
}

fn count_of(counts: &[TransitionCount], from: LifecycleStage, to: LifecycleStage) -> usize {
    counts
        .iter()
        .find(|c| c.from == Some(from) && c.to == to)
        .map(|c| c.count)
        .unwrap_or(0)
}

/// The twelve off-diagonal cells of the stage × stage matrix.
pub fn transition_heatmap(history: &[LifecycleHistoryRecord]) -> Vec<TransitionCount> {
    let counts = transition_counts(history);
    let mut cells = Vec::with_capacity(12);
    for from in LifecycleStage::ALL {
        for to in LifecycleStage::ALL {
            if from != to {
                cells.push(TransitionCount {
                    from: Some(from),
                    to,
                    count: count_of(&counts, from, to),
                });
            }
        }
    }
    cells
}

/// Counts of the canonical forward moves (Introduction→Growth,
/// Growth→Maturity, Maturity→Decline).
pub fn transition_flow(history: &[LifecycleHistoryRecord]) -> Vec<TransitionCount> {
    let counts = transition_counts(history);
    LifecycleStage::ALL
        .iter()
        .filter_map(|from| from.next().map(|to| (*from, to)))
        .map(|(from, to)| TransitionCount {
            from: Some(from),
            to,
            count: count_of(&counts, from, to),
        })
        .collect()
}

pub fn transition_stats(history: &[LifecycleHistoryRecord]) -> TransitionStats {
    let counts = transition_counts(history);
    let total: usize = counts.iter().map(|c| c.count).sum();

    // First-seen pair wins ties.
    let most_common = counts.iter().fold(None::<&TransitionCount>, |best, c| match best {
        Some(b) if b.count >= c.count => Some(b),
        _ => Some(c),
    });

    let forward = count_of(&counts, LifecycleStage::Introduction, LifecycleStage::Growth)
        + count_of(&counts, LifecycleStage::Growth, LifecycleStage::Maturity);
    let success_rate = if total > 0 {
        (forward as f64 / total as f64 * 100.0).round() as u32
    } else {
        0
    };

    TransitionStats {
        total,
        most_common: most_common.cloned(),
        success_rate,
    }
}

/// Arrivals per stage broken down by the record's segment. Only genuine
/// transitions (records with a previous stage) count.
pub fn segment_transition_matrix(
    history: &[LifecycleHistoryRecord],
) -> BTreeMap<Segment, BTreeMap<LifecycleStage, usize>> {
    let mut matrix: BTreeMap<Segment, BTreeMap<LifecycleStage, usize>> = BTreeMap::new();
    for record in history.iter().filter(|r| r.previous_stage.is_some()) {
        let Some(segment) = record.segment.as_deref().and_then(Segment::parse) else {
            continue;
        };
        *matrix
            .entry(segment)
            .or_default()
            .entry(record.new_stage)
            .or_insert(0) += 1;
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::{at, days_before, record};
    use LifecycleStage::*;

    fn now() -> DateTime<Utc> {
        at(2025, 6, 1)
    }

    #[test]
    fn test_group_by_product_sorts_and_preserves_records() {
        let history = vec![
            record(2, Some(Introduction), Growth, at(2024, 5, 1)),
            record(1, Some(Growth), Maturity, at(2024, 3, 1)),
            record(1, None, Introduction, at(2023, 1, 1)),
            record(2, None, Introduction, at(2024, 1, 1)),
            record(1, Some(Introduction), Growth, at(2023, 6, 1)),
        ];
        let grouped = group_by_product(&history).unwrap();

        assert_eq!(grouped.len(), 2);
        for records in grouped.values() {
            assert!(records.windows(2).all(|w| w[0].change_date <= w[1].change_date));
        }
        let flattened: usize = grouped.values().map(Vec::len).sum();
        assert_eq!(flattened, history.len());
        for original in &history {
            let group = &grouped[&original.product_id];
            assert_eq!(group.iter().filter(|r| ***r == *original).count(), 1);
        }
        assert_eq!(grouped[&1][0].new_stage, Introduction);
        assert_eq!(grouped[&1][2].new_stage, Maturity);
    }

    #[test]
    fn test_group_by_product_fails_on_missing_date() {
        let mut bad = record(4, None, Introduction, at(2024, 1, 1));
        bad.change_date = None;
        let history = vec![record(1, None, Introduction, at(2024, 1, 1)), bad];
        let err = group_by_product(&history).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::MissingField {
                product_id: 4,
                field: "change_date"
            }
        ));
    }

    #[test]
    fn test_dwell_key_uses_arrival_stages() {
        let history = vec![
            record(1, None, Introduction, at(2024, 1, 1)),
            record(1, Some(Introduction), Growth, at(2024, 1, 31)),
            record(1, Some(Growth), Maturity, at(2024, 3, 1)),
        ];
        let grouped = group_by_product(&history).unwrap();
        let dwell = dwell_times(&grouped);

        assert_eq!(dwell.len(), 2);
        assert_eq!(dwell[&TransitionKey::new(Introduction, Growth)], vec![30.0]);
        assert_eq!(dwell[&TransitionKey::new(Growth, Maturity)], vec![30.0]);
    }

    #[test]
    fn test_dwell_days_are_fractional() {
        let start = at(2024, 1, 1);
        let history = vec![
            record(1, None, Introduction, start),
            record(1, Some(Introduction), Growth, start + chrono::Duration::hours(36)),
        ];
        let grouped = group_by_product(&history).unwrap();
        let dwell = dwell_times(&grouped);
        assert_eq!(dwell[&TransitionKey::new(Introduction, Growth)], vec![1.5]);
    }

    #[test]
    fn test_average_dwell_times_omits_empty_keys() {
        let mut dwell = BTreeMap::new();
        dwell.insert(TransitionKey::new(Introduction, Growth), vec![100.0, 200.0]);
        dwell.insert(TransitionKey::new(Growth, Maturity), vec![]);
        let avg = average_dwell_times(&dwell);
        assert_eq!(avg.len(), 1);
        assert_eq!(avg[&TransitionKey::new(Introduction, Growth)], 150.0);
    }

    #[test]
    fn test_transition_key_serializes_as_string() {
        let mut map = BTreeMap::new();
        map.insert(TransitionKey::new(Maturity, Decline), 3.0);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"Maturity-Decline":3.0}"#);
    }

    #[test]
    fn test_single_old_record_is_stagnant() {
        let history = vec![record(1, None, Introduction, days_before(now(), 200))];
        let grouped = group_by_product(&history).unwrap();
        let trends = classify_trends(&grouped, now(), &TrendThresholds::default());
        assert_eq!(trends.stagnant, vec![1]);
        assert!(trends.accelerating.is_empty());
        assert!(trends.slowing.is_empty());
    }

    #[test]
    fn test_single_recent_record_is_not_stagnant() {
        let history = vec![record(1, None, Introduction, days_before(now(), 180))];
        let grouped = group_by_product(&history).unwrap();
        let trends = classify_trends(&grouped, now(), &TrendThresholds::default());
        assert!(trends.is_empty());
    }

    #[test]
    fn test_accelerating_and_slowing() {
        let history = vec![
            // Product 1: 100-day gap then 50-day gap.
            record(1, None, Introduction, at(2024, 1, 1)),
            record(1, Some(Introduction), Growth, at(2024, 4, 10)),
            record(1, Some(Growth), Maturity, at(2024, 5, 30)),
            // Product 2: 30-day gap then 60-day gap.
            record(2, None, Introduction, at(2024, 1, 1)),
            record(2, Some(Introduction), Growth, at(2024, 1, 31)),
            record(2, Some(Growth), Maturity, at(2024, 3, 31)),
            // Product 3: equal gaps.
            record(3, None, Introduction, at(2024, 1, 1)),
            record(3, Some(Introduction), Growth, at(2024, 1, 31)),
            record(3, Some(Growth), Maturity, at(2024, 3, 1)),
        ];
        let grouped = group_by_product(&history).unwrap();
        let trends = classify_trends(&grouped, now(), &TrendThresholds::default());
        assert_eq!(trends.accelerating, vec![1]);
        assert_eq!(trends.slowing, vec![2]);
        assert!(trends.stagnant.is_empty());
    }

    #[test]
    fn test_two_records_have_no_velocity_trend() {
        let history = vec![
            record(5, None, Introduction, at(2020, 1, 1)),
            record(5, Some(Introduction), Growth, at(2020, 2, 1)),
        ];
        let grouped = group_by_product(&history).unwrap();
        let trends = classify_trends(&grouped, now(), &TrendThresholds::default());
        assert!(trends.is_empty());
    }

    #[test]
    fn test_empty_history_has_no_trends() {
        let grouped = group_by_product(&[]).unwrap();
        let trends = classify_trends(&grouped, now(), &TrendThresholds::default());
        assert!(trends.is_empty());
    }

    #[test]
    fn test_classify_trends_is_deterministic() {
        let history = vec![
            record(1, None, Introduction, days_before(now(), 400)),
            record(2, None, Introduction, at(2024, 1, 1)),
            record(2, Some(Introduction), Growth, at(2024, 4, 10)),
            record(2, Some(Growth), Maturity, at(2024, 5, 30)),
        ];
        let grouped = group_by_product(&history).unwrap();
        let a = classify_trends(&grouped, now(), &TrendThresholds::default());
        let b = classify_trends(&grouped, now(), &TrendThresholds::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_transition_counts_and_stats() {
        let history = vec![
            record(1, None, Introduction, at(2024, 1, 1)),
            record(1, Some(Introduction), Growth, at(2024, 2, 1)),
            record(2, Some(Introduction), Growth, at(2024, 2, 1)),
            record(3, Some(Growth), Maturity, at(2024, 2, 1)),
            record(4, Some(Maturity), Decline, at(2024, 2, 1)),
        ];
        let counts = transition_counts(&history);
        assert_eq!(counts.len(), 4);
        assert_eq!(counts[0].from, None);

        let stats = transition_stats(&history);
        assert_eq!(stats.total, 5);
        let top = stats.most_common.unwrap();
        assert_eq!((top.from, top.to, top.count), (Some(Introduction), Growth, 2));
        assert_eq!(stats.success_rate, 60);
    }

    #[test]
    fn test_transition_stats_empty() {
        let stats = transition_stats(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.most_common, None);
        assert_eq!(stats.success_rate, 0);
    }

    #[test]
    fn test_most_common_tie_prefers_first_seen() {
        let history = vec![
            record(1, Some(Growth), Maturity, at(2024, 1, 1)),
            record(2, Some(Introduction), Growth, at(2024, 1, 1)),
        ];
        let top = transition_stats(&history).most_common.unwrap();
        assert_eq!(top.from, Some(Growth));
    }

    #[test]
    fn test_heatmap_and_flow() {
        let history = vec![
            record(1, Some(Introduction), Growth, at(2024, 1, 1)),
            record(2, Some(Decline), Growth, at(2024, 1, 1)),
            record(3, None, Introduction, at(2024, 1, 1)),
        ];
        let heatmap = transition_heatmap(&history);
        assert_eq!(heatmap.len(), 12);
        assert!(heatmap.iter().all(|c| c.from != Some(c.to)));
        let revival = heatmap
            .iter()
            .find(|c| c.from == Some(Decline) && c.to == Growth)
            .unwrap();
        assert_eq!(revival.count, 1);

        let flow = transition_flow(&history);
        assert_eq!(flow.len(), 3);
        assert_eq!(flow[0].count, 1);
        assert_eq!(flow[1].count, 0);
    }

    #[test]
    fn test_segment_transition_matrix() {
        let mut a = record(1, Some(Introduction), Growth, at(2024, 1, 1));
        a.segment = Some("Distribusi".into());
        let mut b = record(2, None, Introduction, at(2024, 1, 1));
        b.segment = Some("Distribusi".into());
        let mut c = record(3, Some(Growth), Maturity, at(2024, 1, 1));
        c.segment = Some("Unknown".into());

        let matrix = segment_transition_matrix(&[a, b, c]);
        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix[&Segment::Distribution][&Growth], 1);
        assert_eq!(matrix[&Segment::Distribution].get(&Introduction), None);
    }
}
