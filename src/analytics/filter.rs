//! Segment, stage and time-range narrowing of a snapshot before analysis.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{LifecycleHistoryRecord, LifecycleStage, Product, Segment};

/// Dashboard filter controls. `None` means "all".
///
/// `since_days` keeps products launched on or after the cutoff day and
/// history records changed at or after the cutoff instant. Products without
/// a launch date and records without a change date never match a time range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotFilter {
    pub segment: Option<Segment>,
    pub stage: Option<LifecycleStage>,
    pub since_days: Option<u32>,
}

impl SnapshotFilter {
    pub fn is_empty(&self) -> bool {
        self.segment.is_none() && self.stage.is_none() && self.since_days.is_none()
    }

    fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.since_days
            .map(|days| now - Duration::days(i64::from(days)))
    }

    pub fn matches_product(&self, product: &Product, now: DateTime<Utc>) -> bool {
        if let Some(segment) = self.segment {
            if product.segment_tag() != Some(segment) {
                return false;
            }
        }
        if let Some(stage) = self.stage {
            if !product.is_in(stage) {
                return false;
            }
        }
        match self.cutoff(now) {
            Some(cutoff) => product
                .launch_date
                .is_some_and(|launch| launch >= cutoff.date_naive()),
            None => true,
        }
    }

    pub fn matches_record(&self, record: &LifecycleHistoryRecord, now: DateTime<Utc>) -> bool {
        if let Some(segment) = self.segment {
            if record.segment.as_deref().and_then(Segment::parse) != Some(segment) {
                return false;
            }
        }
        if let Some(stage) = self.stage {
            if record.new_stage != stage {
                return false;
            }
        }
        match self.cutoff(now) {
            Some(cutoff) => record.change_date.is_some_and(|at| at >= cutoff),
            None => true,
        }
    }

    pub fn products(&self, products: &[Product], now: DateTime<Utc>) -> Vec<Product> {
        products
            .iter()
            .filter(|p| self.matches_product(p, now))
            .cloned()
            .collect()
    }

    pub fn history(
        &self,
        history: &[LifecycleHistoryRecord],
        now: DateTime<Utc>,
    ) -> Vec<LifecycleHistoryRecord> {
        history
            .iter()
            .filter(|r| self.matches_record(r, now))
            .cloned()
            .collect()
    }
}
