//! Time-bucketed views: stage arrivals per day and launches per month.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::AnalyticsError;
use crate::types::{LifecycleHistoryRecord, LifecycleStage, Product, Segment};

/// Stage arrivals per calendar day (UTC) of `change_date`. Only days that
/// appear in the history are present.
pub fn history_by_date(
    history: &[LifecycleHistoryRecord],
) -> Result<BTreeMap<NaiveDate, BTreeMap<LifecycleStage, usize>>, AnalyticsError> {
    let mut by_date: BTreeMap<NaiveDate, BTreeMap<LifecycleStage, usize>> = BTreeMap::new();
    for record in history {
        let day = record.changed_at()?.date_naive();
        let row = by_date
            .entry(day)
            .or_insert_with(|| LifecycleStage::ALL.iter().map(|s| (*s, 0)).collect());
        *row.entry(record.new_stage).or_insert(0) += 1;
    }
    Ok(by_date)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchMonth {
    pub total: usize,
    pub by_segment: BTreeMap<Segment, usize>,
}

/// Product launches per `YYYY-MM`. `total` counts every launched product;
/// `by_segment` only those with a recognized segment.
pub fn launches_by_month(products: &[Product]) -> BTreeMap<String, LaunchMonth> {
    let mut months: BTreeMap<String, LaunchMonth> = BTreeMap::new();
    for product in products {
        let Some(launch) = product.launch_date else {
            continue;
        };
        let key = format!("{}-{:02}", launch.year(), launch.month());
        let month = months.entry(key).or_insert_with(|| LaunchMonth {
            total: 0,
            by_segment: Segment::ALL.iter().map(|s| (*s, 0)).collect(),
        });
        month.total += 1;
        if let Some(segment) = product.segment_tag() {
            *month.by_segment.entry(segment).or_insert(0) += 1;
        }
    }
    months
}
