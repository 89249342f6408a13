//! Per-product lifecycle insights and next-stage predictions.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::analytics::ledger::{average_dwell_times, dwell_times, ProductHistories, TransitionKey};
use crate::types::{LifecycleStage, Product, ProductId};

const DAYS_PER_MONTH: f64 = 30.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;
/// Alert when a product is this many months or fewer from its expected shift.
const SHIFT_ALERT_MONTHS: i64 = 3;
const UNKNOWN_STAGE_MONTHS: i64 = 12;

/// Typical months a product spends in each stage.
fn typical_stage_months(stage: Option<LifecycleStage>) -> i64 {
    match stage {
        Some(LifecycleStage::Introduction) => 12,
        Some(LifecycleStage::Growth) => 24,
        Some(LifecycleStage::Maturity) => 36,
        Some(LifecycleStage::Decline) => 18,
        None => UNKNOWN_STAGE_MONTHS,
    }
}

fn stage_advice(stage: Option<LifecycleStage>) -> &'static str {
    match stage {
        Some(LifecycleStage::Introduction) => "Focus on market education and product promotion.",
        Some(LifecycleStage::Growth) => "Strengthen distribution and increase production capacity.",
        Some(LifecycleStage::Maturity) => {
            "Innovate on features and improve cost efficiency to hold market share."
        }
        Some(LifecycleStage::Decline) => "Evaluate diversification or discontinuing the product.",
        None => "Monitor the product's progress regularly.",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInsight {
    pub product_id: ProductId,
    pub product_name: String,
    pub stage: Option<LifecycleStage>,
    pub months_in_stage: i64,
    pub advice: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ShiftAlertKind {
    Approaching {
        #[serde(rename = "monthsRemaining")]
        months_remaining: i64,
    },
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftAlert {
    pub product_id: ProductId,
    pub product_name: String,
    pub stage: Option<LifecycleStage>,
    pub alert: ShiftAlertKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInsights {
    pub insights: Vec<ProductInsight>,
    pub alerts: Vec<ShiftAlert>,
}

fn stage_label(stage: Option<LifecycleStage>) -> &'static str {
    stage.map(|s| s.as_str()).unwrap_or("an unrecognized stage")
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

/// Stage advice for every product with a known stage entry date, plus shift
/// alerts for products at or past their typical stage duration.
///
/// The stage entry date is the product's latest history record, falling
/// back to its launch date.
pub fn product_insights(
    products: &[Product],
    grouped: &ProductHistories<'_>,
    now: DateTime<Utc>,
) -> ProductInsights {
    let mut out = ProductInsights::default();

    for product in products {
        let entered = grouped
            .get(&product.id)
            .and_then(|records| records.last())
            .and_then(|r| r.change_date)
            .or_else(|| product.launch_date.and_then(midnight));
        let Some(entered) = entered else {
            continue;
        };

        let days_in_stage = (now - entered).num_milliseconds() as f64 / MILLIS_PER_DAY;
        let months_in_stage = (days_in_stage / DAYS_PER_MONTH).floor() as i64;
        let months_to_shift = typical_stage_months(product.lifecycle_stage) - months_in_stage;
        let stage = product.lifecycle_stage;

        if months_to_shift <= 0 {
            out.alerts.push(ShiftAlert {
                product_id: product.id,
                product_name: product.name.clone(),
                stage,
                alert: ShiftAlertKind::Overdue,
                message: format!(
                    "{} should already have moved on from {}. Review its strategy.",
                    product.name,
                    stage_label(stage)
                ),
            });
        } else if months_to_shift <= SHIFT_ALERT_MONTHS {
            out.alerts.push(ShiftAlert {
                product_id: product.id,
                product_name: product.name.clone(),
                stage,
                alert: ShiftAlertKind::Approaching {
                    months_remaining: months_to_shift,
                },
                message: format!(
                    "{} is expected to move on from {} within {} months.",
                    product.name,
                    stage_label(stage),
                    months_to_shift
                ),
            });
        }

        out.insights.push(ProductInsight {
            product_id: product.id,
            product_name: product.name.clone(),
            stage,
            months_in_stage,
            advice: stage_advice(stage).to_string(),
        });
    }

    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPrediction {
    pub from: LifecycleStage,
    pub to: LifecycleStage,
    pub product_count: usize,
    pub average_dwell_days: f64,
    pub predicted_date: DateTime<Utc>,
    pub days_until: i64,
    pub overdue: bool,
}

/// Predict when the products in each non-terminal stage will reach the next
/// stage: mean launch date of the stage's products plus the observed average
/// dwell time for that move.
pub fn transition_predictions(
    products: &[Product],
    grouped: &ProductHistories<'_>,
    now: DateTime<Utc>,
) -> Vec<TransitionPrediction> {
    let averages = average_dwell_times(&dwell_times(grouped));
    let mut predictions = Vec::new();

    for from in LifecycleStage::ALL {
        let Some(to) = from.next() else {
            continue;
        };
        let in_stage: Vec<&Product> = products.iter().filter(|p| p.is_in(from)).collect();
        if in_stage.is_empty() {
            continue;
        }
        let Some(avg_days) = averages
            .get(&TransitionKey::new(from, to))
            .copied()
            .filter(|d| *d > 0.0)
        else {
            continue;
        };

        let launches: Vec<i64> = in_stage
            .iter()
            .filter_map(|p| p.launch_date.and_then(midnight))
            .map(|dt| dt.timestamp_millis())
            .collect();
        if launches.is_empty() {
            continue;
        }
        let mean_launch_millis = launches.iter().sum::<i64>() / launches.len() as i64;
        let Some(mean_launch) = DateTime::<Utc>::from_timestamp_millis(mean_launch_millis) else {
            continue;
        };

        let predicted_date =
            mean_launch + Duration::milliseconds((avg_days * MILLIS_PER_DAY).round() as i64);
        let days_until =
            ((predicted_date - now).num_milliseconds() as f64 / MILLIS_PER_DAY).floor() as i64;

        predictions.push(TransitionPrediction {
            from,
            to,
            product_count: in_stage.len(),
            average_dwell_days: avg_days,
            predicted_date,
            days_until,
            overdue: days_until < 0,
        });
    }

    predictions
}
