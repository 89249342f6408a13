//! Boundary validation for the product and lifecycle-history snapshots.
//!
//! The data-access collaborator hands over raw JSON arrays straight from the
//! catalog endpoints. Everything is checked here once, so the analytics core
//! works on typed records and never probes shapes at runtime.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AnalyticsError;
use crate::types::{LifecycleHistoryRecord, LifecycleStage, Product, ProductId};

#[derive(Debug, Deserialize)]
struct WireProduct {
    id: ProductId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    segment: Option<String>,
    #[serde(default)]
    lifecycle_stage: Option<String>,
    #[serde(default)]
    price: Option<Value>,
    #[serde(default)]
    launch_date: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireHistoryRecord {
    #[serde(default)]
    id: Option<i64>,
    product_id: ProductId,
    #[serde(default)]
    previous_stage: Option<String>,
    #[serde(default)]
    new_stage: Option<String>,
    #[serde(default, alias = "date")]
    change_date: Option<String>,
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    segment: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

/// Parse the `GET products` payload.
///
/// A product without a stage defaults to Introduction. A stage outside the
/// fixed set is kept as `None` so the product still appears in reports but
/// is skipped by stage counts.
pub fn parse_products(json: &str) -> Result<Vec<Product>, AnalyticsError> {
    let wire: Vec<WireProduct> = decode_array(json, "products")?;
    let products: Vec<Product> = wire.into_iter().map(into_product).collect();
    log::debug!("Ingested {} products", products.len());
    Ok(products)
}

/// Parse the `GET lifecycle history` payload.
///
/// Records whose new stage is missing or unrecognized carry no usable
/// transition and are dropped. An unparseable `change_date` is treated as missing; the
/// computations that need it report the gap themselves.
pub fn parse_history(json: &str) -> Result<Vec<LifecycleHistoryRecord>, AnalyticsError> {
    let wire: Vec<WireHistoryRecord> = decode_array(json, "history")?;
    let total = wire.len();
    let records: Vec<LifecycleHistoryRecord> = wire.into_iter().filter_map(into_record).collect();
    if records.len() < total {
        log::warn!(
            "Dropped {} history records with missing or unrecognized stages",
            total - records.len()
        );
    }
    log::debug!("Ingested {} history records", records.len());
    Ok(records)
}

fn decode_array<T: DeserializeOwned>(
    json: &str,
    what: &'static str,
) -> Result<Vec<T>, AnalyticsError> {
    let value: Value = serde_json::from_str(json).map_err(|e| AnalyticsError::InvalidSnapshot {
        what,
        reason: e.to_string(),
    })?;
    if !value.is_array() {
        return Err(AnalyticsError::InvalidSnapshot {
            what,
            reason: format!("expected a JSON array, got {}", value_kind(&value)),
        });
    }
    serde_json::from_value(value).map_err(|e| AnalyticsError::InvalidSnapshot {
        what,
        reason: e.to_string(),
    })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn into_product(wire: WireProduct) -> Product {
    let lifecycle_stage = match wire.lifecycle_stage.as_deref() {
        None | Some("") => Some(LifecycleStage::Introduction),
        Some(raw) => {
            let stage = LifecycleStage::parse(raw);
            if stage.is_none() {
                log::warn!(
                    "Product {} has unrecognized lifecycle stage '{}'",
                    wire.id,
                    raw
                );
            }
            stage
        }
    };

    Product {
        id: wire.id,
        name: wire.name.unwrap_or_default(),
        description: wire.description,
        category: wire.category.filter(|c| !c.trim().is_empty()),
        segment: wire.segment.filter(|s| !s.trim().is_empty()),
        lifecycle_stage,
        price: wire.price.as_ref().and_then(parse_price),
        launch_date: wire.launch_date.as_deref().and_then(parse_date),
        created_at: wire.created_at.as_deref().and_then(parse_timestamp),
        updated_at: wire.updated_at.as_deref().and_then(parse_timestamp),
    }
}

fn into_record(wire: WireHistoryRecord) -> Option<LifecycleHistoryRecord> {
    let new_stage = wire.new_stage.as_deref().and_then(LifecycleStage::parse)?;
    let change_date = wire.change_date.as_deref().and_then(|raw| {
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            log::warn!(
                "Unparseable change_date '{}' for product {}",
                raw,
                wire.product_id
            );
        }
        parsed
    });

    Some(LifecycleHistoryRecord {
        id: wire.id,
        product_id: wire.product_id,
        previous_stage: wire.previous_stage.as_deref().and_then(LifecycleStage::parse),
        new_stage,
        change_date,
        product_name: wire.product_name,
        segment: wire.segment,
        category: wire.category,
    })
}

/// NUMERIC columns arrive as strings from the catalog; accept both forms.
fn parse_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC assumed) or a bare date
/// (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(raw).map(|dt| dt.date_naive()))
}
