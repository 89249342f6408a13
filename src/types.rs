//! Core portfolio types: lifecycle stages, business segments, products,
//! stage-transition history records, and the derived output records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

pub type ProductId = i64;

// ─────────────────────────────────────────────────────────────────────
// Lifecycle stage
// ─────────────────────────────────────────────────────────────────────

/// The four fixed lifecycle stages, in lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LifecycleStage {
    Introduction,
    Growth,
    Maturity,
    Decline,
}

impl LifecycleStage {
    pub const ALL: [LifecycleStage; 4] = [
        LifecycleStage::Introduction,
        LifecycleStage::Growth,
        LifecycleStage::Maturity,
        LifecycleStage::Decline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Introduction => "Introduction",
            Self::Growth => "Growth",
            Self::Maturity => "Maturity",
            Self::Decline => "Decline",
        }
    }

    /// Parse a stage name, case-insensitive. Unknown names yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "introduction" => Some(Self::Introduction),
            "growth" => Some(Self::Growth),
            "maturity" => Some(Self::Maturity),
            "decline" => Some(Self::Decline),
            _ => None,
        }
    }

    /// The stage a product normally moves to next. Decline is terminal.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Introduction => Some(Self::Growth),
            Self::Growth => Some(Self::Maturity),
            Self::Maturity => Some(Self::Decline),
            Self::Decline => None,
        }
    }
}

impl std::fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Business segment
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Segment {
    Generation,
    Transmission,
    Distribution,
    Corporate,
    CustomerService,
}

impl Segment {
    pub const ALL: [Segment; 5] = [
        Segment::Generation,
        Segment::Transmission,
        Segment::Distribution,
        Segment::Corporate,
        Segment::CustomerService,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generation => "generation",
            Self::Transmission => "transmission",
            Self::Distribution => "distribution",
            Self::Corporate => "corporate",
            Self::CustomerService => "customer-service",
        }
    }

    /// Parse a segment tag. Accepts the English names in any case/separator
    /// style and the catalog's own business-unit labels.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '_' || c == ' ' { '-' } else { c })
            .collect();
        match normalized.as_str() {
            "generation" | "pembangkitan" => Some(Self::Generation),
            "transmission" | "transmisi" => Some(Self::Transmission),
            "distribution" | "distribusi" => Some(Self::Distribution),
            "corporate" | "korporat" => Some(Self::Corporate),
            "customer-service" | "pelayanan-pelanggan" => Some(Self::CustomerService),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Snapshot records
// ─────────────────────────────────────────────────────────────────────

/// A catalog product as seen by the analytics core.
///
/// `lifecycle_stage` is `None` only when the catalog carried a stage string
/// outside the fixed set; such products are skipped by every stage count.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    pub lifecycle_stage: Option<LifecycleStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Minimal product with only the fields the stage statistics need.
    pub fn new(id: ProductId, name: impl Into<String>, stage: LifecycleStage) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            category: None,
            segment: None,
            lifecycle_stage: Some(stage),
            price: None,
            launch_date: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn segment_tag(&self) -> Option<Segment> {
        self.segment.as_deref().and_then(Segment::parse)
    }

    pub fn is_in(&self, stage: LifecycleStage) -> bool {
        self.lifecycle_stage == Some(stage)
    }
}

/// One stage change of one product. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleHistoryRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub product_id: ProductId,
    pub previous_stage: Option<LifecycleStage>,
    pub new_stage: LifecycleStage,
    pub change_date: Option<DateTime<Utc>>,
    /// Denormalized display fields joined in by the history endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl LifecycleHistoryRecord {
    pub fn new(
        product_id: ProductId,
        previous_stage: Option<LifecycleStage>,
        new_stage: LifecycleStage,
        change_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            product_id,
            previous_stage,
            new_stage,
            change_date: Some(change_date),
            product_name: None,
            segment: None,
            category: None,
        }
    }

    /// The change timestamp, or a `MissingField` error for computations that
    /// cannot proceed without it.
    pub fn changed_at(&self) -> Result<DateTime<Utc>, AnalyticsError> {
        self.change_date.ok_or(AnalyticsError::MissingField {
            product_id: self.product_id,
            field: "change_date",
        })
    }
}

// ─────────────────────────────────────────────────────────────────────
// Derived outputs
// ─────────────────────────────────────────────────────────────────────

/// Qualitative band for a 0–100 metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricGrade {
    Excellent,
    Good,
    Average,
    Poor,
    Critical,
}

impl MetricGrade {
    pub fn for_value(value: f64) -> Self {
        if value >= 80.0 {
            Self::Excellent
        } else if value >= 60.0 {
            Self::Good
        } else if value >= 40.0 {
            Self::Average
        } else if value >= 20.0 {
            Self::Poor
        } else {
            Self::Critical
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetric {
    pub name: String,
    pub value: f64,
    pub description: String,
    pub grade: MetricGrade,
}

impl DerivedMetric {
    pub fn new(name: &str, value: f64, description: &str) -> Self {
        Self {
            name: name.to_string(),
            value,
            description: description.to_string(),
            grade: MetricGrade::for_value(value),
        }
    }
}

/// Which rule family produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationCategory {
    Introduction,
    Growth,
    Maturity,
    Decline,
    Portfolio,
    Trend,
}

impl From<LifecycleStage> for RecommendationCategory {
    fn from(stage: LifecycleStage) -> Self {
        match stage {
            LifecycleStage::Introduction => Self::Introduction,
            LifecycleStage::Growth => Self::Growth,
            LifecycleStage::Maturity => Self::Maturity,
            LifecycleStage::Decline => Self::Decline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub action: String,
    pub category: RecommendationCategory,
}

impl Recommendation {
    pub fn new(
        category: RecommendationCategory,
        title: impl Into<String>,
        description: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            action: action.into(),
            category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_parse_is_case_insensitive() {
        assert_eq!(LifecycleStage::parse("growth"), Some(LifecycleStage::Growth));
        assert_eq!(LifecycleStage::parse(" DECLINE "), Some(LifecycleStage::Decline));
        assert_eq!(LifecycleStage::parse("Discontinued"), None);
    }

    #[test]
    fn test_stage_order_and_next() {
        assert!(LifecycleStage::Introduction < LifecycleStage::Decline);
        assert_eq!(LifecycleStage::Maturity.next(), Some(LifecycleStage::Decline));
        assert_eq!(LifecycleStage::Decline.next(), None);
    }

    #[test]
    fn test_segment_parse_accepts_catalog_labels() {
        assert_eq!(Segment::parse("Pelayanan Pelanggan"), Some(Segment::CustomerService));
        assert_eq!(Segment::parse("customer_service"), Some(Segment::CustomerService));
        assert_eq!(Segment::parse("Transmisi"), Some(Segment::Transmission));
        assert_eq!(Segment::parse("retail"), None);
    }

    #[test]
    fn test_metric_grade_bands() {
        assert_eq!(MetricGrade::for_value(80.0), MetricGrade::Excellent);
        assert_eq!(MetricGrade::for_value(79.9), MetricGrade::Good);
        assert_eq!(MetricGrade::for_value(40.0), MetricGrade::Average);
        assert_eq!(MetricGrade::for_value(20.0), MetricGrade::Poor);
        assert_eq!(MetricGrade::for_value(0.0), MetricGrade::Critical);
    }

    #[test]
    fn test_changed_at_reports_missing_field() {
        let mut record = LifecycleHistoryRecord::new(
            7,
            None,
            LifecycleStage::Introduction,
            chrono::Utc::now(),
        );
        record.change_date = None;
        let err = record.changed_at().unwrap_err();
        assert!(err.to_string().contains("change_date"));
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_recommendation_category_serializes_lowercase() {
        let json = serde_json::to_string(&RecommendationCategory::from(LifecycleStage::Growth))
            .unwrap();
        assert_eq!(json, "\"growth\"");
    }
}
