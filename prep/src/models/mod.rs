//! Table rows used throughout the preparation pipeline.
//!
//! - [`DemandRecord`] - one day of demand for a sku in a supermarket
//! - [`PromotionRecord`] - a promotion day, optionally tagged with its source row
//! - [`MergedRecord`] - demand joined with the promotion flag
//! - [`WeeklyRecord`] - weekly demand sum and promotion flag
//! - [`GroupKey`] - the (sku, supermarket) pair that defines a group
//!
//! Tables are plain `Vec`s of rows; row order is the table order and the
//! date field of each row is its time index.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Extra columns carried through untouched, keyed by header name.
pub type Attributes = BTreeMap<String, String>;

pub type DemandTable = Vec<DemandRecord>;
pub type PromotionTable = Vec<PromotionRecord>;
pub type MergedTable = Vec<MergedRecord>;
pub type WeeklyTable = Vec<WeeklyRecord>;

// =============================================================================
// Group Key
// =============================================================================

/// A (sku, supermarket) pair.
///
/// Ordering is by sku first, then supermarket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub sku: String,
    pub supermarket: String,
}

impl GroupKey {
    pub fn new(sku: impl Into<String>, supermarket: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            supermarket: supermarket.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.sku, self.supermarket)
    }
}

// =============================================================================
// Demand
// =============================================================================

/// One row of the demand table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandRecord {
    pub date: NaiveDate,
    pub sku: String,
    pub supermarket: String,
    /// `None` when the source cell was blank or NaN.
    pub demand: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl DemandRecord {
    pub fn new(
        date: NaiveDate,
        sku: impl Into<String>,
        supermarket: impl Into<String>,
        demand: Option<f64>,
    ) -> Self {
        Self {
            date,
            sku: sku.into(),
            supermarket: supermarket.into(),
            demand,
            attributes: Attributes::new(),
        }
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(self.sku.as_str(), self.supermarket.as_str())
    }
}

// =============================================================================
// Promotions
// =============================================================================

/// One row of the promotion table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionRecord {
    pub promotion_date: NaiveDate,
    pub sku: String,
    pub supermarket: String,
    /// Position of the source row, set when a promotion is spread over several days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion_id: Option<usize>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl PromotionRecord {
    pub fn new(
        promotion_date: NaiveDate,
        sku: impl Into<String>,
        supermarket: impl Into<String>,
    ) -> Self {
        Self {
            promotion_date,
            sku: sku.into(),
            supermarket: supermarket.into(),
            promotion_id: None,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

// =============================================================================
// Merged
// =============================================================================

/// A row of the demand/promotion outer join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub date: NaiveDate,
    pub sku: String,
    pub supermarket: String,
    /// `None` for promotion days without a demand row.
    pub demand: Option<f64>,
    pub promotion: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion_id: Option<usize>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub demand_attributes: Attributes,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub promotion_attributes: Attributes,
}

impl MergedRecord {
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(self.sku.as_str(), self.supermarket.as_str())
    }
}

// =============================================================================
// Weekly
// =============================================================================

/// Demand and promotion flag summed over one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRecord {
    /// Last day of the week (inclusive).
    pub week_end: NaiveDate,
    pub sku: String,
    pub supermarket: String,
    pub demand: f64,
    pub promotion: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_key_orders_by_sku_first() {
        let mut keys = vec![
            GroupKey::new("B", "S1"),
            GroupKey::new("A", "S2"),
            GroupKey::new("A", "S1"),
        ];
        keys.sort();
        assert_eq!(keys[0], GroupKey::new("A", "S1"));
        assert_eq!(keys[1], GroupKey::new("A", "S2"));
        assert_eq!(keys[2].to_string(), "B/S1");
    }

    #[test]
    fn test_empty_attributes_are_not_serialized() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let json = serde_json::to_value(DemandRecord::new(date, "A", "S1", None)).unwrap();
        assert!(json.get("attributes").is_none());
        assert!(json["demand"].is_null());
        assert_eq!(json["date"], "2024-01-01");
    }
}
