//! Full outer join of demand and promotions.
//!
//! The join key is (supermarket, sku, date), where the promotion side's date
//! is its `promotion_date`. A row exists in the output for every key found on
//! either side; `promotion` is true exactly when the promotion side matched.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::logs::log_info;
use crate::models::{Attributes, DemandRecord, MergedRecord, MergedTable, PromotionRecord};

type JoinKey<'a> = (&'a str, &'a str, NaiveDate);

#[derive(Default)]
struct Sides<'a> {
    demand: Vec<&'a DemandRecord>,
    promotions: Vec<&'a PromotionRecord>,
}

/// Outer-join `demand` and `promotions` on (supermarket, sku, date).
///
/// Keys matched on both sides yield one row per (demand, promotion) pair.
/// Output is ordered by the join key; inputs are left untouched.
pub fn merge(demand: &[DemandRecord], promotions: &[PromotionRecord]) -> MergedTable {
    let mut keys: BTreeMap<JoinKey<'_>, Sides<'_>> = BTreeMap::new();
    for row in demand {
        keys.entry((row.supermarket.as_str(), row.sku.as_str(), row.date))
            .or_default()
            .demand
            .push(row);
    }
    for row in promotions {
        keys.entry((row.supermarket.as_str(), row.sku.as_str(), row.promotion_date))
            .or_default()
            .promotions
            .push(row);
    }

    let mut merged = Vec::with_capacity(demand.len() + promotions.len());
    let mut promotion_only = 0usize;
    for ((supermarket, sku, date), sides) in keys {
        let base = |d: Option<&DemandRecord>, p: Option<&PromotionRecord>| MergedRecord {
            date,
            sku: sku.to_string(),
            supermarket: supermarket.to_string(),
            demand: d.and_then(|d| d.demand),
            promotion: p.is_some(),
            promotion_id: p.and_then(|p| p.promotion_id),
            demand_attributes: d.map(|d| d.attributes.clone()).unwrap_or_else(Attributes::new),
            promotion_attributes: p.map(|p| p.attributes.clone()).unwrap_or_else(Attributes::new),
        };

        match (sides.demand.is_empty(), sides.promotions.is_empty()) {
            (false, true) => merged.extend(sides.demand.iter().map(|&d| base(Some(d), None))),
            (true, false) => {
                promotion_only += sides.promotions.len();
                merged.extend(sides.promotions.iter().map(|&p| base(None, Some(p))));
            }
            _ => {
                for &d in &sides.demand {
                    merged.extend(sides.promotions.iter().map(|&p| base(Some(d), Some(p))));
                }
            }
        }
    }

    log_info(format!(
        "Merged {} demand rows with {} promotion rows into {} rows ({} promotion-only)",
        demand.len(),
        promotions.len(),
        merged.len(),
        promotion_only
    ));
    merged
}
