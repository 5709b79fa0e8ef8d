//! Missing-demand imputation.
//!
//! [`clean`] fills the gaps of a single series; [`clean_demand_per_group`]
//! applies it independently to every (sku, supermarket) group of the demand
//! table, in table order.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::logs::{log_info, log_success, log_warning_indent};
use crate::models::{DemandTable, GroupKey};

/// Fill the missing values of a series.
///
/// Each gap takes the next observed value that follows it (backward fill).
/// Trailing gaps, which have no later observation, take the mean of the
/// observed values. A series with no observation at all has no mean and
/// comes back as all `NaN`.
pub fn clean(series: &[Option<f64>]) -> Vec<f64> {
    let observed: Vec<f64> = series.iter().flatten().copied().collect();
    let mean = if observed.is_empty() {
        f64::NAN
    } else {
        observed.iter().sum::<f64>() / observed.len() as f64
    };

    let mut out = vec![mean; series.len()];
    let mut next: Option<f64> = None;
    for (slot, value) in out.iter_mut().zip(series).rev() {
        if value.is_some() {
            next = *value;
        }
        if let Some(v) = next {
            *slot = v;
        }
    }
    out
}

/// Counts reported by [`clean_demand_per_group_with_summary`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImputationSummary {
    /// Number of distinct (sku, supermarket) groups.
    pub groups: usize,
    /// Number of demand cells that were missing and got a value.
    pub imputed: usize,
    /// Groups with no observed demand; their rows hold `NaN`.
    pub undefined_groups: Vec<GroupKey>,
}

/// Impute missing demand independently for every (sku, supermarket) group.
///
/// Takes the table by value and returns it with every `demand` set. Rows
/// keep their position; within a group, "next" means next in table order.
pub fn clean_demand_per_group(demand: DemandTable) -> DemandTable {
    clean_demand_per_group_with_summary(demand).0
}

/// Same as [`clean_demand_per_group`], also returning what was filled.
pub fn clean_demand_per_group_with_summary(mut demand: DemandTable) -> (DemandTable, ImputationSummary) {
    let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    for (i, row) in demand.iter().enumerate() {
        groups.entry(row.group_key()).or_default().push(i);
    }

    let mut summary = ImputationSummary {
        groups: groups.len(),
        ..Default::default()
    };

    for (key, positions) in groups {
        let series: Vec<Option<f64>> = positions.iter().map(|&i| demand[i].demand).collect();
        let missing = series.iter().filter(|v| v.is_none()).count();
        if missing == 0 {
            continue;
        }
        if missing == series.len() {
            log_warning_indent(format!("{}: no observed demand, mean is undefined (NaN)", key), 1);
            summary.undefined_groups.push(key);
        }

        for (&i, value) in positions.iter().zip(clean(&series)) {
            demand[i].demand = Some(value);
        }
        summary.imputed += missing;
    }

    log_info(format!("Imputed {} missing demand values across {} groups", summary.imputed, summary.groups));
    if summary.undefined_groups.is_empty() {
        log_success("Every group has complete demand");
    }

    (demand, summary)
}
