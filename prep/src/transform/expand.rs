//! Spreading single-day promotions over several days.

use chrono::Days;

use crate::error::{PrepError, PrepResult};
use crate::logs::log_info;
use crate::models::{PromotionRecord, PromotionTable};

/// Repeat every promotion on `n_days` consecutive days.
///
/// Each input row gets `promotion_id` = its position in `promotions`. The
/// output is the tagged input (offset 0) followed by one copy of the whole
/// table per additional day offset, with dates moved forward by that offset.
/// Nothing is sorted or deduplicated, so the output holds exactly
/// `promotions.len() * n_days` rows.
///
/// `n_days` must be at least 1.
pub fn extend_promotions_days(promotions: &[PromotionRecord], n_days: usize) -> PrepResult<PromotionTable> {
    if n_days == 0 {
        return Err(PrepError::InvalidArgument(
            "promotion length must be at least one day".to_string(),
        ));
    }

    if promotions.is_empty() {
        return Ok(Vec::new());
    }

    let total = promotions.len().checked_mul(n_days).ok_or_else(|| {
        PrepError::InvalidArgument(format!(
            "{} promotions over {} days does not fit in memory",
            promotions.len(),
            n_days
        ))
    })?;

    // The latest promotion decides whether the last offset is still a date
    let last_offset = Days::new((n_days - 1) as u64);
    if let Some(latest) = promotions.iter().map(|p| p.promotion_date).max() {
        if latest.checked_add_days(last_offset).is_none() {
            return Err(PrepError::InvalidArgument(format!(
                "{} + {} days is out of the supported date range",
                latest,
                n_days - 1
            )));
        }
    }

    let mut extended = Vec::new();
    extended.try_reserve_exact(total).map_err(|_| {
        PrepError::InvalidArgument(format!("cannot allocate {} promotion rows", total))
    })?;
    for offset in 0..n_days {
        for (id, row) in promotions.iter().enumerate() {
            let promotion_date = row
                .promotion_date
                .checked_add_days(Days::new(offset as u64))
                .ok_or_else(|| {
                    PrepError::InvalidArgument(format!(
                        "{} + {} days is out of the supported date range",
                        row.promotion_date, offset
                    ))
                })?;
            extended.push(PromotionRecord {
                promotion_date,
                promotion_id: Some(id),
                ..row.clone()
            });
        }
    }

    log_info(format!(
        "Extended {} promotions to {} days ({} rows)",
        promotions.len(),
        n_days,
        extended.len()
    ));
    Ok(extended)
}
