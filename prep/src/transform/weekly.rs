//! Daily to weekly aggregation.
//!
//! Weeks are labelled by their last day. With the default Sunday week end a
//! week runs Monday..=Sunday, the same grid as a `W-SUN` resample.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::BTreeMap;

use crate::logs::{log_info, log_warning};
use crate::models::{GroupKey, MergedRecord, WeeklyRecord, WeeklyTable};

/// Default last day of a week.
pub const DEFAULT_WEEK_END: Weekday = Weekday::Sun;

/// Last day of the week containing `date`, for weeks ending on `week_end`.
pub fn week_ending(date: NaiveDate, week_end: Weekday) -> Option<NaiveDate> {
    let ahead = (7 + week_end.num_days_from_monday() - date.weekday().num_days_from_monday()) % 7;
    date.checked_add_days(Days::new(ahead as u64))
}

#[derive(Default)]
struct Bucket {
    demand: f64,
    promotion: bool,
}

/// Sum demand and OR the promotion flag per (sku, supermarket) and week.
///
/// Missing (and `NaN`) demand adds nothing to a week's sum. Every week between a
/// group's first and last observed week is emitted; weeks without rows get
/// demand 0 and no promotion. Output is ordered by sku, supermarket, week.
pub fn aggregate_to_weekly(daily: &[MergedRecord], week_end: Weekday) -> WeeklyTable {
    let mut groups: BTreeMap<GroupKey, BTreeMap<NaiveDate, Bucket>> = BTreeMap::new();
    let mut skipped = 0usize;

    for row in daily {
        // Dates within six days of NaiveDate::MAX may have no week end
        let Some(week) = week_ending(row.date, week_end) else {
            skipped += 1;
            continue;
        };
        let bucket = groups.entry(row.group_key()).or_default().entry(week).or_default();
        if let Some(v) = row.demand.filter(|v| !v.is_nan()) {
            bucket.demand += v;
        }
        bucket.promotion |= row.promotion;
    }

    if skipped > 0 {
        log_warning(format!(
            "{} daily row(s) dropped: their week ending {} is past the last supported date",
            skipped, week_end
        ));
    }

    let mut weekly = Vec::new();
    let n_groups = groups.len();
    for (key, mut weeks) in groups {
        let (Some(&first), Some(&last)) = (weeks.keys().next(), weeks.keys().next_back()) else {
            continue;
        };

        let mut week = Some(first);
        while let Some(current) = week.filter(|w| *w <= last) {
            let bucket = weeks.remove(&current).unwrap_or_default();
            weekly.push(WeeklyRecord {
                week_end: current,
                sku: key.sku.clone(),
                supermarket: key.supermarket.clone(),
                demand: bucket.demand,
                promotion: bucket.promotion,
            });
            week = current.checked_add_days(Days::new(7));
        }
    }

    log_info(format!("Aggregated {} daily rows into {} weekly rows for {} groups", daily.len(), weekly.len(), n_groups));
    weekly
}

/// [`aggregate_to_weekly`] with weeks ending on Sunday.
pub fn aggregate_to_weekly_sunday(daily: &[MergedRecord]) -> WeeklyTable {
    aggregate_to_weekly(daily, DEFAULT_WEEK_END)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Attributes;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn row(date: NaiveDate, sku: &str, supermarket: &str, demand: Option<f64>, promotion: bool) -> MergedRecord {
        MergedRecord {
            date,
            sku: sku.to_string(),
            supermarket: supermarket.to_string(),
            demand,
            promotion,
            promotion_id: None,
            demand_attributes: Attributes::new(),
            promotion_attributes: Attributes::new(),
        }
    }

    #[test]
    fn test_week_ending() {
        // 2024-01-01 is a Monday
        assert_eq!(week_ending(day(1, 1), Weekday::Sun), Some(day(1, 7)));
        assert_eq!(week_ending(day(1, 7), Weekday::Sun), Some(day(1, 7)));
        assert_eq!(week_ending(day(1, 8), Weekday::Sun), Some(day(1, 14)));
        assert_eq!(week_ending(day(1, 1), Weekday::Mon), Some(day(1, 1)));
        assert_eq!(week_ending(day(1, 2), Weekday::Sat), Some(day(1, 6)));
    }

    #[test]
    fn test_one_full_week() {
        let promos = [false, false, true, false, false, false, false];
        let daily: Vec<_> = (1..=7)
            .map(|d| row(day(1, d), "A", "S1", Some(d as f64), promos[d as usize - 1]))
            .collect();

        let weekly = aggregate_to_weekly_sunday(&daily);

        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].week_end, day(1, 7));
        assert_eq!(weekly[0].demand, 28.0);
        assert!(weekly[0].promotion);
    }

    #[test]
    fn test_empty_weeks_are_filled() {
        let daily = vec![
            row(day(1, 2), "A", "S1", Some(3.0), true),
            row(day(1, 24), "A", "S1", Some(5.0), false),
        ];

        let weekly = aggregate_to_weekly_sunday(&daily);

        let ends: Vec<_> = weekly.iter().map(|w| w.week_end).collect();
        assert_eq!(ends, vec![day(1, 7), day(1, 14), day(1, 21), day(1, 28)]);
        assert_eq!(weekly[1].demand, 0.0);
        assert!(!weekly[1].promotion);
        assert!(!weekly[3].promotion);
        assert_eq!(weekly[3].demand, 5.0);
    }

    #[test]
    fn test_groups_are_separate_and_ordered() {
        let daily = vec![
            row(day(1, 3), "B", "S1", Some(1.0), false),
            row(day(1, 3), "A", "S2", Some(2.0), true),
            row(day(1, 4), "A", "S1", Some(4.0), false),
            row(day(1, 5), "A", "S1", Some(6.0), false),
        ];

        let weekly = aggregate_to_weekly_sunday(&daily);

        let keys: Vec<_> = weekly.iter().map(|w| (w.sku.as_str(), w.supermarket.as_str())).collect();
        assert_eq!(keys, vec![("A", "S1"), ("A", "S2"), ("B", "S1")]);
        assert_eq!(weekly[0].demand, 10.0);
        assert!(!weekly[0].promotion);
        assert!(weekly[1].promotion);
    }

    #[test]
    fn test_missing_and_nan_demand_add_nothing() {
        let daily = vec![
            row(day(1, 1), "A", "S1", None, true),
            row(day(1, 2), "A", "S1", Some(f64::NAN), false),
            row(day(1, 3), "A", "S1", Some(2.0), false),
        ];

        let weekly = aggregate_to_weekly_sunday(&daily);
        assert_eq!(weekly[0].demand, 2.0);
        assert!(weekly[0].promotion);
    }

    #[test]
    fn test_custom_week_end() {
        let daily = vec![
            row(day(1, 6), "A", "S1", Some(1.0), false), // Saturday
            row(day(1, 7), "A", "S1", Some(1.0), false), // Sunday
        ];

        let weekly = aggregate_to_weekly(&daily, Weekday::Sat);
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].week_end, day(1, 6));
        assert_eq!(weekly[1].week_end, day(1, 13));
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_to_weekly_sunday(&[]).is_empty());
    }

    #[test]
    fn test_row_without_week_end_is_dropped_with_warning() {
        let last = NaiveDate::MAX;
        let week_end = last.weekday().succ();
        assert_eq!(week_ending(last, week_end), None);

        let mut log = crate::logs::LOG_BROADCASTER.subscribe();
        let weekly = aggregate_to_weekly(&[row(last, "A", "S1", Some(1.0), false)], week_end);

        assert!(weekly.is_empty());
        let mut warned = false;
        while let Ok(entry) = log.try_recv() {
            warned |= entry.level == crate::logs::LogLevel::Warning
                && entry.message.starts_with("1 daily row(s) dropped");
        }
        assert!(warned);
    }
}
