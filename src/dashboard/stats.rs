//! Aggregates derived purely from a fetched record set.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Category, EmailRecord, Priority, Sentiment, YesNo};

/// Headline numbers shown above the record table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: usize,
    pub high_priority: usize,
    pub action_needed: usize,
    /// Share of positive-sentiment records, rounded to a whole percent.
    pub positive_pct: u32,
}

impl DashboardStats {
    pub fn from_records(records: &[EmailRecord]) -> Self {
        let mut stats = DashboardStats {
            total: records.len(),
            ..Default::default()
        };
        let mut positive = 0usize;

        for record in records {
            if record.priority == Priority::High {
                stats.high_priority += 1;
            }
            if record.action_required == YesNo::Yes {
                stats.action_needed += 1;
            }
            if record.sentiment == Sentiment::Positive {
                positive += 1;
            }
        }

        stats.positive_pct = percentage(positive, stats.total);
        stats
    }
}

/// `round(100 * part / total)`, or 0 for an empty set.
pub fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (part as f64 / total as f64 * 100.0).round() as u32
}

/// Occurrences of each category present in the record set.
pub type CategoryCounts = BTreeMap<Category, usize>;

pub fn category_counts(records: &[EmailRecord]) -> CategoryCounts {
    let mut counts = CategoryCounts::new();
    for record in records {
        *counts.entry(record.category).or_insert(0) += 1;
    }
    counts
}

/// Number of records created on one UTC calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyVolume {
    pub day: NaiveDate,
    pub count: usize,
}

/// Per-day record counts from the earliest to the latest `createdAt`,
/// ascending, with empty days in between reported as zero.
pub fn daily_volume(records: &[EmailRecord]) -> Vec<DailyVolume> {
    let mut by_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for record in records {
        *by_day.entry(record.created_at.date_naive()).or_insert(0) += 1;
    }

    let (Some((&first, _)), Some((&last, _))) =
        (by_day.first_key_value(), by_day.last_key_value())
    else {
        return Vec::new();
    };

    let mut volume = Vec::new();
    let mut day = first;
    while day <= last {
        volume.push(DailyVolume {
            day,
            count: by_day.get(&day).copied().unwrap_or(0),
        });
        day += Duration::days(1);
    }
    volume
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_record;
    use chrono::{TimeZone, Utc};

    #[test]
    fn empty_set_has_zero_stats() {
        let stats = DashboardStats::from_records(&[]);
        assert_eq!(stats, DashboardStats::default());
        assert_eq!(stats.positive_pct, 0);
        assert!(category_counts(&[]).is_empty());
        assert!(daily_volume(&[]).is_empty());
    }

    #[test]
    fn all_positive_is_one_hundred_percent() {
        let records: Vec<_> = (0..3)
            .map(|n| {
                let mut record = sample_record(&format!("note {n}"), "team@co.com");
                record.sentiment = Sentiment::Positive;
                record
            })
            .collect();
        assert_eq!(DashboardStats::from_records(&records).positive_pct, 100);
    }

    #[test]
    fn percentage_rounds_to_nearest() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 5), 0);
    }

    #[test]
    fn budget_review_scenario() {
        let mut record = sample_record("Budget review", "cfo@co.com");
        record.priority = Priority::High;
        record.category = Category::Finance;
        record.action_required = YesNo::Yes;
        record.sentiment = Sentiment::Negative;
        let records = vec![record];

        let stats = DashboardStats::from_records(&records);
        assert_eq!(
            stats,
            DashboardStats {
                total: 1,
                high_priority: 1,
                action_needed: 1,
                positive_pct: 0,
            }
        );

        let counts = category_counts(&records);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get(&Category::Finance), Some(&1));
        assert_eq!(
            serde_json::to_value(&counts).unwrap(),
            serde_json::json!({"Finance": 1})
        );
    }

    #[test]
    fn category_counts_only_include_present_categories() {
        let mut spam = sample_record("Win big", "promo@spam.biz");
        spam.category = Category::Spam;
        let mut work = sample_record("Standup", "lead@co.com");
        work.category = Category::Work;
        let mut work_again = sample_record("Retro", "lead@co.com");
        work_again.category = Category::Work;

        let counts = category_counts(&[spam, work, work_again]);
        assert_eq!(counts.get(&Category::Work), Some(&2));
        assert_eq!(counts.get(&Category::Spam), Some(&1));
        assert_eq!(counts.get(&Category::Finance), None);
    }

    #[test]
    fn daily_volume_buckets_by_utc_day_and_fills_gaps() {
        let at = |d: u32, h: u32| Utc.with_ymd_and_hms(2025, 3, d, h, 0, 0).unwrap();
        let mut records = Vec::new();
        for (day, hour) in [(4, 9), (1, 23), (1, 0), (4, 18), (4, 1)] {
            let mut record = sample_record("x", "y@z.com");
            record.created_at = at(day, hour);
            records.push(record);
        }

        let volume = daily_volume(&records);
        let counts: Vec<_> = volume.iter().map(|v| v.count).collect();
        assert_eq!(counts, vec![2, 0, 0, 3]);
        assert_eq!(volume[0].day, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(volume[3].day, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
    }
}
