//! crates/qalamflow_core/src/forecast/weekly.rs
//!
//! Trailing weekly totals for charting.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

use crate::domain::ProgressEntry;

pub const WEEKS_IN_BREAKDOWN: u64 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekBucket {
    /// e.g. "Oct 12"
    pub label: String,
    pub week_start: NaiveDate,
    pub pages: u32,
    /// Minutes.
    pub time: u32,
    pub sessions: u32,
}

/// Buckets entries into the eight rolling weeks ending today, oldest first.
///
/// Weeks are anchored to today's weekday: the newest bucket covers today and
/// the six days before it, each older bucket the seven days before that.
pub fn weekly_breakdown(entries: &[ProgressEntry], now: DateTime<Utc>) -> Vec<WeekBucket> {
    let today = now.date_naive();

    (0..WEEKS_IN_BREAKDOWN)
        .rev()
        .filter_map(|weeks_back| {
            let week_start = today.checked_sub_days(Days::new(weeks_back * 7 + 6))?;
            let start = week_start.and_time(NaiveTime::MIN).and_utc();
            let end = week_start
                .checked_add_days(Days::new(7))?
                .and_time(NaiveTime::MIN)
                .and_utc();

            let mut bucket = WeekBucket {
                label: week_start.format("%b %-d").to_string(),
                week_start,
                pages: 0,
                time: 0,
                sessions: 0,
            };
            for entry in entries.iter().filter(|e| e.date >= start && e.date < end) {
                bucket.pages += entry.pages_read;
                bucket.time += entry.time_spent;
                bucket.sessions += 1;
            }
            Some(bucket)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::testing::{entry_at, now};
    use chrono::Duration;

    #[test]
    fn test_always_eight_buckets_oldest_first() {
        let weeks = weekly_breakdown(&[], now());
        assert_eq!(weeks.len(), 8);
        assert!(weeks.windows(2).all(|w| w[0].week_start < w[1].week_start));
        assert!(weeks.iter().all(|w| w.pages == 0 && w.sessions == 0));
    }

    #[test]
    fn test_newest_bucket_ends_today() {
        let weeks = weekly_breakdown(&[], now());
        let last = weeks.last().unwrap();
        assert_eq!(last.week_start, NaiveDate::from_ymd_opt(2026, 6, 9).unwrap());
        assert_eq!(last.label, "Jun 9");
        assert_eq!(weeks[0].label, "Apr 21");
    }

    #[test]
    fn test_entries_land_in_their_week() {
        let entries = vec![
            entry_at(now(), 10, 30),
            entry_at(now() - Duration::days(6), 5, 15),
            entry_at(now() - Duration::days(7), 8, 20),
            entry_at(now() - Duration::days(60), 100, 100),
        ];
        let weeks = weekly_breakdown(&entries, now());
        assert_eq!(weeks[7].pages, 15);
        assert_eq!(weeks[7].time, 45);
        assert_eq!(weeks[7].sessions, 2);
        assert_eq!(weeks[6].pages, 8);
        assert_eq!(weeks[6].sessions, 1);
        let total: u32 = weeks.iter().map(|w| w.pages).sum();
        assert_eq!(total, 23);
    }

    #[test]
    fn test_breakdown_is_idempotent() {
        let entries = vec![
            entry_at(now() - Duration::days(3), 12, 40),
            entry_at(now() - Duration::days(17), 9, 25),
        ];
        assert_eq!(weekly_breakdown(&entries, now()), weekly_breakdown(&entries, now()));
    }
}
