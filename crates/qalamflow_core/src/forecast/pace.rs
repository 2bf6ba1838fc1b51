//! crates/qalamflow_core/src/forecast/pace.rs
//!
//! Turns a progress history into pages-per-active-day figures.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashSet;

use super::round1;
use crate::domain::ProgressEntry;

/// Entries dated at or after `now - RECENT_WINDOW_DAYS` count as recent.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// How much more a recent active day counts than an older one.
const RECENT_WEIGHT: f64 = 2.0;

/// Pages per active day, each rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PaceFigures {
    /// Over the whole history.
    pub overall: f64,
    /// Over the trailing window only.
    pub recent: f64,
    /// Recency-weighted blend of the two buckets.
    pub weighted: f64,
}

#[derive(Default)]
struct Bucket {
    pages: u64,
    days: HashSet<NaiveDate>,
}

impl Bucket {
    fn add(&mut self, entry: &ProgressEntry) {
        self.pages += u64::from(entry.pages_read);
        self.days.insert(entry.day());
    }

    fn active_days(&self) -> usize {
        self.days.len()
    }

    fn rate(&self) -> f64 {
        if self.days.is_empty() {
            0.0
        } else {
            self.pages as f64 / self.days.len() as f64
        }
    }
}

/// Computes overall, recent and weighted pace.
///
/// Several entries on the same calendar day count as a single active day.
/// When nothing falls inside the recent window the weighted figure is the
/// overall pace.
pub fn compute_pace(entries: &[ProgressEntry], now: DateTime<Utc>) -> PaceFigures {
    if entries.is_empty() {
        return PaceFigures::default();
    }

    let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
    let mut recent = Bucket::default();
    let mut older = Bucket::default();

    for entry in entries {
        if entry.date >= cutoff {
            recent.add(entry);
        } else {
            older.add(entry);
        }
    }

    let total_days = recent.active_days() + older.active_days();
    let overall = if total_days > 0 {
        (recent.pages + older.pages) as f64 / total_days as f64
    } else {
        0.0
    };

    let weighted = match (recent.active_days() > 0, older.active_days() > 0) {
        (true, true) => (recent.rate() * RECENT_WEIGHT + older.rate()) / (RECENT_WEIGHT + 1.0),
        (true, false) => recent.rate(),
        _ => overall,
    };

    PaceFigures {
        overall: round1(overall),
        recent: round1(recent.rate()),
        weighted: round1(weighted),
    }
}

/// Number of distinct calendar dates with at least one entry.
pub fn count_active_days(entries: &[ProgressEntry]) -> usize {
    entries
        .iter()
        .map(ProgressEntry::day)
        .collect::<HashSet<_>>()
        .len()
}

/// Secondary statistics shown next to the pace figures.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HistoryStats {
    pub active_days: usize,
    /// Inclusive span between the first and last entry, at least 1.
    pub calendar_days: i64,
    pub pages_per_calendar_day: f64,
    /// Minutes per active day.
    pub time_per_active_day: f64,
}

/// `entries` must be sorted by date ascending.
pub fn history_stats(entries: &[ProgressEntry]) -> HistoryStats {
    let active_days = count_active_days(entries);
    let (Some(first), Some(last)) = (entries.first(), entries.last()) else {
        return HistoryStats {
            calendar_days: 1,
            ..HistoryStats::default()
        };
    };

    let span_ms = (last.date - first.date).num_milliseconds() as f64;
    let calendar_days = ((span_ms / Duration::days(1).num_milliseconds() as f64).ceil() as i64 + 1).max(1);

    let total_pages: u64 = entries.iter().map(|e| u64::from(e.pages_read)).sum();
    let total_time: u64 = entries.iter().map(|e| u64::from(e.time_spent)).sum();

    HistoryStats {
        active_days,
        calendar_days,
        pages_per_calendar_day: round1(total_pages as f64 / calendar_days as f64),
        time_per_active_day: round1(total_time as f64 / active_days.max(1) as f64),
    }
}
