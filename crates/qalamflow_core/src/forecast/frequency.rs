//! crates/qalamflow_core/src/forecast/frequency.rs
//!
//! How many days per week a book is actually studied.

use chrono::Duration;
use std::collections::HashSet;
use std::fmt;

use super::{pace::count_active_days, round1};
use crate::domain::{ProgressEntry, ScheduleEntry};

/// Used when there is neither a schedule nor enough history.
pub const DEFAULT_DAYS_PER_WEEK: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencySource {
    Schedule,
    History,
    Default,
}

impl FrequencySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrequencySource::Schedule => "schedule",
            FrequencySource::History => "history",
            FrequencySource::Default => "default",
        }
    }
}

impl fmt::Display for FrequencySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StudyFrequency {
    pub days_per_week: f64,
    pub source: FrequencySource,
}

impl Default for StudyFrequency {
    fn default() -> Self {
        Self {
            days_per_week: DEFAULT_DAYS_PER_WEEK,
            source: FrequencySource::Default,
        }
    }
}

/// Resolves the study frequency for one book.
///
/// `schedule` holds the slots linked to the book, `entries` its progress
/// sorted by date ascending. An explicit schedule wins; otherwise the
/// frequency is inferred from at least two logged entries.
pub fn resolve_study_frequency(
    schedule: &[ScheduleEntry],
    entries: &[ProgressEntry],
) -> StudyFrequency {
    if !schedule.is_empty() {
        let days: HashSet<_> = schedule.iter().map(|s| s.day_of_week).collect();
        return StudyFrequency {
            days_per_week: days.len() as f64,
            source: FrequencySource::Schedule,
        };
    }

    if let [first, .., last] = entries {
        let week_ms = Duration::weeks(1).num_milliseconds() as f64;
        let weeks = ((last.date - first.date).num_milliseconds() as f64 / week_ms).max(1.0);
        return StudyFrequency {
            days_per_week: round1(count_active_days(entries) as f64 / weeks),
            source: FrequencySource::History,
        };
    }

    StudyFrequency::default()
}
