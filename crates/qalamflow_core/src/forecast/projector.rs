//! crates/qalamflow_core/src/forecast/projector.rs
//!
//! Projects a completion date from a pace, the pages left and the study
//! frequency.

use chrono::{DateTime, Days, NaiveDate, Utc};

use super::frequency::StudyFrequency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Projection {
    pub estimated_days_left: Option<u64>,
    pub estimated_completion_date: Option<NaiveDate>,
}

/// Estimates calendar days until the book is finished.
///
/// `pages_per_day` is a rate per active study day. When the book is
/// studied on fewer than seven days a week the number of study days is
/// stretched to calendar days; seven or more (and the degenerate zero) are
/// taken as-is. Nothing is projected without a positive pace and pages left.
pub fn project_completion(
    pages_per_day: f64,
    pages_remaining: u32,
    frequency: &StudyFrequency,
    now: DateTime<Utc>,
) -> Projection {
    if pages_per_day.is_nan() || pages_per_day <= 0.0 || pages_remaining == 0 {
        return Projection::default();
    }

    let study_days = (f64::from(pages_remaining) / pages_per_day).ceil();
    let days_per_week = frequency.days_per_week;
    let days_left = if days_per_week > 0.0 && days_per_week < 7.0 {
        (study_days * (7.0 / days_per_week)).ceil()
    } else {
        study_days
    } as u64;

    Projection {
        estimated_days_left: Some(days_left),
        estimated_completion_date: now.date_naive().checked_add_days(Days::new(days_left)),
    }
}

/// Result of a hypothetical pace simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhatIf {
    pub pages_per_day: f64,
    pub pages_remaining: u32,
    pub projection: Projection,
}

/// Runs the projection with a caller-supplied pace instead of the computed one.
pub fn simulate(
    pages_per_day: f64,
    pages_remaining: u32,
    frequency: &StudyFrequency,
    now: DateTime<Utc>,
) -> WhatIf {
    WhatIf {
        pages_per_day,
        pages_remaining,
        projection: project_completion(pages_per_day, pages_remaining, frequency, now),
    }
}
