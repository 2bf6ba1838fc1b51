//! crates/qalamflow_core/src/forecast/rating.rs

use std::fmt;

use crate::domain::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceRating {
    Slow,
    Normal,
    Fast,
    VeryFast,
}

impl PaceRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaceRating::Slow => "slow",
            PaceRating::Normal => "normal",
            PaceRating::Fast => "fast",
            PaceRating::VeryFast => "very_fast",
        }
    }
}

impl fmt::Display for PaceRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper bounds (exclusive) in pages per active day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaceThresholds {
    pub slow: f64,
    pub normal: f64,
    pub fast: f64,
}

const BEGINNER: PaceThresholds = PaceThresholds { slow: 3.0, normal: 7.0, fast: 15.0 };

pub const PACE_THRESHOLDS: [(Level, PaceThresholds); 3] = [
    (Level::Beginner, BEGINNER),
    (Level::Intermediate, PaceThresholds { slow: 5.0, normal: 12.0, fast: 25.0 }),
    (Level::Advanced, PaceThresholds { slow: 8.0, normal: 18.0, fast: 35.0 }),
];

/// Falls back to the beginner table.
pub fn thresholds_for(level: Level) -> PaceThresholds {
    PACE_THRESHOLDS
        .iter()
        .find(|(l, _)| *l == level)
        .map(|(_, t)| *t)
        .unwrap_or(BEGINNER)
}

/// A value exactly on a boundary belongs to the faster bucket.
pub fn classify_pace(level: Level, pages_per_day: f64) -> PaceRating {
    let t = thresholds_for(level);
    if pages_per_day < t.slow {
        PaceRating::Slow
    } else if pages_per_day < t.normal {
        PaceRating::Normal
    } else if pages_per_day < t.fast {
        PaceRating::Fast
    } else {
        PaceRating::VeryFast
    }
}
