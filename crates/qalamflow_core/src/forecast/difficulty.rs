//! crates/qalamflow_core/src/forecast/difficulty.rs
//!
//! Difficulty multipliers. A multiplier above 1 means each page costs more
//! comprehension time, so the effective pace drops.

use crate::domain::Level;

pub const BASELINE_MULTIPLIER: f64 = 1.0;

pub const DIFFICULTY_MULTIPLIERS: [(Level, f64); 3] = [
    (Level::Beginner, 0.85),
    (Level::Intermediate, 1.0),
    (Level::Advanced, 1.3),
];

pub fn difficulty_multiplier(level: Level) -> f64 {
    DIFFICULTY_MULTIPLIERS
        .iter()
        .find(|(l, _)| *l == level)
        .map(|(_, m)| *m)
        .unwrap_or(BASELINE_MULTIPLIER)
}

/// The pace used for projection: the override when set, otherwise the
/// weighted pace scaled by the book's difficulty.
pub fn effective_pace(weighted: f64, level: Level, pace_override: Option<f64>) -> f64 {
    match pace_override {
        Some(pages_per_day) => pages_per_day,
        None => weighted / difficulty_multiplier(level),
    }
}
