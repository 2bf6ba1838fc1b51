//! crates/qalamflow_core/src/forecast/mod.rs
//!
//! The forecast engine. Every function here is a pure computation over
//! records fetched by the caller and an explicit `now`.

pub mod difficulty;
pub mod frequency;
pub mod pace;
pub mod projector;
pub mod rating;
pub mod weekly;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{Book, Level, PaceOverride, ProgressEntry, ScheduleEntry};
use difficulty::{difficulty_multiplier, effective_pace};
use frequency::{resolve_study_frequency, StudyFrequency};
use pace::{compute_pace, history_stats, HistoryStats, PaceFigures};
use projector::{project_completion, Projection};
use rating::{classify_pace, PaceRating};
use weekly::{weekly_breakdown, WeekBucket};

pub const NOT_ENOUGH_DATA_MESSAGE: &str = "Not enough data to forecast. Start logging progress!";

/// Rounds to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Share of the book already read, in percent with one decimal.
pub fn percent_complete(book: &Book) -> f64 {
    if book.pages == 0 {
        return 0.0;
    }
    round1(f64::from(book.progress) / f64::from(book.pages) * 100.0)
}

//=========================================================================================
// Inputs and Outputs
//=========================================================================================

/// Everything needed to forecast one book.
#[derive(Debug, Clone, Copy)]
pub struct ForecastInput<'a> {
    pub book: &'a Book,
    /// Sorted by date ascending.
    pub entries: &'a [ProgressEntry],
    /// Slots linked to this book.
    pub schedule: &'a [ScheduleEntry],
    pub pace_override: Option<PaceOverride>,
    pub now: DateTime<Utc>,
}

impl ForecastInput<'_> {
    fn has_data(&self) -> bool {
        !self.entries.is_empty() || self.pace_override.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookRef {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub level: Level,
}

impl From<&Book> for BookRef {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            level: book.level,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FullForecast {
    pub book: BookRef,
    pub total_pages: u32,
    pub pages_read: u32,
    pub pages_remaining: u32,
    pub history: HistoryStats,
    pub pace: PaceFigures,
    /// Rounded to one decimal; the projection uses the unrounded value.
    pub effective_pace: f64,
    pub projection: Projection,
    pub pace_rating: PaceRating,
    pub percent_complete: f64,
    pub difficulty_multiplier: f64,
    pub study_frequency: StudyFrequency,
    pub pace_override: Option<f64>,
    pub weekly_breakdown: Vec<WeekBucket>,
}

/// Returned when a book has neither progress nor an override.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingForecast {
    pub book: BookRef,
    pub total_pages: u32,
    pub pages_read: u32,
    pub pages_remaining: u32,
    pub percent_complete: f64,
    pub difficulty_multiplier: f64,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BookForecast {
    Pending(PendingForecast),
    Ready(Box<FullForecast>),
}

/// One line of the multi-book forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSummary {
    pub book_id: Uuid,
    pub title: String,
    pub percent_complete: f64,
    pub pages_remaining: u32,
    pub estimated_days_left: Option<u64>,
    pub estimated_completion_date: Option<NaiveDate>,
}

//=========================================================================================
// Orchestration
//=========================================================================================

fn effective_pace_for(input: &ForecastInput<'_>, pace: &PaceFigures) -> f64 {
    effective_pace(
        pace.weighted,
        input.book.level,
        input.pace_override.map(|o| o.pages_per_day),
    )
}

/// Builds the per-book forecast payload.
pub fn forecast_book(input: ForecastInput<'_>) -> BookForecast {
    let book = input.book;
    let multiplier = difficulty_multiplier(book.level);

    if !input.has_data() {
        return BookForecast::Pending(PendingForecast {
            book: book.into(),
            total_pages: book.pages,
            pages_read: book.progress,
            pages_remaining: book.pages_remaining(),
            percent_complete: percent_complete(book),
            difficulty_multiplier: multiplier,
            message: NOT_ENOUGH_DATA_MESSAGE,
        });
    }

    let pace = compute_pace(input.entries, input.now);
    let study_frequency = resolve_study_frequency(input.schedule, input.entries);
    let effective = effective_pace_for(&input, &pace);
    let projection = project_completion(
        effective,
        book.pages_remaining(),
        &study_frequency,
        input.now,
    );

    BookForecast::Ready(Box::new(FullForecast {
        book: book.into(),
        total_pages: book.pages,
        pages_read: book.progress,
        pages_remaining: book.pages_remaining(),
        history: history_stats(input.entries),
        pace,
        effective_pace: round1(effective),
        projection,
        pace_rating: classify_pace(book.level, pace.weighted),
        percent_complete: percent_complete(book),
        difficulty_multiplier: multiplier,
        study_frequency,
        pace_override: input.pace_override.map(|o| o.pages_per_day),
        weekly_breakdown: weekly_breakdown(input.entries, input.now),
    }))
}

/// Builds the condensed line used by the multi-book forecast.
pub fn summarize_book(input: ForecastInput<'_>) -> ForecastSummary {
    let book = input.book;
    let projection = if input.has_data() {
        let pace = compute_pace(input.entries, input.now);
        let study_frequency = resolve_study_frequency(input.schedule, input.entries);
        project_completion(
            effective_pace_for(&input, &pace),
            book.pages_remaining(),
            &study_frequency,
            input.now,
        )
    } else {
        Projection::default()
    };

    ForecastSummary {
        book_id: book.id,
        title: book.title.clone(),
        percent_complete: percent_complete(book),
        pages_remaining: book.pages_remaining(),
        estimated_days_left: projection.estimated_days_left,
        estimated_completion_date: projection.estimated_completion_date,
    }
}

//=========================================================================================
// Test fixtures
//=========================================================================================


#[cfg(test)]
mod tests {
    use super::testing::{book, entry_at, now, slot};
    use super::*;
    use crate::domain::DayOfWeek;
    use chrono::Duration;
    use frequency::FrequencySource;

    fn input<'a>(
        book: &'a Book,
        entries: &'a [ProgressEntry],
        schedule: &'a [ScheduleEntry],
        pages_per_day: Option<f64>,
    ) -> ForecastInput<'a> {
        ForecastInput {
            book,
            entries,
            schedule,
            pace_override: pages_per_day.map(|pages_per_day| PaceOverride {
                user_id: book.user_id,
                book_id: book.id,
                pages_per_day,
            }),
            now: now(),
        }
    }

    fn ready(forecast: BookForecast) -> FullForecast {
        match forecast {
            BookForecast::Ready(full) => *full,
            BookForecast::Pending(p) => panic!("expected a full forecast, got {:?}", p),
        }
    }

    #[test]
    fn test_no_history_no_override_is_pending() {
        let b = book(Level::Intermediate, 200, 0);
        match forecast_book(input(&b, &[], &[], None)) {
            BookForecast::Pending(p) => {
                assert_eq!(p.pages_remaining, 200);
                assert_eq!(p.percent_complete, 0.0);
                assert_eq!(p.message, NOT_ENOUGH_DATA_MESSAGE);
            }
            other => panic!("expected pending, got {:?}", other),
        }
    }

    #[test]
    fn test_week_of_daily_reading_on_beginner_book() {
        let b = book(Level::Beginner, 100, 70);
        let entries: Vec<_> = (0..7)
            .rev()
            .map(|d| entry_at(now() - Duration::days(d), 10, 30))
            .collect();
        let f = ready(forecast_book(input(&b, &entries, &[], None)));

        assert_eq!(f.pace.overall, 10.0);
        assert_eq!(f.pace.recent, 10.0);
        assert_eq!(f.pace.weighted, 10.0);
        assert_eq!(f.effective_pace, 11.8);
        assert_eq!(f.pages_remaining, 30);
        assert_eq!(f.difficulty_multiplier, 0.85);
        assert_eq!(f.percent_complete, 70.0);
        assert_eq!(f.history.active_days, 7);
        assert_eq!(f.history.calendar_days, 7);
        // Seven active days in under a week reads as daily study: no stretching.
        assert_eq!(f.study_frequency.source, FrequencySource::History);
        assert_eq!(f.study_frequency.days_per_week, 7.0);
        assert_eq!(f.projection.estimated_days_left, Some(3));
        assert_eq!(f.pace_rating, PaceRating::Fast);
        assert_eq!(f.weekly_breakdown.len(), 8);
        assert_eq!(f.weekly_breakdown[7].pages, 70);
    }

    #[test]
    fn test_default_frequency_stretches_the_same_pace() {
        let b = book(Level::Beginner, 100, 70);
        let entries = vec![entry_at(now(), 10, 30)];
        let f = ready(forecast_book(input(&b, &entries, &[], None)));
        assert_eq!(f.study_frequency, StudyFrequency::default());
        assert_eq!(f.projection.estimated_days_left, Some(7));
    }

    #[test]
    fn test_override_drives_the_projection() {
        let b = book(Level::Advanced, 150, 100);
        let entries: Vec<_> = (0..3)
            .rev()
            .map(|d| entry_at(now() - Duration::days(d), 40, 60))
            .collect();
        let schedule: Vec<_> = DayOfWeek::ALL.iter().map(|d| slot(*d, "08:00")).collect();
        let f = ready(forecast_book(input(&b, &entries, &schedule, Some(5.0))));

        assert_eq!(f.effective_pace, 5.0);
        assert_eq!(f.pace_override, Some(5.0));
        assert_eq!(f.pace.weighted, 40.0);
        assert_eq!(f.projection.estimated_days_left, Some(10));
        // Rating stays on the measured pace.
        assert_eq!(f.pace_rating, PaceRating::VeryFast);
    }

    #[test]
    fn test_override_without_history_still_forecasts() {
        let b = book(Level::Intermediate, 120, 20);
        let f = ready(forecast_book(input(&b, &[], &[], Some(10.0))));
        assert_eq!(f.pace, PaceFigures::default());
        assert_eq!(f.history.active_days, 0);
        assert_eq!(f.study_frequency.source, FrequencySource::Default);
        // 10 study days at 3 days/week
        assert_eq!(f.projection.estimated_days_left, Some(24));
        assert_eq!(f.pace_rating, PaceRating::Slow);
        assert!(f.weekly_breakdown.iter().all(|w| w.sessions == 0));
    }

    #[test]
    fn test_finished_book_has_no_projection() {
        let b = book(Level::Intermediate, 100, 100);
        let entries = vec![entry_at(now(), 100, 300)];
        let f = ready(forecast_book(input(&b, &entries, &[], None)));
        assert_eq!(f.projection, Projection::default());
        assert_eq!(f.percent_complete, 100.0);
    }

    #[test]
    fn test_summary_matches_full_forecast() {
        let b = book(Level::Intermediate, 300, 60);
        let entries = vec![
            entry_at(now() - Duration::days(14), 20, 30),
            entry_at(now() - Duration::days(1), 20, 30),
        ];
        let full = ready(forecast_book(input(&b, &entries, &[], None)));
        let summary = summarize_book(input(&b, &entries, &[], None));
        assert_eq!(summary.pages_remaining, 240);
        assert_eq!(summary.percent_complete, 20.0);
        assert_eq!(summary.estimated_days_left, full.projection.estimated_days_left);
        assert_eq!(
            summary.estimated_completion_date,
            full.projection.estimated_completion_date
        );
    }

    #[test]
    fn test_summary_without_data() {
        let b = book(Level::Beginner, 80, 0);
        let summary = summarize_book(input(&b, &[], &[], None));
        assert_eq!(summary.pages_remaining, 80);
        assert_eq!(summary.estimated_days_left, None);
        assert_eq!(summary.estimated_completion_date, None);
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(11.764), 11.8);
        assert_eq!(round1(0.04), 0.0);
        assert_eq!(round1(2.25), 2.3);
    }
}
