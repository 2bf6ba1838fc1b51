//! crates/qalamflow_core/src/service.rs
//!
//! Forecast operations. Each one fetches the minimal set of records through
//! the `DatabaseService` port and hands them to the pure forecast engine.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Book, BookStatus, PaceOverride, ProgressEntry, ScheduleEntry};
use crate::forecast::{
    forecast_book, frequency::resolve_study_frequency, projector::simulate, projector::WhatIf,
    summarize_book, BookForecast, ForecastInput, ForecastSummary,
};
use crate::ports::{DatabaseService, PortError, PortResult};

/// Accepts only finite, strictly positive paces.
pub fn validate_pages_per_day(pages_per_day: Option<f64>) -> PortResult<f64> {
    match pages_per_day {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(PortError::InvalidInput(
            "pagesPerDay must be a positive number".to_string(),
        )),
    }
}

struct History {
    entries: Vec<ProgressEntry>,
    schedule: Vec<ScheduleEntry>,
    pace_override: Option<PaceOverride>,
}

impl History {
    fn input<'a>(&'a self, book: &'a Book, now: DateTime<Utc>) -> ForecastInput<'a> {
        ForecastInput {
            book,
            entries: &self.entries,
            schedule: &self.schedule,
            pace_override: self.pace_override,
            now,
        }
    }
}

async fn load_history(db: &dyn DatabaseService, owner: Uuid, book_id: Uuid) -> PortResult<History> {
    let (entries, schedule, pace_override) = futures::try_join!(
        db.list_progress_for_book(owner, book_id),
        db.list_schedule_for_book(owner, book_id),
        db.find_pace_override(owner, book_id),
    )?;
    Ok(History {
        entries,
        schedule,
        pace_override,
    })
}

/// Full forecast for one book.
pub async fn book_forecast(
    db: &dyn DatabaseService,
    owner: Uuid,
    book_id: Uuid,
    now: DateTime<Utc>,
) -> PortResult<BookForecast> {
    let book = db.find_book(owner, book_id).await?;
    let history = load_history(db, owner, book_id).await?;
    debug!(
        "Forecasting book {} from {} entries (override: {})",
        book_id,
        history.entries.len(),
        history.pace_override.is_some()
    );
    Ok(forecast_book(history.input(&book, now)))
}

/// Condensed forecasts for every book the owner is still studying.
///
/// Books are independent, so their histories are fetched concurrently.
pub async fn overall_forecast(
    db: &dyn DatabaseService,
    owner: Uuid,
    now: DateTime<Utc>,
) -> PortResult<Vec<ForecastSummary>> {
    let books = db.list_books_by_status(owner, BookStatus::Studying).await?;
    try_join_all(books.iter().map(|book| async move {
        let history = load_history(db, owner, book.id).await?;
        Ok::<_, PortError>(summarize_book(history.input(book, now)))
    }))
    .await
}

/// Projects completion at a hypothetical pace. Never reads or writes the
/// stored override.
pub async fn what_if(
    db: &dyn DatabaseService,
    owner: Uuid,
    book_id: Uuid,
    pages_per_day: Option<f64>,
    now: DateTime<Utc>,
) -> PortResult<WhatIf> {
    let pages_per_day = validate_pages_per_day(pages_per_day)?;
    let book = db.find_book(owner, book_id).await?;
    let (entries, schedule) = futures::try_join!(
        db.list_progress_for_book(owner, book_id),
        db.list_schedule_for_book(owner, book_id),
    )?;
    let frequency = resolve_study_frequency(&schedule, &entries);
    Ok(simulate(pages_per_day, book.pages_remaining(), &frequency, now))
}

pub async fn set_pace_override(
    db: &dyn DatabaseService,
    owner: Uuid,
    book_id: Uuid,
    pages_per_day: Option<f64>,
) -> PortResult<PaceOverride> {
    let pages_per_day = validate_pages_per_day(pages_per_day)?;
    db.find_book(owner, book_id).await?;
    let saved = db.upsert_pace_override(owner, book_id, pages_per_day).await?;
    info!("Pace override for book {} set to {}", book_id, pages_per_day);
    Ok(saved)
}

pub async fn clear_pace_override(
    db: &dyn DatabaseService,
    owner: Uuid,
    book_id: Uuid,
) -> PortResult<()> {
    db.delete_pace_override(owner, book_id).await?;
    info!("Pace override for book {} removed", book_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DayOfWeek, Level, NewProgress, NewSchedule};
    use crate::forecast::testing::now;
    use crate::library;
    use crate::testing::{new_book, MemoryDb};
    use chrono::Duration;

    #[tokio::test]
    async fn test_pending_forecast_for_fresh_book() {
        let db = MemoryDb::default();
        let owner = Uuid::new_v4();
        let book = db.seed_book(owner, new_book(Level::Intermediate, 200)).await;

        let forecast = book_forecast(&db, owner, book.id, now()).await.unwrap();
        match forecast {
            BookForecast::Pending(p) => {
                assert_eq!(p.pages_remaining, 200);
                assert!(!p.message.is_empty());
            }
            other => panic!("expected pending forecast, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_foreign_book_is_not_found() {
        let db = MemoryDb::default();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let book = db.seed_book(owner, new_book(Level::Beginner, 50)).await;

        let err = book_forecast(&db, stranger, book.id, now()).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
        let missing = book_forecast(&db, owner, Uuid::new_v4(), now()).await.unwrap_err();
        assert!(matches!(missing, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_override_replaces_weighted_pace() {
        let db = MemoryDb::default();
        let owner = Uuid::new_v4();
        let book = db.seed_book(owner, new_book(Level::Intermediate, 100)).await;
        for d in [2, 1, 0] {
            library::log_progress(
                &db,
                owner,
                NewProgress {
                    book_id: book.id,
                    date: now() - Duration::days(d),
                    pages_read: 10,
                    time_spent: 20,
                },
            )
            .await
            .unwrap();
        }
        for day in DayOfWeek::ALL {
            db.create_schedule(
                owner,
                NewSchedule {
                    day_of_week: day,
                    time: "07:00".into(),
                    activity: "Reading".into(),
                    book_id: Some(book.id),
                },
            )
            .await
            .unwrap();
        }

        set_pace_override(&db, owner, book.id, Some(5.0)).await.unwrap();
        let forecast = book_forecast(&db, owner, book.id, now()).await.unwrap();
        let BookForecast::Ready(full) = forecast else {
            panic!("expected a full forecast");
        };
        assert_eq!(full.pages_remaining, 70);
        assert_eq!(full.effective_pace, 5.0);
        assert_eq!(full.pace.weighted, 10.0);
        assert_eq!(full.projection.estimated_days_left, Some(14));

        clear_pace_override(&db, owner, book.id).await.unwrap();
        let BookForecast::Ready(full) = book_forecast(&db, owner, book.id, now()).await.unwrap()
        else {
            panic!("expected a full forecast");
        };
        assert_eq!(full.pace_override, None);
        assert_eq!(full.projection.estimated_days_left, Some(7));
    }

    #[tokio::test]
    async fn test_invalid_pace_is_rejected_before_lookup() {
        let db = MemoryDb::default();
        let owner = Uuid::new_v4();
        for bad in [Some(0.0), Some(-3.0), Some(f64::NAN), None] {
            let err = what_if(&db, owner, Uuid::new_v4(), bad, now()).await.unwrap_err();
            assert!(matches!(err, PortError::InvalidInput(_)));
            let err = set_pace_override(&db, owner, Uuid::new_v4(), bad).await.unwrap_err();
            assert!(matches!(err, PortError::InvalidInput(_)));
        }
        assert_eq!(db.override_count().await, 0);
    }

    #[tokio::test]
    async fn test_what_if_leaves_override_alone() {
        let db = MemoryDb::default();
        let owner = Uuid::new_v4();
        let book = db.seed_book(owner, new_book(Level::Advanced, 90)).await;
        set_pace_override(&db, owner, book.id, Some(2.0)).await.unwrap();

        let sim = what_if(&db, owner, book.id, Some(30.0), now()).await.unwrap();
        assert_eq!(sim.pages_per_day, 30.0);
        assert_eq!(sim.pages_remaining, 90);
        // 3 study days at the default 3 days/week
        assert_eq!(sim.projection.estimated_days_left, Some(7));

        let stored = db.find_pace_override(owner, book.id).await.unwrap();
        assert_eq!(stored.map(|o| o.pages_per_day), Some(2.0));
    }

    #[tokio::test]
    async fn test_overall_forecast_lists_only_studying_books() {
        let db = MemoryDb::default();
        let owner = Uuid::new_v4();
        let active = db.seed_book(owner, new_book(Level::Beginner, 100)).await;
        let mut done = new_book(Level::Beginner, 100);
        done.status = BookStatus::Completed;
        db.seed_book(owner, done).await;
        db.seed_book(Uuid::new_v4(), new_book(Level::Beginner, 100)).await;

        library::log_progress(
            &db,
            owner,
            NewProgress {
                book_id: active.id,
                date: now(),
                pages_read: 25,
                time_spent: 40,
            },
        )
        .await
        .unwrap();

        let summaries = overall_forecast(&db, owner, now()).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].book_id, active.id);
        assert_eq!(summaries[0].percent_complete, 25.0);
        assert_eq!(summaries[0].pages_remaining, 75);
        assert!(summaries[0].estimated_days_left.is_some());
    }
}
