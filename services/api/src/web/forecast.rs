//! services/api/src/web/forecast.rs
//!
//! REST handlers for completion forecasts, what-if simulations and manual
//! pace overrides. The numbers themselves come from the core forecast engine.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use qalamflow_core::forecast::{
    frequency::StudyFrequency, projector::WhatIf, weekly::WeekBucket, BookForecast, BookRef,
    ForecastSummary, FullForecast, PendingForecast,
};
use qalamflow_core::service;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::port_error;
use crate::web::rest::MessageResponse;
use crate::web::state::AppState;

//=========================================================================================
// API Payload Structs
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct ForecastBook {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub level: String,
}

impl From<BookRef> for ForecastBook {
    fn from(book: BookRef) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            level: book.level.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudyFrequencyResponse {
    pub days_per_week: f64,
    /// `schedule`, `history` or `default`.
    pub source: String,
}

impl From<StudyFrequency> for StudyFrequencyResponse {
    fn from(frequency: StudyFrequency) -> Self {
        Self {
            days_per_week: frequency.days_per_week,
            source: frequency.source.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaceOverrideResponse {
    pub pages_per_day: f64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeekResponse {
    /// e.g. `Jun 9`.
    pub week_label: String,
    pub week_start: NaiveDate,
    pub pages: u32,
    /// Minutes.
    pub time: u32,
    pub sessions: u32,
}

impl From<WeekBucket> for WeekResponse {
    fn from(week: WeekBucket) -> Self {
        Self {
            week_label: week.label,
            week_start: week.week_start,
            pages: week.pages,
            time: week.time,
            sessions: week.sessions,
        }
    }
}

/// Per-book forecast. When the book has no history and no override the
/// pace fields are zero, the projection is null and `message` explains why.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookForecastResponse {
    pub book: ForecastBook,
    pub total_pages: u32,
    pub pages_read: u32,
    pub pages_remaining: u32,
    pub active_days: usize,
    pub calendar_days: i64,
    pub average_pages_per_active_day: f64,
    pub average_pages_per_calendar_day: f64,
    /// Minutes per active day.
    pub average_time_per_session: f64,
    pub weighted_pages_per_day: f64,
    pub recent_pages_per_day: f64,
    pub effective_pace: f64,
    pub estimated_days_left: Option<u64>,
    pub estimated_completion_date: Option<NaiveDate>,
    /// `slow`, `normal`, `fast` or `very_fast`.
    pub pace_rating: Option<String>,
    pub percent_complete: f64,
    pub difficulty_multiplier: f64,
    pub study_frequency: Option<StudyFrequencyResponse>,
    pub pace_override: Option<PaceOverrideResponse>,
    pub weekly_breakdown: Vec<WeekResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<PendingForecast> for BookForecastResponse {
    fn from(f: PendingForecast) -> Self {
        Self {
            book: f.book.into(),
            total_pages: f.total_pages,
            pages_read: f.pages_read,
            pages_remaining: f.pages_remaining,
            active_days: 0,
            calendar_days: 0,
            average_pages_per_active_day: 0.0,
            average_pages_per_calendar_day: 0.0,
            average_time_per_session: 0.0,
            weighted_pages_per_day: 0.0,
            recent_pages_per_day: 0.0,
            effective_pace: 0.0,
            estimated_days_left: None,
            estimated_completion_date: None,
            pace_rating: None,
            percent_complete: f.percent_complete,
            difficulty_multiplier: f.difficulty_multiplier,
            study_frequency: None,
            pace_override: None,
            weekly_breakdown: Vec::new(),
            message: Some(f.message.to_string()),
        }
    }
}

impl From<FullForecast> for BookForecastResponse {
    fn from(f: FullForecast) -> Self {
        Self {
            book: f.book.into(),
            total_pages: f.total_pages,
            pages_read: f.pages_read,
            pages_remaining: f.pages_remaining,
            active_days: f.history.active_days,
            calendar_days: f.history.calendar_days,
            average_pages_per_active_day: f.pace.overall,
            average_pages_per_calendar_day: f.history.pages_per_calendar_day,
            average_time_per_session: f.history.time_per_active_day,
            weighted_pages_per_day: f.pace.weighted,
            recent_pages_per_day: f.pace.recent,
            effective_pace: f.effective_pace,
            estimated_days_left: f.projection.estimated_days_left,
            estimated_completion_date: f.projection.estimated_completion_date,
            pace_rating: Some(f.pace_rating.as_str().to_string()),
            percent_complete: f.percent_complete,
            difficulty_multiplier: f.difficulty_multiplier,
            study_frequency: Some(f.study_frequency.into()),
            pace_override: f
                .pace_override
                .map(|pages_per_day| PaceOverrideResponse { pages_per_day }),
            weekly_breakdown: f.weekly_breakdown.into_iter().map(WeekResponse::from).collect(),
            message: None,
        }
    }
}

impl From<BookForecast> for BookForecastResponse {
    fn from(forecast: BookForecast) -> Self {
        match forecast {
            BookForecast::Pending(pending) => pending.into(),
            BookForecast::Ready(full) => (*full).into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSummaryResponse {
    pub book_id: Uuid,
    pub title: String,
    pub percent_complete: f64,
    pub pages_remaining: u32,
    pub estimated_days_left: Option<u64>,
    pub estimated_completion_date: Option<NaiveDate>,
}

impl From<ForecastSummary> for ForecastSummaryResponse {
    fn from(s: ForecastSummary) -> Self {
        Self {
            book_id: s.book_id,
            title: s.title,
            percent_complete: s.percent_complete,
            pages_remaining: s.pages_remaining,
            estimated_days_left: s.estimated_days_left,
            estimated_completion_date: s.estimated_completion_date,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OverallForecastResponse {
    pub books: Vec<ForecastSummaryResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WhatIfResponse {
    pub pages_per_day: f64,
    pub pages_remaining: u32,
    pub estimated_days_left: Option<u64>,
    pub estimated_completion_date: Option<NaiveDate>,
}

impl From<WhatIf> for WhatIfResponse {
    fn from(w: WhatIf) -> Self {
        Self {
            pages_per_day: w.pages_per_day,
            pages_remaining: w.pages_remaining,
            estimated_days_left: w.projection.estimated_days_left,
            estimated_completion_date: w.projection.estimated_completion_date,
        }
    }
}

/// Body of the what-if and override endpoints.
///
/// The value is kept loose so a missing or non-numeric pace reaches the
/// core validation and gets its 400 message instead of a decode error.
#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaceRequest {
    #[serde(default)]
    #[schema(value_type = f64)]
    pub pages_per_day: Option<Value>,
}

impl PaceRequest {
    fn pages_per_day(&self) -> Option<f64> {
        match self.pages_per_day.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Condensed forecasts for every book still being studied.
#[utoipa::path(
    get,
    path = "/api/forecast",
    tag = "forecast",
    responses((status = 200, description = "Forecast per studying book", body = OverallForecastResponse))
)]
pub async fn overall_forecast_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let summaries = service::overall_forecast(state.db.as_ref(), user_id, Utc::now())
        .await
        .map_err(|e| port_error("Forecast", e))?;
    Ok(Json(OverallForecastResponse {
        books: summaries.into_iter().map(ForecastSummaryResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/forecast/{book_id}",
    tag = "forecast",
    params(("book_id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 200, description = "Forecast for the book", body = BookForecastResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn book_forecast_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let forecast = service::book_forecast(state.db.as_ref(), user_id, book_id, Utc::now())
        .await
        .map_err(|e| port_error("Book", e))?;
    Ok(Json(BookForecastResponse::from(forecast)))
}

/// Projects completion at a hypothetical pace without storing anything.
#[utoipa::path(
    post,
    path = "/api/forecast/{book_id}/whatif",
    tag = "forecast",
    params(("book_id" = Uuid, Path, description = "Book id")),
    request_body = PaceRequest,
    responses(
        (status = 200, description = "Simulated projection", body = WhatIfResponse),
        (status = 400, description = "pagesPerDay must be a positive number"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn what_if_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<PaceRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let result = service::what_if(
        state.db.as_ref(),
        user_id,
        book_id,
        req.pages_per_day(),
        Utc::now(),
    )
    .await
    .map_err(|e| port_error("Book", e))?;
    Ok(Json(WhatIfResponse::from(result)))
}

#[utoipa::path(
    put,
    path = "/api/forecast/{book_id}/pace-override",
    tag = "forecast",
    params(("book_id" = Uuid, Path, description = "Book id")),
    request_body = PaceRequest,
    responses(
        (status = 200, description = "Override stored", body = PaceOverrideResponse),
        (status = 400, description = "pagesPerDay must be a positive number"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn set_pace_override_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<PaceRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let saved = service::set_pace_override(state.db.as_ref(), user_id, book_id, req.pages_per_day())
        .await
        .map_err(|e| port_error("Book", e))?;
    Ok(Json(PaceOverrideResponse {
        pages_per_day: saved.pages_per_day,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/forecast/{book_id}/pace-override",
    tag = "forecast",
    params(("book_id" = Uuid, Path, description = "Book id")),
    responses((status = 200, description = "Override removed", body = MessageResponse))
)]
pub async fn clear_pace_override_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    service::clear_pace_override(state.db.as_ref(), user_id, book_id)
        .await
        .map_err(|e| port_error("Book", e))?;
    Ok(Json(MessageResponse::new("Pace override removed")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qalamflow_core::domain::Level;
    use qalamflow_core::forecast::NOT_ENOUGH_DATA_MESSAGE;

    fn book_ref() -> BookRef {
        BookRef {
            id: Uuid::new_v4(),
            title: "Al-Waraqat".to_string(),
            author: "Al-Juwayni".to_string(),
            level: Level::Intermediate,
        }
    }

    #[test]
    fn test_pending_forecast_shape() {
        let body = serde_json::to_value(BookForecastResponse::from(BookForecast::Pending(
            PendingForecast {
                book: book_ref(),
                total_pages: 200,
                pages_read: 0,
                pages_remaining: 200,
                percent_complete: 0.0,
                difficulty_multiplier: 1.0,
                message: NOT_ENOUGH_DATA_MESSAGE,
            },
        )))
        .unwrap();

        assert_eq!(body["pagesRemaining"], 200);
        assert!(body["estimatedDaysLeft"].is_null());
        assert!(body["estimatedCompletionDate"].is_null());
        assert!(body["paceRating"].is_null());
        assert_eq!(body["message"], NOT_ENOUGH_DATA_MESSAGE);
        assert_eq!(body["book"]["level"], "intermediate");
        assert_eq!(body["weeklyBreakdown"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn test_what_if_shape() {
        let body = serde_json::to_value(WhatIfResponse {
            pages_per_day: 10.0,
            pages_remaining: 95,
            estimated_days_left: Some(10),
            estimated_completion_date: NaiveDate::from_ymd_opt(2026, 6, 25),
        })
        .unwrap();
        assert_eq!(body["pagesPerDay"], 10.0);
        assert_eq!(body["estimatedDaysLeft"], 10);
        assert_eq!(body["estimatedCompletionDate"], "2026-06-25");
    }

    #[test]
    fn test_pace_request_accepts_numbers_and_numeric_strings() {
        let parse = |raw: &str| serde_json::from_str::<PaceRequest>(raw).unwrap().pages_per_day();
        assert_eq!(parse(r#"{"pagesPerDay":12.5}"#), Some(12.5));
        assert_eq!(parse(r#"{"pagesPerDay":"8"}"#), Some(8.0));
        assert_eq!(parse(r#"{"pagesPerDay":"fast"}"#), None);
        assert_eq!(parse(r#"{"pagesPerDay":null}"#), None);
        assert_eq!(parse(r#"{}"#), None);
    }
}
