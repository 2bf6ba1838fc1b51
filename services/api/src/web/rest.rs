//! services/api/src/web/rest.rs
//!
//! Shared REST payloads, the health endpoint and the master definition for
//! the OpenAPI specification.

use axum::response::{IntoResponse, Json};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::web::{auth, books, forecast, progress, schedule};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        books::list_books_handler,
        books::get_book_handler,
        books::create_book_handler,
        books::update_book_handler,
        books::delete_book_handler,
        progress::list_progress_handler,
        progress::list_book_progress_handler,
        progress::create_progress_handler,
        progress::update_progress_handler,
        progress::delete_progress_handler,
        schedule::list_schedule_handler,
        schedule::get_schedule_handler,
        schedule::create_schedule_handler,
        schedule::update_schedule_handler,
        schedule::delete_schedule_handler,
        forecast::overall_forecast_handler,
        forecast::book_forecast_handler,
        forecast::what_if_handler,
        forecast::set_pace_override_handler,
        forecast::clear_pace_override_handler,
    ),
    components(
        schemas(
            MessageResponse,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            auth::UserResponse,
            books::BookResponse,
            books::CreateBookRequest,
            books::UpdateBookRequest,
            progress::ProgressResponse,
            progress::ProgressBook,
            progress::CreateProgressRequest,
            progress::UpdateProgressRequest,
            schedule::ScheduleResponse,
            schedule::CreateScheduleRequest,
            schedule::UpdateScheduleRequest,
            forecast::BookForecastResponse,
            forecast::ForecastBook,
            forecast::StudyFrequencyResponse,
            forecast::PaceOverrideResponse,
            forecast::WeekResponse,
            forecast::ForecastSummaryResponse,
            forecast::OverallForecastResponse,
            forecast::WhatIfResponse,
            forecast::PaceRequest,
        )
    ),
    tags(
        (name = "QalamFlow API", description = "Study tracking and completion forecasts for Islamic studies texts."),
        (name = "auth", description = "Accounts and cookie sessions."),
        (name = "books", description = "The user's library."),
        (name = "progress", description = "Logged study sessions."),
        (name = "schedule", description = "Weekly study timetable."),
        (name = "forecast", description = "Completion forecasts, what-if simulations and pace overrides.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Payload Structs
//=========================================================================================

/// A plain acknowledgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up", body = MessageResponse))
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(MessageResponse::new("QalamFlow API running"))
}
