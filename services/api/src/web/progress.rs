//! services/api/src/web/progress.rs
//!
//! REST handlers for logged study sessions. Every write goes through the core
//! `library` operations, which keep the owning book's page total in sync.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use qalamflow_core::domain::{NewProgress, ProgressChanges, ProgressEntry};
use qalamflow_core::library;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::port_error;
use crate::web::rest::MessageResponse;
use crate::web::state::AppState;

//=========================================================================================
// API Payload Structs
//=========================================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProgressBook {
    pub title: String,
    pub author: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub id: Uuid,
    pub book_id: Uuid,
    pub date: DateTime<Utc>,
    pub pages_read: u32,
    /// Minutes.
    pub time_spent: u32,
    /// Only present on the combined listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<ProgressBook>,
}

impl From<ProgressEntry> for ProgressResponse {
    fn from(entry: ProgressEntry) -> Self {
        Self {
            id: entry.id,
            book_id: entry.book_id,
            date: entry.date,
            pages_read: entry.pages_read,
            time_spent: entry.time_spent,
            book: None,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProgressRequest {
    pub book_id: Uuid,
    /// RFC 3339 timestamp or `YYYY-MM-DD`. Defaults to now.
    pub date: Option<String>,
    pub pages_read: u32,
    pub time_spent: u32,
}

/// The book an entry belongs to cannot be changed.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgressRequest {
    pub date: Option<String>,
    pub pages_read: Option<u32>,
    pub time_spent: Option<u32>,
}

/// Accepts a full RFC 3339 timestamp or a bare calendar date (midnight UTC).
fn parse_progress_date(raw: &str) -> Result<DateTime<Utc>, (StatusCode, String)> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                format!("'{}' is not a valid date", raw),
            )
        })
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Every entry of the user, newest first, with the book's title and author.
#[utoipa::path(
    get,
    path = "/api/progress",
    tag = "progress",
    responses((status = 200, description = "All progress entries", body = [ProgressResponse]))
)]
pub async fn list_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (entries, books) = tokio::try_join!(
        state.db.list_progress(user_id),
        state.db.list_books(user_id),
    )
    .map_err(|e| port_error("Progress", e))?;

    let titles: HashMap<Uuid, ProgressBook> = books
        .into_iter()
        .map(|b| {
            (
                b.id,
                ProgressBook {
                    title: b.title,
                    author: b.author,
                },
            )
        })
        .collect();

    let body: Vec<ProgressResponse> = entries
        .into_iter()
        .map(|entry| {
            let book = titles.get(&entry.book_id).cloned();
            ProgressResponse {
                book,
                ..ProgressResponse::from(entry)
            }
        })
        .collect();
    Ok(Json(body))
}

/// Entries for one book, newest first.
#[utoipa::path(
    get,
    path = "/api/progress/book/{book_id}",
    tag = "progress",
    params(("book_id" = Uuid, Path, description = "Book id")),
    responses((status = 200, description = "Progress entries for the book", body = [ProgressResponse]))
)]
pub async fn list_book_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let entries = state
        .db
        .list_progress_for_book(user_id, book_id)
        .await
        .map_err(|e| port_error("Progress", e))?;
    Ok(Json(
        entries
            .into_iter()
            .rev()
            .map(ProgressResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/progress",
    tag = "progress",
    request_body = CreateProgressRequest,
    responses(
        (status = 201, description = "Progress logged", body = ProgressResponse),
        (status = 400, description = "Invalid entry"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateProgressRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let date = match req.date.as_deref() {
        Some(raw) => parse_progress_date(raw)?,
        None => Utc::now(),
    };
    let entry = NewProgress {
        book_id: req.book_id,
        date,
        pages_read: req.pages_read,
        time_spent: req.time_spent,
    };
    let created = library::log_progress(state.db.as_ref(), user_id, entry)
        .await
        .map_err(|e| port_error("Book", e))?;
    Ok((StatusCode::CREATED, Json(ProgressResponse::from(created))))
}

#[utoipa::path(
    put,
    path = "/api/progress/{id}",
    tag = "progress",
    params(("id" = Uuid, Path, description = "Progress entry id")),
    request_body = UpdateProgressRequest,
    responses(
        (status = 200, description = "Progress updated", body = ProgressResponse),
        (status = 404, description = "Progress not found")
    )
)]
pub async fn update_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<UpdateProgressRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let changes = ProgressChanges {
        date: req.date.as_deref().map(parse_progress_date).transpose()?,
        pages_read: req.pages_read,
        time_spent: req.time_spent,
    };
    let updated = library::edit_progress(state.db.as_ref(), user_id, entry_id, changes)
        .await
        .map_err(|e| port_error("Progress", e))?;
    Ok(Json(ProgressResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/progress/{id}",
    tag = "progress",
    params(("id" = Uuid, Path, description = "Progress entry id")),
    responses(
        (status = 200, description = "Progress deleted", body = MessageResponse),
        (status = 404, description = "Progress not found")
    )
)]
pub async fn delete_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    library::remove_progress(state.db.as_ref(), user_id, entry_id)
        .await
        .map_err(|e| port_error("Progress", e))?;
    Ok(Json(MessageResponse::new("Progress deleted")))
}
