//! services/api/src/web/books.rs
//!
//! REST handlers for the user's library of books.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use qalamflow_core::domain::{Book, BookChanges, NewBook};
use qalamflow_core::library;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::MessageResponse;
use crate::web::state::AppState;
use crate::web::{parse_field, port_error};

//=========================================================================================
// API Payload Structs
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    /// `beginner`, `intermediate` or `advanced`.
    pub level: String,
    /// `studying` or `completed`.
    pub status: String,
    pub pages: u32,
    /// Total pages read across all progress entries.
    pub progress: u32,
    pub created_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            level: book.level.as_str().to_string(),
            status: book.status.as_str().to_string(),
            pages: book.pages,
            progress: book.progress,
            created_at: book.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub level: Option<String>,
    pub status: Option<String>,
    pub pages: u32,
}

impl CreateBookRequest {
    fn into_domain(self) -> Result<NewBook, (StatusCode, String)> {
        Ok(NewBook {
            title: self.title,
            author: self.author,
            level: self.level.as_deref().map(parse_field).transpose()?.unwrap_or_default(),
            status: self.status.as_deref().map(parse_field).transpose()?.unwrap_or_default(),
            pages: self.pages,
        })
    }
}

/// Only the supplied fields change. `progress` is derived and cannot be set.
#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub level: Option<String>,
    pub status: Option<String>,
    pub pages: Option<u32>,
}

impl UpdateBookRequest {
    fn into_domain(self) -> Result<BookChanges, (StatusCode, String)> {
        Ok(BookChanges {
            title: self.title,
            author: self.author,
            level: self.level.as_deref().map(parse_field).transpose()?,
            status: self.status.as_deref().map(parse_field).transpose()?,
            pages: self.pages,
        })
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the user's books, newest first.
#[utoipa::path(
    get,
    path = "/api/books",
    tag = "books",
    responses((status = 200, description = "All books", body = [BookResponse]))
)]
pub async fn list_books_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let books = state
        .db
        .list_books(user_id)
        .await
        .map_err(|e| port_error("Book", e))?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect::<Vec<_>>()))
}

#[utoipa::path(
    get,
    path = "/api/books/{id}",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 200, description = "The book", body = BookResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let book = state
        .db
        .find_book(user_id, book_id)
        .await
        .map_err(|e| port_error("Book", e))?;
    Ok(Json(BookResponse::from(book)))
}

#[utoipa::path(
    post,
    path = "/api/books",
    tag = "books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Invalid book")
    )
)]
pub async fn create_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateBookRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let book = library::add_book(state.db.as_ref(), user_id, req.into_domain()?)
        .await
        .map_err(|e| port_error("Book", e))?;
    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

#[utoipa::path(
    put,
    path = "/api/books/{id}",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book id")),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 400, description = "Invalid change"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let book = library::edit_book(state.db.as_ref(), user_id, book_id, req.into_domain()?)
        .await
        .map_err(|e| port_error("Book", e))?;
    Ok(Json(BookResponse::from(book)))
}

/// Delete a book together with its progress history and pace override.
#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    tag = "books",
    params(("id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book deleted", body = MessageResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .delete_book(user_id, book_id)
        .await
        .map_err(|e| port_error("Book", e))?;
    Ok(Json(MessageResponse::new("Book deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qalamflow_core::domain::{BookStatus, Level};

    #[test]
    fn test_create_request_defaults_level_and_status() {
        let req: CreateBookRequest =
            serde_json::from_str(r#"{"title":"Al-Ajurrumiyyah","author":"Ibn Ajurrum","pages":40}"#)
                .unwrap();
        let book = req.into_domain().unwrap();
        assert_eq!(book.level, Level::Beginner);
        assert_eq!(book.status, BookStatus::Studying);
        assert_eq!(book.pages, 40);
    }

    #[test]
    fn test_create_request_rejects_unknown_level() {
        let req: CreateBookRequest = serde_json::from_str(
            r#"{"title":"T","author":"A","pages":10,"level":"expert"}"#,
        )
        .unwrap();
        let (status, _) = req.into_domain().unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_update_request_ignores_progress() {
        let req: UpdateBookRequest =
            serde_json::from_str(r#"{"status":"completed","progress":999}"#).unwrap();
        let changes = req.into_domain().unwrap();
        assert_eq!(changes.status, Some(BookStatus::Completed));
        assert_eq!(changes.pages, None);
    }

    #[test]
    fn test_book_response_is_camel_case() {
        let book = Book {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Riyad as-Salihin".to_string(),
            author: "An-Nawawi".to_string(),
            level: Level::Intermediate,
            status: BookStatus::Studying,
            pages: 300,
            progress: 45,
            created_at: Utc::now(),
        };
        let body = serde_json::to_value(BookResponse::from(book)).unwrap();
        assert_eq!(body["level"], "intermediate");
        assert_eq!(body["progress"], 45);
        assert!(body.get("createdAt").is_some());
        assert!(body.get("userId").is_none());
    }
}
