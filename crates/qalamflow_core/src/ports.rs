//! crates/qalamflow_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete data store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Book, BookChanges, BookStatus, NewBook, NewProgress, NewSchedule, PaceOverride,
    ProgressChanges, ProgressEntry, ScheduleChanges, ScheduleEntry, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The record does not exist or belongs to another user. Both cases look the same.
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence for every record the application owns.
///
/// Every method that takes an `owner` must filter by it, and report records
/// owned by someone else as `PortError::NotFound`.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Accounts ---
    async fn create_user(&self, name: &str, email: &str, hashed_password: &str)
        -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Books ---
    /// Newest first.
    async fn list_books(&self, owner: Uuid) -> PortResult<Vec<Book>>;

    async fn list_books_by_status(&self, owner: Uuid, status: BookStatus)
        -> PortResult<Vec<Book>>;

    async fn find_book(&self, owner: Uuid, book_id: Uuid) -> PortResult<Book>;

    async fn create_book(&self, owner: Uuid, book: NewBook) -> PortResult<Book>;

    async fn update_book(&self, owner: Uuid, book_id: Uuid, changes: BookChanges)
        -> PortResult<Book>;

    /// Removes the book together with its progress entries and pace override.
    /// Schedule slots pointing at it are kept with their book reference cleared.
    async fn delete_book(&self, owner: Uuid, book_id: Uuid) -> PortResult<()>;

    // --- Progress ---
    /// Every entry of the owner, newest first.
    async fn list_progress(&self, owner: Uuid) -> PortResult<Vec<ProgressEntry>>;

    /// Entries for one book ordered by date ascending.
    async fn list_progress_for_book(&self, owner: Uuid, book_id: Uuid)
        -> PortResult<Vec<ProgressEntry>>;

    /// The following three mutations must rewrite `Book::progress` from a fresh
    /// read of all the book's entries in the same transaction as the change.
    async fn create_progress(&self, owner: Uuid, entry: NewProgress) -> PortResult<ProgressEntry>;

    async fn update_progress(
        &self,
        owner: Uuid,
        entry_id: Uuid,
        changes: ProgressChanges,
    ) -> PortResult<ProgressEntry>;

    async fn delete_progress(&self, owner: Uuid, entry_id: Uuid) -> PortResult<ProgressEntry>;

    // --- Schedule ---
    /// Ordered by day of week, then time.
    async fn list_schedule(&self, owner: Uuid) -> PortResult<Vec<ScheduleEntry>>;

    async fn list_schedule_for_book(&self, owner: Uuid, book_id: Uuid)
        -> PortResult<Vec<ScheduleEntry>>;

    async fn find_schedule(&self, owner: Uuid, schedule_id: Uuid) -> PortResult<ScheduleEntry>;

    async fn create_schedule(&self, owner: Uuid, entry: NewSchedule) -> PortResult<ScheduleEntry>;

    async fn update_schedule(
        &self,
        owner: Uuid,
        schedule_id: Uuid,
        changes: ScheduleChanges,
    ) -> PortResult<ScheduleEntry>;

    async fn delete_schedule(&self, owner: Uuid, schedule_id: Uuid) -> PortResult<()>;

    // --- Pace overrides ---
    async fn find_pace_override(&self, owner: Uuid, book_id: Uuid)
        -> PortResult<Option<PaceOverride>>;

    async fn upsert_pace_override(
        &self,
        owner: Uuid,
        book_id: Uuid,
        pages_per_day: f64,
    ) -> PortResult<PaceOverride>;

    /// Succeeds whether or not an override existed.
    async fn delete_pace_override(&self, owner: Uuid, book_id: Uuid) -> PortResult<()>;
}
