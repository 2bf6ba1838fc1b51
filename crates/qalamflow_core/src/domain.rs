//! crates/qalamflow_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Enumerations
//=========================================================================================

/// Returned when a stored or submitted label does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Declared difficulty of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }
}

impl FromStr for Level {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "advanced" => Ok(Level::Advanced),
            _ => Err(UnknownVariant::new("level", s)),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a book is still being studied. Only ever changed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BookStatus {
    #[default]
    Studying,
    Completed,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Studying => "studying",
            BookStatus::Completed => "completed",
        }
    }
}

impl FromStr for BookStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "studying" => Ok(BookStatus::Studying),
            "completed" => Ok(BookStatus::Completed),
            _ => Err(UnknownVariant::new("status", s)),
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Day of a recurring weekly schedule slot. Ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl FromStr for DayOfWeek {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        DayOfWeek::ALL
            .into_iter()
            .find(|d| d.as_str() == wanted)
            .ok_or_else(|| UnknownVariant::new("day of week", s))
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//=========================================================================================
// Accounts
//=========================================================================================

/// Represents a user - used throughout app.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}

//=========================================================================================
// Books
//=========================================================================================

/// A reading target owned by one user.
///
/// `progress` is the cached sum of `pages_read` over the owner's progress
/// entries for this book. It is rewritten by every progress mutation and
/// never edited directly.
#[derive(Debug, Clone)]
pub struct Book {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub author: String,
    pub level: Level,
    pub status: BookStatus,
    pub pages: u32,
    pub progress: u32,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// Pages still to read, never negative even if progress overshoots.
    pub fn pages_remaining(&self) -> u32 {
        self.pages.saturating_sub(self.progress)
    }
}

#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub level: Level,
    pub status: BookStatus,
    pub pages: u32,
}

/// A partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub level: Option<Level>,
    pub status: Option<BookStatus>,
    pub pages: Option<u32>,
}

//=========================================================================================
// Progress
//=========================================================================================

/// One logged reading session.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub date: DateTime<Utc>,
    pub pages_read: u32,
    /// Minutes.
    pub time_spent: u32,
}

impl ProgressEntry {
    /// The calendar day this entry counts towards.
    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }
}

#[derive(Debug, Clone)]
pub struct NewProgress {
    pub book_id: Uuid,
    pub date: DateTime<Utc>,
    pub pages_read: u32,
    pub time_spent: u32,
}

/// The book an entry belongs to is fixed at creation.
#[derive(Debug, Clone, Default)]
pub struct ProgressChanges {
    pub date: Option<DateTime<Utc>>,
    pub pages_read: Option<u32>,
    pub time_spent: Option<u32>,
}

/// Recomputes `Book::progress` from the full set of entries for one book.
pub fn total_pages_read(entries: &[ProgressEntry]) -> u32 {
    entries.iter().map(|e| e.pages_read).sum()
}

//=========================================================================================
// Schedule
//=========================================================================================

/// A recurring weekly study slot.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub day_of_week: DayOfWeek,
    /// "HH:MM", 24h clock.
    pub time: String,
    pub activity: String,
    pub book_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub day_of_week: DayOfWeek,
    pub time: String,
    pub activity: String,
    pub book_id: Option<Uuid>,
}

/// `book_id: Some(None)` detaches the slot from its book.
#[derive(Debug, Clone, Default)]
pub struct ScheduleChanges {
    pub day_of_week: Option<DayOfWeek>,
    pub time: Option<String>,
    pub activity: Option<String>,
    pub book_id: Option<Option<Uuid>>,
}

//=========================================================================================
// Pace override
//=========================================================================================

/// A user-asserted pages-per-day figure that replaces the computed pace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaceOverride {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub pages_per_day: f64,
}
