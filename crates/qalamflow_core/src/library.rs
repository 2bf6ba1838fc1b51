//! crates/qalamflow_core/src/library.rs
//!
//! Validated write operations for books, progress and the weekly schedule.
//! Reads go straight through the `DatabaseService` port.

use chrono::NaiveTime;
use tracing::info;
use uuid::Uuid;

use crate::domain::{
    Book, BookChanges, NewBook, NewProgress, NewSchedule, ProgressChanges, ProgressEntry,
    ScheduleChanges, ScheduleEntry,
};
use crate::ports::{DatabaseService, PortError, PortResult};

fn required_text(field: &str, value: &str) -> PortResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PortError::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn valid_page_count(pages: u32) -> PortResult<u32> {
    if pages == 0 {
        return Err(PortError::InvalidInput(
            "Total pages must be at least 1".to_string(),
        ));
    }
    Ok(pages)
}

/// "HH:MM" on a 24h clock.
fn valid_time_of_day(time: &str) -> PortResult<String> {
    let time = time.trim();
    NaiveTime::parse_from_str(time, "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| PortError::InvalidInput(format!("'{}' is not a valid HH:MM time", time)))
}

//=========================================================================================
// Books
//=========================================================================================

pub async fn add_book(db: &dyn DatabaseService, owner: Uuid, book: NewBook) -> PortResult<Book> {
    let book = NewBook {
        title: required_text("Title", &book.title)?,
        author: required_text("Author", &book.author)?,
        pages: valid_page_count(book.pages)?,
        ..book
    };
    let created = db.create_book(owner, book).await?;
    info!("Book {} created for user {}", created.id, owner);
    Ok(created)
}

pub async fn edit_book(
    db: &dyn DatabaseService,
    owner: Uuid,
    book_id: Uuid,
    changes: BookChanges,
) -> PortResult<Book> {
    let changes = BookChanges {
        title: changes.title.as_deref().map(|t| required_text("Title", t)).transpose()?,
        author: changes.author.as_deref().map(|a| required_text("Author", a)).transpose()?,
        pages: changes.pages.map(valid_page_count).transpose()?,
        ..changes
    };
    db.update_book(owner, book_id, changes).await
}

//=========================================================================================
// Progress
//=========================================================================================

/// Logs a reading session against one of the owner's books.
pub async fn log_progress(
    db: &dyn DatabaseService,
    owner: Uuid,
    entry: NewProgress,
) -> PortResult<ProgressEntry> {
    db.find_book(owner, entry.book_id).await?;
    let created = db.create_progress(owner, entry).await?;
    info!(
        "Logged {} pages for book {} (user {})",
        created.pages_read, created.book_id, owner
    );
    Ok(created)
}

pub async fn edit_progress(
    db: &dyn DatabaseService,
    owner: Uuid,
    entry_id: Uuid,
    changes: ProgressChanges,
) -> PortResult<ProgressEntry> {
    db.update_progress(owner, entry_id, changes).await
}

pub async fn remove_progress(
    db: &dyn DatabaseService,
    owner: Uuid,
    entry_id: Uuid,
) -> PortResult<ProgressEntry> {
    let removed = db.delete_progress(owner, entry_id).await?;
    info!("Progress entry {} removed from book {}", entry_id, removed.book_id);
    Ok(removed)
}

//=========================================================================================
// Schedule
//=========================================================================================

pub async fn add_schedule(
    db: &dyn DatabaseService,
    owner: Uuid,
    entry: NewSchedule,
) -> PortResult<ScheduleEntry> {
    if let Some(book_id) = entry.book_id {
        db.find_book(owner, book_id).await?;
    }
    let entry = NewSchedule {
        time: valid_time_of_day(&entry.time)?,
        activity: required_text("Activity", &entry.activity)?,
        ..entry
    };
    db.create_schedule(owner, entry).await
}

pub async fn edit_schedule(
    db: &dyn DatabaseService,
    owner: Uuid,
    schedule_id: Uuid,
    changes: ScheduleChanges,
) -> PortResult<ScheduleEntry> {
    if let Some(Some(book_id)) = changes.book_id {
        db.find_book(owner, book_id).await?;
    }
    let changes = ScheduleChanges {
        time: changes.time.as_deref().map(valid_time_of_day).transpose()?,
        activity: changes
            .activity
            .as_deref()
            .map(|a| required_text("Activity", a))
            .transpose()?,
        ..changes
    };
    db.update_schedule(owner, schedule_id, changes).await
}
