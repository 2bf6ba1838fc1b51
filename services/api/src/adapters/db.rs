//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qalamflow_core::domain::{
    total_pages_read, Book, BookChanges, BookStatus, NewBook, NewProgress, NewSchedule,
    PaceOverride, ProgressChanges, ProgressEntry, ScheduleChanges, ScheduleEntry, User,
    UserCredentials,
};
use qalamflow_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn to_db_int(field: &str, value: u32) -> PortResult<i32> {
    i32::try_from(value).map_err(|_| PortError::InvalidInput(format!("{} is too large", field)))
}

fn from_db_int(value: i32) -> u32 {
    u32::try_from(value).unwrap_or_default()
}

fn parse_stored<T: std::str::FromStr>(value: &str) -> PortResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| PortError::Unexpected(format!("Corrupt stored value: {}", e)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    hashed_password: String,
}
impl UserRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user: User {
                user_id: self.id,
                name: self.name,
                email: self.email,
            },
            hashed_password: self.hashed_password,
        }
    }
}

const BOOK_COLUMNS: &str = "id, user_id, title, author, level, status, pages, progress, created_at";

#[derive(FromRow)]
struct BookRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    author: String,
    level: String,
    status: String,
    pages: i32,
    progress: i32,
    created_at: DateTime<Utc>,
}
impl BookRecord {
    fn to_domain(self) -> PortResult<Book> {
        Ok(Book {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            author: self.author,
            level: parse_stored(&self.level)?,
            status: parse_stored(&self.status)?,
            pages: from_db_int(self.pages),
            progress: from_db_int(self.progress),
            created_at: self.created_at,
        })
    }
}

const PROGRESS_COLUMNS: &str = "id, user_id, book_id, date, pages_read, time_spent";

#[derive(FromRow)]
struct ProgressRecord {
    id: Uuid,
    user_id: Uuid,
    book_id: Uuid,
    date: DateTime<Utc>,
    pages_read: i32,
    time_spent: i32,
}
impl ProgressRecord {
    fn to_domain(self) -> ProgressEntry {
        ProgressEntry {
            id: self.id,
            user_id: self.user_id,
            book_id: self.book_id,
            date: self.date,
            pages_read: from_db_int(self.pages_read),
            time_spent: from_db_int(self.time_spent),
        }
    }
}

const SCHEDULE_COLUMNS: &str = "id, user_id, day_of_week, time, activity, book_id";

const SCHEDULE_ORDER: &str = "array_position(ARRAY['monday','tuesday','wednesday','thursday',\
    'friday','saturday','sunday'], day_of_week), time";

#[derive(FromRow)]
struct ScheduleRecord {
    id: Uuid,
    user_id: Uuid,
    day_of_week: String,
    time: String,
    activity: String,
    book_id: Option<Uuid>,
}
impl ScheduleRecord {
    fn to_domain(self) -> PortResult<ScheduleEntry> {
        Ok(ScheduleEntry {
            id: self.id,
            user_id: self.user_id,
            day_of_week: parse_stored(&self.day_of_week)?,
            time: self.time,
            activity: self.activity,
            book_id: self.book_id,
        })
    }
}

#[derive(FromRow)]
struct PaceOverrideRecord {
    user_id: Uuid,
    book_id: Uuid,
    pages_per_day: f64,
}
impl PaceOverrideRecord {
    fn to_domain(self) -> PaceOverride {
        PaceOverride {
            user_id: self.user_id,
            book_id: self.book_id,
            pages_per_day: self.pages_per_day,
        }
    }
}

//=========================================================================================
// Progress bookkeeping (runs inside the caller's transaction)
//=========================================================================================

/// Takes a row lock on the book so concurrent writers for it queue up.
async fn lock_book(conn: &mut PgConnection, owner: Uuid, book_id: Uuid) -> PortResult<()> {
    sqlx::query("SELECT id FROM books WHERE id = $1 AND user_id = $2 FOR UPDATE")
        .bind(book_id)
        .bind(owner)
        .fetch_optional(&mut *conn)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))?;
    Ok(())
}

/// Rewrites `books.progress` from a fresh read of every entry for the book.
async fn recompute_book_progress(
    conn: &mut PgConnection,
    owner: Uuid,
    book_id: Uuid,
) -> PortResult<u32> {
    let entries: Vec<ProgressEntry> = sqlx::query_as::<_, ProgressRecord>(&format!(
        "SELECT {PROGRESS_COLUMNS} FROM progress WHERE user_id = $1 AND book_id = $2"
    ))
    .bind(owner)
    .bind(book_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(unexpected)?
    .into_iter()
    .map(ProgressRecord::to_domain)
    .collect();

    let total = total_pages_read(&entries);
    sqlx::query("UPDATE books SET progress = $1, updated_at = now() WHERE id = $2 AND user_id = $3")
        .bind(to_db_int("progress", total)?)
        .bind(book_id)
        .bind(owner)
        .execute(&mut *conn)
        .await
        .map_err(unexpected)?;
    debug!("Book {} progress recomputed to {}", book_id, total);
    Ok(total)
}

async fn progress_book_id(conn: &mut PgConnection, owner: Uuid, entry_id: Uuid) -> PortResult<Uuid> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT book_id FROM progress WHERE id = $1 AND user_id = $2")
            .bind(entry_id)
            .bind(owner)
            .fetch_optional(&mut *conn)
            .await
            .map_err(unexpected)?;
    row.map(|(book_id,)| book_id)
        .ok_or_else(|| PortError::NotFound(format!("Progress {} not found", entry_id)))
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Accounts ---

    async fn create_user(&self, name: &str, email: &str, hashed_password: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, name, email, hashed_password) VALUES ($1, $2, $3, $4) \
             RETURNING id, name, email, hashed_password",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::Conflict("User already exists".to_string())
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain().user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, email, hashed_password FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        Ok(record.to_domain().user)
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        row.map(|(user_id,)| user_id).ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Books ---

    async fn list_books(&self, owner: Uuid) -> PortResult<Vec<Book>> {
        sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(BookRecord::to_domain)
        .collect()
    }

    async fn list_books_by_status(&self, owner: Uuid, status: BookStatus) -> PortResult<Vec<Book>> {
        sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE user_id = $1 AND status = $2 \
             ORDER BY created_at DESC"
        ))
        .bind(owner)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(BookRecord::to_domain)
        .collect()
    }

    async fn find_book(&self, owner: Uuid, book_id: Uuid) -> PortResult<Book> {
        sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1 AND user_id = $2"
        ))
        .bind(book_id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))?
        .to_domain()
    }

    async fn create_book(&self, owner: Uuid, book: NewBook) -> PortResult<Book> {
        sqlx::query_as::<_, BookRecord>(&format!(
            "INSERT INTO books (id, user_id, title, author, level, status, pages) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {BOOK_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.level.as_str())
        .bind(book.status.as_str())
        .bind(to_db_int("pages", book.pages)?)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?
        .to_domain()
    }

    async fn update_book(&self, owner: Uuid, book_id: Uuid, changes: BookChanges) -> PortResult<Book> {
        let pages = changes.pages.map(|p| to_db_int("pages", p)).transpose()?;
        sqlx::query_as::<_, BookRecord>(&format!(
            "UPDATE books SET \
                title = COALESCE($3, title), \
                author = COALESCE($4, author), \
                level = COALESCE($5, level), \
                status = COALESCE($6, status), \
                pages = COALESCE($7, pages), \
                updated_at = now() \
             WHERE id = $1 AND user_id = $2 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(book_id)
        .bind(owner)
        .bind(changes.title)
        .bind(changes.author)
        .bind(changes.level.map(|l| l.as_str()))
        .bind(changes.status.map(|s| s.as_str()))
        .bind(pages)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))?
        .to_domain()
    }

    async fn delete_book(&self, owner: Uuid, book_id: Uuid) -> PortResult<()> {
        // Progress and overrides cascade; schedule slots are detached by the FK.
        let result = sqlx::query("DELETE FROM books WHERE id = $1 AND user_id = $2")
            .bind(book_id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Book {} not found", book_id)));
        }
        Ok(())
    }

    // --- Progress ---

    async fn list_progress(&self, owner: Uuid) -> PortResult<Vec<ProgressEntry>> {
        let records = sqlx::query_as::<_, ProgressRecord>(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress WHERE user_id = $1 \
             ORDER BY date DESC, created_at DESC"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(ProgressRecord::to_domain).collect())
    }

    async fn list_progress_for_book(&self, owner: Uuid, book_id: Uuid) -> PortResult<Vec<ProgressEntry>> {
        let records = sqlx::query_as::<_, ProgressRecord>(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress WHERE user_id = $1 AND book_id = $2 \
             ORDER BY date ASC, created_at ASC"
        ))
        .bind(owner)
        .bind(book_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(ProgressRecord::to_domain).collect())
    }

    async fn create_progress(&self, owner: Uuid, entry: NewProgress) -> PortResult<ProgressEntry> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        lock_book(&mut tx, owner, entry.book_id).await?;

        let created = sqlx::query_as::<_, ProgressRecord>(&format!(
            "INSERT INTO progress (id, user_id, book_id, date, pages_read, time_spent) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PROGRESS_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(entry.book_id)
        .bind(entry.date)
        .bind(to_db_int("pagesRead", entry.pages_read)?)
        .bind(to_db_int("timeSpent", entry.time_spent)?)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?
        .to_domain();

        recompute_book_progress(&mut tx, owner, created.book_id).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(created)
    }

    async fn update_progress(
        &self,
        owner: Uuid,
        entry_id: Uuid,
        changes: ProgressChanges,
    ) -> PortResult<ProgressEntry> {
        let pages_read = changes.pages_read.map(|p| to_db_int("pagesRead", p)).transpose()?;
        let time_spent = changes.time_spent.map(|t| to_db_int("timeSpent", t)).transpose()?;

        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let book_id = progress_book_id(&mut tx, owner, entry_id).await?;
        lock_book(&mut tx, owner, book_id).await?;

        let updated = sqlx::query_as::<_, ProgressRecord>(&format!(
            "UPDATE progress SET \
                date = COALESCE($3, date), \
                pages_read = COALESCE($4, pages_read), \
                time_spent = COALESCE($5, time_spent) \
             WHERE id = $1 AND user_id = $2 RETURNING {PROGRESS_COLUMNS}"
        ))
        .bind(entry_id)
        .bind(owner)
        .bind(changes.date)
        .bind(pages_read)
        .bind(time_spent)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?
        .to_domain();

        recompute_book_progress(&mut tx, owner, book_id).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(updated)
    }

    async fn delete_progress(&self, owner: Uuid, entry_id: Uuid) -> PortResult<ProgressEntry> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let book_id = progress_book_id(&mut tx, owner, entry_id).await?;
        lock_book(&mut tx, owner, book_id).await?;

        let removed = sqlx::query_as::<_, ProgressRecord>(&format!(
            "DELETE FROM progress WHERE id = $1 AND user_id = $2 RETURNING {PROGRESS_COLUMNS}"
        ))
        .bind(entry_id)
        .bind(owner)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?
        .to_domain();

        recompute_book_progress(&mut tx, owner, book_id).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(removed)
    }

    // --- Schedule ---

    async fn list_schedule(&self, owner: Uuid) -> PortResult<Vec<ScheduleEntry>> {
        sqlx::query_as::<_, ScheduleRecord>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE user_id = $1 ORDER BY {SCHEDULE_ORDER}"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(ScheduleRecord::to_domain)
        .collect()
    }

    async fn list_schedule_for_book(&self, owner: Uuid, book_id: Uuid) -> PortResult<Vec<ScheduleEntry>> {
        sqlx::query_as::<_, ScheduleRecord>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE user_id = $1 AND book_id = $2 \
             ORDER BY {SCHEDULE_ORDER}"
        ))
        .bind(owner)
        .bind(book_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(ScheduleRecord::to_domain)
        .collect()
    }

    async fn find_schedule(&self, owner: Uuid, schedule_id: Uuid) -> PortResult<ScheduleEntry> {
        sqlx::query_as::<_, ScheduleRecord>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = $1 AND user_id = $2"
        ))
        .bind(schedule_id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Schedule {} not found", schedule_id)))?
        .to_domain()
    }

    async fn create_schedule(&self, owner: Uuid, entry: NewSchedule) -> PortResult<ScheduleEntry> {
        sqlx::query_as::<_, ScheduleRecord>(&format!(
            "INSERT INTO schedules (id, user_id, day_of_week, time, activity, book_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {SCHEDULE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(entry.day_of_week.as_str())
        .bind(&entry.time)
        .bind(&entry.activity)
        .bind(entry.book_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?
        .to_domain()
    }

    async fn update_schedule(
        &self,
        owner: Uuid,
        schedule_id: Uuid,
        changes: ScheduleChanges,
    ) -> PortResult<ScheduleEntry> {
        // $6 says whether book_id was supplied at all, since NULL is a valid new value.
        sqlx::query_as::<_, ScheduleRecord>(&format!(
            "UPDATE schedules SET \
                day_of_week = COALESCE($3, day_of_week), \
                time = COALESCE($4, time), \
                activity = COALESCE($5, activity), \
                book_id = CASE WHEN $6 THEN $7 ELSE book_id END \
             WHERE id = $1 AND user_id = $2 RETURNING {SCHEDULE_COLUMNS}"
        ))
        .bind(schedule_id)
        .bind(owner)
        .bind(changes.day_of_week.map(|d| d.as_str()))
        .bind(changes.time)
        .bind(changes.activity)
        .bind(changes.book_id.is_some())
        .bind(changes.book_id.flatten())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Schedule {} not found", schedule_id)))?
        .to_domain()
    }

    async fn delete_schedule(&self, owner: Uuid, schedule_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM schedules WHERE id = $1 AND user_id = $2")
            .bind(schedule_id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Schedule {} not found", schedule_id)));
        }
        Ok(())
    }

    // --- Pace overrides ---

    async fn find_pace_override(&self, owner: Uuid, book_id: Uuid) -> PortResult<Option<PaceOverride>> {
        let record = sqlx::query_as::<_, PaceOverrideRecord>(
            "SELECT user_id, book_id, pages_per_day FROM pace_overrides \
             WHERE user_id = $1 AND book_id = $2",
        )
        .bind(owner)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(PaceOverrideRecord::to_domain))
    }

    async fn upsert_pace_override(
        &self,
        owner: Uuid,
        book_id: Uuid,
        pages_per_day: f64,
    ) -> PortResult<PaceOverride> {
        let record = sqlx::query_as::<_, PaceOverrideRecord>(
            "INSERT INTO pace_overrides (user_id, book_id, pages_per_day) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, book_id) \
             DO UPDATE SET pages_per_day = EXCLUDED.pages_per_day, updated_at = now() \
             RETURNING user_id, book_id, pages_per_day",
        )
        .bind(owner)
        .bind(book_id)
        .bind(pages_per_day)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_pace_override(&self, owner: Uuid, book_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM pace_overrides WHERE user_id = $1 AND book_id = $2")
            .bind(owner)
            .bind(book_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
