//! crates/qalamflow_core/src/testing.rs
//!
//! An in-memory `DatabaseService` for exercising the services in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    total_pages_read, Book, BookChanges, BookStatus, Level, NewBook, NewProgress, NewSchedule,
    PaceOverride, ProgressChanges, ProgressEntry, ScheduleChanges, ScheduleEntry, User,
    UserCredentials,
};
use crate::ports::{DatabaseService, PortError, PortResult};

pub fn new_book(level: Level, pages: u32) -> NewBook {
    NewBook {
        title: "Sharh al-Waraqat".to_string(),
        author: "al-Mahalli".to_string(),
        level,
        status: BookStatus::Studying,
        pages,
    }
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserCredentials>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    books: HashMap<Uuid, Book>,
    progress: HashMap<Uuid, ProgressEntry>,
    schedule: HashMap<Uuid, ScheduleEntry>,
    overrides: HashMap<(Uuid, Uuid), PaceOverride>,
}

impl Tables {
    fn book_mut(&mut self, owner: Uuid, book_id: Uuid) -> PortResult<&mut Book> {
        self.books
            .get_mut(&book_id)
            .filter(|b| b.user_id == owner)
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))
    }

    fn entries_for(&self, owner: Uuid, book_id: Uuid) -> Vec<ProgressEntry> {
        let mut entries: Vec<_> = self
            .progress
            .values()
            .filter(|p| p.user_id == owner && p.book_id == book_id)
            .cloned()
            .collect();
        entries.sort_by_key(|p| p.date);
        entries
    }

    fn recompute(&mut self, owner: Uuid, book_id: Uuid) -> PortResult<()> {
        let total = total_pages_read(&self.entries_for(owner, book_id));
        self.book_mut(owner, book_id)?.progress = total;
        Ok(())
    }

    fn entry_mut(&mut self, owner: Uuid, entry_id: Uuid) -> PortResult<&mut ProgressEntry> {
        self.progress
            .get_mut(&entry_id)
            .filter(|p| p.user_id == owner)
            .ok_or_else(|| PortError::NotFound(format!("Progress {} not found", entry_id)))
    }

    fn slot_mut(&mut self, owner: Uuid, id: Uuid) -> PortResult<&mut ScheduleEntry> {
        self.schedule
            .get_mut(&id)
            .filter(|s| s.user_id == owner)
            .ok_or_else(|| PortError::NotFound(format!("Schedule {} not found", id)))
    }
}

#[derive(Default)]
pub struct MemoryDb {
    tables: Mutex<Tables>,
}

impl MemoryDb {
    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub async fn seed_book(&self, owner: Uuid, book: NewBook) -> Book {
        self.create_book(owner, book).await.unwrap()
    }

    pub async fn override_count(&self) -> usize {
        self.lock().overrides.len()
    }
}

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn create_user(&self, name: &str, email: &str, hashed_password: &str) -> PortResult<User> {
        let mut t = self.lock();
        if t.users.values().any(|u| u.user.email == email) {
            return Err(PortError::Conflict("User already exists".into()));
        }
        let user = User {
            user_id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
        };
        t.users.insert(
            user.user_id,
            UserCredentials {
                user: user.clone(),
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.lock()
            .users
            .values()
            .find(|u| u.user.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.lock()
            .users
            .get(&user_id)
            .map(|u| u.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.lock()
            .sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match self.lock().sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.lock().sessions.remove(session_id);
        Ok(())
    }

    async fn list_books(&self, owner: Uuid) -> PortResult<Vec<Book>> {
        let mut books: Vec<_> = self
            .lock()
            .books
            .values()
            .filter(|b| b.user_id == owner)
            .cloned()
            .collect();
        books.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(books)
    }

    async fn list_books_by_status(&self, owner: Uuid, status: BookStatus) -> PortResult<Vec<Book>> {
        let books = self.list_books(owner).await?;
        Ok(books.into_iter().filter(|b| b.status == status).collect())
    }

    async fn find_book(&self, owner: Uuid, book_id: Uuid) -> PortResult<Book> {
        self.lock().book_mut(owner, book_id).map(|b| b.clone())
    }

    async fn create_book(&self, owner: Uuid, book: NewBook) -> PortResult<Book> {
        let created = Book {
            id: Uuid::new_v4(),
            user_id: owner,
            title: book.title,
            author: book.author,
            level: book.level,
            status: book.status,
            pages: book.pages,
            progress: 0,
            created_at: Utc::now(),
        };
        self.lock().books.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_book(&self, owner: Uuid, book_id: Uuid, changes: BookChanges) -> PortResult<Book> {
        let mut t = self.lock();
        let book = t.book_mut(owner, book_id)?;
        if let Some(title) = changes.title {
            book.title = title;
        }
        if let Some(author) = changes.author {
            book.author = author;
        }
        if let Some(level) = changes.level {
            book.level = level;
        }
        if let Some(status) = changes.status {
            book.status = status;
        }
        if let Some(pages) = changes.pages {
            book.pages = pages;
        }
        Ok(book.clone())
    }

    async fn delete_book(&self, owner: Uuid, book_id: Uuid) -> PortResult<()> {
        let mut t = self.lock();
        t.book_mut(owner, book_id)?;
        t.books.remove(&book_id);
        t.progress.retain(|_, p| p.book_id != book_id);
        t.overrides.remove(&(owner, book_id));
        for slot in t.schedule.values_mut().filter(|s| s.book_id == Some(book_id)) {
            slot.book_id = None;
        }
        Ok(())
    }

    async fn list_progress(&self, owner: Uuid) -> PortResult<Vec<ProgressEntry>> {
        let mut entries: Vec<_> = self
            .lock()
            .progress
            .values()
            .filter(|p| p.user_id == owner)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }

    async fn list_progress_for_book(&self, owner: Uuid, book_id: Uuid) -> PortResult<Vec<ProgressEntry>> {
        Ok(self.lock().entries_for(owner, book_id))
    }

    async fn create_progress(&self, owner: Uuid, entry: NewProgress) -> PortResult<ProgressEntry> {
        let mut t = self.lock();
        t.book_mut(owner, entry.book_id)?;
        let created = ProgressEntry {
            id: Uuid::new_v4(),
            user_id: owner,
            book_id: entry.book_id,
            date: entry.date,
            pages_read: entry.pages_read,
            time_spent: entry.time_spent,
        };
        t.progress.insert(created.id, created.clone());
        t.recompute(owner, created.book_id)?;
        Ok(created)
    }

    async fn update_progress(
        &self,
        owner: Uuid,
        entry_id: Uuid,
        changes: ProgressChanges,
    ) -> PortResult<ProgressEntry> {
        let mut t = self.lock();
        let entry = t.entry_mut(owner, entry_id)?;
        if let Some(date) = changes.date {
            entry.date = date;
        }
        if let Some(pages_read) = changes.pages_read {
            entry.pages_read = pages_read;
        }
        if let Some(time_spent) = changes.time_spent {
            entry.time_spent = time_spent;
        }
        let updated = entry.clone();
        t.recompute(owner, updated.book_id)?;
        Ok(updated)
    }

    async fn delete_progress(&self, owner: Uuid, entry_id: Uuid) -> PortResult<ProgressEntry> {
        let mut t = self.lock();
        t.entry_mut(owner, entry_id)?;
        let removed = t
            .progress
            .remove(&entry_id)
            .ok_or_else(|| PortError::NotFound(format!("Progress {} not found", entry_id)))?;
        t.recompute(owner, removed.book_id)?;
        Ok(removed)
    }

    async fn list_schedule(&self, owner: Uuid) -> PortResult<Vec<ScheduleEntry>> {
        let mut slots: Vec<_> = self
            .lock()
            .schedule
            .values()
            .filter(|s| s.user_id == owner)
            .cloned()
            .collect();
        slots.sort_by(|a, b| (a.day_of_week, &a.time).cmp(&(b.day_of_week, &b.time)));
        Ok(slots)
    }

    async fn list_schedule_for_book(&self, owner: Uuid, book_id: Uuid) -> PortResult<Vec<ScheduleEntry>> {
        let slots = self.list_schedule(owner).await?;
        Ok(slots.into_iter().filter(|s| s.book_id == Some(book_id)).collect())
    }

    async fn find_schedule(&self, owner: Uuid, schedule_id: Uuid) -> PortResult<ScheduleEntry> {
        self.lock().slot_mut(owner, schedule_id).map(|s| s.clone())
    }

    async fn create_schedule(&self, owner: Uuid, entry: NewSchedule) -> PortResult<ScheduleEntry> {
        let created = ScheduleEntry {
            id: Uuid::new_v4(),
            user_id: owner,
            day_of_week: entry.day_of_week,
            time: entry.time,
            activity: entry.activity,
            book_id: entry.book_id,
        };
        self.lock().schedule.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_schedule(
        &self,
        owner: Uuid,
        schedule_id: Uuid,
        changes: ScheduleChanges,
    ) -> PortResult<ScheduleEntry> {
        let mut t = self.lock();
        let slot = t.slot_mut(owner, schedule_id)?;
        if let Some(day) = changes.day_of_week {
            slot.day_of_week = day;
        }
        if let Some(time) = changes.time {
            slot.time = time;
        }
        if let Some(activity) = changes.activity {
            slot.activity = activity;
        }
        if let Some(book_id) = changes.book_id {
            slot.book_id = book_id;
        }
        Ok(slot.clone())
    }

    async fn delete_schedule(&self, owner: Uuid, schedule_id: Uuid) -> PortResult<()> {
        let mut t = self.lock();
        t.slot_mut(owner, schedule_id)?;
        t.schedule.remove(&schedule_id);
        Ok(())
    }

    async fn find_pace_override(&self, owner: Uuid, book_id: Uuid) -> PortResult<Option<PaceOverride>> {
        Ok(self.lock().overrides.get(&(owner, book_id)).copied())
    }

    async fn upsert_pace_override(
        &self,
        owner: Uuid,
        book_id: Uuid,
        pages_per_day: f64,
    ) -> PortResult<PaceOverride> {
        let saved = PaceOverride {
            user_id: owner,
            book_id,
            pages_per_day,
        };
        self.lock().overrides.insert((owner, book_id), saved);
        Ok(saved)
    }

    async fn delete_pace_override(&self, owner: Uuid, book_id: Uuid) -> PortResult<()> {
        self.lock().overrides.remove(&(owner, book_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_book_cascades() {
        let db = MemoryDb::default();
        let owner = Uuid::new_v4();
        let book = db.seed_book(owner, new_book(Level::Beginner, 40)).await;
        db.create_progress(
            owner,
            NewProgress {
                book_id: book.id,
                date: Utc::now(),
                pages_read: 4,
                time_spent: 10,
            },
        )
        .await
        .unwrap();
        let slot = db
            .create_schedule(
                owner,
                NewSchedule {
                    day_of_week: crate::domain::DayOfWeek::Friday,
                    time: "20:00".into(),
                    activity: "Reading".into(),
                    book_id: Some(book.id),
                },
            )
            .await
            .unwrap();
        db.upsert_pace_override(owner, book.id, 3.0).await.unwrap();

        db.delete_book(owner, book.id).await.unwrap();
        assert!(db.list_progress(owner).await.unwrap().is_empty());
        assert_eq!(db.override_count().await, 0);
        assert_eq!(db.find_schedule(owner, slot.id).await.unwrap().book_id, None);
    }
}
