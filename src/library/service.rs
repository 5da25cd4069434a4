// Pagemark - Personal Reading Tracker
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Library operations
//!
//! [`Library`] is the write path for every book, session and genre change.
//! Each operation validates its input, runs its statements (inside one
//! transaction when there is more than one) and maps missing rows to
//! `TrackerError::RecordNotFound`.
//!
//! # Association Replacement
//! Editing a book deletes all of its BookGenre and BookAuthor rows and
//! re-creates them from the submitted names, resolving each name with
//! find-or-create. A failure anywhere rolls the whole edit back.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{Result, TrackerError};
use crate::library::stats::ReadingStats;
use crate::library::validation::{validate_session, BookInput, GENRE_NAME_TAKEN};
use crate::storage::database::Database;
use crate::storage::models::*;
use crate::storage::queries;

/// Book with its sessions (most recent first) and derived statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: BookWithRelations,
    pub sessions: Vec<ReadingSession>,
    pub stats: ReadingStats,
}

/// Reading library backed by a SQLite database
#[derive(Debug, Clone)]
pub struct Library {
    db: Database,
}

impl Library {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// In-memory library for tests
    pub async fn in_memory() -> Result<Self> {
        Ok(Self::new(Database::new_in_memory().await?))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn pool(&self) -> &SqlitePool {
        self.db.pool()
    }

    // ========================================================================
    // BOOKS
    // ========================================================================

    pub async fn get_book(&self, book_id: i64) -> Result<Book> {
        queries::find_book_by_id(self.pool(), book_id)
            .await?
            .ok_or_else(|| TrackerError::not_found("Book", book_id))
    }

    /// Book plus its author and genre associations with names resolved
    pub async fn get_book_with_relations(&self, book_id: i64) -> Result<BookWithRelations> {
        let book = self.get_book(book_id).await?;
        let authors = queries::find_author_links_by_book(self.pool(), book_id).await?;
        let genres = queries::find_genre_links_by_book(self.pool(), book_id).await?;

        Ok(BookWithRelations { book, authors, genres })
    }

    /// All books ordered by title, with authors and genres
    pub async fn list_books(&self) -> Result<Vec<BookWithRelations>> {
        let books = queries::list_books(self.pool()).await?;
        let mut authors = group_by_book(queries::list_author_links(self.pool()).await?);
        let mut genres = group_by_book(queries::list_genre_links(self.pool()).await?);

        Ok(books
            .into_iter()
            .map(|book| BookWithRelations {
                authors: authors.remove(&book.id).unwrap_or_default(),
                genres: genres.remove(&book.id).unwrap_or_default(),
                book,
            })
            .collect())
    }

    pub async fn count_books(&self) -> Result<i64> {
        queries::count_books(self.pool()).await
    }

    /// Create a book with its genre and author associations
    ///
    /// Returns the new book id. Nothing is written if validation fails.
    pub async fn create_book(&self, input: &BookInput) -> Result<i64> {
        input.validate()?;

        let mut tx = self.pool().begin().await?;
        let book_id = queries::insert_book(&mut *tx, &input.to_new_book()).await?;
        link_associations(&mut *tx, book_id, input).await?;
        tx.commit().await?;

        tracing::info!(book_id, title = %input.title.trim(), "created book");
        Ok(book_id)
    }

    /// Update a book and replace all of its genre and author associations
    pub async fn update_book(&self, book_id: i64, input: &BookInput) -> Result<()> {
        input.validate()?;

        let mut tx = self.pool().begin().await?;
        let changed = queries::update_book(&mut *tx, book_id, &input.to_new_book()).await?;
        if changed == 0 {
            return Err(TrackerError::not_found("Book", book_id));
        }

        queries::remove_book_genres(&mut *tx, book_id).await?;
        queries::remove_book_authors(&mut *tx, book_id).await?;
        link_associations(&mut *tx, book_id, input).await?;
        tx.commit().await?;

        tracing::info!(book_id, "updated book");
        Ok(())
    }

    /// Delete a book together with its sessions and associations
    pub async fn delete_book(&self, book_id: i64) -> Result<()> {
        let deleted = queries::delete_book(self.pool(), book_id).await?;
        if deleted == 0 {
            return Err(TrackerError::not_found("Book", book_id));
        }

        tracing::info!(book_id, "deleted book");
        Ok(())
    }

    pub async fn list_authors(&self) -> Result<Vec<Author>> {
        queries::list_authors(self.pool()).await
    }

    // ========================================================================
    // READING SESSIONS
    // ========================================================================

    /// Sessions of an existing book, most recent first
    pub async fn get_reading_sessions(&self, book_id: i64) -> Result<Vec<ReadingSession>> {
        self.get_book(book_id).await?;
        queries::list_sessions_by_book(self.pool(), book_id).await
    }

    /// Everything the book page shows
    pub async fn book_detail(&self, book_id: i64) -> Result<BookDetail> {
        let book = self.get_book_with_relations(book_id).await?;
        let sessions = queries::list_sessions_by_book(self.pool(), book_id).await?;
        let stats = ReadingStats::compute(book.book.page_count, &sessions);

        Ok(BookDetail { book, sessions, stats })
    }

    pub async fn book_stats(&self, book_id: i64) -> Result<ReadingStats> {
        let book = self.get_book(book_id).await?;
        let sessions = queries::list_sessions_by_book(self.pool(), book_id).await?;
        Ok(ReadingStats::compute(book.page_count, &sessions))
    }

    pub async fn get_reading_session(&self, session_id: i64) -> Result<ReadingSession> {
        queries::find_reading_session(self.pool(), session_id)
            .await?
            .ok_or_else(|| TrackerError::not_found("Reading session", session_id))
    }

    /// Every session with its book title, grouped by book
    pub async fn list_all_sessions(&self) -> Result<Vec<ReadingSessionWithBook>> {
        queries::list_sessions_with_books(self.pool()).await
    }

    /// Log a session against an existing book
    pub async fn add_reading_session(&self, session: &NewReadingSession) -> Result<i64> {
        validate_session(session)?;
        self.get_book(session.book_id).await?;

        let session_id = queries::insert_reading_session(self.pool(), session).await?;

        tracing::info!(session_id, book_id = session.book_id, duration = session.duration, "logged reading session");
        Ok(session_id)
    }

    pub async fn update_reading_session(&self, session_id: i64, session: &NewReadingSession) -> Result<()> {
        validate_session(session)?;

        let mut tx = self.pool().begin().await?;
        if !queries::book_exists(&mut *tx, session.book_id).await? {
            return Err(TrackerError::not_found("Book", session.book_id));
        }
        let changed = queries::update_reading_session(&mut *tx, session_id, session).await?;
        if changed == 0 {
            return Err(TrackerError::not_found("Reading session", session_id));
        }
        tx.commit().await?;

        tracing::info!(session_id, "updated reading session");
        Ok(())
    }

    pub async fn delete_reading_session(&self, session_id: i64) -> Result<()> {
        let deleted = queries::delete_reading_session(self.pool(), session_id).await?;
        if deleted == 0 {
            return Err(TrackerError::not_found("Reading session", session_id));
        }

        tracing::info!(session_id, "deleted reading session");
        Ok(())
    }

    // ========================================================================
    // GENRES
    // ========================================================================

    /// Genres with the number of books tagged with each
    pub async fn list_genres(&self) -> Result<Vec<GenreUsage>> {
        queries::list_genre_usage(self.pool()).await
    }

    pub async fn get_genre(&self, genre_id: i64) -> Result<Genre> {
        queries::find_genre_by_id(self.pool(), genre_id)
            .await?
            .ok_or_else(|| TrackerError::not_found("Genre", genre_id))
    }

    /// Create a genre; a name already in use is a field error on `name`
    pub async fn create_genre(&self, name: &str) -> Result<Genre> {
        let id = queries::insert_genre(self.pool(), name)
            .await
            .map_err(genre_name_taken)?;

        tracing::info!(genre_id = id, name, "created genre");
        Ok(Genre { id, name: name.to_string() })
    }

    pub async fn rename_genre(&self, genre_id: i64, name: &str) -> Result<Genre> {
        let renamed = queries::rename_genre(self.pool(), genre_id, name)
            .await
            .map_err(genre_name_taken)?;
        if renamed == 0 {
            return Err(TrackerError::not_found("Genre", genre_id));
        }

        tracing::info!(genre_id, name, "renamed genre");
        Ok(Genre { id: genre_id, name: name.to_string() })
    }

    /// Delete a genre no book is tagged with
    pub async fn delete_genre(&self, genre_id: i64) -> Result<()> {
        let genre = self.get_genre(genre_id).await?;

        let mut tx = self.pool().begin().await?;
        let links = queries::count_genre_links(&mut *tx, genre_id).await?;
        if links > 0 {
            return Err(TrackerError::Conflict(format!(
                "Genre '{}' is still assigned to {} book(s)",
                genre.name, links
            )));
        }
        queries::delete_genre(&mut *tx, genre_id).await?;
        tx.commit().await?;

        tracing::info!(genre_id, "deleted genre");
        Ok(())
    }
}

/// Resolve every submitted name and insert one join row per name
async fn link_associations(conn: &mut SqliteConnection, book_id: i64, input: &BookInput) -> Result<()> {
    for name in input.genre_names() {
        let genre_id = queries::find_or_create_genre(conn, name).await?;
        queries::add_book_genre(&mut *conn, book_id, genre_id).await?;
    }

    for name in input.author_names() {
        let author_id = queries::find_or_create_author(conn, name).await?;
        queries::add_book_author(&mut *conn, book_id, author_id).await?;
    }

    Ok(())
}

fn group_by_book<T>(rows: Vec<(i64, T)>) -> HashMap<i64, Vec<T>> {
    let mut grouped: HashMap<i64, Vec<T>> = HashMap::new();
    for (book_id, row) in rows {
        grouped.entry(book_id).or_default().push(row);
    }
    grouped
}

/// Report a UNIQUE(name) violation on Genre as a field error
fn genre_name_taken(err: TrackerError) -> TrackerError {
    match &err {
        TrackerError::SqlxError(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            TrackerError::field("name", GENRE_NAME_TAKEN)
        }
        _ => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn session(book_id: i64, page_start: i64, page_end: i64) -> NewReadingSession {
        NewReadingSession {
            book_id,
            start_time: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            duration: 30,
            page_start: Some(page_start),
            page_end: Some(page_end),
            finished_book: false,
        }
    }

    #[tokio::test]
    async fn test_create_book_with_relations() {
        let library = Library::in_memory().await.expect("Failed to create library");

        let input = BookInput::new("The Left Hand of Darkness", 304)
            .with_genres(["Sci-Fi", "Classics"])
            .with_authors(["Ursula K. Le Guin"]);
        let book_id = library.create_book(&input).await.expect("Failed to create book");

        let book = library.get_book_with_relations(book_id).await.expect("Failed to load book");
        assert_eq!(book.book.title, "The Left Hand of Darkness");
        assert_eq!(book.genre_names(), vec!["Sci-Fi", "Classics"]);
        assert_eq!(book.author_names(), vec!["Ursula K. Le Guin"]);
    }

    #[tokio::test]
    async fn test_empty_title_inserts_nothing() {
        let library = Library::in_memory().await.expect("Failed to create library");

        let input = BookInput::new("", 100).with_genres(["Fantasy"]);
        let err = library.create_book(&input).await.unwrap_err();

        assert!(err.field_errors().unwrap().contains("title"));
        assert_eq!(library.count_books().await.unwrap(), 0);
        assert!(library.list_genres().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_genre_names_share_one_row() {
        let library = Library::in_memory().await.expect("Failed to create library");

        let input = BookInput::new("Mistborn", 541).with_genres(["Fantasy", "Fantasy"]);
        let book_id = library.create_book(&input).await.expect("Failed to create book");

        let genres = library.list_genres().await.unwrap();
        assert_eq!(genres.len(), 1);
        assert_eq!(genres[0].name, "Fantasy");

        let links = queries::find_book_genres(library.database().pool(), book_id).await.unwrap();
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|link| link.genre_id == genres[0].id));
    }

    #[tokio::test]
    async fn test_update_replaces_genres_and_authors() {
        let library = Library::in_memory().await.expect("Failed to create library");
        let pool = library.database().pool().clone();

        let input = BookInput::new("Hyperion", 482)
            .with_genres(["Fantasy"])
            .with_authors(["Dan Simmons", "Someone Else"]);
        let book_id = library.create_book(&input).await.expect("Failed to create book");

        let edit = BookInput::new("Hyperion", 482)
            .with_genres(["Sci-Fi"])
            .with_authors(["Dan Simmons"]);
        library.update_book(book_id, &edit).await.expect("Failed to update book");

        let links = queries::find_book_genres(&pool, book_id).await.unwrap();
        assert_eq!(links.len(), 1);
        let genre = queries::find_genre_by_id(&pool, links[0].genre_id).await.unwrap().unwrap();
        assert_eq!(genre.name, "Sci-Fi");

        let authors = queries::find_book_authors(&pool, book_id).await.unwrap();
        assert_eq!(authors.len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_book() {
        let library = Library::in_memory().await.expect("Failed to create library");

        let err = library.update_book(99, &BookInput::new("Ghost", 10)).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(library.list_genres().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_edit_keeps_associations() {
        let library = Library::in_memory().await.expect("Failed to create library");

        let input = BookInput::new("Piranesi", 272).with_genres(["Fantasy"]);
        let book_id = library.create_book(&input).await.unwrap();

        let edit = BookInput::new("Piranesi", 0).with_genres(["Mystery"]);
        assert!(library.update_book(book_id, &edit).await.unwrap_err().is_validation());

        let book = library.get_book_with_relations(book_id).await.unwrap();
        assert_eq!(book.book.page_count, Some(272));
        assert_eq!(book.genre_names(), vec!["Fantasy"]);
    }

    #[tokio::test]
    async fn test_list_books_groups_relations() {
        let library = Library::in_memory().await.expect("Failed to create library");

        library
            .create_book(&BookInput::new("Beta", 10).with_authors(["A, Jr."]))
            .await
            .unwrap();
        library
            .create_book(&BookInput::new("alpha", 10).with_genres(["Essays"]))
            .await
            .unwrap();

        let books = library.list_books().await.unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].book.title, "alpha");
        assert_eq!(books[0].genre_names(), vec!["Essays"]);
        assert!(books[0].authors.is_empty());
        assert_eq!(books[1].author_names(), vec!["A, Jr."]);
    }

    #[tokio::test]
    async fn test_session_lifecycle_and_stats() {
        let library = Library::in_memory().await.expect("Failed to create library");
        let book_id = library.create_book(&BookInput::new("Dune", 200)).await.unwrap();

        let session_id = library.add_reading_session(&session(book_id, 1, 21)).await.unwrap();
        let detail = library.book_detail(book_id).await.unwrap();
        assert_eq!(detail.sessions.len(), 1);
        assert_eq!(detail.stats.total_pages_read, 20);
        assert_eq!(detail.stats.percentage_read, 10.0);
        assert_eq!(detail.stats.next_page_start, 22);

        library
            .update_reading_session(session_id, &session(book_id, 1, 41))
            .await
            .expect("Failed to update session");
        assert_eq!(library.book_stats(book_id).await.unwrap().total_pages_read, 40);

        library.delete_reading_session(session_id).await.unwrap();
        assert!(library.get_reading_session(session_id).await.unwrap_err().is_not_found());
        assert!(library.delete_reading_session(session_id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_session_for_missing_book() {
        let library = Library::in_memory().await.expect("Failed to create library");

        let err = library.add_reading_session(&session(5, 1, 10)).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(library.get_reading_sessions(5).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_genre_management() {
        let library = Library::in_memory().await.expect("Failed to create library");

        let poetry = library.create_genre("Poetry").await.unwrap();
        let err = library.create_genre("Poetry").await.unwrap_err();
        assert_eq!(err.field_errors().and_then(|e| e.get("name")), Some(GENRE_NAME_TAKEN));

        let renamed = library.rename_genre(poetry.id, "Verse").await.unwrap();
        assert_eq!(renamed.name, "Verse");
        library.rename_genre(poetry.id, "Verse").await.expect("Keeping the same name is allowed");

        let book_id = library
            .create_book(&BookInput::new("Leaves of Grass", 400).with_genres(["Verse"]))
            .await
            .unwrap();
        let usage = library.list_genres().await.unwrap();
        assert_eq!(usage[0].book_count, 1);

        let err = library.delete_genre(poetry.id).await.unwrap_err();
        assert!(matches!(err, TrackerError::Conflict(_)));

        library.delete_book(book_id).await.unwrap();
        library.delete_genre(poetry.id).await.expect("Unused genre can be deleted");
        assert!(library.get_genre(poetry.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_genre_name_collisions_are_field_errors() {
        let library = Library::in_memory().await.expect("Failed to create library");

        let (first, second) = tokio::join!(library.create_genre("Drama"), library.create_genre("Drama"));
        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(r, Err(e) if e.field_errors().is_some())));

        // Created implicitly by a book form
        library
            .create_book(&BookInput::new("Ulysses", 700).with_genres(["Modernism"]))
            .await
            .unwrap();
        let drama = library.list_genres().await.unwrap().into_iter().find(|g| g.name == "Drama").unwrap();

        let err = library.rename_genre(drama.id, "Modernism").await.unwrap_err();
        assert_eq!(err.field_errors().and_then(|e| e.get("name")), Some(GENRE_NAME_TAKEN));
        assert!(library.rename_genre(999, "Opera").await.unwrap_err().is_not_found());
    }
}
