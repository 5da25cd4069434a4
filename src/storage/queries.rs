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

//! Database query functions
//!
//! One function per statement, grouped by table. Multi-statement operations
//! (find-or-create, association replacement) live in `library::service` and
//! call these inside a transaction.
//!
//! # Query Patterns
//! - Reads take `&SqlitePool`
//! - Writes are generic over `Executor` so they run on a pool or on `&mut *tx`
//! - Find-or-create helpers take `&mut SqliteConnection` because they issue
//!   more than one statement on the same connection

use crate::error::Result;
use crate::storage::models::*;
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};

// ============================================================================
// BOOK QUERIES
// ============================================================================

/// Insert a new book
///
/// Returns the id of the inserted book.
pub async fn insert_book<'e, E>(executor: E, book: &NewBook) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("INSERT INTO Book (title, isbn, pageCount) VALUES (?, ?, ?)")
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(book.page_count)
        .execute(executor)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Find book by ID
pub async fn find_book_by_id(pool: &SqlitePool, book_id: i64) -> Result<Option<Book>> {
    let book = sqlx::query_as::<_, Book>("SELECT * FROM Book WHERE id = ?")
        .bind(book_id)
        .fetch_optional(pool)
        .await?;

    Ok(book)
}

/// Check whether a book row exists
pub async fn book_exists<'e, E>(executor: E, book_id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM Book WHERE id = ?")
        .bind(book_id)
        .fetch_optional(executor)
        .await?;

    Ok(found.is_some())
}

/// Update title, isbn and page count of an existing book
///
/// Returns the number of rows changed (0 if the book does not exist).
pub async fn update_book<'e, E>(executor: E, book_id: i64, book: &NewBook) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE Book SET title = ?, isbn = ?, pageCount = ? WHERE id = ?")
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(book.page_count)
        .bind(book_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// List all books ordered by title (no relations)
pub async fn list_books(pool: &SqlitePool) -> Result<Vec<Book>> {
    let books = sqlx::query_as::<_, Book>("SELECT * FROM Book ORDER BY title COLLATE NOCASE, id")
        .fetch_all(pool)
        .await?;

    Ok(books)
}

/// Count total books
pub async fn count_books(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Book")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Delete a book (join rows and sessions go with it via CASCADE)
pub async fn delete_book<'e, E>(executor: E, book_id: i64) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM Book WHERE id = ?")
        .bind(book_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

// ============================================================================
// AUTHOR QUERIES
// ============================================================================

/// Insert or find author by exact name
///
/// Returns the author id (either existing or newly created). Author names have
/// no unique constraint, so concurrent requests may each create a row.
pub async fn find_or_create_author(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM Author WHERE name = ? ORDER BY id LIMIT 1")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let result = sqlx::query("INSERT INTO Author (name) VALUES (?)")
        .bind(name)
        .execute(&mut *conn)
        .await?;

    tracing::debug!(author = name, "created author");
    Ok(result.last_insert_rowid())
}

/// List all authors ordered by name
pub async fn list_authors(pool: &SqlitePool) -> Result<Vec<Author>> {
    let authors = sqlx::query_as::<_, Author>("SELECT * FROM Author ORDER BY name COLLATE NOCASE, id")
        .fetch_all(pool)
        .await?;

    Ok(authors)
}

/// Link book to author
pub async fn add_book_author<'e, E>(executor: E, book_id: i64, author_id: i64) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("INSERT INTO BookAuthor (bookId, authorId) VALUES (?, ?)")
        .bind(book_id)
        .bind(author_id)
        .execute(executor)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Remove all author associations of a book
pub async fn remove_book_authors<'e, E>(executor: E, book_id: i64) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM BookAuthor WHERE bookId = ?")
        .bind(book_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Raw BookAuthor rows for a book, in insertion order
pub async fn find_book_authors(pool: &SqlitePool, book_id: i64) -> Result<Vec<BookAuthor>> {
    let rows = sqlx::query_as::<_, BookAuthor>("SELECT * FROM BookAuthor WHERE bookId = ? ORDER BY id")
        .bind(book_id)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Author associations for a book with names resolved
pub async fn find_author_links_by_book(pool: &SqlitePool, book_id: i64) -> Result<Vec<AuthorLink>> {
    let links = sqlx::query_as::<_, AuthorLink>(
        r#"
        SELECT ba.id, ba.authorId, a.name
        FROM BookAuthor ba
        INNER JOIN Author a ON a.id = ba.authorId
        WHERE ba.bookId = ?
        ORDER BY ba.id
        "#,
    )
    .bind(book_id)
    .fetch_all(pool)
    .await?;

    Ok(links)
}

/// Every author association in the library as `(book_id, link)` pairs
pub async fn list_author_links(pool: &SqlitePool) -> Result<Vec<(i64, AuthorLink)>> {
    let rows = sqlx::query_as::<_, (i64, i64, i64, String)>(
        r#"
        SELECT ba.bookId, ba.id, ba.authorId, a.name
        FROM BookAuthor ba
        INNER JOIN Author a ON a.id = ba.authorId
        ORDER BY ba.bookId, ba.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(book_id, id, author_id, name)| (book_id, AuthorLink { id, author_id, name }))
        .collect())
}

// ============================================================================
// GENRE QUERIES
// ============================================================================

/// Insert or find genre by exact name
///
/// Genre names are UNIQUE, so the insert falls back to the existing row if a
/// concurrent request created it between the lookup and the insert.
pub async fn find_or_create_genre(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM Genre WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO Genre (name) VALUES (?) ON CONFLICT(name) DO UPDATE SET name = excluded.name RETURNING id",
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    tracing::debug!(genre = name, "created genre");
    Ok(id)
}

/// Insert a genre, failing on a duplicate name
pub async fn insert_genre<'e, E>(executor: E, name: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("INSERT INTO Genre (name) VALUES (?)")
        .bind(name)
        .execute(executor)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Find genre by ID
pub async fn find_genre_by_id(pool: &SqlitePool, genre_id: i64) -> Result<Option<Genre>> {
    let genre = sqlx::query_as::<_, Genre>("SELECT * FROM Genre WHERE id = ?")
        .bind(genre_id)
        .fetch_optional(pool)
        .await?;

    Ok(genre)
}

/// List genres with the number of distinct books tagged with each
pub async fn list_genre_usage(pool: &SqlitePool) -> Result<Vec<GenreUsage>> {
    let genres = sqlx::query_as::<_, GenreUsage>(
        r#"
        SELECT g.id, g.name, COUNT(DISTINCT bg.bookId) AS bookCount
        FROM Genre g
        LEFT JOIN BookGenre bg ON bg.genreId = g.id
        GROUP BY g.id, g.name
        ORDER BY g.name COLLATE NOCASE
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(genres)
}

/// Rename a genre
pub async fn rename_genre<'e, E>(executor: E, genre_id: i64, name: &str) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE Genre SET name = ? WHERE id = ?")
        .bind(name)
        .bind(genre_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Delete a genre row
pub async fn delete_genre<'e, E>(executor: E, genre_id: i64) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM Genre WHERE id = ?")
        .bind(genre_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Count BookGenre rows that reference a genre
pub async fn count_genre_links<'e, E>(executor: E, genre_id: i64) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM BookGenre WHERE genreId = ?")
        .bind(genre_id)
        .fetch_one(executor)
        .await?;

    Ok(count)
}

/// Link book to genre
pub async fn add_book_genre<'e, E>(executor: E, book_id: i64, genre_id: i64) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("INSERT INTO BookGenre (bookId, genreId) VALUES (?, ?)")
        .bind(book_id)
        .bind(genre_id)
        .execute(executor)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Remove all genre associations of a book
pub async fn remove_book_genres<'e, E>(executor: E, book_id: i64) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM BookGenre WHERE bookId = ?")
        .bind(book_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Raw BookGenre rows for a book, in insertion order
pub async fn find_book_genres(pool: &SqlitePool, book_id: i64) -> Result<Vec<BookGenre>> {
    let rows = sqlx::query_as::<_, BookGenre>("SELECT * FROM BookGenre WHERE bookId = ? ORDER BY id")
        .bind(book_id)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Genre associations for a book with names resolved
pub async fn find_genre_links_by_book(pool: &SqlitePool, book_id: i64) -> Result<Vec<GenreLink>> {
    let links = sqlx::query_as::<_, GenreLink>(
        r#"
        SELECT bg.id, bg.genreId, g.name
        FROM BookGenre bg
        INNER JOIN Genre g ON g.id = bg.genreId
        WHERE bg.bookId = ?
        ORDER BY bg.id
        "#,
    )
    .bind(book_id)
    .fetch_all(pool)
    .await?;

    Ok(links)
}

/// Every genre association in the library as `(book_id, link)` pairs
pub async fn list_genre_links(pool: &SqlitePool) -> Result<Vec<(i64, GenreLink)>> {
    let rows = sqlx::query_as::<_, (i64, i64, i64, String)>(
        r#"
        SELECT bg.bookId, bg.id, bg.genreId, g.name
        FROM BookGenre bg
        INNER JOIN Genre g ON g.id = bg.genreId
        ORDER BY bg.bookId, bg.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(book_id, id, genre_id, name)| (book_id, GenreLink { id, genre_id, name }))
        .collect())
}

// ============================================================================
// READING SESSION QUERIES
// ============================================================================

/// Insert a reading session
pub async fn insert_reading_session<'e, E>(executor: E, session: &NewReadingSession) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO ReadingSession (bookId, startTime, duration, pageStart, pageEnd, finishedBook)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session.book_id)
    .bind(session.start_time)
    .bind(session.duration)
    .bind(session.page_start)
    .bind(session.page_end)
    .bind(session.finished_book)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Find reading session by ID
pub async fn find_reading_session(pool: &SqlitePool, session_id: i64) -> Result<Option<ReadingSession>> {
    let session = sqlx::query_as::<_, ReadingSession>("SELECT * FROM ReadingSession WHERE id = ?")
        .bind(session_id)
        .fetch_optional(pool)
        .await?;

    Ok(session)
}

/// Overwrite every column of a reading session
pub async fn update_reading_session<'e, E>(
    executor: E,
    session_id: i64,
    session: &NewReadingSession,
) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE ReadingSession SET
            bookId = ?, startTime = ?, duration = ?,
            pageStart = ?, pageEnd = ?, finishedBook = ?
        WHERE id = ?
        "#,
    )
    .bind(session.book_id)
    .bind(session.start_time)
    .bind(session.duration)
    .bind(session.page_start)
    .bind(session.page_end)
    .bind(session.finished_book)
    .bind(session_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Delete a reading session
pub async fn delete_reading_session<'e, E>(executor: E, session_id: i64) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM ReadingSession WHERE id = ?")
        .bind(session_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Sessions of one book, most recent first
pub async fn list_sessions_by_book(pool: &SqlitePool, book_id: i64) -> Result<Vec<ReadingSession>> {
    let sessions = sqlx::query_as::<_, ReadingSession>(
        "SELECT * FROM ReadingSession WHERE bookId = ? ORDER BY startTime DESC, id DESC",
    )
    .bind(book_id)
    .fetch_all(pool)
    .await?;

    Ok(sessions)
}

/// Every session with its book title, grouped by book and furthest page first
pub async fn list_sessions_with_books(pool: &SqlitePool) -> Result<Vec<ReadingSessionWithBook>> {
    let sessions = sqlx::query_as::<_, ReadingSessionWithBook>(
        r#"
        SELECT rs.*, b.title AS bookTitle
        FROM ReadingSession rs
        INNER JOIN Book b ON b.id = rs.bookId
        ORDER BY rs.bookId ASC, rs.pageEnd DESC, rs.id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::Database;
    use chrono::NaiveDate;

    fn new_session(book_id: i64, page_start: i64, page_end: i64) -> NewReadingSession {
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
    async fn test_insert_and_find_book() {
        let db = Database::new_in_memory().await.expect("Failed to create database");

        let mut new_book = NewBook::new("Test Book".to_string());
        new_book.page_count = Some(320);

        let book_id = insert_book(db.pool(), &new_book).await.expect("Failed to insert book");
        assert!(book_id > 0);

        let book = find_book_by_id(db.pool(), book_id)
            .await
            .expect("Failed to find book")
            .expect("Book should exist");

        assert_eq!(book.title, "Test Book");
        assert_eq!(book.page_count, Some(320));
        assert_eq!(book.isbn, None);
    }

    #[tokio::test]
    async fn test_update_missing_book_affects_nothing() {
        let db = Database::new_in_memory().await.expect("Failed to create database");

        let changed = update_book(db.pool(), 42, &NewBook::new("Ghost".to_string()))
            .await
            .expect("Failed to run update");
        assert_eq!(changed, 0);
    }

    #[tokio::test]
    async fn test_author_find_or_create() {
        let db = Database::new_in_memory().await.expect("Failed to create database");
        let mut conn = db.pool().acquire().await.expect("Failed to acquire connection");

        let first = find_or_create_author(&mut conn, "Ursula K. Le Guin")
            .await
            .expect("Failed to create author");
        let second = find_or_create_author(&mut conn, "Ursula K. Le Guin")
            .await
            .expect("Failed to find author");
        let other = find_or_create_author(&mut conn, "ursula k. le guin")
            .await
            .expect("Failed to create author");

        assert_eq!(first, second);
        assert_ne!(first, other, "Name matching is exact");
    }

    #[tokio::test]
    async fn test_genre_find_or_create() {
        let db = Database::new_in_memory().await.expect("Failed to create database");
        let mut conn = db.pool().acquire().await.expect("Failed to acquire connection");

        let first = find_or_create_genre(&mut conn, "Fantasy").await.expect("Failed to create genre");
        let second = find_or_create_genre(&mut conn, "Fantasy").await.expect("Failed to find genre");
        drop(conn);

        assert_eq!(first, second);
        let usage = list_genre_usage(db.pool()).await.expect("Failed to list genres");
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].book_count, 0);
    }

    #[tokio::test]
    async fn test_session_ordering() {
        let db = Database::new_in_memory().await.expect("Failed to create database");
        let book_id = insert_book(db.pool(), &NewBook::new("Dune".to_string()))
            .await
            .expect("Failed to insert book");

        let mut early = new_session(book_id, 1, 20);
        early.start_time = NaiveDate::from_ymd_opt(2023, 12, 30).unwrap();
        insert_reading_session(db.pool(), &early).await.expect("Failed to insert session");
        insert_reading_session(db.pool(), &new_session(book_id, 20, 45))
            .await
            .expect("Failed to insert session");

        let sessions = list_sessions_by_book(db.pool(), book_id).await.expect("Failed to list sessions");
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].page_end, Some(45), "Most recent session comes first");

        let all = list_sessions_with_books(db.pool()).await.expect("Failed to list sessions");
        assert_eq!(all[0].book_title, "Dune");
        assert_eq!(all[0].session.page_end, Some(45));
    }

    #[tokio::test]
    async fn test_delete_book_cascades() {
        let db = Database::new_in_memory().await.expect("Failed to create database");
        let book_id = insert_book(db.pool(), &NewBook::new("Temporary".to_string()))
            .await
            .expect("Failed to insert book");
        insert_reading_session(db.pool(), &new_session(book_id, 1, 10))
            .await
            .expect("Failed to insert session");

        let mut conn = db.pool().acquire().await.expect("Failed to acquire connection");
        let genre_id = find_or_create_genre(&mut conn, "Essays").await.expect("Failed to create genre");
        add_book_genre(&mut *conn, book_id, genre_id).await.expect("Failed to link genre");
        drop(conn);

        assert_eq!(delete_book(db.pool(), book_id).await.expect("Failed to delete"), 1);
        assert!(list_sessions_by_book(db.pool(), book_id).await.expect("Failed to list").is_empty());
        assert_eq!(count_genre_links(db.pool(), genre_id).await.expect("Failed to count"), 0);
        assert!(find_genre_by_id(db.pool(), genre_id).await.expect("Failed to find").is_some());
    }
}
