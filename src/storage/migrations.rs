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

//! Database migrations
//!
//! This module handles database schema creation and migrations.
//!
//! # Migration Strategy
//! Since sqlx's compile-time migration system requires a build-time database
//! connection, migrations are plain SQL executed at startup and recorded in
//! the `_migrations` table.

use crate::error::{Result, TrackerError};
use sqlx::{Executor, SqlitePool};

/// Run all database migrations
///
/// This function creates the database schema and applies any pending migrations.
/// Migrations are tracked in the `_migrations` table.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    create_migrations_table(pool).await?;

    run_migration(pool, 1, "initial_schema", create_initial_schema(pool)).await?;
    run_migration(pool, 2, "lookup_indexes", create_lookup_indexes(pool)).await?;

    Ok(())
}

/// Create migrations tracking table
async fn create_migrations_table(pool: &SqlitePool) -> Result<()> {
    pool.execute(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .await?;

    Ok(())
}

/// Run a single migration if it hasn't been applied yet
///
/// The migration future is only polled when the id is missing from `_migrations`.
async fn run_migration(
    pool: &SqlitePool,
    id: i32,
    name: &str,
    migration_fn: impl std::future::Future<Output = Result<()>>,
) -> Result<()> {
    let applied: Option<i32> = sqlx::query_scalar("SELECT id FROM _migrations WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    if applied.is_some() {
        return Ok(());
    }

    migration_fn
        .await
        .map_err(|e| TrackerError::MigrationFailed(format!("{} ({}): {}", name, id, e)))?;

    sqlx::query("INSERT INTO _migrations (id, name) VALUES (?, ?)")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await?;

    tracing::info!(id, name, "applied migration");
    Ok(())
}

/// Create initial database schema
///
/// Five tables plus the reading log. Column names follow the camelCase used by
/// the JSON API so rows serialize without renaming.
async fn create_initial_schema(pool: &SqlitePool) -> Result<()> {
    pool.execute(
        r#"
-- ============================================================================
-- MAIN ENTITIES
-- ============================================================================

CREATE TABLE IF NOT EXISTS Book (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    isbn TEXT,
    pageCount INTEGER CHECK (pageCount IS NULL OR pageCount > 0)
);

-- Author names are unique by convention only
CREATE TABLE IF NOT EXISTS Author (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS Genre (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- startTime is an ISO 8601 date (YYYY-MM-DD)
CREATE TABLE IF NOT EXISTS ReadingSession (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    bookId INTEGER NOT NULL,
    startTime TEXT NOT NULL,
    duration INTEGER NOT NULL CHECK (duration > 0),
    pageStart INTEGER CHECK (pageStart IS NULL OR pageStart > 0),
    pageEnd INTEGER CHECK (pageEnd IS NULL OR pageEnd > 0),
    finishedBook INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (bookId) REFERENCES Book(id) ON DELETE CASCADE
);

-- ============================================================================
-- JUNCTION TABLES (Many-to-Many Relationships)
-- ============================================================================

-- No uniqueness on the pair: a submission naming the same genre twice keeps both rows
CREATE TABLE IF NOT EXISTS BookGenre (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    bookId INTEGER NOT NULL,
    genreId INTEGER NOT NULL,
    FOREIGN KEY (bookId) REFERENCES Book(id) ON DELETE CASCADE,
    FOREIGN KEY (genreId) REFERENCES Genre(id)
);

CREATE TABLE IF NOT EXISTS BookAuthor (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    bookId INTEGER NOT NULL,
    authorId INTEGER NOT NULL,
    FOREIGN KEY (bookId) REFERENCES Book(id) ON DELETE CASCADE,
    FOREIGN KEY (authorId) REFERENCES Author(id)
);
        "#,
    )
    .await?;

    Ok(())
}

/// Indexes for the per-book lookups every page performs
async fn create_lookup_indexes(pool: &SqlitePool) -> Result<()> {
    pool.execute(
        r#"
CREATE INDEX IF NOT EXISTS idx_book_title ON Book(title);
CREATE INDEX IF NOT EXISTS idx_author_name ON Author(name);
CREATE INDEX IF NOT EXISTS idx_book_genre_book ON BookGenre(bookId);
CREATE INDEX IF NOT EXISTS idx_book_genre_genre ON BookGenre(genreId);
CREATE INDEX IF NOT EXISTS idx_book_author_book ON BookAuthor(bookId);
CREATE INDEX IF NOT EXISTS idx_book_author_author ON BookAuthor(authorId);
CREATE INDEX IF NOT EXISTS idx_reading_session_book ON ReadingSession(bookId, startTime);
        "#,
    )
    .await?;

    Ok(())
}
