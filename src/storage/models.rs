//! Database models for Pagemark
//!
//! Row structs map one-to-one onto the tables created in `migrations.rs`.
//! Column names are camelCase in SQL and in JSON; Rust fields are snake_case.
//!
//! # SQLite Adaptations
//! - Dates stored as TEXT in ISO 8601 format (`YYYY-MM-DD`)
//! - Booleans stored as INTEGER 0/1
//! - Many-to-many relationships use junction tables with their own id

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// MAIN ENTITIES
// ============================================================================

/// Book entity - a catalog entry
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[sqlx(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    #[sqlx(default)]
    pub isbn: Option<String>,
    #[sqlx(default)]
    pub page_count: Option<i64>,
}

/// Author - unique by name by convention only
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

/// Genre - unique by name
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Genre with the number of books tagged with it
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[sqlx(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct GenreUsage {
    pub id: i64,
    pub name: String,
    pub book_count: i64,
}

/// One logged reading interval
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[sqlx(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct ReadingSession {
    pub id: i64,
    pub book_id: i64,
    pub start_time: NaiveDate,
    /// Minutes
    pub duration: i64,
    #[sqlx(default)]
    pub page_start: Option<i64>,
    #[sqlx(default)]
    pub page_end: Option<i64>,
    pub finished_book: bool,
}

impl ReadingSession {
    /// Pages covered by this session, 0 if either bound is missing or the range is inverted
    pub fn pages_read(&self) -> i64 {
        match (self.page_start, self.page_end) {
            (Some(start), Some(end)) => (end - start).max(0),
            _ => 0,
        }
    }
}

/// Reading session joined to the title of its book
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSessionWithBook {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub session: ReadingSession,
    #[sqlx(rename = "bookTitle")]
    pub book_title: String,
}

// ============================================================================
// JUNCTION TABLES (Many-to-Many Relationships)
// ============================================================================

/// BookAuthor - junction table for Book <-> Author
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[sqlx(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct BookAuthor {
    pub id: i64,
    pub book_id: i64,
    pub author_id: i64,
}

/// BookGenre - junction table for Book <-> Genre
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[sqlx(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct BookGenre {
    pub id: i64,
    pub book_id: i64,
    pub genre_id: i64,
}

/// A book's author association with the author's name resolved
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[sqlx(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct AuthorLink {
    /// BookAuthor row id
    pub id: i64,
    pub author_id: i64,
    pub name: String,
}

/// A book's genre association with the genre's name resolved
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[sqlx(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct GenreLink {
    /// BookGenre row id
    pub id: i64,
    pub genre_id: i64,
    pub name: String,
}

/// Book with its author and genre associations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookWithRelations {
    #[serde(flatten)]
    pub book: Book,
    pub authors: Vec<AuthorLink>,
    pub genres: Vec<GenreLink>,
}

impl BookWithRelations {
    pub fn author_names(&self) -> Vec<&str> {
        self.authors.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn genre_names(&self) -> Vec<&str> {
        self.genres.iter().map(|g| g.name.as_str()).collect()
    }
}

// ============================================================================
// NEW RECORD STRUCTS (for inserts)
// ============================================================================

/// New book record for insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub isbn: Option<String>,
    pub page_count: Option<i64>,
}

impl NewBook {
    pub fn new(title: String) -> Self {
        Self {
            title,
            isbn: None,
            page_count: None,
        }
    }
}

/// New reading session record for insertion (also used for updates)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReadingSession {
    pub book_id: i64,
    pub start_time: NaiveDate,
    pub duration: i64,
    pub page_start: Option<i64>,
    pub page_end: Option<i64>,
    pub finished_book: bool,
}
