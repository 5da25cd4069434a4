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

//! Submission shapes and coercion
//!
//! Forms arrive as raw strings (`Form<BookForm>`), JSON as typed payloads
//! (`Json<BookPayload>`). Both are coerced into the same validated values:
//! [`BookInput`], [`NewReadingSession`] and a genre name. Every violation is
//! recorded under its field path in [`FieldErrors`]; nothing is written
//! unless the map is empty.
//!
//! # Coercion Rules
//! - Strings are trimmed; an empty optional string means absent
//! - Numeric strings become integers, anything else is a field error
//! - Genre and author lists are comma-separated in forms; blanks are dropped
//! - A checkbox is on when present and not one of `false`, `off`, `0` or empty

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, Result, TrackerError};
use crate::storage::models::{BookWithRelations, NewBook, NewReadingSession, ReadingSession};

pub const TITLE_REQUIRED: &str = "Title is required";
pub const PAGE_COUNT_INVALID: &str = "Page count must be a positive number";
pub const ISBN_INVALID: &str = "ISBN must be 10 or 13 digits";
pub const AUTHOR_EMPTY: &str = "Author name cannot be empty";
pub const GENRE_EMPTY: &str = "Genre name cannot be empty";
pub const START_TIME_INVALID: &str = "Start time must be a date";
pub const DURATION_INVALID: &str = "Duration must be a positive number";
pub const PAGE_START_INVALID: &str = "Start page must be a positive number";
pub const PAGE_END_INVALID: &str = "End page must be a positive number";
pub const BOOK_REQUIRED: &str = "Book is required";
pub const GENRE_NAME_REQUIRED: &str = "Genre name is required";
pub const GENRE_NAME_TAKEN: &str = "A genre with this name already exists";

// ============================================================================
// BOOKS
// ============================================================================

/// Validated book submission
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BookInput {
    pub title: String,
    pub isbn: Option<String>,
    pub page_count: Option<i64>,
    pub genres: Vec<String>,
    pub authors: Vec<String>,
}

impl BookInput {
    pub fn new<S: Into<String>>(title: S, page_count: i64) -> Self {
        Self {
            title: title.into(),
            page_count: Some(page_count),
            ..Self::default()
        }
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    /// Check the shape of an already-coerced submission
    pub fn validate(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        self.check(&mut errors);
        errors.into_result()
    }

    fn check(&self, errors: &mut FieldErrors) {
        if self.title.trim().is_empty() {
            errors.add("title", TITLE_REQUIRED);
        }

        if !matches!(self.page_count, Some(count) if count > 0) {
            errors.add("pageCount", PAGE_COUNT_INVALID);
        }

        if let Some(isbn) = &self.isbn {
            if normalize_isbn(isbn).is_none() {
                errors.add("isbn", ISBN_INVALID);
            }
        }

        for (index, name) in self.authors.iter().enumerate() {
            if name.trim().is_empty() {
                errors.add(format!("authors.{}", index), AUTHOR_EMPTY);
            }
        }

        for (index, name) in self.genres.iter().enumerate() {
            if name.trim().is_empty() {
                errors.add(format!("genres.{}", index), GENRE_EMPTY);
            }
        }
    }

    /// Row values for the Book table, trimmed and with the ISBN normalised
    pub fn to_new_book(&self) -> NewBook {
        NewBook {
            title: self.title.trim().to_string(),
            isbn: self.isbn.as_deref().and_then(normalize_isbn),
            page_count: self.page_count,
        }
    }

    pub fn genre_names(&self) -> impl Iterator<Item = &str> {
        self.genres.iter().map(|name| name.trim())
    }

    pub fn author_names(&self) -> impl Iterator<Item = &str> {
        self.authors.iter().map(|name| name.trim())
    }
}

/// Book add/edit form as submitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookForm {
    pub title: Option<String>,
    pub page_count: Option<String>,
    pub isbn: Option<String>,
    /// Comma-separated
    pub genres: Option<String>,
    /// Comma-separated
    pub authors: Option<String>,
    pub intent: Option<String>,
}

impl BookForm {
    /// Prefill the edit form from a stored book
    pub fn from_book(book: &BookWithRelations) -> Self {
        Self {
            title: Some(book.book.title.clone()),
            page_count: book.book.page_count.map(|count| count.to_string()),
            isbn: book.book.isbn.clone(),
            genres: Some(book.genre_names().join(", ")),
            authors: Some(book.author_names().join(", ")),
            intent: None,
        }
    }

    pub fn into_input(&self) -> Result<BookInput> {
        let mut errors = FieldErrors::new();

        let page_count = parse_positive(&mut errors, "pageCount", self.page_count.as_deref(), PAGE_COUNT_INVALID);

        let input = BookInput {
            title: self.title.clone().unwrap_or_default(),
            isbn: non_empty(self.isbn.as_deref()).map(str::to_string),
            page_count,
            genres: split_names(self.genres.as_deref().unwrap_or_default()),
            authors: split_names(self.authors.as_deref().unwrap_or_default()),
        };

        input.check(&mut errors);
        errors.into_result()?;
        Ok(input)
    }
}

/// Book body of `POST /api/books` and `PUT /api/books/{id}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub page_count: Option<i64>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
}

impl BookPayload {
    /// Blank genres are dropped; a blank author is reported at its index
    pub fn into_input(self) -> Result<BookInput> {
        let input = BookInput {
            title: self.title.unwrap_or_default(),
            isbn: non_empty(self.isbn.as_deref()).map(str::to_string),
            page_count: self.page_count,
            genres: self
                .genres
                .into_iter()
                .filter(|name| !name.trim().is_empty())
                .collect(),
            authors: self.authors,
        };

        input.validate()?;
        Ok(input)
    }
}

/// Split a comma-separated list, trimming entries and dropping blanks
pub fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn isbn_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?:[0-9]{9}[0-9X]|[0-9]{13})$").expect("ISBN pattern is valid"))
}

/// Strip hyphens and spaces; `None` unless the rest is an ISBN-10 or ISBN-13
pub fn normalize_isbn(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    isbn_pattern().is_match(&compact).then_some(compact)
}

// ============================================================================
// READING SESSIONS
// ============================================================================

/// Reading session form as submitted (add on the book page, or edit)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionForm {
    pub start_time: Option<String>,
    pub duration: Option<String>,
    pub page_start: Option<String>,
    pub page_end: Option<String>,
    pub finished_book: Option<String>,
    pub intent: Option<String>,
}

impl SessionForm {
    /// Blank add-session form starting at the next unread page
    pub fn prefilled(next_page_start: i64, today: NaiveDate) -> Self {
        Self {
            start_time: Some(today.format("%Y-%m-%d").to_string()),
            page_start: Some(next_page_start.to_string()),
            ..Self::default()
        }
    }

    /// Prefill the edit form from a stored session
    pub fn from_session(session: &ReadingSession) -> Self {
        Self {
            start_time: Some(session.start_time.format("%Y-%m-%d").to_string()),
            duration: Some(session.duration.to_string()),
            page_start: session.page_start.map(|page| page.to_string()),
            page_end: session.page_end.map(|page| page.to_string()),
            finished_book: session.finished_book.then(|| "on".to_string()),
            intent: None,
        }
    }

    pub fn is_finished_checked(&self) -> bool {
        parse_checkbox(self.finished_book.as_deref())
    }

    pub fn into_session(&self, book_id: i64) -> Result<NewReadingSession> {
        let mut errors = FieldErrors::new();

        let start_time = match non_empty(self.start_time.as_deref()).and_then(parse_date) {
            Some(date) => Some(date),
            None => {
                errors.add("startTime", START_TIME_INVALID);
                None
            }
        };
        let duration = parse_positive(&mut errors, "duration", self.duration.as_deref(), DURATION_INVALID);
        if duration.is_none() {
            errors.add("duration", DURATION_INVALID);
        }
        let page_start = parse_positive(&mut errors, "pageStart", self.page_start.as_deref(), PAGE_START_INVALID);
        let page_end = parse_positive(&mut errors, "pageEnd", self.page_end.as_deref(), PAGE_END_INVALID);

        match (start_time, duration) {
            (Some(start_time), Some(duration)) if errors.is_empty() => Ok(NewReadingSession {
                book_id,
                start_time,
                duration,
                page_start,
                page_end,
                finished_book: self.is_finished_checked(),
            }),
            _ => Err(TrackerError::Validation(errors)),
        }
    }
}

/// Session body of `POST /api/reading-sessions` and `PUT /api/reading-sessions/{id}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    #[serde(default)]
    pub book_id: Option<i64>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub page_start: Option<i64>,
    #[serde(default)]
    pub page_end: Option<i64>,
    #[serde(default)]
    pub finished_book: bool,
}

impl SessionPayload {
    /// `current_book` is used when the body does not name a book (updates)
    pub fn into_session(self, current_book: Option<i64>) -> Result<NewReadingSession> {
        let mut errors = FieldErrors::new();

        let book_id = self.book_id.or(current_book);
        if book_id.is_none() {
            errors.add("bookId", BOOK_REQUIRED);
        }
        let start_time = non_empty(self.start_time.as_deref()).and_then(parse_date);
        if start_time.is_none() {
            errors.add("startTime", START_TIME_INVALID);
        }
        if self.duration.is_none() {
            errors.add("duration", DURATION_INVALID);
        }

        match (book_id, start_time, self.duration) {
            (Some(book_id), Some(start_time), Some(duration)) if errors.is_empty() => {
                let session = NewReadingSession {
                    book_id,
                    start_time,
                    duration,
                    page_start: self.page_start,
                    page_end: self.page_end,
                    finished_book: self.finished_book,
                };
                validate_session(&session)?;
                Ok(session)
            }
            _ => Err(TrackerError::Validation(errors)),
        }
    }
}

/// Range checks on a coerced session
pub fn validate_session(session: &NewReadingSession) -> Result<()> {
    let mut errors = FieldErrors::new();

    if session.duration <= 0 {
        errors.add("duration", DURATION_INVALID);
    }
    if matches!(session.page_start, Some(page) if page <= 0) {
        errors.add("pageStart", PAGE_START_INVALID);
    }
    if matches!(session.page_end, Some(page) if page <= 0) {
        errors.add("pageEnd", PAGE_END_INVALID);
    }

    errors.into_result()
}

/// `YYYY-MM-DD`, or an RFC 3339 timestamp truncated to its date
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

pub fn parse_checkbox(raw: Option<&str>) -> bool {
    match raw.map(str::trim) {
        None => false,
        Some(value) => !matches!(value.to_ascii_lowercase().as_str(), "" | "false" | "off" | "0"),
    }
}

// ============================================================================
// GENRES
// ============================================================================

/// Genre create/rename form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreForm {
    pub name: Option<String>,
    pub intent: Option<String>,
}

/// Genre body of `POST /api/genres` and `PUT /api/genres/{id}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenrePayload {
    #[serde(default)]
    pub name: Option<String>,
}

/// Trimmed, non-empty genre name
pub fn genre_name(raw: Option<&str>) -> Result<String> {
    non_empty(raw)
        .map(str::to_string)
        .ok_or_else(|| TrackerError::field("name", GENRE_NAME_REQUIRED))
}

// ============================================================================
// HELPERS
// ============================================================================

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

/// Optional positive integer; records `message` under `field` when present but invalid
fn parse_positive(errors: &mut FieldErrors, field: &str, raw: Option<&str>, message: &str) -> Option<i64> {
    let value = non_empty(raw)?;
    match value.parse::<i64>() {
        Ok(number) if number > 0 => Some(number),
        _ => {
            errors.add(field, message);
            None
        }
    }
}
