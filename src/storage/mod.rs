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

//! Database storage and models
//!
//! SQLite access through sqlx: connection setup and pragmas in `database`,
//! schema in `migrations`, row structs in `models` and single-statement
//! queries in `queries`.
//!
//! # Usage Example
//! ```no_run
//! use pagemark::storage::{models::NewBook, queries, Database};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new("./pagemark.db").await?;
//!
//! let mut book = NewBook::new("The Hobbit".to_string());
//! book.page_count = Some(310);
//! let book_id = queries::insert_book(db.pool(), &book).await?;
//!
//! let book = queries::find_book_by_id(db.pool(), book_id).await?;
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use models::{
    Author, AuthorLink, Book, BookAuthor, BookGenre, BookWithRelations, Genre, GenreLink,
    GenreUsage, NewBook, NewReadingSession, ReadingSession, ReadingSessionWithBook,
};
