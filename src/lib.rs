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

//! Pagemark: a personal reading tracker
//!
//! Books, their authors and genres, and the reading sessions logged against
//! them are stored in SQLite. A server-rendered web UI and a JSON API expose
//! the same operations.
//!
//! # Layout
//! - `storage`: schema, row models and one-statement queries
//! - `library`: validation, progress statistics and the [`Library`] service
//! - `web`: axum router, HTML pages and the `/api` endpoints
//! - `config`: server settings

pub mod config;
pub mod error;
pub mod library;
pub mod storage;
pub mod web;

pub use config::Config;
pub use error::{FieldErrors, Result, TrackerError};
pub use library::{Library, ReadingStats};
pub use storage::Database;
