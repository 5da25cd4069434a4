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

//! Reading library domain logic
//!
//! - `validation`: coercion of form and JSON submissions into checked values
//! - `stats`: progress arithmetic over a book's sessions
//! - `service`: the [`Library`] operations used by both web surfaces

pub mod service;
pub mod stats;
pub mod validation;

pub use service::{BookDetail, Library};
pub use stats::{format_duration, next_page_start, ReadingStats};
pub use validation::{BookForm, BookInput, BookPayload, GenreForm, GenrePayload, SessionForm, SessionPayload};
