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

//! Reading progress statistics
//!
//! Pure arithmetic over the sessions of one book: pages read, time spent,
//! completion percentage, pace and an estimate of the time left.
//!
//! # Rules
//! - A session contributes `max(0, pageEnd - pageStart)` pages, or 0 if either bound is missing
//! - Every ratio is 0 when its denominator is 0
//! - Time left is unknown (not 0) until some progress has been made

use serde::Serialize;

use crate::storage::models::ReadingSession;

/// First page of the next session
///
/// 1 for a book without sessions; otherwise one past the furthest recorded end
/// page. Sessions without an end page are ignored.
pub fn next_page_start(sessions: &[ReadingSession]) -> i64 {
    sessions
        .iter()
        .filter_map(|s| s.page_end)
        .max()
        .map_or(1, |max_end| max_end.max(0) + 1)
}

/// Sum of pages read over all sessions
pub fn total_pages_read(sessions: &[ReadingSession]) -> i64 {
    sessions.iter().map(ReadingSession::pages_read).sum()
}

/// Sum of session durations in minutes
pub fn total_duration(sessions: &[ReadingSession]) -> i64 {
    sessions.iter().map(|s| s.duration).sum()
}

/// Aggregated progress for one book
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingStats {
    pub session_count: usize,
    pub total_pages_read: i64,
    /// Minutes
    pub total_duration: i64,
    pub percentage_read: f64,
    pub average_pages_per_session: f64,
    /// Minutes
    pub average_duration_per_session: f64,
    pub average_minutes_per_page: f64,
    pub pages_per_hour: f64,
    /// None when the book has no page count
    pub pages_left: Option<i64>,
    /// None when no page count is known or no pages have been read yet
    pub estimated_minutes_to_finish: Option<f64>,
    pub next_page_start: i64,
    /// Some session was marked as finishing the book
    pub finished: bool,
}

impl ReadingStats {
    /// Compute statistics for a book with the given page count
    pub fn compute(page_count: Option<i64>, sessions: &[ReadingSession]) -> Self {
        let session_count = sessions.len();
        let total_pages_read = total_pages_read(sessions);
        let total_duration = total_duration(sessions);
        let page_count = page_count.filter(|&count| count > 0);

        let percentage_read = page_count
            .map(|count| total_pages_read as f64 * 100.0 / count as f64)
            .unwrap_or(0.0);

        let average_pages_per_session = ratio(total_pages_read as f64, session_count as f64);
        let average_duration_per_session = ratio(total_duration as f64, session_count as f64);
        let average_minutes_per_page = ratio(total_duration as f64, total_pages_read as f64);
        let pages_per_hour = ratio(total_pages_read as f64 * 60.0, total_duration as f64);

        // pages_left / (pages / minutes), rearranged to keep whole-number inputs exact
        let pages_left = page_count.map(|count| (count - total_pages_read).max(0));
        let estimated_minutes_to_finish = match pages_left {
            Some(left) if total_pages_read > 0 && total_duration > 0 => {
                Some(left as f64 * total_duration as f64 / total_pages_read as f64)
            }
            _ => None,
        };

        Self {
            session_count,
            total_pages_read,
            total_duration,
            percentage_read,
            average_pages_per_session,
            average_duration_per_session,
            average_minutes_per_page,
            pages_per_hour,
            pages_left,
            estimated_minutes_to_finish,
            next_page_start: next_page_start(sessions),
            finished: sessions.iter().any(|s| s.finished_book),
        }
    }

    /// Human-readable time left, e.g. "3h 20m"
    pub fn time_to_finish_string(&self) -> String {
        if self.finished || self.pages_left == Some(0) {
            return "Finished".to_string();
        }
        match self.estimated_minutes_to_finish {
            Some(minutes) => format_duration(minutes.round() as i64),
            None => "Not enough data yet".to_string(),
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Format minutes as "{hours}h {minutes}m"
pub fn format_duration(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}
