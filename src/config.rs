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

//! Server configuration
//!
//! Values come from command-line flags or their `PAGEMARK_*` environment
//! fallbacks (see `src/bin/server.rs`); anything unset uses [`Config::default`].

use std::net::SocketAddr;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use crate::error::{Result, TrackerError};
use crate::storage::Database;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Runtime configuration for the web server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite database file
    pub database_path: PathBuf,
    pub bind_address: SocketAddr,
    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: Database::get_default_path(),
            bind_address: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Parse a bind address such as `0.0.0.0:8080`
    pub fn parse_bind_address(raw: &str) -> Result<SocketAddr> {
        raw.trim().parse().map_err(|_| {
            TrackerError::InvalidConfiguration(format!("'{}' is not a valid socket address", raw))
        })
    }

    /// Check values that parse but cannot work
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(TrackerError::InvalidConfiguration(
                "Database path must not be empty".to_string(),
            ));
        }

        if self.database_path.is_dir() {
            return Err(TrackerError::InvalidConfiguration(format!(
                "Database path {} is a directory",
                self.database_path.display()
            )));
        }

        EnvFilter::try_new(&self.log_filter).map_err(|e| {
            TrackerError::InvalidConfiguration(format!("Invalid log filter '{}': {}", self.log_filter, e))
        })?;

        Ok(())
    }
}
