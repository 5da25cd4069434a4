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

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pagemark::config::{Config, DEFAULT_LOG_FILTER};
use pagemark::{web, Database, Library};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pagemark")]
#[command(about = "Pagemark - personal reading tracker", long_about = None)]
struct Cli {
    /// SQLite database file (defaults to the platform data directory)
    #[arg(short, long, global = true, env = "PAGEMARK_DATABASE")]
    database: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "pagemark=debug,tower_http=info"
    #[arg(long, global = true, env = "PAGEMARK_LOG", default_value = DEFAULT_LOG_FILTER)]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "PAGEMARK_BIND", default_value = "127.0.0.1:3000")]
        bind: String,
    },
    /// Create or upgrade the database schema and exit
    Migrate,
    /// Run integrity and foreign key checks on the database
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config {
        log_filter: cli.log.clone(),
        ..Config::default()
    };
    if let Some(path) = cli.database.clone() {
        config.database_path = path;
    }
    if let Commands::Serve { bind } = &cli.command {
        config.bind_address = Config::parse_bind_address(bind)?;
    }
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();

    let db = Database::new(&config.database_path)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;

    match cli.command {
        Commands::Serve { .. } => serve(&config, db).await?,
        Commands::Migrate => {
            tracing::info!(path = %config.database_path.display(), "database is up to date");
        }
        Commands::Check => {
            let integrity_ok = db.check_integrity().await?;
            let violations = db.foreign_key_violations().await?;
            println!("Integrity check: {}", if integrity_ok { "ok" } else { "FAILED" });
            println!("Foreign key violations: {}", violations);
            if !integrity_ok || violations > 0 {
                anyhow::bail!("database check failed");
            }
        }
    }

    Ok(())
}

async fn serve(config: &Config, db: Database) -> anyhow::Result<()> {
    let app = web::router(Library::new(db));

    let listener = TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    tracing::info!(address = %config.bind_address, "Pagemark listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(web::shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
