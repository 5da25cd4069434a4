//! Web server
//!
//! Server-rendered HTML pages plus a JSON API under `/api`, both backed by
//! the same [`Library`]. Requests are traced and responses compressed with
//! tower middleware.

use std::future::Future;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::library::Library;
use crate::web::error::ApiError;

pub mod api;
pub mod error;
pub mod pages;
pub mod views;

/// State shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub library: Library,
}

/// Build the application router with middleware
pub fn router(library: Library) -> Router {
    let state = AppState { library };

    Router::new()
        .route("/", get(pages::index))
        .route("/health", get(health_check))
        .route("/books", get(pages::list_books))
        .route("/books/add", get(pages::new_book_form).post(pages::create_book))
        .route("/books/{id}", get(pages::show_book).post(pages::book_action))
        .route("/books/{id}/edit", get(pages::edit_book_form).post(pages::update_book))
        .route("/books/{id}/delete", post(pages::delete_book))
        .route("/books/{id}/reading-sessions", get(pages::book_sessions))
        .route("/reading-sessions", get(pages::list_sessions))
        .route(
            "/reading-sessions/{id}/edit",
            get(pages::edit_session_form).post(pages::update_session),
        )
        .route("/reading-sessions/{id}/delete", post(pages::delete_session))
        .route("/genres", get(pages::list_genres).post(pages::create_genre))
        .route("/genres/{id}/edit", post(pages::rename_genre))
        .route("/genres/{id}/delete", post(pages::delete_genre))
        .nest("/api", api::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub books: i64,
}

/// Health check handler; fails with 500 when the database is unreachable
async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let books = state.library.count_books().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        books,
    }))
}

/// Resolves on Ctrl-C; used for graceful shutdown
pub async fn shutdown_signal() {
    wait_for_signal(tokio::signal::ctrl_c()).await
}

/// A listener that fails never resolves, so the server keeps running
async fn wait_for_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
