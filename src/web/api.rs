//! JSON API
//!
//! Mirrors the HTML routes for scripting. Bodies and responses use the same
//! camelCase field names as the database columns.
//!
//! ## Endpoints
//!
//! - `GET|POST /api/books`, `GET|PUT|DELETE /api/books/{id}`
//! - `GET|POST /api/genres`, `GET|PUT|DELETE /api/genres/{id}`
//! - `GET /api/authors`
//! - `GET|POST /api/reading-sessions`, `GET|PUT|DELETE /api/reading-sessions/{id}`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};

use crate::library::validation::{genre_name, BookPayload, GenrePayload, SessionPayload};
use crate::library::BookDetail;
use crate::storage::models::{Author, BookWithRelations, Genre, GenreUsage, ReadingSession, ReadingSessionWithBook};
use crate::web::error::ApiError;
use crate::web::pages::parse_id;
use crate::web::AppState;

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Routes relative to `/api`
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route("/books/{id}", get(get_book).put(update_book).delete(delete_book))
        .route("/genres", get(list_genres).post(create_genre))
        .route("/genres/{id}", get(get_genre).put(update_genre).delete(delete_genre))
        .route("/authors", get(list_authors))
        .route("/reading-sessions", get(list_sessions).post(create_session))
        .route(
            "/reading-sessions/{id}",
            get(get_session).put(update_session).delete(delete_session),
        )
}

// ============================================================================
// BOOKS
// ============================================================================

async fn list_books(State(state): State<AppState>) -> ApiResult<Json<Vec<BookWithRelations>>> {
    Ok(Json(state.library.list_books().await?))
}

async fn create_book(
    State(state): State<AppState>,
    Json(payload): Json<BookPayload>,
) -> ApiResult<(StatusCode, Json<BookWithRelations>)> {
    let input = payload.into_input()?;
    let book_id = state.library.create_book(&input).await?;
    let book = state.library.get_book_with_relations(book_id).await?;

    Ok((StatusCode::CREATED, Json(book)))
}

/// Book with sessions and statistics
async fn get_book(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<BookDetail>> {
    let book_id = parse_id("Book", &id)?;
    Ok(Json(state.library.book_detail(book_id).await?))
}

async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<BookPayload>,
) -> ApiResult<Json<BookWithRelations>> {
    let book_id = parse_id("Book", &id)?;
    let input = payload.into_input()?;
    state.library.update_book(book_id, &input).await?;

    Ok(Json(state.library.get_book_with_relations(book_id).await?))
}

async fn delete_book(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let book_id = parse_id("Book", &id)?;
    state.library.delete_book(book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_authors(State(state): State<AppState>) -> ApiResult<Json<Vec<Author>>> {
    Ok(Json(state.library.list_authors().await?))
}

// ============================================================================
// GENRES
// ============================================================================

async fn list_genres(State(state): State<AppState>) -> ApiResult<Json<Vec<GenreUsage>>> {
    Ok(Json(state.library.list_genres().await?))
}

async fn create_genre(
    State(state): State<AppState>,
    Json(payload): Json<GenrePayload>,
) -> ApiResult<(StatusCode, Json<Genre>)> {
    let name = genre_name(payload.name.as_deref())?;
    let genre = state.library.create_genre(&name).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

async fn get_genre(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Genre>> {
    let genre_id = parse_id("Genre", &id)?;
    Ok(Json(state.library.get_genre(genre_id).await?))
}

async fn update_genre(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<GenrePayload>,
) -> ApiResult<Json<Genre>> {
    let genre_id = parse_id("Genre", &id)?;
    let name = genre_name(payload.name.as_deref())?;
    Ok(Json(state.library.rename_genre(genre_id, &name).await?))
}

async fn delete_genre(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let genre_id = parse_id("Genre", &id)?;
    state.library.delete_genre(genre_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// READING SESSIONS
// ============================================================================

async fn list_sessions(State(state): State<AppState>) -> ApiResult<Json<Vec<ReadingSessionWithBook>>> {
    Ok(Json(state.library.list_all_sessions().await?))
}

async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<SessionPayload>,
) -> ApiResult<(StatusCode, Json<ReadingSession>)> {
    let session = payload.into_session(None)?;
    let session_id = state.library.add_reading_session(&session).await?;
    let created = state.library.get_reading_session(session_id).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<ReadingSession>> {
    let session_id = parse_id("Reading session", &id)?;
    Ok(Json(state.library.get_reading_session(session_id).await?))
}

async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SessionPayload>,
) -> ApiResult<Json<ReadingSession>> {
    let session_id = parse_id("Reading session", &id)?;
    let existing = state.library.get_reading_session(session_id).await?;

    let session = payload.into_session(Some(existing.book_id))?;
    state.library.update_reading_session(session_id, &session).await?;

    Ok(Json(state.library.get_reading_session(session_id).await?))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let session_id = parse_id("Reading session", &id)?;
    state.library.delete_reading_session(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
