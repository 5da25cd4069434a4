//! HTML route handlers
//!
//! Successful form posts redirect (303) to the page showing the result.
//! Validation failures re-render the submitted form with status 422.
//!
//! ## Routes
//!
//! - `GET /books`, `GET|POST /books/add`
//! - `GET /books/{id}`, `POST /books/{id}` (`intent=add-reading-session`)
//! - `GET|POST /books/{id}/edit`, `POST /books/{id}/delete`
//! - `GET /books/{id}/reading-sessions`
//! - `GET /reading-sessions`, `GET|POST /reading-sessions/{id}/edit`,
//!   `POST /reading-sessions/{id}/delete`
//! - `GET|POST /genres`, `POST /genres/{id}/edit`, `POST /genres/{id}/delete`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};

use crate::error::{FieldErrors, Result, TrackerError};
use crate::library::validation::{genre_name, BookForm, GenreForm, SessionForm};
use crate::web::error::{status_code, PageError};
use crate::web::{views, AppState};

type PageResult = std::result::Result<Response, PageError>;

const ADD_SESSION_INTENT: &str = "add-reading-session";
const EDIT_INTENT: &str = "edit";

/// Parse a positive numeric path segment
pub fn parse_id(entity: &'static str, raw: &str) -> Result<i64> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(TrackerError::invalid_id(entity, raw)),
    }
}

fn redirect(to: &str) -> Response {
    Redirect::to(to).into_response()
}

fn unprocessable(html: String) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response()
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

pub async fn index() -> Redirect {
    Redirect::to("/books")
}

// ============================================================================
// BOOKS
// ============================================================================

pub async fn list_books(State(state): State<AppState>) -> PageResult {
    let books = state.library.list_books().await?;
    Ok(Html(views::book_list(&books)).into_response())
}

pub async fn new_book_form() -> Html<String> {
    Html(views::book_form("Add book", "/books/add", &BookForm::default(), &FieldErrors::new()))
}

pub async fn create_book(State(state): State<AppState>, Form(form): Form<BookForm>) -> PageResult {
    let created = match form.into_input() {
        Ok(input) => state.library.create_book(&input).await,
        Err(err) => Err(err),
    };

    match created {
        Ok(book_id) => Ok(redirect(&format!("/books/{}", book_id))),
        Err(TrackerError::Validation(errors)) => Ok(unprocessable(views::book_form(
            "Add book",
            "/books/add",
            &form,
            &errors,
        ))),
        Err(err) => Err(err.into()),
    }
}

pub async fn show_book(State(state): State<AppState>, Path(id): Path<String>) -> PageResult {
    let book_id = parse_id("Book", &id)?;
    let detail = state.library.book_detail(book_id).await?;
    let form = SessionForm::prefilled(detail.stats.next_page_start, today());

    Ok(Html(views::book_detail(&detail, &form, &FieldErrors::new())).into_response())
}

/// `POST /books/{id}`: dispatch on the form intent
pub async fn book_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<SessionForm>,
) -> PageResult {
    let book_id = parse_id("Book", &id)?;

    match form.intent.as_deref() {
        Some(ADD_SESSION_INTENT) => add_reading_session(&state, book_id, form).await,
        other => Err(TrackerError::UnknownIntent(other.unwrap_or_default().to_string()).into()),
    }
}

async fn add_reading_session(state: &AppState, book_id: i64, form: SessionForm) -> PageResult {
    let added = match form.into_session(book_id) {
        Ok(session) => state.library.add_reading_session(&session).await,
        Err(err) => Err(err),
    };

    match added {
        Ok(_) => Ok(redirect(&format!("/books/{}", book_id))),
        Err(TrackerError::Validation(errors)) => {
            let detail = state.library.book_detail(book_id).await?;
            Ok(unprocessable(views::book_detail(&detail, &form, &errors)))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn edit_book_form(State(state): State<AppState>, Path(id): Path<String>) -> PageResult {
    let book_id = parse_id("Book", &id)?;
    let book = state.library.get_book_with_relations(book_id).await?;
    let action = format!("/books/{}/edit", book_id);

    Ok(Html(views::book_form(
        &format!("Edit {}", book.book.title),
        &action,
        &BookForm::from_book(&book),
        &FieldErrors::new(),
    ))
    .into_response())
}

pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<BookForm>,
) -> PageResult {
    let book_id = parse_id("Book", &id)?;

    match form.intent.as_deref() {
        None | Some(EDIT_INTENT) => {}
        Some(other) => return Err(TrackerError::UnknownIntent(other.to_string()).into()),
    }

    let updated = match form.into_input() {
        Ok(input) => state.library.update_book(book_id, &input).await,
        Err(err) => Err(err),
    };

    match updated {
        Ok(()) => Ok(redirect(&format!("/books/{}", book_id))),
        Err(TrackerError::Validation(errors)) => {
            let book = state.library.get_book(book_id).await?;
            Ok(unprocessable(views::book_form(
                &format!("Edit {}", book.title),
                &format!("/books/{}/edit", book_id),
                &form,
                &errors,
            )))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn delete_book(State(state): State<AppState>, Path(id): Path<String>) -> PageResult {
    let book_id = parse_id("Book", &id)?;
    state.library.delete_book(book_id).await?;
    Ok(redirect("/books"))
}

pub async fn book_sessions(State(state): State<AppState>, Path(id): Path<String>) -> PageResult {
    let book_id = parse_id("Book", &id)?;
    let detail = state.library.book_detail(book_id).await?;
    Ok(Html(views::book_sessions(&detail)).into_response())
}

// ============================================================================
// READING SESSIONS
// ============================================================================

pub async fn list_sessions(State(state): State<AppState>) -> PageResult {
    let sessions = state.library.list_all_sessions().await?;
    Ok(Html(views::session_list(&sessions)).into_response())
}

pub async fn edit_session_form(State(state): State<AppState>, Path(id): Path<String>) -> PageResult {
    let session_id = parse_id("Reading session", &id)?;
    let session = state.library.get_reading_session(session_id).await?;
    let book = state.library.get_book(session.book_id).await?;

    Ok(Html(views::session_edit(
        &book,
        session_id,
        &SessionForm::from_session(&session),
        &FieldErrors::new(),
    ))
    .into_response())
}

pub async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<SessionForm>,
) -> PageResult {
    let session_id = parse_id("Reading session", &id)?;

    match form.intent.as_deref() {
        None | Some(EDIT_INTENT) => {}
        Some(other) => return Err(TrackerError::UnknownIntent(other.to_string()).into()),
    }

    let existing = state.library.get_reading_session(session_id).await?;
    let updated = match form.into_session(existing.book_id) {
        Ok(session) => state.library.update_reading_session(session_id, &session).await,
        Err(err) => Err(err),
    };

    match updated {
        Ok(()) => Ok(redirect(&format!("/books/{}/reading-sessions", existing.book_id))),
        Err(TrackerError::Validation(errors)) => {
            let book = state.library.get_book(existing.book_id).await?;
            Ok(unprocessable(views::session_edit(&book, session_id, &form, &errors)))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> PageResult {
    let session_id = parse_id("Reading session", &id)?;
    state.library.delete_reading_session(session_id).await?;
    Ok(redirect("/reading-sessions"))
}

// ============================================================================
// GENRES
// ============================================================================

pub async fn list_genres(State(state): State<AppState>) -> PageResult {
    let genres = state.library.list_genres().await?;
    Ok(Html(views::genres_page(&genres, &GenreForm::default(), &FieldErrors::new(), None)).into_response())
}

/// Re-render the genre page for a rejected action
async fn genres_with_error(state: &AppState, form: &GenreForm, err: TrackerError) -> PageResult {
    let status = status_code(&err);
    let genres = state.library.list_genres().await?;

    let html = match &err {
        TrackerError::Validation(errors) => views::genres_page(&genres, form, errors, None),
        TrackerError::Conflict(message) => {
            views::genres_page(&genres, &GenreForm::default(), &FieldErrors::new(), Some(message.as_str()))
        }
        _ => return Err(err.into()),
    };

    Ok((status, Html(html)).into_response())
}

pub async fn create_genre(State(state): State<AppState>, Form(form): Form<GenreForm>) -> PageResult {
    let created = match genre_name(form.name.as_deref()) {
        Ok(name) => state.library.create_genre(&name).await,
        Err(err) => Err(err),
    };

    match created {
        Ok(_) => Ok(redirect("/genres")),
        Err(err) => genres_with_error(&state, &form, err).await,
    }
}

pub async fn rename_genre(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<GenreForm>,
) -> PageResult {
    let genre_id = parse_id("Genre", &id)?;

    let renamed = match genre_name(form.name.as_deref()) {
        Ok(name) => state.library.rename_genre(genre_id, &name).await,
        Err(err) => Err(err),
    };

    match renamed {
        Ok(_) => Ok(redirect("/genres")),
        Err(err) => genres_with_error(&state, &GenreForm::default(), err).await,
    }
}

pub async fn delete_genre(State(state): State<AppState>, Path(id): Path<String>) -> PageResult {
    let genre_id = parse_id("Genre", &id)?;

    match state.library.delete_genre(genre_id).await {
        Ok(()) => Ok(redirect("/genres")),
        Err(err) => genres_with_error(&state, &GenreForm::default(), err).await,
    }
}
