//! HTML rendering
//!
//! Every page is a plain function from view data to a `String`. All text that
//! came from the database or a submitted form goes through [`escape_html`].

use axum::http::StatusCode;

use crate::error::FieldErrors;
use crate::library::stats::{format_duration, ReadingStats};
use crate::library::validation::{BookForm, GenreForm, SessionForm};
use crate::library::BookDetail;
use crate::storage::models::{Book, BookWithRelations, GenreUsage, ReadingSession, ReadingSessionWithBook};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 52rem; margin: 2rem auto; padding: 0 1rem; color: #222; }
nav a { margin-right: 1rem; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: .35rem .5rem; border-bottom: 1px solid #ddd; }
label { display: block; margin-top: .75rem; }
.error { color: #b00020; font-size: .9rem; }
.notice { background: #fff4e5; padding: .5rem .75rem; }
.stats dt { font-weight: 600; }
form.inline { display: inline; }
"#;

/// Escape text for use in element content and quoted attribute values
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Wrap a page body in the shared document shell
pub fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Pagemark</title>
<style>{style}</style>
</head>
<body>
<nav><a href="/books">Books</a><a href="/reading-sessions">Reading sessions</a><a href="/genres">Genres</a></nav>
<main>
{body}
</main>
</body>
</html>"#,
        title = escape_html(title),
        style = STYLE,
        body = body,
    )
}

fn field_error(errors: &FieldErrors, field: &str) -> String {
    match errors.get(field) {
        Some(message) => format!(r#"<p class="error" id="{field}-error">{}</p>"#, escape_html(message)),
        None => String::new(),
    }
}

fn value(raw: &Option<String>) -> String {
    escape_html(raw.as_deref().unwrap_or_default())
}

fn optional_number(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

// ============================================================================
// BOOKS
// ============================================================================

pub fn book_list(books: &[BookWithRelations]) -> String {
    let rows: String = books
        .iter()
        .map(|book| {
            format!(
                r#"<tr><td><a href="/books/{id}">{title}</a></td><td>{authors}</td><td>{genres}</td><td>{pages}</td></tr>"#,
                id = book.book.id,
                title = escape_html(&book.book.title),
                authors = escape_html(&book.author_names().join(", ")),
                genres = escape_html(&book.genre_names().join(", ")),
                pages = optional_number(book.book.page_count),
            )
        })
        .collect();

    let table = if books.is_empty() {
        "<p>No books yet.</p>".to_string()
    } else {
        format!(
            "<table><thead><tr><th>Title</th><th>Authors</th><th>Genres</th><th>Pages</th></tr></thead><tbody>{}</tbody></table>",
            rows
        )
    };

    layout(
        "Books",
        &format!(r#"<h1>Books</h1><p><a href="/books/add">Add a book</a></p>{}"#, table),
    )
}

/// Add and edit form; `action` is the POST target
pub fn book_form(heading: &str, action: &str, form: &BookForm, errors: &FieldErrors) -> String {
    let body = format!(
        r#"<h1>{heading}</h1>
<form method="post" action="{action}">
<input type="hidden" name="intent" value="edit">
<label>Title <input name="title" value="{title}" required></label>
{title_error}
<label>Page count <input name="pageCount" type="number" min="1" value="{page_count}" required></label>
{page_count_error}
<label>ISBN <input name="isbn" value="{isbn}"></label>
{isbn_error}
<label>Authors (comma-separated) <input name="authors" value="{authors}"></label>
{authors_error}
<label>Genres (comma-separated) <input name="genres" value="{genres}"></label>
{genres_error}
<p><button type="submit">Save</button></p>
</form>"#,
        heading = escape_html(heading),
        action = escape_html(action),
        title = value(&form.title),
        title_error = field_error(errors, "title"),
        page_count = value(&form.page_count),
        page_count_error = field_error(errors, "pageCount"),
        isbn = value(&form.isbn),
        isbn_error = field_error(errors, "isbn"),
        authors = value(&form.authors),
        authors_error = indexed_errors(errors, "authors"),
        genres = value(&form.genres),
        genres_error = indexed_errors(errors, "genres"),
    );

    layout(heading, &body)
}

/// Messages recorded under `prefix.N`
fn indexed_errors(errors: &FieldErrors, prefix: &str) -> String {
    let dotted = format!("{}.", prefix);
    errors
        .iter()
        .filter(|(field, _)| field.starts_with(&dotted))
        .map(|(_, message)| format!(r#"<p class="error">{}</p>"#, escape_html(message)))
        .collect()
}

fn stats_block(stats: &ReadingStats) -> String {
    format!(
        r#"<dl class="stats">
<dt>Pages read</dt><dd>{pages_read}</dd>
<dt>Progress</dt><dd>{percentage:.1}%</dd>
<dt>Time spent</dt><dd>{time_spent}</dd>
<dt>Sessions</dt><dd>{sessions}</dd>
<dt>Average pages per session</dt><dd>{avg_pages:.1}</dd>
<dt>Average minutes per session</dt><dd>{avg_minutes:.1}</dd>
<dt>Minutes per page</dt><dd>{minutes_per_page:.1}</dd>
<dt>Pages per hour</dt><dd>{pages_per_hour:.1}</dd>
<dt>Pages left</dt><dd>{pages_left}</dd>
<dt>Time to finish</dt><dd>{time_to_finish}</dd>
</dl>"#,
        pages_read = stats.total_pages_read,
        percentage = stats.percentage_read,
        time_spent = format_duration(stats.total_duration),
        sessions = stats.session_count,
        avg_pages = stats.average_pages_per_session,
        avg_minutes = stats.average_duration_per_session,
        minutes_per_page = stats.average_minutes_per_page,
        pages_per_hour = stats.pages_per_hour,
        pages_left = optional_number(stats.pages_left),
        time_to_finish = escape_html(&stats.time_to_finish_string()),
    )
}

fn session_fields(form: &SessionForm, errors: &FieldErrors) -> String {
    format!(
        r#"<label>Date <input name="startTime" type="date" value="{start_time}" required></label>
{start_time_error}
<label>Duration (minutes) <input name="duration" type="number" min="1" value="{duration}" required></label>
{duration_error}
<label>Start page <input name="pageStart" type="number" min="1" value="{page_start}"></label>
{page_start_error}
<label>End page <input name="pageEnd" type="number" min="1" value="{page_end}"></label>
{page_end_error}
<label><input name="finishedBook" type="checkbox"{checked}> Finished the book</label>"#,
        start_time = value(&form.start_time),
        start_time_error = field_error(errors, "startTime"),
        duration = value(&form.duration),
        duration_error = field_error(errors, "duration"),
        page_start = value(&form.page_start),
        page_start_error = field_error(errors, "pageStart"),
        page_end = value(&form.page_end),
        page_end_error = field_error(errors, "pageEnd"),
        checked = if form.is_finished_checked() { " checked" } else { "" },
    )
}

fn session_rows(sessions: &[ReadingSession]) -> String {
    sessions
        .iter()
        .map(|session| {
            format!(
                r#"<tr><td>{date}</td><td>{duration}</td><td>{start}</td><td>{end}</td><td>{pages}</td><td>{finished}</td><td><a href="/reading-sessions/{id}/edit">Edit</a></td></tr>"#,
                date = session.start_time,
                duration = format_duration(session.duration),
                start = optional_number(session.page_start),
                end = optional_number(session.page_end),
                pages = session.pages_read(),
                finished = if session.finished_book { "Yes" } else { "" },
                id = session.id,
            )
        })
        .collect()
}

const SESSION_HEADER: &str =
    "<tr><th>Date</th><th>Duration</th><th>Start</th><th>End</th><th>Pages</th><th>Finished</th><th></th></tr>";

/// Book page: details, statistics and the add-session form
pub fn book_detail(detail: &BookDetail, form: &SessionForm, errors: &FieldErrors) -> String {
    let book = &detail.book.book;
    let isbn = book
        .isbn
        .as_deref()
        .map(|isbn| format!("<p>ISBN {}</p>", escape_html(isbn)))
        .unwrap_or_default();
    let recent = if detail.sessions.is_empty() {
        "<p>No reading sessions yet.</p>".to_string()
    } else {
        format!(
            "<table><thead>{}</thead><tbody>{}</tbody></table>",
            SESSION_HEADER,
            session_rows(&detail.sessions)
        )
    };

    let body = format!(
        r#"<h1>{title}</h1>
<p>by {authors}</p>
<p>Genres: {genres}</p>
<p>Pages: {pages}</p>
{isbn}
<p><a href="/books/{id}/edit">Edit</a> | <a href="/books/{id}/reading-sessions">All sessions</a></p>
<form class="inline" method="post" action="/books/{id}/delete"><button type="submit">Delete book</button></form>
<h2>Progress</h2>
{stats}
<h2>Add reading session</h2>
<form method="post" action="/books/{id}">
<input type="hidden" name="intent" value="add-reading-session">
{fields}
<p><button type="submit">Add session</button></p>
</form>
<h2>Sessions</h2>
{recent}"#,
        title = escape_html(&book.title),
        authors = escape_html(&detail.book.author_names().join(", ")),
        genres = escape_html(&detail.book.genre_names().join(", ")),
        pages = optional_number(book.page_count),
        isbn = isbn,
        id = book.id,
        stats = stats_block(&detail.stats),
        fields = session_fields(form, errors),
        recent = recent,
    );

    layout(&book.title, &body)
}

/// Every session of one book with the aggregate statistics
pub fn book_sessions(detail: &BookDetail) -> String {
    let book = &detail.book.book;
    let body = format!(
        r#"<h1>Reading sessions: {title}</h1>
<p><a href="/books/{id}">Back to book</a></p>
<h2>Summary</h2>
{stats}
<table><thead>{header}</thead><tbody>{rows}</tbody></table>"#,
        title = escape_html(&book.title),
        id = book.id,
        stats = stats_block(&detail.stats),
        header = SESSION_HEADER,
        rows = session_rows(&detail.sessions),
    );

    layout(&format!("Sessions of {}", book.title), &body)
}

/// Global session list, grouped by book
pub fn session_list(sessions: &[ReadingSessionWithBook]) -> String {
    let rows: String = sessions
        .iter()
        .map(|row| {
            let session = &row.session;
            format!(
                r#"<tr><td><a href="/books/{book_id}">{title}</a></td><td>{date}</td><td>{duration}</td><td>{start}</td><td>{end}</td><td><a href="/reading-sessions/{id}/edit">Edit</a></td></tr>"#,
                book_id = session.book_id,
                title = escape_html(&row.book_title),
                date = session.start_time,
                duration = format_duration(session.duration),
                start = optional_number(session.page_start),
                end = optional_number(session.page_end),
                id = session.id,
            )
        })
        .collect();

    let body = if sessions.is_empty() {
        "<h1>Reading sessions</h1><p>No reading sessions yet.</p>".to_string()
    } else {
        format!(
            "<h1>Reading sessions</h1><table><thead><tr><th>Book</th><th>Date</th><th>Duration</th><th>Start</th><th>End</th><th></th></tr></thead><tbody>{}</tbody></table>",
            rows
        )
    };

    layout("Reading sessions", &body)
}

pub fn session_edit(book: &Book, session_id: i64, form: &SessionForm, errors: &FieldErrors) -> String {
    let body = format!(
        r#"<h1>Edit session of {title}</h1>
<form method="post" action="/reading-sessions/{id}/edit">
<input type="hidden" name="intent" value="edit">
{fields}
<p><button type="submit">Save</button></p>
</form>
<form method="post" action="/reading-sessions/{id}/delete"><button type="submit">Delete session</button></form>"#,
        title = escape_html(&book.title),
        id = session_id,
        fields = session_fields(form, errors),
    );

    layout("Edit reading session", &body)
}

// ============================================================================
// GENRES
// ============================================================================

pub fn genres_page(genres: &[GenreUsage], form: &GenreForm, errors: &FieldErrors, notice: Option<&str>) -> String {
    let rows: String = genres
        .iter()
        .map(|genre| {
            format!(
                r#"<tr><td>{name}</td><td>{count}</td><td>
<form class="inline" method="post" action="/genres/{id}/edit"><input name="name" value="{name}" aria-label="New name"><button type="submit">Rename</button></form>
<form class="inline" method="post" action="/genres/{id}/delete"><button type="submit">Delete</button></form>
</td></tr>"#,
                name = escape_html(&genre.name),
                count = genre.book_count,
                id = genre.id,
            )
        })
        .collect();

    let notice = notice
        .map(|text| format!(r#"<p class="notice">{}</p>"#, escape_html(text)))
        .unwrap_or_default();

    let body = format!(
        r#"<h1>Genres</h1>
{notice}
<table><thead><tr><th>Name</th><th>Books</th><th></th></tr></thead><tbody>{rows}</tbody></table>
<h2>New genre</h2>
<form method="post" action="/genres">
<label>Name <input name="name" value="{name}" required></label>
{name_error}
<p><button type="submit">Create</button></p>
</form>"#,
        notice = notice,
        rows = rows,
        name = value(&form.name),
        name_error = field_error(errors, "name"),
    );

    layout("Genres", &body)
}

// ============================================================================
// ERRORS
// ============================================================================

pub fn error_page(status: StatusCode, message: &str, errors: Option<&FieldErrors>) -> String {
    let details: String = errors
        .map(|errors| {
            errors
                .iter()
                .map(|(field, message)| format!("<li>{}: {}</li>", escape_html(field), escape_html(message)))
                .collect()
        })
        .unwrap_or_default();
    let details = if details.is_empty() {
        details
    } else {
        format!("<ul>{}</ul>", details)
    };

    let body = format!(
        r#"<h1>{code}</h1><p>{message}</p>{details}<p><a href="/books">Back to books</a></p>"#,
        code = status.as_u16(),
        message = escape_html(message),
        details = details,
    );

    layout(status.canonical_reason().unwrap_or("Error"), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{AuthorLink, GenreLink};

    fn book() -> BookWithRelations {
        BookWithRelations {
            book: Book {
                id: 3,
                title: "<Dune>".to_string(),
                isbn: None,
                page_count: Some(200),
            },
            authors: vec![AuthorLink {
                id: 1,
                author_id: 1,
                name: "Frank Herbert".to_string(),
            }],
            genres: vec![GenreLink {
                id: 1,
                genre_id: 1,
                name: "Sci-Fi & Fantasy".to_string(),
            }],
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;");
    }

    #[test]
    fn test_book_list_escapes_titles() {
        let html = book_list(&[book()]);
        assert!(html.contains("&lt;Dune&gt;"));
        assert!(html.contains("Sci-Fi &amp; Fantasy"));
        assert!(html.contains(r#"href="/books/3""#));
        assert!(!html.contains("<Dune>"));
    }

    #[test]
    fn test_book_form_shows_errors_next_to_fields() {
        let form = BookForm {
            title: Some("".to_string()),
            page_count: Some("abc".to_string()),
            ..BookForm::default()
        };
        let mut errors = FieldErrors::new();
        errors.add("title", "Title is required");

        let html = book_form("Add book", "/books/add", &form, &errors);
        assert!(html.contains(r#"id="title-error">Title is required"#));
        assert!(html.contains(r#"value="abc""#), "Submitted value is kept");
    }

    #[test]
    fn test_book_detail_prefills_session_form() {
        let detail = BookDetail {
            stats: ReadingStats::compute(Some(200), &[]),
            sessions: vec![],
            book: book(),
        };
        let today = chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let html = book_detail(&detail, &SessionForm::prefilled(1, today), &FieldErrors::new());

        assert!(html.contains(r#"name="pageStart" type="number" min="1" value="1""#));
        assert!(html.contains(r#"value="2024-02-29""#));
        assert!(html.contains("Not enough data yet"));
        assert!(html.contains(r#"value="add-reading-session""#));
    }

    #[test]
    fn test_error_page_lists_field_errors() {
        let mut errors = FieldErrors::new();
        errors.add("name", "Genre name is required");
        let html = error_page(StatusCode::UNPROCESSABLE_ENTITY, "Please correct the highlighted field.", Some(&errors));
        assert!(html.contains("<h1>422</h1>"));
        assert!(html.contains("name: Genre name is required"));
    }
}
