//! HTTP route tests
//!
//! Drives the full router (HTML pages and JSON API) with `tower::ServiceExt::oneshot`
//! against an in-memory database.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use pagemark::{web, Library};
use serde_json::{json, Value};
use tower::ServiceExt;

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct TestResponse {
    status: StatusCode,
    location: Option<String>,
    body: String,
}

impl TestResponse {
    fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

async fn app() -> Result<Router, Box<dyn std::error::Error>> {
    Ok(web::router(Library::in_memory().await?))
}

async fn send(app: &Router, request: Request<Body>) -> Result<TestResponse, Box<dyn std::error::Error>> {
    let response = app.clone().oneshot(request).await?;

    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = response.into_body().collect().await?.to_bytes();

    Ok(TestResponse {
        status,
        location,
        body: String::from_utf8(bytes.to_vec())?,
    })
}

async fn get(app: &Router, uri: &str) -> Result<TestResponse, Box<dyn std::error::Error>> {
    send(app, Request::builder().uri(uri).body(Body::empty())?).await
}

async fn post_form(app: &Router, uri: &str, form: &str) -> Result<TestResponse, Box<dyn std::error::Error>> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))?;
    send(app, request).await
}

async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    body: Value,
) -> Result<TestResponse, Box<dyn std::error::Error>> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))?;
    send(app, request).await
}

async fn create_dune(app: &Router) -> Result<TestResponse, Box<dyn std::error::Error>> {
    post_form(
        app,
        "/books/add",
        "title=Dune&pageCount=200&isbn=&genres=Sci-Fi%2C+Classics&authors=Frank+Herbert&intent=edit",
    )
    .await
}

#[tokio::test]
async fn test_root_redirects_to_books() -> TestResult {
    let app = app().await?;
    let response = get(&app, "/").await?;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/books"));
    Ok(())
}

#[tokio::test]
async fn test_health() -> TestResult {
    let app = app().await?;
    let response = get(&app, "/health").await?;

    assert_eq!(response.status, StatusCode::OK);
    let json = response.json()?;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["books"], 0);
    Ok(())
}

#[tokio::test]
async fn test_add_book_then_log_session() -> TestResult {
    let app = app().await?;

    let created = create_dune(&app).await?;
    assert_eq!(created.status, StatusCode::SEE_OTHER);
    assert_eq!(created.location.as_deref(), Some("/books/1"));

    let page = get(&app, "/books/1").await?;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("<h1>Dune</h1>"));
    assert!(page.body.contains("Frank Herbert"));
    assert!(page.body.contains(r#"name="pageStart" type="number" min="1" value="1""#));

    let logged = post_form(
        &app,
        "/books/1",
        "intent=add-reading-session&startTime=2024-01-01&duration=30&pageStart=1&pageEnd=21",
    )
    .await?;
    assert_eq!(logged.status, StatusCode::SEE_OTHER);
    assert_eq!(logged.location.as_deref(), Some("/books/1"));

    let detail = get(&app, "/api/books/1").await?.json()?;
    assert_eq!(detail["title"], "Dune");
    assert_eq!(detail["sessions"].as_array().map(Vec::len), Some(1));
    assert_eq!(detail["stats"]["totalPagesRead"], 20);
    assert_eq!(detail["stats"]["percentageRead"], 10.0);
    assert_eq!(detail["stats"]["nextPageStart"], 22);

    let page = get(&app, "/books/1").await?;
    assert!(page.body.contains(r#"value="22""#), "Next session starts after page 21");
    Ok(())
}

#[tokio::test]
async fn test_book_sessions_page_shows_aggregates() -> TestResult {
    let app = app().await?;
    create_dune(&app).await?;
    post_form(
        &app,
        "/books/1",
        "intent=add-reading-session&startTime=2024-01-01&duration=30&pageStart=1&pageEnd=21",
    )
    .await?;

    let page = get(&app, "/books/1/reading-sessions").await?;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("<dt>Average pages per session</dt><dd>20.0</dd>"));
    assert!(page.body.contains("<dt>Average minutes per session</dt><dd>30.0</dd>"));
    assert!(page.body.contains("<dt>Minutes per page</dt><dd>1.5</dd>"));
    assert!(page.body.contains("<dt>Pages per hour</dt><dd>40.0</dd>"));
    assert!(page.body.contains("2024-01-01"));

    let missing = get(&app, "/books/9/reading-sessions").await?;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_invalid_book_form_rerenders_with_errors() -> TestResult {
    let app = app().await?;

    let response = post_form(&app, "/books/add", "title=&pageCount=lots&genres=Fantasy").await?;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Title is required"));
    assert!(response.body.contains("Page count must be a positive number"));
    assert!(response.body.contains(r#"value="lots""#));

    let books = get(&app, "/api/books").await?.json()?;
    assert_eq!(books, json!([]));
    let genres = get(&app, "/api/genres").await?.json()?;
    assert_eq!(genres, json!([]));
    Ok(())
}

#[tokio::test]
async fn test_invalid_session_form_keeps_values() -> TestResult {
    let app = app().await?;
    create_dune(&app).await?;

    let response = post_form(
        &app,
        "/books/1",
        "intent=add-reading-session&startTime=2024-01-01&duration=0&pageStart=5&pageEnd=9",
    )
    .await?;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Duration must be a positive number"));
    assert!(response.body.contains(r#"value="9""#));
    Ok(())
}

#[tokio::test]
async fn test_bad_ids_and_missing_records() -> TestResult {
    let app = app().await?;

    let response = get(&app, "/books/abc").await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.contains("Invalid Book ID"));

    let response = get(&app, "/books/99").await?;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = get(&app, "/api/reading-sessions/7").await?;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()?["detail"], "Reading session not found");
    Ok(())
}

#[tokio::test]
async fn test_unknown_intent_rejected() -> TestResult {
    let app = app().await?;
    create_dune(&app).await?;

    let response = post_form(&app, "/books/1", "intent=archive").await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = post_form(&app, "/books/1/edit", "intent=archive&title=Dune&pageCount=200").await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_edit_book_replaces_associations() -> TestResult {
    let app = app().await?;
    create_dune(&app).await?;

    let response = post_form(
        &app,
        "/books/1/edit",
        "title=Dune+Messiah&pageCount=256&genres=Sci-Fi&authors=Frank+Herbert",
    )
    .await?;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/books/1"));

    let book = get(&app, "/api/books/1").await?.json()?;
    assert_eq!(book["title"], "Dune Messiah");
    assert_eq!(book["genres"].as_array().map(Vec::len), Some(1));
    assert_eq!(book["genres"][0]["name"], "Sci-Fi");

    let form = get(&app, "/books/1/edit").await?;
    assert!(form.body.contains(r#"value="Dune Messiah""#));
    Ok(())
}

#[tokio::test]
async fn test_session_edit_and_delete_redirects() -> TestResult {
    let app = app().await?;
    create_dune(&app).await?;
    post_form(
        &app,
        "/books/1",
        "intent=add-reading-session&startTime=2024-01-01&duration=30&pageStart=1&pageEnd=21",
    )
    .await?;

    let form = get(&app, "/reading-sessions/1/edit").await?;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains(r#"value="21""#));

    let edited = post_form(
        &app,
        "/reading-sessions/1/edit",
        "intent=edit&startTime=2024-01-02&duration=45&pageStart=1&pageEnd=31&finishedBook=on",
    )
    .await?;
    assert_eq!(edited.status, StatusCode::SEE_OTHER);
    assert_eq!(edited.location.as_deref(), Some("/books/1/reading-sessions"));

    let session = get(&app, "/api/reading-sessions/1").await?.json()?;
    assert_eq!(session["pageEnd"], 31);
    assert_eq!(session["finishedBook"], true);
    assert_eq!(session["startTime"], "2024-01-02");

    let listing = get(&app, "/reading-sessions").await?;
    assert!(listing.body.contains("Dune"));

    let deleted = post_form(&app, "/reading-sessions/1/delete", "").await?;
    assert_eq!(deleted.status, StatusCode::SEE_OTHER);
    assert_eq!(deleted.location.as_deref(), Some("/reading-sessions"));
    assert_eq!(get(&app, "/reading-sessions/1/edit").await?.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_delete_book_redirects_to_list() -> TestResult {
    let app = app().await?;
    create_dune(&app).await?;

    let response = post_form(&app, "/books/1/delete", "").await?;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/books"));
    assert_eq!(get(&app, "/books/1").await?.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_json_validation_errors() -> TestResult {
    let app = app().await?;

    let response = send_json(
        &app,
        Method::POST,
        "/api/books",
        json!({ "title": "Good Omens", "pageCount": 412, "authors": ["Terry Pratchett", ""] }),
    )
    .await?;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let json = response.json()?;
    assert_eq!(json["errors"]["authors.1"], "Author name cannot be empty");
    Ok(())
}

#[tokio::test]
async fn test_json_book_and_session_crud() -> TestResult {
    let app = app().await?;

    let created = send_json(
        &app,
        Method::POST,
        "/api/books",
        json!({ "title": "Piranesi", "pageCount": 272, "genres": ["Fantasy"], "authors": ["Susanna Clarke"] }),
    )
    .await?;
    assert_eq!(created.status, StatusCode::CREATED);
    let book_id = created.json()?["id"].as_i64().ok_or("missing id")?;

    let session = send_json(
        &app,
        Method::POST,
        "/api/reading-sessions",
        json!({ "bookId": book_id, "startTime": "2024-05-01", "duration": 40, "pageStart": 1, "pageEnd": 41 }),
    )
    .await?;
    assert_eq!(session.status, StatusCode::CREATED);
    let session_id = session.json()?["id"].as_i64().ok_or("missing id")?;

    let updated = send_json(
        &app,
        Method::PUT,
        &format!("/api/reading-sessions/{}", session_id),
        json!({ "startTime": "2024-05-02", "duration": 50, "pageStart": 1, "pageEnd": 51 }),
    )
    .await?;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.json()?["bookId"], book_id);

    let stats = get(&app, &format!("/api/books/{}", book_id)).await?.json()?;
    assert_eq!(stats["stats"]["totalPagesRead"], 50);

    let authors = get(&app, "/api/authors").await?.json()?;
    assert_eq!(authors[0]["name"], "Susanna Clarke");

    let deleted = send_json(&app, Method::DELETE, &format!("/api/books/{}", book_id), Value::Null).await?;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(
        get(&app, &format!("/api/reading-sessions/{}", session_id)).await?.status,
        StatusCode::NOT_FOUND
    );
    Ok(())
}

#[tokio::test]
async fn test_genre_management() -> TestResult {
    let app = app().await?;

    let created = post_form(&app, "/genres", "name=Poetry").await?;
    assert_eq!(created.status, StatusCode::SEE_OTHER);
    assert_eq!(created.location.as_deref(), Some("/genres"));

    let blank = post_form(&app, "/genres", "name=+").await?;
    assert_eq!(blank.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(blank.body.contains("Genre name is required"));

    let renamed = post_form(&app, "/genres/1/edit", "name=Verse").await?;
    assert_eq!(renamed.status, StatusCode::SEE_OTHER);

    send_json(
        &app,
        Method::POST,
        "/api/books",
        json!({ "title": "Leaves of Grass", "pageCount": 400, "genres": ["Verse"] }),
    )
    .await?;

    let page = get(&app, "/genres").await?;
    assert!(page.body.contains("Verse"));

    let in_use = post_form(&app, "/genres/1/delete", "").await?;
    assert_eq!(in_use.status, StatusCode::CONFLICT);
    assert!(in_use.body.contains("still assigned"));

    let api_in_use = send_json(&app, Method::DELETE, "/api/genres/1", Value::Null).await?;
    assert_eq!(api_in_use.status, StatusCode::CONFLICT);

    let genres = get(&app, "/api/genres").await?.json()?;
    assert_eq!(genres[0]["bookCount"], 1);
    Ok(())
}
