//! HTTP error responses
//!
//! `PageError` renders an HTML error page, `ApiError` a JSON body. Both map
//! `TrackerError` categories to status codes the same way and log server-side
//! failures before replacing them with a generic message.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use serde::Serialize;

use crate::error::{FieldErrors, TrackerError};
use crate::web::views;

/// Status code for an error
pub fn status_code(err: &TrackerError) -> StatusCode {
    match err {
        TrackerError::InvalidId { .. }
        | TrackerError::UnknownIntent(_) => StatusCode::BAD_REQUEST,
        TrackerError::RecordNotFound { .. } => StatusCode::NOT_FOUND,
        TrackerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TrackerError::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn log_server_error(err: &TrackerError) {
    if !err.is_client_error() {
        tracing::error!(error = %err, "request failed");
    }
}

/// Error rendered as an HTML page
#[derive(Debug)]
pub struct PageError(pub TrackerError);

impl From<TrackerError> for PageError {
    fn from(err: TrackerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        log_server_error(&self.0);
        let status = status_code(&self.0);
        let body = views::error_page(status, &self.0.user_message(), self.0.field_errors());
        (status, Html(body)).into_response()
    }
}

/// JSON error body for non-validation failures
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub title: String,
    pub status: u16,
    pub detail: String,
}

#[derive(Debug, Serialize)]
struct ValidationResponse<'a> {
    errors: &'a FieldErrors,
}

/// Error rendered as JSON
#[derive(Debug)]
pub struct ApiError(pub TrackerError);

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log_server_error(&self.0);
        let status = status_code(&self.0);

        if let Some(errors) = self.0.field_errors() {
            return (status, Json(ValidationResponse { errors })).into_response();
        }

        let body = ErrorResponse {
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            status: status.as_u16(),
            detail: self.0.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(status_code(&TrackerError::invalid_id("Book", "x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_code(&TrackerError::not_found("Book", 1)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_code(&TrackerError::field("title", "Title is required")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_code(&TrackerError::Conflict("in use".to_string())), StatusCode::CONFLICT);
        assert_eq!(
            status_code(&TrackerError::MigrationFailed("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_error_hides_detail() {
        let response = ApiError(TrackerError::SqlxError(sqlx::Error::RowNotFound)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
