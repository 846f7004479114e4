//! Error types for Bookshelf server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::{
    api::response::{validation_errors_to_ordered_map, ApiResponse, ErrorPayload},
    models::book::ERROR_FIELD_ORDER,
    notices::Notices,
};

/// Rule code marking a failed existence check on a route parameter
pub const EXISTS_RULE: &str = "exists";

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Body returned when the bearer token is missing or invalid
#[derive(Serialize, utoipa::ToSchema)]
pub struct UnauthorizedResponse {
    pub message: String,
}

impl AppError {
    /// HTTP status this error is reported with.
    ///
    /// Validation failures are 422 unless one of the failed rules is an
    /// existence check, in which case the whole response is a 404.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(errors) if failed_existence(errors) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Whether any field failed the `exists` rule
pub fn failed_existence(errors: &ValidationErrors) -> bool {
    errors.errors().values().any(|kind| match kind {
        ValidationErrorsKind::Field(failures) => failures.iter().any(|e| e.code == EXISTS_RULE),
        ValidationErrorsKind::Struct(inner) => failed_existence(inner),
        ValidationErrorsKind::List(items) => items.values().any(|inner| failed_existence(inner)),
    })
}

/// Failed envelope kept on the response so the notice middleware can rebuild
/// it with the notices queued before the failure
#[derive(Debug, Clone)]
pub struct ErrorEnvelope {
    pub status: StatusCode,
    pub payload: ErrorPayload,
}

impl ErrorEnvelope {
    pub fn into_response_with(self, notices: &Notices) -> Response {
        ApiResponse::<()>::new()
            .with_notices(notices)
            .with_error(self.payload, None, None, Some(self.status))
            .into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let payload = match self {
            AppError::Authentication(reason) => {
                tracing::debug!("Rejected request: {}", reason);
                let body = Json(UnauthorizedResponse {
                    message: "Unauthorized".to_string(),
                });
                return (status, body).into_response();
            }
            AppError::NotFound(msg) | AppError::BadRequest(msg) => ErrorPayload::Message(msg),
            AppError::Validation(errors) => {
                ErrorPayload::Fields(validation_errors_to_ordered_map(&errors, ERROR_FIELD_ORDER))
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ErrorPayload::from("Database error")
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorPayload::from("Internal server error")
            }
        };

        let envelope = ErrorEnvelope { status, payload };
        let mut response = envelope.clone().into_response_with(&Notices::new());
        response.extensions_mut().insert(envelope);
        response
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
