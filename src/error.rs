use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Application error. Every variant carries the human-readable reason
/// returned to the caller next to its category.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "{}", _0)]
    Unprocessable(String),

    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    /// The store failed to read or commit. The partial write, if any, has
    /// been rolled back.
    #[display(fmt = "{}", _0)]
    Storage(String),

    /// Failure outside the store, e.g. token signing or password hashing.
    #[display(fmt = "{}", _0)]
    Internal(String),
}

impl AppError {
    pub fn not_found(reason: impl Into<String>) -> Self {
        AppError::NotFound(reason.into())
    }

    pub fn unprocessable(reason: impl Into<String>) -> Self {
        AppError::Unprocessable(reason.into())
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        AppError::Forbidden(reason.into())
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        AppError::Unauthorized(reason.into())
    }

    /// Category string sent in the `status` field of error bodies.
    pub fn category(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Unprocessable(_) => "unprocessable",
            AppError::Conflict(_) => "conflict",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Storage(_) => "storage_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "status": self.category(),
            "error": self.to_string(),
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Record store failure");
        AppError::Storage("Storage failure, no changes were saved".to_string())
    }
}

/// Maps constraint failures on insert/update. MySQL shares SQLSTATE 23000
/// between duplicate keys and dangling foreign keys, so this goes by the
/// driver's error kind instead.
pub fn constraint_error(e: sqlx::Error, duplicate: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(duplicate.to_string())
        }
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            AppError::unprocessable("Referenced record does not exist")
        }
        _ => e.into(),
    }
}
