//!
//! # Custom Error Handling
//!
//! This module defines the `AppError` type used throughout the application.
//! Every failure a request can run into, from a bad token to a storage fault,
//! ends up as exactly one variant of this closed enum, and each variant maps to
//! exactly one HTTP status.
//!
//! `AppError` implements `actix_web::error::ResponseError` so handlers can return
//! `Result<_, AppError>` directly. `From` implementations for `sqlx::Error`,
//! `validator::ValidationErrors`, [`TokenError`] and actix's `BlockingError`
//! make the `?` operator work across layers.

use actix_web::{
    error::{BlockingError, ResponseError},
    http::{header, StatusCode},
    HttpResponse,
};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

use crate::auth::token::TokenError;

/// Message used for every authentication failure, whatever the cause.
pub const CREDENTIALS_ERROR: &str = "Could not validate credentials";

/// Message used for every malformed request.
pub const INVALID_REQUEST: &str = "Invalid request";

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Missing, malformed or expired token, or a token whose user no longer exists (HTTP 401).
    Unauthorized(String),
    /// Malformed request body, query or path, or a failed field rule (HTTP 400).
    ValidationError(String),
    /// A uniqueness constraint was violated, e.g. an email that is already registered (HTTP 409).
    Duplicate(String),
    /// The requested entity does not exist, or is not visible to the caller (HTTP 404).
    NotFound(String),
    /// Hashing or token-encoding failures and other unexpected faults (HTTP 500).
    InternalServerError(String),
    /// Errors raised by the storage layer, propagated unchanged after rollback (HTTP 500).
    DatabaseError(String),
    /// Invalid process configuration detected at startup (HTTP 500 if it ever reaches a handler).
    ConfigurationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            AppError::Duplicate(msg) => write!(f, "Duplicate: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ConfigurationError(msg) => write!(f, "Configuration Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    fn message(&self) -> &str {
        match self {
            AppError::Unauthorized(msg)
            | AppError::ValidationError(msg)
            | AppError::Duplicate(msg)
            | AppError::NotFound(msg)
            | AppError::InternalServerError(msg)
            | AppError::DatabaseError(msg)
            | AppError::ConfigurationError(msg) => msg,
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Duplicate(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_)
            | AppError::DatabaseError(_)
            | AppError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if let AppError::Unauthorized(_) = self {
            builder.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
        }
        // Storage details stay in the logs.
        let message = match self {
            AppError::DatabaseError(_) => "Database error",
            _ => self.message(),
        };
        builder.json(json!({ "error": message }))
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `RowNotFound` becomes `NotFound`; everything else is passed through as a
/// `DatabaseError`. Unique violations are translated by the repositories that
/// expect them, not here.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => {
                log::error!("database error: {}", error);
                AppError::DatabaseError(error.to_string())
            }
        }
    }
}

/// Converts `validator::ValidationErrors` into a generic `AppError::ValidationError`.
///
/// Field-level detail is logged but not returned to the client.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        log::debug!("request validation failed: {}", error);
        AppError::ValidationError(INVALID_REQUEST.into())
    }
}

/// Every token failure collapses into the same `Unauthorized` response.
impl From<TokenError> for AppError {
    fn from(error: TokenError) -> AppError {
        log::debug!("token rejected: {}", error);
        AppError::Unauthorized(CREDENTIALS_ERROR.into())
    }
}

/// The blocking thread pool went away while hashing.
impl From<BlockingError> for AppError {
    fn from(error: BlockingError) -> AppError {
        log::error!("blocking task failed: {}", error);
        AppError::InternalServerError(error.to_string())
    }
}
