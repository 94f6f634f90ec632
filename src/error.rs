use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use tracing::error;

use crate::response;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// Builds a mapper that logs the underlying failure and surfaces only
    /// `message` to the caller.
    ///
    /// ```ignore
    /// state.posts.find_posts().await.map_err(AppError::internal("Failed to fetch blogs"))?;
    /// ```
    pub fn internal<E: std::fmt::Display>(message: &'static str) -> impl FnOnce(E) -> AppError {
        move |err| {
            error!("{}: {}", message, err);
            AppError::Internal(message.to_string())
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Database(e) => {
                error!("Unhandled database error: {}", e);
                "Internal server error".to_string()
            }
            AppError::ConfigError(e) => {
                error!("Configuration error at request time: {}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        response::failure(self.status_code(), message)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failures reported by a document store implementation.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Duplicate record")]
    Duplicate,
}

impl From<mongodb::error::Error> for DatabaseError {
    fn from(err: mongodb::error::Error) -> Self {
        DatabaseError::QueryError(err.to_string())
    }
}
