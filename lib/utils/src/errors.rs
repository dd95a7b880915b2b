use http::status::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::ValidationError;

const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong.";
const FORBIDDEN_MESSAGE: &str = "You're in a restricted area, please do not resist.";
const NOT_FOUND_MESSAGE: &str = "There's nothing here.";
const ALREADY_RESOLVED_MESSAGE: &str = "This has already been resolved.";

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppError {
    #[error("persistence error: {0}")]
    PersistenceError(String),
    #[error("repository error in {operation}: {message}")]
    RepositoryError {
        operation: String,
        message: String,
    },
    #[error("aggregation error: {0}")]
    AggregationError(String),
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("already resolved")]
    AlreadyResolved,
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::PersistenceError(_) | AppError::RepositoryError { .. } | AppError::AggregationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::AlreadyResolved => StatusCode::CONFLICT,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message that can be shown to the caller, storage details are never part of it.
    pub fn user_message(&self) -> String {
        match self {
            AppError::PersistenceError(_) | AppError::RepositoryError { .. } | AppError::AggregationError(_) => String::from(INTERNAL_ERROR_MESSAGE),
            AppError::NotFound => String::from(NOT_FOUND_MESSAGE),
            AppError::Forbidden => String::from(FORBIDDEN_MESSAGE),
            AppError::AlreadyResolved => String::from(ALREADY_RESOLVED_MESSAGE),
            AppError::InvalidInput(message) => message.clone(),
        }
    }

    /// Constructs a new [`AppError::InvalidInput`] from some other type.
    pub fn invalid(msg: impl ToString) -> Self {
        Self::InvalidInput(msg.to_string())
    }

    /// Wraps a failed read query, keeping the name of the operation that failed.
    pub fn repository(operation: &str, error: sqlx::Error) -> Self {
        Self::RepositoryError {
            operation: String::from(operation),
            message: error.to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound,
            _ => AppError::PersistenceError(error.to_string()),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(error: ValidationError) -> Self {
        match error.message {
            Some(message) => AppError::InvalidInput(message.to_string()),
            None => AppError::InvalidInput(error.code.to_string()),
        }
    }
}
