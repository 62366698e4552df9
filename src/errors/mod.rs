//! Error handling module for the ID card backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::card::CardError;
use crate::roster::allocator::AllocationExhausted;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const EMPLOYEE_NOT_FOUND: &str = "EMPLOYEE_NOT_FOUND";
    pub const ENCODING_CAPACITY_EXCEEDED: &str = "ENCODING_CAPACITY_EXCEEDED";
    pub const ALLOCATION_EXHAUSTED: &str = "ALLOCATION_EXHAUSTED";
    pub const PERSISTENCE_ERROR: &str = "PERSISTENCE_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Admin secret missing or wrong
    #[error("{0}")]
    Unauthorized(String),
    /// Form field rejected
    #[error("{0}")]
    Validation(String),
    /// Malformed request body
    #[error("{0}")]
    BadRequest(String),
    /// No roster entry carries this identifier
    #[error("No employee found with ID {0}")]
    EmployeeNotFound(String),
    /// The QR payload does not fit any QR version
    #[error("QR payload of {0} bytes exceeds the code capacity")]
    EncodingCapacityExceeded(usize),
    /// Every identifier under the prefix is taken
    #[error("Identifier space exhausted for prefix {0}")]
    AllocationExhausted(String),
    /// Load/save against durable storage failed
    #[error("{0}")]
    Persistence(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::EmployeeNotFound(_) => StatusCode::NOT_FOUND,
            AppError::EncodingCapacityExceeded(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::AllocationExhausted(_) => StatusCode::CONFLICT,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
            AppError::EmployeeNotFound(_) => codes::EMPLOYEE_NOT_FOUND,
            AppError::EncodingCapacityExceeded(_) => codes::ENCODING_CAPACITY_EXCEEDED,
            AppError::AllocationExhausted(_) => codes::ALLOCATION_EXHAUSTED,
            AppError::Persistence(_) => codes::PERSISTENCE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Persistence(format!("Database error: {}", err))
    }
}

impl From<CardError> for AppError {
    fn from(err: CardError) -> Self {
        match err {
            CardError::EncodingCapacityExceeded { payload_len } => {
                AppError::EncodingCapacityExceeded(payload_len)
            }
            other => {
                tracing::error!("Card rendering error: {:?}", other);
                AppError::Internal(format!("Card rendering error: {}", other))
            }
        }
    }
}

impl From<AllocationExhausted> for AppError {
    fn from(err: AllocationExhausted) -> Self {
        tracing::error!("{}", err);
        AppError::AllocationExhausted(err.prefix)
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
