//! Error types for Trackit
//!
//! All errors use thiserror for structured error handling.
//! Archive defects get their own enum so callers can tell them apart,
//! while the HTTP layer reports them with a single message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("{0}")]
    Validation(String),

    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("Tracker not found")]
    TrackerNotFound(i64),

    #[error("Log not found")]
    LogNotFound(i64),

    #[error("Malformed archive: {0}")]
    MalformedArchive(#[from] ArchiveError),

    #[error("{0}")]
    Generic(String),
}

/// Reasons an uploaded archive cannot be imported
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    #[error("{filename} is not a .zip file")]
    NotZip { filename: String },

    #[error("archive could not be read: {0}")]
    Unreadable(String),

    #[error("archive has no metadata.json")]
    MissingMetadata,

    #[error("metadata.json is invalid: {0}")]
    InvalidMetadata(String),

    #[error("metadata.json has no entry for tracker {id}")]
    MissingTrackerMetadata { id: String },

    #[error("{entry} is not valid UTF-8")]
    NotUtf8 { entry: String },

    #[error("entry name {0} does not match name_id.csv")]
    BadEntryName(String),

    #[error("{entry} line {line}: expected timestamp,value,note")]
    BadRow { entry: String, line: usize },
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::TrackerNotFound(_) | AppError::LogNotFound(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::MalformedArchive(_) => (StatusCode::BAD_REQUEST, "Import failed".to_string()),
            _ => {
                tracing::error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Operation failed".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
