//! Domain errors and the stable codes they map to on the wire.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("{column}: {message}")]
    Validation {
        column: &'static str,
        message: String,
    },

    #[error("username already exists, please choose a different username")]
    DuplicateUsername,

    #[error("please select a record")]
    NoSelection,

    #[error("selected row {index} is out of range ({len} rows)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

impl AppError {
    pub fn validation(column: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            column,
            message: message.into(),
        }
    }

    /// Stable wire code used in IPC error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Storage(_) => "db_query_failed",
            AppError::Validation { .. } => "validation_failed",
            AppError::DuplicateUsername => "duplicate_username",
            AppError::NoSelection => "no_selection",
            AppError::IndexOutOfRange { .. } => "index_out_of_range",
            AppError::PasswordHash(_) => "hash_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Validation { column, .. } => Some(serde_json::json!({ "column": column })),
            AppError::IndexOutOfRange { index, len } => {
                Some(serde_json::json!({ "index": index, "len": len }))
            }
            _ => None,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
