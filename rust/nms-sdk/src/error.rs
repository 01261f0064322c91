use std::fmt;
use thiserror::Error;

/// Fallback message when a listing failure carries nothing readable.
pub const DEFAULT_FETCH_ERROR: &str = "error retrieving subscribers";

/// Fallback message when a write failure carries nothing readable.
pub const DEFAULT_WRITE_ERROR: &str = "error saving subscribers";

pub type Result<T> = std::result::Result<T, SubscriberError>;

/// Failures raised by a [`SubscriberApi`](crate::SubscriberApi) implementation.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// Message suitable for an operator, falling back to `fallback` when the
    /// failure has no text of its own.
    pub fn user_message(&self, fallback: &str) -> String {
        let message = match self {
            ApiError::Status { message, .. } => message.trim().to_string(),
            other => other.to_string().trim().to_string(),
        };
        if message.is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }
}

/// A validation failure for one row of a write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row: usize,
    pub id: String,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error saving {} : {}", self.id, self.message)
    }
}

#[derive(Error, Debug)]
pub enum SubscriberError {
    #[error("{0}")]
    Fetch(String),

    #[error("{}", format_rows(.0))]
    Validation(Vec<RowError>),

    #[error("{message} ({succeeded} subscribers saved before the failure)")]
    PartialBatch { succeeded: usize, message: String },

    #[error("error saving {id} : {message}")]
    Write { id: String, message: String },

    #[error("subscriber id cannot change: {key} != {id}")]
    KeyMismatch { key: String, id: String },

    #[error("subscriber {0} not found")]
    NotFound(String),

    #[error("request superseded by a newer query")]
    Superseded,
}

impl SubscriberError {
    pub(crate) fn fetch(err: &ApiError) -> Self {
        SubscriberError::Fetch(err.user_message(DEFAULT_FETCH_ERROR))
    }

    pub(crate) fn write(id: impl Into<String>, err: &ApiError) -> Self {
        SubscriberError::Write {
            id: id.into(),
            message: err.user_message(DEFAULT_WRITE_ERROR),
        }
    }

    /// Row-level errors when this is a validation failure.
    pub fn row_errors(&self) -> &[RowError] {
        match self {
            SubscriberError::Validation(rows) => rows,
            _ => &[],
        }
    }
}

fn format_rows(rows: &[RowError]) -> String {
    rows.iter()
        .map(|row| row.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
