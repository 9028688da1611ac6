use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// The request an error came from, rendered into the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetBookmark,
    DeleteBookmark,
    GetTags,
    Search,
    Check,
    GetUserProfile,
    TestConnection,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Operation::GetBookmark => "retrieving bookmark",
            Operation::DeleteBookmark => "deleting bookmark",
            Operation::GetTags => "loading tags",
            Operation::Search => "searching bookmarks",
            Operation::Check => "checking bookmark URL",
            Operation::GetUserProfile => "retrieving user profile",
            Operation::TestConnection => "testing connection",
        };
        f.write_str(action)
    }
}

/// Errors from the linkding API. `Display` is the message shown to users.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Error {operation}: {}", status_text(.status))]
    Status {
        operation: Operation,
        status: StatusCode,
    },

    /// The server rejected a bookmark; `body` holds its field errors.
    #[error("Validation error: {body}")]
    Validation { body: serde_json::Value },

    #[error("Request error: {}", status_text(.status))]
    Request { status: StatusCode },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Reason phrase for a status, empty for unregistered codes.
fn status_text(status: &StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("")
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// HTTP status behind the error, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } | ApiError::Request { status } => Some(*status),
            ApiError::Validation { .. } => Some(StatusCode::BAD_REQUEST),
            ApiError::NetworkError(e) => e.status(),
            ApiError::InvalidResponse(_) => None,
        }
    }
}
