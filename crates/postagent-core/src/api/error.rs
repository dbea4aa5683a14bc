use serde::Deserialize;
use thiserror::Error;

/// Text shown for any failure to reach or understand the server.
pub const CONNECTION_ERROR_MESSAGE: &str = "Connection error";

/// Fallback text when the server rejects a login without a `detail`.
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed";

/// Fallback text when the server rejects a registration without a `detail`.
pub const REGISTRATION_FAILED_MESSAGE: &str = "Registration failed";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a credential exchange (login or registration).
///
/// The `Display` output of each variant is exactly what the user sees.
/// Transport details stay in the error source for logging.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The server answered and refused the credentials.
    #[error("{0}")]
    Rejected(String),

    /// The request never completed or the reply could not be read.
    #[error("Connection error")]
    Connection(#[source] BoxError),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

impl AuthError {
    pub fn connection(source: impl Into<BoxError>) -> Self {
        AuthError::Connection(source.into())
    }

    /// Build an error from a non-2xx response body.
    ///
    /// A string `detail` is surfaced verbatim. Anything else (missing, empty,
    /// or a structured validation list) falls back to `fallback`. A body that
    /// is not JSON at all counts as a connection failure.
    pub fn from_error_body(body: &str, fallback: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                detail: Some(serde_json::Value::String(detail)),
            }) if !detail.is_empty() => AuthError::Rejected(detail),
            Ok(_) => AuthError::Rejected(fallback.to_string()),
            Err(e) => AuthError::connection(e),
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, AuthError::Connection(_))
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token may be expired or revoked")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
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

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}
