//! Error taxonomy for calls against the ordering API.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered 403: the session token is no longer accepted.
    #[error("session expired or not authorized")]
    Unauthorized,

    #[error("resource not found")]
    NotFound,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Map a non-success status to its error, keeping the body for diagnostics.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::FORBIDDEN => ApiError::Unauthorized,
            StatusCode::NOT_FOUND => ApiError::NotFound,
            _ => ApiError::Status { status, body },
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Tagged result for listing operations where HTTP 404 means "nothing yet"
/// and HTTP 403 means "signed out".
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Data(T),
    Empty,
    Unauthorized,
    Failure(String),
}

impl<T> Outcome<T> {
    pub fn from_result(result: ApiResult<T>) -> Self {
        match result {
            Ok(data) => Outcome::Data(data),
            Err(ApiError::NotFound) => Outcome::Empty,
            Err(ApiError::Unauthorized) => Outcome::Unauthorized,
            Err(err) => Outcome::Failure(err.to_string()),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Outcome::Unauthorized)
    }

    /// Text to show the user, or `None` when there is data to render.
    /// `empty` is the listing-specific message for the no-data case.
    pub fn user_message(&self, empty: &'static str) -> Option<&'static str> {
        match self {
            Outcome::Data(_) => None,
            Outcome::Empty => Some(empty),
            Outcome::Unauthorized => Some(SIGN_IN_PROMPT),
            Outcome::Failure(_) => Some(GENERIC_FAILURE),
        }
    }
}

pub const SIGN_IN_PROMPT: &str = "Please sign in first to view or place an order.";
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again later.";
