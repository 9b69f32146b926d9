use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum RunnerApiError {
    MissingBearerToken,
    InvalidBaseUrl(String),
    InvalidHeader(String),
    /// The service could not be reached at all (connect failure or timeout).
    Unreachable(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Serde(JsonError),
}

impl RunnerApiError {
    /// True when the request never produced an HTTP response.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Request(_))
    }

    /// True when the service rejected the bearer credential.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(
            self,
            Self::Status(status, _) if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(status, _) => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(default)]
    pub error: Option<ErrorField>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorField {
    Text(String),
    Detailed {
        #[serde(default)]
        message: Option<String>,
    },
}

impl ErrorPayload {
    fn message_or_fallback(&self) -> Option<String> {
        let from_error = match &self.error {
            Some(ErrorField::Text(text)) => non_empty_string(text),
            Some(ErrorField::Detailed { message }) => message.as_deref().and_then(non_empty_string),
            None => None,
        };

        from_error
            .or_else(|| self.message.as_deref().and_then(non_empty_string))
            .map(str::to_owned)
    }
}

impl fmt::Display for RunnerApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBearerToken => write!(f, "bearer token is required"),
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::Unreachable(message) => write!(f, "service unreachable: {message}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
        }
    }
}

impl std::error::Error for RunnerApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            Self::Serde(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RunnerApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::Unreachable(error.to_string())
        } else {
            Self::Request(error)
        }
    }
}

impl From<JsonError> for RunnerApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Extracts a human-readable message from a non-success response body.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(message) = payload.message_or_fallback() {
            return message;
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

fn non_empty_string(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
