use std::fmt;

use crate::response::{ApiRequest, ApiResponse};

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum SparkError {
    /// Invalid session configuration (base URL, timeout, credentials).
    #[error("config error: {0}")]
    Config(String),
    /// Call arguments that are neither eligible fields nor transport options.
    #[error("unsupported argument(s): {0}")]
    UnsupportedArgument(String),
    /// Response status outside the expected set.
    #[error("{0}")]
    Api(Box<ApiError>),
    /// A list page that does not honor the `items` contract.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl SparkError {
    /// Returns the HTTP status when this is an [`SparkError::Api`] error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => Some(err.status),
            _ => None,
        }
    }
}

/// Non-nominal response from the Spark API.
#[derive(Clone, Debug)]
pub struct ApiError {
    /// HTTP status code of the response.
    pub status: u16,
    /// The request that produced the response.
    pub request: ApiRequest,
    /// Snapshot of the response.
    pub response: ApiResponse,
    /// `message` field of the response body, empty when absent.
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(request: ApiRequest, response: ApiResponse) -> Self {
        Self {
            status: response.status.as_u16(),
            message: response.message(),
            request,
            response,
        }
    }

    /// Documented meaning of the status code, if Spark documents it.
    pub fn description(&self) -> Option<&'static str> {
        describe_status(self.status)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            let description = self.description().unwrap_or_default();
            write!(f, "response code [{}] - {}", self.status, description)
        } else {
            write!(f, "response code [{}] - {}", self.status, self.message)
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ApiError> for SparkError {
    fn from(err: ApiError) -> Self {
        Self::Api(Box::new(err))
    }
}

/// Spark's documented meaning for common response codes.
pub fn describe_status(status: u16) -> Option<&'static str> {
    let text = match status {
        200 => "OK",
        204 => "Member deleted.",
        400 => {
            "The request was invalid or cannot be otherwise served. \
             An accompanying error message will explain further."
        }
        401 => "Authentication credentials were missing or incorrect.",
        403 => "The request is understood, but it has been refused or access is not allowed.",
        404 => {
            "The URI requested is invalid or the resource requested, such as a user, \
             does not exist. Also returned when the requested format is not supported \
             by the requested method."
        }
        409 => {
            "The request could not be processed because it conflicts with some \
             established rule of the system. For example, a person may not be added \
             to a room more than once."
        }
        429 => "Too many requests have been sent in a given amount of time.",
        500 => "Something went wrong on the server.",
        503 => "Server is overloaded with requests. Try again later.",
        _ => return None,
    };
    Some(text)
}
