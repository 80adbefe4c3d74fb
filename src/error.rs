//! Error types
//!
//! [`ApiError`] describes a rejected or failed Compute API request and knows
//! how to classify itself. [`Error`] is what the lifecycle operations return
//! to the host.

use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;

/// Result alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What went wrong with a single API request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The API answered with a non-success status
    Status(StatusCode),
    /// The request never produced a response (DNS, TLS, connection reset...)
    Transport,
    /// No access token could be obtained
    Auth,
    /// The response body could not be decoded
    Decode,
    /// The request could not be built
    Request,
}

/// A failed Compute API request
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Status(status),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Auth,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Decode,
            message: message.into(),
        }
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Request,
            message: message.into(),
        }
    }

    /// HTTP status of the response, if there was one
    pub fn http_status(&self) -> Option<StatusCode> {
        match self.kind {
            ApiErrorKind::Status(status) => Some(status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.http_status() == Some(StatusCode::NOT_FOUND)
    }

    /// Transport failures, throttling and server errors may succeed when
    /// sent again; everything else is permanent.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ApiErrorKind::Transport => true,
            ApiErrorKind::Status(status) => {
                status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            },
            ApiErrorKind::Auth | ApiErrorKind::Decode | ApiErrorKind::Request => false,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ApiErrorKind::Status(status) => write!(f, "googleapi: {} {}", status, self.message),
            ApiErrorKind::Transport => write!(f, "transport error: {}", self.message),
            ApiErrorKind::Auth => write!(f, "authentication failed: {}", self.message),
            ApiErrorKind::Decode => write!(f, "malformed response: {}", self.message),
            ApiErrorKind::Request => write!(f, "invalid request: {}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}

/// Errors surfaced by the lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "invalid instance group manager specifier {0:?}: expecting either \
         {{projectId}}/{{zone}}/{{name}} or {{name}}, where {{projectId}} and {{zone}} \
         will be derived from the provider"
    )]
    InvalidIdentifier(String),

    #[error("invalid instance group manager import id {0:?}: expecting {{projectId}}/{{zone}}/{{name}}")]
    InvalidImportId(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no {0} configured: set it on the resource or in the provider configuration")]
    MissingContext(&'static str),

    #[error("changing {field} requires replacing instance group manager {name}")]
    RequiresReplacement { name: String, field: &'static str },

    #[error("{context}: {source}")]
    Api {
        context: String,
        #[source]
        source: ApiError,
    },

    #[error("{activity}: operation {operation} failed: {message}")]
    Operation {
        activity: String,
        operation: String,
        message: String,
    },

    #[error("{activity}: timeout while waiting for operation {operation} after {elapsed:?}")]
    OperationTimeout {
        activity: String,
        operation: String,
        elapsed: Duration,
    },

    #[error("instance group {name} isn't shrinking during delete ({current} instances, previously {previous})")]
    NotShrinking {
        name: String,
        current: i64,
        previous: i64,
    },

    #[error("waiting for instances of {name}: {message}")]
    WaitForInstances { name: String, message: String },

    /// The insert request was accepted but the operation did not complete
    /// successfully. `id` identifies the resource that may now exist.
    #[error("instance group manager {id} was created but did not become ready: {source}")]
    Created {
        id: String,
        #[source]
        source: Box<Error>,
    },

    #[error("instance group manager {0} disappeared right after it was written")]
    GoneAfterWrite(String),
}

impl Error {
    pub fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn api(context: impl Into<String>, source: ApiError) -> Self {
        Self::Api {
            context: context.into(),
            source,
        }
    }

    /// True when an operation wait gave up because its timeout elapsed
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::OperationTimeout { .. } => true,
            Self::Created { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { source, .. } if source.is_not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ApiError::transport("connection reset").is_retryable());
        assert!(ApiError::status(StatusCode::SERVICE_UNAVAILABLE, "busy").is_retryable());
        assert!(ApiError::status(StatusCode::TOO_MANY_REQUESTS, "slow down").is_retryable());
        assert!(!ApiError::status(StatusCode::BAD_REQUEST, "bad").is_retryable());
        assert!(!ApiError::status(StatusCode::NOT_FOUND, "gone").is_retryable());
        assert!(!ApiError::auth("no credentials").is_retryable());
    }

    #[test]
    fn test_not_found_through_context() {
        let err = Error::api("reading", ApiError::status(StatusCode::NOT_FOUND, "gone"));
        assert!(err.is_not_found());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_timeout_message_mentions_timeout() {
        let err = Error::OperationTimeout {
            activity: "Deleting InstanceGroupManager".into(),
            operation: "operation-1".into(),
            elapsed: Duration::from_secs(5),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("timeout"));
    }
}
