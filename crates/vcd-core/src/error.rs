//! Error types for vCloud Director operations.
//!
//! This module provides the error vocabulary shared by every vCD crate: the
//! resolution and task-completion outcomes (`NotFound`, `Ambiguous`,
//! `TaskFailed`, `Cancelled`), version negotiation failures, and the transport
//! classes produced when mapping HTTP responses.

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Main error type for vCD operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A lookup found no matching entity
    #[error("Not found: {0}")]
    NotFound(String),

    /// A lookup by name matched more than one entity
    #[error("Ambiguous {kind} '{identifier}': {matches} entities match")]
    Ambiguous {
        /// Entity kind being looked up (e.g. "catalog")
        kind: String,
        /// Identifier supplied by the caller
        identifier: String,
        /// Number of matching entities
        matches: usize,
    },

    /// A task reached a failed terminal state
    #[error("Task failed: {message}")]
    TaskFailed {
        /// Message reported by the server, unmodified
        message: String,
    },

    /// The caller cancelled a wait before the task finished
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The connected server is older than the endpoint requires
    #[error(
        "Endpoint '{endpoint}' requires API version {required_version}, server supports {server_version}"
    )]
    UnsupportedEndpoint {
        /// Logical endpoint identifier
        endpoint: String,
        /// Minimum version the endpoint needs
        required_version: String,
        /// Highest version the server advertises
        server_version: String,
    },

    /// No minimum version is registered for an endpoint
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// vCD service is unavailable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Server returned a 5xx status not covered by `ServiceUnavailable`
    #[error("Server error: {0}")]
    ServerError(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Operation timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Failed to parse a response document
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid identifier (URN, UUID or HREF)
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    /// Invalid API version string
    #[error("Invalid API version: {0}")]
    InvalidVersion(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid endpoint URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication or authorization failure
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Conflict error
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Specialized result type for vCD operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error response for serialization.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
    /// Optional request ID for tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail structure.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorDetail {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Ambiguous { .. } => "AMBIGUOUS",
            Self::TaskFailed { .. } => "TASK_FAILED",
            Self::Cancelled(_) => "CANCELLED",
            Self::UnsupportedEndpoint { .. } => "UNSUPPORTED_ENDPOINT",
            Self::UnknownEndpoint(_) => "UNKNOWN_ENDPOINT",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::ServerError(_) => "SERVER_ERROR",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::InvalidId(_) => "INVALID_ID",
            Self::InvalidVersion(_) => "INVALID_VERSION",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Conflict(_) => "CONFLICT",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Converts the error into an `ErrorResponse`.
    #[must_use]
    pub fn into_error_response(self) -> ErrorResponse {
        self.into_error_response_with_id(None)
    }

    /// Converts the error into an `ErrorResponse` with a request ID.
    #[must_use]
    pub fn into_error_response_with_id(self, request_id: Option<String>) -> ErrorResponse {
        let details = match &self {
            Self::UnsupportedEndpoint {
                endpoint,
                required_version,
                server_version,
            } => Some(serde_json::json!({
                "endpoint": endpoint,
                "required_version": required_version,
                "server_version": server_version,
            })),
            Self::Ambiguous {
                kind,
                identifier,
                matches,
            } => Some(serde_json::json!({
                "kind": kind,
                "identifier": identifier,
                "matches": matches,
            })),
            _ => None,
        };

        ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details,
            },
            request_id,
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::InternalError(_) | Self::ConfigError(_) | Self::ServerError(_)
        )
    }

    /// Returns true for the "zero matches" outcome of a lookup.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true when the server answered with a 5xx class failure.
    #[must_use]
    pub const fn is_server_side(&self) -> bool {
        matches!(self, Self::ServerError(_) | Self::ServiceUnavailable(_))
    }
}

/// Map a non-success HTTP status and body text to an [`Error`].
#[must_use]
pub fn map_status_to_error(status: StatusCode, text: String) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(text),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Unauthorized(format!("vCD authentication failed: {text}"))
        }
        StatusCode::BAD_REQUEST => Error::InvalidRequest(text),
        StatusCode::CONFLICT => Error::Conflict(text),
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => {
            Error::ServiceUnavailable(format!("vCD temporarily unavailable: {text}"))
        }
        status if status.is_server_error() => {
            Error::ServerError(format!("vCD server error {status}: {text}"))
        }
        _ => Error::HttpError(format!("vCD error {status}: {text}")),
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<uuid::Error> for Error {
    fn from(err: uuid::Error) -> Self {
        Self::InvalidId(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::NotFound("x".into()).error_code(), "NOT_FOUND");
        assert_eq!(
            Error::Ambiguous {
                kind: "catalog".into(),
                identifier: "cat".into(),
                matches: 2
            }
            .error_code(),
            "AMBIGUOUS"
        );
        assert_eq!(
            Error::TaskFailed {
                message: "boom".into()
            }
            .error_code(),
            "TASK_FAILED"
        );
        assert_eq!(Error::Cancelled("x".into()).error_code(), "CANCELLED");
        assert_eq!(
            Error::UnsupportedEndpoint {
                endpoint: "1.0.0/edgeGateways/".into(),
                required_version: "34.0".into(),
                server_version: "33.0".into(),
            }
            .error_code(),
            "UNSUPPORTED_ENDPOINT"
        );
        assert_eq!(
            Error::UnknownEndpoint("x".into()).error_code(),
            "UNKNOWN_ENDPOINT"
        );
        assert_eq!(Error::ServerError("x".into()).error_code(), "SERVER_ERROR");
        assert_eq!(Error::InvalidId("x".into()).error_code(), "INVALID_ID");
        assert_eq!(
            Error::InvalidVersion("x".into()).error_code(),
            "INVALID_VERSION"
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::TaskFailed {
            message: "disk quota exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "Task failed: disk quota exceeded");

        let err = Error::UnsupportedEndpoint {
            endpoint: "1.0.0/auditTrail/".to_string(),
            required_version: "33.0".to_string(),
            server_version: "30.0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Endpoint '1.0.0/auditTrail/' requires API version 33.0, server supports 30.0"
        );

        let err = Error::Ambiguous {
            kind: "vdc".to_string(),
            identifier: "dev".to_string(),
            matches: 3,
        };
        assert_eq!(err.to_string(), "Ambiguous vdc 'dev': 3 entities match");
    }

    #[test]
    fn test_into_error_response() {
        let err = Error::NotFound("catalog-1".to_string());
        let response = err.clone().into_error_response();

        assert_eq!(response.error.code, "NOT_FOUND");
        assert_eq!(response.error.message, "Not found: catalog-1");
        assert!(response.error.details.is_none());
        assert!(response.request_id.is_none());

        let response_with_id = err.into_error_response_with_id(Some("req-456".to_string()));
        assert_eq!(response_with_id.request_id, Some("req-456".to_string()));
    }

    #[test]
    fn test_unsupported_endpoint_response_has_details() {
        let response = Error::UnsupportedEndpoint {
            endpoint: "1.0.0/edgeGateways/".to_string(),
            required_version: "34.0".to_string(),
            server_version: "32.0".to_string(),
        }
        .into_error_response();

        let details = response.error.details.unwrap();
        assert_eq!(details["required_version"], "34.0");
        assert_eq!(details["server_version"], "32.0");
    }

    #[test]
    fn test_should_log() {
        assert!(Error::InternalError("test".to_string()).should_log());
        assert!(Error::ConfigError("test".to_string()).should_log());
        assert!(Error::ServerError("test".to_string()).should_log());

        assert!(!Error::NotFound("test".to_string()).should_log());
        assert!(!Error::Cancelled("test".to_string()).should_log());
    }

    #[test]
    fn test_map_status_to_error() {
        assert!(matches!(
            map_status_to_error(StatusCode::NOT_FOUND, "gone".into()),
            Error::NotFound(_)
        ));
        assert!(matches!(
            map_status_to_error(StatusCode::FORBIDDEN, "no".into()),
            Error::Unauthorized(_)
        ));
        assert!(matches!(
            map_status_to_error(StatusCode::SERVICE_UNAVAILABLE, "busy".into()),
            Error::ServiceUnavailable(_)
        ));
        assert!(matches!(
            map_status_to_error(StatusCode::INTERNAL_SERVER_ERROR, "oops".into()),
            Error::ServerError(_)
        ));
        assert!(matches!(
            map_status_to_error(StatusCode::IM_A_TEAPOT, "tea".into()),
            Error::HttpError(_)
        ));
    }

    #[test]
    fn test_is_server_side() {
        assert!(Error::ServerError("x".into()).is_server_side());
        assert!(Error::ServiceUnavailable("x".into()).is_server_side());
        assert!(!Error::NotFound("x".into()).is_server_side());
    }

    #[test]
    fn test_from_url_parse_error() {
        let err = url::Url::parse("not a url").unwrap_err();
        let vcd_err: Error = err.into();
        assert!(matches!(vcd_err, Error::InvalidEndpoint(_)));
    }

    #[test]
    fn test_from_uuid_error() {
        let err = uuid::Uuid::parse_str("not-a-uuid").unwrap_err();
        let vcd_err: Error = err.into();
        assert_eq!(vcd_err.error_code(), "INVALID_ID");
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let vcd_err: Error = err.into();
        assert!(matches!(vcd_err, Error::ParseError(_)));
    }

    #[test]
    fn test_error_response_serialization_no_request_id() {
        let response = Error::Cancelled("wait".into()).into_error_response();
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("CANCELLED"));
        assert!(!json.contains("request_id"));
        assert!(!json.contains("details"));
    }
}
