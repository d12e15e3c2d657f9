//! Typed error taxonomy for the framework
//!
//! Every failure a derived operation can produce carries a machine-readable
//! kind plus a human-readable message. Validation errors are always returned
//! as structured per-field detail; storage and timeout failures are surfaced
//! generically to callers and logged with full detail server-side.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// One field-level validation failure.
///
/// Validation aggregates all failures instead of stopping at the first, so a
/// client can fix everything in one round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// All failures the framework can produce.
#[derive(Debug)]
pub enum FrameworkError {
    /// Spec rejected at registration (fatal, process start only)
    InvalidSpec { kind: String, message: String },

    /// Kind already registered
    DuplicateKind { kind: String },

    /// Registration attempted after the registry was frozen
    RegistryFrozen,

    /// Caller referenced an unregistered kind
    UnknownKind { kind: String },

    /// Caller filtered on a field with no column mapping
    UnknownFilter { kind: String, field: String },

    /// Filter query string is not a JSON object of field/value pairs
    MalformedFilter,

    /// Operation requires an authenticated actor
    Unauthenticated,

    /// Actor exceeded the per-kind rate limit
    RateLimited { retry_after: Duration },

    /// Ownership violation
    Forbidden { kind: String, id: Uuid },

    /// Aggregated per-field validation failures
    Validation(Vec<FieldError>),

    /// Record does not exist
    NotFound { kind: String, id: Uuid },

    /// Storage backend failure (retry policy belongs to the caller)
    Storage(String),

    /// Operation exceeded its bounded timeout; outcome unknown
    Timeout { operation: &'static str },

    /// Framework bug surfaced as an error rather than a panic
    Internal(String),
}

impl fmt::Display for FrameworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameworkError::InvalidSpec { kind, message } => {
                write!(f, "Invalid spec for kind '{}': {}", kind, message)
            }
            FrameworkError::DuplicateKind { kind } => {
                write!(f, "Kind '{}' is already registered", kind)
            }
            FrameworkError::RegistryFrozen => {
                write!(f, "Spec registry is frozen; registration is startup-only")
            }
            FrameworkError::UnknownKind { kind } => write!(f, "Unknown kind '{}'", kind),
            FrameworkError::UnknownFilter { kind, field } => {
                write!(f, "Unknown filter field '{}' for kind '{}'", field, kind)
            }
            FrameworkError::MalformedFilter => {
                write!(f, "Filter must be a JSON object of field/value pairs")
            }
            FrameworkError::Unauthenticated => write!(f, "Authentication required"),
            FrameworkError::RateLimited { retry_after } => {
                write!(f, "Rate limited; retry after {}ms", retry_after.as_millis())
            }
            FrameworkError::Forbidden { kind, id } => {
                write!(f, "Not the owner of {} '{}'", kind, id)
            }
            FrameworkError::Validation(errors) => {
                write!(f, "Validation failed for {} field(s)", errors.len())
            }
            FrameworkError::NotFound { kind, id } => write!(f, "No {} with id '{}'", kind, id),
            FrameworkError::Storage(_) => write!(f, "Storage failure"),
            FrameworkError::Timeout { operation } => {
                write!(f, "Operation '{}' timed out; outcome unknown", operation)
            }
            FrameworkError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for FrameworkError {}

/// Failure envelope body: `{"error": {"kind", "message", ...}}`
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error kind
    pub kind: &'static str,
    /// Human-readable message
    pub message: String,
    /// Per-field detail for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
    /// Retry hint for rate-limited requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u128>,
}

impl FrameworkError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            FrameworkError::InvalidSpec { .. }
            | FrameworkError::DuplicateKind { .. }
            | FrameworkError::RegistryFrozen
            | FrameworkError::Storage(_)
            | FrameworkError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FrameworkError::UnknownKind { .. } | FrameworkError::NotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            FrameworkError::UnknownFilter { .. }
            | FrameworkError::MalformedFilter
            | FrameworkError::Validation(_) => StatusCode::BAD_REQUEST,
            FrameworkError::Unauthenticated => StatusCode::UNAUTHORIZED,
            FrameworkError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            FrameworkError::Forbidden { .. } => StatusCode::FORBIDDEN,
            FrameworkError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Machine-readable error kind.
    pub fn error_kind(&self) -> &'static str {
        match self {
            FrameworkError::InvalidSpec { .. } => "INVALID_SPEC",
            FrameworkError::DuplicateKind { .. } => "DUPLICATE_KIND",
            FrameworkError::RegistryFrozen => "REGISTRY_FROZEN",
            FrameworkError::UnknownKind { .. } => "UNKNOWN_KIND",
            FrameworkError::UnknownFilter { .. } => "UNKNOWN_FILTER",
            FrameworkError::MalformedFilter => "MALFORMED_FILTER",
            FrameworkError::Unauthenticated => "UNAUTHENTICATED",
            FrameworkError::RateLimited { .. } => "RATE_LIMITED",
            FrameworkError::Forbidden { .. } => "FORBIDDEN",
            FrameworkError::Validation(_) => "VALIDATION_ERROR",
            FrameworkError::NotFound { .. } => "NOT_FOUND",
            FrameworkError::Storage(_) => "STORAGE_ERROR",
            FrameworkError::Timeout { .. } => "TIMEOUT",
            FrameworkError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Build the failure envelope for this error.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let fields = match self {
            FrameworkError::Validation(errors) => Some(errors.clone()),
            _ => None,
        };
        let retry_after_ms = match self {
            FrameworkError::RateLimited { retry_after } => Some(retry_after.as_millis()),
            _ => None,
        };
        ErrorEnvelope {
            error: ErrorBody {
                kind: self.error_kind(),
                message: self.to_string(),
                fields,
                retry_after_ms,
            },
        }
    }
}

impl IntoResponse for FrameworkError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_envelope());
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            FrameworkError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            FrameworkError::RateLimited {
                retry_after: Duration::from_secs(1)
            }
            .status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            FrameworkError::Forbidden {
                kind: "widget".to_string(),
                id: Uuid::new_v4()
            }
            .status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            FrameworkError::Validation(vec![]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FrameworkError::MalformedFilter.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FrameworkError::Timeout { operation: "list" }.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            FrameworkError::Storage("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_timeout_distinct_from_storage() {
        // Callers use the kind to tell "retry is safe" from "outcome unknown"
        assert_ne!(
            FrameworkError::Storage("x".to_string()).error_kind(),
            FrameworkError::Timeout { operation: "list" }.error_kind()
        );
    }

    #[test]
    fn test_validation_envelope_has_field_detail() {
        let err = FrameworkError::Validation(vec![
            FieldError::new("name", "required"),
            FieldError::new("color", "not in allowed set"),
        ]);
        let envelope = err.to_envelope();
        assert_eq!(envelope.error.kind, "VALIDATION_ERROR");
        let fields = envelope.error.fields.unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field, "name");
    }

    #[test]
    fn test_rate_limited_envelope_has_retry_hint() {
        let err = FrameworkError::RateLimited {
            retry_after: Duration::from_millis(1500),
        };
        let envelope = err.to_envelope();
        assert_eq!(envelope.error.retry_after_ms, Some(1500));
    }

    #[test]
    fn test_storage_message_not_leaked() {
        let err = FrameworkError::Storage("connection refused to 10.0.0.1".to_string());
        assert!(!err.to_string().contains("10.0.0.1"));
    }
}
