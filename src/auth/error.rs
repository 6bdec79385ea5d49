//! Error taxonomy for the decision pipeline.

use axum::http::StatusCode;
use thiserror::Error;

use crate::security::CanonicalizeError;

/// Failure reported by an [`AuthManager`](crate::auth::AuthManager).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    /// The request is shaped wrong, e.g. an unsupported credential format.
    #[error("{0}")]
    MalformedInput(String),

    #[error("{0}")]
    Internal(String),
}

/// Why the gate denied a request. Each variant maps to exactly one status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("invalid encoded sequence in request path")]
    MalformedEncoding,

    #[error("request path escapes root")]
    PathEscapesRoot,

    #[error(
        "Invalid server identity key or value, please set `auth.server_identity_key` and \
         `auth.server_identity_value`, or enable `auth.enable_user_agent_auth_white`"
    )]
    IdentityNotConfigured,

    #[error("Not found method for path {method} {path}")]
    RouteNotFound { method: String, path: String },

    #[error("resource name invalid!")]
    InvalidResourceName,

    #[error("{message}")]
    AccessDenied { message: String },

    #[error("{message}")]
    MalformedInput { message: String },

    /// Detail is for the log only; the response carries the generic text.
    #[error("Server failed, internal error")]
    Internal { detail: String },
}

impl GateError {
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::MalformedEncoding
            | GateError::PathEscapesRoot
            | GateError::MalformedInput { .. } => StatusCode::BAD_REQUEST,
            GateError::IdentityNotConfigured
            | GateError::InvalidResourceName
            | GateError::AccessDenied { .. } => StatusCode::FORBIDDEN,
            GateError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GateError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GateError::MalformedEncoding => "malformed_encoding",
            GateError::PathEscapesRoot => "path_escapes_root",
            GateError::IdentityNotConfigured => "identity_not_configured",
            GateError::RouteNotFound { .. } => "route_not_found",
            GateError::InvalidResourceName => "invalid_resource_name",
            GateError::AccessDenied { .. } => "access_denied",
            GateError::MalformedInput { .. } => "malformed_input",
            GateError::Internal { .. } => "internal",
        }
    }
}

impl From<AuthError> for GateError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated(message) | AuthError::Forbidden(message) => {
                GateError::AccessDenied { message }
            }
            AuthError::MalformedInput(message) => GateError::MalformedInput { message },
            AuthError::Internal(detail) => GateError::Internal { detail },
        }
    }
}

impl From<CanonicalizeError> for GateError {
    fn from(err: CanonicalizeError) -> Self {
        match err {
            CanonicalizeError::MalformedEncoding { .. } => GateError::MalformedEncoding,
            CanonicalizeError::PathEscapesRoot => GateError::PathEscapesRoot,
        }
    }
}
