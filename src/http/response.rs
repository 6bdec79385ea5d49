//! Deny responses.
//!
//! Exactly one plain-text response per denied request: the mapped status and
//! a short message. Internal failures carry the generic text only.

use axum::response::{IntoResponse, Response};

use crate::auth::GateError;

pub fn deny_response(error: &GateError) -> Response {
    (error.status(), error.to_string()).into_response()
}
