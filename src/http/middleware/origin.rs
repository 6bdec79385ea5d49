//! Cross-origin guard.
//!
//! When enabled, a request carrying an `Origin` header must name the same
//! origin the request was sent to. Requests without `Origin` pass.

use std::str::FromStr;

use axum::{
    body::Body,
    extract::State,
    http::{header, uri::Authority, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;
use crate::security::origin::{is_same_origin, is_valid_origin};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

pub async fn origin_guard(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.security.reject_cross_origin {
        return next.run(request).await;
    }

    match check_origin(&request) {
        Ok(()) => next.run(request).await,
        Err(message) => {
            tracing::warn!(
                origin = ?request.headers().get(header::ORIGIN),
                host = ?request.headers().get(header::HOST),
                "Rejected cross-origin request"
            );
            (StatusCode::FORBIDDEN, message).into_response()
        }
    }
}

fn check_origin(request: &Request<Body>) -> Result<(), &'static str> {
    let Some(origin) = request.headers().get(header::ORIGIN) else {
        return Ok(());
    };
    let origin = origin.to_str().map_err(|_| "Invalid origin")?;
    if !is_valid_origin(origin) {
        return Err("Invalid origin");
    }

    let scheme = request
        .headers()
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let authority = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| Authority::from_str(h).ok())
        .or_else(|| request.uri().authority().cloned());

    let Some(authority) = authority else {
        return Err("Cross-origin request blocked");
    };
    let port = authority
        .port_u16()
        .unwrap_or(if scheme.eq_ignore_ascii_case("https") { 443 } else { 80 });

    if is_same_origin(Some(scheme), Some(authority.host()), port, origin) {
        Ok(())
    } else {
        Err("Cross-origin request blocked")
    }
}
