//! Authorization gate middleware.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::{header::CONTENT_TYPE, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{Decision, RequestContext};
use crate::http::request::request_id;
use crate::http::response::deny_response;
use crate::http::server::AppState;
use crate::observability::metrics;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Runs the gate; forwards on allow, answers on deny.
///
/// Form-encoded bodies are buffered so their parameters count alongside the
/// query string, then handed on unchanged. Allowed requests carry the
/// granting [`Stage`](crate::auth::Stage) as an extension.
pub async fn gate_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let mut ctx = RequestContext::from_request(&request, remote);
    let mut request = request;
    if is_form(request.headers()) {
        let (buffered, form) = match buffer_body(request, state.security.max_form_bytes).await {
            Ok(buffered) => buffered,
            Err(response) => return response,
        };
        ctx = ctx.with_form(&form);
        request = buffered;
    }

    let decision = state.gate.evaluate(&ctx);
    metrics::record_decision(&decision, start);

    match decision {
        Decision::Allow(stage) => {
            tracing::debug!(
                request_id = %request_id(&request),
                stage = stage.as_str(),
                "Request allowed"
            );
            request.extensions_mut().insert(stage);
            next.run(request).await
        }
        Decision::Deny(error) => {
            tracing::info!(
                request_id = %request_id(&request),
                method = %ctx.method(),
                path = %ctx.path(),
                status = error.status().as_u16(),
                "Request denied"
            );
            deny_response(&error)
        }
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

/// Read the whole body (at most `limit` bytes) and rebuild the request around it.
async fn buffer_body(
    request: Request<Body>,
    limit: usize,
) -> Result<(Request<Body>, Bytes), Response> {
    let (parts, body) = request.into_parts();
    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => Ok((Request::from_parts(parts, Body::from(bytes.clone())), bytes)),
        Err(e) => {
            tracing::info!(
                method = %parts.method,
                path = %parts.uri.path(),
                limit,
                error = %e,
                "Form body rejected"
            );
            Err((StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use http_body_util::BodyExt;

    fn headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn test_is_form() {
        assert!(is_form(&headers("application/x-www-form-urlencoded")));
        assert!(is_form(&headers("Application/X-WWW-Form-Urlencoded; charset=UTF-8")));
        assert!(!is_form(&headers("application/json")));
        assert!(!is_form(&headers("multipart/form-data; boundary=x")));
        assert!(!is_form(&HeaderMap::new()));
    }

    #[tokio::test]
    async fn test_buffered_body_is_passed_on() {
        let request = Request::post("/nacos/v1/cs/configs")
            .body(Body::from("tenant=public&group=G"))
            .unwrap();

        let (request, form) = buffer_body(request, 1024).await.unwrap();
        assert_eq!(&form[..], b"tenant=public&group=G");
        let body = request.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"tenant=public&group=G");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let request = Request::post("/nacos/v1/cs/configs")
            .body(Body::from("tenant=public&group=G"))
            .unwrap();

        let response = buffer_body(request, 8).await.unwrap_err();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
