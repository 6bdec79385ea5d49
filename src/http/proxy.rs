//! Upstream forwarding for requests the gate allowed.

use std::str::FromStr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, Scheme},
        Request, StatusCode, Uri, Version,
    },
    response::{IntoResponse, Response},
};
use hyper_util::client::legacy::{connect::HttpConnector, Client};

use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;

/// The protected service behind the gate.
#[derive(Clone)]
pub struct Upstream {
    authority: Authority,
    client: Client<HttpConnector, Body>,
}

impl Upstream {
    /// `None` when `address` is not a valid `host:port` authority.
    pub fn new(address: &str, client: Client<HttpConnector, Body>) -> Option<Self> {
        let authority = Authority::from_str(address).ok()?;
        Some(Self { authority, client })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    fn rewrite(&self, uri: &Uri) -> Option<Uri> {
        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(Scheme::HTTP);
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some("/".parse().ok()?);
        }
        Uri::from_parts(parts).ok()
    }
}

/// Fallback handler: forward the request unchanged to the upstream.
pub async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request).to_string();

    let (mut parts, body) = request.into_parts();
    let Some(uri) = state.upstream.rewrite(&parts.uri) else {
        tracing::error!(request_id = %request_id, uri = %parts.uri, "Failed to rewrite upstream URI");
        metrics::record_upstream(StatusCode::BAD_GATEWAY.as_u16(), start);
        return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
    };
    parts.uri = uri;
    parts.version = Version::HTTP_11;

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        uri = %parts.uri,
        "Forwarding request"
    );

    match state.upstream.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            metrics::record_upstream(response.status().as_u16(), start);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                upstream = %state.upstream.authority,
                error = %e,
                "Upstream error"
            );
            metrics::record_upstream(StatusCode::BAD_GATEWAY.as_u16(), start);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
