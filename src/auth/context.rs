//! Per-request view consumed by the gate.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::http::header::{HeaderMap, HeaderValue, IntoHeaderName};
use axum::http::{Method, Request};

/// Immutable snapshot of the request attributes the gate looks at.
///
/// Header lookup is case-insensitive. For repeated parameters the first
/// value wins, and query parameters come before form body ones.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    headers: HeaderMap,
    params: HashMap<String, String>,
    remote_host: Option<String>,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            params: HashMap::new(),
            remote_host: None,
        }
    }

    /// Build a context from an HTTP request and the peer address, if known.
    pub fn from_request<B>(request: &Request<B>, remote: Option<SocketAddr>) -> Self {
        let mut ctx = Self::new(request.method().clone(), request.uri().path())
            .with_headers(request.headers().clone());
        if let Some(query) = request.uri().query() {
            ctx = ctx.with_query(query);
        }
        if let Some(addr) = remote {
            ctx = ctx.with_remote_host(addr.ip().to_string());
        }
        ctx
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Parse an `application/x-www-form-urlencoded` query string into params.
    pub fn with_query(self, query: &str) -> Self {
        self.with_form(query.as_bytes())
    }

    /// Merge form-encoded pairs, typically a request body, into params.
    /// Names already present keep their value.
    pub fn with_form(mut self, form: &[u8]) -> Self {
        for (key, value) in url::form_urlencoded::parse(form) {
            self.params
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        self
    }

    pub fn with_remote_host(mut self, host: impl Into<String>) -> Self {
        self.remote_host = Some(host.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Raw request path, exactly as received.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Header value by case-insensitive name. Non-visible-ASCII values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn remote_host(&self) -> Option<&str> {
        self.remote_host.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_from_request() {
        let req = Request::builder()
            .method("POST")
            .uri("http://example.com/nacos/v1/cs/configs?tenant=public&group=a+b&group=other")
            .header("Spas-Signature", "abc")
            .body(Body::empty())
            .unwrap();
        let ctx = RequestContext::from_request(&req, Some("10.0.0.7:5555".parse().unwrap()));

        assert_eq!(ctx.method(), &Method::POST);
        assert_eq!(ctx.path(), "/nacos/v1/cs/configs");
        assert_eq!(ctx.header("spas-signature"), Some("abc"));
        assert_eq!(ctx.param("tenant"), Some("public"));
        assert_eq!(ctx.param("group"), Some("a b"));
        assert_eq!(ctx.param("dataId"), None);
        assert_eq!(ctx.remote_host(), Some("10.0.0.7"));
    }

    #[test]
    fn test_form_params_merge_after_query() {
        let ctx = RequestContext::new(Method::POST, "/nacos/v1/cs/configs")
            .with_query("tenant=public")
            .with_form(b"tenant=other&group=DEFAULT_GROUP&dataId=a%2Eyaml");

        assert_eq!(ctx.param("tenant"), Some("public"));
        assert_eq!(ctx.param("group"), Some("DEFAULT_GROUP"));
        assert_eq!(ctx.param("dataId"), Some("a.yaml"));
    }

    #[test]
    fn test_invalid_header_name_reads_absent() {
        let ctx = RequestContext::new(Method::GET, "/");
        assert_eq!(ctx.header("not a header"), None);
    }
}
