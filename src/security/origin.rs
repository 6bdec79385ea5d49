//! `Origin` header validation for cross-origin checks.

/// True when `origin` is an acceptable `Origin` header value.
///
/// Percent-encoding is never allowed; `null` and `file://` origins are.
/// Anything else must parse as an absolute URI.
pub fn is_valid_origin(origin: &str) -> bool {
    if origin.contains('%') {
        return false;
    }
    if origin == "null" || origin.starts_with("file://") {
        return true;
    }
    // `Url::parse` only accepts absolute URIs, so a successful parse has a scheme.
    url::Url::parse(origin).is_ok()
}

/// True when `origin` equals `scheme://host[:port]` for the given request.
///
/// The port is omitted only when it is the scheme's default and the origin
/// has exactly the length of `scheme://host`.
pub fn is_same_origin(scheme: Option<&str>, host: Option<&str>, port: u16, origin: &str) -> bool {
    let (Some(scheme), Some(host)) = (scheme, host) else {
        return false;
    };
    let scheme = scheme.to_ascii_lowercase();

    let mut target = format!("{scheme}://{host}");
    if target.len() == origin.len() {
        let default_port = match scheme.as_str() {
            "http" | "ws" => Some(80),
            "https" | "wss" => Some(443),
            _ => None,
        };
        if default_port.is_some_and(|p| p != port) {
            target.push(':');
            target.push_str(&port.to_string());
        }
    } else {
        target.push(':');
        target.push_str(&port.to_string());
    }

    origin == target
}
