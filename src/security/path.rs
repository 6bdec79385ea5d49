//! Request path canonicalization.
//!
//! # Responsibilities
//! - Percent-decode a request path in a given charset
//! - Collapse `//`, `/./` and `/X/../` so allowlist matching is unambiguous
//! - Strip `;param` path parameters
//!
//! # Design Decisions
//! - Pure functions, no shared state: safe to call from any worker
//! - Ascending above the root is a rejection, never a best-effort path
//! - Unchanged inputs are returned borrowed so byte-for-byte equality holds
//!
//! The gate applies the stages as normalize → decode → strip-params, in that
//! order (see [`canonicalize`]).

use std::borrow::Cow;

use thiserror::Error;

/// Failure while canonicalizing a request path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalizeError {
    /// A `%` was not followed by two hex digits.
    #[error("invalid encoded sequence at byte {position}")]
    MalformedEncoding { position: usize },

    /// A `..` segment tried to ascend above the root.
    #[error("path escapes root")]
    PathEscapesRoot,
}

/// Character encoding used to reassemble percent-decoded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    /// ISO-8859-1: every decoded byte maps to the code point of the same value.
    Latin1,
}

impl Charset {
    /// Resolve a charset label such as `"UTF-8"` or `"iso-8859-1"`.
    pub fn for_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" | "us-ascii" | "ascii" => {
                Some(Self::Latin1)
            }
            _ => None,
        }
    }

    fn reassemble(self, bytes: Vec<u8>) -> String {
        match self {
            // Malformed sequences become U+FFFD rather than failing the request.
            Self::Utf8 => match String::from_utf8(bytes) {
                Ok(s) => s,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            },
            Self::Latin1 => bytes.into_iter().map(char::from).collect(),
        }
    }
}

/// Percent-decode `path`, reassembling decoded bytes with `charset`.
///
/// Returns the input borrowed when it contains no `%`. Request targets are
/// ASCII on the wire, so unescaped bytes are copied through verbatim.
pub fn decode(path: &str, charset: Charset) -> Result<Cow<'_, str>, CanonicalizeError> {
    if !path.contains('%') {
        return Ok(Cow::Borrowed(path));
    }

    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let high = bytes.get(i + 1).and_then(|b| hex_value(*b));
            let low = bytes.get(i + 2).and_then(|b| hex_value(*b));
            match (high, low) {
                (Some(h), Some(l)) => {
                    out.push((h << 4) | l);
                    i += 3;
                }
                _ => return Err(CanonicalizeError::MalformedEncoding { position: i }),
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    Ok(Cow::Owned(charset.reassemble(out)))
}

/// Percent-decode with a charset given by label (`None` means UTF-8).
///
/// An unknown label falls back to strict UTF-8 decoding; if that fails too
/// the input comes back unchanged instead of an error.
pub fn decode_with_label<'a>(
    path: &'a str,
    label: Option<&str>,
) -> Result<Cow<'a, str>, CanonicalizeError> {
    let Some(label) = label else {
        return decode(path, Charset::Utf8);
    };
    if let Some(charset) = Charset::for_label(label) {
        return decode(path, charset);
    }

    tracing::debug!(charset = %label, "Unsupported charset, falling back to strict UTF-8");
    match decode(path, Charset::Latin1) {
        Ok(Cow::Borrowed(p)) => Ok(Cow::Borrowed(p)),
        Ok(Cow::Owned(latin)) => {
            let bytes: Vec<u8> = latin.chars().map(|c| c as u32 as u8).collect();
            Ok(String::from_utf8(bytes).map_or(Cow::Borrowed(path), Cow::Owned))
        }
        Err(_) => Ok(Cow::Borrowed(path)),
    }
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

/// Collapse `//`, `/./` and `/X/../` in `path`.
///
/// Returns `None` when a `..` segment would ascend above the root. A single
/// trailing slash is dropped unless the result is the root itself.
pub fn normalize(path: &str, replace_backslash: bool) -> Option<String> {
    let mut normalized = if replace_backslash && path.contains('\\') {
        path.replace('\\', "/")
    } else {
        path.to_owned()
    };

    if !normalized.starts_with('/') {
        normalized.insert(0, '/');
    }

    if normalized.ends_with("/.") || normalized.ends_with("/..") {
        normalized.push('/');
    }
    let trailing_slash = normalized.ends_with('/');

    while let Some(index) = normalized.find("//") {
        normalized.remove(index);
    }

    while let Some(index) = normalized.find("/./") {
        normalized.replace_range(index..index + 2, "");
    }

    while let Some(index) = normalized.find("/../") {
        if index == 0 {
            return None;
        }
        // Drop the preceding segment together with "/..".
        let start = normalized[..index].rfind('/').unwrap_or(0);
        normalized.replace_range(start..index + 3, "");
    }

    if normalized.len() > 1 && trailing_slash {
        normalized.pop();
    }

    Some(normalized)
}

/// Remove `;`-delimited path parameters, keeping every path segment.
///
/// `/a;jsessionid=1/b` becomes `/a/b`. Inputs without `;` are returned borrowed.
pub fn strip_path_params(uri: &str) -> Cow<'_, str> {
    if !uri.contains(';') {
        return Cow::Borrowed(uri);
    }

    let limit = uri.len();
    let mut out = String::with_capacity(limit);
    let mut pos = 0;
    while pos < limit {
        let semicolon = uri[pos..].find(';').map_or(limit, |i| pos + i);
        out.push_str(&uri[pos..semicolon]);
        pos = uri[semicolon..].find('/').map_or(limit, |i| semicolon + i);
    }

    Cow::Owned(out)
}

/// Run the gate's canonicalization pipeline: normalize → decode → strip-params.
///
/// Traversal collapsing runs on the still-encoded path; anything that only
/// becomes `..` after decoding is left in place for the caller to deal with.
pub fn canonicalize(raw: &str) -> Result<String, CanonicalizeError> {
    canonicalize_with(raw, None)
}

/// [`canonicalize`] with the decode charset given by label (`None` means UTF-8).
pub fn canonicalize_with(raw: &str, charset: Option<&str>) -> Result<String, CanonicalizeError> {
    let normalized = normalize(raw, true).ok_or(CanonicalizeError::PathEscapesRoot)?;
    let decoded = decode_with_label(&normalized, charset)?;
    Ok(strip_path_params(&decoded).into_owned())
}

/// True when any segment of `path` is `.` or `..`.
pub fn has_dot_segments(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| segment == "." || segment == "..")
}

/// True when `path` is already in normalized form.
pub fn is_normalized(path: &str) -> bool {
    normalize(path, true).as_deref() == Some(path)
}
