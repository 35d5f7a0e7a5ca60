//! Cookie directive module
//!
//! Serializes cookies into `Set-Cookie` header values. Only the name, the value
//! and the `HttpOnly` flag are emitted; every other attribute is left to the
//! client's defaults (host-only, session lifetime).

use hyper::header::{HeaderMap, HeaderValue, SET_COOKIE};
use std::fmt;
use url::form_urlencoded;

/// A single `Set-Cookie` directive, built per response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub http_only: bool,
}

/// Reasons a cookie cannot be serialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieError {
    /// Name is empty or contains non-token characters
    InvalidName(String),
    /// Serialized directive is not a legal header value
    InvalidHeader(String),
}

impl fmt::Display for CookieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "invalid cookie name: {name:?}"),
            Self::InvalidHeader(e) => write!(f, "invalid Set-Cookie header: {e}"),
        }
    }
}

impl std::error::Error for CookieError {}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            http_only: false,
        }
    }

    #[must_use]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Value as it appears on the wire (form-urlencoded, space becomes `+`)
    pub fn encoded_value(&self) -> String {
        form_urlencoded::byte_serialize(self.value.as_bytes()).collect()
    }

    /// Render the `Set-Cookie` header value: `name=value[; HttpOnly]`
    pub fn to_header_value(&self) -> Result<HeaderValue, CookieError> {
        if !is_valid_name(&self.name) {
            return Err(CookieError::InvalidName(self.name.clone()));
        }

        let mut directive = format!("{}={}", self.name, self.encoded_value());
        if self.http_only {
            directive.push_str("; HttpOnly");
        }

        HeaderValue::from_str(&directive).map_err(|e| CookieError::InvalidHeader(e.to_string()))
    }
}

/// Append a `Set-Cookie` entry, keeping entries already present.
///
/// Invalid cookies are dropped with a warning; the response is still sent.
pub fn set_cookie(headers: &mut HeaderMap, cookie: &Cookie) {
    match cookie.to_header_value() {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(e) => crate::logger::log_warning(&format!("Dropping cookie: {e}")),
    }
}

/// RFC 7230 token
fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(is_token_char)
}

const fn is_token_char(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.'
        | b'^' | b'_' | b'`' | b'|' | b'~'
        | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z')
}
