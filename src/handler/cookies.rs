//! Cookie-setting handler

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::HeaderMap;
use hyper::Response;

use super::router::RequestContext;
use crate::http::{self, Cookie};

/// Value shared by both cookies, before encoding
pub const COOKIE_VALUE: &str = "Go Web Programming";

pub const FIRST_COOKIE: &str = "first_cookie";
pub const SECOND_COOKIE: &str = "second_cookie";

/// Set `first_cookie` then `second_cookie`, both HttpOnly, with an empty 200.
///
/// The request is not inspected.
pub fn set_cookies(_ctx: &RequestContext<'_>) -> Response<Full<Bytes>> {
    let first = Cookie::new(FIRST_COOKIE, COOKIE_VALUE).http_only(true);
    let second = Cookie::new(SECOND_COOKIE, COOKIE_VALUE).http_only(true);

    let mut headers = HeaderMap::new();
    http::set_cookie(&mut headers, &first);
    http::set_cookie(&mut headers, &second);

    http::build_empty_response(headers)
}
