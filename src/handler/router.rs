//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: exact-path route matching, dispatching and access logging.

use crate::config::AppState;
use crate::handler::cookies;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub method: &'a Method,
    pub path: &'a str,
}

/// A route handler
pub type RouteFn = fn(&RequestContext<'_>) -> Response<Full<Bytes>>;

/// Path to handler table; paths match exactly, any method is accepted
#[derive(Default)]
pub struct RouteTable {
    routes: HashMap<String, RouteFn>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the server's built-in routes
    pub fn default_routes() -> Self {
        let mut table = Self::new();
        table.route("/setcookie", cookies::set_cookies);
        table
    }

    /// Register `handler` for `path`, replacing any previous handler
    pub fn route(&mut self, path: impl Into<String>, handler: RouteFn) -> &mut Self {
        self.routes.insert(path.into(), handler);
        self
    }

    pub fn lookup(&self, path: &str) -> Option<RouteFn> {
        self.routes.get(path).copied()
    }

    /// Run the matching handler, or answer 404
    pub fn dispatch(&self, ctx: &RequestContext<'_>) -> Response<Full<Bytes>> {
        match self.lookup(ctx.path) {
            Some(handler) => handler(ctx),
            None => http::build_404_response(),
        }
    }
}

/// Main entry point for HTTP request handling
///
/// The request body is never read.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let method = req.method();
    let uri = req.uri();

    logger::log_debug(
        &state.config.logging,
        &format!("[Request] {method} {uri} {:?} from {peer_addr}", req.version()),
    );

    let ctx = RequestContext {
        method,
        path: uri.path(),
    };
    let response = state.routes.dispatch(&ctx);

    if state.access_log_enabled() {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            method.to_string(),
            uri.path().to_string(),
        );
        entry.query = uri.query().map(ToString::to_string);
        entry.http_version = version_label(req.version()).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(response.body().size_hint().lower()).unwrap_or(0);
        entry.referer = header_string(&req, "referer");
        entry.user_agent = header_string(&req, "user-agent");
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

fn header_string<B>(req: &Request<B>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::Empty;
    use hyper::header::SET_COOKIE;
    use hyper::StatusCode;

    fn test_state() -> Arc<AppState> {
        let cfg = Config::from_toml_str("[logging]\naccess_log = false\n").unwrap();
        Arc::new(AppState::new(&cfg))
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    fn request(method: Method, uri: &str) -> Request<Empty<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Empty::new())
            .unwrap()
    }

    #[test]
    fn test_default_routes() {
        let table = RouteTable::default_routes();
        assert!(table.lookup("/setcookie").is_some());
        assert!(table.lookup("/setcookie/").is_none());
        assert!(table.lookup("/").is_none());
    }

    #[test]
    fn test_empty_table_returns_404() {
        let table = RouteTable::new();
        assert!(table.lookup("/setcookie").is_none());
        let ctx = RequestContext {
            method: &Method::GET,
            path: "/setcookie",
        };
        assert_eq!(table.dispatch(&ctx).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_route_replaces_handler() {
        fn teapot(_ctx: &RequestContext<'_>) -> Response<Full<Bytes>> {
            let mut resp = Response::new(Full::new(Bytes::new()));
            *resp.status_mut() = StatusCode::IM_A_TEAPOT;
            resp
        }

        let mut table = RouteTable::default_routes();
        table.route("/setcookie", teapot);
        let ctx = RequestContext {
            method: &Method::GET,
            path: "/setcookie",
        };
        assert_eq!(table.dispatch(&ctx).status(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn test_setcookie_any_method() {
        let state = test_state();
        for method in [Method::GET, Method::POST, Method::PUT, Method::PATCH] {
            let resp = handle_request(request(method, "/setcookie"), Arc::clone(&state), peer())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(resp.headers().get_all(SET_COOKIE).iter().count(), 2);
        }
    }

    #[tokio::test]
    async fn test_query_string_ignored() {
        let resp = handle_request(request(Method::GET, "/setcookie?x=1"), test_state(), peer())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_path_404() {
        for uri in ["/", "/setcookies", "/SetCookie", "/setcookie/extra"] {
            let resp = handle_request(request(Method::GET, uri), test_state(), peer())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
            assert!(resp.headers().get(SET_COOKIE).is_none());
        }
    }

    #[test]
    fn test_version_label() {
        assert_eq!(version_label(hyper::Version::HTTP_11), "1.1");
        assert_eq!(version_label(hyper::Version::HTTP_10), "1.0");
        assert_eq!(version_label(hyper::Version::HTTP_2), "2");
    }
}
