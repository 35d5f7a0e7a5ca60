// Server module entry point
// Binding, connection handling and the accept loop

pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the module is renamed
#[path = "loop.rs"]
pub mod server_loop;

use std::fmt;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::logger;

pub use listener::create_listener;
pub use server_loop::start_server_loop;

/// Startup failures; each one is fatal
#[derive(Debug)]
pub enum ServerError {
    /// `host:port` could not be turned into a socket address
    Resolve(String),
    /// The listener could not be bound
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve(e) => write!(f, "cannot resolve listen address: {e}"),
            Self::Bind { addr, source } => write!(f, "cannot bind {addr}: {source}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Resolve(_) => None,
            Self::Bind { source, .. } => Some(source),
        }
    }
}

/// Resolve the configured address and bind a listener to it
pub fn bind(config: &Config) -> Result<TcpListener, ServerError> {
    let addr = config.resolve_socket_addr().map_err(ServerError::Resolve)?;
    bind_addr(addr)
}

pub fn bind_addr(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    create_listener(addr).map_err(|source| {
        logger::log_bind_failed(&addr, &source);
        ServerError::Bind { addr, source }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppState;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::Notify;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    fn test_config(extra: &str) -> Config {
        Config::from_toml_str(&format!("[logging]\naccess_log = false\n{extra}")).unwrap()
    }

    /// Start a server on an ephemeral port; returns its address and shutdown handle
    fn spawn_server(config: &Config) -> (SocketAddr, Arc<Notify>, tokio::task::JoinHandle<()>) {
        let listener = bind_addr(loopback()).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(AppState::new(config));
        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(start_server_loop(listener, state, Arc::clone(&shutdown)));
        (addr, shutdown, handle)
    }

    async fn raw_request(addr: SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn set_cookie_lines(response: &str) -> Vec<&str> {
        response
            .lines()
            .filter(|l| l.to_ascii_lowercase().starts_with("set-cookie:"))
            .collect()
    }

    const GET_SETCOOKIE: &str =
        "GET /setcookie HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n";

    #[tokio::test]
    async fn test_get_setcookie_end_to_end() {
        let (addr, shutdown, handle) = spawn_server(&test_config(""));

        let response = raw_request(addr, GET_SETCOOKIE).await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
        assert_eq!(
            set_cookie_lines(&response),
            vec![
                "set-cookie: first_cookie=Go+Web+Programming; HttpOnly",
                "set-cookie: second_cookie=Go+Web+Programming; HttpOnly",
            ]
        );
        assert!(response.contains("content-length: 0\r\n"));
        assert!(response.ends_with("\r\n\r\n"), "body must be empty");

        shutdown.notify_one();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_post_with_body_still_sets_cookies() {
        let (addr, shutdown, handle) = spawn_server(&test_config(""));

        let response = raw_request(
            addr,
            "POST /setcookie HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
        assert_eq!(set_cookie_lines(&response).len(), 2);

        shutdown.notify_one();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_repeated_requests_identical_cookies() {
        let (addr, shutdown, handle) = spawn_server(&test_config(""));

        let first = raw_request(addr, GET_SETCOOKIE).await;
        let second = raw_request(addr, GET_SETCOOKIE).await;
        assert_eq!(set_cookie_lines(&first), set_cookie_lines(&second));

        shutdown.notify_one();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_path_end_to_end() {
        let (addr, shutdown, handle) = spawn_server(&test_config(""));

        let response = raw_request(
            addr,
            "GET /nope HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"), "{response}");
        assert!(response.ends_with("404 page not found\n"));
        assert!(set_cookie_lines(&response).is_empty());

        shutdown.notify_one();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_limit_rejects() {
        let (addr, shutdown, handle) =
            spawn_server(&test_config("[performance]\nmax_connections = 0\n"));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let _ = stream.write_all(GET_SETCOOKIE.as_bytes()).await;
        let mut buf = Vec::new();
        // Dropped connections read as EOF or reset, never as a response
        let read = stream.read_to_end(&mut buf).await;
        assert!(read.is_err() || buf.is_empty());

        shutdown.notify_one();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_in_use_fails() {
        let first = bind_addr(loopback()).unwrap();
        let addr = first.local_addr().unwrap();

        match bind_addr(addr) {
            Err(ServerError::Bind { addr: failed, source }) => {
                assert_eq!(failed, addr);
                assert_eq!(source.kind(), std::io::ErrorKind::AddrInUse);
            }
            other => panic!("expected bind failure, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_error_display() {
        let err = ServerError::Resolve("Invalid address 'x': bad".to_string());
        assert_eq!(
            err.to_string(),
            "cannot resolve listen address: Invalid address 'x': bad"
        );
    }
}
