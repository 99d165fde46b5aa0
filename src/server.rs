//! Host adapter: serves a [`Router`] over HTTP with hyper.
//!
//! The router core is synchronous and transport-free. This module is the
//! only place that touches sockets: it turns each hyper request into a
//! [`Request`], runs [`Router::dispatch`] on tokio's blocking pool (handlers
//! are plain functions and may block), and writes the [`Response`] back.
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C the server stops accepting, lets every in-flight
//! connection finish, and then returns from [`Server::serve`].

use std::borrow::Cow;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use waypost::Server;
    ///
    /// assert!(Server::bind("0.0.0.0:3000").is_ok());
    /// assert!(Server::bind("not an address").is_err());
    /// ```
    pub fn bind(addr: &str) -> Result<Self> {
        let addr = addr
            .parse()
            .map_err(|_| Error::InvalidAddress(addr.to_owned()))?;
        Ok(Self { addr })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        Self::bind(&config.addr)
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, router: Router) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve_listener(listener, router, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), on an already bound listener and with a
    /// caller-supplied shutdown future.
    pub async fn serve_listener<S>(self, listener: TcpListener, router: Router, shutdown: S) -> Result<()>
    where
        S: std::future::Future<Output = ()>,
    {
        let router = Arc::new(router);
        info!(addr = %listener.local_addr()?, routes = router.len(), "waypost listening");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown is checked first so a signal stops accepting at once.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(router, req).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet stays small.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("waypost stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Converts one hyper request, dispatches it, converts the response back.
///
/// Never fails: unreadable bodies and panicking handlers become `500`s.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!("request body error: {e}");
            return Ok(internal_error());
        }
    };

    let request = into_request(&parts, body);
    let response = match tokio::task::spawn_blocking(move || router.dispatch(request)).await {
        Ok(response) => response,
        Err(e) => {
            error!(method = %parts.method, path = %parts.uri.path(), "handler panicked: {e}");
            return Ok(internal_error());
        }
    };

    Ok(response.into_http())
}

/// Builds the router's view of a request.
///
/// The path is percent-decoded here, see [`decode_path`]. The host is taken
/// from the URI authority or the `Host` header, without its port.
fn into_request(parts: &http::request::Parts, body: Bytes) -> Request {
    let path = decode_path(parts.uri.path());
    let mut request = Request::new(parts.method.as_str(), path).with_body(body);

    let host = parts.uri.host().map(str::to_owned).or_else(|| {
        parts.headers
            .get(http::header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(|h| strip_port(h).to_owned())
    });
    if let Some(host) = host {
        request = request.with_host(host);
    }

    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }
    request
}

/// Decodes each `/`-separated segment on its own so an escape can never
/// change how many segments the matcher sees.
///
/// `%2F` and `%25` stay encoded: a segment that carried an escaped slash
/// reaches the handler as one value it can decode exactly once. Escapes that
/// do not form valid UTF-8 leave their segment undecoded.
fn decode_path(raw: &str) -> String {
    raw.split('/').map(decode_segment).collect::<Vec<_>>().join("/")
}

fn decode_segment(segment: &str) -> String {
    let mut decoded = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(at) = find_reserved_escape(rest) {
        decoded.push_str(&decode_lossless(&rest[..at]));
        decoded.push_str(&rest[at..at + 3]);
        rest = &rest[at + 3..];
    }
    decoded.push_str(&decode_lossless(rest));
    decoded
}

fn find_reserved_escape(s: &str) -> Option<usize> {
    s.match_indices('%').map(|(at, _)| at).find(|&at| {
        s.get(at + 1..at + 3)
            .is_some_and(|hex| hex.eq_ignore_ascii_case("2f") || hex == "25")
    })
}

fn decode_lossless(s: &str) -> Cow<'_, str> {
    urlencoding::decode(s).unwrap_or(Cow::Borrowed(s))
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literals keep their colons.
    if host.starts_with('[') {
        return host.split_once(']').map_or(host, |(addr, _)| &host[..addr.len() + 1]);
    }
    host.split_once(':').map_or(host, |(name, _)| name)
}

fn internal_error() -> http::Response<Full<Bytes>> {
    Response::builder()
        .status(http::StatusCode::INTERNAL_SERVER_ERROR)
        .text("Internal Server Error")
        .into_http()
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C. A signal that cannot be
/// installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_ports() {
        assert_eq!(strip_port("example.com:8080"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:3000"), "[::1]");
    }

    #[test]
    fn builds_decoded_request_with_host() {
        let (parts, ()) = http::Request::builder()
            .method("POST")
            .uri("/files/a%20b")
            .header("host", "api.test:3000")
            .header("x-id", "7")
            .body(())
            .unwrap()
            .into_parts();

        let req = into_request(&parts, Bytes::from_static(b"hi"));
        assert_eq!(req.method(), "POST");
        assert_eq!(req.path(), "/files/a b");
        assert_eq!(req.host(), Some("api.test"));
        assert_eq!(req.header("X-Id"), Some("7"));
        assert_eq!(req.body(), b"hi");
    }

    #[test]
    fn escaped_slash_stays_inside_its_segment() {
        assert_eq!(decode_path("/files/a%2Fb"), "/files/a%2Fb");
        assert_eq!(decode_path("/files/a%2fb%20c"), "/files/a%2fb c");
        assert_eq!(decode_path("/files/100%25"), "/files/100%25");
        assert_eq!(decode_path("/bad/%FF"), "/bad/%FF");
    }

    #[test]
    fn escaped_slash_routes_to_single_parameter() {
        let mut router = Router::new();
        router.get("/files/{name}", |req: Request| {
            let name = req.param("name").unwrap_or_default();
            urlencoding::decode(name).map(|n| n.into_owned()).unwrap_or_default()
        });

        let (parts, ()) = http::Request::builder()
            .uri("/files/a%2Fb")
            .body(())
            .unwrap()
            .into_parts();
        let res = router.dispatch(into_request(&parts, Bytes::new()));

        assert_eq!(res.status_code(), http::StatusCode::OK);
        assert_eq!(res.body_text(), "a/b");
    }
}
