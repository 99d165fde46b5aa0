//! Error types.
//!
//! Two families live here. [`Error`] is returned by fallible configuration
//! calls: URL generation, route caching, config loading, binding the server.
//! [`DispatchError`] describes why one request could not reach a handler; the
//! router turns it into a `404`, `405` or `500` response and never hands it
//! to the host as a failure.

use std::path::PathBuf;

use http::StatusCode;
use thiserror::Error;

use crate::method::Method;

/// Result alias for [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type returned by waypost's fallible operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("route cache {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("route cache {path}: unsupported version {found}")]
    CacheVersion { path: PathBuf, found: u32 },

    #[error("cannot cache {method} {pattern}: {reason}")]
    Uncacheable {
        method: Method,
        pattern: String,
        reason: &'static str,
    },

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("no route named `{0}`")]
    RouteNotNamed(String),

    #[error("cannot name `{0}`: no route has been registered yet")]
    NoRouteToName(String),

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),
}

/// Why a request did not reach its handler.
///
/// Each variant maps to a fixed status code. `route` fields carry the
/// `METHOD /pattern` of the matched route for logs.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DispatchError {
    #[error("method `{0}` is not supported")]
    MethodNotSupported(String),

    #[error("no route matches {method} {path}")]
    RouteNotFound { method: Method, path: String },

    #[error("handler for {route} not found: {detail}")]
    HandlerNotFound { route: String, detail: String },

    #[error("handler for {route} is invalid: {detail}")]
    InvalidHandler { route: String, detail: String },

    #[error("middleware `{name}` on {route} is not registered")]
    UnknownMiddleware { route: String, name: String },
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotSupported(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::RouteNotFound { .. }  => StatusCode::NOT_FOUND,
            Self::HandlerNotFound { .. }
            | Self::InvalidHandler { .. }
            | Self::UnknownMiddleware { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The body sent when no error handler is registered for [`status`](Self::status).
    ///
    /// Deliberately generic: the response does not reveal which route or
    /// identifier failed. The `Display` output carries that detail for logs.
    pub fn message(&self) -> &'static str {
        match self {
            Self::MethodNotSupported(_) => "405 Method Not Allowed",
            Self::RouteNotFound { .. }  => "404 Not Found",
            Self::HandlerNotFound { .. } => "Internal Server Error: Method not found",
            Self::InvalidHandler { .. }  => "Internal Server Error: Invalid handler",
            Self::UnknownMiddleware { .. } => "Internal Server Error: Unknown middleware",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_failure_kind() {
        let not_allowed = DispatchError::MethodNotSupported("OPTIONS".into());
        assert_eq!(not_allowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(not_allowed.message(), "405 Method Not Allowed");

        let missing = DispatchError::RouteNotFound { method: Method::Get, path: "/x".into() };
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let broken = DispatchError::HandlerNotFound {
            route: "GET /x".into(),
            detail: "no controller `Posts`".into(),
        };
        assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!broken.message().contains("Posts"));
        assert!(broken.to_string().contains("Posts"));
    }
}
