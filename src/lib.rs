//! # waypost
//!
//! A small, synchronous request router: method + path in, status + body out.
//!
//! ## What it does
//!
//! - Segment matching with `{name}` parameters, exact arity, first match wins
//! - Priority-ordered route table, stable on ties
//! - Global and per-route middleware that can answer early
//! - Nested route groups (prefix, middleware, controller namespace, host)
//! - Named routes and reverse URL generation
//! - `before` / `after` lifecycle hooks
//! - Per-status error handlers
//! - A JSON route cache for controller-bound routes
//!
//! What it leaves to the host: TLS, body formatting, content negotiation, the
//! socket. [`Server`] is a thin hyper adapter for when you don't have a host.
//!
//! ## Quick start
//!
//! ```rust
//! use waypost::{GroupAttributes, Request, Response, Router};
//! use http::StatusCode;
//!
//! fn show_user(req: Request) -> String {
//!     format!("user {}", req.param("id").unwrap_or("?"))
//! }
//!
//! fn require_token(req: &Request) -> Option<Response> {
//!     match req.header("authorization") {
//!         Some(_) => None,
//!         None => Some(Response::status(StatusCode::UNAUTHORIZED)),
//!     }
//! }
//!
//! let mut router = Router::new();
//! router.register_middleware("auth", || require_token);
//! router.group(GroupAttributes::with_prefix("/api").middleware("auth"), |api| {
//!     api.get("/users/{id}", show_user).name("users.show").unwrap();
//! });
//!
//! let denied = router.dispatch(Request::new("GET", "/api/users/5"));
//! assert_eq!(denied.status_code(), StatusCode::UNAUTHORIZED);
//!
//! let allowed = router.dispatch(
//!     Request::new("GET", "/api/users/5").with_header("Authorization", "Bearer t"),
//! );
//! assert_eq!(allowed.body_text(), "user 5");
//! assert_eq!(router.url("users.show", &[("id", "5")]).unwrap(), "/api/users/5");
//! ```

mod cache;
mod error;
mod group;
mod handler;
mod matcher;
mod method;
mod names;
mod request;
mod response;
mod route;
mod router;
mod server;

pub mod config;
pub mod hooks;
pub mod middleware;

pub use config::Config;
pub use error::{DispatchError, Error, Result};
pub use group::{GroupAttributes, GroupContext, RouteGroup};
pub use handler::{Controller, ControllerRegistry, Handler, IntoTarget, Target};
pub use matcher::match_path;
pub use method::Method;
pub use middleware::{Middleware, MiddlewareRef};
pub use names::NamedRoutes;
pub use request::{Params, Request};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use route::{normalize_path, Route, RouteTable};
pub use router::Router;
pub use server::Server;
