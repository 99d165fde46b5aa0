//! The application router.
//!
//! Build it once at startup, register everything, then share it read-only
//! with whatever serves requests. Registration takes `&mut self`, dispatch
//! takes `&self`, so "register, then serve" is enforced by the borrow
//! checker rather than by convention.
//!
//! # Dispatch
//!
//! ```text
//! before hook ─→ method supported? ──no──→ 405
//!                      │ yes
//!                      ↓
//!              walk table in order ──none──→ after hook ─→ 404
//!                      │ first match
//!                      ↓
//!        global middleware ─→ route middleware ──Some(res)──→ res
//!                      │ all None
//!                      ↓
//!                  handler ──unresolvable──→ 500
//! ```
//!
//! [`Router::try_dispatch`] returns the decision as a `Result`;
//! [`Router::dispatch`] folds failures into responses, through a handler
//! registered with [`Router::on_error`] when there is one.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, trace, warn};

use crate::cache;
use crate::config::Config;
use crate::error::{DispatchError, Error, Result};
use crate::group::{GroupAttributes, GroupContext, RouteGroup};
use crate::handler::{Controller, ControllerRegistry, IntoTarget, Target};
use crate::hooks::{self, Hooks};
use crate::matcher::match_path;
use crate::method::Method;
use crate::middleware::{self, Middleware, MiddlewareRef, MiddlewareRegistry};
use crate::names::NamedRoutes;
use crate::request::{Params, Request};
use crate::response::{IntoResponse, Response};
use crate::route::{join_paths, Route, RouteTable};

type ErrorHandler = Arc<dyn Fn(&DispatchError) -> Response + Send + Sync + 'static>;

/// Routes, registries and hooks for one application.
///
/// ```rust
/// use waypost::{GroupAttributes, Request, Router};
///
/// fn show(req: Request) -> String {
///     format!("post {}", req.param("id").unwrap_or("?"))
/// }
///
/// let mut router = Router::new();
/// router.group(GroupAttributes::with_prefix("/blog"), |blog| {
///     blog.get("/posts/{id}", show).name("post.show").unwrap();
/// });
///
/// assert_eq!(router.url("post.show", &[("id", "7")]).unwrap(), "/blog/posts/7");
/// assert_eq!(router.dispatch(Request::new("GET", "/blog/posts/7")).body_text(), "post 7");
/// ```
#[derive(Default)]
pub struct Router {
    routes: RouteTable,
    names: NamedRoutes,
    /// Table indices of the routes created by the most recent registration call.
    last: Option<Range<usize>>,
    global: Vec<MiddlewareRef>,
    middleware: MiddlewareRegistry,
    controllers: ControllerRegistry,
    hooks: Hooks,
    error_handlers: HashMap<StatusCode, ErrorHandler>,
    patterns: BTreeMap<String, String>,
    middleware_redirect: Option<String>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// A router set up from `config`: redirect metadata applied and, when
    /// `router.route_cache` names an existing file, the cached table loaded.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut router = Self::new();
        router.middleware_redirect = config.router.middleware_redirect.clone();
        if let Some(path) = &config.router.route_cache {
            router.load_cached_routes(path)?;
        }
        Ok(router)
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Registers `target` for `method` + `path` at `priority`.
    ///
    /// Higher priorities are matched first; equal priorities in registration
    /// order. Duplicates are allowed and the first one in table order wins.
    pub fn add_route(&mut self, method: Method, path: &str, target: impl IntoTarget, priority: i32) -> &mut Self {
        self.register(&GroupContext::default(), &[method], path, target.into_target(), priority);
        self
    }

    pub fn get(&mut self, path: &str, target: impl IntoTarget) -> &mut Self {
        self.add_route(Method::Get, path, target, 0)
    }

    pub fn post(&mut self, path: &str, target: impl IntoTarget) -> &mut Self {
        self.add_route(Method::Post, path, target, 0)
    }

    pub fn put(&mut self, path: &str, target: impl IntoTarget) -> &mut Self {
        self.add_route(Method::Put, path, target, 0)
    }

    pub fn delete(&mut self, path: &str, target: impl IntoTarget) -> &mut Self {
        self.add_route(Method::Delete, path, target, 0)
    }

    pub fn patch(&mut self, path: &str, target: impl IntoTarget) -> &mut Self {
        self.add_route(Method::Patch, path, target, 0)
    }

    /// Registers `target` under every supported verb.
    pub fn any(&mut self, path: &str, target: impl IntoTarget) -> &mut Self {
        self.register(&GroupContext::default(), &Method::ALL, path, target.into_target(), 0);
        self
    }

    /// Opens a group. Routes registered through the [`RouteGroup`] handed to
    /// `f` get the group's prefix, middleware, namespace and host.
    pub fn group<F>(&mut self, attrs: GroupAttributes, f: F) -> &mut Self
    where
        F: FnOnce(&mut RouteGroup<'_>),
    {
        let context = GroupContext::default().enter(attrs);
        f(&mut RouteGroup::new(self, context));
        self
    }

    pub(crate) fn register(
        &mut self,
        context: &GroupContext,
        methods: &[Method],
        path: &str,
        target: Target,
        priority: i32,
    ) {
        let pattern = join_paths(&context.prefix, path);
        let target = target.in_namespace(&context.namespace);

        let batch = methods
            .iter()
            .map(|&method| Route {
                method,
                pattern: pattern.clone(),
                target: target.clone(),
                middleware: context.middleware.clone(),
                priority,
                host: context.host.clone(),
            })
            .collect();

        trace!(?methods, %pattern, priority, ?target, "registering route");
        self.last = Some(self.routes.insert_batch(batch));
    }

    /// Appends `middleware` to the routes created by the most recent
    /// registration call (all five of them after [`any`](Self::any)).
    ///
    /// Call it directly after the registration it belongs to; it has no
    /// other way of knowing which route is meant.
    pub fn middleware(&mut self, middleware: impl Into<MiddlewareRef>) -> &mut Self {
        let middleware = middleware.into();
        let Some(range) = self.last.clone() else {
            warn!(?middleware, "middleware() called before any route was registered; ignored");
            return self;
        };
        for index in range {
            if let Some(route) = self.routes.get_mut(index) {
                route.middleware.push(middleware.clone());
            }
        }
        self
    }

    /// Names the most recently registered route.
    ///
    /// The binding is to whatever route was registered last, so call this
    /// immediately after the registration it names. Re-using a name
    /// overwrites the earlier binding.
    pub fn name(&mut self, name: &str) -> Result<&mut Self> {
        let pattern = self
            .last
            .as_ref()
            .and_then(|range| self.routes.get(range.start))
            .map(|route| route.pattern.clone())
            .ok_or_else(|| Error::NoRouteToName(name.to_owned()))?;

        debug!(name, %pattern, "naming route");
        self.names.insert(name, pattern);
        Ok(self)
    }

    /// Records a constraint for a parameter name (`pattern("id", "[0-9]+")`).
    ///
    /// Constraints are metadata only; matching does not enforce them.
    pub fn pattern(&mut self, param: impl Into<String>, regex: impl Into<String>) -> &mut Self {
        self.patterns.insert(param.into(), regex.into());
        self
    }

    // ── Registries ───────────────────────────────────────────────────────────

    /// Adds middleware that runs for every matched route, before route middleware.
    pub fn global_middleware(&mut self, middleware: impl Into<MiddlewareRef>) -> &mut Self {
        self.global.push(middleware.into());
        self
    }

    /// Makes `name` resolvable as a middleware reference. `factory` runs once
    /// per request that reaches the reference.
    pub fn register_middleware<M, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        M: Middleware + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.middleware.register(name, factory);
        self
    }

    /// Makes `name` resolvable as the controller of [`Target::Bound`] routes.
    /// `factory` runs once per dispatched request.
    pub fn controller<C, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        C: Controller + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.controllers.register(name, factory);
        self
    }

    /// Registers a lifecycle callback. See [`hooks`](crate::hooks) for the
    /// events the dispatcher fires.
    pub fn hook<F>(&mut self, event: impl Into<String>, callback: F) -> &mut Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.hooks.register(event, callback);
        self
    }

    /// Fires `event` by hand, for events the dispatcher does not fire itself.
    pub fn fire(&self, event: &str, method: &str, path: &str) {
        self.hooks.fire(event, method, path);
    }

    /// Replaces the default response for failures with `status`.
    ///
    /// The handler's response is used as-is, status included.
    pub fn on_error<F, R>(&mut self, status: StatusCode, handler: F) -> &mut Self
    where
        F: Fn(&DispatchError) -> R + Send + Sync + 'static,
        R: IntoResponse,
    {
        self.error_handlers
            .insert(status, Arc::new(move |err: &DispatchError| handler(err).into_response()));
        self
    }

    /// Where authentication-style middleware should send rejected requests.
    /// Stored for middleware to read; the router itself never redirects.
    pub fn set_middleware_redirect(&mut self, target: impl Into<String>) -> &mut Self {
        self.middleware_redirect = Some(target.into());
        self
    }

    pub fn middleware_redirect(&self) -> Option<&str> {
        self.middleware_redirect.as_deref()
    }

    // ── Introspection ────────────────────────────────────────────────────────

    pub fn routes(&self) -> &RouteTable { &self.routes }
    pub fn names(&self) -> &NamedRoutes { &self.names }
    pub fn patterns(&self) -> &BTreeMap<String, String> { &self.patterns }
    pub fn global(&self) -> &[MiddlewareRef] { &self.global }
    pub fn len(&self) -> usize { self.routes.len() }
    pub fn is_empty(&self) -> bool { self.routes.is_empty() }

    /// Builds a URL for a named route. See [`NamedRoutes::url`].
    pub fn url<K, V>(&self, name: &str, params: &[(K, V)]) -> Result<String>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.names.url(name, params)
    }

    // ── Route cache ──────────────────────────────────────────────────────────

    /// Writes the route table and named routes to `path`.
    ///
    /// Fails without writing anything when a route has a function handler or
    /// an instance middleware: neither can be restored from bytes.
    pub fn cache_routes(&self, path: impl AsRef<Path>) -> Result<()> {
        cache::write(path.as_ref(), &self.routes, &self.names)
    }

    /// Replaces the route table and named routes with the contents of
    /// `path`. Returns `Ok(false)` and changes nothing when the file does
    /// not exist.
    pub fn load_cached_routes(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let Some(cached) = cache::read(path.as_ref())? else {
            return Ok(false);
        };
        self.routes.replace(cached.routes);
        self.names.replace(cached.names);
        self.last = None;
        Ok(true)
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    /// Resolves `req` to a response, mapping failures to `404`, `405` or `500`.
    pub fn dispatch(&self, req: Request) -> Response {
        let method = req.method.clone();
        let path = req.path.clone();

        match self.try_dispatch(req) {
            Ok(response) => {
                debug!(%method, %path, status = response.status.as_u16(), "dispatched");
                response
            }
            Err(err) => {
                let status = err.status();
                if status.is_server_error() {
                    warn!(%method, %path, status = status.as_u16(), error = %err, "dispatch failed");
                } else {
                    debug!(%method, %path, status = status.as_u16(), error = %err, "dispatch failed");
                }
                self.error_response(&err)
            }
        }
    }

    /// Resolves `req`, returning why it did not reach a handler on failure.
    pub fn try_dispatch(&self, mut req: Request) -> Result<Response, DispatchError> {
        self.hooks.fire(hooks::BEFORE, &req.method, &req.path);

        let method: Method = req
            .method
            .parse()
            .map_err(|()| DispatchError::MethodNotSupported(req.method.clone()))?;

        let Some((route, params)) = self.find(method, &req.path, req.host()) else {
            self.hooks.fire(hooks::AFTER, &req.method, &req.path);
            return Err(DispatchError::RouteNotFound { method, path: req.path });
        };

        let label = route.label();
        trace!(route = %label, params = ?params, "matched");
        req.params = params;

        if let Some(response) = middleware::run(&self.global, &route.middleware, &self.middleware, &req, &label)? {
            return Ok(response);
        }

        self.invoke(route, &label, req)
    }

    /// First route in table order whose method, host and pattern accept the request.
    fn find(&self, method: Method, path: &str, host: Option<&str>) -> Option<(&Route, Params)> {
        self.routes
            .iter()
            .filter(|route| route.method == method && route.serves_host(host))
            .find_map(|route| match_path(&route.pattern, path).map(|params| (route, params)))
    }

    fn invoke(&self, route: &Route, label: &str, req: Request) -> Result<Response, DispatchError> {
        match &route.target {
            Target::Direct(handler) => Ok(handler.call(req)),
            Target::Bound { controller, action } => {
                if controller.is_empty() || action.is_empty() {
                    return Err(DispatchError::InvalidHandler {
                        route: label.to_owned(),
                        detail: format!("incomplete controller reference `{controller}@{action}`"),
                    });
                }
                let instance = self.controllers.resolve(controller).ok_or_else(|| {
                    DispatchError::HandlerNotFound {
                        route: label.to_owned(),
                        detail: format!("no controller `{controller}`"),
                    }
                })?;
                instance.call(action, req).ok_or_else(|| DispatchError::HandlerNotFound {
                    route: label.to_owned(),
                    detail: format!("controller `{controller}` has no action `{action}`"),
                })
            }
        }
    }

    fn error_response(&self, err: &DispatchError) -> Response {
        match self.error_handlers.get(&err.status()) {
            Some(handler) => handler(err),
            None => Response::builder().status(err.status()).text(err.message()),
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("names", &self.names)
            .field("global", &self.global)
            .field("middleware", &self.middleware)
            .field("controllers", &self.controllers)
            .field("hooks", &self.hooks)
            .field("error_handlers", &self.error_handlers.keys().collect::<Vec<_>>())
            .field("patterns", &self.patterns)
            .field("middleware_redirect", &self.middleware_redirect)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(_req: Request) -> &'static str {
        "ok"
    }

    #[test]
    fn any_registers_every_verb_and_middleware_covers_them_all() {
        let mut router = Router::new();
        router.any("/ping", ok).middleware("trace");

        assert_eq!(router.len(), 5);
        assert!(router.routes().iter().all(|r| r.middleware().len() == 1));
        let methods: Vec<_> = router.routes().iter().map(Route::method).collect();
        assert_eq!(methods, Method::ALL);
    }

    #[test]
    fn middleware_targets_only_the_latest_registration() {
        let mut router = Router::new();
        router.get("/a", ok);
        router.get("/b", ok).middleware("auth");

        let a = router.routes().get(0).unwrap();
        let b = router.routes().get(1).unwrap();
        assert!(a.middleware().is_empty());
        assert_eq!(b.middleware()[0].name(), Some("auth"));
    }

    #[test]
    fn middleware_tracks_route_across_priority_reordering() {
        let mut router = Router::new();
        router.get("/low", ok);
        router.add_route(Method::Get, "/high", ok, 9).middleware("auth");

        assert_eq!(router.routes().get(0).unwrap().pattern(), "/high");
        assert_eq!(router.routes().get(0).unwrap().middleware().len(), 1);
        assert!(router.routes().get(1).unwrap().middleware().is_empty());
    }

    #[test]
    fn name_without_routes_fails() {
        let mut router = Router::new();
        assert!(matches!(router.name("home"), Err(Error::NoRouteToName(_))));
    }

    #[test]
    fn patterns_are_metadata_only() {
        let mut router = Router::new();
        router.pattern("id", "[0-9]+").get("/users/{id}", ok);

        assert_eq!(router.patterns().get("id").map(String::as_str), Some("[0-9]+"));
        let res = router.dispatch(Request::new("GET", "/users/abc"));
        assert_eq!(res.status_code(), StatusCode::OK);
    }

    #[test]
    fn namespace_applies_to_bound_targets() {
        let mut router = Router::new();
        router.group(GroupAttributes::new().namespace("Admin"), |admin| {
            admin.get("/users", Target::action("Users", "index"));
        });

        let route = router.routes().get(0).unwrap();
        assert!(matches!(route.target(), Target::Bound { controller, .. } if controller == "Admin::Users"));
    }

    #[test]
    fn redirect_is_stored_metadata() {
        let mut router = Router::new();
        assert_eq!(router.middleware_redirect(), None);
        router.set_middleware_redirect("/login");
        assert_eq!(router.middleware_redirect(), Some("/login"));
    }
}
