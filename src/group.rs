//! Route groups.
//!
//! A group contributes a path prefix, middleware, a controller namespace and
//! optionally a host to every route registered inside it. Groups nest: the
//! context a nested group installs is composed from its parent's, so
//! `/a` inside `/b` inside `/c` really does produce `/a/b/c`.
//!
//! The active context is never ambient. [`Router::group`](crate::Router::group)
//! hands its callback a [`RouteGroup`] that owns the composed context and
//! borrows the router mutably; when the callback returns the registrar is
//! dropped and whatever context was in effect before is in effect again.

use crate::error::Result;
use crate::handler::IntoTarget;
use crate::method::Method;
use crate::middleware::MiddlewareRef;
use crate::route::normalize_path;
use crate::router::Router;

/// The attributes a single `group` call contributes.
///
/// ```rust
/// use waypost::GroupAttributes;
///
/// let attrs = GroupAttributes::new()
///     .prefix("/admin")
///     .middleware("auth")
///     .namespace("Admin")
///     .host("admin.example.com");
/// ```
#[derive(Clone, Debug, Default)]
pub struct GroupAttributes {
    prefix: String,
    middleware: Vec<MiddlewareRef>,
    namespace: String,
    host: Option<String>,
}

impl GroupAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `GroupAttributes::new().prefix(prefix)`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::new().prefix(prefix)
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Appends one middleware reference. Call repeatedly for several.
    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middleware.push(middleware.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Restricts the group's routes to requests whose host is exactly `host`.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

/// The composed attributes of every enclosing group.
#[derive(Clone, Debug, Default)]
pub struct GroupContext {
    pub(crate) prefix: String,
    pub(crate) middleware: Vec<MiddlewareRef>,
    pub(crate) namespace: String,
    pub(crate) host: Option<String>,
}

impl GroupContext {
    /// The context a nested group with `attrs` installs.
    ///
    /// Prefixes concatenate, middleware appends, namespaces join with `::`,
    /// and an inner host replaces an outer one.
    pub fn enter(&self, attrs: GroupAttributes) -> Self {
        let prefix = match normalize_path(&format!("{}/{}", self.prefix, attrs.prefix)) {
            root if root == "/" => String::new(),
            prefix => prefix,
        };

        let mut middleware = self.middleware.clone();
        middleware.extend(attrs.middleware);

        let namespace = match (self.namespace.as_str(), attrs.namespace.as_str()) {
            (outer, "") => outer.to_owned(),
            ("", inner) => inner.to_owned(),
            (outer, inner) => format!("{outer}::{inner}"),
        };

        Self {
            prefix,
            middleware,
            namespace,
            host: attrs.host.or_else(|| self.host.clone()),
        }
    }

    pub fn prefix(&self) -> &str { &self.prefix }
    pub fn middleware(&self) -> &[MiddlewareRef] { &self.middleware }
    pub fn namespace(&self) -> &str { &self.namespace }
    pub fn host(&self) -> Option<&str> { self.host.as_deref() }
}

/// Registrar handed to a group callback.
///
/// Offers the router's registration calls with the group's context applied.
pub struct RouteGroup<'r> {
    router: &'r mut Router,
    context: GroupContext,
}

impl<'r> RouteGroup<'r> {
    pub(crate) fn new(router: &'r mut Router, context: GroupContext) -> Self {
        Self { router, context }
    }

    pub fn context(&self) -> &GroupContext {
        &self.context
    }

    pub fn add_route(&mut self, method: Method, path: &str, target: impl IntoTarget, priority: i32) -> &mut Self {
        self.router.register(&self.context, &[method], path, target.into_target(), priority);
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

    pub fn any(&mut self, path: &str, target: impl IntoTarget) -> &mut Self {
        self.router.register(&self.context, &Method::ALL, path, target.into_target(), 0);
        self
    }

    /// See [`Router::middleware`].
    pub fn middleware(&mut self, middleware: impl Into<MiddlewareRef>) -> &mut Self {
        self.router.middleware(middleware);
        self
    }

    /// See [`Router::name`].
    pub fn name(&mut self, name: &str) -> Result<&mut Self> {
        self.router.name(name)?;
        Ok(self)
    }

    /// Opens a nested group whose context is composed from this one.
    pub fn group<F>(&mut self, attrs: GroupAttributes, f: F) -> &mut Self
    where
        F: FnOnce(&mut RouteGroup<'_>),
    {
        let context = self.context.enter(attrs);
        f(&mut RouteGroup::new(&mut *self.router, context));
        self
    }
}
