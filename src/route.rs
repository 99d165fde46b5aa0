//! Routes and the priority-ordered route table.
//!
//! The table is a plain `Vec` walked front to back at dispatch time. It is
//! kept sorted by descending priority; routes of equal priority stay in
//! registration order. Nothing prevents two routes from sharing a method and
//! pattern: the one further forward wins and the other is unreachable for
//! the inputs they both match.

use std::ops::Range;

use crate::handler::Target;
use crate::method::Method;
use crate::middleware::MiddlewareRef;

/// One registration: method, normalized pattern, target, middleware, priority.
#[derive(Clone, Debug)]
pub struct Route {
    pub(crate) method: Method,
    pub(crate) pattern: String,
    pub(crate) target: Target,
    pub(crate) middleware: Vec<MiddlewareRef>,
    pub(crate) priority: i32,
    pub(crate) host: Option<String>,
}

impl Route {
    pub fn method(&self) -> Method { self.method }
    pub fn pattern(&self) -> &str { &self.pattern }
    pub fn target(&self) -> &Target { &self.target }
    pub fn middleware(&self) -> &[MiddlewareRef] { &self.middleware }
    pub fn priority(&self) -> i32 { self.priority }
    pub fn host(&self) -> Option<&str> { self.host.as_deref() }

    /// `METHOD /pattern`, used in logs and dispatch errors.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.pattern)
    }

    /// Whether this route serves requests for `host`. Routes without a host
    /// serve every host.
    pub(crate) fn serves_host(&self, host: Option<&str>) -> bool {
        match &self.host {
            None => true,
            Some(expected) => host == Some(expected.as_str()),
        }
    }
}

/// Canonical form of a route path: one leading `/`, no trailing `/`, no
/// empty segments. The root is `/`.
///
/// ```rust
/// use waypost::normalize_path;
///
/// assert_eq!(normalize_path("users/"), "/users");
/// assert_eq!(normalize_path("//api///users"), "/api/users");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Joins a group prefix and a route path into one normalized pattern.
pub(crate) fn join_paths(prefix: &str, path: &str) -> String {
    normalize_path(&format!("{prefix}/{path}"))
}

/// Routes sorted by descending priority, stable on ties.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `route` after every route whose priority is greater than or
    /// equal to its own. Returns the index it landed at.
    ///
    /// This is the same order a stable sort would produce after appending,
    /// without re-sorting the whole table.
    pub fn insert(&mut self, route: Route) -> usize {
        let at = self.routes.partition_point(|r| r.priority >= route.priority);
        self.routes.insert(at, route);
        at
    }

    /// Inserts a batch of equal-priority routes contiguously and returns the
    /// index range they occupy.
    pub(crate) fn insert_batch(&mut self, routes: Vec<Route>) -> Range<usize> {
        let mut range = 0..0;
        for (i, route) in routes.into_iter().enumerate() {
            let at = self.insert(route);
            if i == 0 {
                range = at..at;
            }
            range.end = at + 1;
        }
        range
    }

    /// Wholesale replacement, used by the route cache.
    pub(crate) fn replace(&mut self, mut routes: Vec<Route>) {
        routes.sort_by(|a, b| b.priority.cmp(&a.priority));
        self.routes = routes;
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Route> {
        self.routes.get_mut(index)
    }

    pub fn get(&self, index: usize) -> Option<&Route> {
        self.routes.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize { self.routes.len() }
    pub fn is_empty(&self) -> bool { self.routes.is_empty() }
}

impl<'a> IntoIterator for &'a RouteTable {
    type Item = &'a Route;
    type IntoIter = std::slice::Iter<'a, Route>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
