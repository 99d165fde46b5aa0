//! Middleware layer.
//!
//! Middleware runs between route matching and the handler. Each unit gets a
//! look at the request and either lets it through (`None`) or answers it
//! (`Some(response)`), in which case nothing after it runs: no further
//! middleware, no handler.
//!
//! Two tiers exist. *Global* middleware is registered on the router and runs
//! for every matched route; *route* middleware is attached per route, either
//! by a group or by [`Router::middleware`](crate::Router::middleware). Global
//! runs first. Within a tier, registration order is execution order.
//!
//! A unit is referenced either by name, resolved through a
//! [`MiddlewareRegistry`] to a freshly built instance on every request, or by
//! a shared instance. Only named references survive the route cache.

mod pipeline;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::request::Request;
use crate::response::Response;

pub(crate) use pipeline::run;

/// A unit of pre-handler logic.
///
/// The default `handle` lets every request through, so a type that only
/// exists for its side effects at construction time is a valid no-op.
pub trait Middleware: Send + Sync {
    fn handle(&self, _req: &Request) -> Option<Response> {
        None
    }
}

/// Closures work as middleware:
/// `MiddlewareRef::instance(|req: &Request| None)`.
impl<F> Middleware for F
where
    F: Fn(&Request) -> Option<Response> + Send + Sync,
{
    fn handle(&self, req: &Request) -> Option<Response> {
        self(req)
    }
}

/// How a route or the router refers to a unit of middleware.
#[derive(Clone)]
pub enum MiddlewareRef {
    Named(String),
    Instance(Arc<dyn Middleware>),
}

impl MiddlewareRef {
    pub fn instance(middleware: impl Middleware + 'static) -> Self {
        Self::Instance(Arc::new(middleware))
    }

    /// The identifier for named references.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Instance(_) => None,
        }
    }
}

impl From<&str> for MiddlewareRef {
    fn from(name: &str) -> Self {
        Self::Named(name.to_owned())
    }
}

impl From<String> for MiddlewareRef {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<Arc<dyn Middleware>> for MiddlewareRef {
    fn from(instance: Arc<dyn Middleware>) -> Self {
        Self::Instance(instance)
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "Named({name})"),
            Self::Instance(_) => f.write_str("Instance(<middleware>)"),
        }
    }
}

type MiddlewareFactory = Arc<dyn Fn() -> Box<dyn Middleware> + Send + Sync + 'static>;

/// Middleware identifier → factory.
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    factories: HashMap<String, MiddlewareFactory>,
}

impl MiddlewareRegistry {
    pub fn register<M, F>(&mut self, name: impl Into<String>, factory: F)
    where
        M: Middleware + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.factories.insert(
            name.into(),
            Arc::new(move || Box::new(factory()) as Box<dyn Middleware>),
        );
    }

    /// Builds a fresh instance, `None` for an unknown identifier.
    pub(crate) fn resolve(&self, name: &str) -> Option<Box<dyn Middleware>> {
        self.factories.get(name).map(|factory| factory())
    }
}

impl fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}
