//! Handler trait, type erasure, and controller-bound targets.
//!
//! # How handlers are stored
//!
//! A route points at one of two things, modelled as the closed enum
//! [`Target`]:
//!
//! - [`Target::Direct`]: a function, type-erased behind an `Arc` so the same
//!   handler can sit under several verbs (`Router::any`).
//! - [`Target::Bound`]: a `(controller, action)` pair of identifiers. The
//!   controller is looked up in the router's [`ControllerRegistry`] at
//!   dispatch time, a fresh instance is built, and the action is invoked by
//!   name. Because it is plain data, only this form survives the route cache.
//!
//! ```text
//! fn show(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.get("/posts/{id}", show)
//! show.into_target()                        ← IntoTarget blanket impl
//!        ↓
//! Target::Direct(Arc::new(FnHandler(show)))
//!        ↓ at request time
//! handler.call(req)                         ← one vtable dispatch
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Type-erased function handlers ─────────────────────────────────────────────

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// public [`BoxedHandler`] alias carried by [`Target::Direct`].
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> Response;
}

/// A heap-allocated, type-erased handler shared across routes and threads.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler function.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the signature:
///
/// ```text
/// fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, R> private::Sealed for F
where
    F: Fn(Request) -> R + Send + Sync + 'static,
    R: IntoResponse,
{
}

impl<F, R> Handler for F
where
    F: Fn(Request) -> R + Send + Sync + 'static,
    R: IntoResponse,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Newtype wrapper bridging a concrete `F` to the trait-object world.
struct FnHandler<F>(F);

impl<F, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> R,
    R: IntoResponse,
{
    fn call(&self, req: Request) -> Response {
        (self.0)(req).into_response()
    }
}

// ── Target ────────────────────────────────────────────────────────────────────

/// What a route invokes once its middleware lets the request through.
#[derive(Clone)]
pub enum Target {
    Direct(BoxedHandler),
    Bound { controller: String, action: String },
}

impl Target {
    /// A controller-bound target.
    ///
    /// ```rust
    /// use waypost::Target;
    ///
    /// let target = Target::action("PostController", "show");
    /// assert!(target.is_cacheable());
    /// ```
    pub fn action(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Bound { controller: controller.into(), action: action.into() }
    }

    /// `true` for the [`Bound`](Target::Bound) form.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Self::Bound { .. })
    }

    /// Prefixes a bound controller identifier with a group namespace.
    pub(crate) fn in_namespace(self, namespace: &str) -> Self {
        match self {
            Self::Bound { controller, action } if !namespace.is_empty() => Self::Bound {
                controller: format!("{namespace}::{controller}"),
                action,
            },
            other => other,
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(_) => f.write_str("Direct(<fn>)"),
            Self::Bound { controller, action } => write!(f, "Bound({controller}@{action})"),
        }
    }
}

/// Anything a registration call accepts as a route target.
///
/// Implemented for every [`Handler`] function and for [`Target`] itself, so
/// both `router.get("/", home)` and
/// `router.get("/", Target::action("Home", "index"))` work.
pub trait IntoTarget {
    fn into_target(self) -> Target;
}

impl<H: Handler> IntoTarget for H {
    fn into_target(self) -> Target {
        Target::Direct(self.into_boxed_handler())
    }
}

impl IntoTarget for Target {
    fn into_target(self) -> Target { self }
}

// ── Controllers ───────────────────────────────────────────────────────────────

/// A type whose actions are addressed by name from [`Target::Bound`] routes.
///
/// Returning `None` means "no such action"; the dispatcher answers `500`.
///
/// ```rust
/// use waypost::{Controller, IntoResponse, Request, Response};
///
/// #[derive(Default)]
/// struct PostController;
///
/// impl Controller for PostController {
///     fn call(&self, action: &str, req: Request) -> Option<Response> {
///         match action {
///             "index" => Some("all posts".into_response()),
///             "show"  => Some(format!("post {}", req.params().nth(0)?).into_response()),
///             _       => None,
///         }
///     }
/// }
/// ```
pub trait Controller {
    fn call(&self, action: &str, req: Request) -> Option<Response>;
}

type ControllerFactory = Arc<dyn Fn() -> Box<dyn Controller> + Send + Sync + 'static>;

/// Controller identifier → factory. Every resolution builds a fresh instance.
#[derive(Clone, Default)]
pub struct ControllerRegistry {
    factories: HashMap<String, ControllerFactory>,
}

impl ControllerRegistry {
    pub fn register<C, F>(&mut self, name: impl Into<String>, factory: F)
    where
        C: Controller + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.factories.insert(
            name.into(),
            Arc::new(move || Box::new(factory()) as Box<dyn Controller>),
        );
    }

    pub(crate) fn resolve(&self, name: &str) -> Option<Box<dyn Controller>> {
        self.factories.get(name).map(|factory| factory())
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn hello(_req: Request) -> &'static str {
        "hello"
    }

    #[test]
    fn functions_erase_to_direct_targets() {
        let Target::Direct(handler) = hello.into_target() else {
            panic!("expected a direct target");
        };
        assert_eq!(handler.call(Request::new("GET", "/")).body_text(), "hello");
    }

    #[test]
    fn namespace_only_touches_bound_targets() {
        let bound = Target::action("Users", "index").in_namespace("Admin");
        assert!(matches!(bound, Target::Bound { ref controller, .. } if controller == "Admin::Users"));

        let untouched = Target::action("Users", "index").in_namespace("");
        assert!(matches!(untouched, Target::Bound { ref controller, .. } if controller == "Users"));

        assert!(!hello.into_target().in_namespace("Admin").is_cacheable());
    }

    #[test]
    fn registry_builds_a_fresh_instance_per_resolution() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);

        struct Counted;
        impl Controller for Counted {
            fn call(&self, _action: &str, _req: Request) -> Option<Response> { None }
        }

        let mut registry = ControllerRegistry::default();
        registry.register("Counted", || {
            BUILT.fetch_add(1, Ordering::SeqCst);
            Counted
        });

        assert!(registry.resolve("Counted").is_some());
        assert!(registry.resolve("Counted").is_some());
        assert!(registry.resolve("Missing").is_none());
        assert_eq!(BUILT.load(Ordering::SeqCst), 2);
    }
}
