//! Ordered, short-circuiting middleware execution.

use tracing::trace;

use crate::error::DispatchError;
use crate::request::Request;
use crate::response::Response;

use super::{MiddlewareRef, MiddlewareRegistry};

/// Runs `global` then `route` middleware against `req`.
///
/// Returns the first response any unit produces, or `None` when every unit
/// let the request through. Named references are resolved one at a time, just
/// before they run, so an unknown name after a short-circuiting unit is never
/// reported.
pub(crate) fn run(
    global: &[MiddlewareRef],
    route: &[MiddlewareRef],
    registry: &MiddlewareRegistry,
    req: &Request,
    route_label: &str,
) -> Result<Option<Response>, DispatchError> {
    for (position, reference) in global.iter().chain(route).enumerate() {
        let response = match reference {
            MiddlewareRef::Instance(instance) => instance.handle(req),
            MiddlewareRef::Named(name) => registry
                .resolve(name)
                .ok_or_else(|| DispatchError::UnknownMiddleware {
                    route: route_label.to_owned(),
                    name: name.clone(),
                })?
                .handle(req),
        };

        if let Some(response) = response {
            trace!(position, middleware = ?reference, "middleware short-circuited");
            return Ok(Some(response));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::middleware::Middleware;

    struct Record {
        log: Arc<Mutex<Vec<&'static str>>>,
        label: &'static str,
        answer: Option<&'static str>,
    }

    impl Middleware for Record {
        fn handle(&self, _req: &Request) -> Option<Response> {
            self.log.lock().unwrap().push(self.label);
            self.answer.map(Response::text)
        }
    }

    fn record(log: &Arc<Mutex<Vec<&'static str>>>, label: &'static str, answer: Option<&'static str>) -> MiddlewareRef {
        MiddlewareRef::instance(Record { log: Arc::clone(log), label, answer })
    }

    #[test]
    fn global_runs_before_route_and_all_continue() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let global = [record(&log, "g1", None), record(&log, "g2", None)];
        let route = [record(&log, "r1", None)];

        let out = run(&global, &route, &MiddlewareRegistry::default(), &Request::new("GET", "/"), "GET /").unwrap();

        assert!(out.is_none());
        assert_eq!(*log.lock().unwrap(), ["g1", "g2", "r1"]);
    }

    #[test]
    fn first_response_stops_the_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let global = [record(&log, "g1", None)];
        let route = [record(&log, "r1", Some("blocked")), record(&log, "r2", None)];

        let out = run(&global, &route, &MiddlewareRegistry::default(), &Request::new("GET", "/"), "GET /").unwrap();

        assert_eq!(out.map(|r| r.body_text()).as_deref(), Some("blocked"));
        assert_eq!(*log.lock().unwrap(), ["g1", "r1"]);
    }

    #[test]
    fn unknown_name_is_a_dispatch_error() {
        let route = [MiddlewareRef::from("auth")];
        let err = run(&[], &route, &MiddlewareRegistry::default(), &Request::new("GET", "/"), "GET /admin")
            .unwrap_err();

        assert_eq!(err, DispatchError::UnknownMiddleware { route: "GET /admin".into(), name: "auth".into() });
    }

    #[test]
    fn default_handle_is_a_no_op() {
        struct Silent;
        impl Middleware for Silent {}

        let mut registry = MiddlewareRegistry::default();
        registry.register("silent", || Silent);

        let out = run(&[MiddlewareRef::from("silent")], &[], &registry, &Request::new("GET", "/"), "GET /").unwrap();
        assert!(out.is_none());
    }
}
