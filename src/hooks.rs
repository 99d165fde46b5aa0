//! Lifecycle hooks fired during dispatch.
//!
//! The dispatcher fires two events:
//!
//! | Event | When | Arguments |
//! |---|---|---|
//! | `before` | first thing in every dispatch, before method validation | `(method, path)` |
//! | `after` | only when no route matched (the `404` path) | `(method, path)` |
//!
//! `after` does not fire for successful dispatches, `405`s or `500`s. Code
//! that needs a hook after every request should wrap
//! [`Router::dispatch`](crate::Router::dispatch) instead.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub const BEFORE: &str = "before";
pub const AFTER: &str = "after";

type Hook = Arc<dyn Fn(&str, &str) + Send + Sync + 'static>;

/// Event name → callbacks, in registration order.
#[derive(Clone, Default)]
pub struct Hooks {
    callbacks: HashMap<String, Vec<Hook>>,
}

impl Hooks {
    pub fn register<F>(&mut self, event: impl Into<String>, callback: F)
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.callbacks.entry(event.into()).or_default().push(Arc::new(callback));
    }

    /// Runs every callback registered under `event`. Unknown events are a no-op.
    pub fn fire(&self, event: &str, method: &str, path: &str) {
        for callback in self.callbacks.get(event).into_iter().flatten() {
            callback(method, path);
        }
    }

    pub fn count(&self, event: &str) -> usize {
        self.callbacks.get(event).map_or(0, Vec::len)
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.callbacks.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn fires_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = Hooks::default();

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            hooks.register(BEFORE, move |method: &str, path: &str| {
                seen.lock().unwrap().push(format!("{tag} {method} {path}"));
            });
        }

        hooks.fire(BEFORE, "GET", "/x");
        hooks.fire(AFTER, "GET", "/x");

        assert_eq!(*seen.lock().unwrap(), ["first GET /x", "second GET /x"]);
        assert_eq!(hooks.count(BEFORE), 2);
        assert_eq!(hooks.count(AFTER), 0);
    }
}
