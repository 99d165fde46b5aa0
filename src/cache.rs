//! Route cache (de)serialization.
//!
//! The cache is a JSON document holding the route table and the named-route
//! map. Only plain data survives: controller-bound targets and named
//! middleware. A table holding a function handler or a middleware instance
//! is refused outright instead of being written with holes in it.
//!
//! Writes go to a sibling temp file first and are renamed into place, so a
//! reader never observes a half-written cache.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::handler::Target;
use crate::method::Method;
use crate::middleware::MiddlewareRef;
use crate::names::NamedRoutes;
use crate::route::{Route, RouteTable};

const VERSION: u32 = 1;

#[derive(Debug, Deserialize, Serialize)]
struct CacheFile {
    version: u32,
    routes: Vec<CachedRoute>,
    #[serde(default)]
    names: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct CachedRoute {
    method: Method,
    pattern: String,
    controller: String,
    action: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    middleware: Vec<String>,
    #[serde(default)]
    priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    host: Option<String>,
}

/// What a cache file restores.
pub(crate) struct Cached {
    pub(crate) routes: Vec<Route>,
    pub(crate) names: HashMap<String, String>,
}

impl TryFrom<&Route> for CachedRoute {
    type Error = Error;

    fn try_from(route: &Route) -> Result<Self> {
        let uncacheable = |reason| Error::Uncacheable {
            method: route.method,
            pattern: route.pattern.clone(),
            reason,
        };

        let Target::Bound { controller, action } = &route.target else {
            return Err(uncacheable("function handlers cannot be cached"));
        };

        let middleware = route
            .middleware
            .iter()
            .map(|m| m.name().map(str::to_owned))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| uncacheable("middleware instances cannot be cached"))?;

        Ok(Self {
            method: route.method,
            pattern: route.pattern.clone(),
            controller: controller.clone(),
            action: action.clone(),
            middleware,
            priority: route.priority,
            host: route.host.clone(),
        })
    }
}

impl From<CachedRoute> for Route {
    fn from(cached: CachedRoute) -> Self {
        Route {
            method: cached.method,
            pattern: cached.pattern,
            target: Target::Bound { controller: cached.controller, action: cached.action },
            middleware: cached.middleware.into_iter().map(MiddlewareRef::Named).collect(),
            priority: cached.priority,
            host: cached.host,
        }
    }
}

pub(crate) fn write(path: &Path, table: &RouteTable, names: &NamedRoutes) -> Result<()> {
    let routes = table
        .iter()
        .map(CachedRoute::try_from)
        .collect::<Result<Vec<_>>>()?;

    let file = CacheFile { version: VERSION, routes, names: names.as_map().clone() };
    let bytes = serde_json::to_vec_pretty(&file).map_err(|source| Error::Cache {
        path: path.to_owned(),
        source,
    })?;

    let tmp = temp_path(path);
    if let Err(e) = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    info!(path = %path.display(), routes = file.routes.len(), "route cache written");
    Ok(())
}

/// `Ok(None)` when `path` does not exist.
pub(crate) fn read(path: &Path) -> Result<Option<Cached>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no route cache");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let file: CacheFile = serde_json::from_slice(&bytes).map_err(|source| Error::Cache {
        path: path.to_owned(),
        source,
    })?;
    if file.version != VERSION {
        return Err(Error::CacheVersion { path: path.to_owned(), found: file.version });
    }

    info!(path = %path.display(), routes = file.routes.len(), "route cache loaded");
    Ok(Some(Cached {
        routes: file.routes.into_iter().map(Route::from).collect(),
        names: file.names,
    }))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(pattern: &str, priority: i32) -> Route {
        Route {
            method: Method::Post,
            pattern: pattern.to_owned(),
            target: Target::action("Posts", "store"),
            middleware: vec![MiddlewareRef::from("auth")],
            priority,
            host: Some("api.test".into()),
        }
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), b"x").unwrap();

        let mut table = RouteTable::new();
        table.insert(bound("/posts", 0));

        let err = write(&path, &table, &NamedRoutes::default()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");

        let mut table = RouteTable::new();
        table.insert(bound("/posts", 0));
        table.insert(bound("/drafts", 4));
        let mut names = NamedRoutes::default();
        names.insert("posts.store", "/posts");

        write(&path, &table, &names).unwrap();
        assert!(!temp_path(&path).exists());

        let cached = read(&path).unwrap().unwrap();
        let patterns: Vec<_> = cached.routes.iter().map(Route::pattern).collect();
        assert_eq!(patterns, ["/drafts", "/posts"]);
        assert_eq!(cached.routes[0].priority, 4);
        assert_eq!(cached.routes[0].host(), Some("api.test"));
        assert_eq!(cached.routes[0].middleware[0].name(), Some("auth"));
        assert_eq!(cached.names.get("posts.store").map(String::as_str), Some("/posts"));
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn refuses_middleware_instances() {
        let mut route = bound("/posts", 0);
        route.middleware.push(MiddlewareRef::instance(|_: &crate::Request| -> Option<crate::Response> { None }));

        let err = CachedRoute::try_from(&route).unwrap_err();
        assert!(matches!(err, Error::Uncacheable { reason, .. } if reason.contains("middleware")));
    }

    #[test]
    fn rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        fs::write(&path, r#"{"version": 99, "routes": []}"#).unwrap();

        assert!(matches!(read(&path), Err(Error::CacheVersion { found: 99, .. })));
    }

    #[test]
    fn rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(read(&path), Err(Error::Cache { .. })));
    }
}
