//! Configuration loading.
//!
//! ```toml
//! [router]
//! middleware_redirect = "/login"
//! route_cache = "var/routes.json"
//!
//! [server]
//! addr = "0.0.0.0:3000"
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub router: RouterConfig,
    pub server: ServerConfig,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    /// Advisory redirect target for middleware that rejects a request.
    pub middleware_redirect: Option<String>,
    /// Route cache loaded by [`Router::from_config`](crate::Router::from_config) when present.
    pub route_cache: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: "127.0.0.1:3000".to_owned() }
    }
}

impl Config {
    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn parses_every_key() {
        let config = Config::from_toml(
            r#"
            [router]
            middleware_redirect = "/login"
            route_cache = "var/routes.json"

            [server]
            addr = "0.0.0.0:8080"
            "#,
        )
        .unwrap();

        assert_eq!(config.router.middleware_redirect.as_deref(), Some("/login"));
        assert_eq!(config.router.route_cache, Some(PathBuf::from("var/routes.json")));
        assert_eq!(config.server.addr, "0.0.0.0:8080");
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        assert!(matches!(Config::from_toml("[router"), Err(Error::Config(_))));
    }

    #[test]
    fn missing_file_is_io() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(Config::load(dir.path().join("nope.toml")), Err(Error::Io(_))));
    }
}
