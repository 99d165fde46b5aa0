//! Named routes and reverse URL generation.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Route name → normalized pattern.
#[derive(Clone, Debug, Default)]
pub struct NamedRoutes {
    patterns: HashMap<String, String>,
}

impl NamedRoutes {
    /// Binds `name` to `pattern`, overwriting any earlier binding.
    pub fn insert(&mut self, name: impl Into<String>, pattern: impl Into<String>) {
        self.patterns.insert(name.into(), pattern.into());
    }

    pub fn pattern(&self, name: &str) -> Option<&str> {
        self.patterns.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.patterns.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize { self.patterns.len() }
    pub fn is_empty(&self) -> bool { self.patterns.is_empty() }

    /// Builds a URL from the pattern bound to `name`.
    ///
    /// Each `{key}` with a value in `params` is replaced verbatim; values are
    /// not escaped. Placeholders without a value stay as they are.
    ///
    /// ```rust
    /// use waypost::NamedRoutes;
    ///
    /// let mut names = NamedRoutes::default();
    /// names.insert("post.comment", "/posts/{post}/comments/{id}");
    ///
    /// let url = names.url("post.comment", &[("post", "7"), ("id", "2")]).unwrap();
    /// assert_eq!(url, "/posts/7/comments/2");
    ///
    /// let partial = names.url("post.comment", &[("post", "7")]).unwrap();
    /// assert_eq!(partial, "/posts/7/comments/{id}");
    /// ```
    pub fn url<K, V>(&self, name: &str, params: &[(K, V)]) -> Result<String>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let pattern = self
            .pattern(name)
            .ok_or_else(|| Error::RouteNotNamed(name.to_owned()))?;

        Ok(params.iter().fold(pattern.to_owned(), |url, (key, value)| {
            url.replace(&format!("{{{}}}", key.as_ref()), value.as_ref())
        }))
    }

    pub(crate) fn replace(&mut self, patterns: HashMap<String, String>) {
        self.patterns = patterns;
    }

    pub(crate) fn as_map(&self) -> &HashMap<String, String> {
        &self.patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_fails() {
        let names = NamedRoutes::default();
        let err = names.url::<&str, &str>("nope", &[]).unwrap_err();
        assert!(matches!(err, Error::RouteNotNamed(name) if name == "nope"));
    }

    #[test]
    fn rebinding_overwrites() {
        let mut names = NamedRoutes::default();
        names.insert("home", "/old");
        names.insert("home", "/new");
        assert_eq!(names.pattern("home"), Some("/new"));
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn values_are_not_escaped() {
        let mut names = NamedRoutes::default();
        names.insert("search", "/search/{q}");
        let url = names.url("search", &[("q", "a b/c")]).unwrap();
        assert_eq!(url, "/search/a b/c");
    }

    #[test]
    fn extra_params_are_ignored() {
        let mut names = NamedRoutes::default();
        names.insert("show", "/posts/{id}");
        let url = names.url("show", &[("id", "7".to_string()), ("page", "2".to_string())]).unwrap();
        assert_eq!(url, "/posts/7");
    }
}
