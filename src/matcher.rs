//! Segment-by-segment path matching.
//!
//! Patterns are compared against request paths one `/`-separated segment at a
//! time. A segment wrapped in braces (`{id}`) binds whatever the request has
//! at that position; every other segment must be byte-identical. There are no
//! wildcards, optional segments or type constraints: the segment counts must
//! be equal or the match fails.

use crate::request::Params;

/// Matches `path` against `pattern`, returning the bound parameters.
///
/// Leading and trailing slashes are ignored on both sides, so `/users/5/`
/// matches `/users/{id}`. Comparison is case-sensitive and performs no
/// percent-decoding.
///
/// ```rust
/// use waypost::match_path;
///
/// let params = match_path("/users/{id}", "/users/5").unwrap();
/// assert_eq!(params.get("id"), Some("5"));
///
/// assert!(match_path("/users/{id}", "/users/5/edit").is_none());
/// assert!(match_path("/Users/{id}", "/users/5").is_none());
/// ```
pub fn match_path(pattern: &str, path: &str) -> Option<Params> {
    let pattern = pattern.trim_matches('/');
    let path = path.trim_matches('/');

    if pattern.split('/').count() != path.split('/').count() {
        return None;
    }

    let mut params = Params::new();
    for (expected, actual) in pattern.split('/').zip(path.split('/')) {
        match param_name(expected) {
            Some(name) => params.push(name, actual),
            None if expected != actual => return None,
            None => {}
        }
    }
    Some(params)
}

/// `Some("id")` for a `{id}` segment, `None` for a literal.
pub(crate) fn param_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_parameters_in_order() {
        let params = match_path("/posts/{post}/comments/{id}", "/posts/3/comments/9").unwrap();
        assert_eq!(params.nth(0), Some("3"));
        assert_eq!(params.nth(1), Some("9"));
        assert_eq!(params.get("post"), Some("3"));
    }

    #[test]
    fn requires_equal_arity() {
        assert!(match_path("/users/{id}", "/users").is_none());
        assert!(match_path("/users/{id}", "/users/5/edit").is_none());
        assert!(match_path("/users/{id}", "/users/5").is_some());
    }

    #[test]
    fn literals_are_case_sensitive() {
        assert!(match_path("/Users/{id}", "/users/5").is_none());
        assert!(match_path("/about", "/About").is_none());
    }

    #[test]
    fn root_matches_root_only() {
        assert_eq!(match_path("/", "/"), Some(Params::new()));
        assert_eq!(match_path("/", ""), Some(Params::new()));
        assert!(match_path("/", "/x").is_none());
    }

    #[test]
    fn trailing_slash_on_request_is_ignored() {
        assert!(match_path("/about", "/about/").is_some());
    }

    #[test]
    fn no_percent_decoding() {
        assert!(match_path("/files/a b", "/files/a%20b").is_none());
        let params = match_path("/files/{name}", "/files/a%20b").unwrap();
        assert_eq!(params.get("name"), Some("a%20b"));
    }

    #[test]
    fn parameter_segment_accepts_anything_non_structural() {
        let params = match_path("/tags/{tag}", "/tags/Ünïcode").unwrap();
        assert_eq!(params.get("tag"), Some("Ünïcode"));
    }

    #[test]
    fn param_name_requires_both_braces() {
        assert_eq!(param_name("{id}"), Some("id"));
        assert_eq!(param_name("{id"), None);
        assert_eq!(param_name("id}"), None);
    }
}
