use crate::{Error, ErrorKind};
use regex::Regex;
use std::collections::HashMap;
use std::convert::From;
use std::fmt;
use std::string::ToString;

///
/// Allows matching request headers or bodies in multiple ways: by the exact value, by a substring,
/// by any value (as long as it is present), by regular expression or by checking that a particular
/// header is missing.
///
/// These matchers can be used within the `Stub::match_header`, `Stub::match_body`,
/// `RequestPattern::match_header` or `RequestPattern::match_body` calls.
///
/// Regular expressions have to match the whole value. They are compiled when the matcher is
/// added, and an invalid one panics right there.
///
#[derive(Clone, PartialEq, Debug)]
pub enum Matcher {
    /// Matches the exact header value or body. There's also an implementation of `From<&str>`
    /// to keep things simple.
    Exact(String),
    /// Matches a header value or body containing the given substring.
    Contains(String),
    /// Matches a header value or body by a regular expression.
    Regex(String),
    /// At least one matcher must match
    AnyOf(Vec<Matcher>),
    /// All matchers must match
    AllOf(Vec<Matcher>),
    /// Matches any header value or body.
    Any,
    /// Checks that a header is not present in the request (or that the body is empty).
    Missing,
}

impl<'a> From<&'a str> for Matcher {
    fn from(value: &str) -> Self {
        Matcher::Exact(value.to_string())
    }
}

impl From<String> for Matcher {
    fn from(value: String) -> Self {
        Matcher::Exact(value)
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join_matches = |matches: &[Self]| {
            matches
                .iter()
                .map(Self::to_string)
                .collect::<Vec<String>>()
                .join(", ")
        };

        let result = match self {
            Matcher::Exact(ref value) => value.to_string(),
            Matcher::Contains(ref value) => format!("{} (contains)", value),
            Matcher::Regex(ref value) => format!("{} (regex)", value),
            Matcher::Any => "(any)".to_string(),
            Matcher::AnyOf(x) => format!("({}) (any of)", join_matches(x)),
            Matcher::AllOf(x) => format!("({}) (all of)", join_matches(x)),
            Matcher::Missing => "(missing)".to_string(),
        };
        write!(f, "{}", result)
    }
}

impl Matcher {
    #[track_caller]
    pub(crate) fn compile_into(&self, regexes: &mut Regexes) {
        match self {
            Matcher::Regex(ref regex) => regexes.compile(regex),
            Matcher::AnyOf(ref matchers) | Matcher::AllOf(ref matchers) => {
                for matcher in matchers {
                    matcher.compile_into(regexes);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn matches_values(&self, header_values: &[&str], regexes: &Regexes) -> bool {
        match self {
            Matcher::Missing => header_values.is_empty(),
            // AnyOf([…Missing…]) is handled here, but
            // AnyOf([Something]) is handled in the last block.
            // That's because Missing matches against all values at once,
            // but other matchers match against individual values.
            Matcher::AnyOf(ref matchers) if header_values.is_empty() => {
                matchers.iter().any(|m| m.matches_values(header_values, regexes))
            }
            Matcher::AllOf(ref matchers) if header_values.is_empty() => {
                matchers.iter().all(|m| m.matches_values(header_values, regexes))
            }
            _ => {
                !header_values.is_empty()
                    && header_values
                        .iter()
                        .all(|val| self.matches_value(val, regexes))
            }
        }
    }

    pub(crate) fn matches_value(&self, other: &str, regexes: &Regexes) -> bool {
        match self {
            Matcher::Exact(ref value) => value == other,
            Matcher::Contains(ref value) => other.contains(value.as_str()),
            Matcher::Regex(ref regex) => regexes.full_match(regex, other),
            Matcher::Any => true,
            Matcher::AnyOf(ref matchers) => {
                matchers.iter().any(|m| m.matches_value(other, regexes))
            }
            Matcher::AllOf(ref matchers) => {
                matchers.iter().all(|m| m.matches_value(other, regexes))
            }
            Matcher::Missing => other.is_empty(),
        }
    }
}

///
/// Allows matching the request URL: the whole URL (path and query) or only its path, either
/// exactly or by regular expression.
///
/// An `&str` converts into `UrlMatcher::Exact`, so `server.stub("GET", "/hello?a=1")` only
/// matches requests to exactly that URL.
///
#[derive(Clone, PartialEq, Debug)]
pub enum UrlMatcher {
    /// Matches the whole URL, query included, exactly.
    Exact(String),
    /// Matches the whole URL, query included, by a regular expression.
    Regex(String),
    /// Matches the path exactly and ignores the query.
    PathExact(String),
    /// Matches the path by a regular expression and ignores the query.
    PathRegex(String),
    /// Matches any URL.
    Any,
}

impl<'a> From<&'a str> for UrlMatcher {
    fn from(value: &str) -> Self {
        UrlMatcher::Exact(value.to_string())
    }
}

impl From<String> for UrlMatcher {
    fn from(value: String) -> Self {
        UrlMatcher::Exact(value)
    }
}

impl UrlMatcher {
    #[track_caller]
    pub(crate) fn compile_into(&self, regexes: &mut Regexes) {
        if let UrlMatcher::Regex(ref regex) | UrlMatcher::PathRegex(ref regex) = self {
            regexes.compile(regex);
        }
    }

    pub(crate) fn matches(&self, path: &str, path_and_query: &str, regexes: &Regexes) -> bool {
        match self {
            UrlMatcher::Exact(ref url) => url == path_and_query,
            UrlMatcher::Regex(ref regex) => regexes.full_match(regex, path_and_query),
            UrlMatcher::PathExact(ref expected) => expected == path,
            UrlMatcher::PathRegex(ref regex) => regexes.full_match(regex, path),
            UrlMatcher::Any => true,
        }
    }
}

impl fmt::Display for UrlMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlMatcher::Exact(ref url) => write!(f, "{}", url),
            UrlMatcher::Regex(ref regex) => write!(f, "{} (regex)", regex),
            UrlMatcher::PathExact(ref path) => write!(f, "{} (path)", path),
            UrlMatcher::PathRegex(ref regex) => write!(f, "{} (path regex)", regex),
            UrlMatcher::Any => write!(f, "(any)"),
        }
    }
}

/// The compiled regular expressions of one request pattern, keyed by their source.
#[derive(Clone, Debug, Default)]
pub(crate) struct Regexes {
    compiled: HashMap<String, Regex>,
}

impl Regexes {
    /// Compiles the pattern anchored at both ends. Panics on an invalid pattern.
    #[track_caller]
    pub(crate) fn compile(&mut self, pattern: &str) {
        if self.compiled.contains_key(pattern) {
            return;
        }

        let regex = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|err| Error::new_with_context(ErrorKind::InvalidRegex, err))
            .unwrap();
        self.compiled.insert(pattern.to_owned(), regex);
    }

    pub(crate) fn full_match(&self, pattern: &str, value: &str) -> bool {
        self.compiled
            .get(pattern)
            .map_or(false, |regex| regex.is_match(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(matcher: &Matcher) -> Regexes {
        let mut regexes = Regexes::default();
        matcher.compile_into(&mut regexes);
        regexes
    }

    fn compiled_url(matcher: &UrlMatcher) -> Regexes {
        let mut regexes = Regexes::default();
        matcher.compile_into(&mut regexes);
        regexes
    }

    #[test]
    fn test_regex_has_to_match_the_whole_value() {
        let matcher = Matcher::Regex("text/.*".to_string());
        let regexes = compiled(&matcher);

        assert!(matcher.matches_value("text/html", &regexes));
        assert!(!matcher.matches_value("application/text/html", &regexes));
    }

    #[test]
    #[should_panic(expected = "InvalidRegex")]
    fn test_invalid_regex_panics_when_compiled() {
        compiled(&Matcher::Regex("(unclosed".to_string()));
    }

    #[test]
    fn test_nested_regexes_are_compiled() {
        let matcher = Matcher::AnyOf(vec![
            Matcher::Regex("[0-9]+".to_string()),
            Matcher::AllOf(vec![Matcher::Regex("a.*".to_string()), Matcher::Any]),
        ]);
        let regexes = compiled(&matcher);

        assert!(matcher.matches_value("42", &regexes));
        assert!(matcher.matches_value("abc", &regexes));
        assert!(!matcher.matches_value("xyz", &regexes));
    }

    #[test]
    fn test_contains() {
        let matcher = Matcher::Contains("\"creator\"".to_string());
        let regexes = compiled(&matcher);

        assert!(matcher.matches_value("{\"creator\": \"me\"}", &regexes));
        assert!(!matcher.matches_value("{\"author\": \"me\"}", &regexes));
    }

    #[test]
    fn test_missing_header() {
        let regexes = Regexes::default();

        assert!(Matcher::Missing.matches_values(&[], &regexes));
        assert!(!Matcher::Missing.matches_values(&[""], &regexes));
    }

    #[test]
    fn test_any_requires_a_header() {
        let regexes = Regexes::default();

        assert!(Matcher::Any.matches_values(&["anything"], &regexes));
        assert!(!Matcher::Any.matches_values(&[], &regexes));
    }

    #[test]
    fn test_url_exact_includes_the_query() {
        let matcher = UrlMatcher::from("/hello?a=1");
        let regexes = compiled_url(&matcher);

        assert!(matcher.matches("/hello", "/hello?a=1", &regexes));
        assert!(!matcher.matches("/hello", "/hello?a=2", &regexes));
        assert!(!matcher.matches("/hello", "/hello", &regexes));
    }

    #[test]
    fn test_url_path_exact_ignores_the_query() {
        let matcher = UrlMatcher::PathExact("/hello".to_string());
        let regexes = compiled_url(&matcher);

        assert!(matcher.matches("/hello", "/hello?a=1", &regexes));
        assert!(!matcher.matches("/hello/world", "/hello/world", &regexes));
    }

    #[test]
    fn test_url_path_regex() {
        let matcher = UrlMatcher::PathRegex("/sample/.*".to_string());
        let regexes = compiled_url(&matcher);

        assert!(matcher.matches("/sample/wiremock", "/sample/wiremock?x=y", &regexes));
        assert!(!matcher.matches("/other/sample/x", "/other/sample/x", &regexes));
    }

    #[test]
    fn test_display() {
        assert_eq!("/a (path regex)", UrlMatcher::PathRegex("/a".into()).to_string());
        assert_eq!(
            "(x (contains), y) (all of)",
            Matcher::AllOf(vec![Matcher::Contains("x".into()), "y".into()]).to_string()
        );
    }
}
