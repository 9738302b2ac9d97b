use crate::matcher::{Matcher, Regexes, UrlMatcher};
use crate::Request;
use std::fmt;

const ANY_METHOD: &str = "ANY";

///
/// Describes which requests a stub accepts, or which journal entries a verification counts:
/// a method, a URL matcher and any number of header and body matchers. All of them have to
/// accept a request for the pattern to match.
///
/// ## Example
///
/// ```
/// use wirestub::{Matcher, RequestPattern, UrlMatcher};
///
/// let pattern = RequestPattern::post("/sample/wiremock")
///     .match_header("content-type", "application/json")
///     .match_body(Matcher::Contains("\"creator\"".into()))
///     .match_body(Matcher::Contains("\"website\"".into()));
///
/// let any_sample = RequestPattern::get(UrlMatcher::PathRegex("/sample/.*".into()));
/// ```
///
/// Regular expressions are compiled as they are added: an invalid one panics at the call site.
///
#[derive(Clone, Debug)]
pub struct RequestPattern {
    pub(crate) method: String,
    pub(crate) url: UrlMatcher,
    pub(crate) headers: Vec<(String, Matcher)>,
    pub(crate) body: Vec<Matcher>,
    regexes: Regexes,
}

impl PartialEq for RequestPattern {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method
            && self.url == other.url
            && self.headers == other.headers
            && self.body == other.body
    }
}

impl RequestPattern {
    ///
    /// Initializes a pattern for the given HTTP `method` and `url`. The method `"ANY"`
    /// accepts every method.
    ///
    #[track_caller]
    pub fn new<U: Into<UrlMatcher>>(method: &str, url: U) -> Self {
        let url = url.into();
        let mut regexes = Regexes::default();
        url.compile_into(&mut regexes);

        RequestPattern {
            method: method.to_uppercase(),
            url,
            headers: Vec::new(),
            body: Vec::new(),
            regexes,
        }
    }

    /// A `GET` pattern
    #[track_caller]
    pub fn get<U: Into<UrlMatcher>>(url: U) -> Self {
        Self::new("GET", url)
    }

    /// A `POST` pattern
    #[track_caller]
    pub fn post<U: Into<UrlMatcher>>(url: U) -> Self {
        Self::new("POST", url)
    }

    /// A pattern accepting every method
    #[track_caller]
    pub fn any<U: Into<UrlMatcher>>(url: U) -> Self {
        Self::new(ANY_METHOD, url)
    }

    ///
    /// Adds a header constraint. The field letter case is ignored.
    ///
    #[track_caller]
    pub fn match_header<M: Into<Matcher>>(mut self, field: &str, value: M) -> Self {
        self.add_header(field, value.into());
        self
    }

    ///
    /// Adds a body constraint. Every body constraint has to match.
    ///
    #[track_caller]
    pub fn match_body<M: Into<Matcher>>(mut self, body: M) -> Self {
        self.add_body(body.into());
        self
    }

    #[track_caller]
    pub(crate) fn add_header(&mut self, field: &str, matcher: Matcher) {
        matcher.compile_into(&mut self.regexes);
        self.headers.push((field.to_lowercase(), matcher));
    }

    #[track_caller]
    pub(crate) fn add_body(&mut self, matcher: Matcher) {
        matcher.compile_into(&mut self.regexes);
        self.body.push(matcher);
    }

    pub(crate) fn matches(&self, request: &Request) -> bool {
        self.method_matches(request)
            && self.url_matches(request)
            && self.headers_match(request)
            && self.body_matches(request)
    }

    fn method_matches(&self, request: &Request) -> bool {
        self.method == ANY_METHOD || self.method == request.method()
    }

    fn url_matches(&self, request: &Request) -> bool {
        self.url
            .matches(request.path(), request.path_and_query(), &self.regexes)
    }

    fn headers_match(&self, request: &Request) -> bool {
        self.headers.iter().all(|(field, matcher)| {
            let values = request.header_values(field);
            let values: Vec<&str> = values.iter().map(AsRef::as_ref).collect();
            matcher.matches_values(&values, &self.regexes)
        })
    }

    fn body_matches(&self, request: &Request) -> bool {
        if self.body.is_empty() {
            return true;
        }

        let body = request.utf8_lossy_body();
        self.body
            .iter()
            .all(|matcher| matcher.matches_value(&body, &self.regexes))
    }
}

impl fmt::Display for RequestPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut formatted = String::new();

        formatted.push_str("\r\n");
        formatted.push_str(&self.method);
        formatted.push(' ');
        formatted.push_str(&self.url.to_string());
        formatted.push_str("\r\n");

        for (key, value) in &self.headers {
            formatted.push_str(key);
            formatted.push_str(": ");
            formatted.push_str(&value.to_string());
            formatted.push_str("\r\n");
        }

        for matcher in &self.body {
            match matcher {
                Matcher::Any => {}
                _ => {
                    formatted.push_str(&matcher.to_string());
                    formatted.push_str("\r\n");
                }
            }
        }

        f.write_str(&formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::tests::build;

    #[test]
    fn test_method_is_case_insensitive() {
        let pattern = RequestPattern::new("get", "/");

        assert!(pattern.matches(&build("GET", "/", &[], "")));
        assert!(!pattern.matches(&build("POST", "/", &[], "")));
    }

    #[test]
    fn test_any_method() {
        let pattern = RequestPattern::any("/");

        assert!(pattern.matches(&build("DELETE", "/", &[], "")));
    }

    #[test]
    fn test_all_body_matchers_have_to_match() {
        let pattern = RequestPattern::post("/")
            .match_body(Matcher::Contains("one".into()))
            .match_body(Matcher::Contains("two".into()));

        assert!(pattern.matches(&build("POST", "/", &[], "one and two")));
        assert!(!pattern.matches(&build("POST", "/", &[], "only one")));
    }

    #[test]
    fn test_header_field_is_case_insensitive() {
        let pattern = RequestPattern::get("/").match_header("Accept", Matcher::Regex("text/.*".into()));

        assert!(pattern.matches(&build("GET", "/", &[("accept", "text/xml")], "")));
        assert!(!pattern.matches(&build("GET", "/", &[("accept", "application/json")], "")));
        assert!(!pattern.matches(&build("GET", "/", &[], "")));
    }

    #[test]
    fn test_non_ascii_header_value_is_present() {
        let any = RequestPattern::get("/").match_header("x-name", Matcher::Any);
        let missing = RequestPattern::get("/").match_header("x-name", Matcher::Missing);
        let exact = RequestPattern::get("/").match_header("x-name", "café");
        let request = build("GET", "/", &[("x-name", "café")], "");

        assert!(any.matches(&request));
        assert!(!missing.matches(&request));
        assert!(exact.matches(&request));
    }

    #[test]
    fn test_regexes_survive_clone() {
        let pattern = RequestPattern::get(UrlMatcher::PathRegex("/items/[0-9]+".into()))
            .match_body(Matcher::Regex("id=.*".into()));
        let cloned = pattern.clone();

        assert_eq!(pattern, cloned);
        assert!(cloned.matches(&build("GET", "/items/7?x=1", &[], "id=7")));
        assert!(!cloned.matches(&build("GET", "/items/x", &[], "id=7")));
    }

    #[test]
    #[should_panic(expected = "InvalidRegex")]
    fn test_invalid_regex_panics() {
        let _ = RequestPattern::get("/").match_header("accept", Matcher::Regex("[".into()));
    }

    #[test]
    fn test_display() {
        let pattern = RequestPattern::get("/hello")
            .match_header("Accept", "text/plain")
            .match_body(Matcher::Contains("x".into()));

        assert_eq!(
            "\r\nGET /hello\r\naccept: text/plain\r\nx (contains)\r\n",
            pattern.to_string()
        );
    }
}
