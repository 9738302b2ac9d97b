use bytes::Bytes;
use http::header::{AsHeaderName, HeaderValue};
use http::request::Parts;
use http::{HeaderMap, Method, Uri, Version};
use std::borrow::Cow;
use std::fmt;

///
/// Stores a request received by the server, as recorded in the journal.
///
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    pub(crate) fn new(parts: Parts, body: Bytes) -> Self {
        Request {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
        }
    }

    /// The HTTP method
    pub fn method(&self) -> &str {
        self.method.as_str()
    }

    /// The path, without the query
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The path followed by the query, if any
    pub fn path_and_query(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| self.uri.path())
    }

    /// The HTTP version
    pub fn version(&self) -> Version {
        self.version
    }

    /// Retrieves all the header values for the given header field name
    pub fn header<T: AsHeaderName>(&self, header_name: T) -> Vec<&HeaderValue> {
        self.headers.get_all(header_name).iter().collect()
    }

    /// Checks whether the provided header field exists
    pub fn has_header<T: AsHeaderName>(&self, header_name: T) -> bool {
        self.headers.contains_key(header_name)
    }

    /// Returns the request body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the request body as UTF-8, replacing invalid sequences
    pub fn utf8_lossy_body(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Every value of the header, non-ASCII bytes included.
    pub(crate) fn header_values(&self, field: &str) -> Vec<Cow<'_, str>> {
        self.headers
            .get_all(field)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()))
            .collect()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut formatted = String::new();

        formatted.push_str("\r\n");
        formatted.push_str(self.method());
        formatted.push(' ');
        formatted.push_str(self.path_and_query());
        formatted.push_str("\r\n");

        for (field, value) in &self.headers {
            formatted.push_str(field.as_str());
            formatted.push_str(": ");
            formatted.push_str(&String::from_utf8_lossy(value.as_bytes()));
            formatted.push_str("\r\n");
        }

        if !self.body.is_empty() {
            formatted.push_str(&self.utf8_lossy_body());
            formatted.push_str("\r\n");
        }

        f.write_str(&formatted)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn build(method: &str, uri: &str, headers: &[(&str, &str)], body: &str) -> Request {
        let mut builder = http::Request::builder().method(method).uri(uri);
        for (field, value) in headers {
            builder = builder.header(*field, *value);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();

        Request::new(parts, Bytes::from(body.to_owned()))
    }

    #[test]
    fn test_path_and_query() {
        let request = build("GET", "/hello?world=1", &[], "");

        assert_eq!("/hello", request.path());
        assert_eq!("/hello?world=1", request.path_and_query());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = build("GET", "/", &[("Content-Type", "text/plain")], "");

        assert!(request.has_header("content-type"));
        assert_eq!(vec!["text/plain"], request.header_values("content-type"));
    }

    #[test]
    fn test_non_ascii_header_values_are_kept() {
        let request = build("GET", "/", &[("x-name", "café")], "");

        assert_eq!(vec!["café"], request.header_values("x-name"));
    }

    #[test]
    fn test_display() {
        let request = build("POST", "/bye", &[("accept", "text")], "hello");

        assert_eq!("\r\nPOST /bye\r\naccept: text\r\nhello\r\n", request.to_string());
    }
}
